use std::fmt::{self, Display};
use std::rc::Rc;

use crate::{
    egraph::{EGraph, Term},
    random::Random,
    unionfind::Id,
    util::{IndexMap, IndexSet, Symbol},
};

/// How many random trees are sampled from every term by default.
pub const DEFAULT_SAMPLES_PER_TERM: usize = 100;

/// Extracted hints, grouped by the class of their root.
pub type HintsByClass = IndexMap<Id, Vec<Rc<Hint>>>;

/// A concrete expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstNode {
    pub symbol: Symbol,
    pub children: Vec<AstNode>,
    /// The stored term this node was sampled from, if any.
    pub term_id: Option<Id>,
}

impl AstNode {
    pub fn leaf(symbol: impl Into<Symbol>) -> Self {
        AstNode {
            symbol: symbol.into(),
            children: vec![],
            term_id: None,
        }
    }

    pub fn op(symbol: impl Into<Symbol>, left: AstNode, right: AstNode) -> Self {
        AstNode {
            symbol: symbol.into(),
            children: vec![left, right],
            term_id: None,
        }
    }

    fn sampled(term: &Term, id: Id) -> Self {
        AstNode {
            symbol: term.symbol(),
            children: vec![],
            term_id: Some(id),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(AstNode::depth).max().unwrap_or(0)
    }

    /// A bare term, or an operation over two bare terms.
    fn is_replaceable(&self) -> bool {
        self.children.iter().all(AstNode::is_leaf)
    }

    fn collect_replaceable<'a>(&'a mut self, out: &mut Vec<&'a mut AstNode>) {
        if self.is_replaceable() {
            out.push(self);
        } else {
            for child in &mut self.children {
                child.collect_replaceable(out);
            }
        }
    }

    fn collect_symbols(&self, terms: &mut IndexSet<Symbol>, operations: &mut IndexSet<Symbol>) {
        if self.is_leaf() {
            terms.insert(self.symbol);
        } else {
            operations.insert(self.symbol);
        }
        for child in &self.children {
            child.collect_symbols(terms, operations);
        }
    }

    fn fmt_wrapped(&self, f: &mut fmt::Formatter<'_>, wrap: bool) -> fmt::Result {
        match self.children.as_slice() {
            [] => write!(f, "{}", self.symbol),
            [left, right] => {
                if wrap {
                    f.write_str("(")?;
                }
                left.fmt_wrapped(f, true)?;
                write!(f, " {} ", self.symbol)?;
                right.fmt_wrapped(f, true)?;
                if wrap {
                    f.write_str(")")?;
                }
                Ok(())
            }
            other => panic!("operation {} has {} children", self.symbol, other.len()),
        }
    }
}

/// Left to right infix, parenthesized everywhere except at the top level.
impl Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_wrapped(f, false)
    }
}

/// An expression sampled from the egraph, along with what is needed to
/// rank it as a hint, a question or an answer.
#[derive(Debug, Clone)]
pub struct Hint {
    /// The term the sample started from.
    pub leaf_id: Id,
    /// The class of that term, which every hint equal to this one shares.
    pub root_id: Id,
    pub root: AstNode,
    pub formatted: String,
    pub depth: usize,
    pub term_symbols: IndexSet<Symbol>,
    pub operation_symbols: IndexSet<Symbol>,
    /// Ids of every stored term the sample went through.
    pub used_term_ids: IndexSet<Id>,
}

impl Hint {
    pub fn new(leaf_id: Id, root_id: Id, root: AstNode, used_term_ids: IndexSet<Id>) -> Self {
        let mut hint = Hint {
            leaf_id,
            root_id,
            root,
            formatted: String::new(),
            depth: 0,
            term_symbols: IndexSet::default(),
            operation_symbols: IndexSet::default(),
            used_term_ids,
        };
        hint.collect_info();
        hint
    }

    fn collect_info(&mut self) {
        self.depth = self.root.depth();
        self.formatted = self.root.to_string();
        self.term_symbols.clear();
        self.operation_symbols.clear();
        self.root
            .collect_symbols(&mut self.term_symbols, &mut self.operation_symbols);
    }

    /// Operations used here that are not in `shown`, in order of appearance.
    pub fn new_operations(&self, shown: &IndexSet<Symbol>) -> Vec<Symbol> {
        self.operation_symbols
            .iter()
            .filter(|op| !shown.contains(*op))
            .copied()
            .collect()
    }

    pub fn num_new_operations(&self, shown: &IndexSet<Symbol>) -> usize {
        self.operation_symbols
            .iter()
            .filter(|op| !shown.contains(*op))
            .count()
    }

    pub fn num_new_terms(&self, known: &IndexSet<Symbol>) -> usize {
        self.term_symbols
            .iter()
            .filter(|t| !known.contains(*t))
            .count()
    }

    pub fn uses_operation(&self, operation: Symbol) -> bool {
        self.operation_symbols.contains(&operation)
    }

    /// Replaces one random bare term, or operation over two bare terms,
    /// with `term`. The result is no longer backed by the egraph.
    pub fn replace_random_node(&mut self, random: &mut Random, term: Symbol) {
        let mut candidates = Vec::new();
        self.root.collect_replaceable(&mut candidates);
        let index = random.int(candidates.len() - 1);
        let node = candidates.swap_remove(index);
        *node = AstNode::leaf(term);
        self.collect_info();
    }
}

/// Samples random expressions out of a clean egraph.
///
/// There are usually too many equal expressions to enumerate, so every
/// stored term is the root of a number of random walks: at every child
/// class one member is picked uniformly. A walk that would go through the
/// same operation term twice is dropped, which keeps classes that contain
/// themselves (e.g. after `x . x => x`) from recursing forever.
pub struct Extractor<'a> {
    egraph: &'a EGraph,
    random: &'a mut Random,
    samples_per_term: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(egraph: &'a EGraph, random: &'a mut Random) -> Self {
        debug_assert!(egraph.is_clean(), "extracting from an egraph that needs a rebuild");
        Extractor {
            egraph,
            random,
            samples_per_term: DEFAULT_SAMPLES_PER_TERM,
        }
    }

    pub fn with_samples_per_term(mut self, samples_per_term: usize) -> Self {
        self.samples_per_term = samples_per_term;
        self
    }

    /// Samples every term, deduplicates by formatted text and groups the
    /// survivors by root class.
    pub fn extract(&mut self) -> HintsByClass {
        let egraph = self.egraph;
        let mut unique: IndexMap<String, Hint> = IndexMap::default();
        for class in egraph.classes() {
            for id in class.terms() {
                for _ in 0..self.samples_per_term {
                    if let Some(hint) = self.sample(id) {
                        unique.entry(hint.formatted.clone()).or_insert(hint);
                    }
                }
            }
        }

        let mut grouped = HintsByClass::default();
        for (_, hint) in unique {
            grouped.entry(hint.root_id).or_default().push(Rc::new(hint));
        }

        log::debug!(
            "Extracted {} hints in {} classes",
            grouped.values().map(Vec::len).sum::<usize>(),
            grouped.len()
        );
        grouped
    }

    /// One random walk from a term, or `None` if it ran into a loop.
    pub fn sample(&mut self, id: Id) -> Option<Hint> {
        let term = self.egraph.term(id);
        let mut used_term_ids = IndexSet::default();
        used_term_ids.insert(id);

        let mut root = AstNode::sampled(term, id);
        if !self.sample_children(term, &mut root, &mut used_term_ids) {
            return None;
        }
        Some(Hint::new(id, self.egraph.find(id), root, used_term_ids))
    }

    fn sample_children(&mut self, term: &Term, node: &mut AstNode, used: &mut IndexSet<Id>) -> bool {
        for &child in term.children() {
            let class = self.egraph.get_class(child);
            assert!(!class.is_empty(), "class {} has no terms", class.id);

            let picked = class
                .terms()
                .nth(self.random.int(class.len() - 1))
                .unwrap_or(class.id);
            let sub_term = self.egraph.term(picked);
            if !used.insert(picked) && !sub_term.is_leaf() {
                return false;
            }

            let mut child_node = AstNode::sampled(sub_term, picked);
            if !self.sample_children(sub_term, &mut child_node, used) {
                return false;
            }
            node.children.push(child_node);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, Rewrite};

    fn formatted(hints: &HintsByClass, class: Id) -> Vec<String> {
        let mut out: Vec<String> = hints[&class].iter().map(|h| h.formatted.clone()).collect();
        out.sort();
        out
    }

    #[test]
    fn formats_without_precedence() {
        let tree = AstNode::op(
            "~>",
            AstNode::op("@", AstNode::leaf("a"), AstNode::leaf("b")),
            AstNode::leaf("c"),
        );
        assert_eq!(tree.to_string(), "(a @ b) ~> c");
        assert_eq!(tree.depth(), 3);

        let hint = Hint::new(Id::from(0), Id::from(0), tree, IndexSet::default());
        assert_eq!(hint.term_symbols.len(), 3);
        assert_eq!(hint.operation_symbols.len(), 2);

        let shown: IndexSet<Symbol> = [Symbol::from("@")].into_iter().collect();
        assert_eq!(hint.new_operations(&shown), vec![Symbol::from("~>")]);
        assert!(hint.uses_operation("@".into()));
    }

    #[test]
    fn replacing_a_node_keeps_the_shape_shallow() {
        let tree = AstNode::op(
            "~>",
            AstNode::op("@", AstNode::leaf("a"), AstNode::leaf("b")),
            AstNode::leaf("c"),
        );
        let mut random = Random::new(3);
        for _ in 0..10 {
            let mut hint = Hint::new(Id::from(0), Id::from(0), tree.clone(), IndexSet::default());
            hint.replace_random_node(&mut random, "z".into());
            assert!(
                ["z ~> c", "(a @ b) ~> z"].contains(&hint.formatted.as_str()),
                "{}",
                hint.formatted
            );
        }
    }

    #[test]
    fn equal_forms_share_a_class() {
        let mut egraph = EGraph::default();
        let a = egraph.add_term("a");
        let b = egraph.add_term("b");
        let ab = egraph.add_operation("~>", [a, b]);
        let comm = Rewrite::new(
            "comm",
            Pattern::op("~>", Pattern::var("x"), Pattern::var("y")),
            Pattern::op("~>", Pattern::var("y"), Pattern::var("x")),
        );
        egraph.rewrite(&comm);
        egraph.rebuild();

        let mut random = Random::new(11);
        let hints = Extractor::new(&egraph, &mut random).extract();
        assert_eq!(formatted(&hints, egraph.find(ab)), vec!["a ~> b", "b ~> a"]);
        assert_eq!(formatted(&hints, a), vec!["a"]);
        assert_eq!(hints.len(), 3);
    }

    #[test]
    fn self_containing_class_terminates() {
        let mut egraph = EGraph::default();
        let a = egraph.add_term("a");
        let aa = egraph.add_operation(".", [a, a]);
        egraph.union(a, aa);
        egraph.rebuild();

        let mut random = Random::new(5);
        let hints = Extractor::new(&egraph, &mut random).extract();
        assert_eq!(hints.len(), 1);
        assert_eq!(formatted(&hints, egraph.find(a)), vec!["a", "a . a"]);

        for hint in hints.values().flatten() {
            let operations = hint
                .used_term_ids
                .iter()
                .filter(|&&id| !egraph.term(id).is_leaf())
                .count();
            assert!(operations <= 1);
        }
    }
}
