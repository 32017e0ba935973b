use std::fmt::{self, Display};

use crate::{
    egraph::{EGraph, Term},
    unionfind::Id,
    util::{IndexMap, IndexSet, Symbol},
};

/// Bindings of pattern variables to classes.
pub type Subst = IndexMap<Symbol, Id>;

/// A tree of operations and terms with named holes.
///
/// `Term` nodes carry either no children (a concrete term such as `a`)
/// or exactly two (a binary operation).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Var(Symbol),
    Term(Symbol, Vec<Pattern>),
}

impl Pattern {
    pub fn var(name: impl Into<Symbol>) -> Self {
        Pattern::Var(name.into())
    }

    pub fn leaf(symbol: impl Into<Symbol>) -> Self {
        Pattern::Term(symbol.into(), vec![])
    }

    pub fn op(symbol: impl Into<Symbol>, left: Pattern, right: Pattern) -> Self {
        Pattern::Term(symbol.into(), vec![left, right])
    }

    pub fn children(&self) -> &[Pattern] {
        match self {
            Pattern::Var(_) => &[],
            Pattern::Term(_, children) => children,
        }
    }

    /// Returns the variables in order of first appearance.
    pub fn vars(&self) -> IndexSet<Symbol> {
        let mut vars = IndexSet::default();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut IndexSet<Symbol>) {
        match self {
            Pattern::Var(v) => {
                vars.insert(*v);
            }
            Pattern::Term(_, children) => {
                for child in children {
                    child.collect_vars(vars);
                }
            }
        }
    }

    pub fn is_ground(&self) -> bool {
        self.vars().is_empty()
    }

    /// Renames term and operation symbols, leaving variables alone.
    pub fn map_symbols(&self, f: &impl Fn(Symbol) -> Symbol) -> Pattern {
        match self {
            Pattern::Var(v) => Pattern::Var(*v),
            Pattern::Term(symbol, children) => Pattern::Term(
                f(*symbol),
                children.iter().map(|c| c.map_symbols(f)).collect(),
            ),
        }
    }

    /// Finds every class with at least one member matching this pattern.
    pub fn search(&self, egraph: &EGraph) -> Vec<SearchMatches> {
        egraph
            .classes()
            .filter_map(|class| self.search_eclass(egraph, class.id))
            .collect()
    }

    /// Matches this pattern against the members of one class.
    ///
    /// A class matches if *any* of its members does, so different members
    /// may produce different substitutions.
    pub fn search_eclass(&self, egraph: &EGraph, eclass: Id) -> Option<SearchMatches> {
        let eclass = egraph.find(eclass);
        let substs = self.search_pat(0, Subst::default(), egraph, eclass);
        if substs.is_empty() {
            None
        } else {
            Some(SearchMatches { eclass, substs })
        }
    }

    fn search_pat(&self, depth: usize, mut subst: Subst, egraph: &EGraph, eclass: Id) -> Vec<Subst> {
        let eclass = egraph.find(eclass);
        let (symbol, args) = match self {
            Pattern::Var(v) => {
                match subst.get(v) {
                    None => {
                        subst.insert(*v, eclass);
                    }
                    Some(&bound) if egraph.find(bound) != eclass => {
                        log::trace!("{}Failed to bind ${v} to {eclass}", "    ".repeat(depth));
                        return vec![];
                    }
                    Some(_) => (),
                }
                return vec![subst];
            }
            Pattern::Term(symbol, args) => (*symbol, args),
        };

        let mut new_substs = Vec::new();
        for id in egraph.get_class(eclass).terms() {
            let term = egraph.term(id);
            if term.symbol() != symbol || term.children().len() != args.len() {
                continue;
            }

            let mut substs = vec![subst.clone()];
            for (arg, &child) in args.iter().zip(term.children()) {
                substs = substs
                    .into_iter()
                    .flat_map(|s| arg.search_pat(depth + 1, s, egraph, child))
                    .collect();
                if substs.is_empty() {
                    break;
                }
            }
            new_substs.extend(substs);
        }
        new_substs
    }

    /// Adds the pattern to the egraph with the variables replaced by their
    /// bound classes, returning the class of the root.
    pub fn instantiate(&self, egraph: &mut EGraph, subst: &Subst) -> Id {
        match self {
            Pattern::Var(v) => *subst
                .get(v)
                .unwrap_or_else(|| panic!("Pattern variable ${v} is not bound")),
            Pattern::Term(symbol, args) => match args.as_slice() {
                [] => egraph.add(Term::leaf(*symbol)),
                [left, right] => {
                    let left = left.instantiate(egraph, subst);
                    let right = right.instantiate(egraph, subst);
                    egraph.add(Term::operation(*symbol, [left, right]))
                }
                other => panic!("Operation {symbol} has {} arguments", other.len()),
            },
        }
    }

    fn fmt_wrapped(&self, f: &mut fmt::Formatter<'_>, wrap: bool) -> fmt::Result {
        match self {
            Pattern::Var(v) => write!(f, "${v}"),
            Pattern::Term(symbol, args) => match args.as_slice() {
                [left, right] => {
                    if wrap {
                        f.write_str("(")?;
                    }
                    left.fmt_wrapped(f, true)?;
                    write!(f, " {symbol} ")?;
                    right.fmt_wrapped(f, true)?;
                    if wrap {
                        f.write_str(")")?;
                    }
                    Ok(())
                }
                _ => write!(f, "{symbol}"),
            },
        }
    }
}

/// Fully parenthesized except at the top level, e.g. `(a ~> b) @ c`.
impl Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_wrapped(f, false)
    }
}

#[derive(Debug, Clone)]
pub struct SearchMatches {
    pub eclass: Id,
    pub substs: Vec<Subst>,
}

/// An equality template: anything matching `lhs` is equal to `rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub name: String,
    pub lhs: Pattern,
    pub rhs: Pattern,
}

impl Rewrite {
    pub fn new(name: impl Into<String>, lhs: Pattern, rhs: Pattern) -> Self {
        Rewrite {
            name: name.into(),
            lhs,
            rhs,
        }
    }

    pub fn search(&self, egraph: &EGraph) -> Vec<SearchMatches> {
        self.lhs.search(egraph)
    }

    /// Instantiates the right-hand side for every match and unions it
    /// into the matched class. Returns how many applications changed the
    /// egraph.
    pub fn apply(&self, egraph: &mut EGraph, matches: &[SearchMatches]) -> usize {
        let mut applied = 0;
        for m in matches {
            for subst in &m.substs {
                let before = egraph.num_terms();
                let id = self.rhs.instantiate(egraph, subst);
                let unioned = egraph.union(m.eclass, id);
                if unioned || egraph.num_terms() != before {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// One search-then-apply pass. Does not rebuild.
    pub fn run(&self, egraph: &mut EGraph) -> usize {
        let matches = self.search(egraph);
        log::debug!(
            "Ran the rewrite '{}', found {} matches",
            self.name,
            matches.len()
        );
        self.apply(egraph, &matches)
    }
}

impl Display for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.lhs, self.rhs)
    }
}
