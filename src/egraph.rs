use smallvec::SmallVec;
use std::fmt::{self, Display};

use crate::{
    pattern::Rewrite,
    unionfind::{Id, UnionFind},
    util::{HashMap, HashSet, IndexMap, IndexSet, Symbol},
};

/// A hash-consed node: a term symbol with no children, or a binary
/// operation symbol with exactly two child classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    symbol: Symbol,
    children: SmallVec<[Id; 2]>,
}

impl Term {
    pub fn leaf(symbol: impl Into<Symbol>) -> Self {
        Term {
            symbol: symbol.into(),
            children: SmallVec::new(),
        }
    }

    pub fn operation(symbol: impl Into<Symbol>, children: [Id; 2]) -> Self {
        Term {
            symbol: symbol.into(),
            children: SmallVec::from_buf(children),
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn children(&self) -> &[Id] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn canonicalize(&self, unionfind: &mut UnionFind) -> Term {
        Term {
            symbol: self.symbol,
            children: self.children.iter().map(|&c| unionfind.find_mut(c)).collect(),
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.children.as_slice() {
            [] => write!(f, "{}", self.symbol),
            [left, right] => write!(f, "(#{left} {} #{right})", self.symbol),
            other => panic!("term {} has {} children", self.symbol, other.len()),
        }
    }
}

/// An equivalence class of terms.
#[derive(Debug, Clone)]
pub struct EClass {
    /// This class's canonical id.
    pub id: Id,
    /// Ids of the member terms.
    terms: Vec<Id>,
    /// Ids of the terms that use this class as a child.
    parents: Vec<Id>,
}

impl EClass {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterates over the ids of the member terms.
    pub fn terms(&self) -> impl ExactSizeIterator<Item = Id> + '_ {
        self.terms.iter().copied()
    }

    /// Iterates over the ids of the parent terms.
    pub fn parents(&self) -> impl ExactSizeIterator<Item = Id> + '_ {
        self.parents.iter().copied()
    }
}

/// A congruence-closed set of terms.
///
/// Every stored term gets its own id from the union-find; the id of a
/// class is the canonical id of any of its terms. Unions only record
/// the parents that may have become congruent, and
/// [`rebuild`](EGraph::rebuild) restores the congruence invariant in one
/// batch. Reads such as pattern matching and extraction expect a clean
/// graph.
#[derive(Debug, Clone, Default)]
pub struct EGraph {
    unionfind: UnionFind,
    /// The term behind every id, with children canonical as of the last rebuild.
    terms: Vec<Term>,
    memo: HashMap<Term, Id>,
    classes: IndexMap<Id, EClass>,
    /// Terms whose children may no longer be canonical.
    pending: Vec<Id>,
}

impl EGraph {
    /// Adds a term without children, returning its class.
    pub fn add_term(&mut self, symbol: impl Into<Symbol>) -> Id {
        self.add(Term::leaf(symbol))
    }

    /// Adds a binary operation over two classes, returning its class.
    pub fn add_operation(&mut self, symbol: impl Into<Symbol>, children: [Id; 2]) -> Id {
        self.add(Term::operation(symbol, children))
    }

    /// Hash-conses a term. If an identical term (after canonicalizing its
    /// children) is already stored, returns the class it lives in.
    pub fn add(&mut self, term: Term) -> Id {
        let term = term.canonicalize(&mut self.unionfind);
        if let Some(&existing) = self.memo.get(&term) {
            log::trace!("Added *{existing:4}: {term}");
            return self.unionfind.find_mut(existing);
        }

        let id = self.unionfind.make_set();
        debug_assert_eq!(usize::from(id), self.terms.len());
        log::trace!("Added  {id:4}: {term}");

        for &child in term.children() {
            self.classes[&child].parents.push(id);
        }
        self.classes.insert(
            id,
            EClass {
                id,
                terms: vec![id],
                parents: Vec::new(),
            },
        );
        self.memo.insert(term.clone(), id);
        self.terms.push(term);
        id
    }

    /// Looks up the class of a term without adding it.
    pub fn lookup(&self, term: &Term) -> Option<Id> {
        let term = Term {
            symbol: term.symbol,
            children: term.children.iter().map(|&c| self.find(c)).collect(),
        };
        self.memo.get(&term).map(|&id| self.find(id))
    }

    pub fn find(&self, id: Id) -> Id {
        self.unionfind.find(id)
    }

    pub fn find_mut(&mut self, id: Id) -> Id {
        self.unionfind.find_mut(id)
    }

    /// Merges the classes of two ids. Returns `false` if they were
    /// already the same class.
    ///
    /// The parents of the absorbed class are queued for the next
    /// [`rebuild`](EGraph::rebuild).
    pub fn union(&mut self, id1: Id, id2: Id) -> bool {
        let mut id1 = self.find_mut(id1);
        let mut id2 = self.find_mut(id2);
        if id1 == id2 {
            return false;
        }

        // keep the class with more parents as the leader
        if self.classes[&id1].parents.len() < self.classes[&id2].parents.len() {
            std::mem::swap(&mut id1, &mut id2);
        }

        log::trace!("Unioning {id1} <- {id2}");
        self.unionfind.union_roots(id1, id2);

        let class2 = self
            .classes
            .swap_remove(&id2)
            .unwrap_or_else(|| panic!("Couldn't find eclass {id2}"));
        self.pending.extend(&class2.parents);

        let class1 = &mut self.classes[&id1];
        class1.terms.extend(class2.terms);
        class1.parents.extend(class2.parents);
        true
    }

    /// Restores congruence closure after a batch of unions.
    ///
    /// Every parent of an absorbed class is re-canonicalized; two parents
    /// that became identical are merged, which may queue more parents.
    /// Returns the number of unions this performed.
    pub fn rebuild(&mut self) -> usize {
        if self.pending.is_empty() {
            log::trace!("Skipping rebuild!");
            return 0;
        }

        let old_n_classes = self.classes.len();
        let mut n_unions = 0;

        while let Some(id) = self.pending.pop() {
            let term = self.terms[usize::from(id)].canonicalize(&mut self.unionfind);
            match self.memo.get(&term) {
                Some(&existing) => {
                    if self.union(existing, id) {
                        n_unions += 1;
                    }
                }
                None => {
                    self.memo.insert(term, id);
                }
            }
        }

        let trimmed = self.rebuild_classes();

        log::debug!(
            "Rebuilt: classes {} -> {}, unions: {}, trimmed terms: {}",
            old_n_classes,
            self.classes.len(),
            n_unions,
            trimmed,
        );
        n_unions
    }

    /// Canonicalizes every stored term, drops member terms that became
    /// duplicates of another member and rebuilds the memo.
    fn rebuild_classes(&mut self) -> usize {
        let mut trimmed = 0;
        let mut memo = HashMap::default();

        for class in self.classes.values_mut() {
            let mut seen = HashSet::default();
            let mut terms = Vec::with_capacity(class.terms.len());
            for &id in &class.terms {
                let term = self.terms[usize::from(id)].canonicalize(&mut self.unionfind);
                if seen.insert(term.clone()) {
                    self.terms[usize::from(id)] = term.clone();
                    memo.insert(term, id);
                    terms.push(id);
                } else {
                    trimmed += 1;
                }
            }
            class.terms = terms;

            let parents: IndexSet<Id> = class.parents.iter().copied().collect();
            class.parents = parents.into_iter().collect();
        }

        self.memo = memo;
        trimmed
    }

    /// Applies one non-fixpoint pass of a rewrite rule. The caller is
    /// responsible for rebuilding afterwards.
    pub fn rewrite(&mut self, rule: &Rewrite) -> usize {
        rule.run(self)
    }

    /// Whether there are no unions waiting for a [`rebuild`](EGraph::rebuild).
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the stored term behind an id.
    pub fn term(&self, id: Id) -> &Term {
        &self.terms[usize::from(id)]
    }

    /// Returns the class an id belongs to.
    pub fn get_class(&self, id: Id) -> &EClass {
        let id = self.find(id);
        self.classes
            .get(&id)
            .unwrap_or_else(|| panic!("Couldn't find eclass {id}"))
    }

    pub fn classes(&self) -> impl ExactSizeIterator<Item = &EClass> {
        self.classes.values()
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of stored terms, including the ones trimmed as duplicates.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }
}
