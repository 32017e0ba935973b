use std::fmt::{self, Debug, Display};

/// Index of a stored term, and of the class it belongs to once canonical.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<usize> for Id {
    fn from(n: usize) -> Id {
        Id(u32::try_from(n).expect("too many ids for a u32"))
    }
}

impl From<Id> for usize {
    fn from(id: Id) -> usize {
        id.0 as usize
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parents: Vec<Id>,
    n_unions: usize,
}

impl UnionFind {
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn n_unions(&self) -> usize {
        self.n_unions
    }

    pub fn make_set(&mut self) -> Id {
        let id = Id::from(self.parents.len());
        self.parents.push(id);
        id
    }

    fn parent(&self, query: Id) -> Id {
        self.parents[usize::from(query)]
    }

    fn parent_mut(&mut self, query: Id) -> &mut Id {
        &mut self.parents[usize::from(query)]
    }

    pub fn find(&self, mut current: Id) -> Id {
        debug_assert!(usize::from(current) < self.len(), "dead id {current}");
        while current != self.parent(current) {
            current = self.parent(current)
        }
        current
    }

    /// Same as [`find`](UnionFind::find), halving the path on the way up.
    pub fn find_mut(&mut self, mut current: Id) -> Id {
        debug_assert!(usize::from(current) < self.len(), "dead id {current}");
        while current != self.parent(current) {
            let grandparent = self.parent(self.parent(current));
            *self.parent_mut(current) = grandparent;
            current = grandparent;
        }
        current
    }

    /// Given two leader ids, unions the two sets making `root1` the leader.
    pub fn union_roots(&mut self, root1: Id, root2: Id) -> Id {
        debug_assert_eq!(root1, self.parent(root1));
        debug_assert_eq!(root2, self.parent(root2));
        debug_assert_ne!(root1, root2);
        *self.parent_mut(root2) = root1;
        self.n_unions += 1;
        root1
    }

    /// Unions the sets of two arbitrary ids, returning the new leader.
    pub fn union(&mut self, id1: Id, id2: Id) -> Id {
        let root1 = self.find_mut(id1);
        let root2 = self.find_mut(id2);
        if root1 == root2 {
            root1
        } else {
            self.union_roots(root1, root2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(us: impl IntoIterator<Item = usize>) -> Vec<Id> {
        us.into_iter().map(|u| u.into()).collect()
    }

    #[test]
    fn union_find() {
        let n = 10;
        let id = Id::from;

        let mut uf = UnionFind::default();
        for _ in 0..n {
            uf.make_set();
        }

        // test the initial condition of everyone in their own set
        assert_eq!(uf.parents, ids(0..n));

        // build up one set
        uf.union(id(0), id(1));
        uf.union(id(0), id(2));
        uf.union(id(0), id(3));

        // build up another set
        uf.union(id(6), id(7));
        uf.union(id(6), id(8));
        uf.union(id(6), id(9));

        // this should compress all paths
        for i in 0..n {
            uf.find_mut(id(i));
        }

        // indexes:         0, 1, 2, 3, 4, 5, 6, 7, 8, 9
        let expected = vec![0, 0, 0, 0, 4, 5, 6, 6, 6, 6];
        assert_eq!(uf.parents, ids(expected));
        assert_eq!(uf.n_unions(), 6);
    }

    #[test]
    fn unions_survive_unrelated_unions() {
        let mut uf = UnionFind::default();
        let sets: Vec<Id> = (0..6).map(|_| uf.make_set()).collect();

        uf.union(sets[0], sets[1]);
        assert_eq!(uf.find(sets[0]), uf.find(sets[1]));

        uf.union(sets[2], sets[3]);
        uf.union(sets[4], sets[5]);
        uf.union(sets[3], sets[5]);
        assert_eq!(uf.find(sets[0]), uf.find(sets[1]));
        assert_ne!(uf.find(sets[0]), uf.find(sets[2]));
        assert_eq!(uf.find(sets[2]), uf.find(sets[4]));

        // unioning twice is a no-op
        let leader = uf.find(sets[0]);
        assert_eq!(uf.union(sets[1], sets[0]), leader);
        assert_eq!(uf.n_unions(), 4);
    }

    #[test]
    fn find_is_idempotent() {
        let mut uf = UnionFind::default();
        let a = uf.make_set();
        let b = uf.make_set();
        let c = uf.make_set();
        uf.union(a, b);
        uf.union(c, a);
        let root = uf.find(b);
        assert_eq!(uf.find(root), root);
        assert_eq!(uf.find_mut(b), root);
        assert_eq!(uf.find_mut(root), root);
    }
}
