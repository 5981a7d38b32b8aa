use indexmap::IndexMap;

use crate::transform::PointKey;

/// Union-find over sheet coordinates.
///
/// Sets are numbered in the order their first coordinate was added.
#[derive(Debug, Default)]
pub(crate) struct DisjointSet {
    index: IndexMap<PointKey, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    /// Index of `key`, added as a new singleton set when unknown.
    pub(crate) fn make(&mut self, key: PointKey) -> usize {
        let next = self.parent.len();
        let id = *self.index.entry(key).or_insert(next);
        if id == next {
            self.parent.push(id);
            self.rank.push(0);
        }
        id
    }

    pub(crate) fn key(&self, id: usize) -> Option<PointKey> {
        self.index.get_index(id).map(|(key, _)| *key)
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the sets of `a` and `b` and returns the new root.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let (root, child) = if self.rank[ra] < self.rank[rb] {
            (rb, ra)
        } else {
            (ra, rb)
        };
        self.parent[child] = root;
        if self.rank[ra] == self.rank[rb] {
            self.rank[root] += 1;
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Point;

    fn key(x: f64, y: f64) -> PointKey {
        Point::new(x, y).key()
    }

    #[test]
    fn make_is_idempotent() {
        let mut set = DisjointSet::new();
        let a = set.make(key(1.0, 2.0));
        let b = set.make(key(3.0, 4.0));
        assert_eq!((a, b), (0, 1));
        assert_eq!(set.make(key(1.0000001, 2.0)), a);
        assert_eq!(set.len(), 2);
        assert_eq!(set.key(1), Some(key(3.0, 4.0)));
        assert!(!set.index.contains_key(&key(5.0, 5.0)));
    }

    #[test]
    fn union_is_transitive() {
        let mut set = DisjointSet::new();
        let ids: Vec<_> = (0..5).map(|i| set.make(key(i as f64, 0.0))).collect();
        set.union(ids[0], ids[1]);
        set.union(ids[2], ids[3]);
        set.union(ids[1], ids[3]);
        let root = set.find(ids[0]);
        assert!(ids[..4].iter().all(|id| set.find(*id) == root));
        assert_ne!(set.find(ids[4]), root);
        assert_eq!(set.union(ids[0], ids[2]), root);
    }
}
