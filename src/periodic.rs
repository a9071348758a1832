//! Periodic vertex identifications and their transitive closure.

use std::collections::BTreeMap;

/// A declared equivalence between two vertices of a mesh,
/// used to impose periodic boundary conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeriodicPair {
    /// The vertex whose degrees of freedom are kept.
    pub master: usize,
    /// The vertex identified with `master`.
    pub servant: usize,
    /// Identifier distinguishing independent periodic directions.
    pub ident: usize,
}

/// Master → servant relation closed under transitivity.
///
/// If `a` is the master of `b` and `b` the master of `c`,
/// both `b` and `c` are servants of `a`.
/// Tents pitched at a master are replicated at all of its servants.
#[derive(Clone, Debug, Default)]
pub struct PeriodicClosure {
    servants: BTreeMap<usize, Vec<usize>>,
}

impl PeriodicClosure {
    /// Close the relation given by a list of periodic pairs.
    pub fn new(pairs: &[PeriodicPair]) -> Self {
        let mut direct: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for pair in pairs {
            direct.entry(pair.master).or_default().push(pair.servant);
        }

        // depth-first walk from every master along master → servant links
        let mut servants = BTreeMap::new();
        let mut stack = Vec::new();
        for &master in direct.keys() {
            let mut reached: Vec<usize> = Vec::new();
            stack.clear();
            stack.extend(direct[&master].iter().copied());
            while let Some(v) = stack.pop() {
                // cycles in the input would otherwise loop forever
                if v == master || reached.contains(&v) {
                    continue;
                }
                reached.push(v);
                if let Some(next) = direct.get(&v) {
                    stack.extend(next.iter().copied());
                }
            }
            reached.sort_unstable();
            servants.insert(master, reached);
        }

        Self { servants }
    }

    /// All direct and indirect servants of a vertex, in ascending order.
    /// Empty if the vertex is not a master.
    #[inline]
    pub fn servants_of(&self, vertex: usize) -> &[usize] {
        self.servants
            .get(&vertex)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check whether the vertex is a servant of some other vertex.
    pub fn is_servant(&self, vertex: usize) -> bool {
        self.servants.values().any(|s| s.binary_search(&vertex).is_ok())
    }

    /// Number of vertices with at least one servant.
    #[inline]
    pub fn master_count(&self) -> usize {
        self.servants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(master: usize, servant: usize, ident: usize) -> PeriodicPair {
        PeriodicPair {
            master,
            servant,
            ident,
        }
    }

    #[test]
    fn multi_hop_servants_are_found() {
        // corners of a doubly periodic square:
        // 0 -x-> 2, 0 -y-> 6, 2 -y-> 8, 6 -x-> 8
        let pairs = [pair(0, 2, 0), pair(6, 8, 0), pair(0, 6, 1), pair(2, 8, 1)];
        let closure = PeriodicClosure::new(&pairs);

        assert_eq!(closure.servants_of(0), &[2, 6, 8]);
        assert_eq!(closure.servants_of(2), &[8]);
        assert_eq!(closure.servants_of(6), &[8]);
        assert!(closure.servants_of(8).is_empty());
        assert_eq!(closure.master_count(), 3);

        assert!(closure.is_servant(8));
        assert!(!closure.is_servant(0));
    }

    #[test]
    fn cycles_terminate() {
        let pairs = [pair(0, 1, 0), pair(1, 2, 0), pair(2, 0, 0)];
        let closure = PeriodicClosure::new(&pairs);
        assert_eq!(closure.servants_of(0), &[1, 2]);
        assert_eq!(closure.servants_of(1), &[0, 2]);
    }

    #[test]
    fn no_pairs() {
        let closure = PeriodicClosure::new(&[]);
        assert_eq!(closure.master_count(), 0);
        assert!(closure.servants_of(3).is_empty());
    }
}
