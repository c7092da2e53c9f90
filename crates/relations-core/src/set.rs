// Position sets: the unit of set algebra for first/last/follow computation
// and automaton state identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::rule::Position;

/// A deduplicating set of rule positions.
///
/// Members are kept sorted, so two sets with the same members always have the
/// same representation and set equality is plain slice equality. Sets are
/// treated as immutable once they are stored in metadata or used as an
/// automaton state key; [`union`](Self::union) returns a fresh set.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct PositionSet {
    members: Vec<Position>,
}

impl PositionSet {
    /// Create a set from the given members. Duplicates are dropped.
    pub fn new(members: impl IntoIterator<Item = Position>) -> Self {
        let mut members: Vec<Position> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    /// Create a set holding a single position.
    pub fn singleton(position: Position) -> Self {
        Self {
            members: vec![position],
        }
    }

    /// Insert a position. Inserting an existing member is a no-op.
    pub fn add(&mut self, position: Position) {
        if let Err(idx) = self.members.binary_search(&position) {
            self.members.insert(idx, position);
        }
    }

    pub fn cardinality(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.members.binary_search(&position).is_ok()
    }

    /// Return the union of `self` and `other` without touching either.
    ///
    /// A missing set (`None`) behaves as the empty set, which lets callers
    /// pass `follow.get(&p)` directly for positions that have no followers.
    pub fn union(&self, other: Option<&PositionSet>) -> PositionSet {
        let Some(other) = other else {
            return self.clone();
        };

        // Linear merge of two sorted member lists.
        let (a, b) = (&self.members, &other.members);
        let mut members = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    members.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    members.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    members.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        members.extend_from_slice(&a[i..]);
        members.extend_from_slice(&b[j..]);
        PositionSet { members }
    }

    /// Set equality: same cardinality and every member of `self` is in `other`.
    pub fn equal(&self, other: &PositionSet) -> bool {
        self.cardinality() == other.cardinality()
            && self.members.iter().all(|&p| other.contains(p))
    }

    /// Rolling hash over the sorted members.
    ///
    /// Only meant for bucketing: different sets may share a hash, so a bucket
    /// hit must always be confirmed with [`equal`](Self::equal).
    pub fn stable_hash(&self) -> u32 {
        let Some(&first) = self.members.first() else {
            return 0;
        };
        self.members
            .iter()
            .fold(first, |k, &p| k.rotate_left(5) ^ p)
    }

    /// Iterate over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.members.iter().copied()
    }

    /// Members in ascending order.
    pub fn as_slice(&self) -> &[Position] {
        &self.members
    }
}

impl Hash for PositionSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.stable_hash());
    }
}

impl FromIterator<Position> for PositionSet {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for PositionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, p) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_contains_members() {
        let s = PositionSet::new([1, 2, 3]);
        assert_eq!(s.cardinality(), 3);
        assert!(s.contains(1));
        assert!(s.contains(2));
        assert!(s.contains(3));
        assert!(!s.contains(4));
    }

    #[test]
    fn no_duplicates() {
        let mut s = PositionSet::new([3, 1, 2, 3]);
        assert_eq!(s.cardinality(), 3);

        s.add(3);
        assert_eq!(s.cardinality(), 3);

        s.add(0);
        assert_eq!(s.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn union_leaves_operands_untouched() {
        let s = PositionSet::new([1, 2]);
        let o = PositionSet::new([2, 3]);
        let u = s.union(Some(&o));

        assert_eq!(u.cardinality(), 3);
        assert!(u.contains(1));
        assert!(u.contains(2));
        assert!(u.contains(3));
        assert_eq!(s.as_slice(), &[1, 2]);
        assert_eq!(o.as_slice(), &[2, 3]);
    }

    #[test]
    fn union_with_missing_set() {
        let s = PositionSet::new([4, 7]);
        assert_eq!(s.union(None), s);
        assert_eq!(PositionSet::default().union(Some(&s)), s);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let s = PositionSet::new([1, 2]);
        let mut o = PositionSet::default();
        o.add(2);
        o.add(1);
        assert!(s.equal(&o));
        assert_eq!(s, o);

        o.add(3);
        assert!(!s.equal(&o));
        assert_ne!(s, o);
    }

    #[test]
    fn stable_hash_depends_only_on_members() {
        let a = PositionSet::new([5, 1, 9]);
        let b = PositionSet::new([9, 5, 1, 1]);
        assert_eq!(a.stable_hash(), b.stable_hash());
        assert_eq!(PositionSet::default().stable_hash(), 0);
    }

    #[test]
    fn hashed_lookup_falls_back_to_equality() {
        use std::collections::HashMap;

        // {0, 33} and {1} collide under the rolling hash but are different sets.
        let a = PositionSet::new([0, 33]);
        let b = PositionSet::new([1]);
        assert_eq!(a.stable_hash(), b.stable_hash());
        assert!(!a.equal(&b));
        let mut map = HashMap::new();
        map.insert(a.clone(), "a");
        map.insert(b.clone(), "b");
        assert_eq!(map.len(), 2);
        assert_eq!(map[&a], "a");
        assert_eq!(map[&b], "b");
    }

    #[test]
    fn display_lists_members() {
        assert_eq!(PositionSet::new([3, 1]).to_string(), "{1, 3}");
        assert_eq!(PositionSet::default().to_string(), "{}");
    }
}
