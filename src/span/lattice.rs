use std::fmt::Debug;

use super::types::ColumnResource;

/// A join-semilattice value propagated from base columns to query outputs.
///
/// `join_assign` must be commutative, associative and idempotent, and every
/// ascending chain must be finite; the recursive-CTE fixpoint relies on it.
pub trait Lattice: Clone + PartialEq + Debug {
    /// Least element (value of literals).
    fn bottom() -> Self;

    /// Join `other` into `self`, returning whether `self` changed.
    fn join_assign(&mut self, other: &Self) -> bool;

    /// True when no further join can change the value.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Join two values.
    fn join(mut self, other: &Self) -> Self {
        self.join_assign(other);
        self
    }

    /// Join every value of an iterator, stopping at a terminal value.
    fn join_all<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        let mut acc = Self::bottom();
        for value in values {
            acc.join_assign(value);
            if acc.is_terminal() {
                break;
            }
        }
        acc
    }
}

/// A propagation domain: a lattice plus the value a physical column starts with.
pub trait Domain {
    /// Lattice carried through the query.
    type Value: Lattice;

    /// Value of a physical column read from the catalog.
    fn column_value(&self, column: &ColumnResource) -> Self::Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Max-lattice over 0..=3 with 3 as the terminal element.
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Level(u8);

    impl Lattice for Level {
        fn bottom() -> Self {
            Level(0)
        }

        fn join_assign(&mut self, other: &Self) -> bool {
            if other.0 > self.0 {
                self.0 = other.0;
                return true;
            }
            false
        }

        fn is_terminal(&self) -> bool {
            self.0 == 3
        }
    }

    #[test]
    fn join_reports_change_only_when_value_grows() {
        let mut value = Level(1);
        assert!(value.join_assign(&Level(2)));
        assert!(!value.join_assign(&Level(1)));
        assert_eq!(value, Level(2));
    }

    #[test]
    fn join_all_stops_at_terminal() {
        let values = [Level(1), Level(3), Level(2)];
        assert_eq!(Level::join_all(values.iter()), Level(3));
        assert_eq!(Level::join_all(std::iter::empty()), Level(0));
    }
}
