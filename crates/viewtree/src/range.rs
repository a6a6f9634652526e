//! Key ranges of navigable views.

use std::cmp::Ordering;
use std::ops::Bound;

/// A possibly unbounded interval of keys.
///
/// Range views of sorted sets and maps store one of these as their local
/// base: the view presents the elements of the base that fall inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange<T> {
    lower: Bound<T>,
    upper: Bound<T>,
}

impl<T> Default for KeyRange<T> {
    fn default() -> Self {
        Self::full()
    }
}

impl<T> KeyRange<T> {
    /// The range containing every key.
    pub fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Whether neither end is bounded.
    pub fn is_full(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        )
    }

    /// The lower bound.
    pub fn lower(&self) -> Bound<&T> {
        self.lower.as_ref()
    }

    /// The upper bound.
    pub fn upper(&self) -> Bound<&T> {
        self.upper.as_ref()
    }

    /// Both bounds, in the form `BTreeMap::range` accepts.
    pub fn bounds(&self) -> (Bound<&T>, Bound<&T>) {
        (self.lower.as_ref(), self.upper.as_ref())
    }
}

impl<T: Ord + Clone> KeyRange<T> {
    /// Whether the key lies inside the range.
    pub fn contains(&self, key: &T) -> bool {
        let above = match &self.lower {
            Bound::Included(lower) => key >= lower,
            Bound::Excluded(lower) => key > lower,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(upper) => key <= upper,
            Bound::Excluded(upper) => key < upper,
            Bound::Unbounded => true,
        };
        above && below
    }

    /// Whether no key can lie inside the range.
    ///
    /// `BTreeMap::range` panics on such ranges; callers check this first.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lower), Bound::Included(upper)) => lower > upper,
            (Bound::Included(lower), Bound::Excluded(upper))
            | (Bound::Excluded(lower), Bound::Included(upper))
            | (Bound::Excluded(lower), Bound::Excluded(upper)) => lower >= upper,
            _ => false,
        }
    }

    /// Whether a new bound at `key` stays within this range.
    ///
    /// An inclusive bound must lie inside the range; an exclusive one may
    /// also sit on one of the range's own exclusive ends.
    fn admits_bound(&self, key: &T, inclusive: bool) -> bool {
        if inclusive {
            return self.contains(key);
        }
        let above = match &self.lower {
            Bound::Included(lower) | Bound::Excluded(lower) => key >= lower,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(upper) | Bound::Excluded(upper) => key <= upper,
            Bound::Unbounded => true,
        };
        above && below
    }

    /// Narrow the upper end to `key`; `None` if `key` lies outside the range.
    pub fn with_upper(&self, key: &T, inclusive: bool) -> Option<Self> {
        self.admits_bound(key, inclusive).then(|| Self {
            lower: self.lower.clone(),
            upper: bound(key, inclusive),
        })
    }

    /// Narrow the lower end to `key`; `None` if `key` lies outside the range.
    pub fn with_lower(&self, key: &T, inclusive: bool) -> Option<Self> {
        self.admits_bound(key, inclusive).then(|| Self {
            lower: bound(key, inclusive),
            upper: self.upper.clone(),
        })
    }

    /// Narrow both ends; `None` if either lies outside the range or `from`
    /// sorts after `to`.
    pub fn with_bounds(&self, from: &T, from_inclusive: bool, to: &T, to_inclusive: bool) -> Option<Self> {
        if from.cmp(to) == Ordering::Greater {
            return None;
        }
        if !self.admits_bound(from, from_inclusive) || !self.admits_bound(to, to_inclusive) {
            return None;
        }
        Some(Self {
            lower: bound(from, from_inclusive),
            upper: bound(to, to_inclusive),
        })
    }
}

fn bound<T: Clone>(key: &T, inclusive: bool) -> Bound<T> {
    if inclusive {
        Bound::Included(key.clone())
    } else {
        Bound::Excluded(key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range() {
        let range: KeyRange<i32> = KeyRange::full();
        assert!(range.is_full());
        assert!(range.contains(&i32::MIN));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_narrowing() {
        let range = KeyRange::full().with_upper(&10, false).unwrap();
        assert!(range.contains(&9));
        assert!(!range.contains(&10));

        // An exclusive bound may sit on the parent's exclusive end.
        assert!(range.with_upper(&10, false).is_some());
        assert!(range.with_upper(&10, true).is_none());
        assert!(range.with_lower(&11, false).is_none());

        let inner = range.with_bounds(&2, true, &5, false).unwrap();
        assert!(inner.contains(&2));
        assert!(!inner.contains(&5));
        assert!(range.with_bounds(&5, true, &2, true).is_none());
    }

    #[test]
    fn test_empty_ranges() {
        let full: KeyRange<i32> = KeyRange::full();
        assert!(full.with_bounds(&3, true, &3, false).unwrap().is_empty());
        assert!(full.with_bounds(&3, false, &3, false).unwrap().is_empty());
        assert!(!full.with_bounds(&3, true, &3, true).unwrap().is_empty());
    }
}
