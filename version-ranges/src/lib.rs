// SPDX-License-Identifier: MPL-2.0

//! Interval algebra over totally ordered versions.
//!
//! Two types are provided:
//!  - [`Range`] is one contiguous interval. Each edge is a [`Bound`]: `Included` when the edge
//!    version is part of the interval, `Excluded` when it is not, `Unbounded` when there is no
//!    edge on that side. [`Range::full`] is the "any" interval and [`Range::empty`] holds nothing.
//!  - [`ConstraintSet`] is either a single [`Range`] or a union of several ranges. Unions are
//!    always kept sorted, disjoint and non-touching: every operation re-normalises its output,
//!    so a union that collapses into one interval becomes [`ConstraintSet::Single`] again.
//!
//! You can construct a basic range from one of the following building blocks. All other sets are
//! concatenation, union, and complement of these.
//!  - [empty()](Range::empty): No version
//!  - [full()](Range::full): All versions
//!  - [singleton(v)](Range::singleton): Only the version v exactly
//!  - [higher_than(v)](Range::higher_than): All versions `v <= versions`
//!  - [strictly_higher_than(v)](Range::strictly_higher_than): All versions `v < versions`
//!  - [lower_than(v)](Range::lower_than): All versions `versions <= v`
//!  - [strictly_lower_than(v)](Range::strictly_lower_than): All versions `versions < v`
//!  - [between(v1, v2)](Range::between): All versions `v1 <= versions < v2`
//!
//! A constraint such as `!=1.2.0` cannot be written as one interval, it is the union
//! `<1.2.0 | >1.2.0`:
//!
//! ```
//! use version_ranges::{ConstraintSet, Range};
//!
//! let not_12: ConstraintSet<u32> = ConstraintSet::singleton(12u32).complement();
//! assert_eq!(not_12.ranges().len(), 2);
//! assert!(!not_12.contains(&12));
//! assert_eq!(not_12.union_range(&Range::singleton(12u32)), ConstraintSet::full());
//! ```
//!
//! Equality is structural. Given a `ConstraintSet<u32>`, the sets `>1, <2` and `∅` are reported
//! as unequal even though no integer lies in the first one: the algebra does not know which
//! versions exist between two edges.
//!
//! ## Optional features
//!
//! * `serde`: serialization and deserialization, given that the version type also supports it.
//! * `proptest`: exports a proptest strategy for [`ConstraintSet<u32>`].

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::ops::RangeBounds;

#[cfg(any(feature = "proptest", test))]
use proptest::prelude::*;
use smallvec::SmallVec;

type Interval<V> = (Bound<V>, Bound<V>);

/// Borrowed view of an interval, cheap to copy around while comparing edges.
type Edges<'a, V> = (Bound<&'a V>, Bound<&'a V>);

// RANGE #######################################################################

/// One contiguous interval of versions.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Range<V> {
    /// `None` is the empty interval, `Some` always holds a valid segment.
    bounds: Option<Interval<V>>,
}

impl<V> Range<V> {
    /// Empty interval.
    pub fn empty() -> Self {
        Self { bounds: None }
    }

    /// The "any" interval, without edges.
    pub fn full() -> Self {
        Self {
            bounds: Some((Unbounded, Unbounded)),
        }
    }

    /// All versions higher or equal to some version.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self {
            bounds: Some((Included(v.into()), Unbounded)),
        }
    }

    /// All versions strictly higher than some version.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self {
            bounds: Some((Excluded(v.into()), Unbounded)),
        }
    }

    /// All versions lower or equal to some version.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self {
            bounds: Some((Unbounded, Included(v.into()))),
        }
    }

    /// All versions strictly lower than some version.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self {
            bounds: Some((Unbounded, Excluded(v.into()))),
        }
    }

    /// Whether no version can be in this interval.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Whether this interval has no edge at all.
    pub fn is_full(&self) -> bool {
        matches!(self.bounds, Some((Unbounded, Unbounded)))
    }

    /// Lower edge, `None` for the empty interval.
    pub fn min(&self) -> Option<Bound<&V>> {
        self.bounds.as_ref().map(|(start, _)| start.as_ref())
    }

    /// Upper edge, `None` for the empty interval.
    pub fn max(&self) -> Option<Bound<&V>> {
        self.bounds.as_ref().map(|(_, end)| end.as_ref())
    }

    /// Whether the lower edge version belongs to the interval.
    pub fn include_min(&self) -> bool {
        matches!(self.bounds, Some((Included(_), _)))
    }

    /// Whether the upper edge version belongs to the interval.
    pub fn include_max(&self) -> bool {
        matches!(self.bounds, Some((_, Included(_))))
    }

    fn edges(&self) -> Option<Edges<'_, V>> {
        self.bounds
            .as_ref()
            .map(|(start, end)| (start.as_ref(), end.as_ref()))
    }
}

impl<V: Clone> Range<V> {
    /// Interval containing exactly one version.
    pub fn singleton(v: impl Into<V>) -> Self {
        let v = v.into();
        Self {
            bounds: Some((Included(v.clone()), Included(v))),
        }
    }
}

impl<V: Ord> Range<V> {
    /// Build an interval from its two edges.
    /// Edges that leave no room for any version produce the empty interval.
    pub fn new(min: Bound<V>, max: Bound<V>) -> Self {
        if valid_segment(&min, &max) {
            Self {
                bounds: Some((min, max)),
            }
        } else {
            Self::empty()
        }
    }

    /// Versions greater or equal to `v1` but less than `v2`.
    pub fn between(v1: impl Into<V>, v2: impl Into<V>) -> Self {
        Self::new(Included(v1.into()), Excluded(v2.into()))
    }

    /// Build an interval from optional edges and their inclusion flags.
    /// A missing edge is unbounded and its flag is ignored.
    pub fn from_edges(min: Option<V>, max: Option<V>, include_min: bool, include_max: bool) -> Self {
        let edge = |v: Option<V>, include: bool| match v {
            None => Unbounded,
            Some(v) if include => Included(v),
            Some(v) => Excluded(v),
        };
        Self::new(edge(min, include_min), edge(max, include_max))
    }

    /// Construct an interval from anything that impls [RangeBounds] like `v1..v2`.
    pub fn from_range_bounds<R, IV>(bounds: R) -> Self
    where
        R: RangeBounds<IV>,
        IV: Clone + Into<V>,
    {
        let start = bounds.start_bound().cloned().map(Into::into);
        let end = bounds.end_bound().cloned().map(Into::into);
        Self::new(start, end)
    }

    /// Returns true if the interval contains the specified version.
    pub fn contains(&self, version: &V) -> bool {
        self.edges()
            .is_some_and(|(start, end)| within_bounds(version, start, end) == Ordering::Equal)
    }

    /// If the interval holds exactly one version, return it.
    pub fn as_singleton(&self) -> Option<&V> {
        match &self.bounds {
            Some((Included(v1), Included(v2))) if v1 == v2 => Some(v1),
            _ => None,
        }
    }

    /// Whether at least one version can be in both intervals.
    pub fn allows_any(&self, other: &Self) -> bool {
        match (self.edges(), other.edges()) {
            (Some((ls, le)), Some((rs, re))) => {
                let end = if left_end_is_smaller(le, re) { le } else { re };
                valid_segment(&max_start(ls, rs), &end)
            }
            _ => false,
        }
    }

    /// Whether every version of `other` is also in `self`.
    pub fn allows_all(&self, other: &Self) -> bool {
        match (self.edges(), other.edges()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some((ls, le)), Some((rs, re))) => {
                left_start_is_smaller(ls, rs) && left_end_is_smaller(re, le)
            }
        }
    }
}

impl<V: Ord + Clone> Range<V> {
    /// Intersection of two intervals, possibly empty.
    pub fn intersect(&self, other: &Self) -> Self {
        match (self.edges(), other.edges()) {
            (Some((ls, le)), Some((rs, re))) => {
                let end = if left_end_is_smaller(le, re) { le } else { re };
                Self::new(max_start(ls, rs).cloned(), end.cloned())
            }
            _ => Self::empty(),
        }
    }
}

impl<V> From<Range<V>> for ConstraintSet<V> {
    fn from(range: Range<V>) -> Self {
        Self::Single(range)
    }
}

// CONSTRAINT SET ##############################################################

/// A set of versions: either one interval or a normalised union of intervals.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintSet<V> {
    /// One interval, possibly empty or full.
    Single(Range<V>),
    /// At least two non-empty, sorted intervals with a gap between each of them.
    Union(SmallVec<[Range<V>; 2]>),
}

impl<V> ConstraintSet<V> {
    /// Empty set of versions.
    pub fn empty() -> Self {
        Self::Single(Range::empty())
    }

    /// Set of all possible versions.
    pub fn full() -> Self {
        Self::Single(Range::full())
    }

    /// Set of all versions higher or equal to some version.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self::Single(Range::higher_than(v))
    }

    /// Set of all versions strictly higher than some version.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self::Single(Range::strictly_higher_than(v))
    }

    /// Set of all versions lower or equal to some version.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self::Single(Range::lower_than(v))
    }

    /// Set of all versions strictly lower than some version.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self::Single(Range::strictly_lower_than(v))
    }

    /// The intervals making up this set, sorted. Empty only for the empty set.
    pub fn ranges(&self) -> &[Range<V>] {
        match self {
            Self::Single(range) if range.is_empty() => &[],
            Self::Single(range) => std::slice::from_ref(range),
            Self::Union(ranges) => ranges.as_slice(),
        }
    }

    /// Whether the set holds no version.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Single(range) if range.is_empty())
    }

    /// Whether the set holds every version.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Single(range) if range.is_full())
    }

    fn segments(&self) -> impl Iterator<Item = Edges<'_, V>> + '_ {
        self.ranges().iter().filter_map(Range::edges)
    }
}

impl<V: Clone> ConstraintSet<V> {
    /// Set containing exactly one version.
    pub fn singleton(v: impl Into<V>) -> Self {
        Self::Single(Range::singleton(v))
    }
}

impl<V: Ord> ConstraintSet<V> {
    /// Set of versions greater or equal to `v1` but less than `v2`.
    pub fn between(v1: impl Into<V>, v2: impl Into<V>) -> Self {
        Self::Single(Range::between(v1, v2))
    }

    /// Returns true if the set contains the specified version.
    pub fn contains(&self, version: &V) -> bool {
        match self {
            Self::Single(range) => range.contains(version),
            Self::Union(ranges) => ranges
                .binary_search_by(|range| match range.edges() {
                    // We need the segment wrt the version, within_bounds gives the opposite.
                    Some((start, end)) => within_bounds(version, start, end).reverse(),
                    None => Ordering::Less,
                })
                .is_ok(),
        }
    }

    /// If the set contains exactly a single version, return it.
    pub fn as_singleton(&self) -> Option<&V> {
        match self {
            Self::Single(range) => range.as_singleton(),
            Self::Union(_) => None,
        }
    }

    /// Smallest interval holding every version of the set, `None` if the set is empty.
    pub fn bounding_range(&self) -> Option<(Bound<&V>, Bound<&V>)> {
        let (start, _) = self.segments().next()?;
        let (_, end) = self.segments().last()?;
        Some((start, end))
    }

    /// Return true if no version can be contained in both `self` and `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let mut left_iter = self.segments().peekable();
        let mut right_iter = other.segments().peekable();

        while let Some(((left_start, left_end), (right_start, right_end))) =
            left_iter.peek().copied().zip(right_iter.peek().copied())
        {
            if !valid_segment(&right_start, &left_end) {
                left_iter.next();
            } else if !valid_segment(&left_start, &right_end) {
                right_iter.next();
            } else {
                return false;
            }
        }

        // The remaining element(s) can't intersect anymore
        true
    }

    /// Return true if every version contained in `self` is also contained in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        let mut containing_iter = other.segments();
        let mut subset_iter = self.segments();
        let Some(mut containing) = containing_iter.next() else {
            // As long as we have subset elements, we need containing elements
            return subset_iter.next().is_none();
        };

        for (subset_start, subset_end) in subset_iter {
            // Skip containing intervals ending before this subset interval starts.
            while !valid_segment(&subset_start, &containing.1) {
                match containing_iter.next() {
                    Some(next) => containing = next,
                    None => return false,
                }
            }
            if !left_start_is_smaller(containing.0, subset_start)
                || !left_end_is_smaller(subset_end, containing.1)
            {
                return false;
            }
        }

        true
    }

    /// Whether at least one version of `range` is in the set.
    pub fn allows_any(&self, range: &Range<V>) -> bool {
        self.ranges().iter().any(|r| r.allows_any(range))
    }

    fn check_invariants(self) -> Self {
        if cfg!(debug_assertions) {
            if let Self::Union(ranges) = &self {
                assert!(ranges.len() >= 2, "a union holds at least two intervals");
                let segments: Vec<_> = self.segments().collect();
                assert_eq!(segments.len(), ranges.len(), "a union holds no empty interval");
                for pair in segments.windows(2) {
                    assert!(end_before_start_with_gap(&pair[0].1, &pair[1].0));
                }
            }
        }
        self
    }
}

impl<V: Ord + Clone> ConstraintSet<V> {
    /// Union of all the given intervals.
    pub fn of(ranges: impl IntoIterator<Item = Range<V>>) -> Self {
        ranges
            .into_iter()
            .fold(Self::empty(), |set, range| set.union(&Self::Single(range)))
    }

    /// Add one interval to the set.
    pub fn union_range(&self, range: &Range<V>) -> Self {
        self.union(&Self::Single(range.clone()))
    }

    /// Returns the complement, which contains everything not included in `self`.
    pub fn complement(&self) -> Self {
        let segments: SmallVec<[Edges<'_, V>; 2]> = self.segments().collect();
        match segments.first() {
            // Complement of ∅ is ∞
            None => Self::full(),

            // Complement of ∞ is ∅
            Some((Unbounded, Unbounded)) => Self::empty(),

            // First high bound is +∞
            Some((Included(v), Unbounded)) => Self::strictly_lower_than((*v).clone()),
            Some((Excluded(v), Unbounded)) => Self::lower_than((*v).clone()),

            Some((Unbounded, Included(v))) => {
                Self::negate_segments(Excluded((*v).clone()), &segments[1..])
            }
            Some((Unbounded, Excluded(v))) => {
                Self::negate_segments(Included((*v).clone()), &segments[1..])
            }
            Some(_) => Self::negate_segments(Unbounded, &segments),
        }
    }

    /// Helper function performing the negation of intervals in segments.
    fn negate_segments(start: Bound<V>, segments: &[Edges<'_, V>]) -> Self {
        let mut complement_segments = SmallVec::new();
        let mut start = start;
        for &(v1, v2) in segments {
            complement_segments.push((
                start,
                match v1 {
                    Included(v) => Excluded(v.clone()),
                    Excluded(v) => Included(v.clone()),
                    Unbounded => unreachable!("only the first segment can start unbounded"),
                },
            ));
            start = match v2 {
                Included(v) => Excluded(v.clone()),
                Excluded(v) => Included(v.clone()),
                Unbounded => Unbounded,
            }
        }
        if !matches!(start, Unbounded) {
            complement_segments.push((start, Unbounded));
        }

        Self::from_segments(complement_segments)
    }

    /// Computes the union of this set and another.
    pub fn union(&self, other: &Self) -> Self {
        let mut output = SmallVec::new();
        let mut accumulator: Option<Edges<'_, V>> = None;
        let mut left_iter = self.segments().peekable();
        let mut right_iter = other.segments().peekable();
        loop {
            let smaller_interval = match (left_iter.peek().copied(), right_iter.peek().copied()) {
                (Some(left), Some(right)) => {
                    if left_start_is_smaller(left.0, right.0) {
                        left_iter.next();
                        left
                    } else {
                        right_iter.next();
                        right
                    }
                }
                (Some(left), None) => {
                    left_iter.next();
                    left
                }
                (None, Some(right)) => {
                    right_iter.next();
                    right
                }
                (None, None) => break,
            };

            accumulator = Some(match accumulator {
                None => smaller_interval,
                Some((acc_start, acc_end)) => {
                    if end_before_start_with_gap(&acc_end, &smaller_interval.0) {
                        output.push((acc_start.cloned(), acc_end.cloned()));
                        smaller_interval
                    } else {
                        let end = match (acc_end, smaller_interval.1) {
                            (_, Unbounded) | (Unbounded, _) => Unbounded,
                            (Included(l), Excluded(r) | Included(r)) if l == r => acc_end,
                            (Included(l) | Excluded(l), Included(r) | Excluded(r)) => {
                                if l > r {
                                    acc_end
                                } else {
                                    smaller_interval.1
                                }
                            }
                        };
                        (acc_start, end)
                    }
                }
            });
        }

        if let Some((start, end)) = accumulator {
            output.push((start.cloned(), end.cloned()));
        }

        Self::from_segments(output)
    }

    /// Computes the intersection of two sets of versions.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut output = SmallVec::new();
        let mut left_iter = self.segments().peekable();
        let mut right_iter = other.segments().peekable();
        // Every segment of the output is the intersection of one segment from each input.
        // Candidates are produced with an increasing `end`, so the output needs no sorting.
        while let Some(((left_start, left_end), (right_start, right_end))) =
            left_iter.peek().copied().zip(right_iter.peek().copied())
        {
            // The next smallest end comes from one of the inputs, advance that one.
            let (other_start, end) = if left_end_is_smaller(left_end, right_end) {
                left_iter.next();
                (right_start, left_end)
            } else {
                right_iter.next();
                (left_start, right_end)
            };
            // The segment `end` came from is valid, only the other start may be past `end`.
            if !valid_segment(&other_start, &end) {
                continue;
            }
            let start = max_start(left_start, right_start);
            output.push((start.cloned(), end.cloned()))
        }

        Self::from_segments(output)
    }

    fn from_segments(segments: SmallVec<[Interval<V>; 2]>) -> Self {
        let set = if segments.len() <= 1 {
            Self::Single(Range {
                bounds: segments.into_iter().next(),
            })
        } else {
            Self::Union(
                segments
                    .into_iter()
                    .map(|segment| Range {
                        bounds: Some(segment),
                    })
                    .collect(),
            )
        };
        set.check_invariants()
    }
}

// BOUNDS ######################################################################

/// The ordering of the version wrt to the interval.
/// ```text
///      |-------|
///   ^      ^      ^
///   less   equal  greater
/// ```
fn within_bounds<V: PartialOrd>(version: &V, start: Bound<&V>, end: Bound<&V>) -> Ordering {
    let below_lower_bound = match start {
        Excluded(start) => version <= start,
        Included(start) => version < start,
        Unbounded => false,
    };
    if below_lower_bound {
        return Ordering::Less;
    }
    let below_upper_bound = match end {
        Unbounded => true,
        Included(end) => version <= end,
        Excluded(end) => version < end,
    };
    if below_upper_bound {
        return Ordering::Equal;
    }
    Ordering::Greater
}

/// A valid segment is one where at least one version fits between start and end
fn valid_segment<T: PartialOrd>(start: &Bound<T>, end: &Bound<T>) -> bool {
    match (start, end) {
        // Singleton interval are allowed
        (Included(s), Included(e)) => s <= e,
        (Included(s), Excluded(e)) => s < e,
        (Excluded(s), Included(e)) => s < e,
        (Excluded(s), Excluded(e)) => s < e,
        (Unbounded, _) | (_, Unbounded) => true,
    }
}

/// The end of one interval is before the start of the next one, so they can't be concatenated
/// into a single interval.
/// ```text
/// True for these two:
///  |----|
///                |-----|
///       ^ end    ^ start
/// False for these two:
///  |----|
///     |-----|
/// Here it depends: If they both exclude the position they share, there is a version in between
/// them that blocks concatenation
///  |----|
///       |-----|
/// ```
fn end_before_start_with_gap<T: PartialOrd>(end: &Bound<T>, start: &Bound<T>) -> bool {
    match (end, start) {
        (_, Unbounded) => false,
        (Unbounded, _) => false,
        (Included(left), Included(right)) => left < right,
        (Included(left), Excluded(right)) => left < right,
        (Excluded(left), Included(right)) => left < right,
        (Excluded(left), Excluded(right)) => left <= right,
    }
}

fn left_start_is_smaller<T: PartialOrd>(left: Bound<T>, right: Bound<T>) -> bool {
    match (left, right) {
        (Unbounded, _) => true,
        (_, Unbounded) => false,
        (Included(l), Included(r)) => l <= r,
        (Excluded(l), Excluded(r)) => l <= r,
        (Included(l), Excluded(r)) => l <= r,
        (Excluded(l), Included(r)) => l < r,
    }
}

fn left_end_is_smaller<T: PartialOrd>(left: Bound<T>, right: Bound<T>) -> bool {
    match (left, right) {
        (_, Unbounded) => true,
        (Unbounded, _) => false,
        (Included(l), Included(r)) => l <= r,
        (Excluded(l), Excluded(r)) => l <= r,
        (Excluded(l), Included(r)) => l <= r,
        (Included(l), Excluded(r)) => l < r,
    }
}

/// The later of two start bounds.
fn max_start<T: Ord>(left: Bound<T>, right: Bound<T>) -> Bound<T> {
    match (left, right) {
        (Included(l), Included(r)) => Included(std::cmp::max(l, r)),
        (Excluded(l), Excluded(r)) => Excluded(std::cmp::max(l, r)),
        (Included(i), Excluded(e)) | (Excluded(e), Included(i)) => {
            if i <= e {
                Excluded(e)
            } else {
                Included(i)
            }
        }
        (s, Unbounded) | (Unbounded, s) => s,
    }
}

// REPORT ######################################################################

fn fmt_segment<V: Display + Eq>(f: &mut Formatter<'_>, segment: Edges<'_, V>) -> std::fmt::Result {
    match segment {
        (Unbounded, Unbounded) => write!(f, "*"),
        (Unbounded, Included(v)) => write!(f, "<={v}"),
        (Unbounded, Excluded(v)) => write!(f, "<{v}"),
        (Included(v), Unbounded) => write!(f, ">={v}"),
        (Included(v), Included(b)) => {
            if v == b {
                write!(f, "{v}")
            } else {
                write!(f, ">={v}, <={b}")
            }
        }
        (Included(v), Excluded(b)) => write!(f, ">={v}, <{b}"),
        (Excluded(v), Unbounded) => write!(f, ">{v}"),
        (Excluded(v), Included(b)) => write!(f, ">{v}, <={b}"),
        (Excluded(v), Excluded(b)) => write!(f, ">{v}, <{b}"),
    }
}

impl<V: Display + Eq> Display for Range<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.edges() {
            None => write!(f, "∅"),
            Some(segment) => fmt_segment(f, segment),
        }
    }
}

impl<V: Display + Eq> Display for ConstraintSet<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "∅");
        }
        for (idx, segment) in self.segments().enumerate() {
            if idx > 0 {
                write!(f, " | ")?;
            }
            fmt_segment(f, segment)?;
        }
        Ok(())
    }
}

/// Generate version sets from a random vector of deltas between randomly inclusive or exclusive
/// bounds.
#[cfg(any(feature = "proptest", test))]
pub fn proptest_strategy() -> impl Strategy<Value = ConstraintSet<u32>> {
    (
        any::<bool>(),
        prop::collection::vec(any::<(u32, bool)>(), 1..10),
    )
        .prop_map(|(start_unbounded, deltas)| {
            let mut start = if start_unbounded {
                Some(Unbounded)
            } else {
                None
            };
            let mut largest: u32 = 0;
            let mut last_bound_was_inclusive = false;
            let mut segments = SmallVec::new();
            for (delta, inclusive) in deltas {
                // Add the offset to the current bound
                largest = match largest.checked_add(delta) {
                    Some(s) => s,
                    None => {
                        // Skip this offset, if it would result in a too large bound.
                        continue;
                    }
                };

                let current_bound = if inclusive {
                    Included(largest)
                } else {
                    Excluded(largest)
                };

                // If we already have a start bound, the next offset defines the complete range.
                // If we don't have a start bound, we have to generate one.
                if let Some(start_bound) = start.take() {
                    // If the delta from the start bound is 0, the only authorized configuration is
                    // Included(x), Included(x)
                    if delta == 0 && !(matches!(start_bound, Included(_)) && inclusive) {
                        start = Some(start_bound);
                        continue;
                    }
                    last_bound_was_inclusive = inclusive;
                    segments.push((start_bound, current_bound));
                } else {
                    // If the delta from the end bound of the last range is 0 and
                    // any of the last ending or current starting bound is inclusive,
                    // we skip the delta because they basically overlap.
                    if delta == 0 && (last_bound_was_inclusive || inclusive) {
                        continue;
                    }
                    start = Some(current_bound);
                }
            }

            // If we still have a start bound, but didn't have enough deltas to complete another
            // segment, we add an unbounded upperbound.
            if let Some(start_bound) = start {
                segments.push((start_bound, Unbounded));
            }

            ConstraintSet::from_segments(segments)
        })
}

#[cfg(test)]
pub mod tests {
    use proptest::prelude::*;

    use super::*;

    fn version_strat() -> impl Strategy<Value = u32> {
        any::<u32>()
    }

    proptest! {

        // Testing serde ----------------------------------

        #[cfg(feature = "serde")]
        #[test]
        fn serde_round_trip(set in proptest_strategy()) {
            let s = ron::ser::to_string(&set).unwrap();
            let r = ron::de::from_str(&s).unwrap();
            assert_eq!(set, r);
        }

        // Testing complement ------------------------------

        #[test]
        fn complement_is_different(set in proptest_strategy()) {
            assert_ne!(set.complement(), set);
        }

        #[test]
        fn double_complement_is_identity(set in proptest_strategy()) {
            assert_eq!(set.complement().complement(), set);
        }

        #[test]
        fn complement_contains_opposite(set in proptest_strategy(), version in version_strat()) {
            assert_ne!(set.contains(&version), set.complement().contains(&version));
        }

        // Testing intersection ----------------------------

        #[test]
        fn intersection_is_symmetric(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            assert_eq!(s1.intersection(&s2), s2.intersection(&s1));
        }

        #[test]
        fn intersection_with_any_is_identity(set in proptest_strategy()) {
            assert_eq!(ConstraintSet::full().intersection(&set), set);
        }

        #[test]
        fn intersection_with_none_is_none(set in proptest_strategy()) {
            assert_eq!(ConstraintSet::empty().intersection(&set), ConstraintSet::empty());
        }

        #[test]
        fn intersection_is_idempotent(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            assert_eq!(s1.intersection(&s2).intersection(&s2), s1.intersection(&s2));
        }

        #[test]
        fn intersection_is_associative(s1 in proptest_strategy(), s2 in proptest_strategy(), s3 in proptest_strategy()) {
            assert_eq!(s1.intersection(&s2).intersection(&s3), s1.intersection(&s2.intersection(&s3)));
        }

        #[test]
        fn intersection_of_complements_is_none(set in proptest_strategy()) {
            assert_eq!(set.complement().intersection(&set), ConstraintSet::empty());
        }

        #[test]
        fn intersection_contains_both(s1 in proptest_strategy(), s2 in proptest_strategy(), version in version_strat()) {
            assert_eq!(s1.intersection(&s2).contains(&version), s1.contains(&version) && s2.contains(&version));
        }

        // Testing union -----------------------------------

        #[test]
        fn union_of_complements_is_any(set in proptest_strategy()) {
            assert_eq!(set.complement().union(&set), ConstraintSet::full());
        }

        #[test]
        fn union_is_symmetric(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            assert_eq!(s1.union(&s2), s2.union(&s1));
        }

        #[test]
        fn union_is_associative(s1 in proptest_strategy(), s2 in proptest_strategy(), s3 in proptest_strategy()) {
            assert_eq!(s1.union(&s2).union(&s3), s1.union(&s2.union(&s3)));
        }

        #[test]
        fn union_contains_either(s1 in proptest_strategy(), s2 in proptest_strategy(), version in version_strat()) {
            assert_eq!(s1.union(&s2).contains(&version), s1.contains(&version) || s2.contains(&version));
        }

        #[test]
        fn union_through_intersection(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            let union_def = s1
                .complement()
                .intersection(&s2.complement())
                .complement();
            assert_eq!(s1.union(&s2), union_def);
        }

        #[test]
        fn union_of_own_ranges_is_identity(set in proptest_strategy()) {
            assert_eq!(ConstraintSet::of(set.ranges().iter().cloned()), set);
        }

        // Testing relations -------------------------------

        #[test]
        fn is_disjoint_through_intersection(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            let disjoint_def = s1.intersection(&s2) == ConstraintSet::empty();
            assert_eq!(s1.is_disjoint(&s2), disjoint_def);
        }

        #[test]
        fn subset_of_through_intersection(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            let subset_def = s1.intersection(&s2) == s1;
            assert_eq!(s1.subset_of(&s2), subset_def);
        }

        #[test]
        fn allows_any_through_ranges(s1 in proptest_strategy(), s2 in proptest_strategy()) {
            for range in s2.ranges() {
                let through_sets = !s1.is_disjoint(&ConstraintSet::from(range.clone()));
                assert_eq!(s1.allows_any(range), through_sets);
            }
        }

        // Testing contains --------------------------------

        #[test]
        fn always_contains_exact(version in version_strat()) {
            assert!(ConstraintSet::<u32>::singleton(version).contains(&version));
        }

        #[test]
        fn contains_intersection(set in proptest_strategy(), version in version_strat()) {
            assert_eq!(set.contains(&version), set.intersection(&ConstraintSet::singleton(version)) != ConstraintSet::empty());
        }

        #[test]
        fn contains_through_ranges(set in proptest_strategy(), versions in proptest::collection::vec(version_strat(), ..30)) {
            for v in versions {
                assert_eq!(set.contains(&v), set.ranges().iter().any(|r| r.contains(&v)));
            }
        }

        #[test]
        fn contains_bounding_range(set in proptest_strategy(), version in version_strat()) {
            if set.contains(&version) {
                let (start, end) = set.bounding_range().unwrap();
                assert!(Range::new(start.cloned(), end.cloned()).contains(&version));
            }
        }

        #[test]
        fn from_range_bounds(bounds in any::<(Bound<u32>, Bound<u32>)>(), version in version_strat()) {
            let range: Range<u32> = Range::from_range_bounds(bounds);
            assert_eq!(bounds.contains(&version), range.contains(&version));
        }

        #[test]
        fn range_intersect_matches_set_intersection(b1 in any::<(Bound<u32>, Bound<u32>)>(), b2 in any::<(Bound<u32>, Bound<u32>)>()) {
            let r1: Range<u32> = Range::from_range_bounds(b1);
            let r2: Range<u32> = Range::from_range_bounds(b2);
            let through_sets = ConstraintSet::from(r1.clone()).intersection(&ConstraintSet::from(r2.clone()));
            assert_eq!(ConstraintSet::from(r1.intersect(&r2)), through_sets);
            assert_eq!(r1.allows_any(&r2), !through_sets.is_empty());
        }
    }

    #[test]
    fn between_contains_inner_version() {
        let range: Range<u32> = Range::between(1u32, 3u32);
        assert!(range.contains(&1));
        assert!(range.contains(&2));
        assert!(!range.contains(&3));
    }

    #[test]
    fn touching_exclusive_ranges_do_not_intersect() {
        let low: Range<u32> = Range::from_edges(Some(1), Some(2), false, false);
        let high: Range<u32> = Range::from_edges(Some(2), Some(3), false, false);
        assert!(low.intersect(&high).is_empty());
        assert!(!low.allows_any(&high));

        let half_open: Range<u32> = Range::between(1u32, 2u32);
        let next: Range<u32> = Range::between(2u32, 3u32);
        assert!(half_open.intersect(&next).is_empty());
    }

    #[test]
    fn degenerate_edges_are_empty() {
        assert!(Range::<u32>::from_edges(Some(2), Some(2), true, false).is_empty());
        assert!(Range::<u32>::between(3u32, 1u32).is_empty());
        assert_eq!(
            Range::<u32>::from_edges(Some(2), Some(2), true, true).as_singleton(),
            Some(&2)
        );
    }

    #[test]
    fn edges_and_flags() {
        let range: Range<u32> = Range::from_edges(Some(1), None, true, true);
        assert_eq!(range.min(), Some(Included(&1)));
        assert_eq!(range.max(), Some(Unbounded));
        assert!(range.include_min());
        assert!(!range.include_max());
        assert!(range.allows_all(&Range::singleton(5u32)));
        assert!(!range.allows_all(&Range::full()));
    }

    #[test]
    fn adjacent_ranges_collapse_into_single() {
        let set = ConstraintSet::of([
            Range::<u32>::between(1u32, 3u32),
            Range::<u32>::between(3u32, 5u32),
        ]);
        assert_eq!(set, ConstraintSet::between(1u32, 5u32));

        let gap = ConstraintSet::of([
            Range::<u32>::between(1u32, 3u32),
            Range::<u32>::between(4u32, 5u32),
        ]);
        assert!(matches!(gap, ConstraintSet::Union(ref ranges) if ranges.len() == 2));
    }

    #[test]
    fn not_equal_is_a_union() {
        let not_two = ConstraintSet::<u32>::singleton(2u32).complement();
        assert_eq!(
            not_two,
            ConstraintSet::of([Range::strictly_lower_than(2u32), Range::strictly_higher_than(2u32)])
        );
        assert_eq!(not_two.to_string(), "<2 | >2");
        assert_eq!(
            not_two.intersection(&ConstraintSet::between(2u32, 3u32)),
            ConstraintSet::Single(Range::from_edges(Some(2), Some(3), false, false))
        );
    }

    #[test]
    fn display() {
        assert_eq!(ConstraintSet::<u32>::empty().to_string(), "∅");
        assert_eq!(ConstraintSet::<u32>::full().to_string(), "*");
        assert_eq!(ConstraintSet::<u32>::between(1u32, 2u32).to_string(), ">=1, <2");
        assert_eq!(ConstraintSet::<u32>::singleton(4u32).to_string(), "4");
    }
}
