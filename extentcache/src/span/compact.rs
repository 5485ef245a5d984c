//! Memory-dense storage for large sequences of time spans.
//!
//! A [`CompactSpanStore`] keeps every boundary value in one flat `Vec<i64>`
//! instead of allocating one object per span. Span shapes are recovered from
//! three sorted index lists:
//!
//! - `bounded`: indices that begin a two-value `[start, end)` pair
//! - `unbounded_start`: indices holding the end of an unbounded-start span
//! - `unbounded_end`: indices holding the start of an unbounded-end span
//!
//! A value in none of the lists is an instant, except the sentinel
//! [`TIMELESS_SENTINEL`], which decodes to [`TimeSpan::TIMELESS`]. An instant
//! at the sentinel itself is stored as a zero-width bounded pair so that it
//! round-trips exactly.
//!
//! Because the store is append-only the index lists stay sorted, and
//! iteration walks them with forward-only cursors.

use super::TimeSpan;

/// The lone value that encodes TIMELESS.
pub const TIMELESS_SENTINEL: i64 = 0;

/// Append-only, memory-dense sequence of time spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactSpanStore {
    values: Vec<i64>,
    bounded: Vec<usize>,
    unbounded_start: Vec<usize>,
    unbounded_end: Vec<usize>,
    len: usize,
}

impl CompactSpanStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store sized for roughly `spans` bounded spans.
    pub fn with_capacity(spans: usize) -> Self {
        Self {
            values: Vec::with_capacity(spans * 2),
            bounded: Vec::with_capacity(spans),
            ..Self::default()
        }
    }

    /// Append one span.
    pub fn push(&mut self, span: TimeSpan) {
        let index = self.values.len();
        match (span.start(), span.end()) {
            (None, None) => self.values.push(TIMELESS_SENTINEL),
            (None, Some(end)) => {
                self.unbounded_start.push(index);
                self.values.push(end);
            }
            (Some(start), None) => {
                self.unbounded_end.push(index);
                self.values.push(start);
            }
            (Some(start), Some(end)) if start == end && start != TIMELESS_SENTINEL => {
                self.values.push(start);
            }
            (Some(start), Some(end)) => {
                self.bounded.push(index);
                self.values.push(start);
                self.values.push(end);
            }
        }
        self.len += 1;
    }

    /// Append many spans.
    pub fn append<I>(&mut self, spans: I)
    where
        I: IntoIterator<Item = TimeSpan>,
    {
        for span in spans {
            self.push(span);
        }
    }

    /// Remove every span, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.values.clear();
        self.bounded.clear();
        self.unbounded_start.clear();
        self.unbounded_end.clear();
        self.len = 0;
    }

    /// Number of spans stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of raw boundary values held.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// The smallest span covering every stored span, or `None` when empty.
    pub fn extent(&self) -> Option<TimeSpan> {
        let mut bounds: Option<(i128, i128)> = None;
        for span in self.iter() {
            let (lo, hi) = (span.lo(), span.hi());
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        bounds.map(|(lo, hi)| TimeSpan::from_bounds(lo, hi))
    }

    /// Iterate the spans in insertion order.
    pub fn iter(&self) -> CompactSpanIter<'_> {
        CompactSpanIter {
            store: self,
            position: 0,
            bounded: 0,
            unbounded_start: 0,
            unbounded_end: 0,
        }
    }
}

/// Forward-only iterator reconstructing spans from a [`CompactSpanStore`].
pub struct CompactSpanIter<'a> {
    store: &'a CompactSpanStore,
    position: usize,
    bounded: usize,
    unbounded_start: usize,
    unbounded_end: usize,
}

impl CompactSpanIter<'_> {
    fn at(list: &[usize], cursor: usize, position: usize) -> bool {
        list.get(cursor) == Some(&position)
    }
}

impl Iterator for CompactSpanIter<'_> {
    type Item = TimeSpan;

    fn next(&mut self) -> Option<TimeSpan> {
        let store = self.store;
        let value = *store.values.get(self.position)?;

        let span = if Self::at(&store.bounded, self.bounded, self.position) {
            self.bounded += 1;
            let end = store.values.get(self.position + 1).copied().unwrap_or(value);
            self.position += 1;
            TimeSpan::new(value, end).unwrap_or_else(|_| TimeSpan::instant(value))
        } else if Self::at(&store.unbounded_start, self.unbounded_start, self.position) {
            self.unbounded_start += 1;
            TimeSpan::unbounded_start(value)
        } else if Self::at(&store.unbounded_end, self.unbounded_end, self.position) {
            self.unbounded_end += 1;
            TimeSpan::unbounded_end(value)
        } else if value == TIMELESS_SENTINEL {
            TimeSpan::TIMELESS
        } else {
            TimeSpan::instant(value)
        };

        self.position += 1;
        Some(span)
    }
}

impl<'a> IntoIterator for &'a CompactSpanStore {
    type Item = TimeSpan;
    type IntoIter = CompactSpanIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<TimeSpan> for CompactSpanStore {
    fn extend<I: IntoIterator<Item = TimeSpan>>(&mut self, iter: I) {
        self.append(iter);
    }
}

impl FromIterator<TimeSpan> for CompactSpanStore {
    fn from_iter<I: IntoIterator<Item = TimeSpan>>(iter: I) -> Self {
        let mut store = Self::new();
        store.append(iter);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mixed_spans() -> Vec<TimeSpan> {
        vec![
            TimeSpan::new(100, 200).unwrap(),
            TimeSpan::unbounded_start(50),
            TimeSpan::unbounded_end(300),
            TimeSpan::instant(150),
            TimeSpan::TIMELESS,
            TimeSpan::instant(0),
            TimeSpan::new(-20, -10).unwrap(),
        ]
    }

    #[test]
    fn test_round_trip_mixed_shapes() {
        let spans = mixed_spans();
        let store: CompactSpanStore = spans.iter().copied().collect();

        assert_eq!(store.len(), spans.len());
        let decoded: Vec<TimeSpan> = store.iter().collect();
        assert_eq!(decoded, spans);
    }

    #[test]
    fn test_instant_uses_single_value() {
        let mut store = CompactSpanStore::new();
        store.push(TimeSpan::instant(42));
        assert_eq!(store.value_count(), 1);

        store.push(TimeSpan::new(1, 2).unwrap());
        assert_eq!(store.value_count(), 3);
    }

    #[test]
    fn test_extent_bounded() {
        let store: CompactSpanStore = vec![
            TimeSpan::new(10, 20).unwrap(),
            TimeSpan::instant(5),
            TimeSpan::new(15, 40).unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(store.extent(), Some(TimeSpan::new(5, 40).unwrap()));
    }

    #[test]
    fn test_extent_unbounded_and_empty() {
        let mut store = CompactSpanStore::new();
        assert_eq!(store.extent(), None);

        store.push(TimeSpan::new(10, 20).unwrap());
        store.push(TimeSpan::unbounded_end(15));
        assert_eq!(store.extent(), Some(TimeSpan::unbounded_end(10)));

        store.push(TimeSpan::TIMELESS);
        assert_eq!(store.extent(), Some(TimeSpan::TIMELESS));
    }

    #[test]
    fn test_clear() {
        let mut store: CompactSpanStore = mixed_spans().into_iter().collect();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.iter().count(), 0);

        store.push(TimeSpan::instant(9));
        assert_eq!(store.iter().collect::<Vec<_>>(), vec![TimeSpan::instant(9)]);
    }

    fn arb_span() -> impl Strategy<Value = TimeSpan> {
        prop_oneof![
            (any::<i32>(), 0i64..10_000)
                .prop_map(|(s, w)| TimeSpan::new(s as i64, s as i64 + w).unwrap()),
            any::<i32>().prop_map(|t| TimeSpan::instant(t as i64)),
            any::<i32>().prop_map(|t| TimeSpan::unbounded_start(t as i64)),
            any::<i32>().prop_map(|t| TimeSpan::unbounded_end(t as i64)),
            Just(TimeSpan::TIMELESS),
        ]
    }

    proptest! {
        #[test]
        fn prop_round_trip(spans in proptest::collection::vec(arb_span(), 0..64)) {
            let store: CompactSpanStore = spans.iter().copied().collect();
            let decoded: Vec<TimeSpan> = store.iter().collect();
            prop_assert_eq!(decoded, spans);
        }
    }
}
