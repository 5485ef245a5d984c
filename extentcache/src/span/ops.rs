//! Operations over lists of spans.
//!
//! All functions return spans in canonical form: sorted, pairwise disjoint,
//! and maximally merged (adjacent or overlapping runs coalesced).

use super::TimeSpan;

/// Coalesce spans into sorted, maximal, pairwise-disjoint runs.
///
/// Adjacent spans (`[a, b)` and `[b, c)`) merge into `[a, c)`. An instant is
/// absorbed only by a run holding it (`start <= t < end`); one sitting on a
/// run's exclusive end stays a separate span.
pub fn merge_spans<I>(spans: I) -> Vec<TimeSpan>
where
    I: IntoIterator<Item = TimeSpan>,
{
    let (instants, mut runs): (Vec<TimeSpan>, Vec<TimeSpan>) =
        spans.into_iter().partition(TimeSpan::is_instantaneous);
    runs.sort();

    let mut merged: Vec<TimeSpan> = Vec::with_capacity(runs.len() + instants.len());
    for span in runs {
        match merged.last_mut() {
            Some(current) if span.lo() <= current.hi() => {
                let hi = current.hi().max(span.hi());
                *current = TimeSpan::from_bounds(current.lo(), hi);
            }
            _ => merged.push(span),
        }
    }

    let run_count = merged.len();
    for instant in instants {
        let t = instant.lo();
        let held = merged[..run_count].iter().any(|run| run.contains_point(t))
            || merged[run_count..].contains(&instant);
        if !held {
            merged.push(instant);
        }
    }
    if merged.len() > run_count {
        merged.sort();
    }
    merged
}

/// Remove every span in `remove` from every span in `from`.
pub fn subtract_spans(from: &[TimeSpan], remove: &[TimeSpan]) -> Vec<TimeSpan> {
    let mut remaining = merge_spans(from.iter().copied());
    for cut in merge_spans(remove.iter().copied()) {
        if remaining.is_empty() {
            break;
        }
        remaining = remaining
            .iter()
            .flat_map(|span| span.subtract(&cut))
            .collect();
    }
    merge_spans(remaining)
}

/// Pairwise intersection of two span lists.
pub fn intersect_spans(a: &[TimeSpan], b: &[TimeSpan]) -> Vec<TimeSpan> {
    let a = merge_spans(a.iter().copied());
    let b = merge_spans(b.iter().copied());
    merge_spans(
        a.iter()
            .flat_map(|x| b.iter().filter_map(move |y| x.intersection(y))),
    )
}

/// Returns true if `span` is entirely covered by the union of `cover`.
pub fn covers_span(cover: &[TimeSpan], span: &TimeSpan) -> bool {
    subtract_spans(std::slice::from_ref(span), cover).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn span(s: i64, e: i64) -> TimeSpan {
        TimeSpan::new(s, e).unwrap()
    }

    #[test]
    fn test_merge_coalesces_adjacent_and_overlapping() {
        let merged = merge_spans(vec![span(20, 30), span(0, 10), span(10, 15), span(25, 40)]);
        assert_eq!(merged, vec![span(0, 15), span(20, 40)]);
    }

    #[test]
    fn test_merge_absorbs_only_held_instants() {
        let merged = merge_spans(vec![
            span(0, 10),
            TimeSpan::instant(0),
            TimeSpan::instant(5),
            TimeSpan::instant(50),
            TimeSpan::instant(50),
        ]);
        assert_eq!(merged, vec![span(0, 10), TimeSpan::instant(50)]);
    }

    #[test]
    fn test_merge_keeps_instant_at_exclusive_end() {
        let merged = merge_spans(vec![span(0, 10), TimeSpan::instant(10)]);
        assert_eq!(merged, vec![span(0, 10), TimeSpan::instant(10)]);

        // A later run starting there holds it.
        let merged = merge_spans(vec![span(0, 10), TimeSpan::instant(10), span(10, 20)]);
        assert_eq!(merged, vec![span(0, 20)]);
    }

    #[test]
    fn test_instant_at_exclusive_end_is_not_covered() {
        assert!(!covers_span(&[span(0, 10)], &TimeSpan::instant(10)));
        let loaded = merge_spans(vec![span(0, 10), TimeSpan::instant(10)]);
        assert!(covers_span(&loaded, &TimeSpan::instant(10)));
        assert!(subtract_spans(&[TimeSpan::instant(10)], &loaded).is_empty());
    }

    #[test]
    fn test_merge_unbounded() {
        let merged = merge_spans(vec![TimeSpan::unbounded_start(5), span(3, 8)]);
        assert_eq!(merged, vec![TimeSpan::unbounded_start(8)]);

        let merged = merge_spans(vec![TimeSpan::unbounded_start(5), TimeSpan::unbounded_end(5)]);
        assert_eq!(merged, vec![TimeSpan::TIMELESS]);
    }

    #[test]
    fn test_subtract_spans_delta() {
        let delta = subtract_spans(&[span(50, 150)], &[span(0, 100)]);
        assert_eq!(delta, vec![span(100, 150)]);
    }

    #[test]
    fn test_subtract_spans_multiple_holes() {
        let delta = subtract_spans(&[span(0, 100)], &[span(10, 20), span(40, 60)]);
        assert_eq!(delta, vec![span(0, 10), span(20, 40), span(60, 100)]);
    }

    #[test]
    fn test_intersect_spans() {
        let inter = intersect_spans(&[span(0, 50), span(60, 100)], &[span(40, 70)]);
        assert_eq!(inter, vec![span(40, 50), span(60, 70)]);
    }

    #[test]
    fn test_covers_span() {
        assert!(covers_span(&[span(0, 50), span(50, 100)], &span(10, 90)));
        assert!(!covers_span(&[span(0, 50), span(51, 100)], &span(10, 90)));
    }

    fn arb_span() -> impl Strategy<Value = TimeSpan> {
        prop_oneof![
            8 => (-1000i64..1000, 0i64..500).prop_map(|(s, w)| TimeSpan::new(s, s + w).unwrap()),
            1 => (-1000i64..1000).prop_map(TimeSpan::unbounded_start),
            1 => (-1000i64..1000).prop_map(TimeSpan::unbounded_end),
            1 => Just(TimeSpan::TIMELESS),
        ]
    }

    proptest! {
        #[test]
        fn prop_subtract_then_reunion_reconstructs(a in arb_span(), b in arb_span()) {
            let remainder = a.subtract(&b);
            let covered: Vec<TimeSpan> = a.intersection(&b).into_iter().collect();

            let mut all = remainder.clone();
            all.extend(covered.iter().copied());
            prop_assert_eq!(merge_spans(all), merge_spans(vec![a]));

            // No overlap between what was removed and what remains.
            prop_assert!(intersect_spans(&remainder, &covered)
                .iter()
                .all(|s| s.is_instantaneous()));
        }

        #[test]
        fn prop_merge_is_idempotent(spans in proptest::collection::vec(arb_span(), 0..12)) {
            let once = merge_spans(spans);
            let twice = merge_spans(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merge_preserves_instant_membership(
            spans in proptest::collection::vec(arb_span(), 0..8),
            t in -1000i64..1500,
        ) {
            let point = TimeSpan::instant(t);
            let held = |list: &[TimeSpan]| list.iter().any(|s| s.intersection(&point).is_some());
            let before = held(&spans);
            prop_assert_eq!(held(&merge_spans(spans)), before);
        }

        #[test]
        fn prop_subtract_spans_disjoint_from_cut(
            from in proptest::collection::vec(arb_span(), 0..6),
            cut in proptest::collection::vec(arb_span(), 0..6),
        ) {
            let remainder = subtract_spans(&from, &cut);
            prop_assert!(intersect_spans(&remainder, &cut)
                .iter()
                .all(|s| s.is_instantaneous()));
        }
    }
}
