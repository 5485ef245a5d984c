//! The [`TimeSpan`] value type.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised when constructing or parsing a [`TimeSpan`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    /// The start bound lies after the end bound.
    #[error("Inverted span bounds: start {start} is after end {end}")]
    InvertedBounds { start: i64, end: i64 },

    /// The textual form could not be parsed.
    #[error("Invalid span '{0}': expected START..END, ..END, START.., an instant, or *")]
    Parse(String),
}

/// A half-open time interval `[start, end)` in milliseconds since the Unix epoch.
///
/// A missing bound is unbounded. Both bounds missing is the universal
/// [`TimeSpan::TIMELESS`] value, which matches and is matched by every span.
/// `start == end` is an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    start: Option<i64>,
    end: Option<i64>,
}

impl TimeSpan {
    /// The span that covers all of time.
    pub const TIMELESS: TimeSpan = TimeSpan {
        start: None,
        end: None,
    };

    /// Create a bounded span `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpanError::InvertedBounds`] if `start > end`.
    pub fn new(start: i64, end: i64) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::InvertedBounds { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Create a zero-width span at `t`.
    pub fn instant(t: i64) -> Self {
        Self {
            start: Some(t),
            end: Some(t),
        }
    }

    /// Create a span with no lower bound, ending (exclusively) at `end`.
    pub fn unbounded_start(end: i64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Create a span starting at `start` with no upper bound.
    pub fn unbounded_end(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// The start bound, `None` when unbounded.
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    /// The end bound, `None` when unbounded.
    pub fn end(&self) -> Option<i64> {
        self.end
    }

    pub fn is_timeless(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn is_instantaneous(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s == e)
    }

    pub fn is_unbounded_start(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_unbounded_end(&self) -> bool {
        self.end.is_none()
    }

    /// Duration in milliseconds, `None` if either end is unbounded.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        }
    }

    /// Strict containment: `other` lies fully inside this span's bounds.
    ///
    /// An instant is contained when `start <= t < end`, so the zero-width
    /// span at the exclusive end is rejected. TIMELESS on either side
    /// always matches.
    pub fn contains_strictly(&self, other: &TimeSpan) -> bool {
        if self.is_timeless() || other.is_timeless() {
            return true;
        }
        if other.is_instantaneous() {
            if self.is_instantaneous() {
                return self.lo() == other.lo();
            }
            return self.contains_point(other.lo());
        }
        self.lo() <= other.lo() && other.hi() <= self.hi()
    }

    /// Loose intersection used by general matchers.
    ///
    /// Two spans intersect when they share interior. Touching at a single
    /// endpoint does not count. A zero-width span intersects a wider one
    /// only when it lies strictly inside it; two instants intersect when
    /// they are equal.
    pub fn intersects_loosely(&self, other: &TimeSpan) -> bool {
        if self.is_timeless() || other.is_timeless() {
            return true;
        }
        match (self.is_instantaneous(), other.is_instantaneous()) {
            (true, true) => self.lo() == other.lo(),
            (true, false) => other.lo() < self.lo() && self.lo() < other.hi(),
            (false, true) => self.lo() < other.lo() && other.lo() < self.hi(),
            (false, false) => self.lo() < other.hi() && other.lo() < self.hi(),
        }
    }

    /// Half-open membership of a single instant.
    pub(crate) fn contains_point(&self, t: i128) -> bool {
        self.lo() <= t && t < self.hi()
    }

    /// Set-theoretic intersection on the half-open model.
    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        match (self.is_instantaneous(), other.is_instantaneous()) {
            (true, true) => (self == other).then_some(*self),
            (true, false) => other.contains_point(self.lo()).then_some(*self),
            (false, true) => self.contains_point(other.lo()).then_some(*other),
            (false, false) => {
                let lo = self.lo().max(other.lo());
                let hi = self.hi().min(other.hi());
                (lo < hi).then(|| Self::from_bounds(lo, hi))
            }
        }
    }

    /// Remove `other` from this span.
    ///
    /// Yields zero, one (gap before or after), or two (both gaps) pieces.
    /// Subtracting an instant from a wider span removes nothing.
    pub fn subtract(&self, other: &TimeSpan) -> Vec<TimeSpan> {
        if self.is_instantaneous() {
            return match self.intersection(other) {
                Some(_) => Vec::new(),
                None => vec![*self],
            };
        }
        if other.is_instantaneous() {
            return vec![*self];
        }

        let Some(overlap) = self.intersection(other) else {
            return vec![*self];
        };

        let mut pieces = Vec::with_capacity(2);
        if self.lo() < overlap.lo() {
            pieces.push(Self::from_bounds(self.lo(), overlap.lo()));
        }
        if overlap.hi() < self.hi() {
            pieces.push(Self::from_bounds(overlap.hi(), self.hi()));
        }
        pieces
    }

    /// Start bound widened to `i128`, unbounded maps to `i128::MIN`.
    pub(crate) fn lo(&self) -> i128 {
        self.start.map_or(i128::MIN, i128::from)
    }

    /// End bound widened to `i128`, unbounded maps to `i128::MAX`.
    pub(crate) fn hi(&self) -> i128 {
        self.end.map_or(i128::MAX, i128::from)
    }

    /// Rebuild a span from widened bounds produced by [`lo`](Self::lo)/[`hi`](Self::hi).
    pub(crate) fn from_bounds(lo: i128, hi: i128) -> Self {
        let narrow = |v: i128| i64::try_from(v).ok();
        Self {
            start: if lo == i128::MIN { None } else { narrow(lo) },
            end: if hi == i128::MAX { None } else { narrow(hi) },
        }
    }
}

impl Ord for TimeSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lo()
            .cmp(&other.lo())
            .then_with(|| self.hi().cmp(&other.hi()))
    }
}

impl PartialOrd for TimeSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_timeless() {
            return write!(f, "TIMELESS");
        }
        if self.is_instantaneous() {
            return write!(f, "@{}", self.lo());
        }
        match self.start {
            Some(s) => write!(f, "[{}", s)?,
            None => write!(f, "(-inf")?,
        }
        match self.end {
            Some(e) => write!(f, ", {})", e),
            None => write!(f, ", +inf)"),
        }
    }
}

impl FromStr for TimeSpan {
    type Err = SpanError;

    /// Parse `START..END`, `..END`, `START..`, a single instant, or `*` for TIMELESS.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" || s == ".." {
            return Ok(Self::TIMELESS);
        }

        let parse = |v: &str| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| SpanError::Parse(s.to_string()))
        };

        match s.split_once("..") {
            None => Ok(Self::instant(parse(s)?)),
            Some(("", end)) => Ok(Self::unbounded_start(parse(end)?)),
            Some((start, "")) => Ok(Self::unbounded_end(parse(start)?)),
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(s: i64, e: i64) -> TimeSpan {
        TimeSpan::new(s, e).unwrap()
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = TimeSpan::new(10, 5).unwrap_err();
        assert_eq!(err, SpanError::InvertedBounds { start: 10, end: 5 });
    }

    #[test]
    fn test_kinds() {
        assert!(TimeSpan::TIMELESS.is_timeless());
        assert!(TimeSpan::instant(5).is_instantaneous());
        assert!(TimeSpan::unbounded_start(5).is_unbounded_start());
        assert!(TimeSpan::unbounded_end(5).is_unbounded_end());
        assert_eq!(span(10, 25).duration_ms(), Some(15));
        assert_eq!(TimeSpan::unbounded_end(3).duration_ms(), None);
    }

    #[test]
    fn test_strict_matching_boundaries() {
        let operand = span(100, 200);
        assert!(operand.contains_strictly(&span(100, 200)));
        assert!(!operand.contains_strictly(&span(99, 200)));
        assert!(!operand.contains_strictly(&span(100, 201)));
        assert!(!operand.contains_strictly(&TimeSpan::instant(200)));
        assert!(operand.contains_strictly(&TimeSpan::instant(100)));
    }

    #[test]
    fn test_loose_matching_boundaries() {
        let operand = span(100, 200);
        assert!(operand.intersects_loosely(&span(50, 101)));
        assert!(!operand.intersects_loosely(&span(50, 100)));
        assert!(!operand.intersects_loosely(&span(200, 250)));
        assert!(operand.intersects_loosely(&TimeSpan::instant(150)));
        assert!(!operand.intersects_loosely(&TimeSpan::instant(100)));
    }

    #[test]
    fn test_timeless_matches_everything() {
        let operand = span(100, 200);
        assert!(TimeSpan::TIMELESS.contains_strictly(&operand));
        assert!(operand.contains_strictly(&TimeSpan::TIMELESS));
        assert!(TimeSpan::TIMELESS.intersects_loosely(&TimeSpan::instant(7)));
    }

    #[test]
    fn test_subtract_produces_gaps() {
        let a = span(0, 100);
        assert_eq!(a.subtract(&span(20, 30)), vec![span(0, 20), span(30, 100)]);
        assert_eq!(a.subtract(&span(0, 30)), vec![span(30, 100)]);
        assert_eq!(a.subtract(&span(50, 150)), vec![span(0, 50)]);
        assert!(a.subtract(&span(-10, 110)).is_empty());
        assert_eq!(a.subtract(&span(100, 200)), vec![a]);
    }

    #[test]
    fn test_subtract_unbounded() {
        let pieces = TimeSpan::TIMELESS.subtract(&span(0, 10));
        assert_eq!(
            pieces,
            vec![TimeSpan::unbounded_start(0), TimeSpan::unbounded_end(10)]
        );
        assert!(span(0, 10).subtract(&TimeSpan::TIMELESS).is_empty());
    }

    #[test]
    fn test_subtract_instants() {
        assert_eq!(span(0, 10).subtract(&TimeSpan::instant(5)), vec![span(0, 10)]);
        assert!(TimeSpan::instant(5).subtract(&span(0, 10)).is_empty());
        assert_eq!(
            TimeSpan::instant(10).subtract(&span(0, 10)),
            vec![TimeSpan::instant(10)]
        );
    }

    #[test]
    fn test_ordering_places_unbounded_start_first() {
        let mut spans = vec![span(5, 6), TimeSpan::unbounded_start(3), span(1, 2)];
        spans.sort();
        assert_eq!(spans[0], TimeSpan::unbounded_start(3));
        assert_eq!(spans[2], span(5, 6));
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("10..20".parse::<TimeSpan>().unwrap(), span(10, 20));
        assert_eq!("..20".parse::<TimeSpan>().unwrap(), TimeSpan::unbounded_start(20));
        assert_eq!("10..".parse::<TimeSpan>().unwrap(), TimeSpan::unbounded_end(10));
        assert_eq!("42".parse::<TimeSpan>().unwrap(), TimeSpan::instant(42));
        assert_eq!("*".parse::<TimeSpan>().unwrap(), TimeSpan::TIMELESS);
        assert!("abc".parse::<TimeSpan>().is_err());
        assert!("20..10".parse::<TimeSpan>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(span(1, 2).to_string(), "[1, 2)");
        assert_eq!(TimeSpan::unbounded_start(2).to_string(), "(-inf, 2)");
        assert_eq!(TimeSpan::instant(4).to_string(), "@4");
        assert_eq!(TimeSpan::TIMELESS.to_string(), "TIMELESS");
    }
}
