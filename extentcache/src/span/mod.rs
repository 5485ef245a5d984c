//! Time spans and span-list algebra.
//!
//! This module provides the temporal half of the interval model:
//!
//! - [`TimeSpan`]: a half-open `[start, end)` interval in epoch milliseconds,
//!   with unbounded ends, instants, and the universal [`TimeSpan::TIMELESS`]
//! - Span-list operations ([`merge_spans`], [`subtract_spans`],
//!   [`intersect_spans`]) used by the satisfaction engine and the governors
//! - [`CompactSpanStore`]: a dense container for very large span sequences
//!
//! # Boundary Model
//!
//! Set algebra (subtract, intersect, merge) is measure based on half-open
//! intervals: an instant `t` belongs to `[a, b)` when `a <= t < b`. Matcher
//! semantics live on [`TimeSpan::contains_strictly`] and
//! [`TimeSpan::intersects_loosely`] and differ at the boundaries.
//!
//! # Example
//!
//! ```
//! use extentcache::span::{subtract_spans, TimeSpan};
//!
//! let requested = [TimeSpan::new(50, 150).unwrap()];
//! let loaded = [TimeSpan::new(0, 100).unwrap()];
//!
//! let delta = subtract_spans(&requested, &loaded);
//! assert_eq!(delta, vec![TimeSpan::new(100, 150).unwrap()]);
//! ```

mod compact;
mod ops;
mod time_span;

pub use compact::{CompactSpanIter, CompactSpanStore, TIMELESS_SENTINEL};
pub use ops::{covers_span, intersect_spans, merge_spans, subtract_spans};
pub use time_span::{SpanError, TimeSpan};
