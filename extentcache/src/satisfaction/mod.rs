//! Satisfaction computation.
//!
//! Given a requested [`IntervalValueSet`] and the coverage already held for
//! a category, the engine splits the request into the part answerable from
//! storage and the remainder that has to be fetched.

use std::fmt;
use std::str::FromStr;

use crate::interval::IntervalValueSet;

/// How partial coverage is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SatisfactionStrategy {
    /// The request is atomic: fully covered, or fetched again as a whole.
    Single,
    /// True interval subtraction with minimal remainder pieces.
    #[default]
    FineGrained,
}

impl SatisfactionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::FineGrained => "fine",
        }
    }
}

impl fmt::Display for SatisfactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SatisfactionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "fine" | "fine-grained" | "fine_grained" => Ok(Self::FineGrained),
            other => Err(format!("unknown satisfaction strategy '{}'", other)),
        }
    }
}

/// A sub-region of a request that existing data already covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Satisfaction {
    intervals: IntervalValueSet,
}

impl Satisfaction {
    pub fn new(intervals: IntervalValueSet) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> &IntervalValueSet {
        &self.intervals
    }

    pub fn into_intervals(self) -> IntervalValueSet {
        self.intervals
    }
}

/// Covered part and remainder of one request.
///
/// Both lists are pairwise disjoint and together make up the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SatisfactionResult {
    pub satisfied: Vec<Satisfaction>,
    pub remainder: Vec<IntervalValueSet>,
}

impl SatisfactionResult {
    pub fn is_fully_satisfied(&self) -> bool {
        self.remainder.is_empty()
    }

    pub fn is_unsatisfied(&self) -> bool {
        self.satisfied.is_empty()
    }
}

/// Computes satisfactions with a fixed strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatisfactionEngine {
    strategy: SatisfactionStrategy,
}

impl SatisfactionEngine {
    pub fn new(strategy: SatisfactionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SatisfactionStrategy {
        self.strategy
    }

    /// Split `request` against `covered`.
    pub fn compute(
        &self,
        request: &IntervalValueSet,
        covered: &[IntervalValueSet],
    ) -> SatisfactionResult {
        if request.is_void() {
            return SatisfactionResult::default();
        }
        match self.strategy {
            SatisfactionStrategy::Single => Self::all_or_nothing(request, covered),
            SatisfactionStrategy::FineGrained => Self::fine_grained(request, covered),
        }
    }

    fn all_or_nothing(
        request: &IntervalValueSet,
        covered: &[IntervalValueSet],
    ) -> SatisfactionResult {
        if request.is_covered_by(covered) {
            SatisfactionResult {
                satisfied: vec![Satisfaction::new(request.clone())],
                remainder: Vec::new(),
            }
        } else {
            SatisfactionResult {
                satisfied: Vec::new(),
                remainder: vec![request.clone()],
            }
        }
    }

    fn fine_grained(
        request: &IntervalValueSet,
        covered: &[IntervalValueSet],
    ) -> SatisfactionResult {
        let mut remaining = vec![request.clone()];
        let mut satisfied = Vec::new();

        for cover in covered {
            if remaining.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(remaining.len());
            for piece in &remaining {
                match piece.intersection(cover) {
                    Some(common) => {
                        satisfied.push(Satisfaction::new(common));
                        next.extend(piece.subtract(cover));
                    }
                    None => next.push(piece.clone()),
                }
            }
            remaining = next;
        }

        SatisfactionResult {
            satisfied,
            remainder: remaining,
        }
    }
}
