//! Stored models, coverage records and in-flight operations.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{DataModelCategory, RegistryError};
use crate::interval::{IntervalMatcher, IntervalValueSet, MatcherSignature};
use crate::property::{PropertyDescriptor, PropertyValue};

/// Identifier of one stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId(u64);

impl ModelId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type DepositId = u64;
pub(crate) type OpId = u64;

pub(crate) struct StoredModel {
    pub deposit: DepositId,
    pub category: DataModelCategory,
    pub object: Arc<dyn Any + Send + Sync>,
    pub values: Vec<(PropertyDescriptor, PropertyValue)>,
    pub expires_at: Option<Instant>,
}

impl StoredModel {
    pub fn property(&self, descriptor: &PropertyDescriptor) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|(d, _)| d == descriptor)
            .map(|(_, v)| v)
    }

    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    /// Category and every matcher agree with this model.
    pub fn selected_by(&self, category: &DataModelCategory, matchers: &[IntervalMatcher]) -> bool {
        category.covers(&self.category)
            && matchers.iter().all(|m| {
                self.property(m.descriptor())
                    .map_or(false, |value| m.matches_value(value))
            })
    }
}

pub(crate) struct DepositRecord {
    pub category: DataModelCategory,
    pub models: Vec<ModelId>,
    pub persist: bool,
    pub expires_at: Option<Instant>,
}

/// Extents known to be fully held for one category and matcher signature.
#[derive(Debug, Clone)]
pub(crate) struct CoverageEntry {
    pub category: DataModelCategory,
    pub signature: Vec<MatcherSignature>,
    pub intervals: IntervalValueSet,
    pub persist: bool,
    pub expires_at: Option<Instant>,
}

impl CoverageEntry {
    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    pub fn applies_to(
        &self,
        category: &DataModelCategory,
        signature: &[MatcherSignature],
        now: Instant,
    ) -> bool {
        self.is_live(now) && self.category.covers(category) && self.signature == signature
    }
}

/// Terminal and pending states of an in-flight operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OpStatus {
    Pending,
    Succeeded,
    Failed(RegistryError),
    Cancelled,
}

impl OpStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What the deposits received by an operation say about its coverage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpCredit {
    pub deposits: usize,
    pub all_persist: bool,
    pub expires_at: Option<Instant>,
}

impl Default for OpCredit {
    fn default() -> Self {
        Self {
            deposits: 0,
            all_persist: true,
            expires_at: None,
        }
    }
}

impl OpCredit {
    pub fn record(&mut self, persist: bool, expires_at: Option<Instant>) {
        self.deposits += 1;
        self.all_persist &= persist;
        self.expires_at = match (self.expires_at, expires_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn persists(&self) -> bool {
        self.deposits > 0 && self.all_persist
    }
}

pub(crate) struct InFlightOp {
    pub category: DataModelCategory,
    pub signature: Vec<MatcherSignature>,
    pub pieces: Vec<IntervalValueSet>,
    /// False when a result limit makes the fetch incomplete.
    pub complete: bool,
    pub token: CancellationToken,
    pub status: watch::Receiver<OpStatus>,
    pub credit: OpCredit,
}

impl InFlightOp {
    pub fn joinable(&self, category: &DataModelCategory, signature: &[MatcherSignature]) -> bool {
        self.complete
            && !self.token.is_cancelled()
            && &self.category == category
            && self.signature == signature
    }
}

#[derive(Default)]
pub(crate) struct RegistryState {
    pub coverage: Vec<CoverageEntry>,
    pub deposits: HashMap<DepositId, DepositRecord>,
    pub ops: HashMap<OpId, InFlightOp>,
}
