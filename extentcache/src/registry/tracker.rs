//! Query trackers: status and completion of submitted queries.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{ModelId, RegistryError};

/// Coarse state of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Final result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Identifiers of the stored models matching the query.
    Succeeded(Vec<ModelId>),
    Failed(RegistryError),
    Cancelled,
}

impl QueryOutcome {
    pub fn status(&self) -> QueryStatus {
        match self {
            Self::Succeeded(_) => QueryStatus::Succeeded,
            Self::Failed(_) => QueryStatus::Failed,
            Self::Cancelled => QueryStatus::Cancelled,
        }
    }

    pub fn into_result(self) -> Result<Vec<ModelId>, RegistryError> {
        match self {
            Self::Succeeded(ids) => Ok(ids),
            Self::Failed(err) => Err(err),
            Self::Cancelled => Err(RegistryError::Cancelled),
        }
    }
}

type OutcomeSender = Arc<watch::Sender<Option<QueryOutcome>>>;

/// Write side of a tracker. The first published outcome wins.
pub(crate) struct QueryPublisher {
    sender: OutcomeSender,
}

impl QueryPublisher {
    pub fn publish(&self, outcome: QueryOutcome) -> bool {
        publish(&self.sender, outcome)
    }
}

fn publish(sender: &OutcomeSender, outcome: QueryOutcome) -> bool {
    sender.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(outcome);
        true
    })
}

/// Handle to a submitted query.
///
/// Callers may await it, block on it, subscribe to its channel, or register
/// a completion callback.
pub struct QueryTracker {
    id: u64,
    sender: OutcomeSender,
    receiver: watch::Receiver<Option<QueryOutcome>>,
    cancel: CancellationToken,
    handle: Handle,
}

impl QueryTracker {
    pub(crate) fn new(id: u64, handle: Handle) -> (Self, QueryPublisher) {
        let (sender, receiver) = watch::channel(None);
        let sender = Arc::new(sender);
        let tracker = Self {
            id,
            sender: Arc::clone(&sender),
            receiver,
            cancel: CancellationToken::new(),
            handle,
        };
        (tracker, QueryPublisher { sender })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> QueryStatus {
        self.receiver
            .borrow()
            .as_ref()
            .map_or(QueryStatus::Pending, QueryOutcome::status)
    }

    pub fn is_done(&self) -> bool {
        self.status() != QueryStatus::Pending
    }

    pub fn outcome(&self) -> Option<QueryOutcome> {
        self.receiver.borrow().clone()
    }

    /// Result identifiers once the query has succeeded.
    pub fn model_ids(&self) -> Option<Vec<ModelId>> {
        match self.outcome() {
            Some(QueryOutcome::Succeeded(ids)) => Some(ids),
            _ => None,
        }
    }

    /// A receiver that changes from `None` to the outcome exactly once.
    pub fn subscribe(&self) -> watch::Receiver<Option<QueryOutcome>> {
        self.receiver.clone()
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> QueryOutcome {
        wait_outcome(self.receiver.clone()).await
    }

    /// Block the current thread until the outcome is known.
    ///
    /// Must not be called from inside an async task on the registry's
    /// runtime.
    pub fn wait_blocking(&self) -> QueryOutcome {
        futures::executor::block_on(self.wait())
    }

    /// Run `callback` on the runtime once the outcome is known.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(QueryOutcome) + Send + 'static,
    {
        let receiver = self.receiver.clone();
        self.handle.spawn(async move {
            callback(wait_outcome(receiver).await);
        });
    }

    /// Cancel the query.
    ///
    /// The tracker reports `Cancelled` immediately. A fetch started by this
    /// query is aborted, which also releases every other query attached to it.
    pub fn cancel(&self) {
        self.cancel.cancel();
        publish(&self.sender, QueryOutcome::Cancelled);
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl fmt::Debug for QueryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTracker")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

async fn wait_outcome(mut receiver: watch::Receiver<Option<QueryOutcome>>) -> QueryOutcome {
    let waited = receiver
        .wait_for(Option::is_some)
        .await
        .map(|current| current.clone());
    let outcome = match waited {
        Ok(outcome) => outcome,
        Err(_) => receiver.borrow().clone(),
    };
    outcome.unwrap_or(QueryOutcome::Failed(RegistryError::Abandoned))
}
