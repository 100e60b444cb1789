use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use super::DatabaseMetadata;

/// Failure reported by a catalog accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The request was cancelled by the caller.
    #[error("catalog request cancelled")]
    Cancelled,
    /// The request deadline passed.
    #[error("catalog request deadline exceeded")]
    DeadlineExceeded,
    /// The backing store failed.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Cancellation and deadline carried through catalog calls.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never expires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request cancellation; visible to every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`RequestContext::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail when the request was cancelled or its deadline passed.
    pub fn check(&self) -> Result<(), CatalogError> {
        if self.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CatalogError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Metadata lookup consumed by the span engine.
///
/// Implementations must honour the [`RequestContext`] and may block.
pub trait CatalogAccessor {
    /// Fetch one database; `Ok(None)` when it does not exist. The returned
    /// name is the database's canonical spelling.
    fn database_metadata(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        database: &str,
    ) -> Result<Option<(String, Arc<DatabaseMetadata>)>, CatalogError>;

    /// Names of every database on the instance.
    fn list_database_names(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<Vec<String>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let ctx = RequestContext::new();
        let handle = ctx.clone();
        assert_eq!(ctx.check(), Ok(()));
        handle.cancel();
        assert_eq!(ctx.check(), Err(CatalogError::Cancelled));
    }

    #[test]
    fn past_deadline_fails_check() {
        let ctx = RequestContext::new().with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(CatalogError::DeadlineExceeded));
    }
}
