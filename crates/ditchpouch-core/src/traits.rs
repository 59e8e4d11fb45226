//! Collaborator seams: where progress is persisted and where outbound goes.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Outbound, UserProgress};

/// Single-record progress persistence.
///
/// Implementations are synchronous; the tracker calls them while holding its
/// event lock, so there is never more than one writer.
pub trait ProgressStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Load the persisted record, or `defaults` when none exists yet.
    fn load(&self, defaults: &UserProgress) -> Result<UserProgress>;

    /// Replace the persisted record.
    fn save(&self, progress: &UserProgress) -> Result<()>;

    /// Local date of the last daily boundary that was applied.
    fn last_boundary(&self) -> Result<Option<NaiveDate>>;

    /// Record that the boundary for `day` has been applied.
    fn record_boundary(&self, day: NaiveDate) -> Result<()>;
}

/// Outbound transport to the single configured recipient.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one outbound intent.
    async fn send(&self, message: &Outbound) -> Result<()>;
}
