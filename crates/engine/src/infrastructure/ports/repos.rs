//! Repository port traits for database access.

use async_trait::async_trait;
use playtime_domain::{UserId, UserRecord};

use super::error::RepoError;

// =============================================================================
// Playtime Records
// =============================================================================

/// Durable per-user playtime storage, keyed by [`UserId`].
///
/// A missing record is `Ok(None)`, not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, RepoError>;
    async fn upsert(&self, record: &UserRecord) -> Result<(), RepoError>;
    async fn count(&self) -> Result<u64, RepoError>;
}
