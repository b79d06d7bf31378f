/// In-memory backend used by tests and storeless deployments.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{MatchRecordEntity, NewMatchRecord, UserEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for match results and player accounts.
pub trait MatchStore: Send + Sync {
    /// Insert a finished match; the backend assigns the id and created_at.
    fn create_match(
        &self,
        record: NewMatchRecord,
    ) -> BoxFuture<'static, StorageResult<MatchRecordEntity>>;
    /// Fetch a player's matches, most recent first, capped at `limit`.
    fn matches_by_user(
        &self,
        user_id: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>>;
    /// Create a guest account unless one already exists for the id.
    fn create_guest(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look up the display name registered for a player id.
    fn find_username(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
