/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::PollEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use self::memory::MemoryPollStore;

/// Abstraction over the persistence layer for polls.
///
/// `save` is an insert-or-replace of the whole document and must be atomic for
/// a given identifier. Once it resolves successfully, subsequent reads observe
/// the written state.
pub trait PollStore: Send + Sync {
    /// Insert or fully replace the poll with the same id.
    fn save(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Poll stored under `id`, if any.
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PollEntity>>>;
    /// Most recently created poll.
    fn find_latest(&self) -> BoxFuture<'static, StorageResult<Option<PollEntity>>>;
    /// Every poll, newest first.
    fn list_all(&self) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>>;
    /// Cheap round-trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
