use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{models::PollEntity, poll_store::PollStore, storage::StorageResult};

/// Process-local [`PollStore`] ordering polls by `created_at`.
///
/// Nothing survives a restart. Used by the test suite and when the service runs
/// with `POLL_STORE=memory`.
#[derive(Clone, Default)]
pub struct MemoryPollStore {
    polls: Arc<RwLock<IndexMap<Uuid, PollEntity>>>,
}

impl MemoryPollStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PollStore for MemoryPollStore {
    fn save(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
        let polls = self.polls.clone();
        Box::pin(async move {
            // Replacing an existing key keeps its original position.
            polls.write().await.insert(poll.id, poll);
            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
        let polls = self.polls.clone();
        Box::pin(async move { Ok(polls.read().await.get(&id).cloned()) })
    }

    fn find_latest(&self) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
        let polls = self.polls.clone();
        Box::pin(async move {
            // Among equal timestamps the later insertion wins.
            Ok(polls
                .read()
                .await
                .values()
                .max_by_key(|poll| poll.created_at)
                .cloned())
        })
    }

    fn list_all(&self) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>> {
        let polls = self.polls.clone();
        Box::pin(async move {
            let mut all: Vec<PollEntity> = polls.read().await.values().rev().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(all)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::PollOptionEntity;

    fn entity(question: &str, offset_secs: u64) -> PollEntity {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs);
        PollEntity {
            id: Uuid::new_v4(),
            question: question.into(),
            options: vec![
                PollOptionEntity {
                    text: "yes".into(),
                    votes: 0,
                },
                PollOptionEntity {
                    text: "no".into(),
                    votes: 0,
                },
            ],
            duration_secs: 30,
            created_at: at,
            updated_at: at,
            started_at: at,
            ended: false,
            ended_at: None,
            answers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn empty_store_has_no_latest() {
        let store = MemoryPollStore::new();
        assert!(store.find_latest().await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_latest_is_last_created() {
        let store = MemoryPollStore::new();
        let first = entity("first", 0);
        let second = entity("second", 10);
        store.save(first.clone()).await.unwrap();
        store.save(second.clone()).await.unwrap();

        let questions: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|poll| poll.question)
            .collect();
        assert_eq!(questions, vec!["second", "first"]);
        assert_eq!(store.find_latest().await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn ordering_follows_creation_time_not_insertion() {
        let store = MemoryPollStore::new();
        let newer = entity("newer", 20);
        let older = entity("older", 5);
        store.save(newer.clone()).await.unwrap();
        store.save(older.clone()).await.unwrap();

        let questions: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|poll| poll.question)
            .collect();
        assert_eq!(questions, vec!["newer", "older"]);
        assert_eq!(store.find_latest().await.unwrap().unwrap().id, newer.id);
    }

    #[tokio::test]
    async fn save_replaces_in_place_and_reads_observe_it() {
        let store = MemoryPollStore::new();
        let mut first = entity("first", 0);
        let second = entity("second", 10);
        store.save(first.clone()).await.unwrap();
        store.save(second.clone()).await.unwrap();

        first.ended = true;
        first.options[0].votes = 3;
        store.save(first.clone()).await.unwrap();

        let loaded = store.find_by_id(first.id).await.unwrap().unwrap();
        assert!(loaded.ended);
        assert_eq!(loaded.options[0].votes, 3);
        // Replacing an older poll must not make it the latest one.
        assert_eq!(store.find_latest().await.unwrap().unwrap().id, second.id);
    }
}
