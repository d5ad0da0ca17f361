/// Per-connection message delivery.
pub mod fanout;
/// Poll phases and transitions.
pub mod lifecycle;
/// In-memory poll model.
pub mod poll;
/// Joined students.
pub mod roster;
/// State guarded by the coordinator lock.
pub mod session;
mod sse;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::PollEntity,
        poll_store::PollStore,
        storage::{StorageError, StorageResult},
    },
    error::ServiceError,
};

pub use self::sse::SseHub;
use self::{fanout::Fanout, session::PollSession};

/// Handle shared by every route and background task.
pub type SharedState = Arc<AppState>;

/// Identity assigned to each live WebSocket connection.
pub type ConnectionId = Uuid;

/// Central application state storing live connections, the poll session and the store handle.
pub struct AppState {
    poll_store: RwLock<Option<Arc<dyn PollStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    fanout: Fanout,
    session: Mutex<PollSession>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            poll_store: RwLock::new(None),
            degraded: degraded_tx,
            fanout: Fanout::new(config.sse_capacity()),
            session: Mutex::new(PollSession::default()),
            config,
        })
    }

    /// Obtain a handle to the current poll store, if one is installed.
    pub async fn poll_store(&self) -> Option<Arc<dyn PollStore>> {
        let guard = self.poll_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new poll store implementation and leave degraded mode.
    pub async fn set_poll_store(&self, store: Arc<dyn PollStore>) {
        {
            let mut guard = self.poll_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current poll store and enter degraded mode.
    pub async fn clear_poll_store(&self) {
        {
            let mut guard = self.poll_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Connection registry used to push realtime messages.
    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    /// Coordinator session; every lifecycle operation runs under this lock.
    pub fn session(&self) -> &Mutex<PollSession> {
        &self.session
    }

    /// Return the installed poll store or fail when running in degraded mode.
    pub async fn require_poll_store(&self) -> Result<Arc<dyn PollStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.poll_store().await.ok_or(ServiceError::Degraded)
    }

    /// Run one store call bounded by the configured store timeout.
    pub async fn with_store<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(Arc<dyn PollStore>) -> BoxFuture<'static, StorageResult<T>>,
    {
        let store = self.require_poll_store().await?;
        let limit = self.config.store_timeout();
        match timeout(limit, call(store)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StorageError::Timeout {
                millis: limit.as_millis(),
            }
            .into()),
        }
    }

    /// Write the whole poll document through to the store.
    pub async fn persist(&self, poll: PollEntity) -> Result<(), ServiceError> {
        self.with_store(move |store| store.save(poll)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;
    use crate::{dao::poll_store::MemoryPollStore, state::poll::Poll};

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_poll_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_poll_store(Arc::new(MemoryPollStore::new())).await;
        assert!(!state.is_degraded());
        assert!(state.require_poll_store().await.is_ok());

        state.clear_poll_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_watcher_only_sees_changes() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        watcher.mark_unchanged();

        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn persist_writes_through_to_the_store() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryPollStore::new();
        state.set_poll_store(Arc::new(store.clone())).await;

        let poll = Poll::new("Q".into(), vec!["A".into(), "B".into()], 5);
        state.persist(poll.clone().into()).await.unwrap();

        let stored = store.find_by_id(poll.id).await.unwrap();
        assert_eq!(stored.map(|entity| entity.id), Some(poll.id));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_calls_time_out() {
        let config = AppConfig::from_json(r#"{"store_timeout_ms": 50}"#).unwrap();
        let state = AppState::new(config);
        state.set_poll_store(Arc::new(MemoryPollStore::new())).await;

        let result = state
            .with_store(|_| {
                async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(())
                }
                .boxed()
            })
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Storage(StorageError::Timeout { millis: 50 }))
        ));
    }
}
