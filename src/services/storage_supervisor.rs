use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{poll_store::PollStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the poll store and keep the shared state in degraded mode while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn PollStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_poll_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(health_err) => {
                            warn!(error = %health_err, "storage health check failed");
                            if reconnect(&state, store.as_ref()).await {
                                state.update_degraded(false);
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            }
                            warn!("exhausted storage reconnect attempts; staying in degraded mode");
                            state.clear_poll_store().await;
                            break;
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Retry `store.try_reconnect` with exponential backoff. Enters degraded mode
/// after the first failure.
async fn reconnect(state: &SharedState, store: &dyn PollStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(reconnect_err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %reconnect_err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicBool, AtomicU32, Ordering},
    };

    use futures::future::BoxFuture;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::PollEntity,
            poll_store::MemoryPollStore,
            storage::StorageResult,
        },
        state::AppState,
    };

    /// Store whose health check and reconnect can be switched off.
    struct UnstableStore {
        inner: MemoryPollStore,
        down: Arc<AtomicBool>,
    }

    fn offline() -> StorageError {
        StorageError::unavailable("offline".into(), io::Error::other("down"))
    }

    impl PollStore for UnstableStore {
        fn save(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save(poll)
        }

        fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
            self.inner.find_by_id(id)
        }

        fn find_latest(&self) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
            self.inner.find_latest()
        }

        fn list_all(&self) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>> {
            self.inner.list_all()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let down = self.down.load(Ordering::SeqCst);
            Box::pin(async move {
                if down {
                    Err(offline())
                } else {
                    Ok(())
                }
            })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.health_check()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_a_store_connects() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(offline())
                } else {
                    Ok(Arc::new(MemoryPollStore::new()) as Arc<dyn PollStore>)
                }
            }
        }));

        sleep(Duration::from_millis(500)).await;
        assert!(state.is_degraded());

        sleep(Duration::from_secs(4)).await;
        assert!(!state.is_degraded());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_health_check_enters_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let down = Arc::new(AtomicBool::new(false));

        let flag = down.clone();
        tokio::spawn(run(state.clone(), move || {
            let store = UnstableStore {
                inner: MemoryPollStore::new(),
                down: flag.clone(),
            };
            async move { Ok(Arc::new(store) as Arc<dyn PollStore>) }
        }));

        sleep(Duration::from_millis(100)).await;
        assert!(!state.is_degraded());

        down.store(true, Ordering::SeqCst);
        sleep(HEALTH_POLL_INTERVAL + Duration::from_millis(100)).await;
        assert!(state.is_degraded());

        down.store(false, Ordering::SeqCst);
        sleep(Duration::from_secs(30)).await;
        assert!(!state.is_degraded());
    }
}
