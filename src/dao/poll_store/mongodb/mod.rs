mod config;
mod connection;
mod error;
mod models;
/// [`PollStore`](crate::dao::poll_store::PollStore) implementation.
pub mod store;

pub use config::MongoConfig;
pub use store::MongoPollStore;

use crate::dao::storage::StorageError;
use error::MongoDaoError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
