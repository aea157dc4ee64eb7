use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::db::connection::init_db;
use crate::store::{
    FeedbackStore, MemoryFeedbackStore, MemoryPollStore, MongoFeedbackStore, MongoPollStore,
    PollStore, StoreError,
};
use crate::voting::{BroadcastHub, VoteGate};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PollStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub hub: Arc<BroadcastHub>,
    pub gate: Arc<VoteGate>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PollStore>, feedback: Arc<dyn FeedbackStore>) -> Self {
        let hub = BroadcastHub::new(config.subscriber_buffer);
        let gate = Arc::new(VoteGate::new(store.clone(), hub.clone(), config.max_voters));

        Self {
            config: Arc::new(config),
            store,
            feedback,
            hub,
            gate,
        }
    }

    /// Uses MongoDB when `MONGO_URI` is configured, otherwise a process-local store.
    pub async fn connect(config: Config) -> Result<Self, StoreError> {
        let (store, feedback): (Arc<dyn PollStore>, Arc<dyn FeedbackStore>) = match &config.mongo_uri {
            Some(uri) => {
                let database = init_db(uri, &config.db_name).await?;
                (
                    Arc::new(MongoPollStore::new(&database)),
                    Arc::new(MongoFeedbackStore::new(&database)),
                )
            }
            None => {
                info!("MONGO_URI not set, polls and feedback are kept in memory and lost on restart");
                (Arc::new(MemoryPollStore::new()), Arc::new(MemoryFeedbackStore::new()))
            }
        };

        Ok(Self::new(config, store, feedback))
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(
            Config::default(),
            Arc::new(MemoryPollStore::new()),
            Arc::new(MemoryFeedbackStore::new()),
        )
    }
}
