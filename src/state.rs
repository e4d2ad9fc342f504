use std::sync::Arc;

use tracing::warn;

use crate::config::ServerConfig;
use crate::store::{KnowledgeStore, StoreError};

/// Everything a handler needs: configuration and the shared store.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub store: Arc<KnowledgeStore>,
}

impl ServerState {
    pub fn new(config: ServerConfig, store: KnowledgeStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }

    /// Open the store at the configured path.
    pub fn open(config: ServerConfig) -> Result<Self, StoreError> {
        let store = KnowledgeStore::open(&config.db_path)?;
        Ok(Self::new(config, store))
    }

    /// Close the store if this is the last handle to it.
    ///
    /// A blocking task abandoned by a timeout may still hold a clone; in that
    /// case the connection is closed when that task finishes and drops it.
    pub fn shutdown(self) -> Result<(), StoreError> {
        match Arc::try_unwrap(self.store) {
            Ok(store) => store.close(),
            Err(shared) => {
                warn!(
                    handles = Arc::strong_count(&shared),
                    "knowledge store still in use at shutdown; deferring close"
                );
                Ok(())
            }
        }
    }
}
