//! Landing page lookups and "seen" acknowledgements.

use std::sync::Arc;

use teamalert_common::message::{MessageRecord, SeenEvent};
use tracing::{debug, info};

use crate::store::{MessageStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AckError {
    #[error("missing id")]
    MissingId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct LandingHandler {
    store: Arc<dyn MessageStore>,
}

impl LandingHandler {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Look a message up by id. `None` means the landing page should 404.
    pub async fn resolve(&self, id: &str) -> Option<MessageRecord> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        self.store.load().await.into_iter().find(|r| r.id == id)
    }

    /// Record that someone at `source_address` saw message `id`.
    ///
    /// Unknown ids are accepted and ignored.
    pub async fn ack(&self, id: &str, source_address: Option<String>) -> Result<(), AckError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AckError::MissingId);
        }
        let source = source_address.clone().unwrap_or_default();
        if self.store.append_seen(id, SeenEvent::now(source_address)).await? {
            info!(%id, %source, "message seen");
        } else {
            debug!(%id, "seen for unknown message ignored");
        }
        Ok(())
    }
}
