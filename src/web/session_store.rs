//! In-memory session records, with expired ones purged periodically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{ExpiredDeletion, SessionStore};
use tracing::{debug, warn};

/// Session store for the flow state. Records are dropped once they expire, not just hidden.
#[derive(Clone, Debug, Default)]
pub struct FlowStore(Arc<Mutex<HashMap<Id, Record>>>);

impl FlowStore {
    /// Deletes expired sessions every `period`, forever.
    pub(crate) async fn purge_expired(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        // first tick is immediate
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(err) = self.delete_expired().await {
                warn!("Failed to purge expired sessions: {}", err);
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for FlowStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.0.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .0
            .lock()
            .await
            .get(session_id)
            .filter(|record| record.expiry_date > now)
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.lock().await.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for FlowStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = OffsetDateTime::now_utc();
        let mut records = self.0.lock().await;
        let before = records.len();
        records.retain(|_, record| record.expiry_date > now);
        let removed = before - records.len();
        if removed > 0 {
            debug!("Purged {} expired sessions, {} left", removed, records.len());
        }
        Ok(())
    }
}
