//! Durable side of the store: where committed changes are written.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ServiceResult;

/// One changed record of a committed transaction. `data: None` is a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: &'static str,
    pub id: String,
    pub data: Option<serde_json::Value>,
}

/// A record document as loaded back from a journal.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub kind: String,
    pub id: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Every live record.
    async fn load(&self) -> ServiceResult<Vec<StoredRecord>>;

    /// Apply all mutations atomically.
    async fn persist(&self, mutations: &[Mutation]) -> ServiceResult<()>;
}

/// Journal held in process memory (dev/tests).
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: Mutex<BTreeMap<(String, String), serde_json::Value>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalStore for InMemoryJournal {
    async fn load(&self) -> ServiceResult<Vec<StoredRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .map(|((kind, id), data)| StoredRecord {
                kind: kind.clone(),
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn persist(&self, mutations: &[Mutation]) -> ServiceResult<()> {
        let mut records = self.records.lock().await;
        for m in mutations {
            let key = (m.kind.to_string(), m.id.clone());
            match &m.data {
                Some(data) => {
                    records.insert(key, data.clone());
                }
                None => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }
}
