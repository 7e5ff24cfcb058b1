//! Transactional in-memory store with a write-through journal.
//!
//! Reads run against the live [`Tables`] under a shared lock. A write runs
//! its closure on a private copy of the tables inside a [`Tx`]; the copy
//! replaces the live tables only when the closure succeeds and the
//! journal of changed records has been persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::error::{ServiceError, ServiceResult};

pub mod journal;
pub mod sqlite;
pub mod tables;

pub use journal::{InMemoryJournal, JournalStore, Mutation, StoredRecord};
pub use sqlite::SqliteJournal;
pub use tables::{Record, Tables};

pub struct Store {
    tables: RwLock<Tables>,
    journal: Arc<dyn JournalStore>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Store that keeps nothing beyond the process.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            journal: Arc::new(InMemoryJournal::new()),
        }
    }

    /// Load every record the journal holds and write through to it from now on.
    pub async fn open(journal: Arc<dyn JournalStore>) -> ServiceResult<Self> {
        let mut tables = Tables::default();
        let stored = journal.load().await?;
        let count = stored.len();
        for record in stored {
            tables.restore(&record.kind, record.data)?;
        }
        tracing::info!(records = count, "store loaded");
        Ok(Self {
            tables: RwLock::new(tables),
            journal,
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    /// Run `f` as one atomic transaction.
    ///
    /// Nothing is visible to readers, and nothing is persisted, unless `f`
    /// returns `Ok`.
    pub async fn write<T, F>(&self, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Tx) -> ServiceResult<T>,
    {
        let mut live = self.tables.write().await;
        let mut tx = Tx::begin(live.clone(), Utc::now());
        let out = f(&mut tx)?;
        let (tables, mutations) = tx.finish();
        if !mutations.is_empty() {
            self.journal.persist(&mutations).await?;
            tracing::debug!(changes = mutations.len(), "transaction committed");
        }
        *live = tables;
        Ok(out)
    }
}

/// A write transaction over a copy of the tables.
#[derive(Debug)]
pub struct Tx {
    tables: Tables,
    changes: BTreeMap<(&'static str, String), Option<serde_json::Value>>,
    now: DateTime<Utc>,
}

impl Tx {
    fn begin(tables: Tables, now: DateTime<Utc>) -> Self {
        Self {
            tables,
            changes: BTreeMap::new(),
            now,
        }
    }

    fn finish(self) -> (Tables, Vec<Mutation>) {
        let mutations = self
            .changes
            .into_iter()
            .map(|((kind, id), data)| Mutation { kind, id, data })
            .collect();
        (self.tables, mutations)
    }

    /// Timestamp shared by every change in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn get<R: Record>(&self, key: R::Key) -> Option<&R> {
        self.tables.get(key)
    }

    pub fn require<R: Record>(&self, key: R::Key) -> ServiceResult<&R> {
        self.get(key).ok_or(ServiceError::NotFound(R::KIND))
    }

    /// Insert or replace a record.
    pub fn put<R: Record>(&mut self, record: R) -> ServiceResult<()> {
        let key = record.key();
        let data = serde_json::to_value(&record)?;
        self.changes.insert((R::KIND, key.to_string()), Some(data));
        R::table_mut(&mut self.tables).insert(key, record);
        Ok(())
    }

    pub fn remove<R: Record>(&mut self, key: R::Key) -> Option<R> {
        let removed = R::table_mut(&mut self.tables).remove(&key)?;
        self.changes.insert((R::KIND, key.to_string()), None);
        Some(removed)
    }

    /// Remove every record of `R` matching `pred`; returns the removed records.
    pub fn remove_where<R, P>(&mut self, pred: P) -> Vec<R>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        let keys: Vec<R::Key> = R::table(&self.tables)
            .values()
            .filter(|r| pred(r))
            .map(Record::key)
            .collect();
        keys.into_iter().filter_map(|k| self.remove::<R>(k)).collect()
    }

    /// Apply `f` to a stored record and journal the result.
    pub fn update<R, F>(&mut self, key: R::Key, f: F) -> ServiceResult<R>
    where
        R: Record,
        F: FnOnce(&mut R) -> ServiceResult<()>,
    {
        let mut record = self.require::<R>(key)?.clone();
        f(&mut record)?;
        self.put(record.clone())?;
        Ok(record)
    }
}
