//! SQLite-backed journal.
//!
//! All records live in a single table of JSON documents:
//!
//! ```sql
//! records(kind TEXT, id TEXT, data TEXT, updated_at TEXT, PRIMARY KEY (kind, id))
//! ```
//!
//! A committed transaction is written in one SQL transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::error::ServiceResult;

use super::journal::{JournalStore, Mutation, StoredRecord};

#[derive(Debug, Clone)]
pub struct SqliteJournal {
    pool: SqlitePool,
}

impl SqliteJournal {
    /// Connect (creating the database file if needed) and ensure the schema.
    pub async fn connect(url: &str) -> ServiceResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // An in-memory database exists once per connection.
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let journal = Self { pool };
        journal.migrate().await?;
        Ok(journal)
    }

    async fn migrate(&self) -> ServiceResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind       TEXT NOT NULL,
                id         TEXT NOT NULL,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl JournalStore for SqliteJournal {
    #[instrument(skip(self), err)]
    async fn load(&self) -> ServiceResult<Vec<StoredRecord>> {
        let rows = sqlx::query("SELECT kind, id, data FROM records ORDER BY kind, id")
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            out.push(StoredRecord {
                kind: row.try_get("kind")?,
                id: row.try_get("id")?,
                data: serde_json::from_str(&data)?,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self, mutations), fields(count = mutations.len()), err)]
    async fn persist(&self, mutations: &[Mutation]) -> ServiceResult<()> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for m in mutations {
            match &m.data {
                Some(data) => {
                    sqlx::query(
                        r#"
                        INSERT INTO records (kind, id, data, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT (kind, id)
                        DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
                        "#,
                    )
                    .bind(m.kind)
                    .bind(&m.id)
                    .bind(data.to_string())
                    .bind(&updated_at)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM records WHERE kind = ?1 AND id = ?2")
                        .bind(m.kind)
                        .bind(&m.id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::Store;
    use vendops_core::ProductId;
    use vendops_products::{Product, ProductDraft, ProductType};

    #[tokio::test]
    async fn round_trip_through_sqlite_memory() {
        let journal = Arc::new(SqliteJournal::connect("sqlite::memory:").await.unwrap());
        let store = Store::open(journal.clone()).await.unwrap();

        let id = store
            .write(|tx| {
                let p = ProductDraft::new("Cola", ProductType::Soda)
                    .into_product(ProductId::new(), tx.now())?;
                let id = p.id;
                tx.put(p)?;
                Ok(id)
            })
            .await
            .unwrap();

        let loaded = journal.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].kind, "product");

        let reopened = Store::open(journal.clone()).await.unwrap();
        let tables = reopened.read().await;
        let product: &Product = tables.get(id).unwrap();
        assert_eq!(product.name, "Cola");
        drop(tables);

        reopened
            .write(|tx| {
                tx.remove::<Product>(id);
                Ok(())
            })
            .await
            .unwrap();
        assert!(journal.load().await.unwrap().is_empty());
    }
}
