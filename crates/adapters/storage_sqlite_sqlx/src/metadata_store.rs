//! `SQLite` implementation of [`MetadataStore`].
//!
//! Each thing owns one row whose `document` column holds its metadata
//! entries, with their timestamps, as a JSON object.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use thinghub_app::ports::{MetaDocument, MetadataStore};
use thinghub_domain::error::ThingError;
use thinghub_domain::id::ThingId;
use thinghub_domain::time::now;

use crate::error::StorageError;

/// Wrapper for converting database rows into a [`MetaDocument`].
struct Wrapper(MetaDocument);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<MetaDocument> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let document: String = row.try_get("document")?;
        let document =
            serde_json::from_str(&document).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        Ok(Self(document))
    }
}

const UPSERT: &str = "INSERT INTO thing_metadata (id, document, updated_at) VALUES (?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT document FROM thing_metadata WHERE id = ?";

/// `SQLite`-backed metadata store.
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn load(
        &self,
        id: ThingId,
    ) -> impl Future<Output = Result<Option<MetaDocument>, ThingError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn save(
        &self,
        id: ThingId,
        document: MetaDocument,
    ) -> impl Future<Output = Result<(), ThingError>> + Send {
        let pool = self.pool.clone();
        async move {
            let encoded = serde_json::to_string(&document).map_err(StorageError::from)?;
            sqlx::query(UPSERT)
                .bind(id.to_string())
                .bind(encoded)
                .bind(now().to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            tracing::debug!(%id, entries = document.len(), "metadata saved");
            Ok(())
        }
    }
}
