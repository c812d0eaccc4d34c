//! EventStore — CRUD access to the `event_logs` table.
//!
//! The table's key is `(id, created_at)` but callers address rows by `id`
//! only. Point operations therefore act on every row sharing the id, and
//! whenever one row must be returned it is the one with the most recent
//! `created_at`. Use [`EventStore::get_all_by_id`] to see the full set.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{EventPatch, EventRecord, NewEventRecord};

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// Borrows a connection from the caller's pool for each call. No retries.
#[derive(Clone)]
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Every stored record, unfiltered and unpaginated. Order is whatever
    /// Postgres scans in; only suitable for small tables.
    pub async fn list_all(&self) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, event_type, payload, created_at
            FROM event_logs
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// All rows sharing `id`, oldest first. Empty if none match.
    pub async fn get_all_by_id(&self, id: Uuid) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, event_type, payload, created_at
            FROM event_logs
            WHERE id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The most recent row for `id`.
    pub async fn get_by_id(&self, id: Uuid) -> Result<EventRecord> {
        let mut rows = self.get_all_by_id(id).await?;
        if rows.len() > 1 {
            debug!(%id, matches = rows.len(), "Several rows share id, returning most recent");
        }
        rows.pop().ok_or(StoreError::NotFound(id))
    }

    /// Insert one row. Missing `id`/`created_at` take the column defaults.
    pub async fn create(&self, record: NewEventRecord) -> Result<EventRecord> {
        let stored = sqlx::query_as::<_, EventRecord>(
            r#"
            INSERT INTO event_logs (id, event_type, payload, created_at)
            VALUES (COALESCE($1, gen_random_uuid()), $2, $3, COALESCE($4, now()))
            RETURNING id, event_type, payload, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Apply `patch` to every row with `id`. Returns the most recent of the
    /// updated rows.
    ///
    /// Setting `created_at` on an id that has several rows makes them collide
    /// on the primary key; Postgres rejects that and it surfaces as
    /// [`StoreError::Validation`].
    pub async fn update(&self, id: Uuid, patch: EventPatch) -> Result<EventRecord> {
        let rows = sqlx::query_as::<_, EventRecord>(
            r#"
            UPDATE event_logs
            SET event_type = COALESCE($2, event_type),
                payload    = COALESCE($3, payload),
                created_at = COALESCE($4, created_at)
            WHERE id = $1
            RETURNING id, event_type, payload, created_at
            "#,
        )
        .bind(id)
        .bind(&patch.event_type)
        .bind(&patch.payload)
        .bind(patch.created_at)
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            debug!(%id, matches = rows.len(), "Update touched several rows sharing id");
        }

        rows.into_iter()
            .max_by_key(|row| row.created_at)
            .ok_or(StoreError::NotFound(id))
    }

    /// Remove every row with `id`.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM event_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(StoreError::NotFound(id)),
            1 => Ok(()),
            n => {
                debug!(%id, rows = n, "Delete removed several rows sharing id");
                Ok(())
            }
        }
    }

    /// Insert a batch in one statement. All-or-nothing: Postgres applies every
    /// row or none. Returns the number of rows written.
    ///
    /// At most [`MAX_ROWS_PER_INSERT`](crate::MAX_ROWS_PER_INSERT) rows fit in
    /// one statement; larger slices fail as a whole.
    pub async fn insert_many(&self, records: &[NewEventRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO event_logs (id, event_type, payload, created_at) ");

        qb.push_values(records, |mut row, record| {
            row.push("COALESCE(")
                .push_bind_unseparated(record.id)
                .push_unseparated(", gen_random_uuid())")
                .push_bind(&record.event_type)
                .push_bind(&record.payload)
                .push("COALESCE(")
                .push_bind_unseparated(record.created_at)
                .push_unseparated(", now())");
        });

        let result = qb.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for EventRecord
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for EventRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(EventRecord {
            id: row.try_get("id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
