//! Audit log repository. Rows can be appended and read, never changed.

use sqlx::PgPool;

use crate::RepositoryError;
use crate::models::{ChangeLogEntry, NewChangeLogEntry};

/// Repository for the append-only change log.
pub struct ChangeLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChangeLogRepository<'a> {
    /// Create a new change log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an audit record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(&self, input: &NewChangeLogEntry) -> Result<ChangeLogEntry, RepositoryError> {
        sqlx::query_as::<_, ChangeLogEntry>(
            r"
            INSERT INTO shop.change_log (actor, entity_type, entity_id, action, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, actor, entity_type, entity_id, action, payload, created_at
            ",
        )
        .bind(&input.actor)
        .bind(&input.entity_type)
        .bind(&input.entity_id)
        .bind(input.action)
        .bind(&input.payload)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Audit records for one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<ChangeLogEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, ChangeLogEntry>(
            r"
            SELECT id, actor, entity_type, entity_id, action, payload, created_at
            FROM shop.change_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY id
            ",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }
}
