//! Errors surfaced by every store backend.

use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// Constraint variants carry the constraint name as declared in the
/// migrations (see [`crate::schema`]), whichever backend raised them.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value failed domain validation while decoding a row, such
    /// as a negative total or a malformed email.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind (table name).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Unique constraint violation (e.g., duplicate email).
    #[error("unique constraint violation: {constraint}")]
    Conflict {
        /// Violated constraint.
        constraint: String,
    },

    /// A referenced row does not exist.
    #[error("foreign key violation: {constraint}")]
    ForeignKey {
        /// Violated constraint.
        constraint: String,
    },

    /// A delete was refused because referencing rows exist.
    #[error("delete restricted by {constraint}")]
    Restricted {
        /// Restricting constraint.
        constraint: String,
    },

    /// A check constraint rejected a value.
    #[error("check constraint violation: {constraint} ({detail})")]
    Check {
        /// Violated constraint.
        constraint: String,
        /// Why the value was rejected.
        detail: String,
    },

    /// A status change outside the allowed transitions.
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Entity kind.
        entity: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { index, source } => {
                Self::DataCorruption(format!("column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => Self::DataCorruption(source.to_string()),
            other => Self::Database(other),
        }
    }
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(constraint: &str) -> Self {
        Self::Conflict {
            constraint: constraint.to_owned(),
        }
    }

    pub(crate) fn foreign_key(constraint: &str) -> Self {
        Self::ForeignKey {
            constraint: constraint.to_owned(),
        }
    }

    pub(crate) fn restricted(constraint: &str) -> Self {
        Self::Restricted {
            constraint: constraint.to_owned(),
        }
    }

    pub(crate) fn check(constraint: &str, detail: impl ToString) -> Self {
        Self::Check {
            constraint: constraint.to_owned(),
            detail: detail.to_string(),
        }
    }

    /// Whether this error is any kind of constraint violation.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. }
                | Self::ForeignKey { .. }
                | Self::Restricted { .. }
                | Self::Check { .. }
        )
    }

    /// Map a sqlx error raised by an insert or update.
    ///
    /// Foreign key failures here mean the referenced row is missing.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        Self::classify(err, false)
    }

    /// Map a sqlx error raised by a delete.
    ///
    /// Foreign key failures here mean a `RESTRICT` reference blocked the delete.
    pub(crate) fn from_delete(err: sqlx::Error) -> Self {
        Self::classify(err, true)
    }

    fn classify(err: sqlx::Error, deleting: bool) -> Self {
        let sqlx::Error::Database(ref db_err) = err else {
            return Self::from(err);
        };
        let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
        // SQLSTATE 23001 is raised by the append-only change log guard.
        let restrict = db_err.code().as_deref() == Some("23001");

        if db_err.is_unique_violation() {
            Self::Conflict { constraint }
        } else if db_err.is_check_violation() {
            Self::Check {
                constraint,
                detail: db_err.message().to_owned(),
            }
        } else if restrict || (deleting && db_err.is_foreign_key_violation()) {
            Self::Restricted { constraint }
        } else if db_err.is_foreign_key_violation() {
            Self::ForeignKey { constraint }
        } else {
            Self::Database(err)
        }
    }
}
