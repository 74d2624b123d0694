//! Repository layer for database operations
//!
//! Each store is a trait so services can run against Postgres in production
//! and against in-memory or mocked stores in tests.

pub mod directory;
pub mod records;
pub mod resets;
pub mod sessions;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use directory::{Directory, PgDirectory};
pub use records::{PgRecordStore, RecordStore};
pub use resets::{PgResetStore, ResetStore};
pub use sessions::{PgSessionStore, SessionStore};

#[cfg(test)]
pub use self::{
    directory::MockDirectory, records::MockRecordStore, resets::MockResetStore,
    sessions::MockSessionStore,
};

/// Main repository struct holding every store
#[derive(Clone)]
pub struct Repository {
    pub sessions: Arc<dyn SessionStore>,
    pub records: Arc<dyn RecordStore>,
    pub resets: Arc<dyn ResetStore>,
    pub directory: Arc<dyn Directory>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            sessions: Arc::new(PgSessionStore::new(pool.clone())),
            records: Arc::new(PgRecordStore::new(pool.clone())),
            resets: Arc::new(PgResetStore::new(pool.clone())),
            directory: Arc::new(PgDirectory::new(pool)),
        }
    }

    /// Assemble a repository from individual stores
    pub fn from_stores(
        sessions: Arc<dyn SessionStore>,
        records: Arc<dyn RecordStore>,
        resets: Arc<dyn ResetStore>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            sessions,
            records,
            resets,
            directory,
        }
    }
}

/// SQLSTATE 23505
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
