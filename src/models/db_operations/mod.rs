use redb::{CommitError, StorageError, TableError, TransactionError};
use thiserror::Error;
use uuid::Uuid;

pub mod identity_db_operations;
pub mod materials_db_operations;
pub mod records_db_operations;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("R2D2 pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("Record id '{0}' is not a valid key")]
    InvalidKey(String),
}

/// Record ids are UUID strings stored as 16 raw bytes. Anything that does not
/// parse cannot name a stored record, so callers treat `None` as absent.
pub(crate) fn record_key(id: &str) -> Option<[u8; 16]> {
    Uuid::parse_str(id).ok().map(|uuid| uuid.into_bytes())
}
