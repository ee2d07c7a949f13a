use crate::models::db_operations::materials_db_operations::{MATERIALS, MATERIALS_BY_CLIENT};
use crate::models::db_operations::records_db_operations::{CAMPAIGNS, CAMPAIGNS_BY_CLIENT, DOCUMENTS, DOCUMENTS_BY_CLIENT};
use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_identity_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'clients' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'paused', 'completed')),
            project_type TEXT NOT NULL,
            visible_metrics TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    log::info!("Creating 'admin_users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS admin_users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'editor', 'viewer')),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn setup_content_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        log::info!("Creating 'materials' tables in Redb...");
        write_txn.open_table(MATERIALS)?;
        write_txn.open_table(MATERIALS_BY_CLIENT)?;

        log::info!("Creating 'campaigns' tables in Redb...");
        write_txn.open_table(CAMPAIGNS)?;
        write_txn.open_table(CAMPAIGNS_BY_CLIENT)?;

        log::info!("Creating 'documents' tables in Redb...");
        write_txn.open_table(DOCUMENTS)?;
        write_txn.open_table(DOCUMENTS_BY_CLIENT)?;
    }
    write_txn.commit()?;
    Ok(())
}
