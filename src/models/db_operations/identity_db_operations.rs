use crate::models::{AdminRole, AdminUser, Client, ClientStatus, ClientUpdate, DEFAULT_PROJECT_TYPE, default_visible_metrics};
use super::DbError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite::types::Type;
use std::collections::BTreeSet;
use uuid::Uuid;

const CLIENT_COLUMNS: &str = "id, name, email, password_hash, status, project_type, visible_metrics, created_at";
const ADMIN_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_text_enum<T: std::str::FromStr<Err = String>>(idx: usize, raw: String) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|msg| {
        conversion_error(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
    })
}

fn client_from_row(row: &Row) -> rusqlite::Result<Client> {
    let metrics_json: String = row.get(6)?;
    let visible_metrics: BTreeSet<String> = serde_json::from_str(&metrics_json)
        .map_err(|e| conversion_error(6, e))?;
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        status: parse_text_enum(4, row.get(4)?)?,
        project_type: row.get(5)?,
        visible_metrics,
        created_at: parse_timestamp(7, row.get(7)?)?,
    })
}

fn admin_from_row(row: &Row) -> rusqlite::Result<AdminUser> {
    Ok(AdminUser {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_text_enum(4, row.get(4)?)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

/// Email is the only UNIQUE column, so any constraint failure on these
/// tables means the address is already taken.
fn map_constraint(e: rusqlite::Error, email: &str) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            DbError::Conflict(format!("email '{}' is already registered", email))
        }
        other => DbError::Rusqlite(other),
    }
}

// ====================================================================
// ============================ CLIENTS ===============================
// ====================================================================

pub fn create_client(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<Client, DbError> {
    let client = Client {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        status: ClientStatus::Active,
        project_type: DEFAULT_PROJECT_TYPE.to_string(),
        visible_metrics: default_visible_metrics(),
        created_at: Utc::now(),
    };
    let metrics_json = serde_json::to_string(&client.visible_metrics)?;

    conn.execute(
        "INSERT INTO clients (id, name, email, password_hash, status, project_type, visible_metrics, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            client.id,
            client.name,
            client.email,
            client.password_hash,
            client.status.as_str(),
            client.project_type,
            metrics_json,
            client.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| map_constraint(e, email))?;
    Ok(client)
}

pub fn read_client_by_id(conn: &Connection, id: &str) -> Result<Option<Client>, DbError> {
    let sql = format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], client_from_row).optional()?)
}

pub fn read_client_by_email(conn: &Connection, email: &str) -> Result<Option<Client>, DbError> {
    let sql = format!("SELECT {} FROM clients WHERE email = ?1", CLIENT_COLUMNS);
    Ok(conn.query_row(&sql, [email], client_from_row).optional()?)
}

pub fn read_all_clients(conn: &Connection) -> Result<Vec<Client>, DbError> {
    let sql = format!("SELECT {} FROM clients ORDER BY created_at, rowid", CLIENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], client_from_row)?;

    let mut clients = Vec::new();
    for client in rows {
        clients.push(client?);
    }
    Ok(clients)
}

/// Writes the changed fields back. `new_password_hash` replaces the stored
/// hash when present. Returns `None` if no client has that id.
pub fn update_client(
    conn: &Connection,
    id: &str,
    changes: &ClientUpdate,
    new_password_hash: Option<&str>,
) -> Result<Option<Client>, DbError> {
    let mut client = match read_client_by_id(conn, id)? {
        Some(c) => c,
        None => return Ok(None),
    };

    if let Some(name) = &changes.name {
        client.name = name.clone();
    }
    if let Some(email) = &changes.email {
        client.email = email.clone();
    }
    if let Some(status) = changes.status {
        client.status = status;
    }
    if let Some(project_type) = &changes.project_type {
        client.project_type = project_type.clone();
    }
    if let Some(metrics) = &changes.visible_metrics {
        client.visible_metrics = metrics.clone();
    }
    if let Some(hash) = new_password_hash {
        client.password_hash = hash.to_string();
    }

    let metrics_json = serde_json::to_string(&client.visible_metrics)?;
    conn.execute(
        "UPDATE clients SET name = ?1, email = ?2, password_hash = ?3, status = ?4, project_type = ?5, visible_metrics = ?6 WHERE id = ?7",
        params![
            client.name,
            client.email,
            client.password_hash,
            client.status.as_str(),
            client.project_type,
            metrics_json,
            client.id,
        ],
    )
    .map_err(|e| map_constraint(e, &client.email))?;
    Ok(Some(client))
}

pub fn delete_client(conn: &Connection, id: &str) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM clients WHERE id = ?1", [id])?)
}

// ====================================================================
// ========================== ADMIN USERS =============================
// ====================================================================

pub fn create_admin(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: AdminRole,
) -> Result<AdminUser, DbError> {
    let admin = AdminUser {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO admin_users (id, name, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            admin.id,
            admin.name,
            admin.email,
            admin.password_hash,
            admin.role.as_str(),
            admin.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| map_constraint(e, email))?;
    Ok(admin)
}

pub fn read_admin_by_id(conn: &Connection, id: &str) -> Result<Option<AdminUser>, DbError> {
    let sql = format!("SELECT {} FROM admin_users WHERE id = ?1", ADMIN_COLUMNS);
    Ok(conn.query_row(&sql, [id], admin_from_row).optional()?)
}

pub fn read_admin_by_email(conn: &Connection, email: &str) -> Result<Option<AdminUser>, DbError> {
    let sql = format!("SELECT {} FROM admin_users WHERE email = ?1", ADMIN_COLUMNS);
    Ok(conn.query_row(&sql, [email], admin_from_row).optional()?)
}

pub fn read_all_admins(conn: &Connection) -> Result<Vec<AdminUser>, DbError> {
    let sql = format!("SELECT {} FROM admin_users ORDER BY email", ADMIN_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], admin_from_row)?;

    let mut admins = Vec::new();
    for admin in rows {
        admins.push(admin?);
    }
    Ok(admins)
}

pub fn update_admin_password(conn: &Connection, email: &str, password_hash: &str) -> Result<usize, DbError> {
    Ok(conn.execute(
        "UPDATE admin_users SET password_hash = ?1 WHERE email = ?2",
        params![password_hash, email],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_identity_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn duplicate_client_email_is_a_conflict_and_keeps_the_first_record() {
        let conn = conn();
        let first = create_client(&conn, "Acme", "a@x.com", "hash-1").unwrap();
        let err = create_client(&conn, "Impostor", "a@x.com", "hash-2").unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let stored = read_client_by_email(&conn, "a@x.com").unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.name, "Acme");
        assert_eq!(stored.password_hash, "hash-1");
    }

    #[test]
    fn client_round_trips_through_its_row() {
        let conn = conn();
        let created = create_client(&conn, "Acme", "a@x.com", "hash").unwrap();
        let loaded = read_client_by_id(&conn, &created.id).unwrap().unwrap();
        assert_eq!(loaded.status, ClientStatus::Active);
        assert_eq!(loaded.visible_metrics, default_visible_metrics());
        assert_eq!(loaded.created_at.timestamp(), created.created_at.timestamp());
    }

    #[test]
    fn update_client_rejects_an_email_owned_by_someone_else() {
        let conn = conn();
        create_client(&conn, "A", "a@x.com", "h").unwrap();
        let b = create_client(&conn, "B", "b@x.com", "h").unwrap();

        let changes = ClientUpdate { email: Some("a@x.com".into()), ..Default::default() };
        let err = update_client(&conn, &b.id, &changes, None).unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let changes = ClientUpdate { status: Some(ClientStatus::Paused), ..Default::default() };
        let updated = update_client(&conn, &b.id, &changes, None).unwrap().unwrap();
        assert_eq!(updated.status, ClientStatus::Paused);
        assert!(update_client(&conn, "missing", &changes, None).unwrap().is_none());
    }

    #[test]
    fn admins_and_clients_live_in_separate_tables() {
        let conn = conn();
        let admin = create_admin(&conn, "Staff", "staff@x.com", "h", AdminRole::Editor).unwrap();
        assert!(read_client_by_id(&conn, &admin.id).unwrap().is_none());
        assert_eq!(read_admin_by_id(&conn, &admin.id).unwrap().unwrap().role, AdminRole::Editor);
    }
}
