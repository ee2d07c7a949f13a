use super::credential_helpers::{self, TokenResponse, TokenService};
use super::sanitization_helpers::clean_required_text;
use super::PortalError;
use crate::models::db_operations::{identity_db_operations, records_db_operations};
use crate::models::{Client, ClientResponse, ClientUpdate, PrincipalKind};
use crate::DbPool;
use redb::Database;
use serde::Deserialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Lower-cases and checks the obvious shape of an address.
pub fn normalize_email(raw: &str) -> Result<String, PortalError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(PortalError::Validation("A valid email address is required.".to_string()));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<(), PortalError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::Validation(format!(
            "Password must be at least {} characters.", MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Creates a client account. Used both for self-registration and by admins.
pub fn register_client(pool: &DbPool, request: &RegisterRequest) -> Result<ClientResponse, PortalError> {
    let name = clean_required_text(&request.name)
        .ok_or_else(|| PortalError::Validation("Name is required.".to_string()))?;
    let email = normalize_email(&request.email)?;
    check_password(&request.password)?;

    let password_hash = credential_helpers::hash_password(&request.password)?;
    let conn = pool.get()?;
    let client = identity_db_operations::create_client(&conn, &name, &email, &password_hash)?;
    log::info!("Registered client {} <{}>", client.id, client.email);
    Ok(ClientResponse::from(&client))
}

pub fn login_client(pool: &DbPool, tokens: &TokenService, request: &LoginRequest) -> Result<TokenResponse, PortalError> {
    let email = normalize_email(&request.email).map_err(|_| PortalError::InvalidCredentials)?;
    let conn = pool.get()?;

    match identity_db_operations::read_client_by_email(&conn, &email)? {
        Some(client) if credential_helpers::verify_password(&request.password, &client.password_hash) => {
            let token = tokens.issue(&client.id, PrincipalKind::Client)?;
            Ok(TokenResponse::bearer(token))
        }
        Some(_) => Err(PortalError::InvalidCredentials),
        None => {
            credential_helpers::verify_against_dummy(&request.password);
            Err(PortalError::InvalidCredentials)
        }
    }
}

pub fn login_admin(pool: &DbPool, tokens: &TokenService, request: &LoginRequest) -> Result<TokenResponse, PortalError> {
    let email = normalize_email(&request.email).map_err(|_| PortalError::InvalidCredentials)?;
    let conn = pool.get()?;

    match identity_db_operations::read_admin_by_email(&conn, &email)? {
        Some(admin) if credential_helpers::verify_password(&request.password, &admin.password_hash) => {
            let token = tokens.issue(&admin.id, PrincipalKind::Admin)?;
            log::info!("Admin {} signed in", admin.email);
            Ok(TokenResponse::bearer(token))
        }
        Some(_) => Err(PortalError::InvalidCredentials),
        None => {
            credential_helpers::verify_against_dummy(&request.password);
            Err(PortalError::InvalidCredentials)
        }
    }
}

// --- Admin-side client management ---

pub fn fetch_all_clients(pool: &DbPool) -> Result<Vec<ClientResponse>, PortalError> {
    let conn = pool.get()?;
    let clients = identity_db_operations::read_all_clients(&conn)?;
    Ok(clients.iter().map(ClientResponse::from).collect())
}

pub fn fetch_client(pool: &DbPool, client_id: &str) -> Result<Client, PortalError> {
    let conn = pool.get()?;
    identity_db_operations::read_client_by_id(&conn, client_id)?
        .ok_or(PortalError::NotFound("Client"))
}

/// Orders client deletion against the creation of anything a client owns.
///
/// Creators hold it shared from the owner check until their insert commits;
/// `delete_client` holds it exclusively across the whole cascade.
#[derive(Debug, Default)]
pub struct OwnerLock(RwLock<()>);

impl OwnerLock {
    pub fn new() -> Self {
        OwnerLock::default()
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.0.read().unwrap_or_else(|poisoned| {
            log::error!("OwnerLock was poisoned! Recovering lock.");
            poisoned.into_inner()
        })
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.0.write().unwrap_or_else(|poisoned| {
            log::error!("OwnerLock was poisoned! Recovering lock.");
            poisoned.into_inner()
        })
    }
}

/// Loads `client_id` and runs `create` for it while no deletion can start.
pub fn with_live_client<T, F>(pool: &DbPool, owners: &OwnerLock, client_id: &str, create: F) -> Result<T, PortalError>
where
    F: FnOnce(&Client) -> Result<T, PortalError>,
{
    let _shared = owners.shared();
    let client = fetch_client(pool, client_id)?;
    create(&client)
}

/// Applies an admin edit to a client. Text fields are cleaned, a new
/// password is re-hashed, and a taken email is a `Conflict`.
pub fn update_client(pool: &DbPool, client_id: &str, changes: &ClientUpdate) -> Result<ClientResponse, PortalError> {
    let name = match &changes.name {
        Some(raw) => Some(clean_required_text(raw)
            .ok_or_else(|| PortalError::Validation("Name cannot be empty.".to_string()))?),
        None => None,
    };
    let email = changes.email.as_deref().map(normalize_email).transpose()?;
    let project_type = match &changes.project_type {
        Some(raw) => Some(clean_required_text(raw)
            .ok_or_else(|| PortalError::Validation("Project type cannot be empty.".to_string()))?),
        None => None,
    };
    let new_hash = match &changes.password {
        Some(password) => {
            check_password(password)?;
            Some(credential_helpers::hash_password(password)?)
        }
        None => None,
    };

    let cleaned = ClientUpdate {
        name,
        email,
        password: None,
        status: changes.status,
        project_type,
        visible_metrics: changes.visible_metrics.clone(),
    };

    let conn = pool.get()?;
    let client = identity_db_operations::update_client(&conn, client_id, &cleaned, new_hash.as_deref())?
        .ok_or(PortalError::NotFound("Client"))?;
    Ok(ClientResponse::from(&client))
}

/// Deletes a client together with every material, campaign and document it
/// owns. Content goes first so a failure never leaves orphaned records
/// pointing at a missing client.
pub fn delete_client(pool: &DbPool, content_db: &Database, owners: &OwnerLock, client_id: &str) -> Result<(), PortalError> {
    let _exclusive = owners.exclusive();
    let conn = pool.get()?;
    if identity_db_operations::read_client_by_id(&conn, client_id)?.is_none() {
        return Err(PortalError::NotFound("Client"));
    }

    let removed = records_db_operations::delete_client_content(content_db, client_id)?;
    identity_db_operations::delete_client(&conn, client_id)?;
    log::info!("Deleted client {} and {} owned records", client_id, removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::records_helpers;
    use crate::helper::workflow_helpers::ApprovalWorkflow;
    use crate::identity_pool;
    use crate::models::db_operations::materials_db_operations::{MaterialStore, RedbMaterialStore};
    use crate::models::material_models::{MaterialType, NewMaterial};
    use crate::models::record_models::{CampaignStatus, NewCampaign};
    use crate::setup::db_setup;
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
        for bad in ["", "ax.com", "@x.com", "a@x", "a@.com", "a b@x.com"] {
            assert!(matches!(normalize_email(bad), Err(PortalError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password("12345").is_err());
        assert!(check_password("demo123").is_ok());
    }

    #[test]
    fn deletion_waits_for_an_in_flight_create() {
        let dir = tempfile::tempdir().unwrap();
        let identity_path = dir.path().join("identity.db");
        db_setup::setup_identity_db(&mut Connection::open(&identity_path).unwrap()).unwrap();
        let pool = identity_pool(&identity_path).unwrap();
        let content = Arc::new(Database::create(dir.path().join("content.db")).unwrap());
        db_setup::setup_content_db(&content).unwrap();
        let store = Arc::new(RedbMaterialStore::new(Arc::clone(&content)));
        let workflow = ApprovalWorkflow::new(store.clone());
        let owners = Arc::new(OwnerLock::new());

        let client_id = {
            let conn = pool.get().unwrap();
            identity_db_operations::create_client(&conn, "Client A", "a@x.com", "hash").unwrap().id
        };

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let creator = {
            let (pool, owners, client_id) = (pool.clone(), Arc::clone(&owners), client_id.clone());
            thread::spawn(move || {
                with_live_client(&pool, &owners, &client_id, |owner| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    workflow.create_for_client(
                        owner,
                        NewMaterial {
                            title: "Late post".into(),
                            description: String::new(),
                            material_type: MaterialType::Photo,
                            scheduled_date: Utc::now(),
                            file_url: None,
                            tags: Default::default(),
                        },
                    )
                })
            })
        };
        entered_rx.recv().unwrap();

        let deleter = {
            let (pool, content, owners, client_id) =
                (pool.clone(), Arc::clone(&content), Arc::clone(&owners), client_id.clone());
            thread::spawn(move || delete_client(&pool, &content, &owners, &client_id))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!deleter.is_finished());

        release_tx.send(()).unwrap();
        creator.join().unwrap().unwrap();
        deleter.join().unwrap().unwrap();
        assert!(store.list(None).unwrap().is_empty());

        let late_campaign = NewCampaign {
            client_id: client_id.clone(),
            name: "Too late".into(),
            status: CampaignStatus::Active,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            budget: 0.0,
            spend: 0.0,
        };
        assert!(matches!(
            records_helpers::create_campaign(&pool, &content, &owners, late_campaign),
            Err(PortalError::NotFound("Client"))
        ));
    }
}
