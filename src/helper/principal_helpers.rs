use super::credential_helpers::TokenService;
use super::PortalError;
use crate::models::db_operations::identity_db_operations;
use crate::models::{AdminUser, Client, PrincipalKind};
use crate::DbPool;

/// The authenticated actor behind a request.
#[derive(Debug, Clone)]
pub enum Principal {
    Client(Client),
    Admin(AdminUser),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Client(_) => PrincipalKind::Client,
            Principal::Admin(_) => PrincipalKind::Admin,
        }
    }
}

/// Validates `token` and loads the record it names. A token for a record
/// that no longer exists is as unauthenticated as a forged one.
pub fn resolve(pool: &DbPool, tokens: &TokenService, token: &str) -> Result<Principal, PortalError> {
    let subject = tokens.validate(token)?;
    let conn = pool.get()?;

    let principal = match subject.kind {
        PrincipalKind::Client => identity_db_operations::read_client_by_id(&conn, &subject.subject_id)?
            .map(Principal::Client),
        PrincipalKind::Admin => identity_db_operations::read_admin_by_id(&conn, &subject.subject_id)?
            .map(Principal::Admin),
    };

    principal.ok_or_else(|| {
        log::debug!("Token subject {} ({}) has no record", subject.subject_id, subject.kind);
        PortalError::Unauthenticated
    })
}

fn wrong_kind(principal: &Principal, wanted: PrincipalKind) -> PortalError {
    log::debug!("Rejected {} token where {} was required", principal.kind(), wanted);
    PortalError::Unauthenticated
}

pub fn resolve_client(pool: &DbPool, tokens: &TokenService, token: &str) -> Result<Client, PortalError> {
    match resolve(pool, tokens, token)? {
        Principal::Client(client) => Ok(client),
        other => Err(wrong_kind(&other, PrincipalKind::Client)),
    }
}

/// Any resolved admin may perform any admin operation; `role` is not consulted.
pub fn resolve_admin(pool: &DbPool, tokens: &TokenService, token: &str) -> Result<AdminUser, PortalError> {
    match resolve(pool, tokens, token)? {
        Principal::Admin(admin) => Ok(admin),
        other => Err(wrong_kind(&other, PrincipalKind::Admin)),
    }
}
