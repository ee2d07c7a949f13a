use crate::models::db_operations::DbError;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub mod account_helpers;
pub mod credential_helpers;
pub mod principal_helpers;
pub mod workflow_helpers;
pub mod reporting_helpers;
pub mod records_helpers;
pub mod sanitization_helpers;

/// Every failure a request can end in. Translated into an HTTP status at the
/// boundary by the `ResponseError` impl below.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Missing, malformed, expired or mis-signed token, or a token whose
    /// principal no longer exists. One message for every cause.
    #[error("Could not validate credentials")]
    Unauthenticated,
    #[error("Incorrect email or password")]
    InvalidCredentials,
    /// Absent, or owned by another client. The two are indistinguishable.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Storage(#[source] DbError),
    #[error("Internal server error")]
    Internal(String),
}

impl From<DbError> for PortalError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(_) => PortalError::Conflict("Email already registered".to_string()),
            other => PortalError::Storage(other),
        }
    }
}

impl From<r2d2::Error> for PortalError {
    fn from(e: r2d2::Error) -> Self {
        PortalError::Storage(DbError::Pool(e))
    }
}

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Unauthenticated | PortalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) | PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Storage(_) | PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            PortalError::Storage(e) => log::error!("Storage failure: {}", e),
            PortalError::Internal(msg) => log::error!("Internal failure: {}", msg),
            _ => {}
        }

        let mut builder = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(json!({ "success": false, "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_not_exposed() {
        let err = PortalError::from(DbError::InvalidKey("x".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn duplicate_email_maps_to_bad_request() {
        let err = PortalError::from(DbError::Conflict("email 'a@x.com' is already registered".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn unauthenticated_carries_a_bearer_challenge() {
        let resp = PortalError::Unauthenticated.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
