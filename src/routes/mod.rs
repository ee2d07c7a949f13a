use crate::helper::PortalError;
use actix_web::{error, web, HttpRequest};

pub mod admin;
pub mod client;
pub mod public;

/// Mounts the whole JSON API under `/api`. The admin scope is registered
/// ahead of the client routes so `/api/admin/...` never falls into them.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .configure(public::config_routes)
            .service(web::scope("/admin").configure(admin::config_routes))
            .configure(client::config_routes),
    );
}

/// Malformed bodies come back in the same `{"success": false, ...}` shape
/// as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
            PortalError::Validation(format!("Invalid request body: {}", err)).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req: &HttpRequest| {
        PortalError::Validation(format!("Invalid query string: {}", err)).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: error::PathError, _req: &HttpRequest| {
        PortalError::Validation(format!("Invalid path: {}", err)).into()
    })
}

/// Runs password hashing and verification off the async workers.
pub(crate) async fn run_blocking<F, T>(work: F) -> Result<T, PortalError>
where
    F: FnOnce() -> Result<T, PortalError> + Send + 'static,
    T: Send + 'static,
{
    web::block(work)
        .await
        .map_err(|e| PortalError::Internal(format!("blocking task failed: {}", e)))?
}
