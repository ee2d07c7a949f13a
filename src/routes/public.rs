use super::run_blocking;
use crate::helper::account_helpers::{self, LoginRequest, RegisterRequest};
use crate::helper::credential_helpers::TokenService;
use crate::helper::PortalError;
use crate::DbPool;
use actix_web::{web, HttpResponse, Responder};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(is_server_active))
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login));
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn register(pool: web::Data<DbPool>, body: web::Json<RegisterRequest>) -> Result<HttpResponse, PortalError> {
    let client = run_blocking(move || account_helpers::register_client(&pool, &body)).await?;
    Ok(HttpResponse::Ok().json(client))
}

async fn login(
    pool: web::Data<DbPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, PortalError> {
    let token = run_blocking(move || account_helpers::login_client(&pool, &tokens, &body)).await?;
    Ok(HttpResponse::Ok().json(token))
}
