use super::run_blocking;
use crate::helper::account_helpers::{self, LoginRequest, OwnerLock, RegisterRequest};
use crate::helper::credential_helpers::TokenService;
use crate::helper::records_helpers;
use crate::helper::reporting_helpers::{self, DocumentScope};
use crate::helper::workflow_helpers::ApprovalWorkflow;
use crate::helper::PortalError;
use crate::middleware::AuthenticatedAdmin;
use crate::models::material_models::{MaterialPatch, NewMaterial};
use crate::models::record_models::{CampaignPatch, DocumentPatch, NewCampaign, NewDocument};
use crate::models::{AdminUserResponse, ClientResponse, ClientUpdate};
use crate::DbPool;
use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ClientFilter {
    client_id: Option<String>,
}

#[derive(Deserialize)]
struct AdminMaterialRequest {
    client_id: String,
    #[serde(flatten)]
    fields: NewMaterial,
}

// Mounted under `/api/admin`. Everything except login needs an admin token.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/login", web::post().to(handle_admin_login))
        .route("/auth/me", web::get().to(get_me))
        .route("/dashboard", web::get().to(get_dashboard))
        .route("/clients", web::get().to(list_clients))
        .route("/clients", web::post().to(create_client))
        .route("/clients/{client_id}", web::get().to(get_client))
        .route("/clients/{client_id}", web::put().to(update_client))
        .route("/clients/{client_id}", web::delete().to(delete_client))
        .route("/clients/{client_id}/stats", web::get().to(get_client_stats))
        .route("/materials", web::get().to(list_materials))
        .route("/materials", web::post().to(create_material))
        .route("/materials/{material_id}", web::get().to(get_material))
        .route("/materials/{material_id}", web::put().to(update_material))
        .route("/campaigns", web::get().to(list_campaigns))
        .route("/campaigns", web::post().to(create_campaign))
        .route("/campaigns/{campaign_id}", web::put().to(update_campaign))
        .route("/documents", web::get().to(list_documents))
        .route("/documents", web::post().to(create_document))
        .route("/documents/{document_id}", web::put().to(update_document));
}

async fn handle_admin_login(
    pool: web::Data<DbPool>,
    tokens: web::Data<TokenService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, PortalError> {
    let token = run_blocking(move || account_helpers::login_admin(&pool, &tokens, &body)).await?;
    Ok(HttpResponse::Ok().json(token))
}

async fn get_me(auth: AuthenticatedAdmin) -> HttpResponse {
    HttpResponse::Ok().json(AdminUserResponse::from(&auth.0))
}

async fn get_dashboard(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    workflow: web::Data<ApprovalWorkflow>,
    db: web::Data<Database>,
) -> Result<HttpResponse, PortalError> {
    let counts = reporting_helpers::admin_dashboard(&pool, &workflow, &db)?;
    Ok(HttpResponse::Ok().json(counts))
}

// --- Clients ---

async fn list_clients(_auth: AuthenticatedAdmin, pool: web::Data<DbPool>) -> Result<HttpResponse, PortalError> {
    let clients = account_helpers::fetch_all_clients(&pool)?;
    Ok(HttpResponse::Ok().json(clients))
}

async fn create_client(
    auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, PortalError> {
    let client = run_blocking(move || account_helpers::register_client(&pool, &body)).await?;
    log::info!("Admin {} created client {}", auth.0.email, client.id);
    Ok(HttpResponse::Ok().json(client))
}

async fn get_client(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let client = account_helpers::fetch_client(&pool, &path)?;
    Ok(HttpResponse::Ok().json(ClientResponse::from(&client)))
}

async fn update_client(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<ClientUpdate>,
) -> Result<HttpResponse, PortalError> {
    let client_id = path.into_inner();
    let client = run_blocking(move || account_helpers::update_client(&pool, &client_id, &body)).await?;
    Ok(HttpResponse::Ok().json(client))
}

async fn delete_client(
    auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    db: web::Data<Database>,
    owners: web::Data<OwnerLock>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    account_helpers::delete_client(&pool, &db, &owners, &path)?;
    log::info!("Admin {} deleted client {}", auth.0.email, path.as_str());
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Client deleted successfully" })))
}

async fn get_client_stats(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    workflow: web::Data<ApprovalWorkflow>,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let client = account_helpers::fetch_client(&pool, &path)?;
    let stats = reporting_helpers::client_stats(&workflow, &db, &client.id, DocumentScope::All)?;
    Ok(HttpResponse::Ok().json(stats))
}

// --- Materials ---

async fn list_materials(
    _auth: AuthenticatedAdmin,
    workflow: web::Data<ApprovalWorkflow>,
    query: web::Query<ClientFilter>,
) -> Result<HttpResponse, PortalError> {
    let materials = workflow.list_materials(query.client_id.as_deref())?;
    Ok(HttpResponse::Ok().json(materials))
}

async fn get_material(
    _auth: AuthenticatedAdmin,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let material = workflow.get_material(&path)?;
    Ok(HttpResponse::Ok().json(material))
}

async fn create_material(
    auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    owners: web::Data<OwnerLock>,
    workflow: web::Data<ApprovalWorkflow>,
    body: web::Json<AdminMaterialRequest>,
) -> Result<HttpResponse, PortalError> {
    let AdminMaterialRequest { client_id, fields } = body.into_inner();
    let material = account_helpers::with_live_client(&pool, &owners, &client_id, |owner| {
        workflow.create_material(&auth.0, owner, fields)
    })?;
    Ok(HttpResponse::Ok().json(material))
}

async fn update_material(
    auth: AuthenticatedAdmin,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
    body: web::Json<MaterialPatch>,
) -> Result<HttpResponse, PortalError> {
    let material = workflow.update_material(&auth.0, &path, body.into_inner())?;
    Ok(HttpResponse::Ok().json(material))
}

// --- Campaigns ---

async fn list_campaigns(
    _auth: AuthenticatedAdmin,
    db: web::Data<Database>,
    query: web::Query<ClientFilter>,
) -> Result<HttpResponse, PortalError> {
    let campaigns = records_helpers::list_campaigns(&db, query.client_id.as_deref())?;
    Ok(HttpResponse::Ok().json(campaigns))
}

async fn create_campaign(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    db: web::Data<Database>,
    owners: web::Data<OwnerLock>,
    body: web::Json<NewCampaign>,
) -> Result<HttpResponse, PortalError> {
    let campaign = records_helpers::create_campaign(&pool, &db, &owners, body.into_inner())?;
    Ok(HttpResponse::Ok().json(campaign))
}

async fn update_campaign(
    _auth: AuthenticatedAdmin,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<CampaignPatch>,
) -> Result<HttpResponse, PortalError> {
    let campaign = records_helpers::update_campaign(&db, &path, body.into_inner())?;
    Ok(HttpResponse::Ok().json(campaign))
}

// --- Documents ---

async fn list_documents(
    _auth: AuthenticatedAdmin,
    db: web::Data<Database>,
    query: web::Query<ClientFilter>,
) -> Result<HttpResponse, PortalError> {
    let documents = records_helpers::list_documents(&db, query.client_id.as_deref())?;
    Ok(HttpResponse::Ok().json(documents))
}

async fn create_document(
    _auth: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    db: web::Data<Database>,
    owners: web::Data<OwnerLock>,
    body: web::Json<NewDocument>,
) -> Result<HttpResponse, PortalError> {
    let document = records_helpers::create_document(&pool, &db, &owners, body.into_inner())?;
    Ok(HttpResponse::Ok().json(document))
}

async fn update_document(
    _auth: AuthenticatedAdmin,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<DocumentPatch>,
) -> Result<HttpResponse, PortalError> {
    let document = records_helpers::update_document(&db, &path, body.into_inner())?;
    Ok(HttpResponse::Ok().json(document))
}
