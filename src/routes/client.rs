use crate::helper::account_helpers::{self, OwnerLock};
use crate::helper::records_helpers;
use crate::helper::reporting_helpers::{self, DocumentScope};
use crate::helper::workflow_helpers::ApprovalWorkflow;
use crate::helper::PortalError;
use crate::middleware::AuthenticatedClient;
use crate::models::material_models::NewMaterial;
use crate::models::record_models::document_categories;
use crate::models::ClientResponse;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct CommentRequest {
    text: String,
}

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/me", web::get().to(get_me))
        .route("/dashboard", web::get().to(get_dashboard))
        .route("/materials", web::get().to(list_materials))
        .route("/materials", web::post().to(create_material))
        .route("/materials/{material_id}", web::get().to(get_material))
        .route("/materials/{material_id}/approve", web::post().to(approve_material))
        .route("/materials/{material_id}/request-revision", web::post().to(request_revision))
        .route("/materials/{material_id}/comments", web::get().to(list_comments))
        .route("/materials/{material_id}/comments", web::post().to(add_comment))
        .route("/campaigns", web::get().to(list_campaigns))
        // Must stay ahead of the `{category}` pattern.
        .route("/documents/categories", web::get().to(list_categories))
        .route("/documents/{category}", web::get().to(list_documents))
        .route("/documents/{document_id}/download", web::get().to(download_document));
}

async fn get_me(auth: AuthenticatedClient) -> HttpResponse {
    HttpResponse::Ok().json(ClientResponse::from(&auth.0))
}

async fn get_dashboard(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    db: web::Data<Database>,
) -> Result<HttpResponse, PortalError> {
    let stats = reporting_helpers::client_stats(&workflow, &db, &auth.0.id, DocumentScope::VisibleOnly)?;
    Ok(HttpResponse::Ok().json(stats))
}

// --- Materials ---

async fn list_materials(auth: AuthenticatedClient, workflow: web::Data<ApprovalWorkflow>) -> Result<HttpResponse, PortalError> {
    let materials = workflow.list_for_client(&auth.0)?;
    Ok(HttpResponse::Ok().json(materials))
}

async fn create_material(
    auth: AuthenticatedClient,
    pool: web::Data<DbPool>,
    owners: web::Data<OwnerLock>,
    workflow: web::Data<ApprovalWorkflow>,
    body: web::Json<NewMaterial>,
) -> Result<HttpResponse, PortalError> {
    // A client deleted since its token was resolved is no longer signed in.
    let material = account_helpers::with_live_client(&pool, &owners, &auth.0.id, |client| {
        workflow.create_for_client(client, body.into_inner())
    })
    .map_err(|e| match e {
        PortalError::NotFound("Client") => PortalError::Unauthenticated,
        other => other,
    })?;
    Ok(HttpResponse::Ok().json(material))
}

async fn get_material(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let material = workflow.get_for_client(&auth.0, &path)?;
    Ok(HttpResponse::Ok().json(material))
}

async fn approve_material(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let material = workflow.approve(&auth.0, &path)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Material approved successfully",
        "status": material.status,
    })))
}

async fn request_revision(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse, PortalError> {
    let material = workflow.request_revision(&auth.0, &path, &body.text)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Revision request submitted successfully",
        "status": material.status,
    })))
}

async fn list_comments(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let comments = workflow.list_comments(&auth.0, &path)?;
    Ok(HttpResponse::Ok().json(comments))
}

async fn add_comment(
    auth: AuthenticatedClient,
    workflow: web::Data<ApprovalWorkflow>,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse, PortalError> {
    let comment = workflow.add_comment(&auth.0, &path, &body.text)?;
    Ok(HttpResponse::Ok().json(comment))
}

// --- Campaigns & documents ---

async fn list_campaigns(auth: AuthenticatedClient, db: web::Data<Database>) -> Result<HttpResponse, PortalError> {
    let campaigns = records_helpers::campaigns_for_client(&db, &auth.0)?;
    Ok(HttpResponse::Ok().json(campaigns))
}

async fn list_categories(_auth: AuthenticatedClient) -> HttpResponse {
    HttpResponse::Ok().json(document_categories())
}

async fn list_documents(
    auth: AuthenticatedClient,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let documents = records_helpers::documents_in_category(&db, &auth.0, &path)?;
    Ok(HttpResponse::Ok().json(documents))
}

async fn download_document(
    auth: AuthenticatedClient,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, PortalError> {
    let download_url = records_helpers::document_download(&db, &auth.0, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "download_url": download_url })))
}
