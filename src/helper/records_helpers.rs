use super::account_helpers::{with_live_client, OwnerLock};
use super::sanitization_helpers::clean_required_text;
use super::PortalError;
use crate::models::db_operations::records_db_operations;
use crate::models::record_models::{
    Campaign, CampaignPatch, CampaignView, Document, DocumentCategory, DocumentPatch, NewCampaign, NewDocument,
};
use crate::models::Client;
use crate::DbPool;
use redb::Database;

// --- Client side ---

pub fn campaigns_for_client(db: &Database, client: &Client) -> Result<Vec<CampaignView>, PortalError> {
    let campaigns = records_db_operations::list_campaigns(db, Some(&client.id))?;
    Ok(campaigns.into_iter().map(CampaignView::from).collect())
}

/// Documents in one category that the client is allowed to see.
pub fn documents_in_category(db: &Database, client: &Client, category: &str) -> Result<Vec<Document>, PortalError> {
    let category = DocumentCategory::parse(category)
        .ok_or_else(|| PortalError::Validation(format!("Unknown document category '{}'.", category)))?;
    let documents = records_db_operations::list_documents(db, Some(&client.id))?;
    Ok(documents
        .into_iter()
        .filter(|d| d.visible_to_client && d.category == category)
        .collect())
}

/// Hidden documents are as absent to the client as foreign ones.
pub fn document_download(db: &Database, client: &Client, document_id: &str) -> Result<String, PortalError> {
    records_db_operations::read_document(db, document_id)?
        .filter(|d| d.client_id == client.id && d.visible_to_client)
        .map(|d| d.file_url)
        .ok_or(PortalError::NotFound("Document"))
}

// --- Admin side ---

pub fn list_campaigns(db: &Database, client_id: Option<&str>) -> Result<Vec<CampaignView>, PortalError> {
    let campaigns = records_db_operations::list_campaigns(db, client_id)?;
    Ok(campaigns.into_iter().map(CampaignView::from).collect())
}

pub fn create_campaign(pool: &DbPool, db: &Database, owners: &OwnerLock, mut fields: NewCampaign) -> Result<CampaignView, PortalError> {
    fields.name = clean_required_text(&fields.name)
        .ok_or_else(|| PortalError::Validation("Campaign name is required.".to_string()))?;
    check_amounts(Some(fields.budget), Some(fields.spend))?;

    let client_id = fields.client_id.clone();
    let campaign = with_live_client(pool, owners, &client_id, |_| {
        let campaign = Campaign::new(fields);
        records_db_operations::create_campaign(db, &campaign)?;
        Ok(campaign)
    })?;
    log::info!("Created campaign {} for client {}", campaign.id, campaign.client_id);
    Ok(CampaignView::from(campaign))
}

pub fn update_campaign(db: &Database, campaign_id: &str, mut patch: CampaignPatch) -> Result<CampaignView, PortalError> {
    if let Some(name) = patch.name.take() {
        patch.name = Some(
            clean_required_text(&name)
                .ok_or_else(|| PortalError::Validation("Campaign name cannot be empty.".to_string()))?,
        );
    }
    check_amounts(patch.budget, patch.spend)?;

    let campaign = records_db_operations::update_campaign(db, campaign_id, &patch)?
        .ok_or(PortalError::NotFound("Campaign"))?;
    Ok(CampaignView::from(campaign))
}

pub fn list_documents(db: &Database, client_id: Option<&str>) -> Result<Vec<Document>, PortalError> {
    Ok(records_db_operations::list_documents(db, client_id)?)
}

pub fn create_document(pool: &DbPool, db: &Database, owners: &OwnerLock, mut fields: NewDocument) -> Result<Document, PortalError> {
    fields.name = clean_required_text(&fields.name)
        .ok_or_else(|| PortalError::Validation("Document name is required.".to_string()))?;
    if fields.file_url.trim().is_empty() {
        return Err(PortalError::Validation("A file URL is required.".to_string()));
    }

    let client_id = fields.client_id.clone();
    let document = with_live_client(pool, owners, &client_id, |_| {
        let document = Document::new(fields);
        records_db_operations::create_document(db, &document)?;
        Ok(document)
    })?;
    log::info!("Created document {} for client {}", document.id, document.client_id);
    Ok(document)
}

pub fn update_document(db: &Database, document_id: &str, mut patch: DocumentPatch) -> Result<Document, PortalError> {
    if let Some(name) = patch.name.take() {
        patch.name = Some(
            clean_required_text(&name)
                .ok_or_else(|| PortalError::Validation("Document name cannot be empty.".to_string()))?,
        );
    }
    if matches!(&patch.file_url, Some(url) if url.trim().is_empty()) {
        return Err(PortalError::Validation("A file URL is required.".to_string()));
    }

    let document = records_db_operations::update_document(db, document_id, &patch)?
        .ok_or(PortalError::NotFound("Document"))?;
    if let Some(visible) = patch.visible_to_client {
        log::info!("Document {} visible_to_client set to {}", document.id, visible);
    }
    Ok(document)
}

fn check_amounts(budget: Option<f64>, spend: Option<f64>) -> Result<(), PortalError> {
    let bad = [budget, spend].into_iter().flatten().any(|v| !v.is_finite() || v < 0.0);
    if bad {
        return Err(PortalError::Validation("Budget and spend must be non-negative numbers.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientStatus, DEFAULT_PROJECT_TYPE, default_visible_metrics};
    use crate::setup::db_setup;
    use chrono::Utc;
    use tempfile::TempDir;

    fn content_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("content.db")).unwrap();
        db_setup::setup_content_db(&db).unwrap();
        (dir, db)
    }

    fn client(id: &str) -> Client {
        Client {
            id: id.into(),
            name: "Client".into(),
            email: format!("{}@x.com", id),
            password_hash: String::new(),
            status: ClientStatus::Active,
            project_type: DEFAULT_PROJECT_TYPE.into(),
            visible_metrics: default_visible_metrics(),
            created_at: Utc::now(),
        }
    }

    fn document(client_id: &str, category: DocumentCategory, visible: bool) -> Document {
        Document::new(NewDocument {
            client_id: client_id.into(),
            name: "Q1 report".into(),
            category,
            file_type: "pdf".into(),
            size: "1.2 MB".into(),
            file_url: "https://files.example.com/q1.pdf".into(),
            visible_to_client: visible,
        })
    }

    #[test]
    fn clients_only_see_visible_documents() {
        let (_dir, db) = content_db();
        let a = client("client-a");
        let shown = document("client-a", DocumentCategory::Reports, true);
        let hidden = document("client-a", DocumentCategory::Reports, false);
        let other = document("client-a", DocumentCategory::Briefs, true);
        for d in [&shown, &hidden, &other] {
            records_db_operations::create_document(&db, d).unwrap();
        }

        let reports = documents_in_category(&db, &a, "reports").unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, shown.id);

        assert_eq!(document_download(&db, &a, &shown.id).unwrap(), shown.file_url);
        assert!(matches!(document_download(&db, &a, &hidden.id), Err(PortalError::NotFound("Document"))));
        assert!(matches!(
            document_download(&db, &client("client-b"), &shown.id),
            Err(PortalError::NotFound("Document"))
        ));
        assert!(matches!(documents_in_category(&db, &a, "memes"), Err(PortalError::Validation(_))));
    }

    #[test]
    fn campaign_views_carry_ratios() {
        let (_dir, db) = content_db();
        let campaign = Campaign::new(NewCampaign {
            client_id: "client-a".into(),
            name: "Spring".into(),
            status: crate::models::record_models::CampaignStatus::Active,
            impressions: 15420,
            clicks: 832,
            conversions: 47,
            budget: 2500.0,
            spend: 1850.75,
        });
        records_db_operations::create_campaign(&db, &campaign).unwrap();

        let views = campaigns_for_client(&db, &client("client-a")).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].ctr, 5.4);
        assert_eq!(views[0].cpc, 2.22);
        assert!(campaigns_for_client(&db, &client("client-b")).unwrap().is_empty());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let (_dir, db) = content_db();
        let patch = CampaignPatch { spend: Some(-1.0), ..Default::default() };
        assert!(matches!(update_campaign(&db, "anything", patch), Err(PortalError::Validation(_))));
        assert!(matches!(
            update_campaign(&db, "missing", CampaignPatch::default()),
            Err(PortalError::NotFound("Campaign"))
        ));
    }
}
