//! Read-only projections over the stores. Nothing here writes.

use super::workflow_helpers::ApprovalWorkflow;
use super::PortalError;
use crate::models::db_operations::{identity_db_operations, records_db_operations};
use crate::models::material_models::{Material, MaterialStatus};
use crate::models::record_models::{click_through_rate, cost_per_click, round2, CampaignStatus};
use crate::models::ClientStatus;
use crate::DbPool;
use redb::Database;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct DashboardCounts {
    pub total_clients: usize,
    pub active_clients: usize,
    pub total_materials: usize,
    pub materials_by_status: BTreeMap<MaterialStatus, usize>,
    pub total_campaigns: usize,
    pub active_campaigns: usize,
    pub total_documents: usize,
    pub unread_comments: usize,
}

#[derive(Debug, Serialize)]
pub struct ClientStats {
    pub client_id: String,
    pub total_materials: usize,
    pub materials_by_status: BTreeMap<MaterialStatus, usize>,
    pub pending_approvals: usize,
    pub campaigns: usize,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub documents: usize,
}

/// Which documents a stats view counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    All,
    VisibleOnly,
}

/// Every status appears, zero or not, so the shape is stable for the UI.
pub fn count_by_status(materials: &[Material]) -> BTreeMap<MaterialStatus, usize> {
    let mut counts: BTreeMap<MaterialStatus, usize> = MaterialStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for material in materials {
        *counts.entry(material.status).or_insert(0) += 1;
    }
    counts
}

pub fn admin_dashboard(pool: &DbPool, workflow: &ApprovalWorkflow, db: &Database) -> Result<DashboardCounts, PortalError> {
    let clients = {
        let conn = pool.get()?;
        identity_db_operations::read_all_clients(&conn)?
    };
    let materials = workflow.list_materials(None)?;
    let campaigns = records_db_operations::list_campaigns(db, None)?;
    let documents = records_db_operations::list_documents(db, None)?;

    Ok(DashboardCounts {
        total_clients: clients.len(),
        active_clients: clients.iter().filter(|c| c.status == ClientStatus::Active).count(),
        total_materials: materials.len(),
        materials_by_status: count_by_status(&materials),
        total_campaigns: campaigns.len(),
        active_campaigns: campaigns.iter().filter(|c| c.status == CampaignStatus::Active).count(),
        total_documents: documents.len(),
        unread_comments: materials.iter().map(Material::unread_comment_count).sum(),
    })
}

pub fn client_stats(
    workflow: &ApprovalWorkflow,
    db: &Database,
    client_id: &str,
    scope: DocumentScope,
) -> Result<ClientStats, PortalError> {
    let materials = workflow.list_materials(Some(client_id))?;
    let campaigns = records_db_operations::list_campaigns(db, Some(client_id))?;
    let documents = records_db_operations::list_documents(db, Some(client_id))?;

    let by_status = count_by_status(&materials);
    let pending_approvals = by_status.get(&MaterialStatus::AwaitingApproval).copied().unwrap_or(0);
    let impressions: u64 = campaigns.iter().map(|c| c.impressions).sum();
    let clicks: u64 = campaigns.iter().map(|c| c.clicks).sum();
    let spend: f64 = campaigns.iter().map(|c| c.spend).sum();
    let documents = match scope {
        DocumentScope::All => documents.len(),
        DocumentScope::VisibleOnly => documents.iter().filter(|d| d.visible_to_client).count(),
    };

    Ok(ClientStats {
        client_id: client_id.to_string(),
        total_materials: materials.len(),
        materials_by_status: by_status,
        pending_approvals,
        campaigns: campaigns.len(),
        impressions,
        clicks,
        spend: round2(spend),
        ctr: click_through_rate(clicks, impressions),
        cpc: cost_per_click(spend, clicks),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::material_models::{MaterialType, NewMaterial};
    use chrono::Utc;

    fn material(status: MaterialStatus) -> Material {
        let mut m = Material::new(
            "client-a",
            NewMaterial {
                title: "Post".into(),
                description: String::new(),
                material_type: MaterialType::Photo,
                scheduled_date: Utc::now(),
                file_url: None,
                tags: Default::default(),
            },
            None,
        );
        m.status = status;
        m
    }

    #[test]
    fn status_counts_include_empty_buckets() {
        let materials = vec![
            material(MaterialStatus::AwaitingApproval),
            material(MaterialStatus::AwaitingApproval),
            material(MaterialStatus::Published),
        ];
        let counts = count_by_status(&materials);
        assert_eq!(counts.len(), MaterialStatus::ALL.len());
        assert_eq!(counts[&MaterialStatus::AwaitingApproval], 2);
        assert_eq!(counts[&MaterialStatus::Published], 1);
        assert_eq!(counts[&MaterialStatus::Planned], 0);
    }

    #[test]
    fn status_counts_serialize_with_wire_names() {
        let json = serde_json::to_value(count_by_status(&[material(MaterialStatus::RevisionRequested)])).unwrap();
        assert_eq!(json["revision_requested"], 1);
        assert_eq!(json["in_production"], 0);
    }
}
