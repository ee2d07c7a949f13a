use crate::models::db_operations::materials_db_operations::{MaterialStore, RedbMaterialStore};
use crate::models::db_operations::{identity_db_operations, records_db_operations, DbError};
use crate::models::material_models::{
    ApprovalHistory, Comment, HistoryAction, Material, MaterialStatus, MaterialType, NewMaterial,
};
use crate::models::record_models::{Campaign, CampaignStatus, Document, DocumentCategory, NewCampaign, NewDocument};
use chrono::{DateTime, Duration, TimeZone, Utc};
use redb::Database;
use rusqlite::Connection;
use std::sync::Arc;

pub const DEMO_EMAIL: &str = "demo@take2studio.com";
pub const DEMO_PASSWORD: &str = "demo123";
const DEMO_NAME: &str = "Demo Client";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub client_id: String,
    pub created: bool,
    pub materials: usize,
    pub campaigns: usize,
    pub documents: usize,
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap_or_else(Utc::now)
}

struct DemoMaterial {
    title: &'static str,
    description: &'static str,
    material_type: MaterialType,
    status: MaterialStatus,
    scheduled: DateTime<Utc>,
    file_url: Option<&'static str>,
    comment: Option<(&'static str, i64)>,
    history: Vec<(HistoryAction, i64, Option<&'static str>)>,
}

fn demo_materials() -> Vec<DemoMaterial> {
    vec![
        DemoMaterial {
            title: "Instagram Post - New Product Launch",
            description: "Exciting announcement about our latest product line with engaging visuals and compelling copy",
            material_type: MaterialType::Photo,
            status: MaterialStatus::AwaitingApproval,
            scheduled: at(2025, 3, 15, 10),
            file_url: Some("https://images.unsplash.com/photo-1611162618071-b39a2ec055fb"),
            comment: Some(("This looks great! Could we try a different background color to make it more vibrant?", 120)),
            history: vec![(HistoryAction::RevisionRequested, 120, Some("Background color change requested"))],
        },
        DemoMaterial {
            title: "Facebook Video - Behind the Scenes",
            description: "Behind the scenes footage of our production process showcasing our team at work",
            material_type: MaterialType::Video,
            status: MaterialStatus::InProduction,
            scheduled: at(2025, 3, 18, 14),
            file_url: Some("https://images.unsplash.com/photo-1513530534585-c7b1394c6d51"),
            comment: None,
            history: vec![],
        },
        DemoMaterial {
            title: "Story Series - Daily Tips",
            description: "5-part story series with daily marketing tips for our audience",
            material_type: MaterialType::Story,
            status: MaterialStatus::Planned,
            scheduled: at(2025, 3, 20, 9),
            file_url: None,
            comment: None,
            history: vec![],
        },
        DemoMaterial {
            title: "Carousel Post - Portfolio Showcase",
            description: "Multi-image carousel showcasing recent client work and success stories",
            material_type: MaterialType::Carousel,
            status: MaterialStatus::Published,
            scheduled: at(2025, 3, 12, 16),
            file_url: Some("https://images.unsplash.com/photo-1651688945265-be97106bb317"),
            comment: None,
            history: vec![(HistoryAction::Approved, 1440, None), (HistoryAction::Published, 360, None)],
        },
        DemoMaterial {
            title: "LinkedIn Article - Industry Insights",
            description: "Professional article about latest industry trends and insights",
            material_type: MaterialType::Photo,
            status: MaterialStatus::Approved,
            scheduled: at(2025, 3, 22, 11),
            file_url: Some("https://images.unsplash.com/photo-1516321318423-f06f85e504b3"),
            comment: None,
            history: vec![(HistoryAction::Approved, 720, None)],
        },
        DemoMaterial {
            title: "TikTok Video - Trending Challenge",
            description: "Creative video following the latest TikTok trend to increase engagement",
            material_type: MaterialType::Video,
            status: MaterialStatus::RevisionRequested,
            scheduled: at(2025, 3, 25, 15),
            file_url: Some("https://images.unsplash.com/photo-1598300042247-d088f8ab3a91"),
            comment: Some((
                "The concept is great, but could we make the opening more dynamic? Maybe add some text overlays?",
                240,
            )),
            history: vec![(HistoryAction::RevisionRequested, 240, Some("Opening needs to be more dynamic"))],
        },
    ]
}

fn build_material(client_id: &str, demo: DemoMaterial, now: DateTime<Utc>) -> Material {
    let mut material = Material::new(
        client_id,
        NewMaterial {
            title: demo.title.to_string(),
            description: demo.description.to_string(),
            material_type: demo.material_type,
            scheduled_date: demo.scheduled,
            file_url: demo.file_url.map(str::to_string),
            tags: Default::default(),
        },
        None,
    );
    material.status = demo.status;
    if let Some((text, minutes_ago)) = demo.comment {
        material.comments.push(Comment::unread(text, DEMO_NAME, now - Duration::minutes(minutes_ago)));
    }
    material.approval_history = demo
        .history
        .iter()
        .map(|(action, minutes_ago, comment)| ApprovalHistory {
            action: *action,
            timestamp: now - Duration::minutes(*minutes_ago),
            comment: comment.map(str::to_string),
        })
        .collect();
    material
}

fn demo_campaigns(client_id: &str) -> Vec<Campaign> {
    [
        ("Spring Product Launch", 15420, 832, 47, 2500.00, 1850.75),
        ("Brand Awareness Campaign", 8750, 425, 23, 1500.00, 1125.50),
    ]
    .into_iter()
    .map(|(name, impressions, clicks, conversions, budget, spend)| {
        Campaign::new(NewCampaign {
            client_id: client_id.to_string(),
            name: name.to_string(),
            status: CampaignStatus::Active,
            impressions,
            clicks,
            conversions,
            budget,
            spend,
        })
    })
    .collect()
}

fn demo_documents(client_id: &str) -> Vec<Document> {
    [
        ("Brand Positioning - January 2025", DocumentCategory::Strategy, "2.3 MB", "positioning.pdf", at(2025, 1, 1, 0)),
        ("Script - Institutional Video", DocumentCategory::Scripts, "1.8 MB", "video-script.pdf", at(2025, 1, 15, 0)),
        ("Brief - Spring Campaign", DocumentCategory::Briefs, "3.1 MB", "spring-brief.pdf", at(2025, 2, 1, 0)),
        ("Visual Identity Manual", DocumentCategory::Guidelines, "5.7 MB", "brand-guidelines.pdf", at(2025, 1, 10, 0)),
        ("Performance Report - February", DocumentCategory::Reports, "2.9 MB", "february-report.pdf", at(2025, 3, 1, 0)),
    ]
    .into_iter()
    .map(|(name, category, size, file, uploaded)| {
        let mut document = Document::new(NewDocument {
            client_id: client_id.to_string(),
            name: name.to_string(),
            category,
            file_type: "pdf".to_string(),
            size: size.to_string(),
            file_url: format!("https://example.com/documents/{}", file),
            visible_to_client: true,
        });
        document.upload_date = uploaded;
        document
    })
    .collect()
}

/// Inserts the demo client and its content. Running it again once the demo
/// client exists changes nothing.
pub fn seed_demo(conn: &Connection, content_db: Arc<Database>) -> Result<SeedReport, DbError> {
    if let Some(existing) = identity_db_operations::read_client_by_email(conn, DEMO_EMAIL)? {
        log::info!("Demo client already present ({}), skipping seed", existing.id);
        return Ok(SeedReport { client_id: existing.id, ..Default::default() });
    }

    let password_hash = bcrypt::hash(DEMO_PASSWORD, bcrypt::DEFAULT_COST)?;
    let client = identity_db_operations::create_client(conn, DEMO_NAME, DEMO_EMAIL, &password_hash)?;
    let mut report = SeedReport { client_id: client.id.clone(), created: true, ..Default::default() };

    let now = Utc::now();
    let store = RedbMaterialStore::new(Arc::clone(&content_db));
    for demo in demo_materials() {
        store.insert(&build_material(&client.id, demo, now))?;
        report.materials += 1;
    }
    for campaign in demo_campaigns(&client.id) {
        records_db_operations::create_campaign(&content_db, &campaign)?;
        report.campaigns += 1;
    }
    for document in demo_documents(&client.id) {
        records_db_operations::create_document(&content_db, &document)?;
        report.documents += 1;
    }

    log::info!(
        "Seeded demo client {} with {} materials, {} campaigns, {} documents",
        client.id, report.materials, report.campaigns, report.documents
    );
    Ok(report)
}
