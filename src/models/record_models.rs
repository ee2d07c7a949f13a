use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub budget: f64,
    pub spend: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub client_id: String,
    pub name: String,
    #[serde(default = "default_campaign_status")]
    pub status: CampaignStatus,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub spend: f64,
}

fn default_campaign_status() -> CampaignStatus {
    CampaignStatus::Active
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub status: Option<CampaignStatus>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub conversions: Option<u64>,
    pub budget: Option<f64>,
    pub spend: Option<f64>,
}

impl Campaign {
    pub fn new(fields: NewCampaign) -> Self {
        Campaign {
            id: Uuid::new_v4().to_string(),
            client_id: fields.client_id,
            name: fields.name,
            status: fields.status,
            impressions: fields.impressions,
            clicks: fields.clicks,
            conversions: fields.conversions,
            budget: fields.budget,
            spend: fields.spend,
            created_at: Utc::now(),
        }
    }

    pub fn apply_patch(&mut self, patch: &CampaignPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(impressions) = patch.impressions {
            self.impressions = impressions;
        }
        if let Some(clicks) = patch.clicks {
            self.clicks = clicks;
        }
        if let Some(conversions) = patch.conversions {
            self.conversions = conversions;
        }
        if let Some(budget) = patch.budget {
            self.budget = budget;
        }
        if let Some(spend) = patch.spend {
            self.spend = spend;
        }
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Click-through rate as a percentage; 0 when there were no impressions.
pub fn click_through_rate(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    round2(clicks as f64 / impressions as f64 * 100.0)
}

/// Cost per click; 0 when there were no clicks.
pub fn cost_per_click(spend: f64, clicks: u64) -> f64 {
    if clicks == 0 {
        return 0.0;
    }
    round2(spend / clicks as f64)
}

/// A campaign as served over the API. The ratios are computed on read and
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub ctr: f64,
    pub cpc: f64,
}

impl From<Campaign> for CampaignView {
    fn from(campaign: Campaign) -> Self {
        let ctr = click_through_rate(campaign.clicks, campaign.impressions);
        let cpc = cost_per_click(campaign.spend, campaign.clicks);
        CampaignView { campaign, ctr, cpc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Strategy,
    Scripts,
    Briefs,
    Guidelines,
    Reports,
}

impl DocumentCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "strategy" => Some(DocumentCategory::Strategy),
            "scripts" => Some(DocumentCategory::Scripts),
            "briefs" => Some(DocumentCategory::Briefs),
            "guidelines" => Some(DocumentCategory::Guidelines),
            "reports" => Some(DocumentCategory::Reports),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub id: DocumentCategory,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn document_categories() -> Vec<CategoryInfo> {
    vec![
        CategoryInfo { id: DocumentCategory::Strategy, name: "Positioning & Strategy", description: "Strategic brand documents" },
        CategoryInfo { id: DocumentCategory::Scripts, name: "Video Scripts", description: "Scripts and storyboards for content" },
        CategoryInfo { id: DocumentCategory::Briefs, name: "Campaign Briefs", description: "Detailed campaign briefs" },
        CategoryInfo { id: DocumentCategory::Guidelines, name: "Visual Guidelines", description: "Visual identity manuals" },
        CategoryInfo { id: DocumentCategory::Reports, name: "Reports", description: "Performance and results reports" },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub category: DocumentCategory,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: String,
    pub file_url: String,
    pub visible_to_client: bool,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub client_id: String,
    pub name: String,
    pub category: DocumentCategory,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub size: String,
    pub file_url: String,
    #[serde(default = "default_visible")]
    pub visible_to_client: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub category: Option<DocumentCategory>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub size: Option<String>,
    pub file_url: Option<String>,
    pub visible_to_client: Option<bool>,
}

impl Document {
    pub fn new(fields: NewDocument) -> Self {
        Document {
            id: Uuid::new_v4().to_string(),
            client_id: fields.client_id,
            name: fields.name,
            category: fields.category,
            file_type: fields.file_type,
            size: fields.size,
            file_url: fields.file_url,
            visible_to_client: fields.visible_to_client,
            upload_date: Utc::now(),
        }
    }

    pub fn apply_patch(&mut self, patch: &DocumentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(file_type) = &patch.file_type {
            self.file_type = file_type.clone();
        }
        if let Some(size) = &patch.size {
            self.size = size.clone();
        }
        if let Some(file_url) = &patch.file_url {
            self.file_url = file_url.clone();
        }
        if let Some(visible) = patch.visible_to_client {
            self.visible_to_client = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_are_zero_without_a_denominator() {
        assert_eq!(click_through_rate(10, 0), 0.0);
        assert_eq!(cost_per_click(99.5, 0), 0.0);
    }

    #[test]
    fn ratios_round_to_two_decimals() {
        assert_eq!(click_through_rate(832, 15420), 5.4);
        assert_eq!(cost_per_click(1850.75, 832), 2.22);
        assert_eq!(click_through_rate(425, 8750), 4.86);
    }

    #[test]
    fn campaign_view_flattens_stored_fields() {
        let view = CampaignView::from(Campaign::new(NewCampaign {
            client_id: "c1".into(),
            name: "Spring".into(),
            status: CampaignStatus::Active,
            impressions: 15420,
            clicks: 832,
            conversions: 47,
            budget: 2500.0,
            spend: 1850.75,
        }));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Spring");
        assert_eq!(json["ctr"], 5.4);
        assert_eq!(json["cpc"], 2.22);
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert_eq!(DocumentCategory::parse("reports"), Some(DocumentCategory::Reports));
        assert_eq!(DocumentCategory::parse("invoices"), None);
    }
}
