use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    Planned,
    InProduction,
    AwaitingApproval,
    Approved,
    RevisionRequested,
    Published,
}

impl MaterialStatus {
    pub const ALL: [MaterialStatus; 6] = [
        MaterialStatus::Planned,
        MaterialStatus::InProduction,
        MaterialStatus::AwaitingApproval,
        MaterialStatus::Approved,
        MaterialStatus::RevisionRequested,
        MaterialStatus::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Planned => "planned",
            MaterialStatus::InProduction => "in_production",
            MaterialStatus::AwaitingApproval => "awaiting_approval",
            MaterialStatus::Approved => "approved",
            MaterialStatus::RevisionRequested => "revision_requested",
            MaterialStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Photo,
    Video,
    Carousel,
    Story,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Read,
    Unread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Approved,
    RevisionRequested,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
    pub status: CommentStatus,
}

impl Comment {
    /// Comments always enter the record unread; nothing flips them to read.
    pub fn unread(text: &str, client_name: &str, timestamp: DateTime<Utc>) -> Self {
        Comment {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            client_name: client_name.to_string(),
            timestamp,
            status: CommentStatus::Unread,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalHistory {
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub status: MaterialStatus,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub approval_history: Vec<ApprovalHistory>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when a material is first created, by a client or an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMaterial {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Material {
    /// Every material starts life as `planned`, whoever creates it.
    pub fn new(client_id: &str, fields: NewMaterial, created_by: Option<&str>) -> Self {
        Material {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            title: fields.title,
            description: fields.description,
            material_type: fields.material_type,
            status: MaterialStatus::Planned,
            scheduled_date: fields.scheduled_date,
            file_url: fields.file_url.filter(|url| !url.trim().is_empty()),
            tags: normalize_tags(fields.tags),
            created_by: created_by.map(|s| s.to_string()),
            comments: Vec::new(),
            approval_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Latest timestamp across both embedded sequences.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        let last_comment = self.comments.last().map(|c| c.timestamp);
        let last_history = self.approval_history.last().map(|h| h.timestamp);
        last_comment.max(last_history)
    }

    pub fn unread_comment_count(&self) -> usize {
        self.comments.iter().filter(|c| c.status == CommentStatus::Unread).count()
    }

    /// Applies a workflow change in place. The store calls this inside a
    /// single write transaction so the whole change lands or none of it does.
    ///
    /// Appended entries get `max(change.at, last_activity)` so both sequences
    /// stay non-decreasing even if the wall clock steps backwards.
    pub fn apply_change(&mut self, change: &MaterialChange) {
        let stamp = match self.last_activity() {
            Some(last) if last > change.at => last,
            _ => change.at,
        };

        if let Some(comment) = &change.comment {
            self.comments.push(Comment::unread(&comment.text, &comment.client_name, stamp));
        }
        if let Some(action) = change.history {
            self.approval_history.push(ApprovalHistory {
                action,
                timestamp: stamp,
                comment: change.history_comment.clone(),
            });
        }
        if let Some(status) = change.status {
            self.status = status;
        }
    }

    /// Overwrites the patched fields. Never touches `comments` or
    /// `approval_history`, and accepts any status value.
    pub fn apply_patch(&mut self, patch: &MaterialPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(material_type) = patch.material_type {
            self.material_type = material_type;
        }
        if let Some(scheduled_date) = patch.scheduled_date {
            self.scheduled_date = scheduled_date;
        }
        if let Some(file_url) = &patch.file_url {
            // An empty string clears the link.
            self.file_url = Some(file_url.trim().to_string()).filter(|url| !url.is_empty());
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

fn normalize_tags(tags: BTreeSet<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct PendingComment {
    pub text: String,
    pub client_name: String,
}

/// One atomic workflow effect: an optional comment append, an optional
/// history append, and an optional status write.
#[derive(Debug, Clone)]
pub struct MaterialChange {
    pub at: DateTime<Utc>,
    pub status: Option<MaterialStatus>,
    pub comment: Option<PendingComment>,
    pub history: Option<HistoryAction>,
    pub history_comment: Option<String>,
}

impl MaterialChange {
    pub fn approve(at: DateTime<Utc>) -> Self {
        MaterialChange {
            at,
            status: Some(MaterialStatus::Approved),
            comment: None,
            history: Some(HistoryAction::Approved),
            history_comment: None,
        }
    }

    pub fn request_revision(at: DateTime<Utc>, text: &str, client_name: &str) -> Self {
        MaterialChange {
            at,
            status: Some(MaterialStatus::RevisionRequested),
            comment: Some(PendingComment {
                text: text.to_string(),
                client_name: client_name.to_string(),
            }),
            history: Some(HistoryAction::RevisionRequested),
            history_comment: Some(text.to_string()),
        }
    }

    pub fn comment(at: DateTime<Utc>, text: &str, client_name: &str) -> Self {
        MaterialChange {
            at,
            status: None,
            comment: Some(PendingComment {
                text: text.to_string(),
                client_name: client_name.to_string(),
            }),
            history: None,
            history_comment: None,
        }
    }
}

/// Partial admin overwrite. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub material_type: Option<MaterialType>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub file_url: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub status: Option<MaterialStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Material {
        Material::new(
            "client-a",
            NewMaterial {
                title: "Launch post".into(),
                description: "Spring launch".into(),
                material_type: MaterialType::Photo,
                scheduled_date: Utc::now(),
                file_url: Some("   ".into()),
                tags: ["  spring ".to_string(), "".to_string()].into_iter().collect(),
            },
            None,
        )
    }

    #[test]
    fn new_material_is_planned_with_empty_sequences() {
        let m = sample();
        assert_eq!(m.status, MaterialStatus::Planned);
        assert!(m.comments.is_empty());
        assert!(m.approval_history.is_empty());
        assert_eq!(m.file_url, None);
        assert_eq!(m.tags.iter().collect::<Vec<_>>(), vec!["spring"]);
    }

    #[test]
    fn request_revision_lands_all_three_parts() {
        let mut m = sample();
        m.apply_change(&MaterialChange::request_revision(Utc::now(), "fix lighting", "Acme"));

        assert_eq!(m.status, MaterialStatus::RevisionRequested);
        let comment = m.comments.last().unwrap();
        let entry = m.approval_history.last().unwrap();
        assert_eq!(comment.text, "fix lighting");
        assert_eq!(comment.status, CommentStatus::Unread);
        assert_eq!(entry.action, HistoryAction::RevisionRequested);
        assert_eq!(entry.comment.as_deref(), Some("fix lighting"));
        assert_eq!(comment.timestamp, entry.timestamp);
    }

    #[test]
    fn every_decision_appends_one_history_row() {
        let mut m = sample();
        for _ in 0..3 {
            m.apply_change(&MaterialChange::approve(Utc::now()));
        }
        m.apply_change(&MaterialChange::request_revision(Utc::now(), "again", "Acme"));
        assert_eq!(m.approval_history.len(), 4);
        assert_eq!(m.status, MaterialStatus::RevisionRequested);
    }

    #[test]
    fn plain_comment_leaves_status_and_history_alone() {
        let mut m = sample();
        m.apply_change(&MaterialChange::comment(Utc::now(), "looks good", "Acme"));
        assert_eq!(m.status, MaterialStatus::Planned);
        assert!(m.approval_history.is_empty());
        assert_eq!(m.comments.len(), 1);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut m = sample();
        let now = Utc::now();
        m.apply_change(&MaterialChange::approve(now));
        m.apply_change(&MaterialChange::approve(now - Duration::hours(1)));
        assert_eq!(m.approval_history[1].timestamp, now);
    }

    #[test]
    fn patch_overrides_status_without_touching_history() {
        let mut m = sample();
        m.apply_change(&MaterialChange::request_revision(Utc::now(), "x", "Acme"));
        let history_before = m.approval_history.clone();
        let comments_before = m.comments.clone();

        m.apply_patch(&MaterialPatch {
            status: Some(MaterialStatus::Published),
            title: Some("Renamed".into()),
            ..Default::default()
        });

        assert_eq!(m.status, MaterialStatus::Published);
        assert_eq!(m.title, "Renamed");
        assert_eq!(m.approval_history, history_before);
        assert_eq!(m.comments, comments_before);
    }
}
