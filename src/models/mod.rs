use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    Editor,
    Viewer,
}

/// The kind of principal a bearer token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Client,
    Admin,
}

// The enums above are stored as plain TEXT columns in SQLite, so they need a
// stable string form in both directions.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

text_enum!(ClientStatus { Active => "active", Paused => "paused", Completed => "completed" });
text_enum!(AdminRole { Admin => "admin", Editor => "editor", Viewer => "viewer" });
text_enum!(PrincipalKind { Client => "client", Admin => "admin" });

pub const DEFAULT_PROJECT_TYPE: &str = "social_media";

pub fn default_visible_metrics() -> BTreeSet<String> {
    ["impressions", "clicks", "ctr"].iter().map(|m| m.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub status: ClientStatus,
    pub project_type: String,
    pub visible_metrics: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a client; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: ClientStatus,
    pub project_type: String,
    pub visible_metrics: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Client> for ClientResponse {
    fn from(client: &Client) -> Self {
        ClientResponse {
            id: client.id.clone(),
            name: client.name.clone(),
            email: client.email.clone(),
            status: client.status,
            project_type: client.project_type.clone(),
            visible_metrics: client.visible_metrics.clone(),
            created_at: client.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    // Carried for display only; no operation is gated on it.
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminUser> for AdminUserResponse {
    fn from(admin: &AdminUser) -> Self {
        AdminUserResponse {
            id: admin.id.clone(),
            name: admin.name.clone(),
            email: admin.email.clone(),
            role: admin.role,
            created_at: admin.created_at,
        }
    }
}

/// Fields an admin may change on a client record. `None` leaves the field as is.
#[derive(Debug, Default, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub status: Option<ClientStatus>,
    pub project_type: Option<String>,
    pub visible_metrics: Option<BTreeSet<String>>,
}

pub mod material_models;
pub mod record_models;
pub mod db_operations;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_through_their_column_form() {
        for status in [ClientStatus::Active, ClientStatus::Paused, ClientStatus::Completed] {
            assert_eq!(status.as_str().parse::<ClientStatus>().unwrap(), status);
        }
        assert_eq!("editor".parse::<AdminRole>().unwrap(), AdminRole::Editor);
        assert!("superuser".parse::<AdminRole>().is_err());
    }

    #[test]
    fn client_response_omits_password_hash() {
        let client = Client {
            id: "c1".into(),
            name: "Acme".into(),
            email: "a@x.com".into(),
            password_hash: "$2b$12$secret".into(),
            status: ClientStatus::Active,
            project_type: DEFAULT_PROJECT_TYPE.into(),
            visible_metrics: default_visible_metrics(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(ClientResponse::from(&client)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["status"], "active");
    }
}
