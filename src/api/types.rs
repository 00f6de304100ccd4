use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    ContentManager,
    SuperAdmin,
}

impl Role {
    /// Roles allowed into the admin screens (and therefore worth prefetching
    /// reference data for).
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::ContentManager | Role::SuperAdmin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Anonymous
    }
}

/// Authenticated principal as seen by this core. Owned by the auth
/// collaborator; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub trip_type: Option<String>,
    #[serde(default)]
    pub ship_id: Option<i64>,
    #[serde(default)]
    pub resort_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: i64,
    pub name: String,
    pub cruise_line: String,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub deck_count: Option<i32>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Talent {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub known_for: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub social_links: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyTheme {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub costume_ideas: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub port_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripInfoSection {
    pub id: i64,
    #[serde(default)]
    pub trip_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub section_type: String,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single trip announcement. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripUpdate {
    pub id: i64,
    pub trip_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub trip_name: Option<String>,
    #[serde(default)]
    pub trip_slug: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Server-held "read up to here" row for an authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationWatermark {
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfTokenResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl From<ApiError> for String {
    fn from(error: ApiError) -> Self {
        error.error
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "VALIDATION_ERROR".to_string(),
            status: None,
            details: None,
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "UNKNOWN".to_string(),
            status: None,
            details: None,
        }
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "REQUEST_FAILED".to_string(),
            status: None,
            details: None,
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "AUTH_REQUIRED".to_string(),
            status: Some(401),
            details: None,
        }
    }

    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "HTTP_ERROR".to_string(),
            status: Some(status),
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Auth failures are never retried and must bubble up to the sign-in
    /// redirect.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status, Some(401) | Some(403)) || self.code == "AUTH_REQUIRED"
    }
}
