use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const SETTINGS_ID: &str = "site";
pub const ADMIN_CREDENTIAL_ID: &str = "admin";
pub const DEFAULT_SITE_NAME: &str = "STREAMME";

fn default_quality() -> Vec<String> {
    vec!["1080p".to_string()]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail: String,
    pub poster: String,
    pub duration: i32, // minutes
    pub year: i32,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub is_trending: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_quality")]
    pub quality: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe: Option<String>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
    #[serde(default)]
    pub views: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AudioTrack {
    pub language: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subtitle {
    pub language: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    #[default]
    Google,
    Custom,
}

impl AdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Google => "google",
            AdType::Custom => "custom",
        }
    }
}

// Singleton document, always stored under `_id: SETTINGS_ID`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    #[serde(rename = "_id")]
    pub id: String,
    pub site_name: String,
    pub logo: String,
    pub favicon: String,
    pub enable_user_auth: bool,
    pub enable_secondary_footer: bool,
    pub secondary_footer_content: String,
    pub enable_ads: bool,
    pub ad_type: AdType,
    pub google_ad_sense_id: String,
    pub custom_ad_image: String,
    pub custom_ad_link: String,
    /// Incremented on every write.
    pub version: i64,
    pub updated_at: DateTime,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            id: SETTINGS_ID.to_string(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            logo: String::new(),
            favicon: String::new(),
            enable_user_auth: false,
            enable_secondary_footer: false,
            secondary_footer_content: String::new(),
            enable_ads: false,
            ad_type: AdType::Google,
            google_ad_sense_id: String::new(),
            custom_ad_image: String::new(),
            custom_ad_link: String::new(),
            version: 0,
            updated_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String, // lowercased on write
    pub password: String, // bcrypt hash
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Default,
    Genre,
    Language,
    #[default]
    Custom,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "type", default)]
    pub kind: CategoryType,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    #[serde(rename = "_id")]
    pub id: String,
    pub password_hash: String,
    pub rotations: i32,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialAction {
    Seeded,
    Rotated,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAudit {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub action: CredentialAction,
    pub at: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Admin,
    User,
}

// Server-side session. The cookie only carries `token`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id")]
    pub token: String,
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime,
    pub expires_at: DateTime,
}

impl Session {
    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at <= now
    }
}
