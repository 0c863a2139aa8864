use crate::models::{
    AudioTrack, Category, CategoryType, CredentialAudit, SiteSettings, Subtitle, User, Video,
    DEFAULT_SITE_NAME,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Query strings ---

// Everything arrives as text so empty form fields can be ignored.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CatalogParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub year: Option<String>,
    pub trending: Option<String>,
    pub featured: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

// --- Responses ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail: String,
    pub poster: String,
    pub duration: i32,
    pub year: i32,
    pub genres: Vec<String>,
    pub languages: Vec<String>,
    pub categories: Vec<String>,
    pub cast: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    pub rating: f64,
    pub is_trending: bool,
    pub is_featured: bool,
    pub quality: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe: Option<String>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitles: Vec<Subtitle>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: video.title,
            description: video.description,
            video_url: video.video_url,
            thumbnail: video.thumbnail,
            poster: video.poster,
            duration: video.duration,
            year: video.year,
            genres: video.genres,
            languages: video.languages,
            categories: video.categories,
            cast: video.cast,
            director: video.director,
            rating: video.rating,
            is_trending: video.is_trending,
            is_featured: video.is_featured,
            quality: video.quality,
            universe: video.universe,
            audio_tracks: video.audio_tracks,
            subtitles: video.subtitles,
            views: video.views,
            created_at: video.created_at.to_chrono(),
            updated_at: video.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoEnvelope {
    pub video: VideoResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub quality: Vec<String>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitles: Vec<Subtitle>,
    pub duration: i32,
}

impl From<Video> for StreamInfo {
    fn from(video: Video) -> Self {
        StreamInfo {
            id: video.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: video.title,
            video_url: video.video_url,
            quality: video.quality,
            audio_tracks: video.audio_tracks,
            subtitles: video.subtitles,
            duration: video.duration,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub site_name: String,
    pub logo: String,
    pub favicon: String,
    pub enable_user_auth: bool,
    pub enable_secondary_footer: bool,
    pub secondary_footer_content: String,
    pub enable_ads: bool,
    pub ad_type: String,
    pub google_ad_sense_id: String,
    pub custom_ad_image: String,
    pub custom_ad_link: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<&SiteSettings> for SettingsResponse {
    fn from(settings: &SiteSettings) -> Self {
        let site_name = if settings.site_name.is_empty() {
            DEFAULT_SITE_NAME.to_string()
        } else {
            settings.site_name.clone()
        };
        SettingsResponse {
            id: settings.id.clone(),
            site_name,
            logo: settings.logo.clone(),
            favicon: settings.favicon.clone(),
            enable_user_auth: settings.enable_user_auth,
            enable_secondary_footer: settings.enable_secondary_footer,
            secondary_footer_content: settings.secondary_footer_content.clone(),
            enable_ads: settings.enable_ads,
            ad_type: settings.ad_type.as_str().to_string(),
            google_ad_sense_id: settings.google_ad_sense_id.clone(),
            custom_ad_image: settings.custom_ad_image.clone(),
            custom_ad_link: settings.custom_ad_link.clone(),
            version: settings.version,
            updated_at: settings.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsEnvelope {
    pub settings: SettingsResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        SuccessResponse {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        SuccessResponse {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub order: i32,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: category.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: category.name,
            slug: category.slug,
            order: category.order,
            kind: category.kind,
            created_at: category.created_at.to_chrono(),
            updated_at: category.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub action: crate::models::CredentialAction,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
}

impl From<CredentialAudit> for AuditEntryResponse {
    fn from(entry: CredentialAudit) -> Self {
        AuditEntryResponse {
            action: entry.action,
            at: entry.at.to_chrono(),
            remote_addr: entry.remote_addr,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    pub signature: String,
    pub timestamp: i64,
    pub cloud_name: String,
    pub api_key: String,
    pub folder: String,
    pub signature_algorithm: String,
    pub upload_url: String,
}

// --- Request bodies ---

#[derive(Debug, Deserialize, Default)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UploadRequest {
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "type", default)]
    pub kind: CategoryType,
}

/// Body for video create and replace.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoRequest {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail: String,
    pub poster: String,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub languages: Vec<String>,
    pub categories: Vec<String>,
    pub cast: Vec<String>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub is_trending: bool,
    pub is_featured: bool,
    pub quality: Option<Vec<String>>,
    pub universe: Option<String>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitles: Vec<Subtitle>,
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !cleaned.iter().any(|c| c == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}

fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl VideoRequest {
    /// Validates and builds the stored record. `id`, `views` and timestamps
    /// are left for the caller to fill.
    pub fn into_video(self) -> Result<Video, String> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("videoUrl", &self.video_url),
            ("thumbnail", &self.thumbnail),
            ("poster", &self.poster),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{} is required", name));
            }
        }

        let duration = match self.duration {
            Some(d) if d > 0 => d,
            _ => return Err("duration must be a positive number of minutes".to_string()),
        };
        let year = self.year.ok_or_else(|| "year is required".to_string())?;

        let genres = clean_list(&self.genres);
        let languages = clean_list(&self.languages);
        let categories = clean_list(&self.categories);
        if genres.is_empty() {
            return Err("At least one genre is required".to_string());
        }
        if languages.is_empty() {
            return Err("At least one language is required".to_string());
        }
        if categories.is_empty() {
            return Err("At least one category is required".to_string());
        }

        let rating = self.rating.unwrap_or(0.0);
        if !(0.0..=10.0).contains(&rating) {
            return Err("rating must be between 0 and 10".to_string());
        }

        let quality = match self.quality {
            Some(q) => clean_list(&q),
            None => vec!["1080p".to_string()],
        };

        let now = mongodb::bson::DateTime::now();
        Ok(Video {
            id: None,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            video_url: self.video_url.trim().to_string(),
            thumbnail: self.thumbnail.trim().to_string(),
            poster: self.poster.trim().to_string(),
            duration,
            year,
            genres,
            languages,
            categories,
            cast: clean_list(&self.cast),
            director: clean_optional(&self.director),
            rating,
            is_trending: self.is_trending,
            is_featured: self.is_featured,
            quality,
            universe: clean_optional(&self.universe),
            audio_tracks: self.audio_tracks,
            subtitles: self.subtitles,
            views: 0,
            created_at: now,
            updated_at: now,
        })
    }
}
