use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::DateTime;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api_handlers::parse_video_id;
use crate::auth::{self, check_admin, MIN_PASSWORD_LEN};
use crate::config::AppConfig;
use crate::dto::{
    AuditEntryResponse, CategoryRequest, CategoryResponse, ChangePasswordRequest,
    SettingsEnvelope, SettingsResponse, SuccessResponse, UploadRequest, VideoEnvelope,
    VideoRequest, VideoResponse,
};
use crate::error::{ApiError, Context, StoreError};
use crate::init_data;
use crate::models::Category;
use crate::settings::SettingsPatch;
use crate::store::Store;
use crate::upload;

const AUDIT_PAGE: i64 = 50;

// Bodies are read as bytes so the session check always runs first.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        log::debug!("rejected request body: {}", e);
        ApiError::validation("Invalid request body")
    })
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

// --- Videos ---

pub async fn get_videos_admin(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let videos = store.all_videos().await.context("Failed to fetch videos")?;
    let videos: Vec<VideoResponse> = videos.into_iter().map(VideoResponse::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "videos": videos })))
}

pub async fn create_video(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let request: VideoRequest = parse_body(&body)?;
    let video = request.into_video().map_err(ApiError::Validation)?;

    let video = store.insert_video(video).await.context("Failed to create video")?;
    log::info!("video created: {}", video.title);
    Ok(HttpResponse::Created().json(VideoEnvelope {
        video: video.into(),
    }))
}

pub async fn get_video_admin(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let id = parse_video_id(&path)?;
    let video = store
        .get_video(id)
        .await
        .context("Failed to fetch video")?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(HttpResponse::Ok().json(VideoEnvelope {
        video: video.into(),
    }))
}

pub async fn update_video(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let id = parse_video_id(&path)?;
    let request: VideoRequest = parse_body(&body)?;
    let mut video = request.into_video().map_err(ApiError::Validation)?;

    let existing = store
        .get_video(id)
        .await
        .context("Failed to update video")?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    // Replace keeps identity, counters and creation time.
    video.views = existing.views;
    video.created_at = existing.created_at;
    video.updated_at = DateTime::now();

    let video = store
        .replace_video(id, video)
        .await
        .context("Failed to update video")?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(HttpResponse::Ok().json(VideoEnvelope {
        video: video.into(),
    }))
}

pub async fn delete_video(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let id = parse_video_id(&path)?;
    let deleted = store.delete_video(id).await.context("Failed to delete video")?;
    if !deleted {
        return Err(ApiError::not_found("Video not found"));
    }
    Ok(HttpResponse::Ok().json(SuccessResponse::ok()))
}

// --- Settings ---

// PUT /api/settings
pub async fn update_settings(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let patch: SettingsPatch = parse_body(&body)?;
    let patch = patch.normalize().map_err(ApiError::Validation)?;

    // Make sure the singleton exists before the partial write.
    let current = store.load_settings().await.context("Failed to update settings")?;
    let settings = if patch.is_empty() {
        // Nothing to write: keep the version so cached ETags stay valid.
        current
    } else {
        let settings = store
            .update_settings(&patch)
            .await
            .context("Failed to update settings")?;
        log::info!("settings updated to version {}", settings.version);
        settings
    };

    Ok(HttpResponse::Ok()
        .insert_header((
            actix_web::http::header::ETAG,
            crate::api_handlers::settings_etag(&settings),
        ))
        .json(SettingsEnvelope {
            settings: SettingsResponse::from(&settings),
            message: Some("Settings updated successfully".to_string()),
        }))
}

// DELETE /api/admin/reset-settings
pub async fn reset_settings(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let settings = store
        .reset_settings()
        .await
        .context("Failed to reset settings")?;
    log::info!("settings reset to defaults");
    Ok(HttpResponse::Ok().json(SettingsEnvelope {
        settings: SettingsResponse::from(&settings),
        message: Some("Settings reset successfully".to_string()),
    }))
}

// --- Upload ---

pub async fn upload_signature(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let request: UploadRequest = if body.is_empty() {
        UploadRequest::default()
    } else {
        parse_body(&body)?
    };
    let folder = request
        .folder
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(&config.cloudinary.default_folder)
        .to_string();
    upload::validate_folder(&folder).map_err(ApiError::Validation)?;

    let timestamp = chrono::Utc::now().timestamp();
    let signed = upload::signed_upload(&config.cloudinary, &folder, timestamp)
        .context("Failed to generate upload signature")?;
    Ok(HttpResponse::Ok().json(signed))
}

// --- Credential ---

pub async fn change_password(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let request: ChangePasswordRequest = parse_body(&body)?;

    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::validation(
            "Current password and new password are required",
        ));
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "New password must be at least 6 characters",
        ));
    }
    if !auth::verify_admin_password(store.get_ref(), &request.current_password).await? {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let remote_addr = req.peer_addr().map(|addr| addr.ip().to_string());
    auth::rotate_admin_password(store.get_ref(), &config.auth, &request.new_password, remote_addr)
        .await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::with_message(
        "Password changed successfully",
    )))
}

pub async fn get_credential_audit(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let entries = store
        .credential_audit(AUDIT_PAGE)
        .await
        .context("Failed to fetch credential audit")?;
    let entries: Vec<AuditEntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(json!({ "entries": entries })))
}

// --- Categories ---

// Public: the browse page reads it too.
pub async fn get_categories(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let categories = store
        .list_categories()
        .await
        .context("Failed to fetch categories")?;
    let categories: Vec<CategoryResponse> = categories.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(json!({ "categories": categories })))
}

pub async fn create_category(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let request: CategoryRequest = parse_body(&body)?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Category name is required"));
    }
    let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slugify(slug),
        None => slugify(&name),
    };
    if slug.is_empty() {
        return Err(ApiError::validation("Category slug is required"));
    }

    let now = DateTime::now();
    let category = Category {
        id: None,
        name,
        slug,
        order: request.order,
        kind: request.kind,
        created_at: now,
        updated_at: now,
    };
    match store.insert_category(category).await {
        Ok(category) => Ok(HttpResponse::Created().json(json!({
            "category": CategoryResponse::from(category)
        }))),
        Err(StoreError::Duplicate(_)) => Err(ApiError::validation(
            "A category with this slug already exists",
        )),
        Err(e) => Err(ApiError::internal("Failed to create category", e)),
    }
}

// --- Maintenance ---

pub async fn seed_data(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let count = init_data::reseed_videos(store.get_ref())
        .await
        .context("Failed to seed data")?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Successfully added {} videos to the database", count),
        "count": count,
    })))
}

const GENERATED_CATALOG_SIZE: usize = 100;

// POST /api/admin/seed-100
pub async fn seed_generated(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let videos = init_data::generated_videos(GENERATED_CATALOG_SIZE);
    let featured = videos.iter().filter(|v| v.is_featured).count();
    let trending = videos.iter().filter(|v| v.is_trending).count();
    let count = init_data::replace_catalog(store.get_ref(), videos)
        .await
        .context("Failed to create movies")?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Successfully created {} movies", count),
        "summary": {
            "total": count,
            "featured": featured,
            "trending": trending,
        },
    })))
}

pub async fn reset_db(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    check_admin(&req, store.get_ref()).await?;
    let removed = store
        .delete_all_videos()
        .await
        .context("Failed to reset database")?;
    log::warn!("video catalog cleared ({} removed)", removed);
    Ok(HttpResponse::Ok().json(SuccessResponse::with_message(
        "Videos collection reset successfully",
    )))
}
