use crate::auth;
use crate::config::{AppConfig, AuthConfig, CloudinaryConfig, DatabaseBackend, DatabaseConfig};
use crate::models::{SessionKind, Video};
use crate::store::{MemoryStore, Store};
use actix_web::cookie::Cookie;
use mongodb::bson::DateTime;
use std::sync::Arc;

pub fn sample_video(title: &str, genres: &[&str]) -> Video {
    let now = DateTime::now();
    Video {
        id: None,
        title: title.to_string(),
        description: format!("{} description", title),
        video_url: "https://cdn.example.com/video.mp4".to_string(),
        thumbnail: "https://cdn.example.com/thumb.jpg".to_string(),
        poster: "https://cdn.example.com/poster.jpg".to_string(),
        duration: 100,
        year: 2020,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        languages: vec!["English".to_string()],
        categories: vec!["Movies".to_string()],
        cast: Vec::new(),
        director: None,
        rating: 7.0,
        is_trending: false,
        is_featured: false,
        quality: vec!["1080p".to_string()],
        universe: None,
        audio_tracks: Vec::new(),
        subtitles: Vec::new(),
        views: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            backend: DatabaseBackend::Memory,
            ..DatabaseConfig::default()
        },
        auth: AuthConfig {
            bcrypt_cost: 4,
            ..AuthConfig::default()
        },
        cloudinary: CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("123456".to_string()),
            api_secret: Some("secret".to_string()),
            ..CloudinaryConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Memory store with the admin credential seeded from `test_config`.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = test_config();
        auth::ensure_admin_credential(store.as_ref(), &config)
            .await
            .expect("seed admin credential");
        TestContext { store, config }
    }

    pub fn dyn_store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub async fn admin_cookie(&self) -> Cookie<'static> {
        auth::start_session(self.store.as_ref(), &self.config.auth, SessionKind::Admin, None)
            .await
            .expect("admin session")
    }
}

/// Builds the full application over a `TestContext`.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(actix_web::App::new().configure(|cfg| {
            crate::configure_app(cfg, $ctx.dyn_store(), $ctx.config.clone())
        }))
        .await
    };
}

pub(crate) use test_app;
