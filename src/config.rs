use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    pub auth: AuthConfig,
    pub cloudinary: CloudinaryConfig,
    #[serde(default)]
    pub seed_sample_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub static_max_age: u32, // seconds
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Only used to seed the stored credential when none exists yet.
    pub initial_password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
    pub admin_session_hours: i64,
    pub user_session_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub default_folder: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.static_dir", "./static")?
            .set_default("server.static_max_age", 86400)?
            .set_default("database.backend", "mongo")?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "streamme")?
            .set_default("admin.initial_password", "admin123")?
            .set_default("auth.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("auth.secure_cookies", run_mode == "production")?
            .set_default("auth.admin_session_hours", 24)?
            .set_default("auth.user_session_days", 7)?
            .set_default("cloudinary.default_folder", "streamme")?
            .set_default("seed_sample_data", false)?
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g. `APP__SERVER__PORT=5001` sets `server.port`
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Deployment variables shared with the hosted dashboard
            .set_override_option("admin.initial_password", env::var("ADMIN_PASSWORD").ok())?
            .set_override_option("database.url", env::var("MONGODB_URI").ok())?
            .set_override_option("database.name", env::var("MONGODB_DB").ok())?
            .set_override_option("cloudinary.cloud_name", env::var("CLOUDINARY_CLOUD_NAME").ok())?
            .set_override_option("cloudinary.api_key", env::var("CLOUDINARY_API_KEY").ok())?
            .set_override_option("cloudinary.api_secret", env::var("CLOUDINARY_API_SECRET").ok())?
            .build()?;

        s.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: "./static".to_string(),
            static_max_age: 86400,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Mongo,
            url: "mongodb://localhost:27017".to_string(),
            name: "streamme".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            initial_password: "admin123".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            secure_cookies: false,
            admin_session_hours: 24,
            user_session_days: 7,
        }
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            default_folder: "streamme".to_string(),
        }
    }
}
