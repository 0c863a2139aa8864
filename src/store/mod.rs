//! Persistence seam. Handlers only see `dyn Store`; `MongoStore` backs
//! production and `MemoryStore` backs tests and the `memory` backend.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::catalog::{PageRequest, VideoFilter};
use crate::error::StoreResult;
use crate::models::{AdminCredential, Category, CredentialAudit, Session, SiteSettings, User, Video};
use crate::settings::SettingsPatch;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

pub const VIDEOS: &str = "videos";
pub const SETTINGS: &str = "sitesettings";
pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";
pub const CREDENTIALS: &str = "admincredentials";
pub const CREDENTIAL_AUDIT: &str = "credentialaudit";
pub const SESSIONS: &str = "sessions";

#[async_trait]
pub trait Store: Send + Sync {
    /// Newest first, plus the total matching count.
    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> StoreResult<(Vec<Video>, u64)>;
    /// Text search ordered by relevance, plus the total matching count.
    async fn search_videos(&self, query: &str, page: PageRequest) -> StoreResult<(Vec<Video>, u64)>;
    async fn all_videos(&self) -> StoreResult<Vec<Video>>;
    async fn count_videos(&self) -> StoreResult<u64>;
    async fn get_video(&self, id: ObjectId) -> StoreResult<Option<Video>>;
    async fn insert_video(&self, video: Video) -> StoreResult<Video>;
    async fn insert_videos(&self, videos: Vec<Video>) -> StoreResult<u64>;
    /// Replaces the document with `video.id`; `None` when it does not exist.
    async fn replace_video(&self, id: ObjectId, video: Video) -> StoreResult<Option<Video>>;
    async fn delete_video(&self, id: ObjectId) -> StoreResult<bool>;
    async fn delete_all_videos(&self) -> StoreResult<u64>;
    /// Atomically adds one view and returns the updated record.
    async fn record_view(&self, id: ObjectId) -> StoreResult<Option<Video>>;

    /// Returns the singleton, creating it with defaults on first use.
    async fn load_settings(&self) -> StoreResult<SiteSettings>;
    async fn update_settings(&self, patch: &SettingsPatch) -> StoreResult<SiteSettings>;
    async fn reset_settings(&self) -> StoreResult<SiteSettings>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, category: Category) -> StoreResult<Category>;

    async fn admin_credential(&self) -> StoreResult<Option<AdminCredential>>;
    async fn save_admin_credential(&self, credential: AdminCredential) -> StoreResult<()>;
    async fn append_credential_audit(&self, entry: CredentialAudit) -> StoreResult<()>;
    /// Most recent first.
    async fn credential_audit(&self, limit: i64) -> StoreResult<Vec<CredentialAudit>>;

    async fn insert_session(&self, session: Session) -> StoreResult<()>;
    /// Expired sessions are treated as absent.
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, token: &str) -> StoreResult<()>;
}
