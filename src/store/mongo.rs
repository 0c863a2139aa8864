use super::{Store, CATEGORIES, CREDENTIALS, CREDENTIAL_AUDIT, SESSIONS, SETTINGS, USERS, VIDEOS};
use crate::catalog::{PageRequest, VideoFilter};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AdminCredential, Category, CredentialAudit, Session, SiteSettings, User, Video,
    ADMIN_CREDENTIAL_ID, SETTINGS_ID,
};
use crate::settings::{self, SettingsPatch};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, DateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReplaceOptions, ReturnDocument};
use mongodb::{Collection, Database};

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn videos(&self) -> Collection<Video> {
        self.db.collection::<Video>(VIDEOS)
    }

    fn settings(&self) -> Collection<SiteSettings> {
        self.db.collection::<SiteSettings>(SETTINGS)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>(USERS)
    }

    fn categories(&self) -> Collection<Category> {
        self.db.collection::<Category>(CATEGORIES)
    }

    fn sessions(&self) -> Collection<Session> {
        self.db.collection::<Session>(SESSIONS)
    }

    async fn find_page(
        &self,
        filter: Document,
        sort: Document,
        projection: Option<Document>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Video>, u64)> {
        let collection = self.videos();
        let total = collection.count_documents(filter.clone(), None).await?;

        let find_options = FindOptions::builder()
            .skip(Some(page.skip()))
            .limit(Some(page.limit as i64))
            .sort(sort)
            .projection(projection)
            .build();
        let videos: Vec<Video> = collection.find(filter, find_options).await?.try_collect().await?;
        Ok((videos, total))
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> StoreResult<(Vec<Video>, u64)> {
        self.find_page(
            filter.to_document(),
            doc! { "createdAt": -1, "_id": -1 },
            None,
            page,
        )
        .await
    }

    async fn search_videos(&self, query: &str, page: PageRequest) -> StoreResult<(Vec<Video>, u64)> {
        self.find_page(
            doc! { "$text": { "$search": query } },
            doc! { "score": { "$meta": "textScore" } },
            Some(doc! { "score": { "$meta": "textScore" } }),
            page,
        )
        .await
    }

    async fn all_videos(&self) -> StoreResult<Vec<Video>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();
        Ok(self.videos().find(None, find_options).await?.try_collect().await?)
    }

    async fn count_videos(&self) -> StoreResult<u64> {
        Ok(self.videos().count_documents(None, None).await?)
    }

    async fn get_video(&self, id: ObjectId) -> StoreResult<Option<Video>> {
        Ok(self.videos().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_video(&self, mut video: Video) -> StoreResult<Video> {
        let result = self.videos().insert_one(&video, None).await?;
        video.id = result.inserted_id.as_object_id();
        Ok(video)
    }

    async fn insert_videos(&self, videos: Vec<Video>) -> StoreResult<u64> {
        if videos.is_empty() {
            return Ok(0);
        }
        let result = self.videos().insert_many(videos, None).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn replace_video(&self, id: ObjectId, mut video: Video) -> StoreResult<Option<Video>> {
        video.id = Some(id);
        let result = self
            .videos()
            .replace_one(doc! { "_id": id }, &video, None)
            .await?;
        if result.matched_count == 0 {
            Ok(None)
        } else {
            Ok(Some(video))
        }
    }

    async fn delete_video(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.videos().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all_videos(&self) -> StoreResult<u64> {
        let result = self.videos().delete_many(doc! {}, None).await?;
        Ok(result.deleted_count)
    }

    async fn record_view(&self, id: ObjectId) -> StoreResult<Option<Video>> {
        Ok(self
            .videos()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$inc": { "views": 1 } },
                Self::after_update(),
            )
            .await?)
    }

    async fn load_settings(&self) -> StoreResult<SiteSettings> {
        let mut defaults = bson::to_document(&SiteSettings::default())?;
        defaults.remove("_id");

        // Upsert on the fixed id so concurrent first reads converge on one document.
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        self.settings()
            .find_one_and_update(
                doc! { "_id": SETTINGS_ID },
                doc! { "$setOnInsert": defaults },
                options,
            )
            .await?
            .ok_or(StoreError::SettingsMissing)
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> StoreResult<SiteSettings> {
        let mut set = patch.to_set_document();
        set.insert("updatedAt", DateTime::now());
        self.settings()
            .find_one_and_update(
                doc! { "_id": SETTINGS_ID },
                doc! { "$set": set, "$inc": { "version": 1_i64 } },
                Self::after_update(),
            )
            .await?
            .ok_or(StoreError::SettingsMissing)
    }

    async fn reset_settings(&self) -> StoreResult<SiteSettings> {
        let mut set = settings::defaults_document();
        set.insert("updatedAt", DateTime::now());
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        self.settings()
            .find_one_and_update(
                doc! { "_id": SETTINGS_ID },
                doc! { "$set": set, "$inc": { "version": 1_i64 } },
                options,
            )
            .await?
            .ok_or(StoreError::SettingsMissing)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn insert_user(&self, mut user: User) -> StoreResult<User> {
        match self.users().insert_one(&user, None).await {
            Ok(result) => {
                user.id = result.inserted_id.as_object_id();
                Ok(user)
            }
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("email")),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let find_options = FindOptions::builder().sort(doc! { "order": 1 }).build();
        Ok(self.categories().find(None, find_options).await?.try_collect().await?)
    }

    async fn insert_category(&self, mut category: Category) -> StoreResult<Category> {
        match self.categories().insert_one(&category, None).await {
            Ok(result) => {
                category.id = result.inserted_id.as_object_id();
                Ok(category)
            }
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("slug")),
            Err(e) => Err(e.into()),
        }
    }

    async fn admin_credential(&self) -> StoreResult<Option<AdminCredential>> {
        Ok(self
            .db
            .collection::<AdminCredential>(CREDENTIALS)
            .find_one(doc! { "_id": ADMIN_CREDENTIAL_ID }, None)
            .await?)
    }

    async fn save_admin_credential(&self, credential: AdminCredential) -> StoreResult<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.db
            .collection::<AdminCredential>(CREDENTIALS)
            .replace_one(doc! { "_id": &credential.id }, &credential, options)
            .await?;
        Ok(())
    }

    async fn append_credential_audit(&self, entry: CredentialAudit) -> StoreResult<()> {
        self.db
            .collection::<CredentialAudit>(CREDENTIAL_AUDIT)
            .insert_one(entry, None)
            .await?;
        Ok(())
    }

    async fn credential_audit(&self, limit: i64) -> StoreResult<Vec<CredentialAudit>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "at": -1, "_id": -1 })
            .limit(Some(limit))
            .build();
        Ok(self
            .db
            .collection::<CredentialAudit>(CREDENTIAL_AUDIT)
            .find(None, find_options)
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_session(&self, session: Session) -> StoreResult<()> {
        self.sessions().insert_one(session, None).await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        // The TTL monitor only sweeps periodically, so expiry is checked here too.
        let session = self
            .sessions()
            .find_one(doc! { "_id": token }, None)
            .await?;
        Ok(session.filter(|s| !s.is_expired(DateTime::now())))
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.sessions().delete_one(doc! { "_id": token }, None).await?;
        Ok(())
    }
}
