use super::Store;
use crate::catalog::{PageRequest, SearchTerms, VideoFilter};
use crate::error::{StoreError, StoreResult};
use crate::models::{AdminCredential, Category, CredentialAudit, Session, SiteSettings, User, Video};
use crate::settings::SettingsPatch;
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryData {
    // (insertion sequence, record); the sequence breaks createdAt ties
    videos: Vec<(u64, Video)>,
    next_seq: u64,
    settings: Option<SiteSettings>,
    users: Vec<User>,
    categories: Vec<Category>,
    credential: Option<AdminCredential>,
    audit: Vec<CredentialAudit>,
    sessions: HashMap<String, Session>,
}

/// In-process store with the same observable behavior as `MongoStore`.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(videos: &mut [(u64, Video)]) {
    videos.sort_by(|(seq_a, a), (seq_b, b)| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| seq_b.cmp(seq_a))
    });
}

fn page_of(videos: Vec<Video>, page: PageRequest) -> Vec<Video> {
    videos
        .into_iter()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_videos(&self, filter: &VideoFilter, page: PageRequest) -> StoreResult<(Vec<Video>, u64)> {
        let data = self.data.read().await;
        let mut matching: Vec<(u64, Video)> = data
            .videos
            .iter()
            .filter(|(_, v)| filter.matches(v))
            .cloned()
            .collect();
        newest_first(&mut matching);
        let total = matching.len() as u64;
        let videos = matching.into_iter().map(|(_, v)| v).collect();
        Ok((page_of(videos, page), total))
    }

    async fn search_videos(&self, query: &str, page: PageRequest) -> StoreResult<(Vec<Video>, u64)> {
        let terms = SearchTerms::parse(query);
        let data = self.data.read().await;
        let mut scored: Vec<(f64, u64, Video)> = data
            .videos
            .iter()
            .filter_map(|(seq, v)| {
                let score = terms.score(v);
                (score > 0.0).then(|| (score, *seq, v.clone()))
            })
            .collect();
        scored.sort_by(|(score_a, seq_a, _), (score_b, seq_b, _)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| seq_b.cmp(seq_a))
        });
        let total = scored.len() as u64;
        let videos = scored.into_iter().map(|(_, _, v)| v).collect();
        Ok((page_of(videos, page), total))
    }

    async fn all_videos(&self) -> StoreResult<Vec<Video>> {
        let data = self.data.read().await;
        let mut videos = data.videos.clone();
        newest_first(&mut videos);
        Ok(videos.into_iter().map(|(_, v)| v).collect())
    }

    async fn count_videos(&self) -> StoreResult<u64> {
        Ok(self.data.read().await.videos.len() as u64)
    }

    async fn get_video(&self, id: ObjectId) -> StoreResult<Option<Video>> {
        let data = self.data.read().await;
        Ok(data
            .videos
            .iter()
            .find(|(_, v)| v.id == Some(id))
            .map(|(_, v)| v.clone()))
    }

    async fn insert_video(&self, mut video: Video) -> StoreResult<Video> {
        let mut data = self.data.write().await;
        video.id = Some(ObjectId::new());
        let seq = data.next_seq;
        data.next_seq += 1;
        data.videos.push((seq, video.clone()));
        Ok(video)
    }

    async fn insert_videos(&self, videos: Vec<Video>) -> StoreResult<u64> {
        let count = videos.len() as u64;
        for video in videos {
            self.insert_video(video).await?;
        }
        Ok(count)
    }

    async fn replace_video(&self, id: ObjectId, mut video: Video) -> StoreResult<Option<Video>> {
        let mut data = self.data.write().await;
        match data.videos.iter_mut().find(|(_, v)| v.id == Some(id)) {
            Some((_, slot)) => {
                video.id = Some(id);
                *slot = video.clone();
                Ok(Some(video))
            }
            None => Ok(None),
        }
    }

    async fn delete_video(&self, id: ObjectId) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.videos.len();
        data.videos.retain(|(_, v)| v.id != Some(id));
        Ok(data.videos.len() < before)
    }

    async fn delete_all_videos(&self) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let count = data.videos.len() as u64;
        data.videos.clear();
        Ok(count)
    }

    async fn record_view(&self, id: ObjectId) -> StoreResult<Option<Video>> {
        let mut data = self.data.write().await;
        Ok(data
            .videos
            .iter_mut()
            .find(|(_, v)| v.id == Some(id))
            .map(|(_, v)| {
                v.views += 1;
                v.clone()
            }))
    }

    async fn load_settings(&self) -> StoreResult<SiteSettings> {
        let mut data = self.data.write().await;
        Ok(data.settings.get_or_insert_with(SiteSettings::default).clone())
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> StoreResult<SiteSettings> {
        let mut data = self.data.write().await;
        let settings = data.settings.as_mut().ok_or(StoreError::SettingsMissing)?;
        patch.apply(settings);
        settings.version += 1;
        settings.updated_at = DateTime::now();
        Ok(settings.clone())
    }

    async fn reset_settings(&self) -> StoreResult<SiteSettings> {
        let mut data = self.data.write().await;
        let version = data.settings.as_ref().map_or(0, |s| s.version) + 1;
        let fresh = SiteSettings {
            version,
            ..SiteSettings::default()
        };
        data.settings = Some(fresh.clone());
        Ok(fresh)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, mut user: User) -> StoreResult<User> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        user.id = Some(ObjectId::new());
        data.users.push(user.clone());
        Ok(user)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let data = self.data.read().await;
        let mut categories = data.categories.clone();
        categories.sort_by_key(|c| c.order);
        Ok(categories)
    }

    async fn insert_category(&self, mut category: Category) -> StoreResult<Category> {
        let mut data = self.data.write().await;
        if data.categories.iter().any(|c| c.slug == category.slug) {
            return Err(StoreError::Duplicate("slug"));
        }
        category.id = Some(ObjectId::new());
        data.categories.push(category.clone());
        Ok(category)
    }

    async fn admin_credential(&self) -> StoreResult<Option<AdminCredential>> {
        Ok(self.data.read().await.credential.clone())
    }

    async fn save_admin_credential(&self, credential: AdminCredential) -> StoreResult<()> {
        self.data.write().await.credential = Some(credential);
        Ok(())
    }

    async fn append_credential_audit(&self, mut entry: CredentialAudit) -> StoreResult<()> {
        entry.id = Some(ObjectId::new());
        self.data.write().await.audit.push(entry);
        Ok(())
    }

    async fn credential_audit(&self, limit: i64) -> StoreResult<Vec<CredentialAudit>> {
        let data = self.data.read().await;
        Ok(data
            .audit
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_session(&self, session: Session) -> StoreResult<()> {
        self.data
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let data = self.data.read().await;
        let now = DateTime::now();
        Ok(data
            .sessions
            .get(token)
            .filter(|s| !s.is_expired(now))
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.data.write().await.sessions.remove(token);
        Ok(())
    }
}
