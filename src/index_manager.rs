use crate::store::{CATEGORIES, CREDENTIAL_AUDIT, SESSIONS, USERS, VIDEOS};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{options::IndexOptions, Database, IndexModel};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub keys: Document,
    pub name: &'static str,
    pub unique: bool,
    pub expire_after: Option<Duration>,
}

impl IndexSpec {
    fn plain(collection: &'static str, keys: Document, name: &'static str) -> Self {
        IndexSpec {
            collection,
            keys,
            name,
            unique: false,
            expire_after: None,
        }
    }

    fn unique(collection: &'static str, keys: Document, name: &'static str) -> Self {
        IndexSpec {
            unique: true,
            ..Self::plain(collection, keys, name)
        }
    }
}

pub struct IndexManager {
    db: Database,
}

impl IndexManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn index_specs() -> Vec<IndexSpec> {
        vec![
            // Full-text search over the catalog
            IndexSpec::plain(
                VIDEOS,
                doc! { "title": "text", "description": "text", "cast": "text" },
                "title_text_description_text_cast_text",
            ),
            IndexSpec::plain(VIDEOS, doc! { "title": 1 }, "title_1"),
            IndexSpec::plain(VIDEOS, doc! { "year": 1 }, "year_1"),
            IndexSpec::plain(VIDEOS, doc! { "genres": 1 }, "genres_1"),
            IndexSpec::plain(VIDEOS, doc! { "languages": 1 }, "languages_1"),
            IndexSpec::plain(VIDEOS, doc! { "categories": 1 }, "categories_1"),
            IndexSpec::plain(VIDEOS, doc! { "isTrending": 1 }, "isTrending_1"),
            IndexSpec::plain(VIDEOS, doc! { "isFeatured": 1 }, "isFeatured_1"),
            IndexSpec::plain(VIDEOS, doc! { "createdAt": -1 }, "createdAt_-1"),
            IndexSpec::unique(USERS, doc! { "email": 1 }, "email_1"),
            IndexSpec::unique(CATEGORIES, doc! { "slug": 1 }, "slug_1"),
            IndexSpec::plain(CREDENTIAL_AUDIT, doc! { "at": -1 }, "at_-1"),
            IndexSpec {
                expire_after: Some(Duration::from_secs(0)),
                ..IndexSpec::plain(SESSIONS, doc! { "expiresAt": 1 }, "expiresAt_ttl")
            },
        ]
    }

    async fn index_exists(&self, collection_name: &str, index_name: &str) -> Result<bool, mongodb::error::Error> {
        let collection = self.db.collection::<Document>(collection_name);
        let names = collection.list_index_names().await;
        match names {
            Ok(names) => Ok(names.iter().any(|n| n == index_name)),
            // NamespaceNotFound: the collection has not been created yet
            Err(e) if matches!(e.kind.as_ref(), mongodb::error::ErrorKind::Command(c) if c.code == 26) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), mongodb::error::Error> {
        match self.index_exists(spec.collection, spec.name).await {
            Ok(true) => {
                log::debug!("index {} on {} already exists", spec.name, spec.collection);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                log::warn!("could not list indexes on {}: {}", spec.collection, e);
            }
        }

        let options = IndexOptions::builder()
            .name(spec.name.to_string())
            .unique(spec.unique.then_some(true))
            .expire_after(spec.expire_after)
            .build();
        let model = IndexModel::builder()
            .keys(spec.keys.clone())
            .options(options)
            .build();

        let collection = self.db.collection::<Document>(spec.collection);
        match collection.create_index(model, None).await {
            Ok(_) => {
                log::info!("created index {} on {}", spec.name, spec.collection);
                Ok(())
            }
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => {
                log::error!("failed to create index {} on {}: {}", spec.name, spec.collection, e);
                Err(e)
            }
        }
    }

    /// Creates every missing index. Returns the number that failed.
    pub async fn create_all_indexes(&self) -> usize {
        let specs = Self::index_specs();
        let mut failed = 0;
        for spec in &specs {
            if self.create_index(spec).await.is_err() {
                failed += 1;
            }
        }
        log::info!(
            "index check finished: {} ok, {} failed",
            specs.len() - failed,
            failed
        );
        failed
    }

    /// Names of the indexes present on the catalog collection, `_id_` excluded.
    pub async fn video_indexes(&self) -> Result<Vec<String>, mongodb::error::Error> {
        let mut cursor = self.db.collection::<Document>(VIDEOS).list_indexes(None).await?;
        let mut names = Vec::new();
        while let Some(model) = cursor.try_next().await? {
            if let Some(name) = model.options.and_then(|o| o.name) {
                if name != "_id_" {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}
