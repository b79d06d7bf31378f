use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, MongoUserDocument},
};
use crate::dao::{
    match_store::MatchStore,
    models::{MatchRecordEntity, NewMatchRecord, UserEntity},
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";
const USER_COLLECTION_NAME: &str = "users";

#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.match_collection().await;
        // Supports the per-user history query (filter by user, newest first).
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"user_id": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_user_created_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "user_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn match_collection(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn user_collection(&self) -> Collection<MongoUserDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn create_match(&self, record: NewMatchRecord) -> MongoResult<MatchRecordEntity> {
        let entity = MatchRecordEntity {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            wpm: record.wpm,
            raw_wpm: record.raw_wpm,
            accuracy: record.accuracy,
            consistency: record.consistency,
            error_count: record.error_count,
            mode: record.mode,
            language: record.language,
            duration_seconds: record.duration_seconds,
            bad_keys: record.bad_keys,
            improvement_needed: record.improvement_needed,
            created_at: SystemTime::now(),
        };

        let collection = self.match_collection().await;
        let document: MongoMatchDocument = entity.clone().into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch {
                user_id: entity.user_id.clone(),
                source,
            })?;

        Ok(entity)
    }

    async fn matches_by_user(
        &self,
        user_id: String,
        limit: usize,
    ) -> MongoResult<Vec<MatchRecordEntity>> {
        let collection = self.match_collection().await;

        let documents: Vec<MongoMatchDocument> = collection
            .find(doc! { "user_id": &user_id })
            .sort(doc! { "created_at": -1 })
            .limit(limit as i64)
            .await
            .map_err(|source| MongoDaoError::LoadMatches {
                user_id: user_id.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadMatches {
                user_id: user_id.clone(),
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn create_guest(&self, user: UserEntity) -> MongoResult<()> {
        let collection = self.user_collection().await;
        let id = user.id.clone();
        let now = DateTime::now();

        // $setOnInsert keeps an existing account untouched when the id is
        // already registered.
        collection
            .update_one(
                doc! { "_id": &user.id },
                doc! { "$setOnInsert": {
                    "username": &user.username,
                    "is_guest": user.is_guest,
                    "created_at": now,
                    "updated_at": now,
                } },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveUser { id, source })?;

        Ok(())
    }

    async fn find_username(&self, user_id: String) -> MongoResult<Option<String>> {
        let collection = self.user_collection().await;

        let document = collection
            .find_one(doc! { "_id": &user_id })
            .await
            .map_err(|source| MongoDaoError::LoadUser {
                id: user_id.clone(),
                source,
            })?;

        Ok(document.map(|user| user.username))
    }
}

impl MatchStore for MongoMatchStore {
    fn create_match(
        &self,
        record: NewMatchRecord,
    ) -> BoxFuture<'static, StorageResult<MatchRecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_match(record).await.map_err(Into::into) })
    }

    fn matches_by_user(
        &self,
        user_id: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.matches_by_user(user_id, limit).await.map_err(Into::into) })
    }

    fn create_guest(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_guest(user).await.map_err(Into::into) })
    }

    fn find_username(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { store.find_username(user_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
