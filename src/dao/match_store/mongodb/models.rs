use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::MatchRecordEntity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    user_id: String,
    wpm: u32,
    raw_wpm: u32,
    accuracy: f64,
    consistency: f64,
    error_count: u32,
    mode: String,
    language: String,
    duration_seconds: u32,
    bad_keys: serde_json::Value,
    improvement_needed: String,
    created_at: DateTime,
}

impl From<MatchRecordEntity> for MongoMatchDocument {
    fn from(value: MatchRecordEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            wpm: value.wpm,
            raw_wpm: value.raw_wpm,
            accuracy: value.accuracy,
            consistency: value.consistency,
            error_count: value.error_count,
            mode: value.mode,
            language: value.language,
            duration_seconds: value.duration_seconds,
            bad_keys: value.bad_keys,
            improvement_needed: value.improvement_needed,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoMatchDocument> for MatchRecordEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            wpm: value.wpm,
            raw_wpm: value.raw_wpm,
            accuracy: value.accuracy,
            consistency: value.consistency,
            error_count: value.error_count,
            mode: value.mode,
            language: value.language,
            duration_seconds: value.duration_seconds,
            bad_keys: value.bad_keys,
            improvement_needed: value.improvement_needed,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Read-side projection of a `users` document; writes go through the
/// `$setOnInsert` upsert and never serialize this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_guest: bool,
}
