use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dao::models::MatchRecordEntity, dto::format_system_time};

/// One persisted match as returned by the history endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchHistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: f64,
    pub consistency: f64,
    pub error_count: u32,
    pub mode: String,
    pub language: String,
    /// Race duration in seconds.
    pub duration: u32,
    /// Opaque per-key error statistics, returned as stored.
    pub bad_keys: serde_json::Value,
    pub improvement_needed: String,
    /// RFC 3339 timestamp of when the match was recorded.
    pub created_at: String,
}

impl From<MatchRecordEntity> for MatchHistoryEntry {
    fn from(entity: MatchRecordEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            wpm: entity.wpm,
            raw_wpm: entity.raw_wpm,
            accuracy: entity.accuracy,
            consistency: entity.consistency,
            error_count: entity.error_count,
            mode: entity.mode,
            language: entity.language,
            duration: entity.duration_seconds,
            bad_keys: entity.bad_keys,
            improvement_needed: entity.improvement_needed,
            created_at: format_system_time(entity.created_at),
        }
    }
}
