use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Finished-race result persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRecordEntity {
    /// Primary key of the match, assigned by the gateway on insert.
    pub id: Uuid,
    /// Identifier of the player the match belongs to.
    pub user_id: String,
    /// Final words-per-minute score.
    pub wpm: u32,
    /// Words-per-minute before error correction.
    pub raw_wpm: u32,
    /// Accuracy percentage (0.0 to 100.0).
    pub accuracy: f64,
    /// Keystroke consistency percentage.
    pub consistency: f64,
    /// Number of uncorrected errors.
    pub error_count: u32,
    /// Game mode the race was played in (e.g. "time", "words").
    pub mode: String,
    /// Language of the prompt text.
    pub language: String,
    /// Race duration in seconds.
    pub duration_seconds: u32,
    /// Opaque per-key error statistics, stored as submitted.
    pub bad_keys: serde_json::Value,
    /// Free-form coaching hint produced by the client.
    pub improvement_needed: String,
    /// Insertion timestamp, assigned by the gateway.
    pub created_at: SystemTime,
}

/// Match fields supplied by the caller; id and created_at are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMatchRecord {
    pub user_id: String,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: f64,
    pub consistency: f64,
    pub error_count: u32,
    pub mode: String,
    pub language: String,
    pub duration_seconds: u32,
    pub bad_keys: serde_json::Value,
    pub improvement_needed: String,
}

/// Player account row shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Client-supplied stable identifier.
    pub id: String,
    /// Display name shown on the leaderboard.
    pub username: String,
    /// Whether the account was auto-created on lobby join.
    pub is_guest: bool,
}
