//! Settings configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Config;

/// Gamification database location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file holding streaks, achievements and levels
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    Config::global_config_dir().join("gamification.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Offline operation queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Directory of the local key-value storage
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Key the queue is persisted under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Failed sync attempts before an operation is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How many dropped operations are kept for inspection
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

fn default_storage_dir() -> PathBuf {
    Config::global_config_dir().join("storage")
}

fn default_storage_key() -> String {
    "valtrix_offline_queue".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_dead_letter_capacity() -> usize {
    50
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
            max_retries: default_max_retries(),
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}

/// Daily check-in rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamificationSettings {
    /// Points granted for every check-in
    #[serde(default = "default_check_in_points")]
    pub check_in_points: u64,

    /// Streak type a check-in extends
    #[serde(default = "default_check_in_streak")]
    pub check_in_streak: String,
}

fn default_check_in_points() -> u64 {
    10
}

fn default_check_in_streak() -> String {
    crate::gamification::DAILY_PROSPECTING.to_string()
}

impl Default for GamificationSettings {
    fn default() -> Self {
        Self {
            check_in_points: default_check_in_points(),
            check_in_streak: default_check_in_streak(),
        }
    }
}
