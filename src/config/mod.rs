//! Configuration loading and management

mod io;
mod settings;

pub use settings::{DatabaseSettings, GamificationSettings, QueueSettings};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Gamification database
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Offline operation queue
    #[serde(default)]
    pub queue: QueueSettings,

    /// Check-in rewards
    #[serde(default)]
    pub gamification: GamificationSettings,
}
