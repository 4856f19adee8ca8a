//! Gamification system: Streaks, Achievements, Points and Levels
//!
//! Turns sales activity (check-ins, calls, deals) into streaks, achievement
//! unlocks and level progression.
//!
//! # Usage
//!
//! ```ignore
//! let store = SqliteStore::open(&config.database.path)?;
//! let engine = GamificationEngine::new(store, config.gamification.clone());
//!
//! let events = engine.process_check_in("user-1", &check_in)?;
//! ```

mod checker;
mod definitions;
mod levels;
mod manager;
mod models;
mod store;
mod streaks;

pub use checker::{current_value, is_satisfied, progress_percent};
pub use definitions::{
    Achievement, AchievementCategory, AchievementTier, DAILY_PROSPECTING, Metric, Requirement,
    StoreDecodeError, default_catalog,
};
pub use levels::{DEFAULT_XP_TO_NEXT_LEVEL, LEVELS, Level};
pub use manager::{AchievementStatus, GamificationEngine, GamificationEvent, UnlockedAchievement};
pub use models::{
    ActivityStats, CheckIn, LevelUp, MetricTotals, TotalsUpdate, UserAchievement,
    UserGamification,
};
pub use store::{GamificationStore, SqliteStore};
pub use streaks::{Streak, StreakChange};
