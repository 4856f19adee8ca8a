//! Data models for the gamification engine
//!
//! Per-user records stored in the gamification database plus the statistics
//! snapshot that unlock evaluation reads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::definitions::Metric;
use super::levels::{DEFAULT_XP_TO_NEXT_LEVEL, Level};
use super::streaks::Streak;

/// Cumulative or per-day sales counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub contacts: u64,
    pub calls: u64,
    pub meetings: u64,
    pub deals: u64,
    pub revenue: f64,
}

impl MetricTotals {
    /// Value of one metric as a comparable number
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Contacts => self.contacts as f64,
            Metric::Calls => self.calls as f64,
            Metric::Meetings => self.meetings as f64,
            Metric::Deals => self.deals as f64,
            Metric::Revenue => self.revenue,
        }
    }
}

/// Statistics snapshot used by unlock evaluation and progress display
#[derive(Debug, Clone, Default)]
pub struct ActivityStats {
    pub streaks: Vec<Streak>,
    pub totals: MetricTotals,
    pub today: MetricTotals,
}

impl ActivityStats {
    /// Current count of a named streak (0 if the user has none)
    pub fn streak_count(&self, streak_type: &str) -> u32 {
        self.streaks
            .iter()
            .find(|s| s.streak_type == streak_type)
            .map(|s| s.current_count)
            .unwrap_or(0)
    }
}

/// Record of a user having unlocked an achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
    pub progress: u8,
}

/// A level up event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
    pub new_title: String,
}

/// Per-user points, level and cumulative totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGamification {
    pub user_id: String,
    pub total_points: u64,
    pub current_level: u32,
    pub xp_current: u64,
    pub xp_to_next_level: u64,
    pub totals: MetricTotals,
}

impl UserGamification {
    /// Defaults for a user that has never earned points
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total_points: 0,
            current_level: 1,
            xp_current: 0,
            xp_to_next_level: DEFAULT_XP_TO_NEXT_LEVEL,
            totals: MetricTotals::default(),
        }
    }

    pub fn title(&self) -> &'static str {
        Level::title_for(self.current_level)
    }

    /// Progress within the current level (0.0 - 1.0)
    pub fn level_progress(&self) -> f32 {
        if self.xp_to_next_level == 0 {
            return 1.0;
        }
        (self.xp_current as f32 / self.xp_to_next_level as f32).min(1.0)
    }

    /// Add points to the total and to the XP bar, then level up as many
    /// times as the XP allows.
    pub fn add_points(&mut self, points: u64) -> Option<LevelUp> {
        self.total_points = self.total_points.saturating_add(points);
        self.xp_current = self.xp_current.saturating_add(points);
        self.normalize_level()
    }

    /// Restore `xp_current < xp_to_next_level`, advancing levels as needed
    fn normalize_level(&mut self) -> Option<LevelUp> {
        let old_level = self.current_level.max(1);
        self.current_level = old_level;
        if self.xp_to_next_level == 0 {
            self.xp_to_next_level = Level::xp_to_next(self.current_level, 0);
        }

        while self.xp_current >= self.xp_to_next_level {
            self.xp_current -= self.xp_to_next_level;
            self.current_level += 1;
            self.xp_to_next_level = Level::xp_to_next(self.current_level, self.xp_to_next_level);
        }

        (self.current_level > old_level).then(|| LevelUp {
            old_level,
            new_level: self.current_level,
            new_title: self.title().to_string(),
        })
    }

    /// Overwrite the cumulative fields named in `update`
    pub fn apply_totals(&mut self, update: &TotalsUpdate) {
        if let Some(contacts) = update.contacts {
            self.totals.contacts = contacts;
        }
        if let Some(calls) = update.calls {
            self.totals.calls = calls;
        }
        if let Some(meetings) = update.meetings {
            self.totals.meetings = meetings;
        }
        if let Some(deals) = update.deals {
            self.totals.deals = deals;
        }
        if let Some(revenue) = update.revenue {
            self.totals.revenue = revenue;
        }
    }
}

/// Partial overwrite of cumulative totals; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsUpdate {
    pub contacts: Option<u64>,
    pub calls: Option<u64>,
    pub meetings: Option<u64>,
    pub deals: Option<u64>,
    pub revenue: Option<f64>,
}

/// One day's sales check-in submitted by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub date: NaiveDate,
    #[serde(default)]
    pub activity: MetricTotals,
}
