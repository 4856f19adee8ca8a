//! Streak tracking
//!
//! A streak counts consecutive calendar days with activity of one named type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-user counter of consecutive-day activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub user_id: String,
    pub streak_type: String,
    pub current_count: u32,
    /// Never decreases; always >= `current_count`
    pub longest_count: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// What an activity report did to a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First activity ever for this streak
    Started,
    /// Activity on the day after the last one
    Extended,
    /// Gap of more than one day, counting restarts at 1
    Restarted,
    /// Same day as the last activity
    AlreadyCounted,
    /// Date precedes the last activity
    Stale,
}

impl StreakChange {
    /// Whether the record changed and must be written back
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Started | Self::Extended | Self::Restarted)
    }
}

impl Streak {
    /// A streak that has not seen any activity yet
    pub fn new(user_id: impl Into<String>, streak_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            streak_type: streak_type.into(),
            current_count: 0,
            longest_count: 0,
            last_activity_date: None,
        }
    }

    /// Apply an activity report for `date`.
    ///
    /// Reports must arrive in increasing date order; earlier dates are ignored.
    pub fn record_activity(&mut self, date: NaiveDate) -> StreakChange {
        let Some(last) = self.last_activity_date else {
            self.current_count = 1;
            self.longest_count = self.longest_count.max(1);
            self.last_activity_date = Some(date);
            return StreakChange::Started;
        };

        let change = match (date - last).num_days() {
            gap if gap < 0 => return StreakChange::Stale,
            0 => return StreakChange::AlreadyCounted,
            1 => {
                self.current_count = self.current_count.saturating_add(1);
                StreakChange::Extended
            }
            _ => {
                self.current_count = 1;
                StreakChange::Restarted
            }
        };

        self.longest_count = self.longest_count.max(self.current_count);
        self.last_activity_date = Some(date);
        change
    }

    /// Zero the current run, keeping the record
    pub fn reset(&mut self) {
        self.current_count = 0;
    }

    /// Active if the last activity was on `today` or the day before
    pub fn is_active(&self, today: NaiveDate) -> bool {
        match self.last_activity_date {
            Some(last) => (0..=1).contains(&(today - last).num_days()),
            None => false,
        }
    }
}
