//! Achievement definitions and metadata
//!
//! The catalog is managed outside the engine; this module only describes its
//! shape and ships a default sales catalog used to seed a fresh store.

use serde::{Deserialize, Serialize};

/// Error raised when a catalog row read back from the store cannot be decoded
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreDecodeError {
    #[error("Unknown achievement category: {0}")]
    UnknownCategory(String),

    #[error("Unknown achievement tier: {0}")]
    UnknownTier(String),

    #[error("Unknown requirement type: {0}")]
    UnknownRequirement(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Requirement '{0}' needs a metric")]
    MissingMetric(&'static str),
}

/// Achievement category for grouping in UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Streak,
    Volume,
    Conversion,
    Milestone,
    Special,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streak => "streak",
            Self::Volume => "volume",
            Self::Conversion => "conversion",
            Self::Milestone => "milestone",
            Self::Special => "special",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StoreDecodeError> {
        match s {
            "streak" => Ok(Self::Streak),
            "volume" => Ok(Self::Volume),
            "conversion" => Ok(Self::Conversion),
            "milestone" => Ok(Self::Milestone),
            "special" => Ok(Self::Special),
            other => Err(StoreDecodeError::UnknownCategory(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Streak => "Streaks",
            Self::Volume => "Volume",
            Self::Conversion => "Conversion",
            Self::Milestone => "Milestones",
            Self::Special => "Special",
        }
    }
}

/// Rarity tier shown next to an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl AchievementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StoreDecodeError> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            "diamond" => Ok(Self::Diamond),
            other => Err(StoreDecodeError::UnknownTier(other.to_string())),
        }
    }
}

/// Sales activity counter an achievement can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Contacts,
    Calls,
    Meetings,
    Deals,
    Revenue,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Calls => "calls",
            Self::Meetings => "meetings",
            Self::Deals => "deals",
            Self::Revenue => "revenue",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StoreDecodeError> {
        match s {
            "contacts" => Ok(Self::Contacts),
            "calls" => Ok(Self::Calls),
            "meetings" => Ok(Self::Meetings),
            "deals" => Ok(Self::Deals),
            "revenue" => Ok(Self::Revenue),
            other => Err(StoreDecodeError::UnknownMetric(other.to_string())),
        }
    }
}

/// Unlock rule of an achievement.
///
/// Each variant carries exactly what its check reads, so adding a rule kind
/// forces every evaluator to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Current count of the named streak reaches `days`
    StreakDays { streak_type: String, days: u32 },
    /// Cumulative total of `metric` reaches `count`
    TotalCount { metric: Metric, count: u64 },
    /// Today's activity for `metric` reaches `count`
    SingleDay { metric: Metric, count: u64 },
    /// Cumulative revenue reaches `amount`
    TotalRevenue { amount: f64 },
}

impl Requirement {
    /// Tag stored in the `requirement_type` column
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreakDays { .. } => "streak_days",
            Self::TotalCount { .. } => "total_count",
            Self::SingleDay { .. } => "single_day",
            Self::TotalRevenue { .. } => "total_revenue",
        }
    }

    /// Numeric threshold the current value is compared against
    pub fn threshold(&self) -> f64 {
        match self {
            Self::StreakDays { days, .. } => f64::from(*days),
            Self::TotalCount { count, .. } | Self::SingleDay { count, .. } => *count as f64,
            Self::TotalRevenue { amount } => *amount,
        }
    }

    /// Value stored in the `requirement_metric` column
    pub fn metric_name(&self) -> Option<&str> {
        match self {
            Self::StreakDays { streak_type, .. } => Some(streak_type.as_str()),
            Self::TotalCount { metric, .. } | Self::SingleDay { metric, .. } => {
                Some(metric.as_str())
            }
            Self::TotalRevenue { .. } => None,
        }
    }

    /// Rebuild a requirement from its stored columns
    pub fn from_parts(
        kind: &str,
        value: f64,
        metric: Option<&str>,
    ) -> Result<Self, StoreDecodeError> {
        let value = value.max(0.0);
        match kind {
            "streak_days" => Ok(Self::StreakDays {
                streak_type: metric
                    .ok_or(StoreDecodeError::MissingMetric("streak_days"))?
                    .to_string(),
                days: value.ceil() as u32,
            }),
            "total_count" => Ok(Self::TotalCount {
                metric: Metric::parse(
                    metric.ok_or(StoreDecodeError::MissingMetric("total_count"))?,
                )?,
                count: value.ceil() as u64,
            }),
            "single_day" => Ok(Self::SingleDay {
                metric: Metric::parse(
                    metric.ok_or(StoreDecodeError::MissingMetric("single_day"))?,
                )?,
                count: value.ceil() as u64,
            }),
            "total_revenue" => Ok(Self::TotalRevenue { amount: value }),
            other => Err(StoreDecodeError::UnknownRequirement(other.to_string())),
        }
    }
}

/// Achievement definition with all metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub requirement: Requirement,
    pub points: u32,
    pub tier: AchievementTier,
    pub active: bool,
}

/// Streak type driven by sales check-ins
pub const DAILY_PROSPECTING: &str = "daily_prospecting";

#[allow(clippy::too_many_arguments)]
fn def(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    category: AchievementCategory,
    requirement: Requirement,
    points: u32,
    tier: AchievementTier,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        category,
        requirement,
        points,
        tier,
        active: true,
    }
}

/// Built-in sales catalog for seeding a new store
pub fn default_catalog() -> Vec<Achievement> {
    use AchievementCategory as C;
    use AchievementTier as T;

    let streak = |days| Requirement::StreakDays {
        streak_type: DAILY_PROSPECTING.to_string(),
        days,
    };

    vec![
        // === STREAK ===
        def(
            "streak_3",
            "Warming Up",
            "Prospect 3 days in a row",
            "🔥",
            C::Streak,
            streak(3),
            30,
            T::Bronze,
        ),
        def(
            "streak_7",
            "On Fire",
            "Prospect 7 days in a row",
            "🔥",
            C::Streak,
            streak(7),
            75,
            T::Silver,
        ),
        def(
            "streak_30",
            "Unstoppable",
            "Prospect 30 days in a row",
            "⚡",
            C::Streak,
            streak(30),
            300,
            T::Gold,
        ),
        def(
            "streak_100",
            "Relentless",
            "Prospect 100 days in a row",
            "💎",
            C::Streak,
            streak(100),
            1000,
            T::Diamond,
        ),
        // === VOLUME ===
        def(
            "contacts_100",
            "Networker",
            "Reach 100 contacts",
            "📇",
            C::Volume,
            Requirement::TotalCount { metric: Metric::Contacts, count: 100 },
            50,
            T::Bronze,
        ),
        def(
            "contacts_1000",
            "Rolodex",
            "Reach 1,000 contacts",
            "📚",
            C::Volume,
            Requirement::TotalCount { metric: Metric::Contacts, count: 1000 },
            250,
            T::Gold,
        ),
        def(
            "calls_500",
            "Dialer",
            "Make 500 calls",
            "📞",
            C::Volume,
            Requirement::TotalCount { metric: Metric::Calls, count: 500 },
            150,
            T::Silver,
        ),
        def(
            "calls_day_50",
            "Phone Marathon",
            "Make 50 calls in a single day",
            "☎️",
            C::Volume,
            Requirement::SingleDay { metric: Metric::Calls, count: 50 },
            100,
            T::Silver,
        ),
        def(
            "meetings_day_5",
            "Packed Calendar",
            "Hold 5 meetings in a single day",
            "📅",
            C::Volume,
            Requirement::SingleDay { metric: Metric::Meetings, count: 5 },
            80,
            T::Silver,
        ),
        // === CONVERSION ===
        def(
            "first_deal",
            "First Close",
            "Close your first deal",
            "🤝",
            C::Conversion,
            Requirement::TotalCount { metric: Metric::Deals, count: 1 },
            25,
            T::Bronze,
        ),
        def(
            "deals_50",
            "Closer",
            "Close 50 deals",
            "🏆",
            C::Conversion,
            Requirement::TotalCount { metric: Metric::Deals, count: 50 },
            400,
            T::Platinum,
        ),
        def(
            "deals_day_3",
            "Hat Trick",
            "Close 3 deals in a single day",
            "🎩",
            C::Conversion,
            Requirement::SingleDay { metric: Metric::Deals, count: 3 },
            150,
            T::Gold,
        ),
        // === MILESTONE ===
        def(
            "revenue_10k",
            "Five Figures",
            "Generate 10,000 in revenue",
            "💰",
            C::Milestone,
            Requirement::TotalRevenue { amount: 10_000.0 },
            100,
            T::Silver,
        ),
        def(
            "revenue_100k",
            "Six Figures",
            "Generate 100,000 in revenue",
            "💎",
            C::Milestone,
            Requirement::TotalRevenue { amount: 100_000.0 },
            500,
            T::Platinum,
        ),
        def(
            "revenue_1m",
            "Rainmaker",
            "Generate 1,000,000 in revenue",
            "👑",
            C::Special,
            Requirement::TotalRevenue { amount: 1_000_000.0 },
            2000,
            T::Diamond,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_catalog_ids_unique() {
        let catalog = default_catalog();
        let ids: HashSet<_> = catalog.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.iter().all(|a| a.active));
    }

    #[test]
    fn test_requirement_from_parts() {
        let req = Requirement::from_parts("streak_days", 7.0, Some("daily_prospecting")).unwrap();
        assert_eq!(
            req,
            Requirement::StreakDays { streak_type: "daily_prospecting".to_string(), days: 7 }
        );

        let req = Requirement::from_parts("total_revenue", 5000.0, None).unwrap();
        assert_eq!(req.threshold(), 5000.0);
        assert_eq!(req.metric_name(), None);

        assert_eq!(
            Requirement::from_parts("weekly_best", 1.0, None),
            Err(StoreDecodeError::UnknownRequirement("weekly_best".to_string()))
        );
        assert_eq!(
            Requirement::from_parts("single_day", 3.0, None),
            Err(StoreDecodeError::MissingMetric("single_day"))
        );
        assert_eq!(
            Requirement::from_parts("total_count", 3.0, Some("emails")),
            Err(StoreDecodeError::UnknownMetric("emails".to_string()))
        );
    }

    #[test]
    fn test_requirement_serde_tag() {
        let req = Requirement::SingleDay { metric: Metric::Calls, count: 50 };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "single_day");
        assert_eq!(json["metric"], "calls");
    }
}
