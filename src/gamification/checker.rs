//! Achievement checking logic
//!
//! Unlock checks and progress display share `current_value`, so a requirement
//! shows 100% exactly when it would unlock.

use std::collections::HashSet;

use super::definitions::{Achievement, Metric, Requirement};
use super::models::ActivityStats;

/// Value the requirement is measured against
pub fn current_value(requirement: &Requirement, stats: &ActivityStats) -> f64 {
    match requirement {
        Requirement::StreakDays { streak_type, .. } => f64::from(stats.streak_count(streak_type)),
        Requirement::TotalCount { metric, .. } => stats.totals.get(*metric),
        Requirement::SingleDay { metric, .. } => stats.today.get(*metric),
        Requirement::TotalRevenue { .. } => stats.totals.get(Metric::Revenue),
    }
}

/// Whether the requirement is met by `stats`
pub fn is_satisfied(requirement: &Requirement, stats: &ActivityStats) -> bool {
    current_value(requirement, stats) >= requirement.threshold()
}

/// Progress towards the requirement, 0-100.
///
/// Rounds to the nearest integer but never reports 100 for an unmet requirement.
pub fn progress_percent(requirement: &Requirement, stats: &ActivityStats) -> u8 {
    if is_satisfied(requirement, stats) {
        return 100;
    }

    let threshold = requirement.threshold();
    let current = current_value(requirement, stats);
    if threshold <= 0.0 || !current.is_finite() {
        return 0;
    }

    let percent = (current / threshold * 100.0).round().clamp(0.0, 99.0);
    percent as u8
}

/// Active achievements not yet in `unlocked` whose requirement is met
pub fn check_unlocks<'a>(
    catalog: &'a [Achievement],
    unlocked: &HashSet<String>,
    stats: &ActivityStats,
) -> Vec<&'a Achievement> {
    catalog
        .iter()
        .filter(|a| a.active && !unlocked.contains(&a.id))
        .filter(|a| is_satisfied(&a.requirement, stats))
        .collect()
}
