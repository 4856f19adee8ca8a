//! Gamification engine - core logic
//!
//! Handles streak updates, achievement unlocks, points and levels on top of a
//! `GamificationStore`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

use super::checker::{check_unlocks, progress_percent};
use super::definitions::Achievement;
use super::models::{
    ActivityStats, CheckIn, LevelUp, MetricTotals, TotalsUpdate, UserAchievement,
    UserGamification,
};
use super::store::GamificationStore;
use super::streaks::{Streak, StreakChange};
use crate::config::GamificationSettings;

/// An achievement that was just unlocked
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockedAchievement {
    pub achievement: Achievement,
    pub record: UserAchievement,
}

/// Events that can happen while processing activity
#[derive(Debug, Clone, PartialEq)]
pub enum GamificationEvent {
    AchievementUnlocked(UnlockedAchievement),
    LevelUp(LevelUp),
    StreakUpdated {
        streak_type: String,
        count: u32,
        change: StreakChange,
    },
    PointsAwarded { amount: u64, reason: String },
}

/// An achievement with the user's standing against it
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub unlocked: Option<UserAchievement>,
    pub progress: u8,
}

/// Main entry point for all gamification features
pub struct GamificationEngine<S: GamificationStore> {
    store: S,
    settings: GamificationSettings,
}

impl<S: GamificationStore> GamificationEngine<S> {
    pub fn new(store: S, settings: GamificationSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================
    // STREAK OPERATIONS
    // ========================================

    /// Report activity of `streak_type` on `date` and return the resulting streak
    pub fn update_streak(
        &self,
        user_id: &str,
        streak_type: &str,
        date: NaiveDate,
    ) -> Result<Streak> {
        self.apply_streak(user_id, streak_type, date)
            .map(|(streak, _)| streak)
    }

    fn apply_streak(
        &self,
        user_id: &str,
        streak_type: &str,
        date: NaiveDate,
    ) -> Result<(Streak, StreakChange)> {
        let mut streak = self
            .store
            .get_streak(user_id, streak_type)?
            .unwrap_or_else(|| Streak::new(user_id, streak_type));

        let change = streak.record_activity(date);
        if change.is_mutation() {
            self.store.save_streak(&streak)?;
        }

        tracing::debug!(
            user_id,
            streak_type,
            %date,
            ?change,
            current = streak.current_count,
            "Streak updated"
        );
        Ok((streak, change))
    }

    /// Zero the current run of a streak. Returns `None` if the user has no such streak.
    pub fn reset_streak(&self, user_id: &str, streak_type: &str) -> Result<Option<Streak>> {
        let Some(mut streak) = self.store.get_streak(user_id, streak_type)? else {
            return Ok(None);
        };

        streak.reset();
        self.store.save_streak(&streak)?;
        Ok(Some(streak))
    }

    // ========================================
    // ACHIEVEMENT OPERATIONS
    // ========================================

    /// Unlock every active achievement the user now qualifies for and award its
    /// points. Returns only the unlocks made by this call.
    pub fn evaluate_unlocks(
        &self,
        user_id: &str,
        stats: &ActivityStats,
    ) -> Result<Vec<UserAchievement>> {
        Ok(self
            .unlock_qualifying(user_id, stats)?
            .into_iter()
            .map(|(unlocked, _)| unlocked.record)
            .collect())
    }

    fn unlock_qualifying(
        &self,
        user_id: &str,
        stats: &ActivityStats,
    ) -> Result<Vec<(UnlockedAchievement, Option<LevelUp>)>> {
        let catalog = self.store.active_achievements()?;
        let unlocked = self.store.unlocked_ids(user_id)?;

        let mut results = Vec::new();
        for achievement in check_unlocks(&catalog, &unlocked, stats) {
            let mut profile = self.profile(user_id)?;
            let level_up = profile.add_points(u64::from(achievement.points));

            let record = UserAchievement {
                user_id: user_id.to_string(),
                achievement_id: achievement.id.clone(),
                unlocked_at: Utc::now(),
                progress: 100,
            };

            if !self.store.record_unlock(&record, &profile)? {
                tracing::debug!(
                    user_id,
                    achievement = %achievement.id,
                    "Already unlocked, skipping"
                );
                continue;
            }

            tracing::info!(
                user_id,
                achievement = %achievement.id,
                points = achievement.points,
                "Achievement unlocked"
            );
            if let Some(level_up) = &level_up {
                tracing::info!(user_id, level = level_up.new_level, "Level up");
            }

            results.push((
                UnlockedAchievement {
                    achievement: achievement.clone(),
                    record,
                },
                level_up,
            ));
        }

        Ok(results)
    }

    /// Display progress (0-100) of `achievement` for the given statistics
    pub fn achievement_progress(achievement: &Achievement, stats: &ActivityStats) -> u8 {
        progress_percent(&achievement.requirement, stats)
    }

    /// Every active achievement with the user's unlock state and progress
    pub fn achievement_overview(
        &self,
        user_id: &str,
        stats: &ActivityStats,
    ) -> Result<Vec<AchievementStatus>> {
        let mut unlocked = self.store.user_achievements(user_id)?;

        Ok(self
            .store
            .active_achievements()?
            .into_iter()
            .map(|achievement| {
                let record = unlocked
                    .iter()
                    .position(|ua| ua.achievement_id == achievement.id)
                    .map(|i| unlocked.swap_remove(i));
                let progress = match &record {
                    Some(_) => 100,
                    None => Self::achievement_progress(&achievement, stats),
                };
                AchievementStatus {
                    achievement,
                    unlocked: record,
                    progress,
                }
            })
            .collect())
    }

    // ========================================
    // POINTS & LEVEL OPERATIONS
    // ========================================

    /// Current record, or the defaults for a user that has none yet (not persisted)
    pub fn profile(&self, user_id: &str) -> Result<UserGamification> {
        Ok(self
            .store
            .get_gamification(user_id)?
            .unwrap_or_else(|| UserGamification::new(user_id)))
    }

    /// Add points to the user's total and XP, levelling up as far as they reach
    pub fn award_points(&self, user_id: &str, points: u64) -> Result<UserGamification> {
        self.award(user_id, points).map(|(profile, _)| profile)
    }

    fn award(&self, user_id: &str, points: u64) -> Result<(UserGamification, Option<LevelUp>)> {
        let mut profile = self.profile(user_id)?;
        let level_up = profile.add_points(points);
        self.store.save_gamification(&profile)?;

        if let Some(level_up) = &level_up {
            tracing::info!(
                user_id,
                from = level_up.old_level,
                to = level_up.new_level,
                "Level up"
            );
        }
        Ok((profile, level_up))
    }

    /// Overwrite cumulative totals with authoritative values; points and level are untouched
    pub fn update_totals(&self, user_id: &str, update: &TotalsUpdate) -> Result<UserGamification> {
        let mut profile = self.profile(user_id)?;
        profile.apply_totals(update);
        self.store.save_gamification(&profile)?;
        Ok(profile)
    }

    /// Snapshot of the user's streaks and cumulative totals plus today's counts
    pub fn collect_stats(&self, user_id: &str, today: MetricTotals) -> Result<ActivityStats> {
        Ok(ActivityStats {
            streaks: self.store.list_streaks(user_id)?,
            totals: self.profile(user_id)?.totals,
            today,
        })
    }

    // ========================================
    // MAIN CHECK-IN FLOW
    // ========================================

    /// Process a daily sales check-in and return all gamification events that occurred
    pub fn process_check_in(
        &self,
        user_id: &str,
        check_in: &CheckIn,
    ) -> Result<Vec<GamificationEvent>> {
        let mut events = Vec::new();
        let streak_type = self.settings.check_in_streak.as_str();

        // Fold the day's activity into cumulative totals; an out-of-range sum
        // fails here before anything else is written
        let totals = add_day(&self.profile(user_id)?.totals, &check_in.activity)?;
        self.update_totals(user_id, &totals)?;

        // Update streak
        let (streak, change) = self.apply_streak(user_id, streak_type, check_in.date)?;
        if change.is_mutation() {
            events.push(GamificationEvent::StreakUpdated {
                streak_type: streak.streak_type.clone(),
                count: streak.current_count,
                change,
            });
        }

        // Base points for checking in
        let points = self.settings.check_in_points;
        if points > 0 {
            let (_, level_up) = self.award(user_id, points)?;
            events.push(GamificationEvent::PointsAwarded {
                amount: points,
                reason: format!("Check-in {}", check_in.date),
            });
            events.extend(level_up.map(GamificationEvent::LevelUp));
        }

        // Achievements
        let stats = self.collect_stats(user_id, check_in.activity.clone())?;
        for (unlocked, level_up) in self.unlock_qualifying(user_id, &stats)? {
            let amount = u64::from(unlocked.achievement.points);
            let reason = format!("Achievement {}", unlocked.achievement.name);
            events.push(GamificationEvent::AchievementUnlocked(unlocked));
            if amount > 0 {
                events.push(GamificationEvent::PointsAwarded { amount, reason });
            }
            events.extend(level_up.map(GamificationEvent::LevelUp));
        }

        Ok(events)
    }
}

/// Cumulative totals after adding one day's counts
fn add_day(totals: &MetricTotals, day: &MetricTotals) -> Result<TotalsUpdate> {
    let sum = |metric: &str, total: u64, count: u64| {
        total
            .checked_add(count)
            .with_context(|| format!("Cumulative {} total out of range", metric))
    };

    Ok(TotalsUpdate {
        contacts: Some(sum("contacts", totals.contacts, day.contacts)?),
        calls: Some(sum("calls", totals.calls, day.calls)?),
        meetings: Some(sum("meetings", totals.meetings, day.meetings)?),
        deals: Some(sum("deals", totals.deals, day.deals)?),
        revenue: Some(totals.revenue + day.revenue),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::definitions::{
        AchievementCategory, AchievementTier, DAILY_PROSPECTING, Metric, Requirement,
    };
    use crate::gamification::store::SqliteStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn engine() -> GamificationEngine<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        GamificationEngine::new(store, GamificationSettings::default())
    }

    fn achievement(id: &str, requirement: Requirement, points: u32) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: String::new(),
            category: AchievementCategory::Streak,
            requirement,
            points,
            tier: AchievementTier::Silver,
            active: true,
        }
    }

    fn week_streak() -> Achievement {
        achievement(
            "streak_7",
            Requirement::StreakDays {
                streak_type: DAILY_PROSPECTING.to_string(),
                days: 7,
            },
            75,
        )
    }

    #[test]
    fn test_update_streak_persists() {
        let engine = engine();
        engine.update_streak("u1", DAILY_PROSPECTING, day(1)).unwrap();
        let streak = engine.update_streak("u1", DAILY_PROSPECTING, day(2)).unwrap();
        assert_eq!(streak.current_count, 2);

        // Out-of-order report leaves the stored record as it was
        let stale = engine.update_streak("u1", DAILY_PROSPECTING, day(1)).unwrap();
        assert_eq!(stale, streak);
        assert_eq!(
            engine.store().get_streak("u1", DAILY_PROSPECTING).unwrap(),
            Some(streak)
        );
    }

    #[test]
    fn test_reset_streak() {
        let engine = engine();
        assert_eq!(engine.reset_streak("u1", DAILY_PROSPECTING).unwrap(), None);
        assert!(engine.store().get_streak("u1", DAILY_PROSPECTING).unwrap().is_none());

        engine.update_streak("u1", DAILY_PROSPECTING, day(1)).unwrap();
        engine.update_streak("u1", DAILY_PROSPECTING, day(2)).unwrap();
        let streak = engine.reset_streak("u1", DAILY_PROSPECTING).unwrap().unwrap();
        assert_eq!(streak.current_count, 0);
        assert_eq!(streak.longest_count, 2);
    }

    #[test]
    fn test_seventh_day_unlocks_once() {
        let engine = engine();
        engine.store().upsert_achievement(&week_streak()).unwrap();

        for d in 1..=6 {
            engine.update_streak("u1", DAILY_PROSPECTING, day(d)).unwrap();
        }
        let stats = engine.collect_stats("u1", MetricTotals::default()).unwrap();
        assert!(engine.evaluate_unlocks("u1", &stats).unwrap().is_empty());

        let streak = engine.update_streak("u1", DAILY_PROSPECTING, day(7)).unwrap();
        assert_eq!(streak.current_count, 7);

        let stats = engine.collect_stats("u1", MetricTotals::default()).unwrap();
        let unlocked = engine.evaluate_unlocks("u1", &stats).unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].achievement_id, "streak_7");
        assert_eq!(unlocked[0].progress, 100);
        assert_eq!(engine.profile("u1").unwrap().total_points, 75);

        // Second evaluation with the same stats is a no-op
        assert!(engine.evaluate_unlocks("u1", &stats).unwrap().is_empty());
        assert_eq!(engine.profile("u1").unwrap().total_points, 75);
        assert_eq!(engine.store().user_achievements("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_unlocks_accumulate_points() {
        let engine = engine();
        let calls = |count| Requirement::TotalCount { metric: Metric::Calls, count };
        let deals_today = |count| Requirement::SingleDay { metric: Metric::Deals, count };
        for a in [
            achievement("calls_10", calls(10), 60),
            achievement("calls_20", calls(20), 60),
            achievement("deals_day", deals_today(2), 500),
        ] {
            engine.store().upsert_achievement(&a).unwrap();
        }
        engine
            .update_totals("u1", &TotalsUpdate { calls: Some(25), ..Default::default() })
            .unwrap();

        let stats = engine.collect_stats("u1", MetricTotals::default()).unwrap();
        let unlocked = engine.evaluate_unlocks("u1", &stats).unwrap();
        assert_eq!(unlocked.len(), 2);

        let profile = engine.profile("u1").unwrap();
        assert_eq!(profile.total_points, 120);
        assert_eq!(profile.current_level, 2);
        assert_eq!(profile.xp_current, 20);
        assert_eq!(profile.totals.calls, 25);
    }

    #[test]
    fn test_award_points_creates_profile() {
        let engine = engine();
        assert!(engine.store().get_gamification("u1").unwrap().is_none());

        let profile = engine.award_points("u1", 250).unwrap();
        assert_eq!(profile.current_level, 2);
        assert_eq!(profile.xp_current, 150);
        assert_eq!(profile.xp_to_next_level, 200);
        assert_eq!(engine.store().get_gamification("u1").unwrap(), Some(profile));
    }

    #[test]
    fn test_update_totals_keeps_points() {
        let engine = engine();
        engine.award_points("u1", 30).unwrap();
        let profile = engine
            .update_totals(
                "u1",
                &TotalsUpdate {
                    deals: Some(4),
                    revenue: Some(12_000.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.total_points, 30);
        assert_eq!(profile.totals.deals, 4);
        assert_eq!(profile.totals.revenue, 12_000.0);
        assert_eq!(profile.totals.calls, 0);
    }

    #[test]
    fn test_achievement_overview() {
        let engine = engine();
        engine.store().upsert_achievement(&week_streak()).unwrap();
        engine
            .store()
            .upsert_achievement(&achievement(
                "revenue_10k",
                Requirement::TotalRevenue { amount: 10_000.0 },
                100,
            ))
            .unwrap();
        engine
            .update_totals("u1", &TotalsUpdate { revenue: Some(12_500.0), ..Default::default() })
            .unwrap();
        engine.update_streak("u1", DAILY_PROSPECTING, day(1)).unwrap();

        let stats = engine.collect_stats("u1", MetricTotals::default()).unwrap();
        engine.evaluate_unlocks("u1", &stats).unwrap();

        let overview = engine.achievement_overview("u1", &stats).unwrap();
        assert_eq!(overview.len(), 2);
        let revenue = overview.iter().find(|s| s.achievement.id == "revenue_10k").unwrap();
        assert!(revenue.unlocked.is_some());
        assert_eq!(revenue.progress, 100);
        let streak = overview.iter().find(|s| s.achievement.id == "streak_7").unwrap();
        assert!(streak.unlocked.is_none());
        assert_eq!(streak.progress, 14);
    }

    #[test]
    fn test_process_check_in_events() {
        let engine = engine();
        engine
            .store()
            .upsert_achievement(&achievement(
                "first_deal",
                Requirement::TotalCount { metric: Metric::Deals, count: 1 },
                95,
            ))
            .unwrap();

        let check_in = CheckIn {
            date: day(3),
            activity: MetricTotals {
                contacts: 12,
                calls: 30,
                deals: 1,
                revenue: 800.0,
                ..Default::default()
            },
        };
        let events = engine.process_check_in("u1", &check_in).unwrap();

        assert!(matches!(
            &events[0],
            GamificationEvent::StreakUpdated { count: 1, change: StreakChange::Started, .. }
        ));
        assert!(matches!(
            &events[1],
            GamificationEvent::PointsAwarded { amount: 10, .. }
        ));
        assert!(matches!(
            &events[2],
            GamificationEvent::AchievementUnlocked(u) if u.achievement.id == "first_deal"
        ));
        assert!(matches!(
            &events[3],
            GamificationEvent::PointsAwarded { amount: 95, .. }
        ));
        assert!(matches!(
            &events[4],
            GamificationEvent::LevelUp(LevelUp { old_level: 1, new_level: 2, .. })
        ));
        assert_eq!(events.len(), 5);

        let profile = engine.profile("u1").unwrap();
        assert_eq!(profile.total_points, 105);
        assert_eq!(profile.totals.calls, 30);
        assert_eq!(profile.totals.revenue, 800.0);

        // Same-day resubmission: no streak event, totals still accumulate
        let events = engine.process_check_in("u1", &check_in).unwrap();
        let streak_events = events
            .iter()
            .filter(|e| matches!(e, GamificationEvent::StreakUpdated { .. }))
            .count();
        assert_eq!(streak_events, 0);
        assert_eq!(engine.profile("u1").unwrap().totals.calls, 60);
    }

    #[test]
    fn test_check_in_rejects_overflowing_totals() {
        let engine = engine();
        let near_max = i64::MAX as u64;
        engine
            .update_totals("u1", &TotalsUpdate { calls: Some(near_max), ..Default::default() })
            .unwrap();

        let check_in = CheckIn {
            date: day(3),
            activity: MetricTotals {
                calls: u64::MAX - near_max + 1,
                ..Default::default()
            },
        };
        let err = engine.process_check_in("u1", &check_in).unwrap_err();
        assert!(format!("{:#}", err).contains("calls"));

        // Fits in u64 but not in the store's integer column
        let check_in = CheckIn {
            date: day(3),
            activity: MetricTotals { calls: 1, ..Default::default() },
        };
        assert!(engine.process_check_in("u1", &check_in).is_err());

        // Nothing was written
        let profile = engine.profile("u1").unwrap();
        assert_eq!(profile.totals.calls, near_max);
        assert_eq!(profile.total_points, 0);
        assert!(engine.store().list_streaks("u1").unwrap().is_empty());

        // A day that adds nothing to the full counter still goes through
        let check_in = CheckIn {
            date: day(3),
            activity: MetricTotals { contacts: 4, ..Default::default() },
        };
        engine.process_check_in("u1", &check_in).unwrap();
        let totals = engine.profile("u1").unwrap().totals;
        assert_eq!(totals.calls, near_max);
        assert_eq!(totals.contacts, 4);
    }

    #[test]
    fn test_check_in_after_gap_reports_restart() {
        let engine = engine();
        let check_in = |date| CheckIn { date, activity: MetricTotals::default() };

        engine.process_check_in("u1", &check_in(day(1))).unwrap();
        let events = engine.process_check_in("u1", &check_in(day(2))).unwrap();
        assert!(matches!(
            &events[0],
            GamificationEvent::StreakUpdated { count: 2, change: StreakChange::Extended, .. }
        ));

        let events = engine.process_check_in("u1", &check_in(day(5))).unwrap();
        assert!(matches!(
            &events[0],
            GamificationEvent::StreakUpdated { count: 1, change: StreakChange::Restarted, .. }
        ));
    }
}
