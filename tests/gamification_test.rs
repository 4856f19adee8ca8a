//! Integration tests for the gamification engine on a real SQLite file

use chrono::NaiveDate;
use tempfile::TempDir;

use valtrix::config::GamificationSettings;
use valtrix::gamification::{
    CheckIn, DAILY_PROSPECTING, GamificationEngine, GamificationEvent, GamificationStore,
    MetricTotals, SqliteStore, StreakChange,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn seeded_engine(dir: &TempDir) -> GamificationEngine<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("gamification.db"))
        .expect("Failed to open gamification db");
    store.seed_default_catalog().expect("Failed to seed catalog");
    GamificationEngine::new(store, GamificationSettings::default())
}

#[test]
fn test_seventh_day_unlocks_week_streak_once() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir);

    for d in 1..=6 {
        engine.update_streak("rep-1", DAILY_PROSPECTING, day(d)).unwrap();
    }
    let stats = engine.collect_stats("rep-1", MetricTotals::default()).unwrap();
    let unlocked: Vec<_> = engine
        .evaluate_unlocks("rep-1", &stats)
        .unwrap()
        .into_iter()
        .map(|ua| ua.achievement_id)
        .collect();
    assert_eq!(unlocked, vec!["streak_3"]);

    let streak = engine.update_streak("rep-1", DAILY_PROSPECTING, day(7)).unwrap();
    assert_eq!(streak.current_count, 7);

    let stats = engine.collect_stats("rep-1", MetricTotals::default()).unwrap();
    let unlocked = engine.evaluate_unlocks("rep-1", &stats).unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].achievement_id, "streak_7");
    assert_eq!(unlocked[0].progress, 100);

    // Unchanged stats: nothing new, no extra points
    assert!(engine.evaluate_unlocks("rep-1", &stats).unwrap().is_empty());

    let profile = engine.profile("rep-1").unwrap();
    assert_eq!(profile.total_points, 30 + 75);
    assert_eq!(profile.current_level, 2);
    assert_eq!(profile.xp_current, 5);
    assert_eq!(profile.xp_to_next_level, 200);
    assert_eq!(engine.store().user_achievements("rep-1").unwrap().len(), 2);
}

#[test]
fn test_streak_rules_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let engine = seeded_engine(&dir);
        engine.update_streak("rep-1", DAILY_PROSPECTING, day(10)).unwrap();
        engine.update_streak("rep-1", DAILY_PROSPECTING, day(11)).unwrap();
    }

    let engine = seeded_engine(&dir);

    // Same day and earlier day are no-ops
    let streak = engine.update_streak("rep-1", DAILY_PROSPECTING, day(11)).unwrap();
    assert_eq!(streak.current_count, 2);
    let streak = engine.update_streak("rep-1", DAILY_PROSPECTING, day(9)).unwrap();
    assert_eq!(streak.current_count, 2);
    assert_eq!(streak.last_activity_date, Some(day(11)));

    // Gap restarts the run, longest is kept
    let streak = engine.update_streak("rep-1", DAILY_PROSPECTING, day(14)).unwrap();
    assert_eq!(streak.current_count, 1);
    assert_eq!(streak.longest_count, 2);

    let reset = engine.reset_streak("rep-1", DAILY_PROSPECTING).unwrap().unwrap();
    assert_eq!(reset.current_count, 0);
    assert_eq!(reset.longest_count, 2);
    assert!(engine.reset_streak("rep-2", DAILY_PROSPECTING).unwrap().is_none());
}

#[test]
fn test_award_stops_at_reachable_level() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir);

    let profile = engine.award_points("rep-1", 250).unwrap();
    assert_eq!(profile.current_level, 2);
    assert_eq!(profile.xp_current, 150);
    assert_eq!(profile.xp_to_next_level, 200);

    let profile = engine.award_points("rep-1", 5_000).unwrap();
    assert!(profile.xp_current < profile.xp_to_next_level);
    assert_eq!(profile.total_points, 5_250);
    assert_eq!(engine.profile("rep-1").unwrap(), profile);
}

#[test]
fn test_check_in_flow() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir);

    let check_in = CheckIn {
        date: day(3),
        activity: MetricTotals {
            calls: 12,
            deals: 1,
            revenue: 2_500.0,
            ..MetricTotals::default()
        },
    };
    let events = engine.process_check_in("rep-1", &check_in).unwrap();

    assert_eq!(
        events[0],
        GamificationEvent::StreakUpdated {
            streak_type: DAILY_PROSPECTING.to_string(),
            count: 1,
            change: StreakChange::Started,
        }
    );
    assert!(matches!(
        &events[1],
        GamificationEvent::PointsAwarded { amount: 10, .. }
    ));
    let unlocked: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GamificationEvent::AchievementUnlocked(u) => Some(u.achievement.id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unlocked, vec!["first_deal"]);

    let profile = engine.profile("rep-1").unwrap();
    assert_eq!(profile.total_points, 10 + 25);
    assert_eq!(profile.totals.calls, 12);
    assert_eq!(profile.totals.deals, 1);
    assert_eq!(profile.totals.revenue, 2_500.0);
}

#[test]
fn test_overview_progress_matches_unlocks() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir);

    let today = MetricTotals {
        calls: 50,
        ..MetricTotals::default()
    };
    engine
        .process_check_in(
            "rep-1",
            &CheckIn {
                date: day(1),
                activity: today.clone(),
            },
        )
        .unwrap();

    let stats = engine.collect_stats("rep-1", today).unwrap();
    for status in engine.achievement_overview("rep-1", &stats).unwrap() {
        if status.unlocked.is_some() {
            assert_eq!(status.progress, 100, "{}", status.achievement.id);
        } else {
            assert!(status.progress < 100, "{}", status.achievement.id);
        }
    }

    let overview = engine.achievement_overview("rep-1", &stats).unwrap();
    let calls_day = overview
        .iter()
        .find(|s| s.achievement.id == "calls_day_50")
        .unwrap();
    assert!(calls_day.unlocked.is_some());
    let calls_500 = overview
        .iter()
        .find(|s| s.achievement.id == "calls_500")
        .unwrap();
    assert_eq!(calls_500.progress, 10);
}
