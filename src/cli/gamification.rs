//! Gamification command implementations

use anyhow::Result;
use chrono::{Local, NaiveDate};

use valtrix::Config;
use valtrix::gamification::{
    CheckIn, GamificationEngine, GamificationEvent, MetricTotals, SqliteStore, StreakChange,
    UserGamification,
};

fn open_engine(config: &Config) -> Result<GamificationEngine<SqliteStore>> {
    let store = SqliteStore::open(&config.database.path)?;
    Ok(GamificationEngine::new(store, config.gamification.clone()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_profile(profile: &UserGamification) {
    println!(
        "  Level {} {} - {} points ({}/{} XP, {:.0}%)",
        profile.current_level,
        profile.title(),
        profile.total_points,
        profile.xp_current,
        profile.xp_to_next_level,
        profile.level_progress() * 100.0
    );
}

pub fn seed_command(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.database.path)?;
    let seeded = store.seed_default_catalog()?;
    println!("Seeded {} achievements.", seeded);
    Ok(())
}

pub fn streak_command(
    config: &Config,
    user: &str,
    streak_type: Option<String>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let engine = open_engine(config)?;
    let streak_type = streak_type.unwrap_or_else(|| config.gamification.check_in_streak.clone());
    let streak = engine.update_streak(user, &streak_type, date.unwrap_or_else(today))?;

    println!(
        "{} streak for {}: {} day(s), longest {}",
        streak.streak_type, streak.user_id, streak.current_count, streak.longest_count
    );
    Ok(())
}

pub fn reset_streak_command(
    config: &Config,
    user: &str,
    streak_type: Option<String>,
) -> Result<()> {
    let engine = open_engine(config)?;
    let streak_type = streak_type.unwrap_or_else(|| config.gamification.check_in_streak.clone());

    match engine.reset_streak(user, &streak_type)? {
        Some(streak) => println!(
            "Reset {} streak for {} (longest kept: {})",
            streak.streak_type, streak.user_id, streak.longest_count
        ),
        None => println!("No {} streak for {}.", streak_type, user),
    }
    Ok(())
}

pub fn award_command(config: &Config, user: &str, points: u64) -> Result<()> {
    let engine = open_engine(config)?;
    let before = engine.profile(user)?.current_level;
    let profile = engine.award_points(user, points)?;

    println!("Awarded {} points to {}", points, user);
    if profile.current_level > before {
        println!("  Level up! {} -> {}", before, profile.current_level);
    }
    print_profile(&profile);
    Ok(())
}

pub fn check_in_command(
    config: &Config,
    user: &str,
    date: Option<NaiveDate>,
    activity: MetricTotals,
) -> Result<()> {
    let engine = open_engine(config)?;
    let check_in = CheckIn {
        date: date.unwrap_or_else(today),
        activity,
    };
    let events = engine.process_check_in(user, &check_in)?;

    println!("Check-in for {} on {}:", user, check_in.date);
    if events.is_empty() {
        println!("  Nothing new.");
    }
    for event in &events {
        match event {
            GamificationEvent::StreakUpdated {
                streak_type,
                count,
                change,
            } => {
                let note = match change {
                    StreakChange::Restarted => " (restarted)",
                    _ => "",
                };
                println!("  {} streak: {} day(s){}", streak_type, count, note)
            }
            GamificationEvent::PointsAwarded { amount, reason } => {
                println!("  +{} points ({})", amount, reason)
            }
            GamificationEvent::AchievementUnlocked(unlocked) => println!(
                "  Unlocked {} {} [{}]",
                unlocked.achievement.icon,
                unlocked.achievement.name,
                unlocked.achievement.tier.as_str()
            ),
            GamificationEvent::LevelUp(level_up) => println!(
                "  Level up! {} -> {} ({})",
                level_up.old_level, level_up.new_level, level_up.new_title
            ),
        }
    }

    print_profile(&engine.profile(user)?);
    Ok(())
}

pub fn achievements_command(config: &Config, user: &str, unlocked_only: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let stats = engine.collect_stats(user, MetricTotals::default())?;
    let overview: Vec<_> = engine
        .achievement_overview(user, &stats)?
        .into_iter()
        .filter(|status| !unlocked_only || status.unlocked.is_some())
        .collect();

    if overview.is_empty() {
        println!("No achievements found. Run `valtrix seed` to install the catalog.");
        return Ok(());
    }

    println!("Achievements ({}):\n", overview.len());

    for status in overview {
        let a = &status.achievement;
        let marker = if status.unlocked.is_some() { "x" } else { " " };
        println!(
            "  [{}] {} {} ({}, {} pts) {:>3}%",
            marker,
            a.icon,
            a.name,
            a.category.label(),
            a.points,
            status.progress
        );
        println!("      {}", a.description);
        if let Some(record) = &status.unlocked {
            println!("      Unlocked {}", record.unlocked_at.format("%Y-%m-%d %H:%M"));
        }
    }

    Ok(())
}

pub fn profile_command(config: &Config, user: &str) -> Result<()> {
    let engine = open_engine(config)?;
    let profile = engine.profile(user)?;
    let stats = engine.collect_stats(user, MetricTotals::default())?;

    println!("Profile: {}", user);
    print_profile(&profile);

    let t = &profile.totals;
    println!(
        "  Totals: {} contacts, {} calls, {} meetings, {} deals, {:.2} revenue",
        t.contacts, t.calls, t.meetings, t.deals, t.revenue
    );

    if stats.streaks.is_empty() {
        println!("  No streaks yet.");
    }
    for streak in &stats.streaks {
        let last = streak
            .last_activity_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = if streak.is_active(today()) { "" } else { " - lapsed" };
        println!(
            "  Streak {}: {} (longest {}, last {}){}",
            streak.streak_type, streak.current_count, streak.longest_count, last, state
        );
    }

    Ok(())
}
