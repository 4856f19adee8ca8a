//! Gamification persistence
//!
//! `GamificationStore` is the seam to the relational store. `SqliteStore` is the
//! bundled implementation, with automatic schema migration.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use super::definitions::{
    Achievement, AchievementCategory, AchievementTier, Requirement, StoreDecodeError,
    default_catalog,
};
use super::models::{MetricTotals, UserAchievement, UserGamification};
use super::streaks::Streak;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read/write access to per-user gamification records.
///
/// Writes are read-modify-write from the engine's side; concurrent writers for
/// the same user are last-write-wins.
pub trait GamificationStore: Send + Sync {
    fn get_streak(&self, user_id: &str, streak_type: &str) -> Result<Option<Streak>>;

    fn list_streaks(&self, user_id: &str) -> Result<Vec<Streak>>;

    fn save_streak(&self, streak: &Streak) -> Result<()>;

    /// Active catalog entries; rows that cannot be decoded are skipped
    fn active_achievements(&self) -> Result<Vec<Achievement>>;

    fn upsert_achievement(&self, achievement: &Achievement) -> Result<()>;

    fn user_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>>;

    fn unlocked_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .user_achievements(user_id)?
            .into_iter()
            .map(|ua| ua.achievement_id)
            .collect())
    }

    fn get_gamification(&self, user_id: &str) -> Result<Option<UserGamification>>;

    fn save_gamification(&self, record: &UserGamification) -> Result<()>;

    /// Store `unlock` and `profile` as one unit.
    ///
    /// Returns `false` and writes nothing if the user already holds the
    /// achievement.
    fn record_unlock(&self, unlock: &UserAchievement, profile: &UserGamification) -> Result<bool>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create gamification dir: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open gamification db: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory db")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("Gamification DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: catalogs created before tiers existed
        if version < 2 {
            let has_tier: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('achievements') WHERE name = 'tier'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_tier {
                conn.execute_batch(
                    "ALTER TABLE achievements ADD COLUMN tier TEXT NOT NULL DEFAULT 'bronze';",
                )?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }

    /// Seed catalog entries that are not present yet, leaving edited rows alone
    pub fn seed_catalog(&self, catalog: &[Achievement]) -> Result<usize> {
        let conn = self.conn();
        let mut inserted = 0;
        for achievement in catalog {
            inserted += conn.execute(
                r#"INSERT OR IGNORE INTO achievements
                   (id, name, description, icon, category, requirement_type,
                    requirement_value, requirement_metric, points, tier, is_active)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
                achievement_params(achievement),
            )?;
        }
        Ok(inserted)
    }

    /// Seed the built-in sales catalog
    pub fn seed_default_catalog(&self) -> Result<usize> {
        self.seed_catalog(&default_catalog())
    }
}

type AchievementParams<'a> = (
    &'a str,
    &'a str,
    &'a str,
    &'a str,
    &'static str,
    &'static str,
    f64,
    Option<&'a str>,
    u32,
    &'static str,
    bool,
);

fn achievement_params(a: &Achievement) -> AchievementParams<'_> {
    (
        a.id.as_str(),
        a.name.as_str(),
        a.description.as_str(),
        a.icon.as_str(),
        a.category.as_str(),
        a.requirement.kind(),
        a.requirement.threshold(),
        a.requirement.metric_name(),
        a.points,
        a.tier.as_str(),
        a.active,
    )
}

/// Raw achievement columns, decoded outside the rusqlite row callback
struct AchievementRow {
    id: String,
    name: String,
    description: String,
    icon: String,
    category: String,
    requirement_type: String,
    requirement_value: f64,
    requirement_metric: Option<String>,
    points: u32,
    tier: String,
    active: bool,
}

impl AchievementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            icon: row.get(3)?,
            category: row.get(4)?,
            requirement_type: row.get(5)?,
            requirement_value: row.get(6)?,
            requirement_metric: row.get(7)?,
            points: row.get(8)?,
            tier: row.get(9)?,
            active: row.get(10)?,
        })
    }

    fn decode(self) -> Result<Achievement, StoreDecodeError> {
        Ok(Achievement {
            category: AchievementCategory::parse(&self.category)?,
            requirement: Requirement::from_parts(
                &self.requirement_type,
                self.requirement_value,
                self.requirement_metric.as_deref(),
            )?,
            tier: AchievementTier::parse(&self.tier)?,
            id: self.id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            points: self.points,
            active: self.active,
        })
    }
}

fn streak_from_row(row: &Row<'_>) -> rusqlite::Result<(Streak, Option<String>)> {
    Ok((
        Streak {
            user_id: row.get(0)?,
            streak_type: row.get(1)?,
            current_count: row.get(2)?,
            longest_count: row.get(3)?,
            last_activity_date: None,
        },
        row.get(4)?,
    ))
}

fn with_date((mut streak, date): (Streak, Option<String>)) -> Streak {
    streak.last_activity_date = date.and_then(|d| match NaiveDate::parse_from_str(&d, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(
                "Ignoring unparseable last_activity_date '{}' for streak {}: {}",
                d,
                streak.streak_type,
                e
            );
            None
        }
    });
    streak
}

fn gamification_from_row(row: &Row<'_>) -> rusqlite::Result<UserGamification> {
    Ok(UserGamification {
        user_id: row.get(0)?,
        total_points: row.get(1)?,
        current_level: row.get(2)?,
        xp_current: row.get(3)?,
        xp_to_next_level: row.get(4)?,
        totals: MetricTotals {
            contacts: row.get(5)?,
            calls: row.get(6)?,
            meetings: row.get(7)?,
            deals: row.get(8)?,
            revenue: row.get(9)?,
        },
    })
}

fn write_gamification(conn: &Connection, record: &UserGamification) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO user_gamification
            (user_id, total_points, current_level, xp_current, xp_to_next_level,
             total_contacts, total_calls, total_meetings, total_deals, total_revenue, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(user_id) DO UPDATE SET
            total_points = ?2, current_level = ?3, xp_current = ?4, xp_to_next_level = ?5,
            total_contacts = ?6, total_calls = ?7, total_meetings = ?8, total_deals = ?9,
            total_revenue = ?10, updated_at = ?11
        "#,
        rusqlite::params![
            record.user_id,
            record.total_points,
            record.current_level,
            record.xp_current,
            record.xp_to_next_level,
            record.totals.contacts,
            record.totals.calls,
            record.totals.meetings,
            record.totals.deals,
            record.totals.revenue,
            Utc::now().timestamp_millis(),
        ],
    )
}

impl GamificationStore for SqliteStore {
    fn get_streak(&self, user_id: &str, streak_type: &str) -> Result<Option<Streak>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                r#"SELECT user_id, streak_type, current_count, longest_count, last_activity_date
                   FROM streaks WHERE user_id = ?1 AND streak_type = ?2"#,
                (user_id, streak_type),
                streak_from_row,
            )
            .optional()?;
        Ok(row.map(with_date))
    }

    fn list_streaks(&self, user_id: &str) -> Result<Vec<Streak>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT user_id, streak_type, current_count, longest_count, last_activity_date
               FROM streaks WHERE user_id = ?1 ORDER BY streak_type"#,
        )?;
        let rows = stmt
            .query_map([user_id], streak_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(with_date).collect())
    }

    fn save_streak(&self, streak: &Streak) -> Result<()> {
        let date = streak
            .last_activity_date
            .map(|d| d.format(DATE_FORMAT).to_string());
        self.conn().execute(
            r#"
            INSERT INTO streaks (user_id, streak_type, current_count, longest_count, last_activity_date, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, streak_type) DO UPDATE SET
                current_count = ?3, longest_count = ?4, last_activity_date = ?5, updated_at = ?6
            "#,
            rusqlite::params![
                streak.user_id,
                streak.streak_type,
                streak.current_count,
                streak.longest_count,
                date,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn active_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, name, description, icon, category, requirement_type,
                      requirement_value, requirement_metric, points, tier, is_active
               FROM achievements WHERE is_active = 1 ORDER BY id"#,
        )?;
        let rows = stmt
            .query_map([], AchievementRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match row.decode() {
                    Ok(achievement) => Some(achievement),
                    Err(e) => {
                        tracing::warn!("Skipping achievement '{}': {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    fn upsert_achievement(&self, achievement: &Achievement) -> Result<()> {
        self.conn().execute(
            r#"INSERT OR REPLACE INTO achievements
               (id, name, description, icon, category, requirement_type,
                requirement_value, requirement_metric, points, tier, is_active)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            achievement_params(achievement),
        )?;
        Ok(())
    }

    fn user_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT user_id, achievement_id, unlocked_at, progress
               FROM user_achievements WHERE user_id = ?1 ORDER BY unlocked_at"#,
        )?;
        let rows = stmt
            .query_map([user_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, u8>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(user_id, achievement_id, unlocked_at, progress)| {
                let unlocked_at = DateTime::parse_from_rfc3339(&unlocked_at)
                    .with_context(|| format!("Bad unlocked_at for {}", achievement_id))?
                    .with_timezone(&Utc);
                Ok(UserAchievement {
                    user_id,
                    achievement_id,
                    unlocked_at,
                    progress,
                })
            })
            .collect()
    }

    fn get_gamification(&self, user_id: &str) -> Result<Option<UserGamification>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                r#"SELECT user_id, total_points, current_level, xp_current, xp_to_next_level,
                          total_contacts, total_calls, total_meetings, total_deals, total_revenue
                   FROM user_gamification WHERE user_id = ?1"#,
                [user_id],
                gamification_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn save_gamification(&self, record: &UserGamification) -> Result<()> {
        write_gamification(&self.conn(), record)?;
        Ok(())
    }

    fn record_unlock(&self, unlock: &UserAchievement, profile: &UserGamification) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            r#"INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, unlocked_at, progress)
               VALUES (?1, ?2, ?3, ?4)"#,
            (
                &unlock.user_id,
                &unlock.achievement_id,
                unlock.unlocked_at.to_rfc3339(),
                unlock.progress,
            ),
        )?;

        if inserted == 0 {
            // Already unlocked; nothing to award
            return Ok(false);
        }

        write_gamification(&tx, profile)?;
        tx.commit()?;
        Ok(true)
    }
}

/// SQL schema for the gamification database
const SCHEMA_SQL: &str = r#"
-- Achievement catalog (managed externally, read-only to the engine)
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    requirement_type TEXT NOT NULL,
    requirement_value REAL NOT NULL,
    requirement_metric TEXT,
    points INTEGER NOT NULL DEFAULT 0,
    tier TEXT NOT NULL DEFAULT 'bronze',
    is_active INTEGER NOT NULL DEFAULT 1
);

-- Unlocked achievements, one row per (user, achievement)
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL REFERENCES achievements(id),
    unlocked_at TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 100,
    PRIMARY KEY (user_id, achievement_id)
);

-- Streak tracking
CREATE TABLE IF NOT EXISTS streaks (
    user_id TEXT NOT NULL,
    streak_type TEXT NOT NULL,
    current_count INTEGER NOT NULL DEFAULT 0,
    longest_count INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    updated_at INTEGER,
    PRIMARY KEY (user_id, streak_type)
);

-- Points, level and cumulative totals
CREATE TABLE IF NOT EXISTS user_gamification (
    user_id TEXT PRIMARY KEY,
    total_points INTEGER NOT NULL DEFAULT 0,
    current_level INTEGER NOT NULL DEFAULT 1,
    xp_current INTEGER NOT NULL DEFAULT 0,
    xp_to_next_level INTEGER NOT NULL DEFAULT 100,
    total_contacts INTEGER NOT NULL DEFAULT 0,
    total_calls INTEGER NOT NULL DEFAULT 0,
    total_meetings INTEGER NOT NULL DEFAULT 0,
    total_deals INTEGER NOT NULL DEFAULT 0,
    total_revenue REAL NOT NULL DEFAULT 0.0,
    updated_at INTEGER
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;
