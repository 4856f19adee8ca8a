//! Init command implementation

use anyhow::{Context, Result, bail};
use std::path::Path;

use valtrix::Config;
use valtrix::gamification::SqliteStore;

/// Default configuration content for valtrix init
pub const DEFAULT_CONFIG: &str = r#"# Valtrix Configuration
# =====================
#
# Omitted keys use their defaults.

# ============================================================================
# DATABASE - Streaks, achievements, points and levels
# ============================================================================
#
#   path - SQLite file (default: ~/.valtrix/gamification.db)

[database]

# ============================================================================
# QUEUE - Operations made offline, replayed when connectivity returns
# ============================================================================
#
#   storage_dir          - Local storage directory (default: ~/.valtrix/storage)
#   storage_key          - Key the queue is stored under
#   max_retries          - Failed sync attempts before an operation is dropped
#   dead_letter_capacity - Dropped operations kept for inspection

[queue]
storage_key = "valtrix_offline_queue"
max_retries = 3
dead_letter_capacity = 50

# ============================================================================
# GAMIFICATION - Daily check-in rewards
# ============================================================================

[gamification]
check_in_points = 10
check_in_streak = "daily_prospecting"
"#;

/// Write the config file and seed the achievement catalog
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created: {}", config_path.display());

    let config = Config::from_file(config_path)?;
    let store = SqliteStore::open(&config.database.path)?;
    let seeded = store.seed_default_catalog()?;
    println!(
        "Database: {} ({} achievements seeded)",
        config.database.path.display(),
        seeded
    );

    Ok(())
}
