//! XP and Level system
//!
//! Defines level thresholds, titles, and the XP needed between levels.

/// Level definition
#[derive(Debug, Clone)]
pub struct Level {
    pub level: u32,
    /// Cumulative XP at which this level is reached
    pub xp_required: u64,
    pub title: &'static str,
}

/// All level definitions (must be sorted by level, starting at 1)
pub static LEVELS: &[Level] = &[
    Level {
        level: 1,
        xp_required: 0,
        title: "Rookie",
    },
    Level {
        level: 2,
        xp_required: 100,
        title: "Prospector",
    },
    Level {
        level: 3,
        xp_required: 300,
        title: "Prospector",
    },
    Level {
        level: 4,
        xp_required: 600,
        title: "Hunter",
    },
    Level {
        level: 5,
        xp_required: 1000,
        title: "Hunter",
    },
    Level {
        level: 6,
        xp_required: 1500,
        title: "Closer",
    },
    Level {
        level: 7,
        xp_required: 2100,
        title: "Closer",
    },
    Level {
        level: 8,
        xp_required: 2800,
        title: "Rainmaker",
    },
    Level {
        level: 9,
        xp_required: 3600,
        title: "Rainmaker",
    },
    Level {
        level: 10,
        xp_required: 4500,
        title: "Sales Legend",
    },
];

/// Growth factor applied to the XP requirement past the last defined level,
/// expressed as numerator/denominator (1.5x)
const EXTRAPOLATION_NUM: u64 = 3;
const EXTRAPOLATION_DEN: u64 = 2;

/// XP needed to go from level 1 to level 2
pub const DEFAULT_XP_TO_NEXT_LEVEL: u64 = 100;

impl Level {
    /// Look up a defined level
    pub fn get(level: u32) -> Option<&'static Level> {
        LEVELS.iter().find(|l| l.level == level)
    }

    /// Title for any level; levels past the table keep the last title
    pub fn title_for(level: u32) -> &'static str {
        LEVELS
            .iter()
            .rev()
            .find(|l| level >= l.level)
            .or(LEVELS.first())
            .map(|l| l.title)
            .unwrap_or("")
    }

    /// XP needed to advance from `level` to `level + 1`.
    ///
    /// Within the table this is the delta between the two breakpoints. Past the
    /// table it is extrapolated: 1.5x the requirement of the level before
    /// (`previous`), which callers carry along since it is not tabulated.
    pub fn xp_to_next(level: u32, previous: u64) -> u64 {
        match (Self::get(level), Self::get(level + 1)) {
            (Some(current), Some(next)) => next.xp_required - current.xp_required,
            _ => {
                let previous = if previous == 0 {
                    Self::last_tabulated_delta()
                } else {
                    previous
                };
                (previous * EXTRAPOLATION_NUM / EXTRAPOLATION_DEN).max(1)
            }
        }
    }

    fn last_tabulated_delta() -> u64 {
        match LEVELS {
            [.., before, last] => last.xp_required - before.xp_required,
            _ => DEFAULT_XP_TO_NEXT_LEVEL,
        }
    }
}
