//! Vanilla experience curve
//!
//! Total XP needed to reach level `l`:
//! - `l <= 16`:  `l^2 + 6l`
//! - `l <= 31`:  `2.5l^2 - 40.5l + 360`
//! - otherwise:  `4.5l^2 - 162.5l + 2220`
//!
//! Not shown on the dashboard (the mod level is), kept for comparisons
//! against the vanilla level stored in playerdata.

/// Upper bound on the level search; far beyond anything reachable in game
const MAX_LEVEL: i64 = 1 << 21;

/// Cumulative XP required to reach `level`, truncated like the game does
pub fn xp_required_for_level(level: i64) -> i64 {
    let l = level as f64;
    if level <= 16 {
        level * level + 6 * level
    } else if level <= 31 {
        (2.5 * l * l - 40.5 * l + 360.0) as i64
    } else {
        (4.5 * l * l - 162.5 * l + 2220.0) as i64
    }
}

/// Highest level whose cumulative requirement is `<= xp_total` (0 if none)
pub fn compute_vanilla_level_from_xp(xp_total: i64) -> i64 {
    let mut level = 0;
    while level < MAX_LEVEL {
        if xp_required_for_level(level) > xp_total {
            return (level - 1).max(0);
        }
        level += 1;
    }
    MAX_LEVEL
}
