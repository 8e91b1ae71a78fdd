//! Leaderboard ordering and the online roster

use crate::player::PlayerSummaryRecord;
use crate::status::OnlinePlayers;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Kills,
    Level,
}

impl SortKey {
    /// Lenient parse used for query-style input; unknown values mean kills
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Kills => "kills",
            SortKey::Level => "level",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kills" => Ok(SortKey::Kills),
            "level" => Ok(SortKey::Level),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Sort descending by the chosen key. Stable, so ties keep listing order.
/// Players without a level go after everyone with one.
pub fn sort_leaderboard(records: &mut [PlayerSummaryRecord], key: SortKey) {
    match key {
        SortKey::Kills => records.sort_by(|a, b| b.mob_kills.cmp(&a.mob_kills)),
        // Option orders None below Some, so descending puts None last
        SortKey::Level => records.sort_by(|a, b| b.level.cmp(&a.level)),
    }
}

/// A roster row: the summary plus whether the player is currently online
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerPresence {
    #[serde(flatten)]
    pub summary: PlayerSummaryRecord,
    pub online: bool,
}

/// All players sorted by name (case-insensitive), flagged online when their
/// name appears in the status sample.
pub fn roster(records: &[PlayerSummaryRecord], online: &OnlinePlayers) -> Vec<PlayerPresence> {
    let online_names: HashSet<String> = online.names.iter().map(|n| n.to_lowercase()).collect();

    let mut rows: Vec<PlayerPresence> = records
        .iter()
        .map(|summary| PlayerPresence {
            online: online_names.contains(&summary.name().to_lowercase()),
            summary: summary.clone(),
        })
        .collect();
    rows.sort_by_cached_key(|row| row.summary.name().to_lowercase());
    rows
}
