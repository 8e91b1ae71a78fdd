//! Player records composed from save data
//!
//! - `aggregator` - loads and joins usercache, statistics and playerdata
//! - `views` - leaderboard sorting and the online roster

pub mod aggregator;
pub mod views;

pub use aggregator::PlayerAggregator;
pub use views::{roster, sort_leaderboard, PlayerPresence, SortKey};

use crate::metrics::{ModMetrics, VanillaMetrics};
use serde::Serialize;
use std::collections::HashMap;

/// Length of the identifier prefix shown when no name is known
const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerIdentity {
    pub uuid: String,
    pub name: String,
}

impl PlayerIdentity {
    /// Resolve the display name from the usercache map, falling back to the
    /// first characters of the identifier.
    pub fn resolve(uuid: &str, names: &HashMap<String, String>) -> Self {
        let name = names
            .get(uuid)
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| uuid.chars().take(SHORT_ID_LEN).collect());
        Self {
            uuid: uuid.to_string(),
            name,
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummaryRecord {
    #[serde(flatten)]
    pub identity: PlayerIdentity,
    pub mob_kills: i64,
    pub deaths: i64,
    pub level: Option<i64>,
    pub xp: Option<i64>,
    pub hp: Option<i64>,
    pub energy: Option<i64>,
}

impl PlayerSummaryRecord {
    pub fn new(identity: PlayerIdentity, vanilla: &VanillaMetrics, modded: &ModMetrics) -> Self {
        Self {
            identity,
            mob_kills: vanilla.mob_kills,
            deaths: vanilla.deaths,
            level: modded.level,
            xp: modded.xp,
            hp: modded.hp,
            energy: modded.energy,
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

/// Everything known about one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDetailRecord {
    #[serde(flatten)]
    pub identity: PlayerIdentity,
    pub vanilla: VanillaMetrics,
    #[serde(rename = "mod")]
    pub mod_metrics: ModMetrics,
}
