//! Mine and Slash overlay data
//!
//! The mod stores its player state in the playerdata NBT under
//! `ForgeCaps` -> `mmorpg:entity_data`:
//!
//! ```text
//! ForgeCaps
//! └── mmorpg:entity_data
//!     ├── level        (int or float)
//!     ├── exp          (int or float)
//!     ├── hp           (int or float)
//!     └── mmorpg_unit  (stat entries, each { i: "<stat id>", v: <value> })
//! ```
//!
//! Every field is optional on its own; a missing branch yields `None`
//! rather than an error.

use crate::nbt::{Compound, Tag};
use serde::Serialize;

const FORGE_CAPS: &str = "ForgeCaps";
const ENTITY_DATA: &str = "mmorpg:entity_data";
const STAT_UNITS: &str = "mmorpg_unit";
const ENERGY_ID: &str = "energy";

/// Keys a stat entry may use for its id; the mod writes `i`
const STAT_ID_KEYS: [&str; 2] = ["i", "id"];
const STAT_VALUE_KEY: &str = "v";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModMetrics {
    pub level: Option<i64>,
    pub xp: Option<i64>,
    pub hp: Option<i64>,
    pub energy: Option<i64>,
}

impl ModMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read level/xp/hp/energy from a playerdata root compound
pub fn extract_mod_metrics(root: &Compound) -> ModMetrics {
    let Some(data) = root
        .get(FORGE_CAPS)
        .and_then(Tag::as_compound)
        .and_then(|caps| caps.get(ENTITY_DATA))
        .and_then(Tag::as_compound)
    else {
        return ModMetrics::default();
    };

    let int_field = |key: &str| data.get(key).and_then(Tag::as_i64);

    ModMetrics {
        level: int_field("level"),
        xp: int_field("exp"),
        hp: int_field("hp"),
        energy: find_energy(data),
    }
}

/// First stat entry whose id is "energy", in stored order.
///
/// The unit collection is a compound in current mod versions and a list in
/// some older ones; both are scanned the same way. Later duplicates are
/// ignored.
fn find_energy(data: &Compound) -> Option<i64> {
    let entries: Box<dyn Iterator<Item = &Tag> + '_> = match data.get(STAT_UNITS)? {
        Tag::Compound(units) => Box::new(units.values()),
        Tag::List(units) => Box::new(units.iter()),
        _ => return None,
    };

    entries
        .filter_map(Tag::as_compound)
        .find(|stat| is_energy_entry(stat))
        .and_then(|stat| stat.get(STAT_VALUE_KEY))
        .and_then(Tag::as_i64)
}

fn is_energy_entry(stat: &Compound) -> bool {
    STAT_ID_KEYS
        .iter()
        .find_map(|key| stat.get(key))
        .and_then(Tag::as_str)
        == Some(ENERGY_ID)
}
