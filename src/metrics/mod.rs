//! Metric extraction
//!
//! Pure functions from parsed save data to normalized records:
//! - `vanilla` - statistics JSON (`minecraft:custom`, `killed`, `picked_up`)
//! - `modded` - Mine and Slash overlay data inside the playerdata NBT
//! - `leveling` - vanilla XP curve

pub mod leveling;
pub mod modded;
pub mod vanilla;

pub use leveling::compute_vanilla_level_from_xp;
pub use modded::{extract_mod_metrics, ModMetrics};
pub use vanilla::{display_name, extract_vanilla_metrics, MobKillCount, VanillaMetrics};
