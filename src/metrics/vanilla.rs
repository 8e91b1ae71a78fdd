//! Vanilla statistics extraction
//!
//! Input is the per-player statistics object:
//!
//! ```json
//! {
//!   "minecraft:custom":    { "minecraft:mob_kills": 5, "minecraft:play_time": 36000, ... },
//!   "minecraft:killed":    { "minecraft:zombie": 12, ... },
//!   "minecraft:picked_up": { "lightmanscurrency:coin_gold": 3, ... }
//! }
//! ```
//!
//! Missing sections or counters read as zero; extraction never fails.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Game ticks per real second
pub const TICKS_PER_SECOND: i64 = 20;

/// How many creature types the kill list keeps
pub const TOP_MOBS_LIMIT: usize = 10;

/// Item ids of the currency mod's coins all start with this
pub const COIN_PREFIX: &str = "lightmanscurrency:coin";

const CUSTOM: &str = "minecraft:custom";
const KILLED: &str = "minecraft:killed";
const PICKED_UP: &str = "minecraft:picked_up";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobKillCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VanillaMetrics {
    pub mob_kills: i64,
    pub deaths: i64,
    pub play_time_ticks: i64,
    /// `HH:MM:SS`, hours not capped at 24
    pub play_time_hms: String,
    pub walk_km: f64,
    pub fly_km: f64,
    pub jumps: i64,
    /// Most-killed creature types, highest first
    pub top_mobs: Vec<MobKillCount>,
    /// Coin display name -> total picked up
    pub coins: BTreeMap<String, i64>,
}

/// Build vanilla metrics from a statistics object
pub fn extract_vanilla_metrics(stats: &Map<String, Value>) -> VanillaMetrics {
    let custom = section(stats, CUSTOM);
    let counter = |key: &str| custom.and_then(|c| c.get(key)).map_or(0, json_int);

    let mob_kills = counter("minecraft:mob_kills");
    let deaths = counter("minecraft:deaths");
    let play_time_ticks = counter("minecraft:play_time");
    let walk_cm = counter("minecraft:walk_one_cm");
    let fly_cm = counter("minecraft:fly_one_cm");
    let jumps = counter("minecraft:jump");

    // Stable sort: equal counts keep file order
    let mut top_mobs: Vec<MobKillCount> = section(stats, KILLED)
        .map(|killed| {
            killed
                .iter()
                .map(|(id, count)| MobKillCount {
                    name: display_name(id),
                    count: json_int(count),
                })
                .collect()
        })
        .unwrap_or_default();
    top_mobs.sort_by(|a, b| b.count.cmp(&a.count));
    top_mobs.truncate(TOP_MOBS_LIMIT);

    let mut coins = BTreeMap::new();
    if let Some(picked_up) = section(stats, PICKED_UP) {
        for (id, count) in picked_up.iter().filter(|(id, _)| id.starts_with(COIN_PREFIX)) {
            *coins.entry(display_name(id)).or_insert(0) += json_int(count);
        }
    }

    VanillaMetrics {
        mob_kills,
        deaths,
        play_time_ticks,
        play_time_hms: format_play_time(play_time_ticks),
        walk_km: km_from_cm(walk_cm),
        fly_km: km_from_cm(fly_cm),
        jumps,
        top_mobs,
        coins,
    }
}

/// `"minecraft:zombie_villager"` -> `"Zombie villager"`
pub fn display_name(id: &str) -> String {
    let bare = id.rsplit(':').next().unwrap_or(id);
    let spaced = bare.replace('_', " ");
    let trimmed = spaced.trim();

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Ticks -> `HH:MM:SS`
pub fn format_play_time(ticks: i64) -> String {
    let total_secs = ticks.max(0) / TICKS_PER_SECOND;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Centimeters -> kilometers, rounded to 2 decimals
pub fn km_from_cm(cm: i64) -> f64 {
    (cm as f64 / 100_000.0 * 100.0).round() / 100.0
}

fn section<'a>(stats: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    stats.get(key).and_then(Value::as_object)
}

/// Counters are integers in practice; floats truncate, numeric strings
/// parse, anything else counts as zero.
fn json_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(0, |f| f.trunc() as i64),
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_custom_counters() {
        let stats = object(json!({
            "minecraft:custom": {
                "minecraft:mob_kills": 5,
                "minecraft:deaths": 1,
                "minecraft:play_time": 36000,
                "minecraft:walk_one_cm": 1_234_567,
                "minecraft:fly_one_cm": 50_000,
                "minecraft:jump": 321
            }
        }));
        let m = extract_vanilla_metrics(&stats);
        assert_eq!(m.mob_kills, 5);
        assert_eq!(m.deaths, 1);
        assert_eq!(m.play_time_ticks, 36000);
        assert_eq!(m.play_time_hms, "00:30:00");
        assert_eq!(m.walk_km, 12.35);
        assert_eq!(m.fly_km, 0.5);
        assert_eq!(m.jumps, 321);
    }

    #[test]
    fn test_missing_sections_default_to_zero() {
        let m = extract_vanilla_metrics(&Map::new());
        assert_eq!(m.mob_kills, 0);
        assert_eq!(m.deaths, 0);
        assert_eq!(m.play_time_hms, "00:00:00");
        assert_eq!(m.walk_km, 0.0);
        assert!(m.top_mobs.is_empty());
        assert!(m.coins.is_empty());

        let unrelated = object(json!({ "minecraft:mined": { "minecraft:stone": 9 } }));
        assert_eq!(extract_vanilla_metrics(&unrelated), m);
    }

    #[test]
    fn test_wrong_shapes_do_not_fail() {
        let stats = object(json!({
            "minecraft:custom": [1, 2, 3],
            "minecraft:killed": "zombie",
            "minecraft:picked_up": { "lightmanscurrency:coin_copper": "seven" }
        }));
        let m = extract_vanilla_metrics(&stats);
        assert_eq!(m.mob_kills, 0);
        assert!(m.top_mobs.is_empty());
        assert_eq!(m.coins.get("Coin copper"), Some(&0));
    }

    #[test]
    fn test_top_mobs_sorted_with_stable_ties() {
        let stats = object(json!({
            "minecraft:killed": {
                "minecraft:spider": 4,
                "minecraft:zombie": 9,
                "minecraft:creeper": 4,
                "minecraft:skeleton": 7,
                "minecraft:cave_spider": 4
            }
        }));
        let names: Vec<(String, i64)> = extract_vanilla_metrics(&stats)
            .top_mobs
            .into_iter()
            .map(|m| (m.name, m.count))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Zombie".to_string(), 9),
                ("Skeleton".to_string(), 7),
                ("Spider".to_string(), 4),
                ("Creeper".to_string(), 4),
                ("Cave spider".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_top_mobs_limited_to_ten() {
        let mut killed = Map::new();
        for i in 0..15 {
            killed.insert(format!("minecraft:mob_{}", i), json!(i));
        }
        let mut stats = Map::new();
        stats.insert("minecraft:killed".to_string(), Value::Object(killed));

        let top = extract_vanilla_metrics(&stats).top_mobs;
        assert_eq!(top.len(), TOP_MOBS_LIMIT);
        assert_eq!(top[0].count, 14);
        assert_eq!(top[9].count, 5);
    }

    #[test]
    fn test_coins_summed_by_display_name() {
        let stats = object(json!({
            "minecraft:picked_up": {
                "lightmanscurrency:coin_gold": 3,
                "minecraft:diamond": 40,
                "lightmanscurrency:coin_iron": 10,
                "lightmanscurrency:coinpile_gold": 2,
                "otherns:coin_gold": 5
            }
        }));
        let coins = extract_vanilla_metrics(&stats).coins;
        assert_eq!(coins.get("Coin gold"), Some(&3));
        assert_eq!(coins.get("Coin iron"), Some(&10));
        assert_eq!(coins.get("Coinpile gold"), Some(&2));
        assert_eq!(coins.len(), 3);
    }

    #[test]
    fn test_coin_entries_from_different_namespaces_merge() {
        let stats = object(json!({
            "minecraft:picked_up": {
                "lightmanscurrency:coin_emerald": 2,
                "lightmanscurrency:coin_emerald_extra:coin_emerald": 3
            }
        }));
        let coins = extract_vanilla_metrics(&stats).coins;
        assert_eq!(coins.get("Coin emerald"), Some(&5));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("minecraft:zombie"), "Zombie");
        assert_eq!(display_name("minecraft:wither_skeleton"), "Wither skeleton");
        assert_eq!(display_name("lightmanscurrency:coin_GOLD"), "Coin gold");
        assert_eq!(display_name("no_namespace"), "No namespace");
        assert_eq!(display_name("minecraft:_"), "");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_format_play_time() {
        assert_eq!(format_play_time(0), "00:00:00");
        assert_eq!(format_play_time(19), "00:00:00");
        assert_eq!(format_play_time(20), "00:00:01");
        assert_eq!(format_play_time(72_000), "01:00:00");
        assert_eq!(format_play_time(20 * (100 * 3600 + 61)), "100:01:01");
        assert_eq!(format_play_time(-50), "00:00:00");
    }

    #[test]
    fn test_json_int_coercion() {
        assert_eq!(json_int(&json!(12.9)), 12);
        assert_eq!(json_int(&json!("8")), 8);
        assert_eq!(json_int(&json!(u64::MAX)), i64::MAX);
        assert_eq!(json_int(&json!(null)), 0);
    }
}
