// Formatting helpers shared by the layout widgets

use chrono::{DateTime, Local, Utc};

/// Placeholder for metrics a player does not have
pub const ABSENT: &str = "—";

/// Optional mod metric, or a dash when absent
pub fn format_optional(value: Option<i64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

pub fn format_km(km: f64) -> String {
    format!("{:.2} km", km)
}

/// Unix seconds as local wall-clock time
pub fn format_timestamp(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}
