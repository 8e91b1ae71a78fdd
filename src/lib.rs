//! Player statistics for a modded Minecraft server
//!
//! Reads save data (usercache, per-player statistics JSON, gzip NBT
//! playerdata) from the server over SFTP or from a local directory, turns it
//! into leaderboard and detail records, and shows them in a terminal
//! dashboard.

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod nbt;
pub mod player;
pub mod remote;
pub mod state;
pub mod status;
pub mod ui;

pub use cache::PlayerCache;
pub use config::DashboardConfig;
pub use player::{PlayerAggregator, PlayerDetailRecord, PlayerSummaryRecord, SortKey};
