//! Player aggregation over a remote save directory
//!
//! Layout read from the server root:
//!
//! ```text
//! usercache.json                      [{ "uuid": ..., "name": ... }, ...]
//! {world}/stats/{uuid}.json           { "stats": { ... } } or the stats object itself
//! {world}/playerdata/{uuid}.dat       gzip NBT
//! ```
//!
//! Each call opens exactly one session and walks players sequentially.
//! Failures for a single player never fail the call: missing or broken
//! statistics drop the player, broken playerdata drops only the mod metrics.

use crate::cache::{NameMap, PlayerCache, StatsObject};
use crate::error::{AggregateError, PlayerDataError};
use crate::metrics::{extract_mod_metrics, extract_vanilla_metrics, ModMetrics};
use crate::nbt;
use crate::player::{PlayerDetailRecord, PlayerIdentity, PlayerSummaryRecord};
use crate::remote::{Connector, RemoteSession, SessionGuard};
use crate::status::{OnlinePlayers, StatusQuery};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const USERCACHE_PATH: &str = "usercache.json";
const STATS_EXT: &str = ".json";
const PLAYERDATA_EXT: &str = ".dat";

/// Composes player records from a `Connector` and a shared `PlayerCache`.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct PlayerAggregator {
    connector: Arc<dyn Connector>,
    cache: Arc<PlayerCache>,
    world_dir: String,
    status: Option<Arc<dyn StatusQuery>>,
}

impl PlayerAggregator {
    pub fn new(
        connector: Arc<dyn Connector>,
        cache: Arc<PlayerCache>,
        world_dir: impl Into<String>,
    ) -> Self {
        let world_dir = world_dir.into().trim_end_matches('/').to_string();
        Self {
            connector,
            cache,
            world_dir,
            status: None,
        }
    }

    /// Enable the live online-players query
    pub fn with_status_query(mut self, status: Arc<dyn StatusQuery>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn cache(&self) -> &Arc<PlayerCache> {
        &self.cache
    }

    pub fn describe(&self) -> String {
        format!("{}/{}", self.connector.describe(), self.world_dir)
    }

    /// Summary rows for every player with readable statistics, in listing
    /// order.
    pub fn summary_for_all(&self) -> Result<Vec<PlayerSummaryRecord>, AggregateError> {
        let session = SessionGuard::open(self.connector.as_ref())?;

        let uuids = self.list_player_uuids(&*session)?;
        let names = self.load_usercache(&*session);

        let mut records = Vec::with_capacity(uuids.len());
        for uuid in &uuids {
            let Some(stats) = self.stats_or_skip(&*session, uuid) else {
                continue;
            };
            let vanilla = extract_vanilla_metrics(&stats);
            let modded = self.load_mod_metrics(&*session, uuid);
            records.push(PlayerSummaryRecord::new(
                PlayerIdentity::resolve(uuid, &names),
                &vanilla,
                &modded,
            ));
        }

        log::debug!(
            "Aggregated {} of {} players from {}",
            records.len(),
            uuids.len(),
            self.describe()
        );
        Ok(records)
    }

    /// Full record for one player; `None` when the identifier is not a plain
    /// file name or the player has no readable statistics.
    pub fn details_for(&self, uuid: &str) -> Result<Option<PlayerDetailRecord>, AggregateError> {
        if !is_plain_identifier(uuid) {
            log::debug!("Rejected player identifier {:?}", uuid);
            return Ok(None);
        }

        let session = SessionGuard::open(self.connector.as_ref())?;
        let names = self.load_usercache(&*session);

        let Some(stats) = self.stats_or_skip(&*session, uuid) else {
            return Ok(None);
        };

        Ok(Some(PlayerDetailRecord {
            identity: PlayerIdentity::resolve(uuid, &names),
            vanilla: extract_vanilla_metrics(&stats),
            mod_metrics: self.load_mod_metrics(&*session, uuid),
        }))
    }

    /// `summary_for_all` on the blocking pool
    pub async fn fetch_summary_for_all(&self) -> Result<Vec<PlayerSummaryRecord>, AggregateError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.summary_for_all())
            .await
            .map_err(|e| AggregateError::Task(e.to_string()))?
    }

    /// `details_for` on the blocking pool
    pub async fn fetch_details_for(
        &self,
        uuid: &str,
    ) -> Result<Option<PlayerDetailRecord>, AggregateError> {
        let this = self.clone();
        let uuid = uuid.to_string();
        tokio::task::spawn_blocking(move || this.details_for(&uuid))
            .await
            .map_err(|e| AggregateError::Task(e.to_string()))?
    }

    /// Live online players; empty when the query is disabled or fails
    pub async fn fetch_online_players(&self) -> OnlinePlayers {
        let Some(status) = &self.status else {
            return OnlinePlayers::default();
        };
        match status.query().await {
            Ok(online) => online,
            Err(e) => {
                log::debug!("Status query failed: {}", e);
                OnlinePlayers::default()
            }
        }
    }

    fn list_player_uuids(&self, session: &dyn RemoteSession) -> Result<Vec<String>, AggregateError> {
        let names = session.list_names(&self.stats_dir())?;
        Ok(names
            .into_iter()
            .filter_map(|name| name.strip_suffix(STATS_EXT).map(str::to_string))
            .filter(|uuid| !uuid.is_empty())
            .collect())
    }

    /// uuid -> name. An unreadable usercache is cached as empty too, so a
    /// missing file is not re-fetched on every call within the TTL.
    fn load_usercache(&self, session: &dyn RemoteSession) -> NameMap {
        if let Some(names) = self.cache.names() {
            return names;
        }

        let names = match session.read_all(USERCACHE_PATH) {
            Ok(bytes) => parse_usercache(&bytes),
            Err(e) => {
                log::debug!("No usercache: {}", e);
                HashMap::new()
            }
        };
        let names = Arc::new(names);
        self.cache.set_names(names.clone());
        names
    }

    fn stats_or_skip(&self, session: &dyn RemoteSession, uuid: &str) -> Option<StatsObject> {
        match self.load_stats(session, uuid) {
            Ok(Some(stats)) => Some(stats),
            Ok(None) => {
                log::debug!("Skipping {}: no statistics recorded", uuid);
                None
            }
            Err(e) => {
                log::debug!("Skipping {}: {}", uuid, e);
                None
            }
        }
    }

    /// Statistics object for one player. `Ok(None)` for an empty object.
    /// Only successful loads are cached.
    fn load_stats(
        &self,
        session: &dyn RemoteSession,
        uuid: &str,
    ) -> Result<Option<StatsObject>, PlayerDataError> {
        if let Some(stats) = self.cache.stats(uuid) {
            return Ok(Some(stats));
        }

        let path = self.stats_path(uuid);
        let bytes = session.read_all(&path)?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|source| PlayerDataError::Json {
            path: path.clone(),
            source,
        })?;

        let stats = match value {
            Value::Object(mut file) => match file.remove("stats") {
                Some(Value::Object(inner)) => inner,
                Some(_) => return Err(PlayerDataError::NotAnObject { path }),
                None => file,
            },
            _ => return Err(PlayerDataError::NotAnObject { path }),
        };
        if stats.is_empty() {
            return Ok(None);
        }

        let stats = Arc::new(stats);
        self.cache.set_stats(uuid, stats.clone());
        Ok(Some(stats))
    }

    /// Mod metrics from playerdata; any failure yields all-absent metrics
    fn load_mod_metrics(&self, session: &dyn RemoteSession, uuid: &str) -> ModMetrics {
        match self.load_tree(session, uuid) {
            Ok(tree) => extract_mod_metrics(&tree),
            Err(PlayerDataError::Remote(e)) if e.is_not_found() => {
                log::debug!("No playerdata for {}", uuid);
                ModMetrics::default()
            }
            Err(e) => {
                log::warn!("⚠️  Mod metrics unavailable for {}: {}", uuid, e);
                ModMetrics::default()
            }
        }
    }

    fn load_tree(
        &self,
        session: &dyn RemoteSession,
        uuid: &str,
    ) -> Result<Arc<nbt::Compound>, PlayerDataError> {
        if let Some(tree) = self.cache.tree(uuid) {
            return Ok(tree);
        }

        let path = self.playerdata_path(uuid);
        let bytes = session.read_all(&path)?;
        let root = nbt::decode_gzip(&bytes)
            .map_err(|source| PlayerDataError::Decode { path, source })?;

        let tree = Arc::new(root.compound);
        self.cache.set_tree(uuid, tree.clone());
        Ok(tree)
    }

    fn stats_dir(&self) -> String {
        format!("{}/stats", self.world_dir)
    }

    fn stats_path(&self, uuid: &str) -> String {
        format!("{}/stats/{}{}", self.world_dir, uuid, STATS_EXT)
    }

    fn playerdata_path(&self, uuid: &str) -> String {
        format!("{}/playerdata/{}{}", self.world_dir, uuid, PLAYERDATA_EXT)
    }
}

/// Non-empty, no separators, no parent references
fn is_plain_identifier(uuid: &str) -> bool {
    !uuid.is_empty()
        && !uuid.contains('/')
        && !uuid.contains('\\')
        && !uuid.contains("..")
        && !uuid.contains('\0')
}

/// Entries without a string `uuid` and `name` are ignored; a later entry for
/// the same uuid wins.
fn parse_usercache(bytes: &[u8]) -> HashMap<String, String> {
    let entries: Vec<Value> = match serde_json::from_slice(bytes) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("⚠️  Unreadable usercache: {}", e);
            return HashMap::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            let uuid = entry.get("uuid")?.as_str()?;
            let name = entry.get("name")?.as_str()?;
            Some((uuid.to_string(), name.to_string()))
        })
        .collect()
}
