//! Dashboard configuration from environment variables
//!
//! `.env` is loaded by the binaries (dotenv) before `from_env` runs.

use crate::cache::DEFAULT_TTL_SECS;
use crate::error::ConfigError;
use crate::remote::{
    Connector, LocalDirConnector, SftpConnector, SftpCredentials, DEFAULT_SFTP_PORT,
    DEFAULT_TIMEOUT_SECS,
};
use crate::status::{ServerListPing, StatusQuery};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SFTP_HOST: &str = "ftp.pebblehost.com";
const DEFAULT_WORLD_DIR: &str = "world";
const DEFAULT_MC_HOST: &str = "127.0.0.1";
const DEFAULT_MC_PORT: u16 = 25565;

/// Where the save data comes from
#[derive(Debug, Clone)]
pub enum Backend {
    Sftp {
        host: String,
        port: u16,
        credentials: SftpCredentials,
    },
    Local { root: PathBuf },
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub backend: Backend,

    /// World folder relative to the server root
    pub world_dir: String,

    /// Cache entry lifetime
    pub cache_ttl: Duration,

    /// SFTP connect/read timeout, also used for the status query
    pub connect_timeout: Duration,

    /// Background refresh period of the dashboard
    pub refresh_interval: Duration,

    /// Live online-players query
    pub enable_query: bool,
    pub mc_host: String,
    pub mc_port: u16,
}

impl DashboardConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SFTP_HOST` / `FTP_HOST` (default: ftp.pebblehost.com)
    /// - `SFTP_PORT` (default: 2222)
    /// - `SFTP_USER` / `FTP_USER` (required unless `LOCAL_SERVER_ROOT` is set)
    /// - `SFTP_PASS` / `FTP_PASS`
    /// - `LOCAL_SERVER_ROOT` (optional: read saves from a local directory)
    /// - `WORLD_DIR` (default: world)
    /// - `CACHE_TTL` seconds (default: 60)
    /// - `CONNECT_TIMEOUT_SECS` (default: 20)
    /// - `REFRESH_INTERVAL_SECS` (default: same as `CACHE_TTL`)
    /// - `ENABLE_QUERY` (default: false)
    /// - `MC_HOST` (default: 127.0.0.1)
    /// - `MC_PORT` (default: 25565)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|key| var(*key));

        let backend = match var("LOCAL_SERVER_ROOT") {
            Some(root) => Backend::Local {
                root: PathBuf::from(root),
            },
            None => {
                let user = first(&["SFTP_USER", "FTP_USER"]).ok_or(ConfigError::Missing("SFTP_USER"))?;
                Backend::Sftp {
                    host: first(&["SFTP_HOST", "FTP_HOST"])
                        .unwrap_or_else(|| DEFAULT_SFTP_HOST.to_string()),
                    port: parse_or(&var, "SFTP_PORT", DEFAULT_SFTP_PORT),
                    credentials: SftpCredentials {
                        user,
                        password: first(&["SFTP_PASS", "FTP_PASS"]).unwrap_or_default(),
                    },
                }
            }
        };

        let cache_ttl_secs = parse_or(&var, "CACHE_TTL", DEFAULT_TTL_SECS);
        let refresh_secs = parse_or(&var, "REFRESH_INTERVAL_SECS", cache_ttl_secs).max(1);

        Ok(Self {
            backend,
            world_dir: var("WORLD_DIR").unwrap_or_else(|| DEFAULT_WORLD_DIR.to_string()),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            connect_timeout: Duration::from_secs(parse_or(
                &var,
                "CONNECT_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            refresh_interval: Duration::from_secs(refresh_secs),
            enable_query: var("ENABLE_QUERY").map_or(false, |v| parse_flag(&v)),
            mc_host: var("MC_HOST").unwrap_or_else(|| DEFAULT_MC_HOST.to_string()),
            mc_port: parse_or(&var, "MC_PORT", DEFAULT_MC_PORT),
        })
    }

    /// Build the connector for the configured backend
    pub fn connector(&self) -> Result<Arc<dyn Connector>, ConfigError> {
        match &self.backend {
            Backend::Sftp {
                host,
                port,
                credentials,
            } => Ok(Arc::new(
                SftpConnector::new(host.clone(), credentials.clone())
                    .with_port(*port)
                    .with_timeout(self.connect_timeout),
            )),
            Backend::Local { root } => {
                if !root.is_dir() {
                    return Err(ConfigError::NotADirectory(root.display().to_string()));
                }
                Ok(Arc::new(LocalDirConnector::new(root.clone())))
            }
        }
    }

    /// Status query when `ENABLE_QUERY` is on
    pub fn status_query(&self) -> Option<Arc<dyn StatusQuery>> {
        if !self.enable_query {
            return None;
        }
        Some(Arc::new(
            ServerListPing::new(self.mc_host.clone(), self.mc_port).with_timeout(self.connect_timeout),
        ))
    }
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("⚠️  Invalid {}={:?}, using default", key, raw);
            default
        }),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[("SFTP_USER", "panel.user")]).unwrap();

        match &config.backend {
            Backend::Sftp {
                host,
                port,
                credentials,
            } => {
                assert_eq!(host, "ftp.pebblehost.com");
                assert_eq!(*port, 2222);
                assert_eq!(credentials.user, "panel.user");
                assert_eq!(credentials.password, "");
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.world_dir, "world");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert!(!config.enable_query);
        assert_eq!(config.mc_host, "127.0.0.1");
        assert_eq!(config.mc_port, 25565);
        assert!(config.status_query().is_none());
    }

    #[test]
    fn test_custom_config() {
        let config = config_from(&[
            ("FTP_HOST", "legacy.example.net"),
            ("SFTP_HOST", "sftp.example.net"),
            ("SFTP_PORT", "2022"),
            ("FTP_USER", "legacy"),
            ("FTP_PASS", "hunter2"),
            ("WORLD_DIR", "survival"),
            ("CACHE_TTL", "15"),
            ("REFRESH_INTERVAL_SECS", "5"),
            ("ENABLE_QUERY", "TRUE"),
            ("MC_PORT", "25570"),
        ])
        .unwrap();

        match &config.backend {
            Backend::Sftp {
                host,
                port,
                credentials,
            } => {
                assert_eq!(host, "sftp.example.net");
                assert_eq!(*port, 2022);
                assert_eq!(credentials.user, "legacy");
                assert_eq!(credentials.password, "hunter2");
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.world_dir, "survival");
        assert_eq!(config.cache_ttl, Duration::from_secs(15));
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert!(config.enable_query);
        assert_eq!(config.mc_port, 25570);
        assert!(config.status_query().is_some());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("SFTP_USER", "u"),
            ("SFTP_PORT", "not-a-port"),
            ("CACHE_TTL", "-3"),
            ("MC_PORT", "99999"),
        ])
        .unwrap();

        match config.backend {
            Backend::Sftp { port, .. } => assert_eq!(port, 2222),
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.mc_port, 25565);
    }

    #[test]
    fn test_missing_user_is_an_error() {
        let err = config_from(&[("SFTP_USER", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SFTP_USER")));
    }

    #[test]
    fn test_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let config = config_from(&[("LOCAL_SERVER_ROOT", root.as_str())]).unwrap();

        assert!(matches!(config.backend, Backend::Local { .. }));
        let connector = config.connector().unwrap();
        assert!(connector.describe().contains(&root));

        let missing = config_from(&[("LOCAL_SERVER_ROOT", "/definitely/not/here")]).unwrap();
        assert!(matches!(
            missing.connector(),
            Err(ConfigError::NotADirectory(_))
        ));
    }
}
