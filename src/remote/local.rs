//! Local-directory backend
//!
//! For dashboards running on the game host itself: remote paths are
//! resolved under `root`, which is laid out like the server directory
//! (`usercache.json`, `{world}/stats`, `{world}/playerdata`).

use super::{Connector, RemoteSession};
use crate::error::{ConnectionError, RemoteError};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalDirConnector {
    root: PathBuf,
}

impl LocalDirConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Connector for LocalDirConnector {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        if !self.root.is_dir() {
            return Err(ConnectionError::Unreachable {
                host: self.root.display().to_string(),
                port: 0,
                reason: "server root is not a directory".to_string(),
            });
        }
        Ok(Box::new(LocalDirSession {
            root: Some(self.root.clone()),
        }))
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

struct LocalDirSession {
    root: Option<PathBuf>,
}

impl LocalDirSession {
    /// Join `path` under the root, refusing anything that would climb out
    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let root = self.root.as_ref().ok_or_else(|| RemoteError::Io {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::NotConnected, "session already closed"),
        })?;
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(RemoteError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(root.join(relative))
    }
}

impl RemoteSession for LocalDirSession {
    fn read_all(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RemoteError::NotFound {
                    path: path.to_string(),
                }
            } else {
                RemoteError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }

    fn list_names(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let full = match self.resolve(path) {
            Ok(full) => full,
            Err(RemoteError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let entries = match fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RemoteError::Io {
                    path: path.to_string(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RemoteError::Io {
                path: path.to_string(),
                source,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        // read_dir order is filesystem-dependent
        names.sort();
        Ok(names)
    }

    fn close(&mut self) {
        self.root = None;
    }
}
