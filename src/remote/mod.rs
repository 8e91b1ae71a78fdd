//! Remote file access for server save data
//!
//! A `Connector` opens one `RemoteSession` per aggregation call. Sessions
//! are blocking; the aggregator runs them on tokio's blocking pool.
//!
//! Backends:
//! - `sftp` - password-authenticated SFTP over ssh2 (the hosted setup)
//! - `local` - a directory on this machine laid out like the server root

pub mod local;
pub mod sftp;

pub use local::LocalDirConnector;
pub use sftp::{SftpConnector, SftpCredentials};

use crate::error::{ConnectionError, RemoteError};
use std::ops::{Deref, DerefMut};

/// Default SFTP port of the hosting provider
pub const DEFAULT_SFTP_PORT: u16 = 2222;

/// Connect timeout in seconds; also used for individual reads
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// An open, authenticated session.
pub trait RemoteSession: Send {
    /// Read a whole file into memory
    fn read_all(&self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Entry names of a directory; empty when the directory does not exist
    fn list_names(&self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Release the transport. Safe to call more than once.
    fn close(&mut self);
}

/// Opens sessions against one configured host
pub trait Connector: Send + Sync {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError>;

    /// Human-readable target, for logs
    fn describe(&self) -> String;
}

/// Closes the wrapped session when dropped, so every exit path of an
/// aggregation (including `?` and panics) releases the transport.
pub struct SessionGuard {
    session: Box<dyn RemoteSession>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn RemoteSession>) -> Self {
        Self { session }
    }

    pub fn open(connector: &dyn Connector) -> Result<Self, ConnectionError> {
        let session = connector.open()?;
        log::debug!("Opened session to {}", connector.describe());
        Ok(Self::new(session))
    }
}

impl Deref for SessionGuard {
    type Target = dyn RemoteSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        log::debug!("Session closed");
    }
}
