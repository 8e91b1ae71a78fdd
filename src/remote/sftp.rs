//! SFTP backend (ssh2 / libssh2)
//!
//! Password authentication only, no agent or key lookup, matching the
//! panel-issued credentials of the game host. Host keys are not pinned.

use super::{Connector, RemoteSession, DEFAULT_SFTP_PORT, DEFAULT_TIMEOUT_SECS};
use crate::error::{ConnectionError, RemoteError};
use ssh2::{ErrorCode, Session, Sftp};
use std::fmt;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

// libssh2 error codes (libssh2.h / libssh2_sftp.h)
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_SOCKET_SEND: i32 = -7;
const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED: i32 = -19;
const LIBSSH2_ERROR_SOCKET_RECV: i32 = -43;
const LIBSSH2_FX_NO_SUCH_FILE: i32 = 2;
const LIBSSH2_FX_NO_SUCH_PATH: i32 = 10;

#[derive(Clone)]
pub struct SftpCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SftpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens password-authenticated SFTP sessions to one host
#[derive(Debug, Clone)]
pub struct SftpConnector {
    host: String,
    port: u16,
    credentials: SftpCredentials,
    timeout: Duration,
}

impl SftpConnector {
    pub fn new(host: impl Into<String>, credentials: SftpCredentials) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SFTP_PORT,
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn connect_tcp(&self) -> Result<TcpStream, ConnectionError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.unreachable(e.to_string()))?;

        let mut last_err: Option<io::Error> = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.timeout))
                        .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
                        .map_err(|e| ConnectionError::Protocol(e.to_string()))?;
                    return Ok(stream);
                }
                Err(e) => {
                    log::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Err(self.timed_out()),
            Some(e) => Err(self.unreachable(e.to_string())),
            None => Err(self.unreachable("host resolved to no addresses".to_string())),
        }
    }

    fn timed_out(&self) -> ConnectionError {
        ConnectionError::Timeout {
            host: self.host.clone(),
            port: self.port,
            secs: self.timeout.as_secs(),
        }
    }

    /// Only a rejected login is `Auth`; a dropped transport during the
    /// exchange is `Unreachable`, anything else `Protocol`.
    fn auth_error(&self, e: &ssh2::Error) -> ConnectionError {
        let ErrorCode::Session(code) = e.code() else {
            return ConnectionError::Protocol(format!("ssh auth: {}", e));
        };
        match code {
            LIBSSH2_ERROR_TIMEOUT => self.timed_out(),
            LIBSSH2_ERROR_AUTHENTICATION_FAILED | LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED => {
                ConnectionError::Auth {
                    host: self.host.clone(),
                    user: self.credentials.user.clone(),
                }
            }
            LIBSSH2_ERROR_SOCKET_SEND | LIBSSH2_ERROR_SOCKET_RECV | LIBSSH2_ERROR_SOCKET_DISCONNECT => {
                self.unreachable(format!("connection lost during auth: {}", e))
            }
            _ => ConnectionError::Protocol(format!("ssh auth: {}", e)),
        }
    }

    fn unreachable(&self, reason: String) -> ConnectionError {
        ConnectionError::Unreachable {
            host: self.host.clone(),
            port: self.port,
            reason,
        }
    }
}

impl Connector for SftpConnector {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        let tcp = self.connect_tcp()?;

        let mut session = Session::new().map_err(|e| ConnectionError::Protocol(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX));

        session.handshake().map_err(|e| {
            if is_session_code(&e, LIBSSH2_ERROR_TIMEOUT) {
                self.timed_out()
            } else {
                ConnectionError::Protocol(format!("ssh handshake: {}", e))
            }
        })?;

        session
            .userauth_password(&self.credentials.user, &self.credentials.password)
            .map_err(|e| self.auth_error(&e))?;
        if !session.authenticated() {
            return Err(ConnectionError::Auth {
                host: self.host.clone(),
                user: self.credentials.user.clone(),
            });
        }

        let sftp = session
            .sftp()
            .map_err(|e| ConnectionError::Protocol(format!("sftp subsystem: {}", e)))?;

        Ok(Box::new(SftpSession {
            sftp: Some(sftp),
            session: Some(session),
        }))
    }

    fn describe(&self) -> String {
        format!("sftp://{}@{}:{}", self.credentials.user, self.host, self.port)
    }
}

/// One authenticated SFTP channel; `None` fields once closed
struct SftpSession {
    sftp: Option<Sftp>,
    session: Option<Session>,
}

impl SftpSession {
    fn sftp(&self, path: &str) -> Result<&Sftp, RemoteError> {
        self.sftp.as_ref().ok_or_else(|| RemoteError::Io {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::NotConnected, "session already closed"),
        })
    }
}

impl RemoteSession for SftpSession {
    fn read_all(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut file = self.sftp(path)?.open(Path::new(path)).map_err(|e| {
            if is_missing(&e) {
                RemoteError::NotFound {
                    path: path.to_string(),
                }
            } else {
                RemoteError::Io {
                    path: path.to_string(),
                    source: e.into(),
                }
            }
        })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|source| RemoteError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(buf)
    }

    fn list_names(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        match self.sftp(path)?.readdir(Path::new(path)) {
            Ok(entries) => Ok(entries
                .into_iter()
                .filter_map(|(entry, _stat)| {
                    entry.file_name().map(|n| n.to_string_lossy().into_owned())
                })
                .filter(|name| name != "." && name != "..")
                .collect()),
            Err(e) if is_missing(&e) => {
                log::debug!("Directory {} does not exist yet", path);
                Ok(Vec::new())
            }
            Err(e) => Err(RemoteError::Io {
                path: path.to_string(),
                source: e.into(),
            }),
        }
    }

    fn close(&mut self) {
        // Sftp channel must go before the session it runs on
        drop(self.sftp.take());
        if let Some(session) = self.session.take() {
            if let Err(e) = session.disconnect(None, "closing", None) {
                log::debug!("SFTP disconnect: {}", e);
            }
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_session_code(err: &ssh2::Error, code: i32) -> bool {
    matches!(err.code(), ErrorCode::Session(c) if c == code)
}

fn is_missing(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_FILE) | ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_PATH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> SftpCredentials {
        SftpCredentials {
            user: "panel.user".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", credentials());
        assert!(rendered.contains("panel.user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_defaults() {
        let connector = SftpConnector::new("ftp.example.net", credentials());
        assert_eq!(connector.port, DEFAULT_SFTP_PORT);
        assert_eq!(connector.timeout, Duration::from_secs(20));
        assert_eq!(connector.describe(), "sftp://panel.user@ftp.example.net:2222");
    }

    #[test]
    fn test_auth_error_classification() {
        let connector = SftpConnector::new("ftp.example.net", credentials());
        let session_err = |code: i32| ssh2::Error::new(ErrorCode::Session(code), "ssh failure");

        assert!(matches!(
            connector.auth_error(&session_err(LIBSSH2_ERROR_AUTHENTICATION_FAILED)),
            ConnectionError::Auth { .. }
        ));
        assert!(matches!(
            connector.auth_error(&session_err(LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED)),
            ConnectionError::Auth { .. }
        ));
        assert!(matches!(
            connector.auth_error(&session_err(LIBSSH2_ERROR_TIMEOUT)),
            ConnectionError::Timeout { secs: 20, .. }
        ));
        assert!(matches!(
            connector.auth_error(&session_err(LIBSSH2_ERROR_SOCKET_DISCONNECT)),
            ConnectionError::Unreachable { .. }
        ));
        assert!(matches!(
            connector.auth_error(&session_err(LIBSSH2_ERROR_SOCKET_RECV)),
            ConnectionError::Unreachable { .. }
        ));
        // LIBSSH2_ERROR_KEX_FAILURE
        match connector.auth_error(&session_err(-5)) {
            ConnectionError::Protocol(msg) => assert!(msg.starts_with("ssh auth:")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            connector.auth_error(&ssh2::Error::new(ErrorCode::SFTP(4), "failure")),
            ConnectionError::Protocol(_)
        ));
    }

    #[test]
    fn test_unresolvable_host_is_unreachable() {
        let connector = SftpConnector::new("host.invalid", credentials())
            .with_timeout(Duration::from_secs(2));
        match connector.open() {
            Err(ConnectionError::Unreachable { host, port, .. }) => {
                assert_eq!(host, "host.invalid");
                assert_eq!(port, 2222);
            }
            Err(other) => panic!("expected Unreachable, got {:?}", other),
            Ok(_) => panic!("expected connection failure"),
        }
    }

    #[test]
    #[ignore] // Needs a reachable SFTP server (set SFTP_HOST/SFTP_USER/SFTP_PASS)
    fn test_live_listing() {
        dotenv::dotenv().ok();
        let host = std::env::var("SFTP_HOST").unwrap();
        let connector = SftpConnector::new(
            host,
            SftpCredentials {
                user: std::env::var("SFTP_USER").unwrap(),
                password: std::env::var("SFTP_PASS").unwrap(),
            },
        );
        let mut session = connector.open().unwrap();
        let names = session.list_names("world/stats").unwrap();
        assert!(names.iter().all(|n| !n.is_empty()));
        session.close();
        session.close();
    }
}
