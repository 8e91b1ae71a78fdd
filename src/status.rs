//! Live player count via the Java-edition server list ping
//!
//! Protocol (every packet is `VarInt length | VarInt packet id | payload`):
//! 1. C->S handshake `0x00`: protocol version, server address, port, next
//!    state = 1 (status)
//! 2. C->S status request `0x00` (empty)
//! 3. S->C status response `0x00`: one string holding JSON like
//!    `{"players":{"max":20,"online":2,"sample":[{"name":"Alex","id":"..."}]}}`
//!
//! The dashboard treats this as optional decoration: the aggregator turns
//! any failure into "0 online".

use crate::error::StatusError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Protocol number sent in the handshake; servers answer status pings for
/// any version
pub const PROTOCOL_VERSION: i32 = 47;

/// Status responses larger than this are rejected
const MAX_RESPONSE_BYTES: usize = 1 << 20;

/// Online count and the sample of names the server chose to share
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnlinePlayers {
    pub count: u32,
    pub names: Vec<String>,
}

#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn query(&self) -> Result<OnlinePlayers, StatusError>;
}

#[derive(Debug, Clone)]
pub struct ServerListPing {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ServerListPing {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(crate::remote::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn ping(&self) -> Result<OnlinePlayers, StatusError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;

        stream
            .write_all(&frame(&handshake_payload(&self.host, self.port)))
            .await?;
        stream.write_all(&frame(&[0x00])).await?;
        stream.flush().await?;

        let packet_len = read_varint(&mut stream).await?;
        if packet_len <= 0 {
            return Err(StatusError::Protocol(format!(
                "bad packet length {}",
                packet_len
            )));
        }
        let packet_id = read_varint(&mut stream).await?;
        if packet_id != 0x00 {
            return Err(StatusError::Protocol(format!(
                "unexpected packet id {:#04x}",
                packet_id
            )));
        }

        let json_len = read_varint(&mut stream).await?;
        let json_len = usize::try_from(json_len)
            .ok()
            .filter(|len| *len <= MAX_RESPONSE_BYTES)
            .ok_or_else(|| StatusError::Protocol(format!("bad JSON length {}", json_len)))?;
        let mut body = vec![0u8; json_len];
        stream.read_exact(&mut body).await?;

        parse_status_json(&body)
    }
}

#[async_trait]
impl StatusQuery for ServerListPing {
    async fn query(&self) -> Result<OnlinePlayers, StatusError> {
        match tokio::time::timeout(self.timeout, self.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StatusError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    players: Option<PlayersSection>,
}

#[derive(Debug, Deserialize)]
struct PlayersSection {
    #[serde(default)]
    online: Option<u32>,
    #[serde(default)]
    sample: Option<Vec<SamplePlayer>>,
}

#[derive(Debug, Deserialize)]
struct SamplePlayer {
    name: String,
}

/// Pull the online count and sample names out of a status JSON body
pub fn parse_status_json(body: &[u8]) -> Result<OnlinePlayers, StatusError> {
    let response: StatusResponse = serde_json::from_slice(body)?;
    let Some(players) = response.players else {
        return Ok(OnlinePlayers::default());
    };
    Ok(OnlinePlayers {
        count: players.online.unwrap_or(0),
        names: players
            .sample
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.name)
            .collect(),
    })
}

fn handshake_payload(host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(host.len() + 16);
    write_varint(&mut payload, 0x00);
    write_varint(&mut payload, PROTOCOL_VERSION);
    write_varint(&mut payload, host.len() as i32);
    payload.extend_from_slice(host.as_bytes());
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, 1);
    payload
}

/// Prefix a packet body with its VarInt length
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 5);
    write_varint(&mut out, body.len() as i32);
    out.extend_from_slice(body);
    out
}

/// LEB128-style VarInt over the two's-complement bits of an i32
pub fn write_varint(out: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7f == 0 {
            out.push(v as u8);
            return;
        }
        out.push(((v & 0x7f) | 0x80) as u8);
        v >>= 7;
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, StatusError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(StatusError::Protocol("VarInt longer than 5 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_varint_encoding() {
        let cases: [(i32, &[u8]); 6] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ];
        for (value, expected) in cases {
            let mut out = Vec::new();
            write_varint(&mut out, value);
            assert_eq!(out, expected, "value {}", value);
        }
    }

    #[tokio::test]
    async fn test_varint_decoding() {
        for value in [0, 1, 300, 25565, i32::MAX, -1] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            let mut reader = buf.as_slice();
            assert_eq!(read_varint(&mut reader).await.unwrap(), value);
        }

        let mut too_long: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            read_varint(&mut too_long).await,
            Err(StatusError::Protocol(_))
        ));
    }

    #[test]
    fn test_handshake_layout() {
        let payload = handshake_payload("mc.local", 25565);
        assert_eq!(payload[0], 0x00);
        assert_eq!(payload[1], PROTOCOL_VERSION as u8);
        assert_eq!(payload[2], 8);
        assert_eq!(&payload[3..11], b"mc.local");
        assert_eq!(&payload[11..13], &25565u16.to_be_bytes());
        assert_eq!(payload[13], 1);
    }

    #[test]
    fn test_parse_status_json() {
        let body = br#"{"version":{"name":"1.20.1","protocol":763},
            "players":{"max":20,"online":3,"sample":[{"name":"Alex","id":"a"},{"name":"steve","id":"b"}]},
            "description":{"text":"hi"}}"#;
        let online = parse_status_json(body).unwrap();
        assert_eq!(online.count, 3);
        assert_eq!(online.names, vec!["Alex".to_string(), "steve".to_string()]);

        let empty = parse_status_json(br#"{"players":{"max":20,"online":0}}"#).unwrap();
        assert_eq!(empty, OnlinePlayers::default());

        assert!(parse_status_json(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_query_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // handshake + status request
            for _ in 0..2 {
                let len = read_varint(&mut socket).await.unwrap();
                let mut body = vec![0u8; len as usize];
                socket.read_exact(&mut body).await.unwrap();
            }
            let json = br#"{"players":{"max":10,"online":1,"sample":[{"name":"Notch","id":"x"}]}}"#;
            let mut body = Vec::new();
            write_varint(&mut body, 0x00);
            write_varint(&mut body, json.len() as i32);
            body.extend_from_slice(json);
            socket.write_all(&frame(&body)).await.unwrap();
        });

        let ping = ServerListPing::new("127.0.0.1", port).with_timeout(Duration::from_secs(5));
        let online = ping.query().await.unwrap();
        assert_eq!(online.count, 1);
        assert_eq!(online.names, vec!["Notch".to_string()]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_query_refused_is_error() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let ping = ServerListPing::new("127.0.0.1", port).with_timeout(Duration::from_secs(2));
        assert!(ping.query().await.is_err());
    }
}
