//! Wire transport: a Unix-domain stream socket, newline-delimited JSON,
//! one message per line (spec §6.4). This replaces the length-prefixed
//! binary framing the teacher uses in `socket/framing.rs` — the spec
//! mandates an explicit, debuggable line protocol instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use uuid::Uuid;

use crate::error::{MuxError, Result};

/// The envelope kind of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Broadcast,
}

/// One line on the wire. `reply_to` is only set on responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMessage {
    pub id: Uuid,
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub method: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    #[serde(rename = "_iacEnvelope", skip_serializing_if = "Option::is_none")]
    pub iac_envelope: Option<String>,
}

impl BusMessage {
    pub fn is_broadcast(&self) -> bool {
        self.to == "*"
    }
}

/// The socket path for a session's message bus: `$RUNTIME/<hub>/session-<id>.sock`.
pub fn socket_path(runtime_dir: &Path, hub: &str, session_id: Uuid) -> PathBuf {
    runtime_dir.join(hub).join(format!("session-{session_id}.sock"))
}

/// A connected client's write half, one JSON line per message.
pub struct MessageWriter {
    writer: OwnedWriteHalf,
}

impl MessageWriter {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }

    pub async fn send(&mut self, message: &BusMessage) -> Result<()> {
        let mut line = serde_json::to_string(message).map_err(|e| MuxError::ProtocolError(e.to_string()))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// A connected client's read half, yielding one parsed [`BusMessage`] per
/// line. Returns `Ok(None)` on a clean EOF.
pub struct MessageReader {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
}

impl MessageReader {
    pub fn new(reader: OwnedReadHalf) -> Self {
        Self { lines: BufReader::new(reader).lines() }
    }

    pub async fn recv(&mut self) -> Result<Option<BusMessage>> {
        match self.lines.next_line().await? {
            None => Ok(None),
            Some(line) if line.trim().is_empty() => Ok(None),
            Some(line) => {
                let message = serde_json::from_str(&line).map_err(|e| MuxError::ProtocolError(e.to_string()))?;
                Ok(Some(message))
            }
        }
    }
}

/// Bind the session's listen socket, removing a stale socket file left
/// behind by an unclean shutdown.
pub async fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }
    UnixListener::bind(path).map_err(MuxError::Io)
}

pub fn split(stream: UnixStream) -> (MessageReader, MessageWriter) {
    let (read, write) = stream.into_split();
    (MessageReader::new(read), MessageWriter::new(write))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_matches_spec_layout() {
        let session = Uuid::new_v4();
        let path = socket_path(Path::new("/tmp/agentmux"), "hub", session);
        assert_eq!(path, PathBuf::from(format!("/tmp/agentmux/hub/session-{session}.sock")));
    }

    #[tokio::test]
    async fn round_trips_a_message_over_a_real_socket_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = bind(&path).await.unwrap();

        let connector = UnixStream::connect(&path);
        let (client, accepted) = tokio::join!(connector, listener.accept());
        let client = client.unwrap();
        let (server, _addr) = accepted.unwrap();

        let (_client_reader, mut client_writer) = split(client);
        let (mut server_reader, _server_writer) = split(server);

        let msg = BusMessage {
            id: Uuid::new_v4(),
            timestamp: 0,
            from: "a".into(),
            to: "b".into(),
            kind: MessageKind::Request,
            method: "fipa:inform".into(),
            payload: serde_json::json!({"hello": "world"}),
            reply_to: None,
            iac_envelope: None,
        };
        client_writer.send(&msg).await.unwrap();
        let received = server_reader.recv().await.unwrap().unwrap();
        assert_eq!(received.method, "fipa:inform");
        assert_eq!(received.from, "a");
    }
}
