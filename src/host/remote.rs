//! Bridge to a live editor over WebSocket.
//!
//! A plugin inside the editor listens on the bridge URL and answers one
//! JSON request at a time:
//!
//! ```text
//! -> {"id":1,"op":"batch","commands":[{"_obj":"make",...}, ...]}
//! <- {"id":1,"ok":false,"absent":true,"failedAt":3,"error":"no layers selected"}
//! ```
//!
//! The socket is blocking; every call runs on the blocking pool with a
//! read timeout so a silent editor cannot stall the runtime.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use super::{Command, Host, HostError, ImageToken};
use crate::codec::base64;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Poll interval for socket reads.
const READ_POLL: Duration = Duration::from_millis(250);

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct BridgeRequest {
    id: u64,
    #[serde(flatten)]
    op: Op,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Op {
    Batch { commands: Vec<Value> },
    HasDocument,
    Layers,
    Stage { data: String },
    Release { token: String },
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Self::Batch { .. } => "batch",
            Self::HasDocument => "hasDocument",
            Self::Layers => "layers",
            Self::Stage { .. } => "stage",
            Self::Release { .. } => "release",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    absent: bool,
    #[serde(default)]
    failed_at: Option<usize>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Value,
}

impl BridgeResponse {
    /// Map a response onto the host error model.
    ///
    /// `commands` labels batch failures with the failing command's kind.
    fn into_result(self, op: &'static str, commands: &[Command]) -> Result<Value, HostError> {
        if self.ok {
            return Ok(self.result);
        }
        let message = self.error.unwrap_or_else(|| "unknown error".to_string());
        if self.absent {
            return Err(HostError::ExpectedAbsence(message));
        }
        let command = self
            .failed_at
            .and_then(|i| commands.get(i))
            .map_or(op, Command::kind);
        Err(HostError::failed(command, message))
    }
}

// ============================================================================
// Host
// ============================================================================

/// Host backed by a live editor.
pub struct RemoteHost {
    socket: Arc<Mutex<Socket>>,
    timeout: Duration,
    next_id: u64,
}

impl RemoteHost {
    /// Connect to the editor bridge at `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, HostError> {
        let url = url.to_string();
        let socket = tokio::task::spawn_blocking(move || open_socket(&url))
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))??;
        crate::debug!("host"; "connected to editor bridge");
        Ok(Self {
            socket: Arc::new(Mutex::new(socket)),
            timeout,
            next_id: 0,
        })
    }

    async fn call(&mut self, op: Op, commands: &[Command]) -> Result<Value, HostError> {
        self.next_id += 1;
        let id = self.next_id;
        let name = op.name();
        let raw = serde_json::to_string(&BridgeRequest { id, op })
            .map_err(|e| HostError::Unavailable(format!("failed to encode request: {e}")))?;

        let socket = Arc::clone(&self.socket);
        let timeout = self.timeout;
        let response = tokio::task::spawn_blocking(move || {
            let mut socket = socket.lock();
            roundtrip(&mut socket, id, raw, timeout)
        })
        .await
        .map_err(|e| HostError::Unavailable(e.to_string()))??;

        response.into_result(name, commands)
    }
}

impl Host for RemoteHost {
    async fn has_document(&mut self) -> Result<bool, HostError> {
        let value = self.call(Op::HasDocument, &[]).await?;
        value
            .as_bool()
            .ok_or_else(|| HostError::Unavailable(format!("expected a boolean, got {value}")))
    }

    async fn layer_names(&mut self) -> Result<Vec<String>, HostError> {
        let value = self.call(Op::Layers, &[]).await?;
        serde_json::from_value(value)
            .map_err(|e| HostError::Unavailable(format!("malformed layer list: {e}")))
    }

    async fn stage_image(&mut self, bytes: &[u8]) -> Result<ImageToken, HostError> {
        let op = Op::Stage {
            data: base64::encode(bytes),
        };
        let value = self.call(op, &[]).await?;
        value
            .as_str()
            .map(|token| ImageToken(token.to_string()))
            .ok_or_else(|| HostError::Unavailable(format!("expected a token, got {value}")))
    }

    async fn release(&mut self, token: &ImageToken) -> Result<(), HostError> {
        let op = Op::Release {
            token: token.as_str().to_string(),
        };
        self.call(op, &[]).await.map(drop)
    }

    async fn execute_batch(&mut self, commands: &[Command]) -> Result<(), HostError> {
        let op = Op::Batch {
            commands: commands.iter().map(Command::to_descriptor).collect(),
        };
        self.call(op, commands).await.map(drop)
    }
}

// ============================================================================
// Blocking socket I/O
// ============================================================================

fn open_socket(url: &str) -> Result<Socket, HostError> {
    let (mut socket, _) = tungstenite::connect(url)
        .map_err(|e| HostError::Unavailable(format!("cannot reach editor bridge at {url}: {e}")))?;
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        let _ = stream.set_read_timeout(Some(READ_POLL));
    }
    Ok(socket)
}

/// Send one request and wait for the response with the same id.
fn roundtrip(
    socket: &mut Socket,
    id: u64,
    raw: String,
    timeout: Duration,
) -> Result<BridgeResponse, HostError> {
    socket
        .send(Message::Text(raw.into()))
        .map_err(|e| HostError::Unavailable(format!("send failed: {e}")))?;

    let started = Instant::now();
    loop {
        if started.elapsed() > timeout {
            return Err(HostError::Unavailable(format!(
                "no response within {}ms",
                timeout.as_millis()
            )));
        }

        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                return Err(HostError::Unavailable("editor closed the connection".into()));
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(e) => return Err(HostError::Unavailable(format!("read failed: {e}"))),
        };

        match serde_json::from_str::<BridgeResponse>(&text) {
            Ok(response) if response.id == id => return Ok(response),
            Ok(response) => {
                crate::debug!("host"; "dropping stale response {}", response.id);
            }
            Err(e) => {
                crate::debug!("host"; "ignoring malformed message: {}", e);
            }
        }
    }
}
