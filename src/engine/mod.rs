//! Generation request/response channel.
//!
//! A persistent websocket to the atlas engine. Requests are coalesced so
//! only the newest one within the quiet window goes out; responses are
//! merged into an [`AtlasSnapshot`].
//!
//! ```text
//! request() --> coalescer task --> socket thread <==ws==> engine
//!                                       |
//! recv()    <-------- EngineEvent ------+
//! ```

mod coalesce;
mod connection;
mod message;
mod snapshot;

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::codec::DecodeError;
use crate::config::EngineConfig;

pub use coalesce::Coalescer;
pub use message::{EngineEvent, GenerateRequest, GenerateResponse};
pub use snapshot::AtlasSnapshot;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("generation channel closed")]
    Closed,

    #[error("no response from the engine within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("no atlas image received yet")]
    MissingImage,

    #[error("no glyph metrics received yet")]
    MissingMetrics,

    #[error("invalid image payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// Owner side of the generation channel.
///
/// Holds the connection flag and the latest snapshot; nothing about the
/// engine lives in globals.
pub struct EngineChannel {
    requests: mpsc::Sender<GenerateRequest>,
    events: mpsc::Receiver<EngineEvent>,
    snapshot: AtlasSnapshot,
    connected: bool,
}

impl EngineChannel {
    /// Start the coalescer task and socket thread.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: &EngineConfig) -> Self {
        let (request_tx, request_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (socket_tx, socket_rx) = crossbeam::channel::unbounded();

        let quiet = Duration::from_millis(config.debounce_ms);
        tokio::spawn(coalesce_requests(request_rx, socket_tx, quiet));

        let url = config.url.clone();
        let reconnect = Duration::from_millis(config.reconnect_ms);
        std::thread::spawn(move || connection::run(url, reconnect, socket_rx, event_tx));

        Self {
            requests: request_tx,
            events: event_rx,
            snapshot: AtlasSnapshot::new(),
            connected: false,
        }
    }

    /// Queue a request. Superseded by any newer request in the quiet window.
    pub async fn request(&self, request: GenerateRequest) -> Result<(), EngineError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| EngineError::Closed)
    }

    /// Next event from the engine. Updates are merged into the snapshot
    /// before being returned.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        let event = self.events.recv().await?;
        match &event {
            EngineEvent::Connected => self.connected = true,
            EngineEvent::Disconnected(_) => self.connected = false,
            EngineEvent::Update(response) => {
                self.snapshot.apply(response.clone());
            }
        }
        Some(event)
    }

    pub fn snapshot(&self) -> &AtlasSnapshot {
        &self.snapshot
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Send `request` and wait until a response has completed the snapshot.
    pub async fn fetch(
        &mut self,
        request: GenerateRequest,
        timeout: Duration,
    ) -> Result<&AtlasSnapshot, EngineError> {
        let seen = self.snapshot.updates();
        self.request(request).await?;

        let deadline = Instant::now() + timeout;
        loop {
            let event = tokio::time::timeout_at(deadline, self.recv())
                .await
                .map_err(|_| EngineError::Timeout(timeout))?
                .ok_or(EngineError::Closed)?;

            match event {
                EngineEvent::Update(_) if self.snapshot.updates() > seen && self.snapshot.is_complete() => {
                    break;
                }
                EngineEvent::Disconnected(reason) => {
                    crate::log!("engine"; "disconnected: {}", reason);
                }
                _ => {}
            }
        }
        Ok(&self.snapshot)
    }
}

/// Forward only the newest request once the quiet window has passed.
async fn coalesce_requests(
    mut requests: mpsc::Receiver<GenerateRequest>,
    socket: crossbeam::channel::Sender<GenerateRequest>,
    quiet: Duration,
) {
    let mut coalescer = Coalescer::new(quiet);
    loop {
        tokio::select! {
            biased;
            request = requests.recv() => match request {
                Some(request) => coalescer.push(request),
                None => break,
            },
            _ = tokio::time::sleep(coalescer.sleep_duration()) => {
                if let Some(request) = coalescer.take_if_ready()
                    && socket.send(request).is_err()
                {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base64;
    use crate::config::ParamsConfig;
    use crate::core::test_png;
    use std::net::TcpListener;
    use tungstenite::protocol::Message;

    fn request(text: &str) -> GenerateRequest {
        GenerateRequest::from_params(&ParamsConfig {
            text: text.to_string(),
            ..ParamsConfig::default()
        })
    }

    #[tokio::test]
    async fn test_fetch_coalesces_and_merges_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let engine = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            let Message::Text(text) = ws.read().unwrap() else {
                panic!("expected text frame");
            };
            let body: serde_json::Value = serde_json::from_str(&text).unwrap();
            let reply = serde_json::json!({
                "image": base64::encode(&test_png(20, 10)),
                "fnt": "page id=0 file=\"texture.png\"\nchar id=65 x=0 y=0 width=10 height=10\n",
            });
            ws.send(Message::Text(reply.to_string().into())).unwrap();
            body["text"].as_str().unwrap().to_string()
        });

        let config = EngineConfig {
            url: format!("ws://{addr}"),
            debounce_ms: 50,
            ..EngineConfig::default()
        };
        let mut channel = EngineChannel::open(&config);
        channel.request(request("A")).await.unwrap();
        channel.request(request("AB")).await.unwrap();

        let snapshot = channel
            .fetch(request("ABC"), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.glyphs().unwrap().len(), 1);
        assert_eq!(snapshot.atlas_image().unwrap().width(), 20);

        // Only the newest request reached the engine
        assert_eq!(engine.join().unwrap(), "ABC");
    }

    #[tokio::test]
    async fn test_fetch_times_out_without_engine() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = EngineConfig {
            url: format!("ws://{addr}"),
            debounce_ms: 0,
            reconnect_ms: 50,
            ..EngineConfig::default()
        };
        let mut channel = EngineChannel::open(&config);
        let err = channel
            .fetch(request("A"), Duration::from_millis(200))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Timeout(_)));
        assert!(!channel.is_connected());
    }
}
