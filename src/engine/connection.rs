//! Blocking socket thread for the generation channel.
//!
//! Owns the websocket for its whole life: connects, re-sends the latest
//! request after every (re)connect, forwards responses, and retries after
//! `reconnect` when the engine goes away. Exits once the request side is
//! dropped or the event receiver is gone.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use tokio::sync::mpsc;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use super::{EngineEvent, GenerateRequest, GenerateResponse};
use crate::core::is_shutdown;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Socket read timeout; bounds how long a new request waits to be sent.
const READ_POLL: Duration = Duration::from_millis(50);

/// Why the serve loop returned.
enum Exit {
    /// Owner is gone; stop the thread.
    Stop,
    /// Connection lost; reconnect.
    Lost(String),
}

pub(super) fn run(
    url: String,
    reconnect: Duration,
    requests: Receiver<GenerateRequest>,
    events: mpsc::Sender<EngineEvent>,
) {
    let mut latest: Option<GenerateRequest> = None;

    loop {
        if is_shutdown() {
            return;
        }
        match open(&url) {
            Ok(mut socket) => {
                crate::debug!("engine"; "connected to {}", url);
                if events.blocking_send(EngineEvent::Connected).is_err() {
                    return;
                }
                // Bring the engine up to date with the current parameters
                if let Some(request) = &latest
                    && let Err(e) = send(&mut socket, request)
                {
                    crate::debug!("engine"; "resend failed: {}", e);
                }

                match serve(&mut socket, &requests, &events, &mut latest) {
                    Exit::Stop => {
                        let _ = socket.close(None);
                        return;
                    }
                    Exit::Lost(reason) => {
                        if events.blocking_send(EngineEvent::Disconnected(reason)).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => crate::debug!("engine"; "connect failed: {}", e),
        }

        // Offline: keep the newest request for the next connect
        match requests.recv_timeout(reconnect) {
            Ok(request) => latest = Some(request),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
        while let Ok(request) = requests.try_recv() {
            latest = Some(request);
        }
    }
}

fn open(url: &str) -> tungstenite::Result<Socket> {
    let (mut socket, _) = tungstenite::connect(url)?;
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        let _ = stream.set_read_timeout(Some(READ_POLL));
    }
    Ok(socket)
}

fn send(socket: &mut Socket, request: &GenerateRequest) -> tungstenite::Result<()> {
    let json = request.to_json();
    crate::debug!("engine"; "request ({} bytes)", json.len());
    socket.send(Message::Text(json.into()))
}

fn serve(
    socket: &mut Socket,
    requests: &Receiver<GenerateRequest>,
    events: &mpsc::Sender<EngineEvent>,
    latest: &mut Option<GenerateRequest>,
) -> Exit {
    loop {
        match requests.try_recv() {
            Ok(request) => {
                if let Err(e) = send(socket, &request) {
                    *latest = Some(request);
                    return Exit::Lost(e.to_string());
                }
                *latest = Some(request);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Exit::Stop,
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<GenerateResponse>(&text) {
                Ok(response) => {
                    if events.blocking_send(EngineEvent::Update(response)).is_err() {
                        return Exit::Stop;
                    }
                }
                Err(e) => crate::log!("engine"; "ignoring malformed response: {}", e),
            },
            Ok(Message::Close(_)) => return Exit::Lost("engine closed the connection".into()),
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => return Exit::Lost(e.to_string()),
        }
    }
}
