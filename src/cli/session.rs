//! `atlas session`: the long-running interactive loop.
//!
//! Every plain line replaces the text parameter and queues a generation
//! request; lines starting with `:` are commands. The engine's updates
//! arrive independently and land in the status line.
//!
//! ```text
//! stdin thread ──┐
//!                ├──> Input ──> select! loop ──> EngineChannel
//! Ctrl+C thread ─┘                   │
//!                                    └──> synchronize(host)   (inline)
//! ```
//!
//! Sync runs inline in the loop, so a second `:sync` waits for the first.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;

use super::common::{describe_report, open_host, snapshot_atlas};
use crate::config::AtlasConfig;
use crate::core::register_session;
use crate::engine::{EngineChannel, EngineEvent, GenerateRequest};
use crate::export::write_atlas;
use crate::host::{AnyHost, HostError};
use crate::logger::{status_detach, status_error, status_success, status_unchanged, status_warning};
use crate::sync::{SyncError, SyncOptions, synchronize};
use crate::utils::plural_count;
use crate::{debug, log};

const HELP: &str = "\
type text to regenerate, or a command:
  :sync            slice the current atlas into the document
  :export [dir]    write <name>.png and <name>.fnt
  :set key value   change a parameter (size, font, padding, ...)
  :status          show connection and atlas state
  :quit            leave the session";

/// Something that reached the session loop from outside the runtime.
#[derive(Debug)]
enum Input {
    Line(String),
    Shutdown,
}

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Text(String),
    Sync,
    Export(Option<PathBuf>),
    Set { key: String, value: String },
    Status,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Action {
    fn parse(line: &str) -> Self {
        let Some(command) = line.trim().strip_prefix(':') else {
            return if line.trim().is_empty() {
                Self::Empty
            } else {
                Self::Text(line.to_string())
            };
        };

        let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        let rest = rest.trim();
        match name {
            "sync" | "s" => Self::Sync,
            "export" | "e" => Self::Export(
                (!rest.is_empty()).then(|| PathBuf::from(shellexpand::tilde(rest).into_owned())),
            ),
            "set" => match rest.split_once(char::is_whitespace) {
                Some((key, value)) => Self::Set {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                },
                None => Self::Unknown(line.trim().to_string()),
            },
            "status" => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}

/// Whether the loop keeps going after an action.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Session {
    config: AtlasConfig,
    engine: EngineChannel,
    host: Option<AnyHost>,
    simulate: bool,
}

/// Run the interactive session until `:quit`, end of input or Ctrl+C.
pub async fn run_session(config: AtlasConfig, simulate: bool) -> Result<()> {
    let (input_tx, mut inputs) = mpsc::channel(16);
    spawn_input_threads(input_tx);

    let engine = EngineChannel::open(&config.engine);
    let mut session = Session {
        config,
        engine,
        host: None,
        simulate,
    };

    log!("session"; "{}", HELP);
    session.regenerate().await;

    loop {
        tokio::select! {
            Some(event) = session.engine.recv() => session.on_engine_event(event),
            input = inputs.recv() => match input {
                Some(Input::Line(line)) => {
                    if session.handle(Action::parse(&line)).await == Flow::Quit {
                        break;
                    }
                }
                Some(Input::Shutdown) | None => break,
            },
        }
    }

    log!("session"; "bye");
    Ok(())
}

/// Bridge stdin and Ctrl+C into the async loop.
fn spawn_input_threads(tx: mpsc::Sender<Input>) {
    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    register_session(shutdown_tx);

    let shutdown_input = tx.clone();
    std::thread::spawn(move || {
        if shutdown_rx.recv().is_ok() {
            let _ = shutdown_input.blocking_send(Input::Shutdown);
        }
    });

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.blocking_send(Input::Shutdown);
    });
}

impl Session {
    async fn handle(&mut self, action: Action) -> Flow {
        match action {
            Action::Text(text) => {
                self.config.params.text = text;
                self.regenerate().await;
            }
            Action::Set { key, value } => match self.config.params.set(&key, &value) {
                Ok(()) => self.regenerate().await,
                Err(e) => status_error("invalid parameter", &e),
            },
            Action::Sync => self.sync().await,
            Action::Export(dir) => self.export(dir),
            Action::Status => self.print_status(),
            Action::Help => {
                log!("session"; "{}", HELP);
                status_detach();
            }
            Action::Quit => return Flow::Quit,
            Action::Unknown(line) => status_warning(&format!("unknown command `{line}`, try :help")),
            Action::Empty => {}
        }
        Flow::Continue
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Connected => status_success("engine connected"),
            EngineEvent::Disconnected(reason) => {
                status_warning(&format!("engine disconnected: {reason}"));
            }
            EngineEvent::Update(_) => match self.engine.snapshot().glyphs() {
                Ok(glyphs) => status_success(&format!(
                    "atlas updated ({})",
                    plural_count(glyphs.len(), "glyph")
                )),
                Err(_) => status_unchanged("waiting for glyph metrics"),
            },
        }
    }

    /// Queue a request with the current parameters.
    async fn regenerate(&mut self) {
        let request = GenerateRequest::from_params(&self.config.params);
        debug!("session"; "queued request for {} chars", request.text.chars().count());
        if let Err(e) = self.engine.request(request).await {
            status_error("generation unavailable", &e.to_string());
        }
    }

    async fn sync(&mut self) {
        let (image, glyphs) = match snapshot_atlas(self.engine.snapshot()) {
            Ok(atlas) => atlas,
            Err(e) => return status_error("sync skipped", &e.to_string()),
        };

        let options = SyncOptions::from(&self.config.sync);
        let document_name = self.config.sync.document_name.clone();
        let host = match self.host().await {
            Ok(host) => host,
            Err(e) => return status_error("sync failed", &format!("{e:#}")),
        };

        match synchronize(host, &image, &glyphs, &document_name, &options).await {
            Ok(report) => status_success(&describe_report(&report, &options.group_name)),
            Err(e) => {
                if let SyncError::HostCommandFailure {
                    cause: HostError::Unavailable(_),
                    ..
                } = &e
                {
                    // Reconnect on the next :sync
                    self.host = None;
                }
                status_error("sync failed", &e.to_string());
            }
        }
    }

    /// The connected host, connecting on first use.
    async fn host(&mut self) -> Result<&mut AnyHost> {
        let host = match self.host.take() {
            Some(host) => host,
            None => open_host(&self.config, self.simulate).await?,
        };
        Ok(self.host.insert(host))
    }

    fn export(&self, dir: Option<PathBuf>) {
        let snapshot = self.engine.snapshot();
        let (png, metrics) = match (snapshot.png_bytes(), snapshot.metrics()) {
            (Ok(png), Some(metrics)) => (png, metrics),
            (Err(e), _) => return status_error("export skipped", &e.to_string()),
            (_, None) => return status_error("export skipped", "no glyph metrics received yet"),
        };

        let dir = dir.unwrap_or_else(|| self.config.export.dir.clone());
        match write_atlas(&dir, &self.config.export.base_name, &png, metrics) {
            Ok(written) => status_success(&format!("exported {}", written.png.display())),
            Err(e) => status_error("export failed", &format!("{e:#}")),
        }
    }

    fn print_status(&self) {
        let snapshot = self.engine.snapshot();
        let params = &self.config.params;
        let engine = if self.engine.is_connected() { "connected" } else { "offline" };
        let host = match (&self.host, self.simulate) {
            (Some(_), true) => "simulated",
            (Some(_), false) => "connected",
            (None, _) => "not connected",
        };

        log!("session"; "engine {} ({})", engine, self.config.engine.url);
        log!("session"; "host {}", host);
        log!(
            "session";
            "text {:?}, font {}, size {}",
            params.text,
            params.font_path.as_ref().map_or(params.font.clone(), |p| p.display().to_string()),
            params.size
        );
        match snapshot.glyphs() {
            Ok(glyphs) if snapshot.is_complete() => log!(
                "session";
                "atlas {} after {}",
                plural_count(glyphs.placeable_count(), "placeable glyph"),
                plural_count(snapshot.updates() as usize, "update")
            ),
            _ => log!("session"; "no complete atlas yet"),
        }
        status_detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::net::TcpListener;

    #[test]
    fn test_parse_text_and_commands() {
        assert_eq!(Action::parse("Hello"), Action::Text("Hello".into()));
        assert_eq!(Action::parse("  "), Action::Empty);
        assert_eq!(Action::parse(":sync"), Action::Sync);
        assert_eq!(Action::parse(":q"), Action::Quit);
        assert_eq!(Action::parse(":status"), Action::Status);
        assert_eq!(Action::parse(":export"), Action::Export(None));
        assert_eq!(
            Action::parse(":export out/atlases"),
            Action::Export(Some(PathBuf::from("out/atlases")))
        );
    }

    #[test]
    fn test_parse_set_keeps_spaces_in_value() {
        assert_eq!(
            Action::parse(":set font Courier New"),
            Action::Set {
                key: "font".into(),
                value: "Courier New".into()
            }
        );
        assert!(matches!(Action::parse(":set size"), Action::Unknown(_)));
        assert!(matches!(Action::parse(":frobnicate"), Action::Unknown(_)));
    }

    fn offline_session() -> Session {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = AtlasConfig::default();
        config.engine = EngineConfig {
            url: format!("ws://{addr}"),
            reconnect_ms: 50,
            ..EngineConfig::default()
        };
        Session {
            engine: EngineChannel::open(&config.engine),
            config,
            host: None,
            simulate: true,
        }
    }

    #[tokio::test]
    async fn test_failed_actions_keep_the_session_running() {
        let mut session = offline_session();

        assert_eq!(session.handle(Action::Sync).await, Flow::Continue);
        assert!(session.host.is_none());

        let action = Action::Set {
            key: "size".into(),
            value: "big".into(),
        };
        assert_eq!(session.handle(action).await, Flow::Continue);
        assert_eq!(session.config.params.size, 32);

        assert_eq!(session.handle(Action::Quit).await, Flow::Quit);
    }

    #[tokio::test]
    async fn test_text_and_set_update_params() {
        let mut session = offline_session();

        session.handle(Action::Text("XYZ".into())).await;
        assert_eq!(session.config.params.text, "XYZ");

        let action = Action::Set {
            key: "size".into(),
            value: "48".into(),
        };
        session.handle(action).await;
        assert_eq!(session.config.params.size, 48);
    }
}
