//! Configuration section definitions.
//!
//! Each module corresponds to a section in `atlas.toml`:
//!
//! | Module   | TOML Section | Purpose                                  |
//! |----------|--------------|------------------------------------------|
//! | `engine` | `[engine]`   | Engine connection and request coalescing |
//! | `export` | `[export]`   | Export folder and file names             |
//! | `host`   | `[host]`     | Editor bridge connection                 |
//! | `params` | `[params]`   | Atlas design parameters                  |
//! | `sync`   | `[sync]`     | Layer names and batching                 |

mod engine;
mod export;
mod host;
mod params;
mod sync;

use std::path::{Path, PathBuf};

pub use engine::EngineConfig;
pub use export::ExportConfig;
pub use host::HostConfig;
pub use params::{ParamsConfig, Sizing};
pub use sync::SyncConfig;

use super::{ConfigDiagnostics, FieldPath};

/// Require a `ws://` or `wss://` URL with a host.
fn validate_ws_url(value: &str, field: FieldPath, diag: &mut ConfigDiagnostics) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") && url.has_host() => {}
        Ok(url) => diag.error_with_hint(
            field,
            format!("unsupported URL `{value}` (scheme `{}`)", url.scheme()),
            "use a websocket URL such as `ws://localhost:4567`",
        ),
        Err(e) => diag.error(field, format!("invalid URL `{value}`: {e}")),
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ws_url() {
        let field = FieldPath::new("engine.url");
        let mut diag = ConfigDiagnostics::new();
        validate_ws_url("ws://localhost:4567", field, &mut diag);
        validate_ws_url("wss://example.com/atlas", field, &mut diag);
        assert!(diag.is_empty());

        validate_ws_url("localhost:4567", field, &mut diag);
        validate_ws_url("not a url", field, &mut diag);
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_expand_tilde_keeps_plain_paths() {
        assert_eq!(expand_tilde(Path::new("out/atlas")), PathBuf::from("out/atlas"));
    }
}
