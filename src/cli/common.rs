//! Helpers shared by the subcommands.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::codec::fnt;
use crate::config::AtlasConfig;
use crate::core::{AtlasImage, GlyphSet};
use crate::engine::{AtlasSnapshot, EngineChannel, GenerateRequest};
use crate::host::{AnyHost, RemoteHost, SimulatedHost};
use crate::log;
use crate::sync::SyncReport;
use crate::utils::plural_count;

/// Open the host: an in-memory document with `simulate`, else the bridge.
pub async fn open_host(config: &AtlasConfig, simulate: bool) -> Result<AnyHost> {
    if simulate {
        crate::debug!("host"; "using simulated document");
        return Ok(AnyHost::Simulated(SimulatedHost::new()));
    }

    let timeout = Duration::from_millis(config.host.timeout_ms);
    let host = RemoteHost::connect(&config.host.url, timeout)
        .await
        .context("failed to connect to the editor")?;
    Ok(AnyHost::Remote(host))
}

/// Request one atlas from the engine and wait until both halves arrived.
pub async fn fetch_atlas(config: &AtlasConfig) -> Result<AtlasSnapshot> {
    let mut engine = EngineChannel::open(&config.engine);
    let request = GenerateRequest::from_params(&config.params);
    let timeout = Duration::from_millis(config.engine.response_timeout_ms);

    log!("engine"; "requesting atlas from {}", config.engine.url);
    let snapshot = engine
        .fetch(request, timeout)
        .await
        .context("generation failed")?;
    Ok(snapshot.clone())
}

/// Decode the image and parse the metrics of a complete snapshot.
pub fn snapshot_atlas(snapshot: &AtlasSnapshot) -> Result<(AtlasImage, GlyphSet)> {
    let image = snapshot.atlas_image()?;
    let glyphs = snapshot.glyphs()?;
    Ok((image, glyphs))
}

/// Read an atlas PNG and its metrics file from disk.
pub fn load_local_atlas(image: &Path, metrics: &Path) -> Result<(AtlasImage, GlyphSet)> {
    let bytes =
        std::fs::read(image).with_context(|| format!("failed to read `{}`", image.display()))?;
    let image = AtlasImage::from_png(bytes)
        .with_context(|| format!("`{}` is not a valid PNG", image.display()))?;
    let glyphs = read_metrics(metrics)?;
    Ok((image, glyphs))
}

pub fn read_metrics(path: &Path) -> Result<GlyphSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    Ok(fnt::parse(&text))
}

/// One-line summary of a finished run.
pub fn describe_report(report: &SyncReport, group: &str) -> String {
    let mut message = format!(
        "synced {} into {} ({})",
        plural_count(report.glyph_layers, "glyph"),
        group,
        plural_count(report.chunks, "batch")
    );
    if report.skipped > 0 {
        message.push_str(&format!(", skipped {} empty", report.skipped));
    }
    if report.created_document {
        message.push_str(", new document");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_png;
    use tempfile::TempDir;

    #[test]
    fn test_load_local_atlas() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("a.png");
        let metrics = dir.path().join("a.fnt");
        std::fs::write(&png, test_png(16, 8)).unwrap();
        std::fs::write(&metrics, "char id=65 x=0 y=0 width=8 height=8\n").unwrap();

        let (image, glyphs) = load_local_atlas(&png, &metrics).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
        assert_eq!(glyphs.len(), 1);
    }

    #[test]
    fn test_load_local_atlas_rejects_non_png() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("a.png");
        let metrics = dir.path().join("a.fnt");
        std::fs::write(&png, b"not an image").unwrap();
        std::fs::write(&metrics, "").unwrap();

        let err = load_local_atlas(&png, &metrics).unwrap_err();
        assert!(err.to_string().contains("not a valid PNG"));
    }

    #[test]
    fn test_describe_report() {
        let report = SyncReport {
            glyph_layers: 1,
            skipped: 2,
            chunks: 1,
            created_document: true,
        };
        assert_eq!(
            describe_report(&report, "Atlas_Glyphs"),
            "synced 1 glyph into Atlas_Glyphs (1 batch), skipped 2 empty, new document"
        );
    }
}
