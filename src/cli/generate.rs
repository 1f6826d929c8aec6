//! `atlas generate`: one request, one export.

use anyhow::{Context, Result};

use super::common::fetch_atlas;
use crate::config::AtlasConfig;
use crate::export::write_atlas;
use crate::log;
use crate::utils::plural_count;

pub async fn generate(config: &AtlasConfig) -> Result<()> {
    let snapshot = fetch_atlas(config).await?;

    let png = snapshot.png_bytes().context("engine sent an unreadable image")?;
    let glyphs = snapshot.glyphs()?;
    let metrics = snapshot.metrics().unwrap_or_default();

    let written = write_atlas(&config.export.dir, &config.export.base_name, &png, metrics)?;
    log!(
        "export";
        "{} ({}) and {}",
        written.png.display(),
        plural_count(glyphs.len(), "glyph"),
        written.fnt.display()
    );
    Ok(())
}
