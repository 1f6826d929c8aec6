//! `atlas sync`: slice one atlas into the host document.

use std::path::Path;

use anyhow::Result;

use super::common::{describe_report, fetch_atlas, load_local_atlas, open_host, snapshot_atlas};
use crate::config::AtlasConfig;
use crate::host::AnyHost;
use crate::log;
use crate::sync::{SyncOptions, synchronize};

/// Run one synchronization.
///
/// The atlas comes from `image` + `fnt` when both are given, otherwise
/// from a single engine request.
pub async fn sync_atlas(
    config: &AtlasConfig,
    simulate: bool,
    image: Option<&Path>,
    fnt: Option<&Path>,
) -> Result<()> {
    let (image, glyphs) = match (image, fnt) {
        (Some(image), Some(fnt)) => load_local_atlas(image, fnt)?,
        _ => snapshot_atlas(&fetch_atlas(config).await?)?,
    };

    let mut host = open_host(config, simulate).await?;
    let options = SyncOptions::from(&config.sync);
    let report = synchronize(
        &mut host,
        &image,
        &glyphs,
        &config.sync.document_name,
        &options,
    )
    .await?;

    log!("sync"; "{}", describe_report(&report, &options.group_name));

    if let AnyHost::Simulated(sim) = &host
        && let Some(document) = sim.document()
    {
        println!("{} ({}x{})", document.name, document.width, document.height);
        print!("{}", document.outline());
    }
    Ok(())
}
