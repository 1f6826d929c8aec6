//! Document synchronization.
//!
//! Turns one generation result (atlas image + glyph rectangles) into a
//! predictable layer structure inside the host document:
//!
//! ```text
//! Atlas_Glyphs/
//!   Glyph_65
//!   Glyph_66
//!   ...
//! ```
//!
//! The host has no transactions, so the run is a fixed sequence of phases
//! that converges from any starting state instead of rolling back:
//!
//! 1. prepare target: create or resize the document, then wipe it
//! 2. place atlas: import the image as the source layer
//! 3. discard placeholder: drop the layer that kept the wipe non-empty
//! 4. slice glyphs: copy each glyph rectangle into its own layer
//! 5. finalize: delete the source layer and group the glyph layers
//!
//! A failed run leaves the document partially modified; running again
//! wipes whatever is left and reaches the same end state.

mod error;

#[cfg(test)]
mod tests;

use crate::config::SyncConfig;
use crate::core::{AtlasImage, GlyphSet};
use crate::host::{Command, Host, HostError, ImageToken, SelectMode};
use crate::log;

pub use error::{Phase, SyncError};

/// Naming and batching knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Glyph operations per host batch.
    pub chunk_size: usize,
    /// Layer section holding the glyph layers.
    pub group_name: String,
    /// Layer holding the placed atlas while slicing.
    pub source_layer: String,
    /// Layer keeping the document non-empty during the wipe.
    pub placeholder_layer: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            group_name: config.group_name.clone(),
            source_layer: config.source_layer.clone(),
            placeholder_layer: config.placeholder_layer.clone(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Glyph layers created.
    pub glyph_layers: usize,
    /// Glyphs skipped for zero width or height.
    pub skipped: usize,
    /// Host batches used for slicing.
    pub chunks: usize,
    /// Whether the run had to create the document.
    pub created_document: bool,
}

/// Synchronize `image` and `glyphs` into the host document.
///
/// Borrowing the host mutably keeps host calls strictly serialized for the
/// whole run.
pub async fn synchronize<H: Host>(
    host: &mut H,
    image: &AtlasImage,
    glyphs: &GlyphSet,
    session_name: &str,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    if image.is_empty() {
        return Err(SyncError::MissingInput("atlas image"));
    }
    let placeable = glyphs.placeable_count();
    if placeable == 0 {
        return Err(SyncError::MissingInput("no glyph with a non-zero size"));
    }

    let mut session = SyncSession::new(host, options);
    let result = session.run_phases(image, glyphs, session_name).await;
    session.release_staged().await;

    let (created_document, chunks) = result?;
    Ok(SyncReport {
        glyph_layers: placeable,
        skipped: glyphs.len() - placeable,
        chunks,
        created_document,
    })
}

// ============================================================================
// Session
// ============================================================================

/// State of one run. Dropped when `synchronize` returns.
struct SyncSession<'a, H> {
    host: &'a mut H,
    options: &'a SyncOptions,
    /// Name of the placeholder, once created.
    placeholder: Option<String>,
    /// Staged atlas resource, once staged.
    token: Option<ImageToken>,
    source_created: bool,
}

impl<'a, H: Host> SyncSession<'a, H> {
    fn new(host: &'a mut H, options: &'a SyncOptions) -> Self {
        Self {
            host,
            options,
            placeholder: None,
            token: None,
            source_created: false,
        }
    }

    /// Run a structural batch; any failure is fatal.
    async fn run(&mut self, phase: Phase, commands: &[Command]) -> Result<(), SyncError> {
        self.host
            .execute_batch(commands)
            .await
            .map_err(|cause| SyncError::host(phase, cause))
    }

    /// Run a cleanup batch. Returns `false` when the target was already gone.
    async fn run_cleanup(&mut self, phase: Phase, commands: &[Command]) -> Result<bool, SyncError> {
        match self.host.execute_batch(commands).await {
            Ok(()) => Ok(true),
            Err(cause) if cause.is_absence() => {
                crate::debug!("sync"; "{}: nothing to clean up ({})", phase.name(), cause);
                Ok(false)
            }
            Err(cause) => Err(SyncError::host(phase, cause)),
        }
    }

    /// All five phases. Returns whether a document was created and the
    /// number of slicing batches.
    async fn run_phases(
        &mut self,
        image: &AtlasImage,
        glyphs: &GlyphSet,
        session_name: &str,
    ) -> Result<(bool, usize), SyncError> {
        log!("sync"; "{}", Phase::PrepareTarget);
        let created_document = self.prepare_target(image, session_name).await?;

        log!("sync"; "{}", Phase::PlaceAtlas);
        self.place_atlas(image).await?;

        if self.placeholder.is_some() {
            log!("sync"; "{}", Phase::DiscardPlaceholder);
            self.discard_placeholder().await?;
        }

        log!("sync"; "{}: {} glyphs", Phase::SliceGlyphs, glyphs.placeable_count());
        let chunks = self.slice_glyphs(glyphs).await?;

        log!("sync"; "{}", Phase::Finalize);
        self.finalize().await?;

        Ok((created_document, chunks))
    }

    /// Phase 1. Returns whether a new document was created.
    async fn prepare_target(&mut self, image: &AtlasImage, name: &str) -> Result<bool, SyncError> {
        let phase = Phase::PrepareTarget;
        let exists = self
            .host
            .has_document()
            .await
            .map_err(|cause| SyncError::host(phase, cause))?;

        if !exists {
            self.run(
                phase,
                &[Command::CreateDocument {
                    name: name.to_string(),
                    width: image.width(),
                    height: image.height(),
                }],
            )
            .await?;
        }

        let existing = self.layer_names(phase).await?;
        let Some(topmost) = existing.first().cloned() else {
            if exists {
                self.run(
                    phase,
                    &[Command::ResizeImage {
                        width: image.width(),
                        height: image.height(),
                    }],
                )
                .await?;
            }
            return Ok(!exists);
        };
        let placeholder = unique_name(&self.options.placeholder_layer, &existing);
        crate::debug!("sync"; "wiping {} top-level layers", existing.len());

        let mut commands = Vec::with_capacity(4);
        if exists {
            commands.push(Command::ResizeImage {
                width: image.width(),
                height: image.height(),
            });
        }
        // New layers land above the active one; anchor on a top-level layer
        // so the placeholder never ends up inside a group
        commands.extend([
            Command::select(topmost),
            Command::MakeLayer,
            Command::RenameActive {
                name: placeholder.clone(),
            },
        ]);
        self.run(phase, &commands).await?;
        self.placeholder = Some(placeholder.clone());

        self.run(
            phase,
            &[
                Command::SelectAllLayers,
                Command::SelectLayer {
                    name: placeholder.clone(),
                    mode: SelectMode::Exclude,
                    make_visible: false,
                },
            ],
        )
        .await?;
        // Empty selection means the placeholder was alone already
        self.run_cleanup(phase, &[Command::DeleteSelected]).await?;

        let remaining = self.layer_names(phase).await?;
        if remaining != [placeholder.as_str()] {
            return Err(SyncError::host(
                phase,
                HostError::failed(
                    "delete",
                    format!("wipe left {} layers besides the placeholder", remaining.len().saturating_sub(1)),
                ),
            ));
        }
        Ok(!exists)
    }

    /// Phase 2.
    async fn place_atlas(&mut self, image: &AtlasImage) -> Result<(), SyncError> {
        let phase = Phase::PlaceAtlas;
        let token = self
            .host
            .stage_image(image.bytes())
            .await
            .map_err(|cause| SyncError::host(phase, cause))?;
        crate::debug!("sync"; "staged atlas as {}", token.as_str());
        self.token = Some(token.clone());

        self.run(
            phase,
            &[
                Command::PlaceImage { token },
                Command::RasterizeActive,
                Command::RenameActive {
                    name: self.options.source_layer.clone(),
                },
            ],
        )
        .await?;
        self.source_created = true;
        Ok(())
    }

    /// Phase 3.
    async fn discard_placeholder(&mut self) -> Result<(), SyncError> {
        let Some(placeholder) = self.placeholder.take() else {
            return Ok(());
        };
        self.run_cleanup(
            Phase::DiscardPlaceholder,
            &[Command::select(placeholder), Command::DeleteSelected],
        )
        .await?;
        Ok(())
    }

    /// Phase 4. Returns the number of batches issued.
    async fn slice_glyphs(&mut self, glyphs: &GlyphSet) -> Result<usize, SyncError> {
        let chunk_size = self.options.chunk_size.max(1);
        let placeable: Vec<_> = glyphs.placeable().collect();
        let mut chunks = 0;

        for chunk in placeable.chunks(chunk_size) {
            let mut commands = Vec::with_capacity(chunk.len() * 4);
            for glyph in chunk {
                commands.push(Command::SelectLayer {
                    name: self.options.source_layer.clone(),
                    mode: SelectMode::Replace,
                    make_visible: true,
                });
                commands.push(Command::SetMarquee(glyph.rect()));
                commands.push(Command::CopyToLayer);
                commands.push(Command::RenameActive {
                    name: glyph.layer_name(),
                });
            }
            chunks += 1;
            crate::debug!("sync"; "chunk {}: {} glyphs", chunks, chunk.len());
            self.run(Phase::SliceGlyphs, &commands).await?;
        }
        Ok(chunks)
    }

    /// Phase 5.
    async fn finalize(&mut self) -> Result<(), SyncError> {
        let phase = Phase::Finalize;
        if self.source_created {
            let source = self.options.source_layer.clone();
            self.run_cleanup(phase, &[Command::select(source), Command::DeleteSelected])
                .await?;
            self.source_created = false;
        }
        self.run(
            phase,
            &[
                Command::ClearMarquee,
                Command::SelectAllLayers,
                Command::GroupSelected {
                    name: self.options.group_name.clone(),
                },
            ],
        )
        .await
    }

    /// Drop the staged atlas, whether or not the run succeeded.
    async fn release_staged(&mut self) {
        if let Some(token) = self.token.take()
            && let Err(e) = self.host.release(&token).await
        {
            crate::debug!("sync"; "could not release {}: {}", token.as_str(), e);
        }
    }

    async fn layer_names(&mut self, phase: Phase) -> Result<Vec<String>, SyncError> {
        self.host
            .layer_names()
            .await
            .map_err(|cause| SyncError::host(phase, cause))
    }
}

/// `base`, or `base_N` for the first N not already taken.
fn unique_name(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|name| name == base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
