use super::{EngineError, GenerateResponse};
use crate::codec::{base64, fnt};
use crate::core::{AtlasImage, GlyphSet};

/// Latest image and metrics received from the engine.
///
/// Each half is replaced independently: a frame carrying only metrics keeps
/// the previous image, and the other way round.
#[derive(Debug, Clone, Default)]
pub struct AtlasSnapshot {
    image: Option<String>,
    metrics: Option<String>,
    updates: u64,
}

impl AtlasSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a response. Returns whether anything changed.
    pub fn apply(&mut self, response: GenerateResponse) -> bool {
        let mut changed = false;
        if let Some(image) = response.image
            && !image.is_empty()
        {
            changed |= self.image.as_deref() != Some(image.as_str());
            self.image = Some(image);
        }
        if let Some(metrics) = response.fnt
            && !metrics.is_empty()
        {
            changed |= self.metrics.as_deref() != Some(metrics.as_str());
            self.metrics = Some(metrics);
        }
        if changed {
            self.updates += 1;
        }
        changed
    }

    pub fn image_base64(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn metrics(&self) -> Option<&str> {
        self.metrics.as_deref()
    }

    /// Number of responses that changed the snapshot.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn is_complete(&self) -> bool {
        self.image.is_some() && self.metrics.is_some()
    }

    /// Decoded PNG bytes.
    pub fn png_bytes(&self) -> Result<Vec<u8>, EngineError> {
        let encoded = self.image.as_deref().ok_or(EngineError::MissingImage)?;
        Ok(base64::decode(encoded)?)
    }

    /// Decoded image with dimensions read from its header.
    pub fn atlas_image(&self) -> Result<AtlasImage, EngineError> {
        Ok(AtlasImage::from_png(self.png_bytes()?)?)
    }

    pub fn glyphs(&self) -> Result<GlyphSet, EngineError> {
        let metrics = self.metrics.as_deref().ok_or(EngineError::MissingMetrics)?;
        Ok(fnt::parse(metrics))
    }
}
