//! Atlas image and glyph rectangle types.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;
use serde::{Deserialize, Serialize};

/// A decoded atlas bitmap with its pixel dimensions.
///
/// Invariants:
/// - Immutable after construction (bytes are shared, never mutated)
/// - `width`/`height` describe the bitmap encoded in `bytes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasImage {
    width: u32,
    height: u32,
    bytes: Arc<[u8]>,
}

impl AtlasImage {
    /// Create from raw bytes with known dimensions.
    pub fn new(width: u32, height: u32, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            bytes: bytes.into(),
        }
    }

    /// Create from PNG bytes, reading dimensions from the image header.
    pub fn from_png(bytes: Vec<u8>) -> image::ImageResult<Self> {
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self::new(width, height, bytes))
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One glyph's rectangle within the atlas, in image pixel space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Glyph {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Glyph {
    pub const fn new(id: u32, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { id, x, y, w, h }
    }

    /// Whether the glyph covers any pixels (zero-area glyphs are skipped).
    #[inline]
    pub const fn is_placeable(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Name of the layer this glyph is sliced into.
    pub fn layer_name(&self) -> String {
        format!("Glyph_{}", self.id)
    }

    /// Rectangle covered by this glyph.
    pub const fn rect(&self) -> Rect {
        Rect {
            top: self.y,
            left: self.x,
            bottom: self.y.saturating_add(self.h),
            right: self.x.saturating_add(self.w),
        }
    }
}

/// Pixel rectangle with exclusive bottom/right edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl Rect {
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self {
            top: 0,
            left: 0,
            bottom: height,
            right: width,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bottom <= self.top || self.right <= self.left
    }

    /// Overlapping area of two rectangles (may be empty).
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            top: self.top.max(other.top),
            left: self.left.max(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.min(other.right),
        }
    }
}

/// Glyphs in source-text order.
///
/// Order decides layer creation order, so identical input always yields
/// identical stacking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphSet(Vec<Glyph>);

impl GlyphSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Glyph> {
        self.0.iter()
    }

    /// Glyphs with non-zero area, in order.
    pub fn placeable(&self) -> impl Iterator<Item = &Glyph> {
        self.0.iter().filter(|g| g.is_placeable())
    }

    pub fn placeable_count(&self) -> usize {
        self.placeable().count()
    }

    pub fn as_slice(&self) -> &[Glyph] {
        &self.0
    }
}

impl FromIterator<Glyph> for GlyphSet {
    fn from_iter<I: IntoIterator<Item = Glyph>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Glyph>> for GlyphSet {
    fn from(glyphs: Vec<Glyph>) -> Self {
        Self(glyphs)
    }
}

impl<'a> IntoIterator for &'a GlyphSet {
    type Item = &'a Glyph;
    type IntoIter = std::slice::Iter<'a, Glyph>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::core::test_png`)
// ============================================================================

/// Encode a fully transparent PNG of the given size.
#[cfg(test)]
pub fn test_png(width: u32, height: u32) -> Vec<u8> {
    let buffer = image::RgbaImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    buffer.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
