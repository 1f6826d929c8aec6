//! Core types - pure abstractions shared across the codebase.

mod atlas;
mod state;

pub use atlas::{AtlasImage, Glyph, GlyphSet, Rect};
pub use state::{is_shutdown, register_session, setup_shutdown_handler};

#[cfg(test)]
pub use atlas::test_png;
