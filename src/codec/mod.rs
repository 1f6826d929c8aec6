//! Payload codecs: base64 image transport and BMFont glyph metrics.

pub mod base64;
pub mod fnt;

pub use self::base64::DecodeError;
