//! `atlas inspect`: list the glyphs of a metrics file.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use super::common::read_metrics;
use crate::core::{Glyph, GlyphSet};
use crate::log;
use crate::utils::plural_count;

#[derive(Debug, Serialize)]
struct GlyphEntry {
    #[serde(flatten)]
    glyph: Glyph,
    layer: String,
    placeable: bool,
}

pub fn inspect(path: &Path, json: bool) -> Result<()> {
    let glyphs = read_metrics(path)?;

    if json {
        println!("{}", to_json(&glyphs)?);
        return Ok(());
    }

    for glyph in glyphs.iter() {
        let line = format!(
            "{:<12} x={:<5} y={:<5} {}x{}",
            glyph.layer_name(),
            glyph.x,
            glyph.y,
            glyph.w,
            glyph.h
        );
        if glyph.is_placeable() {
            println!("{line}");
        } else {
            println!("{} {}", line.dimmed(), "(skipped)".dimmed());
        }
    }

    let skipped = glyphs.len() - glyphs.placeable_count();
    log!(
        "inspect";
        "{} placeable, {} skipped",
        plural_count(glyphs.placeable_count(), "glyph"),
        skipped
    );
    Ok(())
}

fn to_json(glyphs: &GlyphSet) -> Result<String> {
    let entries: Vec<_> = glyphs
        .iter()
        .map(|glyph| GlyphEntry {
            glyph: *glyph,
            layer: glyph.layer_name(),
            placeable: glyph.is_placeable(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fnt;

    #[test]
    fn test_json_marks_skipped_glyphs() {
        let glyphs = fnt::parse(
            "char id=65 x=1 y=2 width=8 height=9\nchar id=32 x=0 y=0 width=0 height=0\n",
        );
        let value: serde_json::Value = serde_json::from_str(&to_json(&glyphs).unwrap()).unwrap();

        assert_eq!(value[0]["id"], 65);
        assert_eq!(value[0]["x"], 1);
        assert_eq!(value[0]["layer"], "Glyph_65");
        assert_eq!(value[0]["placeable"], true);
        assert_eq!(value[1]["placeable"], false);
    }
}
