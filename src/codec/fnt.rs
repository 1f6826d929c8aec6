//! BMFont text metrics (`.fnt`) parsing.
//!
//! Only `char` records are read. The engine regenerates metrics on every
//! keystroke, so anything that does not look like a complete record is
//! skipped instead of failing the whole parse.
//!
//! ```text
//! info face="Arial" size=32 ...
//! page id=0 file="texture.png"
//! chars count=2
//! char id=65 x=0 y=0 width=10 height=10 xoffset=0 yoffset=0 xadvance=11 page=0 chnl=15
//! char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance=8 page=0 chnl=15
//! ```

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::core::{Glyph, GlyphSet};

/// Prefix that marks a glyph record line.
const RECORD_TAG: &str = "char";

static RE_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"char id=([0-9]+)[ \t]+x=([0-9]+)[ \t]+y=([0-9]+)[ \t]+width=([0-9]+)[ \t]+height=([0-9]+)")
        .unwrap()
});

static RE_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"file="[^"]*""#).unwrap());

/// Parse glyph rectangles from metrics text, in input order.
pub fn parse(text: &str) -> GlyphSet {
    text.lines()
        .filter(|line| line.starts_with(RECORD_TAG))
        .filter_map(parse_record)
        .collect()
}

/// Parse one `char` line. Values that overflow `u32` reject the record.
fn parse_record(line: &str) -> Option<Glyph> {
    let caps = RE_CHAR.captures(line)?;
    let field = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    Some(Glyph::new(field(1)?, field(2)?, field(3)?, field(4)?, field(5)?))
}

/// Point the first `file="…"` attribute at `file_name`.
///
/// Used on export so the metrics reference the exported image instead of
/// the engine's scratch texture name.
pub fn rewrite_file_reference(text: &str, file_name: &str) -> String {
    let replacement = format!("file=\"{file_name}\"");
    RE_FILE.replacen(text, 1, NoExpand(&replacement)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_records() {
        let glyphs = parse("char id=1 x=0 y=0 width=8 height=8\nchar id=2 x=8 y=0 width=4 height=6\n");
        assert_eq!(
            glyphs.as_slice(),
            &[Glyph::new(1, 0, 0, 8, 8), Glyph::new(2, 8, 0, 4, 6)]
        );
    }

    #[test]
    fn test_parse_mixed_input_keeps_only_valid_records() {
        let text = "\
info face=\"Arial\" size=32
common lineHeight=32 base=25 scaleW=64 scaleH=64 pages=1
page id=0 file=\"texture.png\"
chars count=4
char id=1 x=0 y=0 width=8 height=8
char id=2 x=oops y=0 width=8 height=8
char id=3 x=8 y=0
char id=4 x=16 y=0 width=8 height=8 xoffset=0 yoffset=0 xadvance=9 page=0 chnl=15
kerning first=1 second=4 amount=-1
  char id=5 x=0 y=0 width=8 height=8
";
        let ids: Vec<_> = parse(text).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_parse_preserves_input_order_and_duplicates() {
        let text = "char id=9 x=0 y=0 width=1 height=1\nchar id=3 x=1 y=0 width=1 height=1\nchar id=9 x=2 y=0 width=1 height=1";
        let ids: Vec<_> = parse(text).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![9, 3, 9]);
    }

    #[test]
    fn test_parse_keeps_zero_sized_records() {
        let glyphs = parse("char id=32 x=0 y=0 width=0 height=0\n");
        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs.placeable_count(), 0);
    }

    #[test]
    fn test_parse_crlf_lines() {
        let glyphs = parse("char id=1 x=0 y=0 width=2 height=2\r\nchar id=2 x=2 y=0 width=2 height=2\r\n");
        assert_eq!(glyphs.len(), 2);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse("").is_empty());
        assert!(parse("char\nchar id=\nchars count=0\nhello").is_empty());
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse("char id=99999999999 x=0 y=0 width=1 height=1").is_empty());
    }

    #[test]
    fn test_rewrite_file_reference() {
        let text = "page id=0 file=\"texture.png\"\nchar id=1 x=0 y=0 width=1 height=1";
        let rewritten = rewrite_file_reference(text, "atlas.png");
        assert_eq!(
            rewritten,
            "page id=0 file=\"atlas.png\"\nchar id=1 x=0 y=0 width=1 height=1"
        );
    }

    #[test]
    fn test_rewrite_file_reference_first_only_and_literal() {
        let text = "page id=0 file=\"a.png\"\npage id=1 file=\"b.png\"";
        let rewritten = rewrite_file_reference(text, "$1.png");
        assert_eq!(rewritten, "page id=0 file=\"$1.png\"\npage id=1 file=\"b.png\"");
    }

    #[test]
    fn test_rewrite_without_reference_is_identity() {
        assert_eq!(rewrite_file_reference("char id=1", "x.png"), "char id=1");
    }
}
