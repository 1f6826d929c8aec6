//! Small formatting helpers.

/// `"1 glyph"`, `"3 glyphs"`, `"0 glyphs"`.
///
/// Nouns ending in `s`, `x` or `ch` take `es` (`"2 batches"`).
pub fn plural_count(count: usize, noun: &str) -> String {
    if count == 1 {
        return format!("1 {noun}");
    }
    let suffix = if noun.ends_with(['s', 'x']) || noun.ends_with("ch") {
        "es"
    } else {
        "s"
    };
    format!("{count} {noun}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "glyph"), "0 glyphs");
        assert_eq!(plural_count(1, "glyph"), "1 glyph");
        assert_eq!(plural_count(7, "batch"), "7 batches");
        assert_eq!(plural_count(1, "batch"), "1 batch");
    }
}
