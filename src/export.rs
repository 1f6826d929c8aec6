//! Writing a generated atlas to disk.
//!
//! The metrics file names its texture, so the `file="…"` attribute is
//! rewritten to match the exported PNG.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::codec::fnt;

/// Paths of the files written by [`write_atlas`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedAtlas {
    pub png: PathBuf,
    pub fnt: PathBuf,
}

/// Write `<base_name>.png` and `<base_name>.fnt` into `dir`.
///
/// Creates `dir` if needed; existing files are overwritten.
pub fn write_atlas(dir: &Path, base_name: &str, png: &[u8], metrics: &str) -> Result<ExportedAtlas> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export folder `{}`", dir.display()))?;

    let png_name = format!("{base_name}.png");
    let png_path = dir.join(&png_name);
    let fnt_path = dir.join(format!("{base_name}.fnt"));

    fs::write(&png_path, png)
        .with_context(|| format!("failed to write `{}`", png_path.display()))?;

    let metrics = fnt::rewrite_file_reference(metrics, &png_name);
    fs::write(&fnt_path, metrics)
        .with_context(|| format!("failed to write `{}`", fnt_path.display()))?;

    crate::debug!("export"; "wrote {} and {}", png_path.display(), fnt_path.display());
    Ok(ExportedAtlas {
        png: png_path,
        fnt: fnt_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const METRICS: &str = "info face=\"Arial\" size=32\n\
                           page id=0 file=\"texture.png\"\n\
                           char id=65 x=0 y=0 width=10 height=12\n";

    #[test]
    fn test_write_atlas_creates_folder() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/out");

        let written = write_atlas(&out, "pixel", b"png-bytes", METRICS).unwrap();

        assert_eq!(written.png, out.join("pixel.png"));
        assert_eq!(written.fnt, out.join("pixel.fnt"));
        assert_eq!(fs::read(&written.png).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_write_atlas_rewrites_texture_reference() {
        let dir = TempDir::new().unwrap();
        let written = write_atlas(dir.path(), "pixel", b"x", METRICS).unwrap();

        let text = fs::read_to_string(written.fnt).unwrap();
        assert!(text.contains("file=\"pixel.png\""));
        assert!(!text.contains("texture.png"));
        assert!(text.contains("char id=65"));
    }

    #[test]
    fn test_write_atlas_overwrites() {
        let dir = TempDir::new().unwrap();
        write_atlas(dir.path(), "atlas", b"old", METRICS).unwrap();
        let written = write_atlas(dir.path(), "atlas", b"new", METRICS).unwrap();
        assert_eq!(fs::read(written.png).unwrap(), b"new");
    }
}
