//! `[export]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [export]
//! dir = "~/atlases"     # Output folder (created if missing)
//! base_name = "atlas"   # Writes atlas.png and atlas.fnt
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub base_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            base_name: "atlas".into(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let field = FieldPath::new("export.base_name");
        if self.base_name.trim().is_empty() {
            diag.error(field, "must not be empty");
        } else if self.base_name.contains(['/', '\\']) {
            diag.error_with_hint(
                field,
                "must be a file name, not a path",
                "put the folder in `export.dir`",
            );
        }
    }

    /// Expand `~` in `dir`.
    pub fn expand_paths(&mut self) {
        self.dir = super::expand_tilde(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_export_config() {
        let config = test_parse_config("[export]\ndir = \"out\"\nbase_name = \"pixel\"");
        assert_eq!(config.export.dir, PathBuf::from("out"));
        assert_eq!(config.export.base_name, "pixel");
    }

    #[test]
    fn test_export_base_name_must_be_file_name() {
        let config = ExportConfig {
            base_name: "fonts/pixel".into(),
            ..ExportConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert!(diag.errors()[0].hint.is_some());
    }
}
