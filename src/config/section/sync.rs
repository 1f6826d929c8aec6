//! `[sync]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [sync]
//! chunk_size = 30                       # Glyph operations per host batch
//! document_name = "Atlas"               # Name for a newly created document
//! group_name = "Atlas_Glyphs"           # Layer group holding the glyph layers
//! source_layer = "AtlasSource"          # Temporary layer holding the atlas
//! placeholder_layer = "Temp_Safe_Layer" # Keeps the document non-empty while wiping
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub chunk_size: usize,
    pub document_name: String,
    pub group_name: String,
    pub source_layer: String,
    pub placeholder_layer: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: 30,
            document_name: "Atlas".into(),
            group_name: "Atlas_Glyphs".into(),
            source_layer: "AtlasSource".into(),
            placeholder_layer: "Temp_Safe_Layer".into(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.chunk_size == 0 {
            diag.error_with_hint(
                FieldPath::new("sync.chunk_size"),
                "must be greater than 0",
                "30 is known to stay within host limits",
            );
        }

        let names = [
            (FieldPath::new("sync.document_name"), &self.document_name),
            (FieldPath::new("sync.group_name"), &self.group_name),
            (FieldPath::new("sync.source_layer"), &self.source_layer),
            (FieldPath::new("sync.placeholder_layer"), &self.placeholder_layer),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                diag.error(field, "name must not be empty");
            }
        }

        // Slicing selects the source by name; a clash would pick the wrong layer
        if self.source_layer == self.placeholder_layer {
            diag.error(
                FieldPath::new("sync.placeholder_layer"),
                "must differ from `sync.source_layer`",
            );
        }
        if self.source_layer.starts_with("Glyph_") {
            diag.error(
                FieldPath::new("sync.source_layer"),
                "must not use the `Glyph_` prefix reserved for glyph layers",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_sync_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.sync.chunk_size, 30);
        assert_eq!(config.sync.group_name, "Atlas_Glyphs");
        assert_eq!(config.sync.source_layer, "AtlasSource");
        assert_eq!(config.sync.placeholder_layer, "Temp_Safe_Layer");
    }

    #[test]
    fn test_sync_config_validation() {
        let config = SyncConfig {
            chunk_size: 0,
            group_name: " ".into(),
            placeholder_layer: "AtlasSource".into(),
            ..SyncConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert_eq!(diag.len(), 3);
    }
}
