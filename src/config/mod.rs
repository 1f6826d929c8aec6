//! Configuration management for `atlas.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── engine     # [engine]
//! │   ├── export     # [export]
//! │   ├── host       # [host]
//! │   ├── params     # [params]
//! │   └── sync       # [sync]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # AtlasConfig (this file)
//! ```
//!
//! The file is optional: without one every section uses its defaults.
//! Command-line flags override file values.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{EngineConfig, ExportConfig, HostConfig, ParamsConfig, Sizing, SyncConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands, EngineArgs, ExportArgs, HostArgs, ParamArgs, SyncArgs};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing atlas.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Engine connection
    #[serde(default)]
    pub engine: EngineConfig,

    /// Design parameters for generation requests
    #[serde(default)]
    pub params: ParamsConfig,

    /// Layer naming and batching
    #[serde(default)]
    pub sync: SyncConfig,

    /// Editor bridge connection
    #[serde(default)]
    pub host: HostConfig,

    /// Export destination
    #[serde(default)]
    pub export: ExportConfig,
}

impl AtlasConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file, applies command-line
    /// overrides, then validates.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config, &cwd) {
            Some(path) => {
                crate::debug!("config"; "using {}", path.display());
                let mut config = Self::from_path(&path)?;
                config.config_path = Some(path);
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self::default()
            }
        };

        config.apply_command_options(cli);
        config.params.expand_paths();
        config.export.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Generate {
                params,
                engine,
                export,
            } => {
                self.apply_param_args(params);
                self.apply_engine_args(engine);
                self.apply_export_args(export);
            }
            Commands::Sync {
                params,
                engine,
                host,
                sync,
                ..
            } => {
                self.apply_param_args(params);
                self.apply_engine_args(engine);
                self.apply_host_args(host);
                self.apply_sync_args(sync);
            }
            Commands::Session {
                params,
                engine,
                host,
                sync,
                export,
            } => {
                self.apply_param_args(params);
                self.apply_engine_args(engine);
                self.apply_host_args(host);
                self.apply_sync_args(sync);
                self.apply_export_args(export);
            }
            // Inspect reads a file and needs no config
            Commands::Inspect { .. } => {}
        }
    }

    fn apply_param_args(&mut self, args: &ParamArgs) {
        let p = &mut self.params;
        Self::update_option(&mut p.text, args.text.as_ref());
        if let Some(font) = &args.font {
            p.font = font.clone();
            p.font_path = None;
        }
        if args.font_path.is_some() {
            p.font_path = args.font_path.clone();
        }
        Self::update_option(&mut p.size, args.size.as_ref());
        Self::update_option(&mut p.width, args.width.as_ref());
        Self::update_option(&mut p.padding, args.padding.as_ref());
        Self::update_option(&mut p.spacing, args.spacing.as_ref());
        Self::update_option(&mut p.effect_padding, args.effect_padding.as_ref());
        Self::update_option(&mut p.sizing, args.sizing.as_ref());
        Self::update_option(&mut p.global_x_advance, args.global_x_advance.as_ref());
        Self::update_option(&mut p.global_x_offset, args.global_x_offset.as_ref());
        Self::update_option(&mut p.global_y_offset, args.global_y_offset.as_ref());
    }

    fn apply_engine_args(&mut self, args: &EngineArgs) {
        Self::update_option(&mut self.engine.url, args.url.as_ref());
    }

    fn apply_host_args(&mut self, args: &HostArgs) {
        Self::update_option(&mut self.host.url, args.url.as_ref());
    }

    fn apply_sync_args(&mut self, args: &SyncArgs) {
        Self::update_option(&mut self.sync.chunk_size, args.chunk_size.as_ref());
        Self::update_option(&mut self.sync.group_name, args.group.as_ref());
        Self::update_option(&mut self.sync.document_name, args.document.as_ref());
    }

    fn apply_export_args(&mut self, args: &ExportArgs) {
        Self::update_option(&mut self.export.dir, args.out.as_ref());
        Self::update_option(&mut self.export.base_name, args.name.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.engine.validate(&mut diag);
        self.params.validate(&mut diag);
        self.sync.validate(&mut diag);
        self.host.validate(&mut diag);
        self.export.validate(&mut diag);

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AtlasConfig {
    let (parsed, ignored) = AtlasConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_invalid_toml() {
        let result = AtlasConfig::parse_with_ignored("[engine\nurl = \"ws://x\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AtlasConfig::default();
        assert!(config.config_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[sync]\nchunk_size = 10\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = AtlasConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.sync.chunk_size, 10);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_validation_collects_all_sections() {
        let mut config = test_parse_config(
            "[engine]\nurl = \"http://x\"\n[sync]\nchunk_size = 0\n[export]\nbase_name = \"\"",
        );
        config.params.size = 0;
        let Err(ConfigError::Diagnostics(diag)) = config.validate() else {
            panic!("expected diagnostics");
        };
        let sections: Vec<_> = diag.errors().iter().map(|d| d.field.section()).collect();
        assert_eq!(sections, vec!["engine", "params", "sync", "export"]);
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = test_parse_config(
            "[params]\ntext = \"from file\"\nsize = 20\n[sync]\nchunk_size = 5\ngroup_name = \"File\"",
        );
        let cli = Cli::try_parse_from([
            "atlas",
            "sync",
            "--text",
            "from flag",
            "--chunk-size",
            "12",
            "--host",
            "ws://editor:1",
        ])
        .unwrap();
        config.apply_command_options(&cli);

        assert_eq!(config.params.text, "from flag");
        assert_eq!(config.params.size, 20);
        assert_eq!(config.sync.chunk_size, 12);
        assert_eq!(config.sync.group_name, "File");
        assert_eq!(config.host.url, "ws://editor:1");
    }

    #[test]
    fn test_font_flag_clears_font_path() {
        let mut config = test_parse_config("[params]\nfont_path = \"a.ttf\"");
        let cli = Cli::try_parse_from(["atlas", "generate", "--font", "Verdana"]).unwrap();
        config.apply_command_options(&cli);
        assert_eq!(config.params.font, "Verdana");
        assert!(config.params.font_path.is_none());
    }
}
