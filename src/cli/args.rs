//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Sizing;

/// Glyph atlas generator and document synchronizer
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: atlas.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "atlas.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Request one atlas from the engine and export it
    #[command(visible_alias = "g")]
    Generate {
        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Slice an atlas into glyph layers of the host document
    #[command(visible_alias = "s")]
    Sync {
        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        host: HostArgs,

        #[command(flatten)]
        sync: SyncArgs,

        /// Atlas PNG to use instead of asking the engine
        #[arg(long, requires = "fnt", value_hint = clap::ValueHint::FilePath)]
        image: Option<PathBuf>,

        /// Metrics (.fnt) file to use instead of asking the engine
        #[arg(long, requires = "image", value_hint = clap::ValueHint::FilePath)]
        fnt: Option<PathBuf>,
    },

    /// List the glyphs in a metrics file
    #[command(visible_alias = "i")]
    Inspect {
        /// Metrics (.fnt) file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        fnt: PathBuf,

        /// Print glyphs as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Interactive session: type text, preview updates, sync on demand
    Session {
        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        host: HostArgs,

        #[command(flatten)]
        sync: SyncArgs,

        #[command(flatten)]
        export: ExportArgs,
    },
}

/// Design parameter overrides, shared by engine-facing commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Characters to render
    #[arg(short, long)]
    pub text: Option<String>,

    /// Font family name
    #[arg(short, long)]
    pub font: Option<String>,

    /// Font file (overrides --font)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub font_path: Option<PathBuf>,

    /// Font size in pixels
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Atlas width for fixed sizing
    #[arg(short, long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub padding: Option<u32>,

    #[arg(long)]
    pub spacing: Option<u32>,

    #[arg(long)]
    pub effect_padding: Option<u32>,

    /// Atlas sizing method
    #[arg(long, value_enum)]
    pub sizing: Option<Sizing>,

    #[arg(long, allow_hyphen_values = true)]
    pub global_x_advance: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    pub global_x_offset: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    pub global_y_offset: Option<i32>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Engine websocket URL
    #[arg(id = "engine_url", short = 'e', long = "engine", value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct HostArgs {
    /// Editor bridge websocket URL
    #[arg(id = "host_url", long = "host", value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// Sync into an in-memory document and print its layers
    #[arg(long)]
    pub simulate: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Glyph operations per host batch
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Layer group for the glyph layers
    #[arg(short, long)]
    pub group: Option<String>,

    /// Name for a newly created document
    #[arg(short = 'n', long)]
    pub document: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Output folder
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub out: Option<PathBuf>,

    /// Base file name (writes <name>.png and <name>.fnt)
    #[arg(long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_and_verbose_flags() {
        let err = Cli::try_parse_from(["atlas", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let cli = Cli::try_parse_from(["atlas", "inspect", "a.fnt", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_sync_with_local_files() {
        let cli = Cli::try_parse_from([
            "atlas",
            "sync",
            "--image",
            "a.png",
            "--fnt",
            "a.fnt",
            "--simulate",
            "--chunk-size",
            "10",
        ])
        .unwrap();
        let Commands::Sync {
            image,
            fnt,
            host,
            sync,
            ..
        } = cli.command
        else {
            panic!("expected sync");
        };
        assert_eq!(image, Some(PathBuf::from("a.png")));
        assert_eq!(fnt, Some(PathBuf::from("a.fnt")));
        assert!(host.simulate);
        assert_eq!(sync.chunk_size, Some(10));
    }

    #[test]
    fn test_image_requires_fnt() {
        assert!(Cli::try_parse_from(["atlas", "sync", "--image", "a.png"]).is_err());
    }

    #[test]
    fn test_param_overrides() {
        let cli = Cli::try_parse_from([
            "atlas",
            "-v",
            "generate",
            "--text",
            "AB",
            "--sizing",
            "auto_m4",
            "--global-x-offset",
            "-2",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Generate { params, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(params.text.as_deref(), Some("AB"));
        assert_eq!(params.sizing, Some(Sizing::AutoM4));
        assert_eq!(params.global_x_offset, Some(-2));
    }
}
