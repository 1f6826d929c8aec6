//! `[params]` section configuration.
//!
//! Design parameters sent to the engine with every generation request.
//!
//! # Example
//!
//! ```toml
//! [params]
//! text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
//! font = "Arial"                # Installed font family
//! font_path = "~/fonts/Pixel.ttf"  # Font file; takes precedence over `font`
//! size = 32
//! width = 512                   # Atlas width for `sizing = "fixed"`
//! padding = 2
//! spacing = 2
//! effect_padding = 0
//! sizing = "auto_pot"           # auto_pot | auto_m4 | fixed
//! global_x_advance = 0
//! global_x_offset = 0
//! global_y_offset = 0
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// How the engine sizes the atlas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Sizing {
    /// Pack tightly, round up to a power of two.
    #[default]
    #[value(name = "auto_pot")]
    AutoPot,
    /// Pack tightly, round up to a multiple of four.
    #[value(name = "auto_m4")]
    #[serde(rename = "auto_m4")]
    AutoM4,
    /// Use the configured width.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Characters to render.
    pub text: String,

    /// Font family name.
    pub font: String,

    /// Custom font file, overrides `font`.
    pub font_path: Option<PathBuf>,

    pub size: u32,
    pub width: u32,
    pub padding: u32,
    pub spacing: u32,
    pub effect_padding: u32,
    pub sizing: Sizing,
    pub global_x_advance: i32,
    pub global_x_offset: i32,
    pub global_y_offset: i32,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            text: "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789".into(),
            font: "Arial".into(),
            font_path: None,
            size: 32,
            width: 512,
            padding: 0,
            spacing: 0,
            effect_padding: 0,
            sizing: Sizing::AutoPot,
            global_x_advance: 0,
            global_x_offset: 0,
            global_y_offset: 0,
        }
    }
}

impl ParamsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.size == 0 {
            diag.error(FieldPath::new("params.size"), "font size must be greater than 0");
        }
        if self.sizing == Sizing::Fixed && self.width == 0 {
            diag.error_with_hint(
                FieldPath::new("params.width"),
                "fixed sizing needs a width greater than 0",
                "set `sizing = \"auto_pot\"` to let the engine choose",
            );
        }
        if let Some(path) = &self.font_path
            && !path.is_file()
        {
            diag.error(
                FieldPath::new("params.font_path"),
                format!("font file `{}` not found", path.display()),
            );
        }
    }

    /// Expand `~` in `font_path`.
    pub fn expand_paths(&mut self) {
        if let Some(path) = self.font_path.take() {
            self.font_path = Some(super::expand_tilde(&path));
        }
    }

    /// Set a parameter by its config key. Used by the session's `:set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("`{key}` expects a number, got `{value}`"))
        }

        match key {
            "text" => self.text = value.to_string(),
            "font" => {
                self.font = value.to_string();
                self.font_path = None;
            }
            "font_path" => self.font_path = Some(super::expand_tilde(value.as_ref())),
            "size" => self.size = number(key, value)?,
            "width" => self.width = number(key, value)?,
            "padding" => self.padding = number(key, value)?,
            "spacing" => self.spacing = number(key, value)?,
            "effect_padding" => self.effect_padding = number(key, value)?,
            "global_x_advance" => self.global_x_advance = number(key, value)?,
            "global_x_offset" => self.global_x_offset = number(key, value)?,
            "global_y_offset" => self.global_y_offset = number(key, value)?,
            "sizing" => {
                self.sizing = <Sizing as clap::ValueEnum>::from_str(value, true)
                    .map_err(|_| format!("unknown sizing `{value}` (auto_pot, auto_m4, fixed)"))?;
            }
            _ => return Err(format!("unknown parameter `{key}`")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_params_config() {
        let config = test_parse_config(
            "[params]\ntext = \"AB\"\nsize = 48\nsizing = \"auto_m4\"\nglobal_x_offset = -2",
        );
        assert_eq!(config.params.text, "AB");
        assert_eq!(config.params.size, 48);
        assert_eq!(config.params.sizing, Sizing::AutoM4);
        assert_eq!(config.params.global_x_offset, -2);
        assert_eq!(config.params.font, "Arial");
    }

    #[test]
    fn test_sizing_names() {
        for (name, sizing) in [
            ("auto_pot", Sizing::AutoPot),
            ("auto_m4", Sizing::AutoM4),
            ("fixed", Sizing::Fixed),
        ] {
            let config = test_parse_config(&format!("[params]\nsizing = \"{name}\""));
            assert_eq!(config.params.sizing, sizing);
        }
    }

    #[test]
    fn test_set_parameters() {
        let mut params = ParamsConfig::default();
        params.set("size", "64").unwrap();
        params.set("sizing", "fixed").unwrap();
        params.set("global_y_offset", "-3").unwrap();
        assert_eq!(params.size, 64);
        assert_eq!(params.sizing, Sizing::Fixed);
        assert_eq!(params.global_y_offset, -3);

        assert!(params.set("size", "big").is_err());
        assert!(params.set("colour", "red").is_err());
        assert!(params.set("sizing", "huge").is_err());
    }

    #[test]
    fn test_validate_fixed_width() {
        let params = ParamsConfig {
            sizing: Sizing::Fixed,
            width: 0,
            size: 0,
            ..ParamsConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        params.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
