//! Generation channel wire types.
//!
//! One JSON text frame per message in each direction.

use serde::{Deserialize, Serialize};

use crate::config::{ParamsConfig, Sizing};

/// Request for a new atlas, built from the current design parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub text: String,
    /// Font family name, or a path to a font file.
    pub font: String,
    pub size: u32,
    pub width: u32,
    pub padding: u32,
    pub spacing: u32,
    pub effect_padding: u32,
    pub auto_pack: bool,
    pub pack_mode: PackMode,
    pub global_x_advance: i32,
    pub global_x_offset: i32,
    pub global_y_offset: i32,
}

/// Atlas dimension rounding when auto packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackMode {
    /// Round up to a multiple of four.
    #[serde(rename = "mult4")]
    Mult4,
    /// Round up to a power of two.
    #[serde(rename = "pot")]
    Pot,
}

impl GenerateRequest {
    pub fn from_params(params: &ParamsConfig) -> Self {
        // The engine renders nothing for an empty string
        let text = if params.text.is_empty() {
            " ".to_string()
        } else {
            params.text.clone()
        };
        let font = match &params.font_path {
            Some(path) => path.display().to_string(),
            None => params.font.clone(),
        };
        let pack_mode = match params.sizing {
            Sizing::AutoM4 => PackMode::Mult4,
            Sizing::AutoPot | Sizing::Fixed => PackMode::Pot,
        };

        Self {
            text,
            font,
            size: params.size,
            width: params.width,
            padding: params.padding,
            spacing: params.spacing,
            effect_padding: params.effect_padding,
            auto_pack: params.sizing != Sizing::Fixed,
            pack_mode,
            global_x_advance: params.global_x_advance,
            global_x_offset: params.global_x_offset,
            global_y_offset: params.global_y_offset,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Engine reply. Either field may be missing from a given frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    /// Base64 PNG payload.
    #[serde(default)]
    pub image: Option<String>,
    /// BMFont metrics text.
    #[serde(default)]
    pub fnt: Option<String>,
}

/// Event delivered from the channel to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Connected,
    Disconnected(String),
    Update(GenerateResponse),
}
