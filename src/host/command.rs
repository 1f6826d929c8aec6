//! Editor-neutral document commands.
//!
//! Each command maps to one action descriptor in the editor's batch
//! format (`{"_obj": ..., "_target": [...]}`), which is what the remote
//! bridge forwards to the editor verbatim.

use serde_json::{Value, json};

use super::ImageToken;
use crate::core::Rect;

/// How a layer selection combines with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Select only this layer.
    Replace,
    /// Drop this layer from the current selection.
    Exclude,
}

/// One structural editing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a new transparent RGB document.
    CreateDocument { name: String, width: u32, height: u32 },
    /// Resize the document, scaling layer styles with it.
    ResizeImage { width: u32, height: u32 },
    /// New empty layer above the active one.
    MakeLayer,
    /// Rename the active layer.
    RenameActive { name: String },
    SelectAllLayers,
    SelectLayer {
        name: String,
        mode: SelectMode,
        make_visible: bool,
    },
    /// Delete every selected layer.
    DeleteSelected,
    /// Place a staged image at the document origin as a new layer.
    PlaceImage { token: ImageToken },
    RasterizeActive,
    /// Set the pixel (marquee) selection.
    SetMarquee(Rect),
    ClearMarquee,
    /// Copy the marquee area of the active layer into a new layer.
    CopyToLayer,
    /// Wrap the selected layers in a new group.
    GroupSelected { name: String },
}

impl Command {
    /// Select a layer by name, replacing the selection.
    pub fn select(name: impl Into<String>) -> Self {
        Self::SelectLayer {
            name: name.into(),
            mode: SelectMode::Replace,
            make_visible: false,
        }
    }

    /// Descriptor class name, also used to label failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateDocument { .. } | Self::MakeLayer | Self::GroupSelected { .. } => "make",
            Self::ResizeImage { .. } => "imageSize",
            Self::RenameActive { .. } | Self::SetMarquee(_) | Self::ClearMarquee => "set",
            Self::SelectAllLayers => "selectAllLayers",
            Self::SelectLayer { .. } => "select",
            Self::DeleteSelected => "delete",
            Self::PlaceImage { .. } => "placeEvent",
            Self::RasterizeActive => "rasterizeLayer",
            Self::CopyToLayer => "copyToLayer",
        }
    }

    /// Action descriptor understood by the editor's batch interpreter.
    pub fn to_descriptor(&self) -> Value {
        match self {
            Self::CreateDocument {
                name,
                width,
                height,
            } => json!({
                "_obj": "make",
                "new": {
                    "_obj": "document",
                    "width": pixels(*width),
                    "height": pixels(*height),
                    "resolution": { "_unit": "densityUnit", "_value": 72 },
                    "mode": { "_class": "RGBColorMode" },
                    "fill": { "_enum": "fill", "_value": "transparent" },
                    "name": name,
                }
            }),
            Self::ResizeImage { width, height } => json!({
                "_obj": "imageSize",
                "width": pixels(*width),
                "height": pixels(*height),
                "scaleStyles": true,
            }),
            Self::MakeLayer => json!({
                "_obj": "make",
                "_target": [{ "_ref": "layer" }],
            }),
            Self::RenameActive { name } => json!({
                "_obj": "set",
                "_target": [active_layer()],
                "to": { "_obj": "layer", "name": name },
            }),
            Self::SelectAllLayers => json!({
                "_obj": "selectAllLayers",
                "_target": [active_layer()],
            }),
            Self::SelectLayer {
                name,
                mode,
                make_visible,
            } => {
                let mut desc = json!({
                    "_obj": "select",
                    "_target": [{ "_ref": "layer", "_name": name }],
                });
                if *make_visible {
                    desc["makeVisible"] = json!(true);
                }
                if *mode == SelectMode::Exclude {
                    desc["selectionModifier"] = json!({
                        "_enum": "selectionModifierType",
                        "_value": "removeFromSelection",
                    });
                }
                desc
            }
            Self::DeleteSelected => json!({
                "_obj": "delete",
                "_target": [active_layer()],
            }),
            Self::PlaceImage { token } => json!({
                "_obj": "placeEvent",
                "ID": 1,
                "null": { "_path": token.as_str(), "_kind": "local" },
                "freeTransformCenterState": { "_enum": "quadCenterState", "_value": "QCSAverage" },
                "offset": {
                    "_obj": "offset",
                    "horizontal": pixels(0),
                    "vertical": pixels(0),
                },
            }),
            Self::RasterizeActive => json!({
                "_obj": "rasterizeLayer",
                "_target": [active_layer()],
            }),
            Self::SetMarquee(rect) => json!({
                "_obj": "set",
                "_target": [{ "_ref": "channel", "_property": "selection" }],
                "to": {
                    "_obj": "rectangle",
                    "top": pixels(rect.top),
                    "left": pixels(rect.left),
                    "bottom": pixels(rect.bottom),
                    "right": pixels(rect.right),
                },
            }),
            Self::ClearMarquee => json!({
                "_obj": "set",
                "_target": [{ "_ref": "channel", "_property": "selection" }],
                "to": { "_enum": "ordinal", "_value": "none" },
            }),
            Self::CopyToLayer => json!({ "_obj": "copyToLayer" }),
            Self::GroupSelected { name } => json!({
                "_obj": "make",
                "new": { "_obj": "layerSection" },
                "from": active_layer(),
                "name": name,
            }),
        }
    }
}

fn pixels(value: u32) -> Value {
    json!({ "_unit": "pixelsUnit", "_value": value })
}

fn active_layer() -> Value {
    json!({ "_ref": "layer", "_enum": "ordinal", "_value": "targetEnum" })
}
