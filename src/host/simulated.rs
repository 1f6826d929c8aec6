//! In-memory document host.
//!
//! Models the parts of a layer editor the synchronizer depends on:
//! stacking order, nested groups, layer selection, the pixel marquee and
//! staged resources. Failure behavior follows a real editor:
//! - deleting with nothing selected, or selecting a missing layer, reports
//!   `ExpectedAbsence`
//! - deleting every top-level layer is refused
//! - copying without a marquee or outside the layer's pixels fails
//!
//! A created document opens with one empty `Layer 1`, as editors do.
//! Layers are stored bottom-to-top; queries report them topmost first.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::{Command, Host, HostError, ImageToken, SelectMode};
use crate::core::{AtlasImage, Rect};

pub type LayerId = u32;

/// Layer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Raster layer; `None` when it holds no pixels.
    Pixels(Option<Rect>),
    /// Placed, not yet rasterized image.
    SmartObject(Rect),
    /// Layer group, children bottom-to-top.
    Group(Vec<Layer>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
}

impl Layer {
    fn children(&self) -> Option<&[Layer]> {
        match &self.kind {
            LayerKind::Group(children) => Some(children),
            _ => None,
        }
    }

    /// Content bounds for pixel-bearing layers.
    pub fn bounds(&self) -> Option<Rect> {
        match self.kind {
            LayerKind::Pixels(bounds) => bounds,
            LayerKind::SmartObject(bounds) => Some(bounds),
            LayerKind::Group(_) => None,
        }
    }
}

/// An open document.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub width: u32,
    pub height: u32,
    layers: Vec<Layer>,
    selected: Vec<LayerId>,
    active: Option<LayerId>,
    marquee: Option<Rect>,
    next_id: LayerId,
}

impl Document {
    fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            layers: Vec::new(),
            selected: Vec::new(),
            active: None,
            marquee: None,
            next_id: 1,
        }
    }

    /// Top-level layers, bottom-to-top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Top-level layer names, topmost first.
    pub fn top_level_names(&self) -> Vec<String> {
        self.layers.iter().rev().map(|l| l.name.clone()).collect()
    }

    /// Child names of the topmost group called `name`, topmost first.
    pub fn group_children(&self, name: &str) -> Option<Vec<String>> {
        let group = find_by_name(&self.layers, name)?;
        let children = group.children()?;
        Some(children.iter().rev().map(|l| l.name.clone()).collect())
    }

    /// Find the topmost layer called `name`, at any depth.
    pub fn find(&self, name: &str) -> Option<&Layer> {
        find_by_name(&self.layers, name)
    }

    /// Indented layer tree, topmost first. Groups end with `/`.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        write_outline(&mut out, &self.layers, 0);
        out
    }

    fn add_layer(&mut self, name: Option<String>, kind: LayerKind) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        let layer = Layer {
            id,
            name: name.unwrap_or_else(|| format!("Layer {id}")),
            kind,
            visible: true,
        };

        // New layers land directly above the active layer
        let layer = match self.active {
            Some(anchor) => match insert_above(&mut self.layers, anchor, layer) {
                Ok(()) => None,
                Err(layer) => Some(layer),
            },
            None => Some(layer),
        };
        if let Some(layer) = layer {
            self.layers.push(layer);
        }

        self.selected = vec![id];
        self.active = Some(id);
        id
    }

    fn active_layer(&self) -> Option<&Layer> {
        find_by_id(&self.layers, self.active?)
    }

    fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        find_by_id_mut(&mut self.layers, self.active?)
    }

    fn focus_top(&mut self) {
        self.active = self.layers.last().map(|l| l.id);
    }
}

/// Resource staged through `stage_image`.
#[derive(Debug, Clone, Copy)]
struct Staged {
    width: Option<u32>,
    height: Option<u32>,
}

/// Failure injected for the nth command of a kind.
#[derive(Debug, Clone)]
struct InjectedFailure {
    kind: &'static str,
    skip: usize,
    error: HostError,
}

/// Host backed by an in-memory document.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    document: Option<Document>,
    staged: HashMap<String, Staged>,
    next_resource: usize,
    failures: Vec<InjectedFailure>,
    batches: usize,
    executed: Vec<Command>,
}

impl SimulatedHost {
    /// Host with no open document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with an open, layerless document.
    pub fn with_document(name: &str, width: u32, height: u32) -> Self {
        Self {
            document: Some(Document::new(name, width, height)),
            ..Self::default()
        }
    }

    /// Add a top-level pixel layer covering the whole canvas.
    ///
    /// # Panics
    /// Panics if no document is open.
    pub fn with_layer(mut self, name: &str) -> Self {
        let doc = self.document.as_mut().expect("no document open");
        let bounds = Rect::from_size(doc.width, doc.height);
        doc.active = None;
        doc.add_layer(Some(name.to_string()), LayerKind::Pixels(Some(bounds)));
        self
    }

    /// Add a top-level group holding pixel layers named `children`.
    ///
    /// # Panics
    /// Panics if no document is open.
    pub fn with_group(mut self, name: &str, children: &[&str]) -> Self {
        let doc = self.document.as_mut().expect("no document open");
        let bounds = Rect::from_size(doc.width, doc.height);
        let mut kids = Vec::with_capacity(children.len());
        for child in children {
            let id = doc.next_id;
            doc.next_id += 1;
            kids.push(Layer {
                id,
                name: child.to_string(),
                kind: LayerKind::Pixels(Some(bounds)),
                visible: true,
            });
        }
        doc.active = None;
        doc.add_layer(Some(name.to_string()), LayerKind::Group(kids));
        self
    }

    /// Make the `nth` (0-based) command of `kind` fail with `error`.
    pub fn fail_on(mut self, kind: &'static str, nth: usize, error: HostError) -> Self {
        self.failures.push(InjectedFailure {
            kind,
            skip: nth,
            error,
        });
        self
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Number of `execute_batch` calls so far.
    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Resources staged and not yet released.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Every command that was attempted, in order.
    pub fn executed(&self) -> &[Command] {
        &self.executed
    }

    fn take_injected(&mut self, kind: &str) -> Option<HostError> {
        let pos = self.failures.iter().position(|f| f.kind == kind)?;
        let failure = &mut self.failures[pos];
        if failure.skip > 0 {
            failure.skip -= 1;
            return None;
        }
        Some(self.failures.remove(pos).error)
    }

    fn apply(&mut self, command: &Command) -> Result<(), HostError> {
        self.executed.push(command.clone());
        let kind = command.kind();

        if let Some(error) = self.take_injected(kind) {
            return Err(error);
        }

        if let Command::CreateDocument {
            name,
            width,
            height,
        } = command
        {
            let mut doc = Document::new(name.clone(), *width, *height);
            doc.add_layer(None, LayerKind::Pixels(None));
            self.document = Some(doc);
            return Ok(());
        }

        let Some(doc) = self.document.as_mut() else {
            return Err(HostError::failed(kind, "no document open"));
        };

        match command {
            Command::CreateDocument { .. } => unreachable!("handled above"),

            Command::ResizeImage { width, height } => {
                doc.width = *width;
                doc.height = *height;
            }

            Command::MakeLayer => {
                doc.add_layer(None, LayerKind::Pixels(None));
            }

            Command::RenameActive { name } => {
                let layer = doc
                    .active_layer_mut()
                    .ok_or_else(|| HostError::failed(kind, "no active layer"))?;
                layer.name = name.clone();
            }

            Command::SelectAllLayers => {
                if doc.layers.is_empty() {
                    return Err(HostError::absent("document has no layers"));
                }
                doc.selected = doc.layers.iter().map(|l| l.id).collect();
                doc.focus_top();
            }

            Command::SelectLayer {
                name,
                mode,
                make_visible,
            } => {
                let id = find_by_name(&doc.layers, name)
                    .map(|l| l.id)
                    .ok_or_else(|| HostError::absent(format!("layer `{name}` does not exist")))?;
                match mode {
                    SelectMode::Replace => {
                        doc.selected = vec![id];
                        doc.active = Some(id);
                    }
                    SelectMode::Exclude => {
                        doc.selected.retain(|&s| s != id);
                        if doc.active == Some(id) {
                            doc.active = doc.selected.last().copied();
                        }
                    }
                }
                if *make_visible && let Some(layer) = find_by_id_mut(&mut doc.layers, id) {
                    layer.visible = true;
                }
            }

            Command::DeleteSelected => {
                if doc.selected.is_empty() {
                    return Err(HostError::absent("no layers selected"));
                }
                if doc.layers.iter().all(|l| doc.selected.contains(&l.id)) {
                    return Err(HostError::failed(kind, "cannot delete the last layer"));
                }
                for id in std::mem::take(&mut doc.selected) {
                    remove_by_id(&mut doc.layers, id);
                }
                doc.focus_top();
                doc.selected = doc.active.into_iter().collect();
            }

            Command::PlaceImage { token } => {
                let staged = self
                    .staged
                    .get(token.as_str())
                    .copied()
                    .ok_or_else(|| HostError::failed(kind, format!("unknown resource `{}`", token.as_str())))?;
                let bounds = Rect::from_size(
                    staged.width.unwrap_or(doc.width),
                    staged.height.unwrap_or(doc.height),
                );
                doc.add_layer(
                    Some("temp_atlas_slice".to_string()),
                    LayerKind::SmartObject(bounds),
                );
            }

            Command::RasterizeActive => {
                let layer = doc
                    .active_layer_mut()
                    .ok_or_else(|| HostError::failed(kind, "no active layer"))?;
                layer.kind = match &layer.kind {
                    LayerKind::SmartObject(bounds) => LayerKind::Pixels(Some(*bounds)),
                    LayerKind::Pixels(bounds) => LayerKind::Pixels(*bounds),
                    LayerKind::Group(_) => {
                        return Err(HostError::failed(kind, "cannot rasterize a group"));
                    }
                };
            }

            Command::SetMarquee(rect) => {
                doc.marquee = Some(rect.intersect(&Rect::from_size(doc.width, doc.height)));
            }

            Command::ClearMarquee => doc.marquee = None,

            Command::CopyToLayer => {
                let marquee = doc
                    .marquee
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| HostError::failed(kind, "no pixels selected"))?;
                let source = doc
                    .active_layer()
                    .and_then(Layer::bounds)
                    .ok_or_else(|| HostError::failed(kind, "active layer has no pixels"))?;
                let content = marquee.intersect(&source);
                if content.is_empty() {
                    return Err(HostError::failed(kind, "selected area is empty"));
                }
                doc.add_layer(None, LayerKind::Pixels(Some(content)));
            }

            Command::GroupSelected { name } => {
                if doc.selected.is_empty() {
                    return Err(HostError::failed(kind, "no layers selected"));
                }
                let selected = std::mem::take(&mut doc.selected);

                let top_level: Vec<usize> = doc
                    .layers
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| selected.contains(&l.id))
                    .map(|(i, _)| i)
                    .collect();
                let insert_at = match top_level.last() {
                    Some(&topmost) => topmost + 1 - top_level.len(),
                    None => doc.layers.len(),
                };

                // Children keep their relative stacking order
                let mut children = Vec::with_capacity(selected.len());
                for &i in top_level.iter().rev() {
                    children.push(doc.layers.remove(i));
                }
                children.reverse();
                for id in selected {
                    if !children.iter().any(|c| c.id == id)
                        && let Some(layer) = remove_by_id(&mut doc.layers, id)
                    {
                        children.push(layer);
                    }
                }

                let id = doc.next_id;
                doc.next_id += 1;
                doc.layers.insert(
                    insert_at.min(doc.layers.len()),
                    Layer {
                        id,
                        name: name.clone(),
                        kind: LayerKind::Group(children),
                        visible: true,
                    },
                );
                doc.selected = vec![id];
                doc.active = Some(id);
            }
        }

        Ok(())
    }
}

impl Host for SimulatedHost {
    async fn has_document(&mut self) -> Result<bool, HostError> {
        Ok(self.document.is_some())
    }

    async fn layer_names(&mut self) -> Result<Vec<String>, HostError> {
        self.document
            .as_ref()
            .map(Document::top_level_names)
            .ok_or_else(|| HostError::failed("get", "no document open"))
    }

    async fn stage_image(&mut self, bytes: &[u8]) -> Result<ImageToken, HostError> {
        if bytes.is_empty() {
            return Err(HostError::failed("stage", "empty resource"));
        }
        let dims = AtlasImage::from_png(bytes.to_vec()).ok();
        self.next_resource += 1;
        let token = format!("sim-resource-{}", self.next_resource);
        self.staged.insert(
            token.clone(),
            Staged {
                width: dims.as_ref().map(AtlasImage::width),
                height: dims.as_ref().map(AtlasImage::height),
            },
        );
        Ok(ImageToken(token))
    }

    async fn release(&mut self, token: &ImageToken) -> Result<(), HostError> {
        self.staged
            .remove(token.as_str())
            .map(drop)
            .ok_or_else(|| HostError::absent(format!("unknown resource `{}`", token.as_str())))
    }

    async fn execute_batch(&mut self, commands: &[Command]) -> Result<(), HostError> {
        self.batches += 1;
        for command in commands {
            self.apply(command)?;
        }
        Ok(())
    }
}

// ============================================================================
// Layer tree helpers
// ============================================================================

/// Depth-first search from the top of the stack.
fn find_by_name<'a>(layers: &'a [Layer], name: &str) -> Option<&'a Layer> {
    for layer in layers.iter().rev() {
        if layer.name == name {
            return Some(layer);
        }
        if let Some(found) = layer.children().and_then(|c| find_by_name(c, name)) {
            return Some(found);
        }
    }
    None
}

fn find_by_id(layers: &[Layer], id: LayerId) -> Option<&Layer> {
    for layer in layers {
        if layer.id == id {
            return Some(layer);
        }
        if let Some(found) = layer.children().and_then(|c| find_by_id(c, id)) {
            return Some(found);
        }
    }
    None
}

fn find_by_id_mut(layers: &mut [Layer], id: LayerId) -> Option<&mut Layer> {
    for layer in layers.iter_mut() {
        if layer.id == id {
            return Some(layer);
        }
        if let LayerKind::Group(children) = &mut layer.kind
            && let Some(found) = find_by_id_mut(children, id)
        {
            return Some(found);
        }
    }
    None
}

fn remove_by_id(layers: &mut Vec<Layer>, id: LayerId) -> Option<Layer> {
    if let Some(pos) = layers.iter().position(|l| l.id == id) {
        return Some(layers.remove(pos));
    }
    layers.iter_mut().find_map(|layer| match &mut layer.kind {
        LayerKind::Group(children) => remove_by_id(children, id),
        _ => None,
    })
}

/// Insert directly above `anchor`, in the anchor's container.
fn insert_above(layers: &mut Vec<Layer>, anchor: LayerId, layer: Layer) -> Result<(), Layer> {
    if let Some(pos) = layers.iter().position(|l| l.id == anchor) {
        layers.insert(pos + 1, layer);
        return Ok(());
    }
    let mut layer = layer;
    for candidate in layers.iter_mut() {
        if let LayerKind::Group(children) = &mut candidate.kind {
            match insert_above(children, anchor, layer) {
                Ok(()) => return Ok(()),
                Err(back) => layer = back,
            }
        }
    }
    Err(layer)
}

fn write_outline(out: &mut String, layers: &[Layer], depth: usize) {
    for layer in layers.iter().rev() {
        let indent = "  ".repeat(depth);
        match &layer.kind {
            LayerKind::Group(children) => {
                let _ = writeln!(out, "{indent}{}/", layer.name);
                write_outline(out, children, depth + 1);
            }
            _ => {
                let _ = writeln!(out, "{indent}{}", layer.name);
            }
        }
    }
}
