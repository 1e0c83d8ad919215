//! JSON paint and view documents
//!
//! Documents are versioned, camelCase JSON. Import never trusts the file:
//! indices arrive as signed integers and are clamped into range, unusable
//! commands are dropped, and the result is a fresh value the caller swaps in
//! only on success.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::camera::{AxisInversion, ViewState};
use crate::history::HistoryState;
use crate::types::{AbrasionKind, BrushKind, Channel, Layer, StampCommand, StrokeRecord};

/// Version written by this build; newer documents are rejected
pub const DOCUMENT_VERSION: u32 = 1;

/// Errors that can occur while reading or writing documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Invalid document value: {0}")]
    InvalidValue(String),
}

fn current_version() -> u32 {
    DOCUMENT_VERSION
}

fn no_focus() -> i64 {
    -1
}

fn check_version(version: u32) -> Result<(), DocumentError> {
    if version == 0 {
        return Err(DocumentError::InvalidValue("version 0".to_string()));
    }
    if version > DOCUMENT_VERSION {
        return Err(DocumentError::UnsupportedVersion {
            found: version,
            supported: DOCUMENT_VERSION,
        });
    }
    Ok(())
}

/// Clamp a signed document index into `[0, len)`. `len` must be non-zero.
fn clamp_index(index: i64, len: usize) -> usize {
    let last = len.saturating_sub(1);
    usize::try_from(index.max(0)).map_or(last, |index| index.min(last))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerEntry {
    #[serde(default)]
    pub name: String,
}

/// One stamp command as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    pub uv_x: f32,
    pub uv_y: f32,
    pub uv_radius: f32,
    #[serde(default = "full")]
    pub opacity: f32,
    #[serde(default)]
    pub spread: f32,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub brush_kind: BrushKind,
    #[serde(default)]
    pub abrasion_kind: AbrasionKind,
    #[serde(default)]
    pub color_x: f32,
    #[serde(default)]
    pub color_y: f32,
    #[serde(default)]
    pub color_z: f32,
    #[serde(default)]
    pub seed: u32,
    #[serde(default)]
    pub layer_index: i64,
}

fn full() -> f32 {
    1.0
}

impl From<&StampCommand> for CommandEntry {
    fn from(command: &StampCommand) -> Self {
        Self {
            uv_x: command.uv_center.x,
            uv_y: command.uv_center.y,
            uv_radius: command.uv_radius,
            opacity: command.opacity,
            spread: command.spread,
            channel: command.channel,
            brush_kind: command.brush_kind,
            abrasion_kind: command.abrasion_kind,
            color_x: command.color.x,
            color_y: command.color.y,
            color_z: command.color.z,
            seed: command.seed,
            layer_index: command.layer_index as i64,
        }
    }
}

impl CommandEntry {
    /// Convert to a command on `layer_index`, or `None` if the geometry is unusable.
    ///
    /// Opacity, spread and color are clamped into `[0, 1]`.
    fn to_command(&self, layer_index: usize) -> Option<StampCommand> {
        let uv_center = Vec2::new(self.uv_x, self.uv_y);
        if !uv_center.is_finite() || !self.uv_radius.is_finite() || self.uv_radius <= 0.0 {
            return None;
        }
        let unit = |value: f32| if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };

        Some(StampCommand {
            uv_center,
            uv_radius: self.uv_radius,
            opacity: unit(self.opacity),
            spread: unit(self.spread),
            channel: self.channel,
            brush_kind: self.brush_kind,
            abrasion_kind: self.abrasion_kind,
            color: Vec3::new(unit(self.color_x), unit(self.color_y), unit(self.color_z)),
            seed: self.seed,
            layer_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeEntry {
    #[serde(default)]
    pub layer_index: i64,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

/// Persisted layers and committed strokes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
    #[serde(default)]
    pub active_layer_index: i64,
    /// `-1` when no layer is focused
    #[serde(default = "no_focus")]
    pub focused_layer_index: i64,
    #[serde(default)]
    pub history_revision: i64,
    #[serde(default)]
    pub strokes: Vec<StrokeEntry>,
}

impl PaintDocument {
    pub fn from_state(state: &HistoryState) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            layers: state
                .layers
                .iter()
                .map(|layer| LayerEntry {
                    name: layer.name.clone(),
                })
                .collect(),
            active_layer_index: state.active_layer as i64,
            focused_layer_index: state.focused_layer.map_or(-1, |index| index as i64),
            history_revision: state.revision as i64,
            strokes: state
                .strokes
                .iter()
                .map(|stroke| StrokeEntry {
                    layer_index: stroke.layer_index as i64,
                    commands: stroke.commands.iter().map(CommandEntry::from).collect(),
                })
                .collect(),
        }
    }

    /// Build a normalized history state.
    ///
    /// Fails only on an unsupported version. Out-of-range indices are clamped,
    /// blank layer names are regenerated, and strokes left without usable
    /// commands are dropped.
    pub fn into_state(self) -> Result<HistoryState, DocumentError> {
        check_version(self.version)?;

        let mut layers: Vec<Layer> = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry.name.trim() {
                "" => Layer::new(format!("Layer {}", i + 1)),
                name => Layer::new(name),
            })
            .collect();
        if layers.is_empty() {
            warn!("PaintDocument: no layers, adding the default layer");
            layers.push(Layer::new(crate::history::DEFAULT_LAYER_NAME));
        }
        let layer_count = layers.len();

        let mut dropped_commands = 0;
        let strokes: Vec<StrokeRecord> = self
            .strokes
            .iter()
            .map(|entry| {
                let layer_index = clamp_index(entry.layer_index, layer_count);
                let commands: Vec<StampCommand> = entry
                    .commands
                    .iter()
                    .filter_map(|command| command.to_command(layer_index))
                    .collect();
                dropped_commands += entry.commands.len() - commands.len();
                StrokeRecord {
                    layer_index,
                    commands,
                }
            })
            .filter(|stroke| !stroke.commands.is_empty())
            .collect();
        if dropped_commands > 0 {
            warn!("PaintDocument: dropped {} unusable commands", dropped_commands);
        }

        let revision = usize::try_from(self.history_revision.max(0))
            .map_or(strokes.len(), |revision| revision.min(strokes.len()));
        let focused_layer = usize::try_from(self.focused_layer_index)
            .ok()
            .filter(|&index| index < layer_count);

        Ok(HistoryState {
            active_layer: clamp_index(self.active_layer_index, layer_count),
            focused_layer,
            revision,
            strokes,
            layers,
        }
        .normalized())
    }
}

/// Serialize history as a pretty-printed paint document
pub fn export_paint(state: &HistoryState) -> Result<String, DocumentError> {
    let json = serde_json::to_string_pretty(&PaintDocument::from_state(state))?;
    debug!(
        "export_paint: {} layers, {} strokes, {} bytes",
        state.layers.len(),
        state.strokes.len(),
        json.len()
    );
    Ok(json)
}

/// Parse and normalize a paint document
pub fn import_paint(json: &str) -> Result<HistoryState, DocumentError> {
    let document: PaintDocument = serde_json::from_str(json)?;
    let state = document.into_state()?;
    info!(
        "import_paint: {} layers, {} strokes, revision {}",
        state.layers.len(),
        state.strokes.len(),
        state.revision
    );
    Ok(state)
}

/// Persisted camera orbit, zoom, pan and axis flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default)]
    pub pan_x: f32,
    #[serde(default)]
    pub pan_y: f32,
    #[serde(default)]
    pub inversion: AxisInversion,
}

fn default_zoom() -> f32 {
    crate::camera::DEFAULT_ZOOM
}

impl ViewDocument {
    /// Snapshot a view, repairing non-finite values so the result always imports
    pub fn from_view(view: &ViewState) -> Self {
        let view = view.normalized();
        Self {
            version: DOCUMENT_VERSION,
            yaw: view.yaw,
            pitch: view.pitch,
            zoom: view.zoom,
            pan_x: view.pan.x,
            pan_y: view.pan.y,
            inversion: view.inversion,
        }
    }

    /// Build a normalized view state
    pub fn into_view(self) -> Result<ViewState, DocumentError> {
        check_version(self.version)?;
        Ok(ViewState {
            yaw: self.yaw,
            pitch: self.pitch,
            zoom: self.zoom,
            pan: Vec2::new(self.pan_x, self.pan_y),
            inversion: self.inversion,
        }
        .normalized())
    }
}

/// Serialize a view state as a pretty-printed view document
pub fn export_view(view: &ViewState) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&ViewDocument::from_view(view))?)
}

/// Parse and normalize a view document
pub fn import_view(json: &str) -> Result<ViewState, DocumentError> {
    let document: ViewDocument = serde_json::from_str(json)?;
    document.into_view()
}
