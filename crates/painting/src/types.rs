use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Material channel a stamp writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Channel {
    #[default]
    Color = 0,
    Roughness = 1,
    Metallic = 2,
    Height = 3,
}

/// Falloff profile of a stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BrushKind {
    #[default]
    Round = 0,
    Soft = 1,
    Flat = 2,
    Speckle = 3,
}

/// Surface wear pattern layered on top of the falloff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AbrasionKind {
    #[default]
    None = 0,
    Scratch = 1,
    Wear = 2,
    Grit = 3,
}

/// One localized paint application in UV space.
///
/// Commands are plain values: once created they are never mutated except for
/// layer renumbering when a layer is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampCommand {
    /// Stamp center in UV space
    pub uv_center: Vec2,
    /// Radius in UV units (always > 0)
    pub uv_radius: f32,
    /// Opacity 0.0-1.0
    pub opacity: f32,
    /// Falloff spread 0.0-1.0
    pub spread: f32,
    pub channel: Channel,
    pub brush_kind: BrushKind,
    pub abrasion_kind: AbrasionKind,
    /// Color in [0, 1]^3
    pub color: Vec3,
    /// Per-stroke noise seed
    pub seed: u32,
    /// Target layer (position in the layer list)
    pub layer_index: usize,
}

impl StampCommand {
    /// Convert to the GPU upload layout
    pub fn to_gpu(&self) -> GpuStamp {
        GpuStamp {
            uv_center: self.uv_center.to_array(),
            uv_radius: self.uv_radius,
            opacity: self.opacity,
            spread: self.spread,
            color: self.color.to_array(),
            seed: self.seed,
            channel: self.channel as u32,
            brush_kind: self.brush_kind as u32,
            abrasion_kind: self.abrasion_kind as u32,
            layer_index: self.layer_index as u32,
            _padding: [0; 3],
        }
    }
}

/// Frozen snapshot of one committed stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub layer_index: usize,
    pub commands: Vec<StampCommand>,
}

/// A named paint layer, identified by its position in the layer list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A stamp command laid out for GPU storage buffers.
///
/// All fields are 4 bytes wide so the struct has no implicit padding; the
/// trailing padding rounds it to 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuStamp {
    pub uv_center: [f32; 2],
    pub uv_radius: f32,
    pub opacity: f32,
    pub spread: f32,
    pub color: [f32; 3],
    pub seed: u32,
    pub channel: u32,
    pub brush_kind: u32,
    pub abrasion_kind: u32,
    pub layer_index: u32,
    pub _padding: [u32; 3],
}

/// View a slice of GPU stamps as raw bytes for buffer upload
pub fn stamps_as_bytes(stamps: &[GpuStamp]) -> &[u8] {
    bytemuck::cast_slice(stamps)
}
