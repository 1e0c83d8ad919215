//! Brush settings and stamp weight profiles
//!
//! `BrushSettings` is the user-facing brush state the stroke engine copies
//! into every stamp command. `StampProfile` is the canonical falloff a
//! compositor applies when rasterizing a command: one variant per brush kind,
//! each carrying only the parameters it needs.

use glam::{Vec2, Vec3};
use knobpaint_config::{DEFAULT_BRUSH_SIZE_PX, DEFAULT_SPACING, StrokeSettings};

use crate::types::{AbrasionKind, BrushKind, Channel, StampCommand};

/// Speckle cells per stamp radius
const SPECKLE_CELLS: f32 = 8.0;

/// Brush configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushSettings {
    /// Diameter in screen pixels
    pub size_px: f32,
    /// Opacity 0.0-1.0
    pub opacity: f32,
    /// Falloff spread: 0.0 = hard edge, 1.0 = fully soft
    pub spread: f32,
    /// Spacing as fraction of size (e.g., 0.25 = 25% of diameter)
    pub spacing: f32,
    pub channel: Channel,
    pub brush_kind: BrushKind,
    pub abrasion_kind: AbrasionKind,
    /// Color in [0, 1]^3
    pub color: Vec3,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size_px: DEFAULT_BRUSH_SIZE_PX,
            opacity: 1.0,
            spread: 0.2,
            spacing: DEFAULT_SPACING,
            channel: Channel::Color,
            brush_kind: BrushKind::Round,
            abrasion_kind: AbrasionKind::None,
            color: Vec3::ZERO,
        }
    }
}

impl BrushSettings {
    /// Create brush settings with the given size, opacity and spread
    pub fn new(size_px: f32, opacity: f32, spread: f32) -> Self {
        Self {
            size_px,
            opacity,
            spread,
            ..Default::default()
        }
        .sanitized()
    }

    /// Default brush sized and spaced from the stroke settings
    pub fn from_stroke_settings(settings: &StrokeSettings) -> Self {
        Self {
            size_px: settings.brush_size_px,
            spacing: settings.spacing,
            ..Default::default()
        }
        .sanitized()
    }

    /// Clamp every field into its valid range.
    ///
    /// Non-finite values fall back to the defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let unit = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };

        Self {
            size_px: if self.size_px.is_finite() && self.size_px > 0.0 {
                self.size_px
            } else {
                defaults.size_px
            },
            opacity: unit(self.opacity, defaults.opacity),
            spread: unit(self.spread, defaults.spread),
            // Prevent zero spacing
            spacing: if self.spacing.is_finite() {
                self.spacing.max(0.01)
            } else {
                defaults.spacing
            },
            color: if self.color.is_finite() {
                self.color.clamp(Vec3::ZERO, Vec3::ONE)
            } else {
                defaults.color
            },
            ..self
        }
    }

    /// Distance between resampled stamps in screen pixels
    pub fn spacing_px(&self) -> f32 {
        (self.size_px * self.spacing).max(0.5)
    }
}

/// Per-kind stamp falloff
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StampProfile {
    /// Linear falloff blended toward a hard edge
    Round { hardness: f32 },
    /// Smoothstep falloff
    Soft,
    /// Constant weight inside the stamp
    Flat,
    /// Hard-edged disc with hashed dropout
    Speckle { density: f32, seed: u32 },
}

impl StampProfile {
    /// Profile for a brush kind at the given spread and stroke seed
    pub fn new(kind: BrushKind, spread: f32, seed: u32) -> Self {
        let spread = spread.clamp(0.0, 1.0);
        match kind {
            BrushKind::Round => Self::Round {
                hardness: 1.0 - spread,
            },
            BrushKind::Soft => Self::Soft,
            BrushKind::Flat => Self::Flat,
            BrushKind::Speckle => Self::Speckle {
                density: 1.0 - 0.9 * spread,
                seed,
            },
        }
    }

    /// Profile a compositor should use for `command`
    pub fn for_command(command: &StampCommand) -> Self {
        Self::new(command.brush_kind, command.spread, command.seed)
    }

    /// Weight at `offset` from the stamp center, in units of the stamp radius.
    ///
    /// Always in [0, 1] and zero outside the unit disc.
    pub fn weight(&self, offset: Vec2) -> f32 {
        let distance = offset.length();
        if !distance.is_finite() || distance > 1.0 {
            return 0.0;
        }

        match *self {
            Self::Round { hardness } => hardness_falloff(distance, hardness),
            Self::Soft => {
                let t = distance.clamp(0.0, 1.0);
                1.0 - t * t * (3.0 - 2.0 * t)
            }
            Self::Flat => 1.0,
            Self::Speckle { density, seed } => {
                let cell = (offset * SPECKLE_CELLS).floor();
                let noise = hash_cell(cell.x as i32, cell.y as i32, seed);
                if noise < density { 1.0 } else { 0.0 }
            }
        }
    }
}

/// Falloff based on hardness.
/// `distance_normalized` is 0 at center, 1 at edge; hardness is 0.0 (soft)
/// to 1.0 (hard)
#[inline]
fn hardness_falloff(distance_normalized: f32, hardness: f32) -> f32 {
    let t = distance_normalized.clamp(0.0, 1.0);
    let soft = 1.0 - t;
    soft * (1.0 - hardness) + hardness
}

/// Uniform value in [0, 1) for a grid cell and seed
fn hash_cell(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = seed
        ^ (x as u32).wrapping_mul(0x27d4_eb2d)
        ^ (y as u32).wrapping_mul(0x1656_67b1);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    (h >> 8) as f32 / (1u32 << 24) as f32
}
