//! Shared configuration for knobpaint
//!
//! This crate provides the single source of truth for viewport dimensions,
//! stroke tuning, and picking settings shared by the painting core and the
//! host application.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default viewport width in pixels
pub const DEFAULT_WIDTH: u32 = 1280;

/// Default viewport height in pixels
pub const DEFAULT_HEIGHT: u32 = 800;

/// Default scale factor (1.0 = no scaling)
pub const DEFAULT_SCALE: f32 = 1.0;

/// Default brush diameter in screen pixels
pub const DEFAULT_BRUSH_SIZE_PX: f32 = 24.0;

/// Default stamp spacing as a fraction of the brush diameter
pub const DEFAULT_SPACING: f32 = 0.25;

/// Default cap on queued, not yet consumed stamp commands
pub const DEFAULT_PENDING_CAPACITY: usize = 4096;

/// Default mesh reference radius (world units)
pub const DEFAULT_REFERENCE_RADIUS: f32 = 1.0;

/// Environment variable overriding [`StrokeSettings::pending_capacity`]
pub const ENV_PENDING_CAPACITY: &str = "KNOBPAINT_PENDING_CAPACITY";

/// Environment variable overriding [`StrokeSettings::planar_fallback`]
pub const ENV_PLANAR_FALLBACK: &str = "KNOBPAINT_PLANAR_FALLBACK";

/// Viewport configuration for screen-to-world conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Viewport width in device pixels
    pub width: u32,
    /// Viewport height in device pixels
    pub height: u32,
    /// Scale factor for DPI scaling
    pub scale: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: DEFAULT_SCALE,
        }
    }
}

impl ViewportConfig {
    /// Create a new viewport config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: DEFAULT_SCALE,
        }
    }

    /// Get width as f32 for calculations
    pub fn width_f32(&self) -> f32 {
        self.width as f32
    }

    /// Get height as f32 for calculations
    pub fn height_f32(&self) -> f32 {
        self.height as f32
    }

    /// Viewport center in device pixels
    pub fn center(&self) -> [f32; 2] {
        [self.width_f32() * 0.5, self.height_f32() * 0.5]
    }
}

/// Stroke resampling and queueing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeSettings {
    /// Brush diameter in screen pixels
    pub brush_size_px: f32,
    /// Spacing between stamps as a fraction of the brush diameter
    pub spacing: f32,
    /// Maximum number of pending commands before the oldest are evicted
    pub pending_capacity: usize,
    /// Substitute a planar projection when the pointer misses every mesh
    pub planar_fallback: bool,
}

impl Default for StrokeSettings {
    fn default() -> Self {
        Self {
            brush_size_px: DEFAULT_BRUSH_SIZE_PX,
            spacing: DEFAULT_SPACING,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            planar_fallback: true,
        }
    }
}

/// Surface picking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickSettings {
    /// Radius used to place the ray origin and to normalize UVs
    pub reference_radius: f32,
    /// Mirror the resolved U coordinate
    pub flip_u: bool,
    /// Mirror the resolved V coordinate
    pub flip_v: bool,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            reference_radius: DEFAULT_REFERENCE_RADIUS,
            flip_u: false,
            flip_v: false,
        }
    }
}

/// Top-level painting configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    pub viewport: ViewportConfig,
    pub stroke: StrokeSettings,
    pub pick: PickSettings,
}

impl PaintConfig {
    /// Defaults with overrides from `KNOBPAINT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(
            std::env::var(ENV_PENDING_CAPACITY).ok().as_deref(),
            std::env::var(ENV_PLANAR_FALLBACK).ok().as_deref(),
        );
        config
    }

    /// Apply raw override values; unparsable values are ignored
    fn apply_overrides(&mut self, pending_capacity: Option<&str>, planar_fallback: Option<&str>) {
        if let Some(raw) = pending_capacity {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => self.stroke.pending_capacity = capacity,
                _ => warn!(
                    "ignoring {}={:?}: expected a positive integer",
                    ENV_PENDING_CAPACITY, raw
                ),
            }
        }

        if let Some(raw) = planar_fallback {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => self.stroke.planar_fallback = true,
                "0" | "false" | "off" => self.stroke.planar_fallback = false,
                _ => warn!("ignoring {}={:?}: expected a boolean", ENV_PLANAR_FALLBACK, raw),
            }
        }
    }
}
