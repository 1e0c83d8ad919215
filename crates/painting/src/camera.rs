//! Orbit view state and the orthographic camera basis derived from it.

use glam::{Vec2, Vec3};
use knobpaint_config::ViewportConfig;
use serde::{Deserialize, Serialize};

/// Pitch is kept this far from the poles so the basis never degenerates
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Screen pixels per world unit at the default zoom
pub const DEFAULT_ZOOM: f32 = 240.0;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 100_000.0;

/// Independent axis flips applied by the authoring UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AxisInversion {
    /// Invert horizontal orbit drag
    pub orbit_x: bool,
    /// Invert vertical orbit drag
    pub orbit_y: bool,
    /// Mirror resolved U
    pub flip_u: bool,
    /// Mirror resolved V
    pub flip_v: bool,
}

/// Orbit camera parameters persisted in the view document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Horizontal angle around the up axis, radians
    pub yaw: f32,
    /// Vertical angle from the horizontal plane, radians
    pub pitch: f32,
    /// Screen pixels per world unit
    pub zoom: f32,
    /// Pan offset in world units along the camera's right/up axes
    pub pan: Vec2,
    pub inversion: AxisInversion,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            zoom: DEFAULT_ZOOM,
            pan: Vec2::ZERO,
            inversion: AxisInversion::default(),
        }
    }
}

impl ViewState {
    /// Replace non-finite values with defaults and clamp pitch and zoom.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| {
            if value.is_finite() { value } else { fallback }
        };

        Self {
            yaw: finite_or(self.yaw, defaults.yaw),
            pitch: finite_or(self.pitch, defaults.pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT),
            zoom: if self.zoom.is_finite() && self.zoom > 0.0 {
                self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
            } else {
                defaults.zoom
            },
            pan: if self.pan.is_finite() { self.pan } else { defaults.pan },
            inversion: self.inversion,
        }
    }

    /// Apply an orbit drag in radians, honoring the orbit inversion flags.
    ///
    /// Non-finite deltas are ignored.
    pub fn orbit(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        let sign = |inverted: bool| if inverted { -1.0 } else { 1.0 };
        self.yaw += delta.x * sign(self.inversion.orbit_x);
        self.pitch = (self.pitch + delta.y * sign(self.inversion.orbit_y))
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Multiply zoom by `factor`, clamped to the supported range.
    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Direction from the orbit target toward the camera
    fn eye_direction(&self) -> Vec3 {
        let pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let horizontal = pitch.cos();
        Vec3::new(horizontal * self.yaw.sin(), pitch.sin(), horizontal * self.yaw.cos())
    }

    /// Orthographic basis for the given viewport
    pub fn camera_basis(&self, viewport: &ViewportConfig) -> CameraBasis {
        let forward = -self.eye_direction();
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward).normalize_or(Vec3::Y);

        CameraBasis {
            right,
            up,
            forward,
            center: right * self.pan.x + up * self.pan.y,
            zoom: self.zoom,
            viewport: Vec2::new(viewport.width_f32(), viewport.height_f32()),
        }
    }
}

/// Orthographic camera: unit axes, scene center, and zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
    /// World point under the viewport center
    pub center: Vec3,
    /// Screen pixels per world unit
    pub zoom: f32,
    /// Viewport size in device pixels
    pub viewport: Vec2,
}

impl CameraBasis {
    /// World point on the plane through `center` facing the camera
    pub fn screen_to_world(&self, screen: Vec2) -> Vec3 {
        let offset_x = (screen.x - self.viewport.x * 0.5) / self.zoom;
        let offset_y = (self.viewport.y * 0.5 - screen.y) / self.zoom;
        self.center + self.right * offset_x + self.up * offset_y
    }

    /// Whether the basis can un-project screen points
    pub fn is_valid(&self) -> bool {
        self.zoom.is_finite()
            && self.zoom > 0.0
            && self.forward.is_finite()
            && self.forward.length_squared() > 0.0
            && self.center.is_finite()
    }
}
