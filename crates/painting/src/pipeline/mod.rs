//! Complete painting pipeline
//!
//! This module provides the session object that connects:
//! - Input handling (pointer events in device pixels)
//! - Surface picking (camera, BVH, planar fallback)
//! - Stroke engine (stamp command generation)
//! - Layer history (commit, undo/redo, layer edits)
//! - Persistence (paint and view documents)
//!
//! The pipeline owns no meshes. Callers pass the pickable meshes to every
//! pointer event as [`PickCandidate`]s.

mod layers;
mod persistence;
mod stroke;
mod undo;

use knobpaint_config::{PaintConfig, ViewportConfig};
use tracing::debug;

use crate::brush::BrushSettings;
use crate::camera::{CameraBasis, ViewState};
use crate::history::LayerHistory;
use crate::picker::{PickCandidate, PickContext, UvFlip};
use crate::stroke::StrokeEngine;
use crate::types::{GpuStamp, StampCommand, StrokeRecord};

/// Painting session for one document
///
/// This struct manages the full painting workflow:
/// 1. Pointer input comes in via `pointer_down`, `pointer_move`, `pointer_up`
/// 2. Each sample is picked against the caller's meshes and becomes a stamp command
/// 3. Commands are queued for the compositor and buffered for the stroke
/// 4. Finished strokes are committed to the layer history
/// 5. History changes that the compositor cannot apply incrementally raise a replay request
#[derive(Debug, Clone)]
pub struct PaintPipeline {
    pub(crate) config: PaintConfig,
    pub(crate) view: ViewState,
    pub(crate) history: LayerHistory,
    pub(crate) engine: StrokeEngine,
}

impl Default for PaintPipeline {
    fn default() -> Self {
        Self::new(PaintConfig::default())
    }
}

impl PaintPipeline {
    pub fn new(config: PaintConfig) -> Self {
        debug!(
            "PaintPipeline::new: viewport {}x{}, pending capacity {}",
            config.viewport.width, config.viewport.height, config.stroke.pending_capacity
        );
        Self {
            engine: StrokeEngine::new(&config.stroke),
            history: LayerHistory::new(),
            view: ViewState::default(),
            config,
        }
    }

    pub fn config(&self) -> &PaintConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: ViewportConfig) {
        self.config.viewport = viewport;
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Replace the view. Invalid values are repaired.
    pub fn set_view(&mut self, view: ViewState) {
        self.view = view.normalized();
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Camera for the configured viewport
    pub fn camera_basis(&self) -> CameraBasis {
        self.view.camera_basis(&self.config.viewport)
    }

    /// UV mirroring from the pick settings combined with the view's flip flags
    pub fn uv_flip(&self) -> UvFlip {
        UvFlip {
            u: self.config.pick.flip_u ^ self.view.inversion.flip_u,
            v: self.config.pick.flip_v ^ self.view.inversion.flip_v,
        }
    }

    /// Picking context for the current camera over `candidates`
    pub fn pick_context<'a>(&self, candidates: &'a [PickCandidate<'a>]) -> PickContext<'a> {
        PickContext::new(self.camera_basis(), candidates, self.config.pick.reference_radius)
            .with_uv_flip(self.uv_flip())
    }

    pub fn history(&self) -> &LayerHistory {
        &self.history
    }

    pub fn engine(&self) -> &StrokeEngine {
        &self.engine
    }

    pub fn brush(&self) -> &BrushSettings {
        self.engine.brush()
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.engine.set_brush(brush);
    }

    pub fn set_painting_enabled(&mut self, enabled: bool) {
        self.engine.set_painting_enabled(enabled);
    }

    pub fn set_planar_fallback(&mut self, enabled: bool) {
        self.engine.set_planar_fallback(enabled);
    }

    /// Take the commands queued since the last drain, oldest first
    pub fn drain_pending(&mut self) -> Vec<StampCommand> {
        self.engine.drain_pending()
    }

    /// [`drain_pending`](Self::drain_pending) converted to the GPU layout
    pub fn drain_pending_gpu(&mut self) -> Vec<GpuStamp> {
        self.engine
            .drain_pending()
            .iter()
            .map(StampCommand::to_gpu)
            .collect()
    }

    pub fn dropped_pending(&self) -> u64 {
        self.engine.dropped_pending()
    }

    /// Strokes to replay after a replay request
    pub fn applied_strokes(&self) -> &[StrokeRecord] {
        self.history.applied_strokes()
    }

    /// Return whether the compositor must rebuild from the applied strokes,
    /// clearing the request
    pub fn take_replay_request(&mut self) -> bool {
        self.history.take_replay_request()
    }
}
