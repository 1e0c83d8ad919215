//! Stroke engine: turns pointer motion into stamp commands.
//!
//! Pointer segments are resampled in screen space, every sample is picked
//! against the scene and converted into a [`StampCommand`]. Commands go to two
//! places: the pending queue the compositor drains for incremental display,
//! and the active stroke buffer that becomes a [`StrokeRecord`] on pointer-up.

use std::collections::VecDeque;

use glam::Vec2;
use knobpaint_config::StrokeSettings;
use tracing::{debug, info, warn};

use crate::brush::BrushSettings;
use crate::constants::{MAX_RESAMPLE_STEPS, MIN_UV_RADIUS};
use crate::picker::{PickContext, SampleSource, SurfaceSample};
use crate::types::{StampCommand, StrokeRecord};

/// Starting state of the per-stroke seed generator
const INITIAL_SEED_STATE: u32 = 0x9e37_79b9;

/// Interpolate a drag segment into evenly spaced screen points.
///
/// Returns `steps + 1` points with `steps = clamp(ceil(distance / spacing), 1, 96)`,
/// the first equal to `start` and the last equal to `end`.
pub fn resample_stroke(start: Vec2, end: Vec2, spacing: f32) -> Vec<Vec2> {
    let distance = start.distance(end);
    let steps = if spacing > 0.0 && distance.is_finite() {
        ((distance / spacing).ceil() as usize).clamp(1, MAX_RESAMPLE_STEPS)
    } else {
        1
    };

    let mut points: Vec<Vec2> = (0..steps)
        .map(|i| start.lerp(end, i as f32 / steps as f32))
        .collect();
    points.push(end);
    points
}

/// Stroke lifecycle state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeState {
    Idle,
    Active {
        /// Layer every command of this stroke targets
        layer_index: usize,
        /// Last pointer position seen by the stroke
        last_screen: Vec2,
    },
}

/// Generates stamp commands from pointer events
#[derive(Debug, Clone)]
pub struct StrokeEngine {
    brush: BrushSettings,
    state: StrokeState,
    /// Commands not yet consumed by the compositor, oldest first
    pending: VecDeque<StampCommand>,
    pending_capacity: usize,
    dropped_pending: u64,
    /// Commands of the in-flight stroke
    active: Vec<StampCommand>,
    seed_state: u32,
    seed: u32,
    painting_enabled: bool,
    planar_fallback: bool,
    last_source: SampleSource,
}

impl StrokeEngine {
    pub fn new(settings: &StrokeSettings) -> Self {
        Self {
            brush: BrushSettings::from_stroke_settings(settings),
            state: StrokeState::Idle,
            pending: VecDeque::new(),
            pending_capacity: settings.pending_capacity.max(1),
            dropped_pending: 0,
            active: Vec::new(),
            seed_state: INITIAL_SEED_STATE,
            seed: 0,
            painting_enabled: true,
            planar_fallback: settings.planar_fallback,
            last_source: SampleSource::Idle,
        }
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    /// Replace the brush. Takes effect for the next stamp.
    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = brush.sanitized();
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, StrokeState::Active { .. })
    }

    /// Layer of the in-flight stroke
    pub fn stroke_layer(&self) -> Option<usize> {
        match self.state {
            StrokeState::Active { layer_index, .. } => Some(layer_index),
            StrokeState::Idle => None,
        }
    }

    pub fn painting_enabled(&self) -> bool {
        self.painting_enabled
    }

    /// Enable or disable painting. Only gates new strokes.
    pub fn set_painting_enabled(&mut self, enabled: bool) {
        self.painting_enabled = enabled;
    }

    pub fn planar_fallback(&self) -> bool {
        self.planar_fallback
    }

    pub fn set_planar_fallback(&mut self, enabled: bool) {
        self.planar_fallback = enabled;
    }

    /// Seed of the current (or most recent) stroke
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Source of the most recent surface sample
    pub fn last_source(&self) -> SampleSource {
        self.last_source
    }

    /// Commands of the in-flight stroke
    pub fn active_commands(&self) -> &[StampCommand] {
        &self.active
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of pending commands evicted because the queue was full
    pub fn dropped_pending(&self) -> u64 {
        self.dropped_pending
    }

    /// Take every pending command in FIFO order
    pub fn drain_pending(&mut self) -> Vec<StampCommand> {
        self.pending.drain(..).collect()
    }

    /// Build the command for a single screen point without touching engine state.
    ///
    /// Returns `None` when nothing is under the pointer.
    pub fn stamp_at(
        &self,
        screen: Vec2,
        context: &PickContext<'_>,
        layer_index: usize,
    ) -> Option<StampCommand> {
        let sample = context.sample(screen, self.planar_fallback);
        self.command_for_sample(sample, context, layer_index)
    }

    fn command_for_sample(
        &self,
        sample: SurfaceSample,
        context: &PickContext<'_>,
        layer_index: usize,
    ) -> Option<StampCommand> {
        let uv_center = sample.uv()?;

        let world_radius = self.brush.size_px * 0.5 / context.camera.zoom;
        let uv_radius = world_radius / (2.0 * context.reference_radius);
        let uv_radius = if uv_radius.is_finite() {
            uv_radius.max(MIN_UV_RADIUS)
        } else {
            MIN_UV_RADIUS
        };

        Some(StampCommand {
            uv_center,
            uv_radius,
            opacity: self.brush.opacity.clamp(0.0, 1.0),
            spread: self.brush.spread.clamp(0.0, 1.0),
            channel: self.brush.channel,
            brush_kind: self.brush.brush_kind,
            abrasion_kind: self.brush.abrasion_kind,
            color: self.brush.color,
            seed: self.seed,
            layer_index,
        })
    }

    /// Sample, convert and enqueue one point. Returns whether a command was emitted.
    fn emit(&mut self, screen: Vec2, context: &PickContext<'_>, layer_index: usize) -> bool {
        let sample = context.sample(screen, self.planar_fallback);
        self.last_source = sample.source();

        let Some(command) = self.command_for_sample(sample, context, layer_index) else {
            return false;
        };

        self.active.push(command);
        self.pending.push_back(command);
        while self.pending.len() > self.pending_capacity {
            self.pending.pop_front();
            self.dropped_pending += 1;
        }
        true
    }

    fn next_seed(&mut self) -> u32 {
        self.seed_state = self
            .seed_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.seed_state
    }

    /// Start a stroke on `layer_index` and stamp the down position.
    ///
    /// Returns `false` when painting is disabled. A stroke that is still in
    /// flight is discarded.
    pub fn begin_stroke(
        &mut self,
        screen: Vec2,
        context: &PickContext<'_>,
        layer_index: usize,
    ) -> bool {
        if !self.painting_enabled {
            debug!("begin_stroke: painting disabled, ignoring");
            return false;
        }
        if self.is_active() {
            warn!(
                "begin_stroke: discarding unfinished stroke with {} commands",
                self.active.len()
            );
        }

        self.active.clear();
        self.seed = self.next_seed();
        self.state = StrokeState::Active {
            layer_index,
            last_screen: screen,
        };

        let emitted = self.emit(screen, context, layer_index);
        debug!(
            "begin_stroke: layer={}, seed={:#x}, source={:?}, emitted={}",
            layer_index, self.seed, self.last_source, emitted
        );
        true
    }

    /// Extend the active stroke to `screen`. Returns the number of commands emitted.
    pub fn continue_stroke(&mut self, screen: Vec2, context: &PickContext<'_>) -> usize {
        let StrokeState::Active {
            layer_index,
            last_screen,
        } = self.state
        else {
            debug!("continue_stroke: no active stroke, ignoring");
            return 0;
        };

        let points = resample_stroke(last_screen, screen, self.brush.spacing_px());
        // The first point was stamped by the previous event
        let emitted = points
            .iter()
            .skip(1)
            .filter(|&&point| self.emit(point, context, layer_index))
            .count();

        self.state = StrokeState::Active {
            layer_index,
            last_screen: screen,
        };
        emitted
    }

    /// Finish the active stroke.
    ///
    /// Returns the record to commit, or `None` if the stroke produced no commands.
    pub fn end_stroke(&mut self) -> Option<StrokeRecord> {
        let StrokeState::Active { layer_index, .. } = self.state else {
            debug!("end_stroke: no active stroke");
            return None;
        };
        self.state = StrokeState::Idle;

        let commands = std::mem::take(&mut self.active);
        if commands.is_empty() {
            debug!("end_stroke: stroke produced no commands, nothing to commit");
            return None;
        }

        info!(
            "end_stroke: layer={}, {} commands",
            layer_index,
            commands.len()
        );
        Some(StrokeRecord {
            layer_index,
            commands,
        })
    }

    /// Abandon the active stroke without producing a record.
    ///
    /// Commands already queued for the compositor stay queued. Returns whether
    /// a stroke was active.
    pub fn cancel_stroke(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        debug!("cancel_stroke: discarding {} commands", self.active.len());
        self.state = StrokeState::Idle;
        self.active.clear();
        true
    }

    /// Return to idle with empty queues
    pub fn reset(&mut self) {
        self.state = StrokeState::Idle;
        self.active.clear();
        self.pending.clear();
        self.last_source = SampleSource::Idle;
    }

    /// Renumber in-flight commands after layer `deleted` was removed.
    ///
    /// Commands on the deleted layer are dropped. If the active stroke targeted
    /// it, the stroke continues on `replacement` (an index in the new numbering).
    pub fn remap_deleted_layer(&mut self, deleted: usize, replacement: usize) {
        self.pending
            .retain_mut(|command| remap_command(command, deleted));
        self.active
            .retain_mut(|command| remap_command(command, deleted));

        if let StrokeState::Active {
            layer_index,
            last_screen,
        } = self.state
        {
            let layer_index = match layer_index {
                index if index == deleted => replacement,
                index if index > deleted => index - 1,
                index => index,
            };
            self.state = StrokeState::Active {
                layer_index,
                last_screen,
            };
        }
    }
}

/// Apply the delete remap to one command. Returns `false` if it must be dropped.
fn remap_command(command: &mut StampCommand, deleted: usize) -> bool {
    if command.layer_index == deleted {
        return false;
    }
    if command.layer_index > deleted {
        command.layer_index -= 1;
    }
    true
}
