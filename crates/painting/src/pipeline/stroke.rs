//! Pointer handling for the painting pipeline

use glam::Vec2;
use tracing::{debug, warn};

use crate::picker::{PickCandidate, SampleSource};

use super::PaintPipeline;

impl PaintPipeline {
    /// Begin a stroke on the active layer and stamp the down position
    ///
    /// Returns `false` when painting is disabled.
    pub fn pointer_down(&mut self, screen: Vec2, candidates: &[PickCandidate<'_>]) -> bool {
        let context = self.pick_context(candidates);
        let layer_index = self.history.active_layer();
        self.engine.begin_stroke(screen, &context, layer_index)
    }

    /// Continue the stroke with new pointer input
    ///
    /// Returns the number of stamp commands emitted.
    pub fn pointer_move(&mut self, screen: Vec2, candidates: &[PickCandidate<'_>]) -> usize {
        let context = self.pick_context(candidates);
        self.engine.continue_stroke(screen, &context)
    }

    /// Finish the stroke and commit it
    ///
    /// Returns true if a stroke was committed. Strokes that never touched the
    /// surface leave the history untouched.
    pub fn pointer_up(&mut self) -> bool {
        let Some(record) = self.engine.end_stroke() else {
            return false;
        };

        match self.history.commit(record.layer_index, record.commands) {
            Ok(()) => true,
            Err(err) => {
                warn!("pointer_up: commit failed: {}", err);
                false
            }
        }
    }

    /// Cancel the current stroke without committing
    ///
    /// Stamps the compositor already drew are removed by requesting a replay.
    pub fn cancel_stroke(&mut self) -> bool {
        if !self.engine.cancel_stroke() {
            debug!("cancel_stroke: no active stroke");
            return false;
        }
        self.history.request_replay();
        true
    }

    pub fn is_stroking(&self) -> bool {
        self.engine.is_active()
    }

    /// Where the most recent pointer sample landed
    pub fn sample_source(&self) -> SampleSource {
        self.engine.last_source()
    }
}
