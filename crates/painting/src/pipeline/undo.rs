//! Undo functionality for the painting pipeline
//!
//! Undo never reverses pixels. It moves the history revision and the
//! compositor replays the applied strokes from scratch.

use super::PaintPipeline;

impl PaintPipeline {
    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo the last applied stroke
    ///
    /// Returns true if an undo was performed, false if no undo available
    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    /// Re-apply the next undone stroke
    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    /// Jump to an arbitrary revision, clamped to the stroke count
    pub fn set_revision(&mut self, target: usize) -> bool {
        self.history.set_revision(target)
    }
}
