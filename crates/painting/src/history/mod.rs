//! Committed stroke history and the layer list
//!
//! History is an ordered list of frozen [`StrokeRecord`]s plus a revision
//! cursor. Everything before the cursor is applied; undo and redo only move
//! the cursor and ask the compositor for a full replay of the applied prefix.
//! Layer edits live in [`layers`].

mod layers;

use tracing::{debug, info};

use crate::types::{Layer, StampCommand, StrokeRecord};

/// Name given to the layer every history starts with
pub const DEFAULT_LAYER_NAME: &str = "Layer 1";

/// Error type for history and layer mutations.
///
/// Every error leaves the history unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Layer index {index} out of range ({len} layers)")]
    LayerOutOfRange { index: usize, len: usize },
    #[error("Layer name is blank")]
    BlankName,
    #[error("Cannot delete the last layer")]
    LastLayer,
}

/// Snapshot of everything that is persisted in a paint document
///
/// The default state already holds [`DEFAULT_LAYER_NAME`] instead of gaining
/// it lazily on first use, so the layer list is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    pub layers: Vec<Layer>,
    pub strokes: Vec<StrokeRecord>,
    /// Number of applied strokes, in `[0, strokes.len()]`
    pub revision: usize,
    pub active_layer: usize,
    /// Layer the compositor highlights; others are dimmed
    pub focused_layer: Option<usize>,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new(DEFAULT_LAYER_NAME)],
            strokes: Vec::new(),
            revision: 0,
            active_layer: 0,
            focused_layer: None,
        }
    }
}

impl HistoryState {
    /// Bring every index into range.
    ///
    /// An empty layer list gets the default layer. Stroke layers are clamped
    /// to the last layer and every command is retagged with its stroke's
    /// layer. Strokes without commands are dropped.
    pub fn normalized(mut self) -> Self {
        if self.layers.is_empty() {
            self.layers.push(Layer::new(DEFAULT_LAYER_NAME));
        }
        let last_layer = self.layers.len() - 1;

        self.strokes.retain(|stroke| !stroke.commands.is_empty());
        for stroke in &mut self.strokes {
            stroke.layer_index = stroke.layer_index.min(last_layer);
            for command in &mut stroke.commands {
                command.layer_index = stroke.layer_index;
            }
        }

        self.revision = self.revision.min(self.strokes.len());
        self.active_layer = self.active_layer.min(last_layer);
        self.focused_layer = self.focused_layer.filter(|&index| index <= last_layer);
        self
    }
}

/// Owner of the layer list and committed strokes
#[derive(Debug, Clone, Default)]
pub struct LayerHistory {
    state: HistoryState,
    /// Set whenever the compositor must rebuild from scratch
    replay_requested: bool,
}

impl LayerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing state, normalizing it first
    pub fn from_state(state: HistoryState) -> Self {
        Self {
            state: state.normalized(),
            replay_requested: true,
        }
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    /// Replace the whole state in one step and request a replay
    pub fn replace_state(&mut self, state: HistoryState) {
        self.state = state.normalized();
        self.replay_requested = true;
    }

    pub fn strokes(&self) -> &[StrokeRecord] {
        &self.state.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.state.strokes.len()
    }

    pub fn revision(&self) -> usize {
        self.state.revision
    }

    pub fn can_undo(&self) -> bool {
        self.state.revision > 0
    }

    pub fn can_redo(&self) -> bool {
        self.state.revision < self.state.strokes.len()
    }

    /// Append a stroke on `layer_index`.
    ///
    /// Empty command lists are ignored. Strokes past the revision (the redo
    /// future) are discarded first. Commands are retagged with `layer_index`.
    pub fn commit(
        &mut self,
        layer_index: usize,
        mut commands: Vec<StampCommand>,
    ) -> Result<(), HistoryError> {
        if commands.is_empty() {
            debug!("commit: no commands, ignoring");
            return Ok(());
        }
        let len = self.state.layers.len();
        if layer_index >= len {
            return Err(HistoryError::LayerOutOfRange {
                index: layer_index,
                len,
            });
        }

        if self.state.revision < self.state.strokes.len() {
            debug!(
                "commit: discarding {} undone strokes",
                self.state.strokes.len() - self.state.revision
            );
            self.state.strokes.truncate(self.state.revision);
        }

        for command in &mut commands {
            command.layer_index = layer_index;
        }
        info!(
            "commit: stroke {} on layer {} ({} commands)",
            self.state.strokes.len(),
            layer_index,
            commands.len()
        );
        self.state.strokes.push(StrokeRecord {
            layer_index,
            commands,
        });
        self.state.revision = self.state.strokes.len();
        Ok(())
    }

    /// Move the revision cursor, clamped to `[0, strokes.len()]`.
    ///
    /// Returns whether the revision changed; a change requests a replay.
    pub fn set_revision(&mut self, target: usize) -> bool {
        let target = target.min(self.state.strokes.len());
        if target == self.state.revision {
            return false;
        }
        debug!("set_revision: {} -> {}", self.state.revision, target);
        self.state.revision = target;
        self.replay_requested = true;
        true
    }

    /// Step the revision back by one
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            debug!("undo: nothing to undo");
            return false;
        }
        self.set_revision(self.state.revision - 1)
    }

    /// Step the revision forward by one
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            debug!("redo: nothing to redo");
            return false;
        }
        self.set_revision(self.state.revision + 1)
    }

    /// Strokes the compositor must replay, in order
    pub fn applied_strokes(&self) -> &[StrokeRecord] {
        let end = self.state.revision.min(self.state.strokes.len());
        &self.state.strokes[..end]
    }

    /// Every command of the applied strokes, in replay order
    pub fn replay_commands(&self) -> impl Iterator<Item = &StampCommand> + '_ {
        self.applied_strokes()
            .iter()
            .flat_map(|stroke| stroke.commands.iter())
    }

    pub fn replay_requested(&self) -> bool {
        self.replay_requested
    }

    /// Ask the compositor for a full replay
    pub fn request_replay(&mut self) {
        self.replay_requested = true;
    }

    /// Return whether a replay is needed and clear the request
    pub fn take_replay_request(&mut self) -> bool {
        std::mem::take(&mut self.replay_requested)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{AbrasionKind, BrushKind, Channel};
    use glam::{Vec2, Vec3};

    pub(crate) fn command(u: f32, channel: Channel) -> StampCommand {
        StampCommand {
            uv_center: Vec2::new(u, 0.5),
            uv_radius: 0.02,
            opacity: 0.8,
            spread: 0.3,
            channel,
            brush_kind: BrushKind::Round,
            abrasion_kind: AbrasionKind::None,
            color: Vec3::new(0.2, 0.4, 0.6),
            seed: 9,
            layer_index: 0,
        }
    }

    /// History with `layer_count` layers and one stroke per entry of `stroke_layers`
    pub(crate) fn history_with_strokes(
        layer_count: usize,
        stroke_layers: &[usize],
    ) -> LayerHistory {
        let mut history = LayerHistory::new();
        for _ in 1..layer_count {
            history.add_layer(None);
        }
        for (i, &layer) in stroke_layers.iter().enumerate() {
            history
                .commit(layer, vec![command(i as f32 * 0.1, Channel::Color)])
                .unwrap();
        }
        history.take_replay_request();
        history
    }

    #[test]
    fn test_new_history_has_default_layer() {
        let history = LayerHistory::new();
        assert_eq!(history.layer_count(), 1);
        assert_eq!(history.layers()[0].name, DEFAULT_LAYER_NAME);
        assert_eq!(history.revision(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_commit_appends_and_retags() {
        let mut history = history_with_strokes(2, &[]);
        let mut commands = vec![command(0.1, Channel::Color), command(0.2, Channel::Height)];
        commands[1].layer_index = 7;

        history.commit(1, commands).unwrap();
        assert_eq!(history.stroke_count(), 1);
        assert_eq!(history.revision(), 1);
        assert!(history.strokes()[0].commands.iter().all(|c| c.layer_index == 1));
    }

    #[test]
    fn test_commit_empty_is_noop() {
        let mut history = history_with_strokes(1, &[0, 0]);
        history.set_revision(1);
        let before = history.state().clone();

        history.commit(0, Vec::new()).unwrap();
        assert_eq!(history.state(), &before);
    }

    #[test]
    fn test_commit_rejects_unknown_layer() {
        let mut history = history_with_strokes(2, &[0]);
        let before = history.state().clone();

        let err = history.commit(5, vec![command(0.0, Channel::Color)]).unwrap_err();
        assert_eq!(err, HistoryError::LayerOutOfRange { index: 5, len: 2 });
        assert_eq!(history.state(), &before);
    }

    #[test]
    fn test_commit_truncates_redo_future() {
        let mut history = history_with_strokes(1, &[0, 0, 0, 0, 0]);
        history.set_revision(2);

        history.commit(0, vec![command(0.9, Channel::Metallic)]).unwrap();
        assert_eq!(history.stroke_count(), 3);
        assert_eq!(history.revision(), 3);
        assert_eq!(history.strokes()[2].commands[0].channel, Channel::Metallic);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_set_revision_is_clamped() {
        let mut history = history_with_strokes(1, &[0, 0, 0]);

        for target in [0, 1, 3, 4, 100, usize::MAX] {
            history.set_revision(target);
            assert!(history.revision() <= history.stroke_count());
        }
        assert_eq!(history.revision(), 3);

        assert!(history.set_revision(0));
        assert!(!history.set_revision(0));
        assert_eq!(history.revision(), 0);
    }

    #[test]
    fn test_undo_redo_and_replay_request() {
        let mut history = history_with_strokes(1, &[0, 0]);
        assert!(!history.take_replay_request());

        assert!(history.undo());
        assert_eq!(history.revision(), 1);
        assert_eq!(history.applied_strokes().len(), 1);
        assert!(history.take_replay_request());
        assert!(!history.take_replay_request());

        assert!(history.undo());
        assert!(!history.undo());
        assert_eq!(history.replay_commands().count(), 0);

        assert!(history.redo());
        assert!(history.redo());
        assert!(!history.redo());
        assert_eq!(history.replay_commands().count(), 2);
    }

    #[test]
    fn test_normalized_clamps_indices() {
        let mut stroke = StrokeRecord {
            layer_index: 9,
            commands: vec![command(0.1, Channel::Color)],
        };
        stroke.commands[0].layer_index = 4;
        let state = HistoryState {
            layers: vec![Layer::new("Base"), Layer::new("Detail")],
            strokes: vec![
                stroke,
                StrokeRecord {
                    layer_index: 0,
                    commands: Vec::new(),
                },
            ],
            revision: 10,
            active_layer: 3,
            focused_layer: Some(2),
        }
        .normalized();

        assert_eq!(state.strokes.len(), 1);
        assert_eq!(state.strokes[0].layer_index, 1);
        assert_eq!(state.strokes[0].commands[0].layer_index, 1);
        assert_eq!(state.revision, 1);
        assert_eq!(state.active_layer, 1);
        assert_eq!(state.focused_layer, None);

        let empty = HistoryState {
            layers: Vec::new(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(empty.layers, vec![Layer::new(DEFAULT_LAYER_NAME)]);
    }
}
