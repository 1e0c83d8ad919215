//! Layer commands for the painting pipeline

use crate::history::HistoryError;
use crate::types::Layer;

use super::PaintPipeline;

impl PaintPipeline {
    pub fn layers(&self) -> &[Layer] {
        self.history.layers()
    }

    pub fn active_layer(&self) -> usize {
        self.history.active_layer()
    }

    pub fn focused_layer(&self) -> Option<usize> {
        self.history.focused_layer()
    }

    /// Add a layer and make it active
    pub fn add_layer(&mut self, name: Option<&str>) -> usize {
        self.history.add_layer(name)
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<(), HistoryError> {
        self.history.rename_layer(index, name)
    }

    /// Delete a layer from history and from every in-flight command
    ///
    /// An active stroke on the deleted layer continues on the new active layer.
    pub fn delete_layer(&mut self, index: usize) -> Result<(), HistoryError> {
        self.history.delete_layer(index)?;
        self.engine
            .remap_deleted_layer(index, self.history.active_layer());
        Ok(())
    }

    pub fn set_active_layer(&mut self, index: usize) -> usize {
        self.history.set_active_layer(index)
    }

    pub fn set_focused_layer(&mut self, index: Option<usize>) -> Result<(), HistoryError> {
        self.history.set_focused_layer(index)
    }

    /// Whether the compositor should dim `layer`
    pub fn is_dimmed(&self, layer: usize) -> bool {
        self.history.is_dimmed(layer)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::super::tests::{pipeline, Scene};
    use super::*;

    #[test]
    fn test_delete_layer_remaps_in_flight_commands() {
        let scene = Scene::cube();
        let candidates = scene.candidates();
        let mut pipeline = pipeline();
        pipeline.add_layer(None);
        pipeline.add_layer(None);

        // Committed stroke on layer 2, then an in-flight stroke on layer 1
        pipeline.pointer_down(Vec2::new(100.0, 100.0), &candidates);
        pipeline.pointer_up();
        pipeline.set_active_layer(1);
        pipeline.pointer_down(Vec2::new(100.0, 100.0), &candidates);

        pipeline.delete_layer(1).unwrap();
        assert_eq!(pipeline.active_layer(), 1);
        assert_eq!(pipeline.history().strokes()[0].layer_index, 1);

        let pending: Vec<usize> = pipeline
            .drain_pending()
            .iter()
            .map(|c| c.layer_index)
            .collect();
        assert_eq!(pending, vec![1]);

        // The stroke keeps going on the remapped active layer
        pipeline.pointer_move(Vec2::new(105.0, 100.0), &candidates);
        assert!(pipeline.pointer_up());
        assert_eq!(pipeline.history().strokes()[1].layer_index, 1);
        assert_eq!(pipeline.history().stroke_count(), 2);
    }

    #[test]
    fn test_layer_failures_leave_state() {
        let mut pipeline = pipeline();
        let before = pipeline.history().state().clone();

        assert_eq!(pipeline.delete_layer(0), Err(HistoryError::LastLayer));
        assert_eq!(pipeline.rename_layer(0, " "), Err(HistoryError::BlankName));
        assert!(pipeline.set_focused_layer(Some(3)).is_err());
        assert_eq!(pipeline.history().state(), &before);
    }

    #[test]
    fn test_focus_dims_other_layers() {
        let mut pipeline = pipeline();
        pipeline.add_layer(Some("Detail"));
        pipeline.set_focused_layer(Some(1)).unwrap();

        assert!(pipeline.is_dimmed(0));
        assert!(!pipeline.is_dimmed(1));
        assert_eq!(pipeline.layers()[1].name, "Detail");
    }
}
