//! Document import and export for the painting pipeline

use tracing::{info, warn};

use crate::document::{self, DocumentError};

use super::PaintPipeline;

impl PaintPipeline {
    /// Serialize layers and strokes as a paint document
    pub fn export_paint(&self) -> Result<String, DocumentError> {
        document::export_paint(self.history.state())
    }

    /// Replace layers and strokes from a paint document
    ///
    /// On error nothing changes. On success the stroke engine is reset and a
    /// full replay is requested.
    pub fn import_paint(&mut self, json: &str) -> Result<(), DocumentError> {
        let state = document::import_paint(json).inspect_err(|err| {
            warn!("import_paint: rejected document: {}", err);
        })?;

        if self.engine.is_active() {
            info!("import_paint: discarding the active stroke");
        }
        self.engine.reset();
        self.history.replace_state(state);
        Ok(())
    }

    /// Serialize the camera as a view document
    pub fn export_view(&self) -> Result<String, DocumentError> {
        document::export_view(&self.view)
    }

    /// Replace the camera from a view document. On error nothing changes.
    pub fn import_view(&mut self, json: &str) -> Result<(), DocumentError> {
        self.view = document::import_view(json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::super::tests::{pipeline, Scene};
    use crate::brush::BrushSettings;
    use crate::types::Channel;

    use super::*;

    #[test]
    fn test_paint_document_round_trip() {
        let scene = Scene::cube();
        let candidates = scene.candidates();
        let mut source = pipeline();
        source.add_layer(Some("Roughness"));

        for (layer, channel, x) in [
            (0, Channel::Color, 90.0),
            (1, Channel::Roughness, 100.0),
            (1, Channel::Metallic, 110.0),
        ] {
            source.set_active_layer(layer);
            let brush = BrushSettings {
                channel,
                ..*source.brush()
            };
            source.set_brush(brush);
            source.pointer_down(Vec2::new(x, 100.0), &candidates);
            source.pointer_move(Vec2::new(x, 110.0), &candidates);
            source.pointer_up();
        }
        source.undo();
        source.set_focused_layer(Some(0)).unwrap();

        let json = source.export_paint().unwrap();
        let mut target = pipeline();
        target.import_paint(&json).unwrap();

        assert_eq!(target.history().state(), source.history().state());
        assert!(target.take_replay_request());
    }

    #[test]
    fn test_failed_import_changes_nothing() {
        let scene = Scene::cube();
        let candidates = scene.candidates();
        let mut pipeline = pipeline();
        pipeline.pointer_down(Vec2::new(100.0, 100.0), &candidates);
        pipeline.pointer_up();
        pipeline.pointer_down(Vec2::new(100.0, 100.0), &candidates);
        let before = pipeline.history().state().clone();

        assert!(pipeline.import_paint("{\"layers\": 3}").is_err());
        assert!(pipeline.import_paint("{\"version\": 99}").is_err());
        assert_eq!(pipeline.history().state(), &before);
        assert!(pipeline.is_stroking());
        assert!(!pipeline.take_replay_request());
    }

    #[test]
    fn test_import_resets_engine() {
        let scene = Scene::cube();
        let candidates = scene.candidates();
        let mut pipeline = pipeline();
        pipeline.pointer_down(Vec2::new(100.0, 100.0), &candidates);

        pipeline
            .import_paint(r#"{"layers": [{"name": "A"}, {"name": "B"}], "activeLayerIndex": 1}"#)
            .unwrap();
        assert!(!pipeline.is_stroking());
        assert!(pipeline.drain_pending().is_empty());
        assert_eq!(pipeline.active_layer(), 1);
        assert!(!pipeline.pointer_up());
    }

    #[test]
    fn test_view_document_round_trip() {
        let mut source = pipeline();
        source.view_mut().orbit(Vec2::new(0.4, 0.2));
        source.view_mut().inversion.flip_u = true;

        let json = source.export_view().unwrap();
        let mut target = pipeline();
        target.import_view(&json).unwrap();
        assert_eq!(target.view(), source.view());

        assert!(target.import_view("{").is_err());
        assert_eq!(target.view(), source.view());
    }

    #[test]
    fn test_view_survives_non_finite_orbit() {
        let mut source = pipeline();
        source.view_mut().orbit(Vec2::new(0.3, 0.0));
        source.view_mut().orbit(Vec2::new(f32::NAN, 0.0));
        assert!(source.view().yaw.is_finite());

        let json = source.export_view().unwrap();
        let mut target = pipeline();
        target.import_view(&json).unwrap();
        assert_eq!(target.view(), source.view());
    }
}
