//! Layer list edits for the history store

use tracing::{debug, info};

use crate::types::Layer;

use super::{HistoryError, LayerHistory};

impl LayerHistory {
    pub fn layers(&self) -> &[Layer] {
        &self.state.layers
    }

    pub fn layer_count(&self) -> usize {
        self.state.layers.len()
    }

    pub fn active_layer(&self) -> usize {
        self.state.active_layer
    }

    pub fn focused_layer(&self) -> Option<usize> {
        self.state.focused_layer
    }

    fn check_index(&self, index: usize) -> Result<(), HistoryError> {
        let len = self.state.layers.len();
        if index >= len {
            return Err(HistoryError::LayerOutOfRange { index, len });
        }
        Ok(())
    }

    fn name_taken(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.state
            .layers
            .iter()
            .any(|layer| layer.name.to_lowercase() == lowered)
    }

    /// Append a layer and make it active. Returns its index.
    ///
    /// A missing, blank, or case-insensitively duplicate name is replaced by
    /// the next free `"Layer {n}"`.
    pub fn add_layer(&mut self, name: Option<&str>) -> usize {
        let requested = name.map(str::trim).filter(|name| !name.is_empty());
        let name = match requested {
            Some(name) if !self.name_taken(name) => name.to_string(),
            _ => {
                let mut n = self.state.layers.len() + 1;
                while self.name_taken(&format!("Layer {n}")) {
                    n += 1;
                }
                format!("Layer {n}")
            }
        };

        info!("add_layer: {:?}", name);
        self.state.layers.push(Layer::new(name));
        self.state.active_layer = self.state.layers.len() - 1;
        self.replay_requested = true;
        self.state.active_layer
    }

    /// Rename a layer. The name is trimmed and must not be blank.
    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<(), HistoryError> {
        self.check_index(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(HistoryError::BlankName);
        }

        debug!("rename_layer: {} -> {:?}", index, name);
        self.state.layers[index].name = name.to_string();
        self.replay_requested = true;
        Ok(())
    }

    /// Remove a layer and every stroke painted on it.
    ///
    /// Layer references above `index` shift down by one. The revision is
    /// clamped to the new stroke count. The active layer keeps its position
    /// (clamped) when it was the one deleted; focus on the deleted layer is
    /// cleared.
    pub fn delete_layer(&mut self, index: usize) -> Result<(), HistoryError> {
        self.check_index(index)?;
        if self.state.layers.len() == 1 {
            return Err(HistoryError::LastLayer);
        }

        self.state.layers.remove(index);
        let last_layer = self.state.layers.len() - 1;

        self.state.strokes.retain_mut(|stroke| {
            if stroke.layer_index == index {
                return false;
            }
            if stroke.layer_index > index {
                stroke.layer_index -= 1;
                for command in &mut stroke.commands {
                    command.layer_index = stroke.layer_index;
                }
            }
            true
        });
        self.state.revision = self.state.revision.min(self.state.strokes.len());

        self.state.active_layer = if self.state.active_layer > index {
            self.state.active_layer - 1
        } else {
            self.state.active_layer.min(last_layer)
        };
        self.state.focused_layer = match self.state.focused_layer {
            Some(focused) if focused == index => None,
            Some(focused) if focused > index => Some(focused - 1),
            other => other,
        };

        info!(
            "delete_layer: removed layer {}, {} strokes remain, revision {}",
            index,
            self.state.strokes.len(),
            self.state.revision
        );
        self.replay_requested = true;
        Ok(())
    }

    /// Select the active layer, clamped to the layer list. Returns the new index.
    pub fn set_active_layer(&mut self, index: usize) -> usize {
        self.state.active_layer = index.min(self.state.layers.len().saturating_sub(1));
        self.state.active_layer
    }

    /// Focus a layer, or clear focus with `None`
    pub fn set_focused_layer(&mut self, index: Option<usize>) -> Result<(), HistoryError> {
        if let Some(index) = index {
            self.check_index(index)?;
        }
        self.state.focused_layer = index;
        Ok(())
    }

    /// Whether the compositor should dim `layer` under the current focus
    pub fn is_dimmed(&self, layer: usize) -> bool {
        self.state
            .focused_layer
            .is_some_and(|focused| focused != layer)
    }
}
