//! Ordered layer stack
//!
//! Insertion order is z-order: the last layer is drawn on top. The stack
//! also tracks the active (selected) layer, which is always either `None`
//! or the id of a layer currently in the stack.
//!
//! Operations that name a missing id do nothing and report it through
//! their return value.

use std::sync::Arc;

use crate::compositor::document::SourceImage;
use crate::compositor::geometry::LayerBounds;
use crate::compositor::layer::{Layer, LayerId};

/// Offset of the first layer added after a base load
const NEW_LAYER_ORIGIN: f32 = 20.0;
/// Extra offset per subsequently added layer, so new layers never overlap exactly
const NEW_LAYER_STEP: f32 = 10.0;
/// Default shift of a duplicate relative to its source
pub const DEFAULT_DUPLICATE_OFFSET: f32 = 20.0;
/// Suffix appended to the name of a duplicate
const DUPLICATE_SUFFIX: &str = " copy";

/// Ordered collection of layers with active-selection tracking
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<LayerId>,
    next_id: u32,
    /// Number of layers placed by `append_new` since the last clear
    placed: u32,
    duplicate_offset: f32,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            active: None,
            next_id: 1,
            placed: 0,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
        }
    }

    /// Use a different shift for duplicates
    pub fn with_duplicate_offset(mut self, offset: f32) -> Self {
        if offset.is_finite() {
            self.duplicate_offset = offset;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom to top
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Visible layers bottom to top, in paint order
    pub fn visible_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.visible)
    }

    /// Ids bottom to top
    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Apply an edit to one layer. Returns false if the id is unknown.
    pub fn update(&mut self, id: LayerId, edit: impl FnOnce(&mut Layer)) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                edit(layer);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.get(id))
    }

    /// Select a layer, or clear the selection with `None`.
    /// Unknown ids leave the selection unchanged and return false.
    pub fn set_active(&mut self, id: Option<LayerId>) -> bool {
        match id {
            Some(id) if self.index_of(id).is_none() => false,
            _ => {
                self.active = id;
                true
            }
        }
    }

    /// Move a layer one step toward the top. No-op at the top.
    pub fn raise(&mut self, id: LayerId) -> bool {
        match self.index_of(id) {
            Some(idx) if idx + 1 < self.layers.len() => {
                self.layers.swap(idx, idx + 1);
                true
            }
            _ => false,
        }
    }

    /// Move a layer one step toward the bottom. No-op at the bottom.
    pub fn lower(&mut self, id: LayerId) -> bool {
        match self.index_of(id) {
            Some(idx) if idx > 0 => {
                self.layers.swap(idx, idx - 1);
                true
            }
            _ => false,
        }
    }

    /// Insert a copy of a layer directly above it, shifted so it is
    /// visibly distinct. Returns the new id.
    pub fn duplicate(&mut self, id: LayerId) -> Option<LayerId> {
        let idx = self.index_of(id)?;
        let new_id = self.allocate_id();
        let mut copy = self.layers[idx].clone();
        copy.id = new_id;
        copy.name.push_str(DUPLICATE_SUFFIX);
        copy.translate(self.duplicate_offset, self.duplicate_offset);
        self.layers.insert(idx + 1, copy);
        tracing::debug!(source = %id, duplicate = %new_id, "Duplicated layer");
        Some(new_id)
    }

    /// Remove a layer. Clears the selection if it was the active layer.
    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let idx = self.index_of(id)?;
        let removed = self.layers.remove(idx);
        if self.active == Some(id) {
            self.active = None;
        }
        tracing::debug!(layer = %id, "Removed layer");
        Some(removed)
    }

    /// Remove the active layer, if any
    pub fn remove_active(&mut self) -> Option<Layer> {
        let id = self.active?;
        self.remove(id)
    }

    /// Move the active layer by a model-space offset
    pub fn nudge_active(&mut self, dx: f32, dy: f32) -> bool {
        match self.active {
            Some(id) => self.update(id, |l| l.translate(dx, dy)),
            None => false,
        }
    }

    /// Add a new layer on top of the stack and make it active.
    ///
    /// The initial size is the source's natural size with each axis clamped
    /// to `max_size` when given. Each new layer is offset a little further
    /// than the previous one.
    pub fn append_new(
        &mut self,
        source: Arc<SourceImage>,
        name: Option<&str>,
        max_size: Option<(f32, f32)>,
    ) -> LayerId {
        let natural = (source.natural_width() as f32, source.natural_height() as f32);
        let (width, height) = initial_size(natural, max_size);
        let offset = NEW_LAYER_ORIGIN + self.placed as f32 * NEW_LAYER_STEP;

        let id = self.allocate_id();
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Layer {}", self.layers.len() + 1),
        };
        let layer = Layer::new(id, name, source, LayerBounds::new(offset, offset, width, height));
        tracing::debug!(layer = %id, width, height, "Added layer");

        self.layers.push(layer);
        self.placed += 1;
        self.active = Some(id);
        id
    }

    /// Drop every layer and the selection
    pub fn clear(&mut self) {
        self.layers.clear();
        self.active = None;
        self.placed = 0;
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn initial_size(natural: (f32, f32), max_size: Option<(f32, f32)>) -> (f32, f32) {
    let Some((max_w, max_h)) = max_size else {
        return natural;
    };
    let clamp = |value: f32, max: f32| {
        if max.is_finite() && max > 0.0 {
            value.min(max)
        } else {
            value
        }
    };
    (clamp(natural.0, max_w), clamp(natural.1, max_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn source(w: u32, h: u32) -> Arc<SourceImage> {
        Arc::new(SourceImage::from_pixels("src.png", RgbaImage::new(w, h)))
    }

    fn stack_of(n: usize) -> (LayerStack, Vec<LayerId>) {
        let mut stack = LayerStack::new();
        let ids = (0..n)
            .map(|i| stack.append_new(source(10, 10), Some(&format!("L{}", i)), None))
            .collect();
        (stack, ids)
    }

    #[test]
    fn test_append_defaults_and_active() {
        let (stack, ids) = stack_of(2);
        let top = stack.get(ids[1]).unwrap();
        assert_eq!(top.rotation(), 0.0);
        assert_eq!(top.opacity, 1.0);
        assert!(top.visible);
        assert_eq!(stack.active(), Some(ids[1]));
    }

    #[test]
    fn test_append_offsets_successive_layers() {
        let (stack, ids) = stack_of(3);
        let xs: Vec<f32> = ids.iter().map(|&id| stack.get(id).unwrap().bounds().x).collect();
        assert_eq!(xs, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_append_clamps_each_axis_to_base() {
        let mut stack = LayerStack::new();
        let id = stack.append_new(source(1600, 400), None, Some((800.0, 600.0)));
        let b = stack.get(id).unwrap().bounds();
        assert_eq!((b.width, b.height), (800.0, 400.0));

        let id = stack.append_new(source(300, 900), None, Some((800.0, 600.0)));
        let b = stack.get(id).unwrap().bounds();
        assert_eq!((b.width, b.height), (300.0, 600.0));

        let id = stack.append_new(source(100, 50), None, Some((800.0, 600.0)));
        let b = stack.get(id).unwrap().bounds();
        assert_eq!((b.width, b.height), (100.0, 50.0));
        assert_eq!(stack.get(id).unwrap().name, "Layer 3");
    }

    #[test]
    fn test_raise_lower_boundaries() {
        let (mut stack, ids) = stack_of(3);
        assert!(!stack.raise(ids[2]));
        assert!(!stack.lower(ids[0]));
        assert!(stack.raise(ids[0]));
        assert_eq!(stack.ids(), vec![ids[1], ids[0], ids[2]]);
        assert!(stack.lower(ids[2]));
        assert_eq!(stack.ids(), vec![ids[1], ids[2], ids[0]]);
        assert!(!stack.raise(LayerId(999)));
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let (mut stack, ids) = stack_of(3);
        let dup = stack.duplicate(ids[0]).unwrap();
        assert_eq!(stack.index_of(dup), Some(1));
        assert!(!ids.contains(&dup));

        let src = stack.get(ids[0]).unwrap().bounds();
        let copy = stack.get(dup).unwrap();
        assert_eq!(copy.bounds().x, src.x + 20.0);
        assert_eq!(copy.bounds().y, src.y + 20.0);
        assert_eq!(copy.name, "L0 copy");
        assert!(stack.duplicate(LayerId(999)).is_none());
    }

    #[test]
    fn test_remove_active_clears_selection() {
        let (mut stack, ids) = stack_of(2);
        assert_eq!(stack.active(), Some(ids[1]));
        stack.remove(ids[1]);
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn test_remove_other_keeps_selection() {
        let (mut stack, ids) = stack_of(3);
        stack.set_active(Some(ids[1]));
        stack.remove(ids[0]);
        assert_eq!(stack.active(), Some(ids[1]));
        assert!(stack.remove(ids[0]).is_none());
    }

    #[test]
    fn test_set_active_rejects_unknown() {
        let (mut stack, ids) = stack_of(1);
        assert!(!stack.set_active(Some(LayerId(42))));
        assert_eq!(stack.active(), Some(ids[0]));
        assert!(stack.set_active(None));
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn test_nudge_active() {
        let (mut stack, ids) = stack_of(1);
        assert!(stack.nudge_active(10.0, -1.0));
        let b = stack.get(ids[0]).unwrap().bounds();
        assert_eq!((b.x, b.y), (30.0, 19.0));
        stack.set_active(None);
        assert!(!stack.nudge_active(1.0, 1.0));
    }

    #[test]
    fn test_clear_resets_placement() {
        let (mut stack, _) = stack_of(2);
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.active(), None);
        let id = stack.append_new(source(4, 4), None, None);
        assert_eq!(stack.get(id).unwrap().bounds().x, 20.0);
    }
}
