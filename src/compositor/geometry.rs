//! Layer geometry in model space
//!
//! Model space is the pixel grid of the base document: origin at the
//! top-left, one unit per source pixel, independent of the preview scale.
//! Everything here is pure math over a layer's box and rotation.

use serde::{Deserialize, Serialize};

/// Smallest width/height a layer may have, in model pixels
pub const MIN_LAYER_SIZE: f32 = 5.0;

/// Corner handle used for interactive resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top-left corner
    Nw,
    /// Top-right corner
    Ne,
    /// Bottom-left corner
    Sw,
    /// Bottom-right corner
    Se,
}

impl ResizeHandle {
    /// All four handles
    pub fn all() -> &'static [ResizeHandle] {
        &[
            ResizeHandle::Nw,
            ResizeHandle::Ne,
            ResizeHandle::Sw,
            ResizeHandle::Se,
        ]
    }

    /// Short name as used by the presentation layer ("nw", "ne", ...)
    pub fn name(&self) -> &'static str {
        match self {
            ResizeHandle::Nw => "nw",
            ResizeHandle::Ne => "ne",
            ResizeHandle::Sw => "sw",
            ResizeHandle::Se => "se",
        }
    }

    /// Whether dragging this handle moves the left edge
    #[inline]
    pub fn moves_left_edge(&self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Sw)
    }

    /// Whether dragging this handle moves the top edge
    #[inline]
    pub fn moves_top_edge(&self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Ne)
    }

    /// Position of this corner in the box's local frame, relative to its
    /// center, as fractions of width/height (-0.5 or 0.5)
    pub fn local_corner(&self) -> (f32, f32) {
        let x = if self.moves_left_edge() { -0.5 } else { 0.5 };
        let y = if self.moves_top_edge() { -0.5 } else { 0.5 };
        (x, y)
    }
}

/// Axis-aligned layer box before rotation
///
/// `x`/`y` is the top-left corner; rotation is applied around the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayerBounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: clamp_extent(width),
            height: clamp_extent(height),
        }
    }

    /// Center of the box in model space
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// width / height, or 1.0 for a degenerate height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Full transform state of a layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerTransform {
    /// Box before rotation
    pub bounds: LayerBounds,
    /// Clockwise rotation in degrees around the box center (unbounded)
    pub rotation: f32,
}

impl LayerTransform {
    pub fn new(bounds: LayerBounds, rotation: f32) -> Self {
        Self { bounds, rotation }
    }

    /// Rotation folded into [-180, 180] for display
    pub fn display_rotation(&self) -> f32 {
        normalize_degrees(self.rotation)
    }

    /// Map a model-space point into the layer's unrotated local frame,
    /// with the origin at the box center
    pub fn to_local(&self, x: f32, y: f32) -> (f32, f32) {
        let (cx, cy) = self.bounds.center();
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let dx = x - cx;
        let dy = y - cy;
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// Map a local point (origin at the box center) back to model space
    pub fn to_model(&self, lx: f32, ly: f32) -> (f32, f32) {
        let (cx, cy) = self.bounds.center();
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (cx + lx * cos - ly * sin, cy + lx * sin + ly * cos)
    }

    /// Whether a model-space point falls inside the rotated box
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (lx, ly) = self.to_local(x, y);
        lx.abs() <= self.bounds.width / 2.0 && ly.abs() <= self.bounds.height / 2.0
    }
}

/// Clamp a width/height to the minimum layer size; non-finite values
/// collapse to the minimum
#[inline]
pub fn clamp_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_LAYER_SIZE)
    } else {
        MIN_LAYER_SIZE
    }
}

#[inline]
fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Compute the new box while a corner handle is dragged.
///
/// `delta` is the pointer displacement since the grab, already converted to
/// model space. The corner opposite `handle` stays where it was in `start`.
/// With `aspect_locked` the height follows the new width using the start
/// ratio; the minimum size is applied after that adjustment.
pub fn resize(
    handle: ResizeHandle,
    delta: (f32, f32),
    start: LayerBounds,
    aspect_locked: bool,
) -> LayerBounds {
    let dx = finite_or_zero(delta.0);
    let dy = finite_or_zero(delta.1);
    let ratio = start.aspect_ratio();

    let width = if handle.moves_left_edge() {
        start.width - dx
    } else {
        start.width + dx
    };
    let height = if aspect_locked {
        width / ratio
    } else if handle.moves_top_edge() {
        start.height - dy
    } else {
        start.height + dy
    };

    let width = clamp_extent(width);
    let height = clamp_extent(height);

    let x = if handle.moves_left_edge() {
        start.x + start.width - width
    } else {
        start.x
    };
    let y = if handle.moves_top_edge() {
        start.y + start.height - height
    } else {
        start.y
    };

    LayerBounds {
        x,
        y,
        width,
        height,
    }
}

/// Angle in degrees of `pointer` around `pivot`, both in screen space
pub fn pointer_angle(pointer: (f32, f32), pivot: (f32, f32)) -> f32 {
    let dy = pointer.1 - pivot.1;
    let dx = pointer.0 - pivot.0;
    dy.atan2(dx).to_degrees()
}

/// Rotation for a pointer position during a rotate gesture.
///
/// Uniform scaling does not change angles, so screen coordinates are used
/// directly without dividing by the view scale.
pub fn rotate(pointer: (f32, f32), pivot: (f32, f32), start_angle_offset: f32) -> f32 {
    pointer_angle(pointer, pivot) - start_angle_offset
}

/// Size of the axis-aligned box enclosing a `width`×`height` rectangle
/// rotated by `rotation_degrees`
pub fn bounding_box_of_rotated(width: f32, height: f32, rotation_degrees: f32) -> (f32, f32) {
    let (sin, cos) = rotation_degrees.to_radians().sin_cos();
    let bw = (width * cos).abs() + (height * sin).abs();
    let bh = (width * sin).abs() + (height * cos).abs();
    (bw, bh)
}

/// Fold an angle into [-180, 180]
pub fn normalize_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && degrees > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_resize_se_free() {
        let start = LayerBounds::new(10.0, 10.0, 100.0, 50.0);
        let b = resize(ResizeHandle::Se, (20.0, 10.0), start, false);
        assert!(approx(b.x, 10.0) && approx(b.y, 10.0));
        assert!(approx(b.width, 120.0));
        assert!(approx(b.height, 60.0));
    }

    #[test]
    fn test_resize_nw_keeps_opposite_corner() {
        let start = LayerBounds::new(10.0, 10.0, 100.0, 50.0);
        let b = resize(ResizeHandle::Nw, (-10.0, -20.0), start, false);
        assert!(approx(b.x + b.width, 110.0));
        assert!(approx(b.y + b.height, 60.0));
        assert!(approx(b.width, 110.0));
        assert!(approx(b.height, 70.0));
    }

    #[test]
    fn test_resize_ne_locked_keeps_bottom_edge() {
        let start = LayerBounds::new(0.0, 100.0, 200.0, 100.0);
        let b = resize(ResizeHandle::Ne, (100.0, 0.0), start, true);
        assert!(approx(b.width, 300.0));
        assert!(approx(b.height, 150.0));
        assert!(approx(b.x, 0.0));
        assert!(approx(b.y + b.height, 200.0));
    }

    #[test]
    fn test_resize_locked_preserves_ratio_for_every_handle() {
        let start = LayerBounds::new(50.0, 50.0, 160.0, 90.0);
        for &handle in ResizeHandle::all() {
            for delta in [(-30.0, 12.0), (45.0, -7.5), (3.0, 100.0)] {
                let b = resize(handle, delta, start, true);
                assert!(
                    (b.width / b.height - start.aspect_ratio()).abs() < 1e-4,
                    "ratio drift on {:?} {:?}",
                    handle,
                    delta
                );
            }
        }
    }

    #[test]
    fn test_resize_floor_applies_after_ratio() {
        let start = LayerBounds::new(0.0, 0.0, 100.0, 50.0);
        let b = resize(ResizeHandle::Se, (-99.0, 0.0), start, true);
        assert_eq!(b.width, MIN_LAYER_SIZE);
        assert_eq!(b.height, MIN_LAYER_SIZE);
        let b = resize(ResizeHandle::Nw, (500.0, 500.0), start, false);
        assert_eq!(b.width, MIN_LAYER_SIZE);
        assert!(approx(b.x + b.width, 100.0));
        assert!(approx(b.y + b.height, 50.0));
    }

    #[test]
    fn test_resize_ignores_non_finite_delta() {
        let start = LayerBounds::new(1.0, 2.0, 30.0, 40.0);
        let b = resize(ResizeHandle::Se, (f32::NAN, f32::INFINITY), start, false);
        assert_eq!(b, start);
    }

    #[test]
    fn test_rotate_is_relative_to_offset() {
        let pivot = (100.0, 100.0);
        let offset = pointer_angle((200.0, 100.0), pivot) - 30.0;
        assert!(approx(rotate((200.0, 100.0), pivot, offset), 30.0));
        assert!(approx(rotate((100.0, 200.0), pivot, offset), 120.0));
    }

    #[test]
    fn test_bounding_box_swaps_at_90() {
        let (bw, bh) = bounding_box_of_rotated(100.0, 50.0, 90.0);
        assert!(approx(bw, 50.0));
        assert!(approx(bh, 100.0));
        let (bw, bh) = bounding_box_of_rotated(100.0, 100.0, 45.0);
        assert!(approx(bw, 141.421));
        assert!(approx(bh, 141.421));
    }

    #[test]
    fn test_normalize_degrees() {
        assert!(approx(normalize_degrees(190.0), -170.0));
        assert!(approx(normalize_degrees(-190.0), 170.0));
        assert!(approx(normalize_degrees(720.0), 0.0));
        assert!(approx(normalize_degrees(180.0), 180.0));
        assert!(approx(normalize_degrees(-180.0), -180.0));
    }

    #[test]
    fn test_transform_contains_rotated_point() {
        let t = LayerTransform::new(LayerBounds::new(0.0, 0.0, 100.0, 10.0), 90.0);
        // Rotated 90° the box spans x in [45, 55] and y in [-45, 55]
        assert!(t.contains(50.0, -40.0));
        assert!(!t.contains(90.0, 5.0));
        let (mx, my) = t.to_model(50.0, 0.0);
        assert!(approx(mx, 50.0) && approx(my, 55.0));
    }
}
