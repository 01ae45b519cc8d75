//! CPU compositor
//!
//! Renders the base document and its visible layers into one image at the
//! base's natural resolution. Layers are painted in stack order; each is
//! scaled to its box, rotated about the box center and blended with the
//! operator from the blend mode table.

use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;

use crate::compositor::document::{BaseDocument, ImageFormat};
use crate::compositor::geometry::bounding_box_of_rotated;
use crate::compositor::layer::Layer;
use crate::compositor::BlendMode;

/// JPEG quality used for composite exports (0.92 on a 0-1 scale)
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Largest surface the compositor will allocate, in pixels (16384 x 16384)
pub const MAX_SURFACE_PIXELS: usize = 1 << 28;

/// Errors raised while producing an output image
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Cannot allocate a {width}x{height} render surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Where and how to draw an image on a canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Center of the drawn box in canvas pixels
    pub center: (f32, f32),
    /// Drawn size before rotation
    pub size: (f32, f32),
    /// Clockwise rotation in degrees around `center`
    pub rotation: f32,
}

impl Placement {
    pub fn of_layer(layer: &Layer) -> Self {
        let b = layer.bounds();
        Self {
            center: b.center(),
            size: (b.width, b.height),
            rotation: layer.rotation(),
        }
    }
}

/// Float RGBA drawing surface with straight alpha
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Canvas {
    /// Create a transparent canvas
    pub fn new(width: u32, height: u32) -> Result<Self, CompositorError> {
        let len = surface_len(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| CompositorError::SurfaceAllocation { width, height })?;
        pixels.resize(len, [0.0; 4]);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a canvas holding a copy of `image`
    pub fn from_image(image: &RgbaImage) -> Result<Self, CompositorError> {
        let mut canvas = Self::new(image.width(), image.height())?;
        for (dst, src) in canvas.pixels.iter_mut().zip(image.pixels()) {
            *dst = to_float(src.0);
        }
        Ok(canvas)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Draw `image` scaled into `placement`, blended with `mode` at `opacity`
    pub fn draw_image(
        &mut self,
        image: &RgbaImage,
        placement: Placement,
        opacity: f32,
        mode: BlendMode,
    ) {
        let (w, h) = placement.size;
        if !(w > 0.0 && h > 0.0) || image.width() == 0 || image.height() == 0 {
            return;
        }
        if !(opacity > 0.0) {
            return;
        }

        let (cx, cy) = placement.center;
        let (bw, bh) = bounding_box_of_rotated(w, h, placement.rotation);
        let x0 = (cx - bw / 2.0).floor().max(0.0) as u32;
        let y0 = (cy - bh / 2.0).floor().max(0.0) as u32;
        let x1 = ((cx + bw / 2.0).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((cy + bh / 2.0).ceil().max(0.0) as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let scaled = downsample_to_box(image, w, h);
        let sx_scale = scaled.width() as f32 / w;
        let sy_scale = scaled.height() as f32 / h;
        let (sin, cos) = placement.rotation.to_radians().sin_cos();

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                // Inverse rotation into the layer's local frame
                let u = dx * cos + dy * sin + w / 2.0;
                let v = -dx * sin + dy * cos + h / 2.0;
                if u < 0.0 || v < 0.0 || u >= w || v >= h {
                    continue;
                }
                let sample = sample_bilinear(&scaled, u * sx_scale - 0.5, v * sy_scale - 0.5);
                let alpha = sample[3] * opacity;
                if alpha <= 0.0 {
                    continue;
                }
                let idx = (py * self.width + px) as usize;
                let backdrop = self.pixels[idx];
                self.pixels[idx] =
                    mode.composite(backdrop, [sample[0], sample[1], sample[2]], alpha);
            }
        }
    }

    /// Convert to an 8-bit image
    pub fn into_image(self) -> Result<RgbaImage, CompositorError> {
        let (width, height) = (self.width, self.height);
        let mut raw: Vec<u8> = Vec::new();
        raw.try_reserve_exact(self.pixels.len() * 4)
            .map_err(|_| CompositorError::SurfaceAllocation { width, height })?;
        for p in &self.pixels {
            raw.extend_from_slice(&to_bytes(*p));
        }
        RgbaImage::from_raw(width, height, raw)
            .ok_or(CompositorError::SurfaceAllocation { width, height })
    }
}

/// Lanczos-downsample `image` on every axis where the drawn box is smaller
/// than the source. Axes that are enlarged keep the source resolution and
/// are magnified by the bilinear lookup, so the result is never larger than
/// `image`.
fn downsample_to_box(image: &RgbaImage, w: f32, h: f32) -> Cow<'_, RgbaImage> {
    let tw = (w.round() as u32).clamp(1, image.width());
    let th = (h.round() as u32).clamp(1, image.height());
    if (tw, th) == image.dimensions() {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, tw, th, FilterType::Lanczos3))
    }
}

fn surface_len(width: u32, height: u32) -> Result<usize, CompositorError> {
    if width == 0 || height == 0 {
        return Err(CompositorError::SurfaceAllocation { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&len| len <= MAX_SURFACE_PIXELS)
        .ok_or(CompositorError::SurfaceAllocation { width, height })
}

#[inline]
fn to_float(p: [u8; 4]) -> [f32; 4] {
    [
        p[0] as f32 / 255.0,
        p[1] as f32 / 255.0,
        p[2] as f32 / 255.0,
        p[3] as f32 / 255.0,
    ]
}

#[inline]
fn to_bytes(p: [f32; 4]) -> [u8; 4] {
    let q = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    [q(p[0]), q(p[1]), q(p[2]), q(p[3])]
}

/// Bilinear sample with edge clamping. Interpolates premultiplied colors and
/// returns straight alpha.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> [f32; 4] {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let fx = x.floor();
    let fy = y.floor();
    let tx = x - fx;
    let ty = y - fy;
    let x0 = (fx as i64).clamp(0, max_x) as u32;
    let y0 = (fy as i64).clamp(0, max_y) as u32;
    let x1 = (fx as i64 + 1).clamp(0, max_x) as u32;
    let y1 = (fy as i64 + 1).clamp(0, max_y) as u32;

    let taps = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ];
    let mut acc = [0.0f32; 4];
    for (sx, sy, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        let p = to_float(image.get_pixel(sx, sy).0);
        acc[0] += p[0] * p[3] * weight;
        acc[1] += p[1] * p[3] * weight;
        acc[2] += p[2] * p[3] * weight;
        acc[3] += p[3] * weight;
    }
    if acc[3] <= 0.0 {
        return [0.0; 4];
    }
    [acc[0] / acc[3], acc[1] / acc[3], acc[2] / acc[3], acc[3]]
}

/// Full-document compositor
pub struct Compositor;

impl Compositor {
    /// Render the base plus `layers` (bottom to top) at the base's natural
    /// size. Hidden layers are skipped; the order given is the paint order.
    pub fn render<'a>(
        base: &BaseDocument,
        layers: impl IntoIterator<Item = &'a Layer>,
    ) -> Result<RgbaImage, CompositorError> {
        let mut canvas = Canvas::from_image(base.pixels())?;
        for layer in layers.into_iter().filter(|l| l.visible) {
            canvas.draw_image(
                &layer.source.pixels,
                Placement::of_layer(layer),
                layer.opacity,
                layer.blend_mode,
            );
        }
        canvas.into_image()
    }
}

/// Encode an image. JPEG drops alpha (transparent areas become black) and
/// uses `jpeg_quality`; PNG and WebP are lossless.
pub fn encode(
    image: &RgbaImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, CompositorError> {
    let mut out = Vec::new();
    let (w, h) = image.dimensions();
    match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut out).write_image(
                image.as_raw(),
                w,
                h,
                ExtendedColorType::Rgba8,
            )?;
        }
        ImageFormat::Jpeg => {
            let rgb = flatten_on_black(image);
            JpegEncoder::new_with_quality(&mut out, jpeg_quality.clamp(1, 100))
                .write_image(&rgb, w, h, ExtendedColorType::Rgb8)?;
        }
        ImageFormat::WebP => {
            WebPEncoder::new_lossless(&mut out).write_image(
                image.as_raw(),
                w,
                h,
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    Ok(out)
}

fn flatten_on_black(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for p in image.pixels() {
        let a = p.0[3] as u32;
        for c in 0..3 {
            rgb.push(((p.0[c] as u32 * a + 127) / 255) as u8);
        }
    }
    rgb
}
