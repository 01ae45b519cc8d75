//! Export payloads
//!
//! Every export renders once and hands back bytes plus a file name built as
//! `<base>_<suffix>.<ext>`. The full composite keeps the base's resolution
//! and format; single-layer exports are always PNG and ignore the layer's
//! opacity and blend mode.

use image::RgbaImage;
use serde::Serialize;

use crate::compositor::document::{BaseDocument, ImageFormat, SourceImage};
use crate::compositor::geometry::bounding_box_of_rotated;
use crate::compositor::layer::Layer;
use crate::compositor::render::{encode, Canvas, Compositor, CompositorError, Placement};
use crate::compositor::BlendMode;

/// Name used when sanitizing leaves nothing
const FALLBACK_FILE_BASE: &str = "image";

/// A rendered file ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPayload {
    pub filename: String,
    pub mime: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Strip the extension and replace every run of characters outside
/// `[A-Za-z0-9_-]` with a single `_`.
pub fn sanitize_file_base(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    };

    let mut out = String::with_capacity(stem.len());
    let mut in_run = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }

    if out.is_empty() {
        FALLBACK_FILE_BASE.to_string()
    } else {
        out
    }
}

pub fn composite_file_name(base_name: &str, format: ImageFormat) -> String {
    format!("{}_composite.{}", sanitize_file_base(base_name), format.extension())
}

pub fn original_file_name(name: &str, format: ImageFormat) -> String {
    format!("{}_original.{}", sanitize_file_base(name), format.extension())
}

pub fn crop_file_name(name: &str, width: u32, height: u32) -> String {
    format!("{}_crop_{}x{}.png", sanitize_file_base(name), width, height)
}

pub fn transformed_file_name(name: &str, rotation: f32, width: u32, height: u32) -> String {
    format!(
        "{}_rot_{}deg_{}x{}.png",
        sanitize_file_base(name),
        rotation.round() as i64,
        width,
        height
    )
}

/// Name a layer's exports after its source file, or the layer name when
/// the source has none
pub fn layer_file_base(layer: &Layer) -> &str {
    if layer.source.name.trim().is_empty() {
        &layer.name
    } else {
        &layer.source.name
    }
}

/// Pixel size of a canvas holding an extent: rounded, at least 1
fn canvas_extent(value: f32) -> u32 {
    (value.round() as u32).max(1)
}

/// Render the whole document at the base's natural size and format.
///
/// `layers` is the stack bottom to top; hidden layers are skipped.
pub fn export_composite<'a>(
    base: &BaseDocument,
    layers: impl IntoIterator<Item = &'a Layer>,
    jpeg_quality: u8,
) -> Result<ExportPayload, CompositorError> {
    let image = Compositor::render(base, layers)?;
    let format = base.format();
    let bytes = encode(&image, format, jpeg_quality)?;
    let filename = composite_file_name(base.name(), format);
    tracing::info!(
        file = %filename,
        width = image.width(),
        height = image.height(),
        format = format.mime(),
        "Exported composite"
    );
    Ok(ExportPayload {
        filename,
        mime: format.mime(),
        bytes,
    })
}

/// Hand back the ingested bytes of a source untouched
pub fn export_original(source: &SourceImage, name: &str) -> ExportPayload {
    ExportPayload {
        filename: original_file_name(name, source.format),
        mime: source.format.mime(),
        bytes: source.original.clone(),
    }
}

/// The layer's source scaled to its current box, without rotation
pub fn render_crop(layer: &Layer) -> Result<RgbaImage, CompositorError> {
    let b = layer.bounds();
    let (cw, ch) = (canvas_extent(b.width), canvas_extent(b.height));
    let mut canvas = Canvas::new(cw, ch)?;
    canvas.draw_image(
        &layer.source.pixels,
        Placement {
            center: (cw as f32 / 2.0, ch as f32 / 2.0),
            size: (cw as f32, ch as f32),
            rotation: 0.0,
        },
        1.0,
        BlendMode::Normal,
    );
    canvas.into_image()
}

pub fn export_crop(layer: &Layer) -> Result<ExportPayload, CompositorError> {
    let image = render_crop(layer)?;
    let bytes = encode(&image, ImageFormat::Png, 100)?;
    let filename = crop_file_name(layer_file_base(layer), image.width(), image.height());
    tracing::info!(file = %filename, layer = %layer.id, "Exported layer crop");
    Ok(ExportPayload {
        filename,
        mime: ImageFormat::Png.mime(),
        bytes,
    })
}

/// The layer rotated on a canvas sized to its rotated bounding box
pub fn render_transformed(layer: &Layer) -> Result<RgbaImage, CompositorError> {
    let b = layer.bounds();
    let (bw, bh) = bounding_box_of_rotated(b.width, b.height, layer.rotation());
    let (cw, ch) = (canvas_extent(bw), canvas_extent(bh));
    let mut canvas = Canvas::new(cw, ch)?;
    canvas.draw_image(
        &layer.source.pixels,
        Placement {
            center: (cw as f32 / 2.0, ch as f32 / 2.0),
            size: (b.width, b.height),
            rotation: layer.rotation(),
        },
        1.0,
        BlendMode::Normal,
    );
    canvas.into_image()
}

pub fn export_transformed(layer: &Layer) -> Result<ExportPayload, CompositorError> {
    let image = render_transformed(layer)?;
    let bytes = encode(&image, ImageFormat::Png, 100)?;
    let filename = transformed_file_name(
        layer_file_base(layer),
        layer.rotation(),
        image.width(),
        image.height(),
    );
    tracing::info!(file = %filename, layer = %layer.id, "Exported transformed layer");
    Ok(ExportPayload {
        filename,
        mime: ImageFormat::Png.mime(),
        bytes,
    })
}
