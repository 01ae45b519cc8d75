//! Blend mode definitions and pixel math
//!
//! A layer's blend mode has two names: the canonical compositing-operator
//! name used by the exporter ("source-over", "multiply", ...) and the
//! presentation name a live preview uses ("normal", "multiply", ...). Both
//! come from the single [`BLEND_MODE_TABLE`], which is checked to be a
//! bijection at compile time.
//!
//! The per-pixel formulas follow the W3C Compositing and Blending Level 1
//! definitions so that the exporter matches what a browser-style preview
//! shows for the same operator.

use serde::{Deserialize, Serialize};

/// Blend modes for layer compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Plain alpha compositing (source-over)
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Hue of the layer with saturation and luminosity of the backdrop
    Hue,
    /// Saturation of the layer with hue and luminosity of the backdrop
    Saturation,
    /// Hue and saturation of the layer with luminosity of the backdrop
    Color,
    /// Luminosity of the layer with hue and saturation of the backdrop
    Luminosity,
}

/// Number of supported blend modes
pub const BLEND_MODE_COUNT: usize = 16;

/// One row of the blend mode table
#[derive(Debug, Clone, Copy)]
pub struct BlendModeEntry {
    pub mode: BlendMode,
    /// Compositing operator name used by the exporter
    pub canonical: &'static str,
    /// Name used by the presentation layer
    pub presentation: &'static str,
    /// Human-readable label
    pub label: &'static str,
}

/// Single source of truth for both blend mode namespaces.
///
/// Row `i` describes the mode whose discriminant is `i`.
pub const BLEND_MODE_TABLE: [BlendModeEntry; BLEND_MODE_COUNT] = [
    entry(BlendMode::Normal, "source-over", "normal", "Normal"),
    entry(BlendMode::Multiply, "multiply", "multiply", "Multiply"),
    entry(BlendMode::Screen, "screen", "screen", "Screen"),
    entry(BlendMode::Overlay, "overlay", "overlay", "Overlay"),
    entry(BlendMode::Darken, "darken", "darken", "Darken"),
    entry(BlendMode::Lighten, "lighten", "lighten", "Lighten"),
    entry(BlendMode::ColorDodge, "color-dodge", "color-dodge", "Color Dodge"),
    entry(BlendMode::ColorBurn, "color-burn", "color-burn", "Color Burn"),
    entry(BlendMode::HardLight, "hard-light", "hard-light", "Hard Light"),
    entry(BlendMode::SoftLight, "soft-light", "soft-light", "Soft Light"),
    entry(BlendMode::Difference, "difference", "difference", "Difference"),
    entry(BlendMode::Exclusion, "exclusion", "exclusion", "Exclusion"),
    entry(BlendMode::Hue, "hue", "hue", "Hue"),
    entry(BlendMode::Saturation, "saturation", "saturation", "Saturation"),
    entry(BlendMode::Color, "color", "color", "Color"),
    entry(BlendMode::Luminosity, "luminosity", "luminosity", "Luminosity"),
];

const fn entry(
    mode: BlendMode,
    canonical: &'static str,
    presentation: &'static str,
    label: &'static str,
) -> BlendModeEntry {
    BlendModeEntry {
        mode,
        canonical,
        presentation,
        label,
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

/// Rows are indexed by discriminant and neither column repeats a name.
const fn table_is_bijective(table: &[BlendModeEntry]) -> bool {
    let mut i = 0;
    while i < table.len() {
        if table[i].mode as usize != i {
            return false;
        }
        let mut j = i + 1;
        while j < table.len() {
            if str_eq(table[i].canonical, table[j].canonical)
                || str_eq(table[i].presentation, table[j].presentation)
            {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(table_is_bijective(&BLEND_MODE_TABLE));

impl BlendMode {
    /// Get all blend modes in table order
    pub fn all() -> impl Iterator<Item = BlendMode> {
        BLEND_MODE_TABLE.iter().map(|e| e.mode)
    }

    fn table_row(self) -> &'static BlendModeEntry {
        &BLEND_MODE_TABLE[self as usize]
    }

    /// Compositing operator name used by the exporter
    pub fn canonical_name(self) -> &'static str {
        self.table_row().canonical
    }

    /// Name the live preview must use for this mode
    pub fn presentation_name(self) -> &'static str {
        self.table_row().presentation
    }

    /// Get a human-readable name for the blend mode
    pub fn name(self) -> &'static str {
        self.table_row().label
    }

    /// Resolve a presentation name. Unknown names fall back to [`BlendMode::Normal`].
    pub fn from_presentation(name: &str) -> BlendMode {
        BLEND_MODE_TABLE
            .iter()
            .find(|e| e.presentation == name)
            .map(|e| e.mode)
            .unwrap_or_default()
    }

    /// Resolve a canonical operator name
    pub fn from_canonical(name: &str) -> Option<BlendMode> {
        BLEND_MODE_TABLE
            .iter()
            .find(|e| e.canonical == name)
            .map(|e| e.mode)
    }

    /// Whether the mode mixes channels (hue/saturation/color/luminosity)
    pub fn is_non_separable(self) -> bool {
        matches!(
            self,
            BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity
        )
    }

    /// Blend function B(backdrop, source) on straight (non-premultiplied)
    /// colors in [0, 1]
    pub fn blend_rgb(self, cb: [f32; 3], cs: [f32; 3]) -> [f32; 3] {
        match self {
            BlendMode::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
            BlendMode::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
            BlendMode::Color => set_lum(cs, lum(cb)),
            BlendMode::Luminosity => set_lum(cb, lum(cs)),
            _ => [
                self.blend_channel(cb[0], cs[0]),
                self.blend_channel(cb[1], cs[1]),
                self.blend_channel(cb[2], cs[2]),
            ],
        }
    }

    fn blend_channel(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::Normal => cs,
            BlendMode::Multiply => cb * cs,
            BlendMode::Screen => screen(cb, cs),
            BlendMode::Overlay => hard_light(cs, cb),
            BlendMode::Darken => cb.min(cs),
            BlendMode::Lighten => cb.max(cs),
            BlendMode::ColorDodge => {
                if cb == 0.0 {
                    0.0
                } else if cs >= 1.0 {
                    1.0
                } else {
                    (cb / (1.0 - cs)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if cb >= 1.0 {
                    1.0
                } else if cs <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - cb) / cs).min(1.0)
                }
            }
            BlendMode::HardLight => hard_light(cb, cs),
            BlendMode::SoftLight => soft_light(cb, cs),
            BlendMode::Difference => (cb - cs).abs(),
            BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
            BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity => cs,
        }
    }

    /// Composite a straight-alpha source pixel over a straight-alpha
    /// backdrop pixel. `alpha` is the source coverage times layer opacity.
    ///
    /// Colors are mixed as `(1 - αb)·Cs + αb·B(Cb, Cs)` and the result is
    /// placed with source-over.
    pub fn composite(self, backdrop: [f32; 4], source: [f32; 3], alpha: f32) -> [f32; 4] {
        let ab = backdrop[3];
        let a_s = alpha.clamp(0.0, 1.0);
        if a_s <= 0.0 {
            return backdrop;
        }
        let cb = [backdrop[0], backdrop[1], backdrop[2]];
        let mixed = if self == BlendMode::Normal || ab <= 0.0 {
            source
        } else {
            let blended = self.blend_rgb(cb, source);
            [
                (1.0 - ab) * source[0] + ab * blended[0],
                (1.0 - ab) * source[1] + ab * blended[1],
                (1.0 - ab) * source[2] + ab * blended[2],
            ]
        };

        let ao = a_s + ab * (1.0 - a_s);
        if ao <= 0.0 {
            return [0.0, 0.0, 0.0, 0.0];
        }
        let mut out = [0.0, 0.0, 0.0, ao];
        for c in 0..3 {
            out[c] = ((a_s * mixed[c] + ab * cb[c] * (1.0 - a_s)) / ao).clamp(0.0, 1.0);
        }
        out
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[inline]
fn screen(cb: f32, cs: f32) -> f32 {
    cb + cs - cb * cs
}

#[inline]
fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        screen(cb, 2.0 * cs - 1.0)
    }
}

fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

// Non-separable helpers

#[inline]
fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 {
        for v in out.iter_mut() {
            *v = l + (*v - l) * l / (l - n);
        }
    }
    if x > 1.0 {
        for v in out.iter_mut() {
            *v = l + (*v - l) * (1.0 - l) / (x - l);
        }
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

#[inline]
fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| c[a].total_cmp(&c[b]));
    let (min_i, mid_i, max_i) = (idx[0], idx[1], idx[2]);
    let mut out = [0.0; 3];
    if c[max_i] > c[min_i] {
        out[mid_i] = (c[mid_i] - c[min_i]) * s / (c[max_i] - c[min_i]);
        out[max_i] = s;
    }
    out
}
