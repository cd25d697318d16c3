// Fit-to-page: ソース画像のピクセル寸法 → 出力キャンバス（ポイント）への一様スケール + 中央寄せ

use serde::Deserialize;

use super::Rect;
use crate::error::LayerError;

const POINTS_PER_INCH: f64 = 72.0;
const MM_PER_INCH: f64 = 25.4;

/// Offsets this close to zero are floating-point noise, not a geometry error.
const OFFSET_EPSILON: f64 = 1e-9;

/// Output page size in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "CanvasSizeRepr")]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    /// US Letter portrait, 8.5 x 11 in.
    pub const LETTER: CanvasSize = CanvasSize {
        width: 8.5 * POINTS_PER_INCH,
        height: 11.0 * POINTS_PER_INCH,
    };

    /// ISO A4 portrait, 210 x 297 mm.
    pub const A4: CanvasSize = CanvasSize {
        width: 210.0 / MM_PER_INCH * POINTS_PER_INCH,
        height: 297.0 / MM_PER_INCH * POINTS_PER_INCH,
    };

    pub fn new(width: f64, height: f64) -> crate::error::Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(LayerError::geometry(format!(
                "canvas size must be positive and finite, got {width}x{height}"
            )));
        }
        Ok(CanvasSize { width, height })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "letter" => Some(Self::LETTER),
            "a4" => Some(Self::A4),
            _ => None,
        }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::LETTER
    }
}

/// YAML form: `letter`, `a4`, or `{ width: .., height: .. }` in points.
#[derive(Deserialize)]
#[serde(untagged)]
enum CanvasSizeRepr {
    Named(String),
    Custom { width: f64, height: f64 },
}

impl TryFrom<CanvasSizeRepr> for CanvasSize {
    type Error = String;

    fn try_from(repr: CanvasSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            CanvasSizeRepr::Named(name) => CanvasSize::from_name(&name)
                .ok_or_else(|| format!("unknown canvas size '{name}' (expected letter or a4)")),
            CanvasSizeRepr::Custom { width, height } => {
                CanvasSize::new(width, height).map_err(|e| e.to_string())
            }
        }
    }
}

/// Uniform scale and centering offset shared by every layer of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Position and size of a layer on the output canvas (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Compute the scale that fits a `source_w` x `source_h` raster inside
/// `canvas` without cropping, centering it along the axis with slack.
///
/// # Errors
/// [`LayerError::GeometryError`] for zero source dimensions, an invalid
/// canvas, or a negative centering offset.
pub fn compute_fit(canvas: CanvasSize, source_w: u32, source_h: u32) -> crate::error::Result<Fit> {
    if source_w == 0 || source_h == 0 {
        return Err(LayerError::geometry(format!(
            "source raster has zero dimension: {source_w}x{source_h}"
        )));
    }
    let canvas = CanvasSize::new(canvas.width, canvas.height)?;

    let (sw, sh) = (f64::from(source_w), f64::from(source_h));
    let x_scale = canvas.width / sw;
    let y_scale = canvas.height / sh;

    let (scale, offset_x, offset_y) = if x_scale < y_scale {
        (x_scale, 0.0, 0.5 * (canvas.height - x_scale * sh))
    } else {
        (y_scale, 0.5 * (canvas.width - y_scale * sw), 0.0)
    };

    let offset_x = snap_to_zero(offset_x);
    let offset_y = snap_to_zero(offset_y);
    if offset_x < 0.0 || offset_y < 0.0 {
        return Err(LayerError::geometry(format!(
            "negative centering offset ({offset_x}, {offset_y}) fitting {source_w}x{source_h} into {}x{}",
            canvas.width, canvas.height
        )));
    }

    Ok(Fit {
        scale,
        offset_x,
        offset_y,
    })
}

fn snap_to_zero(v: f64) -> f64 {
    if v.abs() < OFFSET_EPSILON { 0.0 } else { v }
}

/// Map a source-space rectangle onto the canvas through `fit`.
pub fn project_rect(rect: &Rect, fit: &Fit) -> Placement {
    Placement {
        x: f64::from(rect.x0) * fit.scale + fit.offset_x,
        y: f64::from(rect.y0) * fit.scale + fit.offset_y,
        width: f64::from(rect.width()) * fit.scale,
        height: f64::from(rect.height()) * fit.scale,
    }
}
