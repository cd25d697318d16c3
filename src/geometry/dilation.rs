// 矩形リストの膨張・収縮（負のマージン = 収縮）

use serde::Deserialize;
use tracing::debug;

use super::{Rect, RectList};
use crate::error::LayerError;

/// What to do when erosion would leave a rectangle with no area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DilationPolicy {
    /// Fail with a geometry error.
    #[default]
    Strict,
    /// Leave the too-small axis unchanged.
    Clamp,
}

impl DilationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DilationPolicy::Strict => "strict",
            DilationPolicy::Clamp => "clamp",
        }
    }
}

/// Grow (`d > 0`) or shrink (`d < 0`) every rectangle by `d` on all four sides.
///
/// Returns a new list in the same order. Under [`DilationPolicy::Strict`]
/// an erosion that collapses a side to zero or less is a
/// [`LayerError::GeometryError`]; under [`DilationPolicy::Clamp`] that axis
/// keeps its original extent.
pub fn dilate(rects: &[Rect], d: i32, policy: DilationPolicy) -> crate::error::Result<RectList> {
    let out = rects
        .iter()
        .map(|r| dilate_rect(r, d, policy))
        .collect::<crate::error::Result<RectList>>()?;
    debug!(d, policy = policy.as_str(), count = out.len(), "dilate");
    Ok(out)
}

fn dilate_rect(r: &Rect, d: i32, policy: DilationPolicy) -> crate::error::Result<Rect> {
    r.validate()?;
    let (x0, x1) = dilate_axis(r.x0, r.x1, d, policy).ok_or_else(|| collapse_error(r, d))?;
    let (y0, y1) = dilate_axis(r.y0, r.y1, d, policy).ok_or_else(|| collapse_error(r, d))?;
    Ok(Rect { x0, y0, x1, y1 })
}

/// `None` means the axis cannot take the margin under `Strict` (or overflowed).
fn dilate_axis(lo: i32, hi: i32, d: i32, policy: DilationPolicy) -> Option<(i32, i32)> {
    let extent = i64::from(hi) - i64::from(lo);
    let new_extent = extent + 2 * i64::from(d);
    if d < 0 && new_extent <= 0 {
        return match policy {
            DilationPolicy::Strict => None,
            DilationPolicy::Clamp => Some((lo, hi)),
        };
    }
    Some((lo.checked_sub(d)?, hi.checked_add(d)?))
}

fn collapse_error(r: &Rect, d: i32) -> LayerError {
    LayerError::geometry(format!(
        "margin {d} cannot be applied to rectangle {r} ({}x{}): result would have no area or overflow",
        r.width(),
        r.height()
    ))
}
