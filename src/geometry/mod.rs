pub mod dilation;
pub mod projection;
pub mod rect_file;

use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// Axis-aligned pixel rectangle, half-open: `x0..x1` by `y0..y1`.
///
/// Coordinates may be negative after dilation; callers clip to the image
/// with [`Rect::clip_to`] before touching pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    #[serde(rename = "X0")]
    pub x0: i32,
    #[serde(rename = "Y0")]
    pub y0: i32,
    #[serde(rename = "X1")]
    pub x1: i32,
    #[serde(rename = "Y1")]
    pub y1: i32,
}

/// Ordered rectangle list. Order decides draw order and artifact numbering.
pub type RectList = Vec<Rect>;

impl Rect {
    /// Build a rectangle, rejecting inverted bounds.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> crate::error::Result<Self> {
        let r = Rect { x0, y0, x1, y1 };
        r.validate()?;
        Ok(r)
    }

    /// The whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Rect {
            x0: 0,
            y0: 0,
            x1: width.min(i32::MAX as u32) as i32,
            y1: height.min(i32::MAX as u32) as i32,
        }
    }

    /// Check `x0 <= x1` and `y0 <= y1`.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.x0 > self.x1 || self.y0 > self.y1 {
            return Err(LayerError::geometry(format!(
                "inverted rectangle {self}: expected x0 <= x1 and y0 <= y1"
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        (i64::from(self.x1) - i64::from(self.x0)).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (i64::from(self.y1) - i64::from(self.y0)).max(0) as u32
    }

    /// Zero-area rectangles are legal but draw nothing.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Canvas-space region covered by this rectangle as `(x, y, width, height)`.
    pub fn bounds(&self) -> (i32, i32, u32, u32) {
        (self.x0, self.y0, self.width(), self.height())
    }

    /// Read origin when copying pixels out of a larger buffer.
    pub fn origin_offset(&self) -> (i32, i32) {
        (self.x0, self.y0)
    }

    /// Same extent with the origin moved to `(0, 0)`.
    pub fn rebased(&self) -> Self {
        Rect {
            x0: 0,
            y0: 0,
            x1: self.width() as i32,
            y1: self.height() as i32,
        }
    }

    /// `true` when the rectangle lies inside a `width` x `height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x0 >= 0
            && self.y0 >= 0
            && i64::from(self.x1) <= i64::from(width)
            && i64::from(self.y1) <= i64::from(height)
    }

    /// Intersection with the `width` x `height` image. A rectangle entirely
    /// outside collapses to an empty one at the nearest edge.
    pub fn clip_to(&self, width: u32, height: u32) -> Self {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        let x0 = self.x0.clamp(0, w);
        let y0 = self.y0.clamp(0, h);
        Rect {
            x0,
            y0,
            x1: self.x1.clamp(x0, w),
            y1: self.y1.clamp(y0, h),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{},{},{},{}}}", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Clip every rectangle in `rects` to the image, keeping list order.
pub fn clip_list(rects: &[Rect], width: u32, height: u32) -> RectList {
    rects.iter().map(|r| r.clip_to(width, height)).collect()
}
