pub mod writer;

use crate::geometry::projection::{CanvasSize, Placement};
use crate::layers::EncodedImage;

/// Receiver of placed page layers: owns page creation and serialization.
///
/// Calls arrive as `begin_page`, any number of `draw_image` in
/// back-to-front order, then `end_page`.
pub trait DocumentSink {
    fn begin_page(&mut self, canvas: CanvasSize) -> crate::error::Result<()>;

    fn draw_image(
        &mut self,
        placement: &Placement,
        image: &EncodedImage,
    ) -> crate::error::Result<()>;

    fn end_page(&mut self) -> crate::error::Result<()>;
}
