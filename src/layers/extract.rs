// 背景/前景レイヤー抽出: ソース画像 + 矩形リスト → RGBAバッファ
//
// Every output pixel is either copied verbatim from the source, the fill
// color, or fully transparent. Nothing is resampled or blended.

use image::{Rgb, Rgba, RgbaImage, imageops};

use super::CropMode;
use crate::error::LayerError;
use crate::geometry::Rect;

/// Copy `img` and paint every rectangle in `holes` with the opaque `fill`.
///
/// # Errors
/// [`LayerError::GeometryError`] if a hole is not inside the image.
pub fn extract_background(
    img: &RgbaImage,
    holes: &[Rect],
    fill: Rgb<u8>,
) -> crate::error::Result<RgbaImage> {
    check_within(img, holes)?;

    let mut background = img.clone();
    let fill = Rgba([fill[0], fill[1], fill[2], 255]);
    for hole in holes {
        fill_rect(&mut background, hole, fill);
    }
    Ok(background)
}

/// Cut one foreground buffer per rectangle in `keeps`, in list order.
///
/// # Errors
/// [`LayerError::GeometryError`] if a rectangle is not inside the image.
pub fn extract_foreground_list(
    img: &RgbaImage,
    keeps: &[Rect],
    mode: CropMode,
) -> crate::error::Result<Vec<RgbaImage>> {
    check_within(img, keeps)?;

    let layers = keeps
        .iter()
        .map(|r| {
            // check_within で非負・画像内を確認済み
            let (ox, oy) = r.origin_offset();
            let size = r.rebased();
            let crop = imageops::crop_imm(img, ox as u32, oy as u32, size.x1 as u32, size.y1 as u32)
                .to_image();
            match mode {
                CropMode::Cropped => crop,
                CropMode::Masked => {
                    let mut canvas = RgbaImage::new(img.width(), img.height());
                    imageops::replace(&mut canvas, &crop, i64::from(ox), i64::from(oy));
                    canvas
                }
            }
        })
        .collect();
    Ok(layers)
}

fn check_within(img: &RgbaImage, rects: &[Rect]) -> crate::error::Result<()> {
    for r in rects {
        r.validate()?;
        if !r.is_within(img.width(), img.height()) {
            return Err(LayerError::geometry(format!(
                "rectangle {r} lies outside the {}x{} image",
                img.width(),
                img.height()
            )));
        }
    }
    Ok(())
}

/// Paint a rectangle already checked by [`check_within`].
fn fill_rect(img: &mut RgbaImage, r: &Rect, color: Rgba<u8>) {
    let (x, y, w, h) = r.bounds();
    let (x, y) = (x as u32, y as u32);
    for py in y..y + h {
        for px in x..x + w {
            img.put_pixel(px, py, color);
        }
    }
}
