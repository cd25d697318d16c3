// ページ単位処理: 膨張/収縮 → レイヤー抽出 → エンコード → Fit-to-page配置

use image::{Rgb, RgbaImage};
use tracing::{debug, info};

use crate::config::job::Variant;
use crate::error::LayerError;
use crate::geometry::dilation::{DilationPolicy, dilate};
use crate::geometry::projection::{CanvasSize, compute_fit, project_rect};
use crate::geometry::{Rect, clip_list};
use crate::layers::encode::encode_layer;
use crate::layers::extract::{extract_background, extract_foreground_list};
use crate::layers::{
    CropMode, EncoderChoice, EncoderPolicy, LayerKind, PreparedLayer, PreparedPage,
};
use crate::pdf::DocumentSink;

/// Everything that varies between the ways a page can be layered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConfig {
    /// Margin applied to the kept foreground regions (positive grows them).
    pub foreground_margin: i32,
    /// Margin applied to the erased background holes (negative shrinks them).
    pub background_margin: i32,
    pub dilation_policy: DilationPolicy,
    pub crop_mode: CropMode,
    pub fill_color: Rgb<u8>,
    pub canvas: CanvasSize,
    pub encoders: EncoderPolicy,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            foreground_margin: 5,
            background_margin: -5,
            dilation_policy: DilationPolicy::Strict,
            crop_mode: CropMode::Cropped,
            fill_color: Rgb([255, 255, 255]),
            canvas: CanvasSize::LETTER,
            encoders: EncoderPolicy::default(),
        }
    }
}

impl LayerConfig {
    /// JPEG quality for the lossy unmasked baseline: the background quality
    /// when the background is lossy, else the foreground quality, else 25.
    fn baseline_quality(&self) -> u8 {
        match (self.encoders.background, self.encoders.foreground) {
            (EncoderChoice::LossyPhotographic(q), _) | (_, EncoderChoice::LossyPhotographic(q)) => q,
            _ => 25,
        }
    }
}

/// An unencoded layer, with the encoder it will get.
pub struct LayerBuffer {
    pub kind: LayerKind,
    pub index: Option<usize>,
    pub source_rect: Rect,
    pub encoder: EncoderChoice,
    pub pixels: RgbaImage,
}

/// Unencoded layers of one page, back to front.
pub struct PageLayers {
    pub source_width: u32,
    pub source_height: u32,
    pub layers: Vec<LayerBuffer>,
}

/// Split `img` into layers for `variant`.
///
/// Background holes are `rects` moved by `background_margin`, foreground
/// regions are `rects` moved by `foreground_margin`; both are clipped to
/// the image. Foregrounds follow the background in `rects` order; a region
/// that ends up empty yields no layer.
pub fn extract_page_layers(
    img: &RgbaImage,
    rects: &[Rect],
    config: &LayerConfig,
    variant: Variant,
) -> crate::error::Result<PageLayers> {
    let (width, height) = img.dimensions();
    // Reject unplaceable sources before doing any pixel work.
    compute_fit(config.canvas, width, height)?;

    let full = Rect::full(width, height);
    let mut layers = Vec::with_capacity(rects.len() + 1);

    match variant {
        Variant::UnmaskedLossless | Variant::UnmaskedLossy => {
            let encoder = if variant == Variant::UnmaskedLossless {
                EncoderChoice::LosslessFlat
            } else {
                EncoderChoice::LossyPhotographic(config.baseline_quality())
            };
            layers.push(LayerBuffer {
                kind: LayerKind::Background,
                index: None,
                source_rect: full,
                encoder,
                pixels: img.clone(),
            });
        }
        Variant::Masked | Variant::BackgroundOnly => {
            let holes = clip_list(
                &dilate(rects, config.background_margin, config.dilation_policy)?,
                width,
                height,
            );
            layers.push(LayerBuffer {
                kind: LayerKind::Background,
                index: None,
                source_rect: full,
                encoder: config.encoders.for_kind(LayerKind::Background),
                pixels: extract_background(img, &holes, config.fill_color)?,
            });

            if variant == Variant::Masked {
                let keeps = clip_list(
                    &dilate(rects, config.foreground_margin, config.dilation_policy)?,
                    width,
                    height,
                );
                let buffers = extract_foreground_list(img, &keeps, config.crop_mode)?;
                for (i, (keep, pixels)) in keeps.iter().zip(buffers).enumerate() {
                    if keep.is_empty() {
                        debug!(index = i, rect = %rects[i], "foreground region is empty after clipping, skipped");
                        continue;
                    }
                    let source_rect = match config.crop_mode {
                        CropMode::Cropped => *keep,
                        CropMode::Masked => full,
                    };
                    layers.push(LayerBuffer {
                        kind: LayerKind::Foreground,
                        index: Some(i),
                        source_rect,
                        encoder: config.encoders.for_kind(LayerKind::Foreground),
                        pixels,
                    });
                }
            }
        }
    }

    Ok(PageLayers {
        source_width: width,
        source_height: height,
        layers,
    })
}

/// Encode every layer with its bound encoder.
pub fn encode_page_layers(page: &PageLayers) -> crate::error::Result<PreparedPage> {
    let layers = page
        .layers
        .iter()
        .map(|layer| {
            Ok(PreparedLayer {
                kind: layer.kind,
                index: layer.index,
                source_rect: layer.source_rect,
                image: encode_layer(&layer.pixels, layer.encoder)?,
            })
        })
        .collect::<crate::error::Result<Vec<_>>>()?;

    Ok(PreparedPage {
        source_width: page.source_width,
        source_height: page.source_height,
        layers,
    })
}

/// Extract and encode all layers of a page.
pub fn compose_page(
    img: &RgbaImage,
    rects: &[Rect],
    config: &LayerConfig,
    variant: Variant,
) -> crate::error::Result<PreparedPage> {
    encode_page_layers(&extract_page_layers(img, rects, config, variant)?)
}

/// Draw a prepared page onto `sink` as one page of size `canvas`.
///
/// The fit is computed once from the source dimensions and shared by every
/// layer, so all layers stay registered after scaling.
pub fn place_page(
    page: &PreparedPage,
    canvas: CanvasSize,
    sink: &mut dyn DocumentSink,
) -> crate::error::Result<()> {
    let fit = compute_fit(canvas, page.source_width, page.source_height)?;
    info!(
        scale = fit.scale,
        offset_x = fit.offset_x,
        offset_y = fit.offset_y,
        source_width = page.source_width,
        source_height = page.source_height,
        layers = page.layers.len(),
        "place_page"
    );

    match page.layers.first() {
        Some(first) if first.kind != LayerKind::Background => {
            return Err(LayerError::geometry(
                "first layer of a page must be the background",
            ));
        }
        None => return Err(LayerError::geometry("page has no layers")),
        _ => {}
    }

    sink.begin_page(canvas)?;
    for layer in &page.layers {
        let placement = project_rect(&layer.source_rect, &fit);
        sink.draw_image(&placement, &layer.image)?;
    }
    sink.end_page()
}

/// Compose one page and hand it to `sink`.
pub fn assemble_page(
    img: &RgbaImage,
    rects: &[Rect],
    config: &LayerConfig,
    variant: Variant,
    sink: &mut dyn DocumentSink,
) -> crate::error::Result<()> {
    let page = compose_page(img, rects, config, variant)?;
    place_page(&page, config.canvas, sink)
}
