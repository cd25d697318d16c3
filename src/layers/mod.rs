pub mod encode;
pub mod extract;

use serde::Deserialize;

use crate::geometry::Rect;

/// Semantic role of a layer on the page. Decides the encoder, never the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Background,
    Foreground,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Background => "background",
            LayerKind::Foreground => "foreground",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "background" => Some(LayerKind::Background),
            "foreground" => Some(LayerKind::Foreground),
            _ => None,
        }
    }
}

/// Compression applied to a layer when it is placed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderChoice {
    /// Zlib-compressed raw samples (PDF FlateDecode); bit-exact.
    LosslessFlat,
    /// Baseline JPEG (PDF DCTDecode) at the given quality, 1-100.
    LossyPhotographic(u8),
}

/// Encoder per layer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderPolicy {
    pub background: EncoderChoice,
    pub foreground: EncoderChoice,
}

impl EncoderPolicy {
    pub fn for_kind(&self, kind: LayerKind) -> EncoderChoice {
        match kind {
            LayerKind::Background => self.background,
            LayerKind::Foreground => self.foreground,
        }
    }
}

impl Default for EncoderPolicy {
    fn default() -> Self {
        EncoderPolicy {
            background: EncoderChoice::LossyPhotographic(25),
            foreground: EncoderChoice::LosslessFlat,
        }
    }
}

/// How foreground layers are cut out of the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    /// One region-sized buffer per rectangle, origin rebased to (0,0).
    #[default]
    Cropped,
    /// One canvas-sized buffer per rectangle, transparent outside it.
    Masked,
}

/// PDF stream filter of an encoded layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    Dct,
    Flate,
}

impl ImageFilter {
    pub fn pdf_name(self) -> &'static str {
        match self {
            ImageFilter::Dct => "DCTDecode",
            ImageFilter::Flate => "FlateDecode",
        }
    }

    pub fn from_pdf_name(s: &str) -> Option<Self> {
        match s {
            "DCTDecode" => Some(ImageFilter::Dct),
            "FlateDecode" => Some(ImageFilter::Flate),
            _ => None,
        }
    }
}

/// An RGB layer ready for the document sink.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub filter: ImageFilter,
    /// JPEG bytes, or zlib-compressed 8-bit RGB samples.
    pub data: Vec<u8>,
    /// Zlib-compressed 8-bit alpha plane; `None` when fully opaque.
    pub smask: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn byte_len(&self) -> usize {
        self.data.len() + self.smask.as_ref().map_or(0, Vec::len)
    }
}

/// One encoded layer and the source-space rectangle it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedLayer {
    pub kind: LayerKind,
    /// Position in the input rectangle list (foregrounds only).
    pub index: Option<usize>,
    pub source_rect: Rect,
    pub image: EncodedImage,
}

/// All layers of one page, back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPage {
    pub source_width: u32,
    pub source_height: u32,
    pub layers: Vec<PreparedLayer>,
}
