use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::job::{LayerEncoding, Variant};
use crate::geometry::dilation::DilationPolicy;
use crate::geometry::projection::CanvasSize;
use crate::layers::CropMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub canvas: CanvasSize,
    pub foreground_margin: i32,
    pub background_margin: i32,
    pub dilation_policy: DilationPolicy,
    pub crop_mode: CropMode,
    pub fill_color: [u8; 3],
    pub bg_encoding: LayerEncoding,
    pub bg_quality: u8,
    pub fg_encoding: LayerEncoding,
    pub fg_quality: u8,
    pub variants: Vec<Variant>,
    pub parallel_workers: usize,
    pub cache_dir: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            canvas: CanvasSize::LETTER,
            foreground_margin: 5,
            background_margin: -5,
            dilation_policy: DilationPolicy::Strict,
            crop_mode: CropMode::Cropped,
            fill_color: [255, 255, 255],
            bg_encoding: LayerEncoding::Lossy,
            bg_quality: 25,
            fg_encoding: LayerEncoding::Lossless,
            fg_quality: 75,
            variants: vec![Variant::Masked],
            parallel_workers: 0,
            cache_dir: None,
            artifact_dir: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::LayerError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
