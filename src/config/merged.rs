use std::path::PathBuf;

use image::Rgb;

use super::job::{Job, LayerEncoding, Variant};
use super::settings::Settings;
use crate::error::LayerError;
use crate::geometry::dilation::DilationPolicy;
use crate::geometry::projection::CanvasSize;
use crate::layers::{CropMode, EncoderPolicy};
use crate::pipeline::page_processor::LayerConfig;

#[derive(Debug, Clone)]
pub struct MergedConfig {
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
    pub pages: Option<Vec<u32>>,
    pub parallel_workers: usize,
    pub cache_dir: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            canvas: job.canvas.unwrap_or(settings.canvas),
            foreground_margin: job.foreground_margin.unwrap_or(settings.foreground_margin),
            background_margin: job.background_margin.unwrap_or(settings.background_margin),
            dilation_policy: job.dilation_policy.unwrap_or(settings.dilation_policy),
            crop_mode: job.crop_mode.unwrap_or(settings.crop_mode),
            fill_color: job.fill_color.unwrap_or(settings.fill_color),
            bg_encoding: job.bg_encoding.unwrap_or(settings.bg_encoding),
            bg_quality: job.bg_quality.unwrap_or(settings.bg_quality),
            fg_encoding: job.fg_encoding.unwrap_or(settings.fg_encoding),
            fg_quality: job.fg_quality.unwrap_or(settings.fg_quality),
            variants: job
                .variants
                .clone()
                .unwrap_or_else(|| settings.variants.clone()),
            pages: job.pages.clone(),
            parallel_workers: settings.parallel_workers,
            cache_dir: settings.cache_dir.clone(),
            artifact_dir: settings.artifact_dir.clone(),
        }
    }

    /// 品質値・バリアント指定を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        for (name, q) in [("bg_quality", self.bg_quality), ("fg_quality", self.fg_quality)] {
            if !(1..=100).contains(&q) {
                return Err(LayerError::config(format!(
                    "{name} must be 1-100, got {q}"
                )));
            }
        }
        if self.variants.is_empty() {
            return Err(LayerError::config("variants must not be empty"));
        }
        Ok(())
    }

    /// ページ処理エンジン用の設定を組み立てる。
    pub fn layer_config(&self) -> LayerConfig {
        LayerConfig {
            foreground_margin: self.foreground_margin,
            background_margin: self.background_margin,
            dilation_policy: self.dilation_policy,
            crop_mode: self.crop_mode,
            fill_color: Rgb(self.fill_color),
            canvas: self.canvas,
            encoders: EncoderPolicy {
                background: self.bg_encoding.with_quality(self.bg_quality),
                foreground: self.fg_encoding.with_quality(self.fg_quality),
            },
        }
    }
}
