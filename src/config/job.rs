use serde::Deserialize;

use crate::geometry::dilation::DilationPolicy;
use crate::geometry::projection::CanvasSize;
use crate::layers::{CropMode, EncoderChoice};

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// ページ画像パス → 矩形リストのJSONファイル
    pub input: String,
    pub output: String,
    #[serde(default, deserialize_with = "deserialize_pages")]
    pub pages: Option<Vec<u32>>,
    pub variants: Option<Vec<Variant>>,
    pub canvas: Option<CanvasSize>,
    pub foreground_margin: Option<i32>,
    pub background_margin: Option<i32>,
    pub dilation_policy: Option<DilationPolicy>,
    pub crop_mode: Option<CropMode>,
    pub fill_color: Option<[u8; 3]>,
    pub bg_encoding: Option<LayerEncoding>,
    pub bg_quality: Option<u8>,
    pub fg_encoding: Option<LayerEncoding>,
    pub fg_quality: Option<u8>,
}

/// 出力PDFの種類。
///
/// `Masked` が本来の出力。その他はサイズ比較用のベースライン。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// 背景（穴埋め済み）+ 前景レイヤー
    Masked,
    /// 背景レイヤーのみ
    BackgroundOnly,
    /// 元画像をロスレスでそのまま配置
    UnmaskedLossless,
    /// 元画像をJPEGでそのまま配置
    UnmaskedLossy,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Masked => "masked",
            Variant::BackgroundOnly => "background_only",
            Variant::UnmaskedLossless => "unmasked_lossless",
            Variant::UnmaskedLossy => "unmasked_lossy",
        }
    }

    /// 複数バリアント出力時のファイル名サフィックス（`<stem>.<suffix>.pdf`）
    pub fn output_suffix(self) -> &'static str {
        match self {
            Variant::Masked => "masked",
            Variant::BackgroundOnly => "bgd",
            Variant::UnmaskedLossless => "unmasked.png",
            Variant::UnmaskedLossy => "unmasked.jpg",
        }
    }
}

/// レイヤーの圧縮方式（YAML表現）。品質値と組み合わせて [`EncoderChoice`] になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerEncoding {
    Lossy,
    Lossless,
}

impl LayerEncoding {
    pub fn with_quality(self, quality: u8) -> EncoderChoice {
        match self {
            LayerEncoding::Lossy => EncoderChoice::LossyPhotographic(quality),
            LayerEncoding::Lossless => EncoderChoice::LosslessFlat,
        }
    }
}

/// ページ範囲文字列をパースしてページ番号のベクタに変換する。
///
/// ページ番号は矩形マップのソート済みキー順での1始まりの位置。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
///
/// 結果はソート済み・重複なし。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(crate::error::LayerError::config(
            "Page range cannot be empty",
        ));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_page_number(start_str)?;
            let end = parse_page_number(end_str)?;

            if start > end {
                return Err(crate::error::LayerError::config(format!(
                    "Invalid page range: start ({start}) > end ({end})"
                )));
            }

            pages.extend(start..=end);
        } else {
            pages.push(parse_page_number(part)?);
        }
    }

    if pages.is_empty() {
        return Err(crate::error::LayerError::config(
            "Page range resolved to empty set",
        ));
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}

fn parse_page_number(s: &str) -> crate::error::Result<u32> {
    let page: u32 = s.trim().parse().map_err(|_| {
        crate::error::LayerError::config(format!("Invalid page number: '{}'", s.trim()))
    })?;
    if page == 0 {
        return Err(crate::error::LayerError::config(
            "Page numbers start at 1",
        ));
    }
    Ok(page)
}

/// serdeのdeserialize_withで使用するページ範囲デシリアライザ
fn deserialize_pages<'de, D>(deserializer: D) -> Result<Option<Vec<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| parse_page_range(&s).map_err(serde::de::Error::custom))
        .transpose()
}
