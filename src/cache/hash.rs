// SHA-256（ソース画像ダイジェスト + 矩形リスト + レイヤー設定）
//
// Computes a cache key from the digest of a page's source image file, its rectangles and
// the layer settings that influence the encoded output. The key is a SHA-256
// hash encoded as a lowercase hexadecimal string.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::config::job::Variant;
use crate::geometry::Rect;
use crate::layers::EncoderChoice;
use crate::pipeline::page_processor::LayerConfig;

fn encoder_json(choice: EncoderChoice) -> serde_json::Value {
    match choice {
        EncoderChoice::LosslessFlat => serde_json::json!("lossless"),
        EncoderChoice::LossyPhotographic(q) => serde_json::json!(format!("lossy:{q}")),
    }
}

/// 設定を正規化JSON形式に変換する（キーはアルファベット順で固定）。
///
/// キャンバスサイズは配置にのみ影響し、エンコード結果には影響しないため含めない。
fn settings_to_canonical_json(config: &LayerConfig, variant: Variant) -> String {
    let mut map = BTreeMap::new();
    map.insert("background_margin", serde_json::json!(config.background_margin));
    map.insert("bg_encoder", encoder_json(config.encoders.background));
    map.insert(
        "crop_mode",
        serde_json::json!(match config.crop_mode {
            crate::layers::CropMode::Cropped => "cropped",
            crate::layers::CropMode::Masked => "masked",
        }),
    );
    map.insert(
        "dilation_policy",
        serde_json::json!(config.dilation_policy.as_str()),
    );
    map.insert("fg_encoder", encoder_json(config.encoders.foreground));
    map.insert("fill_color", serde_json::json!(config.fill_color.0));
    map.insert("foreground_margin", serde_json::json!(config.foreground_margin));
    map.insert("variant", serde_json::json!(variant.as_str()));
    serde_json::to_string(&map).expect("serializing primitive layer settings to JSON must not fail")
}

/// ソース画像ファイルのバイト列の SHA-256 (小文字16進数)。
///
/// ページ処理中に保持するのはこのダイジェストだけで、バイト列は破棄してよい。
pub fn source_digest(image_bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(image_bytes))
}

/// ソース画像ダイジェスト・矩形リスト・設定からキャッシュキー（SHA-256ハッシュ）を計算する。
///
/// ハッシュ入力: `source_digest || rect_count || rects || settings_canonical_json`
pub fn compute_cache_key(
    source_digest: &str,
    rects: &[Rect],
    config: &LayerConfig,
    variant: Variant,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_digest.as_bytes());
    hasher.update((rects.len() as u64).to_le_bytes());
    for r in rects {
        for v in [r.x0, r.y0, r.x1, r.y1] {
            hasher.update(v.to_le_bytes());
        }
    }

    let settings_json = settings_to_canonical_json(config, variant);
    hasher.update(settings_json.as_bytes());

    hex::encode(hasher.finalize())
}
