// ファイルシステムキャッシュ: hash → エンコード済みレイヤー
//
// Stores and retrieves PreparedPage on disk, keyed by SHA-256 hash.
// Entry layout: metadata.json, layer-NNN.bin, layer-NNN.smask (when alpha)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LayerError;
use crate::geometry::Rect;
use crate::layers::{EncodedImage, ImageFilter, LayerKind, PreparedLayer, PreparedPage};

/// ファイルシステムベースのキャッシュストア。
///
/// `<cache_dir>/<hex_hash>/` 以下にレイヤーファイルを格納する。
pub struct CacheStore {
    cache_dir: PathBuf,
}

/// metadata.json に保存するページのメタデータ。
#[derive(serde::Serialize, serde::Deserialize)]
struct CacheMetadata {
    cache_key: String,
    source_width: u32,
    source_height: u32,
    layers: Vec<LayerMetadata>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LayerMetadata {
    kind: String,
    index: Option<usize>,
    rect: Rect,
    filter: String,
    width: u32,
    height: u32,
    has_smask: bool,
}

/// キャッシュキーが有効な SHA-256 hex 文字列であることを検証する。
///
/// 有効なキーは正確に64文字の小文字16進数([0-9a-f])である必要がある。
/// パストラバーサルや不正なディレクトリアクセスを防止する。
fn validate_cache_key(key: &str) -> crate::error::Result<()> {
    if key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(())
    } else {
        Err(LayerError::cache(format!(
            "invalid cache key: expected 64-character lowercase hex string, got '{}'",
            key
        )))
    }
}

fn layer_file(i: usize) -> String {
    format!("layer-{i:03}.bin")
}

fn smask_file(i: usize) -> String {
    format!("layer-{i:03}.smask")
}

fn cache_io(e: std::io::Error) -> LayerError {
    LayerError::cache(e.to_string())
}

impl CacheStore {
    /// 指定されたディレクトリをキャッシュルートとして新しい CacheStore を作成する。
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// キャッシュキーからディレクトリパスを計算する。
    fn key_dir(&self, key: &str) -> crate::error::Result<PathBuf> {
        validate_cache_key(key)?;
        Ok(self.cache_dir.join(key))
    }

    /// PreparedPage をキャッシュに保存する。
    ///
    /// キャッシュディレクトリが存在しない場合は自動的に作成する。
    /// 書き込みはアトミック: 書き込み元ごとに一意な一時ディレクトリへ
    /// ファイルを書き込み、最後にrenameで最終パスに移動する。
    /// キーは内容アドレスなので、完全なエントリが既にあればそれを残す。
    pub fn store(&self, key: &str, page: &PreparedPage) -> crate::error::Result<()> {
        let dir = self.key_dir(key)?;
        if self.contains(key) {
            return Ok(());
        }

        fs::create_dir_all(&self.cache_dir).map_err(cache_io)?;
        let tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(&self.cache_dir)
            .map_err(cache_io)?;

        let mut layers = Vec::with_capacity(page.layers.len());
        for (i, layer) in page.layers.iter().enumerate() {
            fs::write(tmp.path().join(layer_file(i)), &layer.image.data).map_err(cache_io)?;
            if let Some(smask) = &layer.image.smask {
                fs::write(tmp.path().join(smask_file(i)), smask).map_err(cache_io)?;
            }
            layers.push(LayerMetadata {
                kind: layer.kind.as_str().to_string(),
                index: layer.index,
                rect: layer.source_rect,
                filter: layer.image.filter.pdf_name().to_string(),
                width: layer.image.width,
                height: layer.image.height,
                has_smask: layer.image.smask.is_some(),
            });
        }

        let metadata = CacheMetadata {
            cache_key: key.to_string(),
            source_width: page.source_width,
            source_height: page.source_height,
            layers,
        };
        let metadata_json =
            serde_json::to_string(&metadata).map_err(|e| LayerError::cache(e.to_string()))?;
        fs::write(tmp.path().join("metadata.json"), metadata_json.as_bytes()).map_err(cache_io)?;

        if fs::rename(tmp.path(), &dir).is_ok() {
            return Ok(());
        }
        // 他の書き込み元が先に完成させた
        if self.contains(key) {
            debug!(key, "cache entry already stored");
            return Ok(());
        }

        // 不完全な古いエントリは置き換える
        if dir.exists() {
            let _ = fs::remove_dir_all(&dir);
        }
        match fs::rename(tmp.path(), &dir) {
            Ok(()) => Ok(()),
            Err(_) if self.contains(key) => Ok(()),
            Err(e) => Err(cache_io(e)),
        }
    }

    /// キャッシュから PreparedPage を取得する。キャッシュミスの場合は None を返す。
    ///
    /// ソース画像の寸法が一致しない場合もキャッシュミスとして扱う。
    pub fn retrieve(
        &self,
        key: &str,
        source_dims: (u32, u32),
    ) -> crate::error::Result<Option<PreparedPage>> {
        let dir = self.key_dir(key)?;
        if !dir.exists() {
            return Ok(None);
        }

        let metadata_str = fs::read_to_string(dir.join("metadata.json")).map_err(cache_io)?;
        let metadata: CacheMetadata =
            serde_json::from_str(&metadata_str).map_err(|e| LayerError::cache(e.to_string()))?;

        if metadata.cache_key != key {
            return Err(LayerError::cache(format!(
                "cache key mismatch: expected '{}', found '{}'",
                key, metadata.cache_key
            )));
        }

        if (metadata.source_width, metadata.source_height) != source_dims {
            return Ok(None);
        }

        let mut layers = Vec::with_capacity(metadata.layers.len());
        for (i, meta) in metadata.layers.into_iter().enumerate() {
            let kind = LayerKind::from_str_opt(&meta.kind).ok_or_else(|| {
                LayerError::cache(format!("unknown layer kind '{}'", meta.kind))
            })?;
            let filter = ImageFilter::from_pdf_name(&meta.filter).ok_or_else(|| {
                LayerError::cache(format!("unknown layer filter '{}'", meta.filter))
            })?;
            let data = fs::read(dir.join(layer_file(i))).map_err(cache_io)?;
            let smask = if meta.has_smask {
                Some(fs::read(dir.join(smask_file(i))).map_err(cache_io)?)
            } else {
                None
            };
            layers.push(PreparedLayer {
                kind,
                index: meta.index,
                source_rect: meta.rect,
                image: EncodedImage {
                    filter,
                    data,
                    smask,
                    width: meta.width,
                    height: meta.height,
                },
            });
        }

        Ok(Some(PreparedPage {
            source_width: metadata.source_width,
            source_height: metadata.source_height,
            layers,
        }))
    }

    /// キャッシュキーに完全なエントリ(metadata.json と全レイヤーファイル)があるか確認する。
    pub fn contains(&self, key: &str) -> bool {
        let dir = match self.key_dir(key) {
            Ok(d) => d,
            Err(_) => return false,
        };

        let metadata_str = match fs::read_to_string(dir.join("metadata.json")) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let metadata: CacheMetadata = match serde_json::from_str(&metadata_str) {
            Ok(m) => m,
            Err(_) => return false,
        };

        metadata.layers.iter().enumerate().all(|(i, meta)| {
            dir.join(layer_file(i)).exists() && (!meta.has_smask || dir.join(smask_file(i)).exists())
        })
    }
}
