// ジョブ単位: 矩形マップ読込 -> 並列ページ準備 -> 出力PDF組立 -> 一括コミット

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache::hash::{compute_cache_key, source_digest};
use crate::cache::store::CacheStore;
use crate::config::job::Variant;
use crate::config::resolve_path;
use crate::error::LayerError;
use crate::geometry::RectList;
use crate::geometry::rect_file::load_page_rect_map;
use crate::layers::encode::{artifact_extension, encode_artifact};
use crate::layers::{LayerKind, PreparedPage};
use crate::pdf::writer::PdfPageWriter;
use crate::pipeline::commit::{StagedFile, commit_staged, stage_file};
use crate::pipeline::page_processor::{
    LayerConfig, PageLayers, encode_page_layers, extract_page_layers, place_page,
};

/// Configuration for a single job.
pub struct JobConfig {
    /// JSON map of page image path -> rectangle list.
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub variants: Vec<Variant>,
    /// 1-based positions in the sorted page list; `None` means all pages.
    pub pages: Option<Vec<u32>>,
    pub layer: LayerConfig,
    pub cache_dir: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
}

/// One written output document.
#[derive(Debug, Clone)]
pub struct VariantOutput {
    pub variant: Variant,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of processing a single job.
pub struct JobResult {
    pub input_path: PathBuf,
    pub outputs: Vec<VariantOutput>,
    pub pages_processed: usize,
}

/// One page prepared for every variant of the job.
///
/// The decoded image is dropped once the page is done; only encoded layers
/// and staged artifact files remain.
struct PreparedSource {
    /// Indexed like the job's unique variant list.
    pages: Vec<PreparedPage>,
    artifacts: Vec<StagedFile>,
}

/// Output path for `variant`. With several variants, `out.pdf` becomes
/// `out.<suffix>.pdf` (e.g. `out.masked.pdf`, `out.bgd.pdf`).
pub fn variant_output_path(output: &Path, variant: Variant, multiple: bool) -> PathBuf {
    if !multiple {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}.{}.pdf", variant.output_suffix()))
}

/// Every document path the job writes, in variant order.
pub fn output_paths(config: &JobConfig) -> Vec<PathBuf> {
    let variants = unique_variants(&config.variants);
    let multiple = variants.len() > 1;
    variants
        .iter()
        .map(|&v| variant_output_path(&config.output_path, v, multiple))
        .collect()
}

/// Run a single job.
///
/// Phase A: per page, decode and prepare every variant, cache lookups (rayon parallel)
/// Phase B: PDF assembly per variant (sequential, page order), staged to temp files
/// Phase C: commit every staged file, only after all variants succeeded
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let variants = unique_variants(&config.variants);
    if variants.is_empty() {
        return Err(LayerError::config("job has no output variants"));
    }

    let page_map = load_page_rect_map(&config.input_path)?;
    let base_dir = config
        .input_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let pages = select_pages(page_map, config.pages.as_deref())?;
    info!(
        input = %config.input_path.display(),
        pages = pages.len(),
        variants = variants.len(),
        "run_job"
    );

    // --- Phase A: prepare pages ---
    let cache = config.cache_dir.as_ref().map(CacheStore::new);
    let sources: Vec<PreparedSource> = pages
        .into_par_iter()
        .map(|(name, rects)| prepare_source(&base_dir, &name, &rects, &variants, config, cache.as_ref()))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let pages_processed = sources.len();

    // --- Phase B: assemble ---
    let mut staged: Vec<StagedFile> = Vec::new();
    let mut outputs = Vec::with_capacity(variants.len());
    for (i, (&variant, path)) in variants.iter().zip(output_paths(config)).enumerate() {
        let mut writer = PdfPageWriter::new();
        for source in &sources {
            place_page(&source.pages[i], config.layer.canvas, &mut writer)?;
        }
        let bytes = writer.finish()?;
        info!(variant = variant.as_str(), bytes = bytes.len(), path = %path.display(), "assembled");
        staged.push(stage_file(&path, &bytes)?);
        outputs.push(VariantOutput {
            variant,
            path,
            bytes: bytes.len() as u64,
        });
    }
    staged.extend(sources.into_iter().flat_map(|s| s.artifacts));

    // --- Phase C: commit ---
    commit_staged(staged)?;

    Ok(JobResult {
        input_path: config.input_path.clone(),
        outputs,
        pages_processed,
    })
}

fn unique_variants(variants: &[Variant]) -> Vec<Variant> {
    let mut out: Vec<Variant> = Vec::with_capacity(variants.len());
    for &v in variants {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Keep the pages at the given 1-based positions of the sorted map.
fn select_pages(
    page_map: BTreeMap<String, RectList>,
    selection: Option<&[u32]>,
) -> crate::error::Result<Vec<(String, RectList)>> {
    let all: Vec<(String, RectList)> = page_map.into_iter().collect();
    if all.is_empty() {
        return Err(LayerError::input("rectangle map lists no pages"));
    }

    let Some(selection) = selection else {
        return Ok(all);
    };

    let page_count = all.len();
    if let Some(&p) = selection.iter().find(|&&p| p == 0 || p as usize > page_count) {
        return Err(LayerError::config(format!(
            "page {p} out of range (map has {page_count} pages)"
        )));
    }

    Ok(all
        .into_iter()
        .enumerate()
        .filter(|(i, _)| selection.contains(&(*i as u32 + 1)))
        .map(|(_, page)| page)
        .collect())
}

/// Decode one page and prepare its layers for every variant.
///
/// Only the digest of the source file is kept for cache keys. Artifact
/// dumping needs the raw layers, so it bypasses cache reads.
fn prepare_source(
    base_dir: &Path,
    name: &str,
    rects: &RectList,
    variants: &[Variant],
    config: &JobConfig,
    cache: Option<&CacheStore>,
) -> crate::error::Result<PreparedSource> {
    let path = resolve_path(base_dir, name);
    let (digest, image) = {
        let bytes = fs::read(&path)
            .map_err(|e| LayerError::input(format!("failed to read image {}: {e}", path.display())))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| LayerError::input(format!("failed to decode image {}: {e}", path.display())))?
            .to_rgba8();
        (cache.map(|_| source_digest(&bytes)), image)
    };
    debug!(path = %path.display(), width = image.width(), height = image.height(), rects = rects.len(), "decoded page");

    let mut pages = Vec::with_capacity(variants.len());
    let mut artifacts = Vec::new();
    for &variant in variants {
        let cache_key = digest
            .as_deref()
            .map(|d| compute_cache_key(d, rects, &config.layer, variant));

        if config.artifact_dir.is_none()
            && let (Some(store), Some(key)) = (cache, cache_key.as_deref())
            && let Some(cached) = store.retrieve(key, image.dimensions())?
        {
            debug!(path = %path.display(), key, "cache hit");
            pages.push(cached);
            continue;
        }

        let layers = extract_page_layers(&image, rects, &config.layer, variant)?;
        if variant == Variant::Masked
            && let Some(dir) = config.artifact_dir.as_deref()
        {
            artifacts.extend(stage_artifacts(dir, &path, &layers)?);
        }
        let prepared = encode_page_layers(&layers)?;

        if let (Some(store), Some(key)) = (cache, cache_key.as_deref()) {
            store.store(key, &prepared)?;
        }
        pages.push(prepared);
    }

    Ok(PreparedSource { pages, artifacts })
}

/// Stage each layer as a standalone image file:
/// `<stem>.bgd.<ext>` and `<stem>-NNN.fgd.<ext>` (NNN = rectangle index).
fn stage_artifacts(
    dir: &Path,
    image_path: &Path,
    layers: &PageLayers,
) -> crate::error::Result<Vec<StagedFile>> {
    fs::create_dir_all(dir)?;
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());

    layers
        .layers
        .iter()
        .map(|layer| -> crate::error::Result<StagedFile> {
            let ext = artifact_extension(layer.encoder);
            let name = match (layer.kind, layer.index) {
                (LayerKind::Foreground, Some(i)) => format!("{stem}-{i:03}.fgd.{ext}"),
                _ => format!("{stem}.bgd.{ext}"),
            };
            let staged = stage_file(&dir.join(name), &encode_artifact(&layer.pixels, layer.encoder)?)?;
            debug!(path = %staged.path().display(), "staged layer artifact");
            Ok(staged)
        })
        .collect()
}
