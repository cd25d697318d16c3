// 矩形リストJSONの読み書き
//
// Single list:   [{"X0":50,"Y0":50,"X1":450,"Y1":650}, ...]
// Page map:      {"scan/page-01.png": [ ...rects... ], ...}

use std::collections::BTreeMap;
use std::path::Path;

use super::{Rect, RectList};
use crate::error::LayerError;

/// Load an ordered rectangle list from a JSON file.
pub fn load_rect_list(path: &Path) -> crate::error::Result<RectList> {
    let content = read_input(path)?;
    let rects: RectList = serde_json::from_str(&content).map_err(|e| {
        LayerError::input(format!(
            "failed to parse rectangle list {}: {e}",
            path.display()
        ))
    })?;
    validate_all(&rects, path)?;
    Ok(rects)
}

/// Save a rectangle list as pretty-printed JSON.
pub fn save_rect_list(path: &Path, rects: &[Rect]) -> crate::error::Result<()> {
    let json = serde_json::to_string_pretty(rects)
        .map_err(|e| LayerError::input(format!("failed to serialize rectangle list: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a map of page image path -> rectangle list.
///
/// `BTreeMap` iteration order (sorted by path) is the page order of the
/// output document.
pub fn load_page_rect_map(path: &Path) -> crate::error::Result<BTreeMap<String, RectList>> {
    let content = read_input(path)?;
    let map: BTreeMap<String, RectList> = serde_json::from_str(&content).map_err(|e| {
        LayerError::input(format!(
            "failed to parse page rectangle map {}: {e}",
            path.display()
        ))
    })?;
    for rects in map.values() {
        validate_all(rects, path)?;
    }
    Ok(map)
}

fn read_input(path: &Path) -> crate::error::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| LayerError::input(format!("failed to read {}: {e}", path.display())))
}

fn validate_all(rects: &[Rect], path: &Path) -> crate::error::Result<()> {
    for r in rects {
        r.validate()
            .map_err(|e| LayerError::input(format!("{}: {e}", path.display())))?;
    }
    Ok(())
}
