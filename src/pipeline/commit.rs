// 出力コミット: 全ファイルを一時ファイルへ書き出し -> 一括で確定 -> 失敗時は巻き戻し
//
// A job's documents and layer artifacts are staged next to their
// destinations first. Nothing becomes visible until every file of the job
// has been staged, and a failed commit undoes the files already moved.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use crate::error::LayerError;

/// A file written to a temporary path in its destination directory.
///
/// The handle is closed after writing. Dropping it without committing
/// removes the temporary file.
pub struct StagedFile {
    tmp: TempPath,
    path: PathBuf,
}

impl StagedFile {
    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A committed destination and the file it replaced, if there was one.
struct Committed {
    path: PathBuf,
    backup: Option<TempPath>,
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `bytes` to a temporary file next to `path`.
pub fn stage_file(path: &Path, bytes: &[u8]) -> crate::error::Result<StagedFile> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))
        .map_err(|e| LayerError::sink(format!("failed to stage {}: {e}", path.display())))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(StagedFile {
        tmp: tmp.into_temp_path(),
        path: path.to_path_buf(),
    })
}

/// Move every staged file onto its destination, in order.
///
/// If any move fails, the destinations already committed are removed,
/// the files they replaced are put back, and the error is returned.
pub fn commit_staged(staged: Vec<StagedFile>) -> crate::error::Result<()> {
    let mut committed: Vec<Committed> = Vec::with_capacity(staged.len());
    for file in staged {
        match commit_one(file) {
            Ok(done) => committed.push(done),
            Err(e) => {
                rollback(committed);
                return Err(e);
            }
        }
    }
    // replaced files (backups) are deleted on drop
    Ok(())
}

fn commit_one(file: StagedFile) -> crate::error::Result<Committed> {
    let StagedFile { tmp, path } = file;

    let backup = if path.is_file() {
        let backup = tempfile::Builder::new()
            .prefix(".bak-")
            .tempfile_in(parent_dir(&path))?
            .into_temp_path();
        fs::rename(&path, &backup)?;
        Some(backup)
    } else {
        None
    };

    match tmp.persist(&path) {
        Ok(_) => {
            debug!(path = %path.display(), "committed");
            Ok(Committed { path, backup })
        }
        Err(e) => {
            if let Some(backup) = backup {
                restore(backup, &path);
            }
            Err(LayerError::sink(format!(
                "failed to commit {}: {}",
                path.display(),
                e.error
            )))
        }
    }
}

fn rollback(committed: Vec<Committed>) {
    for done in committed.into_iter().rev() {
        if let Err(e) = fs::remove_file(&done.path) {
            warn!(path = %done.path.display(), error = %e, "rollback: failed to remove output");
        }
        if let Some(backup) = done.backup {
            restore(backup, &done.path);
        }
        debug!(path = %done.path.display(), "rolled back");
    }
}

fn restore(backup: TempPath, path: &Path) {
    if let Err(e) = fs::rename(&backup, path) {
        warn!(path = %path.display(), error = %e, "failed to restore previous file");
        // 元ファイルを失わないようバックアップは残す
        if let Ok(kept) = backup.keep() {
            warn!(backup = %kept.display(), "previous file kept");
        }
    }
}
