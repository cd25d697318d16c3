pub mod job;
pub mod merged;
pub mod settings;

use std::path::{Path, PathBuf};

use crate::error::LayerError;
use job::JobFile;
use settings::Settings;

/// Name of the settings file looked up next to each job file.
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// ジョブファイルと同じディレクトリの `settings.yaml` を読み込む。
/// ファイルが無ければデフォルト設定。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let settings_path = job_dir(job_file_path).join(SETTINGS_FILE_NAME);
    if settings_path.is_file() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}

/// Read and parse a job file (`jobs: [...]`).
pub fn load_job_file(job_file_path: &Path) -> crate::error::Result<JobFile> {
    let yaml = std::fs::read_to_string(job_file_path).map_err(|e| {
        LayerError::config(format!(
            "failed to read job file {}: {e}",
            job_file_path.display()
        ))
    })?;
    serde_yml::from_str(&yaml).map_err(|e| {
        LayerError::config(format!(
            "failed to parse job file {}: {e}",
            job_file_path.display()
        ))
    })
}

/// Directory relative job paths are resolved against.
pub fn job_dir(job_file_path: &Path) -> PathBuf {
    match job_file_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `path` unchanged when absolute, else joined onto `base_dir`.
pub fn resolve_path(base_dir: &Path, path: impl AsRef<Path>) -> PathBuf {
    let p = path.as_ref();
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
