// 全ジョブ実行

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::error::LayerError;
use crate::pipeline::job_runner::{JobConfig, JobResult, output_paths, run_job};

/// Reject job lists in which two documents would be written to the same path.
///
/// Paths are compared after dropping `.` components and redundant separators.
pub fn check_unique_outputs(jobs: &[JobConfig]) -> crate::error::Result<()> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    for job in jobs {
        for path in output_paths(job) {
            let normalized: PathBuf = path.components().collect();
            if let Some(other) = seen.insert(normalized, job.input_path.as_path()) {
                return Err(LayerError::config(format!(
                    "output {} is written by both {} and {}",
                    path.display(),
                    other.display(),
                    job.input_path.display()
                )));
            }
        }
    }
    Ok(())
}

/// Run multiple jobs, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
///
/// Jobs share no state, so they run in parallel; `parallel_workers == 0`
/// uses the global rayon pool.
pub fn run_all_jobs(
    jobs: &[JobConfig],
    parallel_workers: usize,
) -> Vec<crate::error::Result<JobResult>> {
    let run = || -> Vec<crate::error::Result<JobResult>> { jobs.par_iter().map(run_job).collect() };

    if parallel_workers == 0 {
        return run();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_workers)
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!("failed to build a {parallel_workers}-thread pool ({e}), using the global pool");
            run()
        }
    }
}
