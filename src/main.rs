use std::path::Path;
use std::process::ExitCode;

use pdf_layering::config::merged::MergedConfig;
use pdf_layering::config::{self, resolve_path};
use pdf_layering::pipeline::job_runner::JobConfig;
use pdf_layering::pipeline::orchestrator::{check_unique_outputs, run_all_jobs};
use pdf_layering::report::SizeReport;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_layering <jobs.yaml>...");
        eprintln!("  Split page images into background/foreground layers and assemble PDFs.");
        eprintln!("  Set RUST_LOG (e.g. RUST_LOG=debug) to control log output.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_layering {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let mut job_configs: Vec<JobConfig> = Vec::new();
    let mut parallel_workers = 0;

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };
        parallel_workers = parallel_workers.max(settings.parallel_workers);

        let job_file = match config::load_job_file(job_file_path) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        };
        let job_dir = config::job_dir(job_file_path);

        for job in &job_file.jobs {
            let merged = MergedConfig::new(&settings, job);
            if let Err(e) = merged.validate() {
                eprintln!("ERROR: {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }

            job_configs.push(JobConfig {
                input_path: resolve_path(&job_dir, &job.input),
                output_path: resolve_path(&job_dir, &job.output),
                variants: merged.variants.clone(),
                pages: merged.pages.clone(),
                layer: merged.layer_config(),
                cache_dir: merged.cache_dir.as_ref().map(|p| resolve_path(&job_dir, p)),
                artifact_dir: merged.artifact_dir.as_ref().map(|p| resolve_path(&job_dir, p)),
            });
        }
    }

    if let Err(e) = check_unique_outputs(&job_configs) {
        eprintln!("ERROR: {e}");
        return ExitCode::FAILURE;
    }

    let results = run_all_jobs(&job_configs, parallel_workers);

    let mut has_error = false;
    for (job, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                for output in &job_result.outputs {
                    eprintln!(
                        "OK: {} -> {} ({} pages)",
                        job_result.input_path.display(),
                        output.path.display(),
                        job_result.pages_processed
                    );
                }
                if job_result.outputs.len() > 1 {
                    eprintln!("{}", SizeReport::new(&job_result.outputs).render());
                }
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job.input_path.display(),
                    job.output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Install the stderr log subscriber once, before any pipeline work.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
