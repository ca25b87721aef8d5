//! Batch command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use mouldsight_core::{ComparisonRequest, ImageSource, InspectionPool, PoolConfig};
use tracing::info;

use crate::exit_codes::ExitCode;
use crate::output::{self, BatchEntry};
use crate::OutputFormat;

pub struct BatchArgs {
    pub reference: PathBuf,
    pub candidates: Vec<PathBuf>,
    pub min_area: Option<u32>,
    pub config: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Execute the batch command.
pub async fn execute(args: BatchArgs, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    let config = super::load_config(args.config.as_deref())?;
    let engine = super::build_engine(config)?;

    let mut pool_config = PoolConfig::from_env();
    if let Some(jobs) = args.jobs {
        pool_config.max_concurrency = jobs.max(1);
    }
    if let Some(secs) = args.timeout_secs {
        pool_config.job_timeout = Duration::from_secs(secs);
    }
    let pool = InspectionPool::new(engine, &pool_config);

    // Read the master once and share the bytes across jobs
    let reference = std::fs::read(&args.reference)
        .with_context(|| format!("Failed to read reference image: {}", args.reference.display()))?;

    let requests = args
        .candidates
        .iter()
        .map(|candidate| {
            let mut request = ComparisonRequest::new(ImageSource::bytes(reference.clone()), candidate.clone());
            request.min_defect_area = args.min_area;
            request
        })
        .collect();

    info!(
        parts = args.candidates.len(),
        concurrency = pool_config.max_concurrency,
        "Starting batch comparison"
    );

    let results = pool.compare_all(requests).await;

    let entries: Vec<BatchEntry<'_>> = args
        .candidates
        .iter()
        .zip(&results)
        .map(|(candidate, result)| BatchEntry {
            candidate: candidate.display().to_string(),
            result,
        })
        .collect();
    output::print_batch(&entries, format, quiet)?;

    Ok(ExitCode::from_results(&results))
}
