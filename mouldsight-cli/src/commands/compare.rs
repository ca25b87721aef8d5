//! Compare command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use mouldsight_core::{ComparisonRequest, InspectionPool, MasterSample, PoolConfig};
use tracing::info;

use crate::exit_codes::ExitCode;
use crate::output;
use crate::OutputFormat;

pub struct CompareArgs {
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub min_area: Option<u32>,
    pub config: Option<PathBuf>,
    pub sample_key: Option<String>,
}

/// Execute the compare command.
pub async fn execute(args: CompareArgs, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    let config = super::load_config(args.config.as_deref())?;
    let engine = super::build_engine(config)?;
    let pool = InspectionPool::new(engine, &PoolConfig::from_env());

    let sample = match &args.sample_key {
        Some(key) => Some(
            MasterSample::open(key.as_str(), &args.reference, "")
                .with_context(|| format!("Failed to read master sample: {}", args.reference.display()))?,
        ),
        None => None,
    };

    let mut request = match &sample {
        Some(sample) => ComparisonRequest::new(sample.image_source(), args.candidate.clone()),
        None => ComparisonRequest::new(args.reference.clone(), args.candidate.clone()),
    };
    request.min_defect_area = args.min_area;

    info!(
        reference = %args.reference.display(),
        candidate = %args.candidate.display(),
        "Comparing part"
    );

    let mut result = pool.compare(request).await;
    if let Some(sample) = &sample {
        result = result.with_sample(sample.reference());
    }

    output::print_result(&result, format, quiet)?;
    Ok(ExitCode::from_result(&result))
}
