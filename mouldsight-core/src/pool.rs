//! Bounded worker pool for running many comparisons concurrently.
//!
//! Comparisons are CPU bound, so each one runs on tokio's blocking thread
//! pool. A semaphore caps how many run at once and every job has a deadline;
//! a job that overruns is reported as a timeout result instead of stalling
//! the batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::engine::InspectionEngine;
use crate::error::InspectionError;
use crate::result::ComparisonResult;
use crate::sample::ComparisonRequest;

/// Shares one engine between concurrent comparison jobs.
#[derive(Clone)]
pub struct InspectionPool {
    engine: Arc<dyn InspectionEngine>,
    permits: Arc<Semaphore>,
    job_timeout: Duration,
}

impl InspectionPool {
    pub fn new(engine: Arc<dyn InspectionEngine>, config: &PoolConfig) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            job_timeout: config.job_timeout,
        }
    }

    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Run one comparison on the blocking pool.
    pub async fn compare(&self, request: ComparisonRequest) -> ComparisonResult {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return ComparisonResult::failed(&InspectionError::Processing(
                    "worker pool is shut down".into(),
                ))
            }
        };

        let engine = Arc::clone(&self.engine);
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.compare(&request)
        });

        match tokio::time::timeout(self.job_timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                warn!(error = %join_error, "Comparison task failed");
                ComparisonResult::failed(&InspectionError::Processing(format!(
                    "comparison task failed: {join_error}"
                )))
            }
            Err(_) => {
                warn!(timeout = ?self.job_timeout, "Comparison timed out");
                ComparisonResult::failed(&InspectionError::Timeout(self.job_timeout))
            }
        }
    }

    /// Run a batch concurrently; results come back in request order.
    pub async fn compare_all(&self, requests: Vec<ComparisonRequest>) -> Vec<ComparisonResult> {
        debug!(jobs = requests.len(), "Starting comparison batch");

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let pool = self.clone();
                tokio::spawn(async move { pool.compare(request).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await.unwrap_or_else(|e| {
                ComparisonResult::failed(&InspectionError::Processing(format!(
                    "comparison task failed: {e}"
                )))
            });
            results.push(result);
        }
        results
    }
}
