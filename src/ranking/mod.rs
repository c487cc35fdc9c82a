//! LLM-based ranking of a job batch against the user's profile

pub mod prompt;
pub mod recovery;

use tracing::debug;

use crate::models::{AnalysisResult, JobRecord, RankedItem};

pub use prompt::build_prompt;
pub use recovery::parse_ranked;

/// Attach scores to the jobs they reference, best match first.
///
/// Items whose `job_index` is outside the batch are dropped. Equal scores
/// keep the model's order.
pub fn merge_ranked(jobs: &[JobRecord], ranked: Vec<RankedItem>) -> Vec<AnalysisResult> {
    let mut results: Vec<AnalysisResult> = ranked
        .into_iter()
        .filter_map(|item| {
            let Some(job) = jobs.get(item.job_index) else {
                debug!(
                    "Dropping ranked item with out-of-range job_index {} (batch of {})",
                    item.job_index,
                    jobs.len()
                );
                return None;
            };

            Some(AnalysisResult {
                job: job.clone(),
                match_score: item.match_score,
                summary: item.summary,
            })
        })
        .collect();

    results.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    results
}
