use serde::Serialize;

use crate::complaints::{repo::ComplaintRepository, repo_types::ComplaintStatus};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_complaints: usize,
    pub resolved_complaints: usize,
    pub pending_complaints: usize,
    pub in_progress_complaints: usize,
}

/// Full scan of the complaint store; no caching.
pub async fn compute_stats(complaints: &dyn ComplaintRepository) -> StatsResponse {
    complaints
        .count_by_status()
        .await
        .into_iter()
        .fold(StatsResponse::default(), |mut acc, (status, n)| {
            acc.total_complaints += n;
            match status {
                ComplaintStatus::Pending => acc.pending_complaints += n,
                ComplaintStatus::InProgress => acc.in_progress_complaints += n,
                ComplaintStatus::Resolved => acc.resolved_complaints += n,
            }
            acc
        })
}
