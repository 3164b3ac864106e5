//! Complaint store.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::complaints::repo_types::{
    Complaint, ComplaintStatus, NewComplaint, StatusChange, TransitionError,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComplaintRepoError {
    #[error("complaint not found")]
    NotFound,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Optional narrowing for [`ComplaintRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub created_by: Option<Uuid>,
}

impl ComplaintFilter {
    fn matches(&self, c: &Complaint) -> bool {
        self.status.map_or(true, |s| c.status == s)
            && self.created_by.map_or(true, |u| c.created_by == u)
    }
}

#[async_trait]
pub trait ComplaintRepository: Send + Sync {
    async fn create(&self, input: NewComplaint) -> Complaint;

    async fn get(&self, id: Uuid) -> Option<Complaint>;

    /// Matching complaints, oldest first.
    async fn list(&self, filter: &ComplaintFilter) -> Vec<Complaint>;

    /// Number of stored complaints per status, from a single unsorted pass.
    async fn count_by_status(&self) -> HashMap<ComplaintStatus, usize>;

    /// Validate and apply a status change atomically.
    async fn update_status(
        &self,
        id: Uuid,
        change: StatusChange,
        allow_regression: bool,
    ) -> Result<Complaint, ComplaintRepoError>;
}

#[derive(Default)]
pub struct InMemoryComplaintRepository {
    complaints: RwLock<HashMap<Uuid, Complaint>>,
}

impl InMemoryComplaintRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComplaintRepository for InMemoryComplaintRepository {
    async fn create(&self, input: NewComplaint) -> Complaint {
        let complaint = Complaint::new(input, OffsetDateTime::now_utc());
        self.complaints
            .write()
            .await
            .insert(complaint.id, complaint.clone());
        debug!(complaint_id = %complaint.id, "complaint stored");
        complaint
    }

    async fn get(&self, id: Uuid) -> Option<Complaint> {
        self.complaints.read().await.get(&id).cloned()
    }

    async fn list(&self, filter: &ComplaintFilter) -> Vec<Complaint> {
        let mut out: Vec<Complaint> = self
            .complaints
            .read()
            .await
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        out
    }

    async fn count_by_status(&self) -> HashMap<ComplaintStatus, usize> {
        let complaints = self.complaints.read().await;
        let mut counts = HashMap::new();
        for c in complaints.values() {
            *counts.entry(c.status).or_insert(0) += 1;
        }
        counts
    }

    async fn update_status(
        &self,
        id: Uuid,
        change: StatusChange,
        allow_regression: bool,
    ) -> Result<Complaint, ComplaintRepoError> {
        let mut complaints = self.complaints.write().await;
        let complaint = complaints
            .get_mut(&id)
            .ok_or(ComplaintRepoError::NotFound)?;
        complaint.apply(change, allow_regression, OffsetDateTime::now_utc())?;
        Ok(complaint.clone())
    }
}
