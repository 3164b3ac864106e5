use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Garbage,
    Roads,
    Electricity,
    Other,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "garbage" => Ok(Category::Garbage),
            "roads" => Ok(Category::Roads),
            "electricity" => Ok(Category::Electricity),
            "other" => Ok(Category::Other),
            other => Err(format!("Unknown category: {other}")),
        }
    }
}

/// Lifecycle status, ordered so that backward moves can be detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in-progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }

    /// Forward moves and no-op moves are always allowed; backward moves only
    /// when `allow_regression` is set.
    pub fn can_transition_to(self, next: ComplaintStatus, allow_regression: bool) -> bool {
        next >= self || allow_regression
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComplaintStatus::Pending),
            "in-progress" => Ok(ComplaintStatus::InProgress),
            "resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Append-only annotation on a complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintUpdate {
    pub id: Uuid,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub location: Location,
    pub status: ComplaintStatus,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub updates: Vec<ComplaintUpdate>,
}

/// Validated input for a new complaint.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Location,
    pub image_url: Option<String>,
    pub created_by: Uuid,
}

/// A status update requested by a caller.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ComplaintStatus,
    pub message: Option<String>,
    pub author: Uuid,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Cannot move complaint from {from} to {to}")]
pub struct TransitionError {
    pub from: ComplaintStatus,
    pub to: ComplaintStatus,
}

impl Complaint {
    pub fn new(input: NewComplaint, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            category: input.category,
            image_url: input.image_url,
            location: input.location,
            status: ComplaintStatus::Pending,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
            updates: Vec::new(),
        }
    }

    /// Apply a status change. Nothing is modified when the transition is
    /// rejected.
    pub fn apply(
        &mut self,
        change: StatusChange,
        allow_regression: bool,
        now: OffsetDateTime,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(change.status, allow_regression) {
            return Err(TransitionError {
                from: self.status,
                to: change.status,
            });
        }

        self.status = change.status;
        self.updated_at = now;

        if let Some(message) = change
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
        {
            self.updates.push(ComplaintUpdate {
                id: Uuid::new_v4(),
                message,
                created_at: now,
                created_by: change.author,
            });
        }
        Ok(())
    }
}
