use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::complaints::repo_types::Complaint;

/// Latitude/longitude as sent by clients: JSON numbers or form text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    /// Bare address, as posted by the complaint form.
    Address(String),
    Point {
        latitude: Option<Coordinate>,
        longitude: Option<Coordinate>,
        address: Option<String>,
    },
}

/// Raw complaint submission, from either a JSON body or a multipart form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<LocationInput>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub created_by: Option<Uuid>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct ComplaintsResponse {
    pub complaints: Vec<Complaint>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    pub complaint: Complaint,
}
