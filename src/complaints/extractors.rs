use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use tracing::debug;

use super::dto::{ComplaintForm, Coordinate, LocationInput};
use crate::error::AppError;

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S> FromRequest<S> for ComplaintForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(form) = Json::<ComplaintForm>::from_request(req, state).await?;
            return Ok(form);
        }

        let mut mp = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        read_multipart(&mut mp).await
    }
}

/// Fields: title, description, category, location (address), latitude,
/// longitude, imageUrl, and an optional `image` file part.
async fn read_multipart(mp: &mut Multipart) -> Result<ComplaintForm, AppError> {
    let mut form = ComplaintForm::default();
    let mut address: Option<String> = None;
    let mut latitude: Option<Coordinate> = None;
    let mut longitude: Option<Coordinate> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            // Image bytes are not kept; only the reference is recorded.
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            debug!(file_name = ?file_name, content_type = ?content_type, size = data.len(), "image part received");
            if form.image_url.is_none() {
                form.image_url = file_name.filter(|n| !n.is_empty());
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "category" => form.category = Some(value),
            "location" | "address" => address = Some(value),
            "latitude" => latitude = Some(Coordinate::Text(value)),
            "longitude" => longitude = Some(Coordinate::Text(value)),
            "imageUrl" => form.image_url = Some(value).filter(|v| !v.is_empty()),
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    form.location = address
        .filter(|a| !a.trim().is_empty())
        .map(|address| LocationInput::Point {
            latitude,
            longitude,
            address: Some(address),
        });
    Ok(form)
}
