use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, repo_types::Role},
    complaints::{
        dto::{ComplaintForm, ComplaintResponse, ComplaintsResponse, ListQuery, UpdateComplaintRequest},
        repo_types::StatusChange,
        services::{list_filter, paginate, parse_status, validate_new_complaint},
    },
    error::AppError,
    extract::{AppJson, AppQuery},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn complaint_routes() -> Router<AppState> {
    Router::new()
        .route("/complaints", get(list_complaints).post(create_complaint))
        .route("/complaints/:id", get(get_complaint).patch(update_complaint))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Unparseable IDs cannot name a stored complaint.
fn complaint_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Complaint not found".into()))
}

#[instrument(skip(state))]
pub async fn list_complaints(
    State(state): State<AppState>,
    _user: AuthUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<ComplaintsResponse>, AppError> {
    let filter = list_filter(&query)?;
    let matched = state.complaints.list(&filter).await;
    let total = matched.len();
    let complaints = paginate(matched, query.offset, query.limit);
    Ok(Json(ComplaintsResponse { complaints, total }))
}

#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn create_complaint(
    State(state): State<AppState>,
    user: AuthUser,
    form: ComplaintForm,
) -> Result<(StatusCode, HeaderMap, Json<ComplaintResponse>), AppError> {
    let input = validate_new_complaint(form, user.id).map_err(|e| {
        warn!(error = %e, "complaint rejected");
        e
    })?;
    let complaint = state.complaints.create(input).await;
    info!(complaint_id = %complaint.id, category = ?complaint.category, "complaint filed");

    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&format!("/api/complaints/{}", complaint.id)) {
        headers.insert(LOCATION, v);
    }
    Ok((StatusCode::CREATED, headers, Json(ComplaintResponse { complaint })))
}

#[instrument(skip(state))]
pub async fn get_complaint(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let id = complaint_id(&id)?;
    let complaint = state
        .complaints
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Complaint not found".into()))?;
    Ok(Json(ComplaintResponse { complaint }))
}

#[instrument(skip(state, payload), fields(user_id = %user.id))]
pub async fn update_complaint(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<AppJson<UpdateComplaintRequest>, AppError>,
) -> Result<Json<ComplaintResponse>, AppError> {
    // Role is checked before the body is parsed.
    user.require_role(Role::Government)?;
    let AppJson(payload) = payload?;
    let status = parse_status(payload.status)?;
    let id = complaint_id(&id)?;

    let change = StatusChange {
        status,
        message: payload.message,
        author: user.id,
    };
    let complaint = state
        .complaints
        .update_status(id, change, state.config.allow_status_regression)
        .await
        .map_err(|e| {
            warn!(error = %e, complaint_id = %id, "status update rejected");
            AppError::from(e)
        })?;

    info!(complaint_id = %complaint.id, status = %complaint.status, updates = complaint.updates.len(), "complaint updated");
    Ok(Json(ComplaintResponse { complaint }))
}
