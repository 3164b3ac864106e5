use uuid::Uuid;

use crate::{
    complaints::{
        dto::{ComplaintForm, Coordinate, ListQuery, LocationInput},
        repo::ComplaintFilter,
        repo_types::{Category, ComplaintStatus, Location, NewComplaint},
    },
    error::AppError,
};

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

fn coordinate(raw: Option<Coordinate>, name: &str, bound: f64) -> Result<f64, AppError> {
    let value = match raw {
        None => 0.0,
        Some(Coordinate::Number(n)) => n,
        Some(Coordinate::Text(s)) if s.trim().is_empty() => 0.0,
        Some(Coordinate::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::validation(format!("{name} must be a number")))?,
    };
    if !value.is_finite() || value.abs() > bound {
        return Err(AppError::validation(format!("{name} is out of range")));
    }
    Ok(value)
}

fn location(input: LocationInput) -> Result<Location, AppError> {
    match input {
        LocationInput::Address(address) => Ok(Location {
            latitude: 0.0,
            longitude: 0.0,
            address,
        }),
        LocationInput::Point {
            latitude,
            longitude,
            address,
        } => Ok(Location {
            latitude: coordinate(latitude, "latitude", 90.0)?,
            longitude: coordinate(longitude, "longitude", 180.0)?,
            address: address.unwrap_or_default(),
        }),
    }
}

/// Turn a raw submission into a store-ready complaint owned by `author`.
pub fn validate_new_complaint(form: ComplaintForm, author: Uuid) -> Result<NewComplaint, AppError> {
    let location_input = form.location.filter(|l| match l {
        LocationInput::Address(a) => !a.trim().is_empty(),
        LocationInput::Point { .. } => true,
    });
    let (Some(title), Some(description), Some(category), Some(location_input)) = (
        present(form.title),
        present(form.description),
        present(form.category),
        location_input,
    ) else {
        return Err(AppError::validation(
            "Title, description, category, and location are required",
        ));
    };

    let category: Category = category.trim().parse().map_err(AppError::Validation)?;

    Ok(NewComplaint {
        title,
        description,
        category,
        location: location(location_input)?,
        image_url: present(form.image_url),
        created_by: author,
    })
}

pub fn parse_status(raw: Option<String>) -> Result<ComplaintStatus, AppError> {
    let raw = present(raw).ok_or_else(|| AppError::validation("Status is required"))?;
    raw.trim().parse().map_err(AppError::Validation)
}

pub fn list_filter(query: &ListQuery) -> Result<ComplaintFilter, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(s.parse::<ComplaintStatus>().map_err(AppError::Validation)?),
    };
    Ok(ComplaintFilter {
        status,
        created_by: query.created_by,
    })
}

/// Slice a result set; no limit means "everything after `offset`".
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}
