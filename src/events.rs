//! Event input validation. Storage is plain pass-through to the repository.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{CreateEventRequest, EventChanges, NewEvent, UpdateEventRequest},
};

/// Number of events returned by the recommendations endpoint.
pub const RANDOM_EVENT_COUNT: i64 = 2;

const INVALID_DATE: &str = "Event date must be YYYY-MM-DD, YYYY-MM-DDTHH:MM or an RFC 3339 timestamp";

fn required_text(value: Option<String>, field: &'static str) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::field(field, format!("Event {} is required", field))),
    }
}

fn non_blank(value: Option<String>, field: &'static str) -> AppResult<Option<String>> {
    match value {
        None => Ok(None),
        some => required_text(some, field).map(Some),
    }
}

fn valid_cost(cost: f64) -> AppResult<f64> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(AppError::field("cost", "Event cost must be a non-negative number"));
    }
    Ok(cost)
}

/// parse_event_date
///
/// Accepts what admin forms actually send: an RFC 3339 timestamp, a
/// `datetime-local` value (`YYYY-MM-DDTHH:MM`, optionally with seconds), or a bare
/// date. Values without an offset are taken as UTC; a bare date is midnight UTC.
pub fn parse_event_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

fn valid_date(value: String) -> AppResult<DateTime<Utc>> {
    parse_event_date(&value).ok_or_else(|| AppError::field("date", INVALID_DATE))
}

impl TryFrom<CreateEventRequest> for NewEvent {
    type Error = AppError;

    fn try_from(req: CreateEventRequest) -> Result<Self, Self::Error> {
        let title = required_text(req.title, "title")?;
        let description = required_text(req.description, "description")?;
        let date = match req.date {
            Some(raw) if !raw.trim().is_empty() => valid_date(raw)?,
            _ => return Err(AppError::field("date", "Event date is required")),
        };
        Ok(NewEvent {
            title,
            description,
            date,
            location: required_text(req.location, "location")?,
            category: required_text(req.category, "category")?,
            cost: valid_cost(req.cost.unwrap_or(0.0))?,
        })
    }
}

/// Applies the same per-field rules to the fields an update supplies.
pub fn validate_update(req: UpdateEventRequest) -> AppResult<EventChanges> {
    Ok(EventChanges {
        title: non_blank(req.title, "title")?,
        description: non_blank(req.description, "description")?,
        date: req.date.map(valid_date).transpose()?,
        location: non_blank(req.location, "location")?,
        category: non_blank(req.category, "category")?,
        cost: req.cost.map(valid_cost).transpose()?,
    })
}
