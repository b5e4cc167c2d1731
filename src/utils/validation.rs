use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::Error;

pub fn validate<T: Validate>(val: &T) -> Result<(), ValidationErrors> {
    val.validate()
}

/// Single-field validation failure with a readable message.
pub fn field_error(field: &'static str, code: &'static str, message: &str) -> Error {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message.to_string()));
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    Error::Validation(errors)
}

/// Accepts absolute `http`/`https` URLs with a host.
pub fn validate_webhook_url(raw: &str) -> Result<url::Url, Error> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| field_error("url", "url", &format!("url is invalid: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(field_error("url", "url", "url must use http or https"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(field_error("url", "url", "url must include a host"));
    }
    Ok(parsed)
}

/// Trims and de-duplicates event names, keeping first occurrences in order.
pub fn normalize_events(events: &[String]) -> Result<Vec<String>, Error> {
    let mut normalized: Vec<String> = Vec::with_capacity(events.len());
    for event in events {
        let event = event.trim();
        if event.is_empty() {
            return Err(field_error("events", "blank", "event names must not be blank"));
        }
        if !normalized.iter().any(|e| e == event) {
            normalized.push(event.to_string());
        }
    }
    if normalized.is_empty() {
        return Err(field_error(
            "events",
            "length",
            "events must contain at least one event",
        ));
    }
    Ok(normalized)
}
