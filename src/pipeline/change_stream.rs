use bson::{Bson, Document};

use crate::errors::ShapeError;
use crate::ops::OneOf;
use crate::query::ChangeStreamOptions;
use crate::schema::bson_kind;

const RESUME: OneOf = OneOf::optional(&["resumeAfter", "startAfter", "startAtOperationTime"]);
const FULL_DOCUMENT: &[&str] = &["default", "updateLookup", "whenAvailable", "required", "changeStreamPreAndPostImages"];
const BEFORE_CHANGE: &[&str] = &["off", "whenAvailable", "required"];

pub(super) fn check_change_stream(body: &Bson) -> Result<(), ShapeError> {
    match body {
        Bson::Document(doc) => check_options_document("$changeStream", doc),
        other => Err(ShapeError::mismatch("$changeStream", "options document", bson_kind(other))),
    }
}

fn check_options_document(path: &str, doc: &Document) -> Result<(), ShapeError> {
    RESUME.select(path, doc)?;
    for (key, value) in doc {
        let at = format!("{path}.{key}");
        match key.as_str() {
            "allChangesForCluster" | "showExpandedEvents" => {
                if !matches!(value, Bson::Boolean(_)) {
                    return Err(ShapeError::mismatch(&at, "boolean", bson_kind(value)));
                }
            }
            "fullDocument" => one_of_strings(&at, value, FULL_DOCUMENT)?,
            "fullDocumentBeforeChange" => one_of_strings(&at, value, BEFORE_CHANGE)?,
            "resumeAfter" | "startAfter" => {
                if !matches!(value, Bson::Document(_)) {
                    return Err(ShapeError::mismatch(&at, "resume token", bson_kind(value)));
                }
            }
            "startAtOperationTime" => {
                if !matches!(value, Bson::Timestamp(_)) {
                    return Err(ShapeError::mismatch(&at, "timestamp", bson_kind(value)));
                }
            }
            other => return Err(ShapeError::UnknownKey { path: path.to_string(), key: other.to_string() }),
        }
    }
    Ok(())
}

fn one_of_strings(at: &str, value: &Bson, allowed: &[&str]) -> Result<(), ShapeError> {
    match value {
        Bson::String(s) if allowed.contains(&s.as_str()) => Ok(()),
        Bson::String(s) => Err(ShapeError::invalid(at, format!("expected one of {}, found {s:?}", allowed.join(", ")))),
        other => Err(ShapeError::mismatch(at, "string", bson_kind(other))),
    }
}

/// Checks driver-level change stream options with the stage's rules.
///
/// # Errors
/// Conflicting resume points and unknown enum values.
pub fn check_change_stream_options(options: &ChangeStreamOptions) -> Result<(), ShapeError> {
    let mut doc = Document::new();
    if let Some(v) = &options.full_document {
        doc.insert("fullDocument", v.as_str());
    }
    if let Some(v) = &options.full_document_before_change {
        doc.insert("fullDocumentBeforeChange", v.as_str());
    }
    if let Some(v) = &options.resume_after {
        doc.insert("resumeAfter", v.clone());
    }
    if let Some(v) = &options.start_after {
        doc.insert("startAfter", v.clone());
    }
    if let Some(ts) = options.start_at_operation_time {
        doc.insert("startAtOperationTime", ts);
    }
    if options.show_expanded_events {
        doc.insert("showExpandedEvents", true);
    }
    check_options_document("watch", &doc)
}
