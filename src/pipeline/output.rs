use bson::{Bson, Document};

use crate::errors::ShapeError;
use crate::schema::bson_kind;

const WHEN_MATCHED: &[&str] = &["replace", "keepExisting", "merge", "fail"];
const WHEN_NOT_MATCHED: &[&str] = &["insert", "discard", "fail"];

/// `$out: "coll"` or `{ db, coll }`.
pub(super) fn check_out(body: &Bson) -> Result<(), ShapeError> {
    target("$out", body)
}

pub(super) fn check_merge(body: &Bson) -> Result<(), ShapeError> {
    let doc = match body {
        Bson::String(_) => return Ok(()),
        Bson::Document(d) => d,
        other => return Err(ShapeError::mismatch("$merge", "collection name or document", bson_kind(other))),
    };
    let Some(into) = doc.get("into") else {
        return Err(ShapeError::MissingKey { path: "$merge".into(), key: "into".into() });
    };
    target("$merge.into", into)?;
    for (key, value) in doc {
        let at = format!("$merge.{key}");
        match key.as_str() {
            "into" => {}
            "on" => match value {
                Bson::String(_) => {}
                Bson::Array(fields) if !fields.is_empty() && fields.iter().all(|f| matches!(f, Bson::String(_))) => {}
                other => return Err(ShapeError::mismatch(&at, "field name or list of names", bson_kind(other))),
            },
            "whenMatched" => match value {
                Bson::String(s) if WHEN_MATCHED.contains(&s.as_str()) => {}
                // An update pipeline; its stages run against the merged documents.
                Bson::Array(stages) if stages.iter().all(|s| matches!(s, Bson::Document(_))) => {}
                other => return Err(ShapeError::mismatch(&at, WHEN_MATCHED.join(" | "), bson_kind(other))),
            },
            "whenNotMatched" => match value {
                Bson::String(s) if WHEN_NOT_MATCHED.contains(&s.as_str()) => {}
                other => return Err(ShapeError::mismatch(&at, WHEN_NOT_MATCHED.join(" | "), bson_kind(other))),
            },
            "let" => {
                if !matches!(value, Bson::Document(_)) {
                    return Err(ShapeError::mismatch(&at, "document", bson_kind(value)));
                }
            }
            other => return Err(ShapeError::UnknownKey { path: "$merge".into(), key: other.to_string() }),
        }
    }
    Ok(())
}

fn target(path: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::String(_) => Ok(()),
        Bson::Document(d) => namespace(path, d),
        other => Err(ShapeError::mismatch(path, "collection name or { db, coll }", bson_kind(other))),
    }
}

fn namespace(path: &str, doc: &Document) -> Result<(), ShapeError> {
    for key in ["db", "coll"] {
        match doc.get(key) {
            Some(Bson::String(_)) => {}
            Some(other) => return Err(ShapeError::mismatch(&format!("{path}.{key}"), "string", bson_kind(other))),
            None => return Err(ShapeError::MissingKey { path: path.to_string(), key: key.to_string() }),
        }
    }
    match doc.keys().find(|k| *k != "db" && *k != "coll") {
        Some(extra) => Err(ShapeError::UnknownKey { path: path.to_string(), key: extra.clone() }),
        None => Ok(()),
    }
}
