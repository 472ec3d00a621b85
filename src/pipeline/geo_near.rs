use bson::{Bson, Document};

use crate::config::ValidationConfig;
use crate::errors::ShapeError;
use crate::ops::{Env, check_geometry, is_position};
use crate::path::IndexRepr;
use crate::query::FilterChecker;
use crate::schema::{SchemaContext, as_f64, bson_kind};

/// `$geoNear`: a point, a required `distanceField`, and an optional filter
/// that must not itself contain `$near`.
pub(super) fn check_geo_near(env: &Env<'_>, ctx: &SchemaContext, config: &ValidationConfig, body: &Bson) -> Result<(), ShapeError> {
    let Bson::Document(doc) = body else {
        return Err(ShapeError::mismatch("$geoNear", "options document", bson_kind(body)));
    };
    if !doc.contains_key("distanceField") {
        return Err(ShapeError::MissingKey { path: "$geoNear".into(), key: "distanceField".into() });
    }
    let Some(near) = doc.get("near") else {
        return Err(ShapeError::MissingKey { path: "$geoNear".into(), key: "near".into() });
    };
    if !is_position(near) {
        check_geometry("$geoNear.near", near, &["Point"])?;
    }
    for (key, value) in doc {
        let at = format!("$geoNear.{key}");
        match key.as_str() {
            "near" => {}
            "distanceField" | "includeLocs" => string(&at, value)?,
            "key" => {
                let Bson::String(field) = value else {
                    return Err(ShapeError::mismatch(&at, "string", bson_kind(value)));
                };
                if ctx.lookup(field, IndexRepr::Omitted).is_none_or(|t| t.non_null().geo_shape().is_none()) {
                    return Err(ShapeError::invalid(&at, format!("`{field}` is not a geospatial field")));
                }
            }
            "maxDistance" | "minDistance" | "distanceMultiplier" => {
                if !as_f64(value).is_some_and(|d| d >= 0.0) {
                    return Err(ShapeError::mismatch(&at, "non-negative number", bson_kind(value)));
                }
            }
            "spherical" => {
                if !matches!(value, Bson::Boolean(_)) {
                    return Err(ShapeError::mismatch(&at, "boolean", bson_kind(value)));
                }
            }
            "query" => {
                let Bson::Document(filter) = value else {
                    return Err(ShapeError::mismatch(&at, "filter document", bson_kind(value)));
                };
                if let Some(op) = find_near(filter) {
                    return Err(ShapeError::invalid(&at, format!("{op} is not allowed in a $geoNear query")));
                }
                FilterChecker::new(ctx, config).check_at(env, filter)?;
            }
            other => return Err(ShapeError::UnknownKey { path: "$geoNear".into(), key: other.to_string() }),
        }
    }
    Ok(())
}

fn string(at: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::String(_) => Ok(()),
        other => Err(ShapeError::mismatch(at, "string", bson_kind(other))),
    }
}

fn find_near(doc: &Document) -> Option<&'static str> {
    for (k, v) in doc {
        if k == "$near" {
            return Some("$near");
        }
        if k == "$nearSphere" {
            return Some("$nearSphere");
        }
        let found = match v {
            Bson::Document(d) => find_near(d),
            Bson::Array(items) => items.iter().filter_map(Bson::as_document).find_map(find_near),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}
