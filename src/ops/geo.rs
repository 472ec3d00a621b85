use bson::{Bson, Document};

use super::exclusive::OneOf;
use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{GEOJSON_KINDS, GeoShape, SchemaType, as_f64, bson_kind, is_number};

const QUERY_OPERATORS: OneOf = OneOf::optional(&["$geoIntersects", "$geoWithin", "$near", "$nearSphere"]);
const WITHIN_SHAPES: OneOf = OneOf::required(&["$geometry", "$box", "$centerSphere", "$center", "$polygon"]);
const AREAS: &[&str] = &["Polygon", "MultiPolygon"];

/// Geospatial query operators on legacy pairs and GeoJSON fields.
pub(super) struct GeoSpatial;

impl OperatorFamily for GeoSpatial {
    fn name(&self) -> &'static str {
        "geospatial"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$geoIntersects", "$geoWithin", "$near", "$nearSphere", "$maxDistance", "$minDistance"]
    }

    fn applies(&self, ty: &SchemaType) -> bool {
        ty.geo_shape().is_some()
    }

    fn check(&self, _env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let path = join(field.path, op);
        let Some(shape) = field.ty.non_null().geo_shape() else {
            return Err(ShapeError::incompatible(field.path, op, field.ty));
        };
        match op {
            "$geoIntersects" => {
                let doc = geometry_operand(&path, value)?;
                only_keys(&path, doc, &["$geometry"])?;
                check_geometry(&join(&path, "$geometry"), required(&path, doc, "$geometry")?, AREAS)
            }
            "$geoWithin" => check_within(&path, &shape, geometry_operand(&path, value)?),
            "$near" | "$nearSphere" => {
                if !shape.is_point_like() {
                    return Err(ShapeError::incompatible(field.path, op, field.ty));
                }
                check_near(&path, value)
            }
            _ => match as_f64(value) {
                Some(d) if d >= 0.0 => Ok(()),
                Some(_) => Err(ShapeError::invalid(&path, "distance must not be negative")),
                None => Err(ShapeError::mismatch(&path, "number", bson_kind(value))),
            },
        }
    }

    fn check_document(&self, field: FieldRef<'_>, doc: &Document) -> Result<(), ShapeError> {
        let main = QUERY_OPERATORS.select(field.path, doc)?;
        for distance in ["$maxDistance", "$minDistance"] {
            if !doc.contains_key(distance) {
                continue;
            }
            match main {
                None => {
                    return Err(ShapeError::MissingKey { path: field.path.to_string(), key: "$near | $nearSphere".into() });
                }
                Some((op @ ("$geoIntersects" | "$geoWithin"), _)) => {
                    return Err(ShapeError::MutuallyExclusive {
                        path: field.path.to_string(),
                        keys: vec![op.to_string(), distance.to_string()],
                    });
                }
                Some((op, Bson::Array(_))) if distance == "$minDistance" => {
                    // Legacy pairs only support $maxDistance.
                    return Err(ShapeError::MutuallyExclusive {
                        path: field.path.to_string(),
                        keys: vec![op.to_string(), distance.to_string()],
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn geometry_operand<'v>(path: &str, value: &'v Bson) -> Result<&'v Document, ShapeError> {
    match value {
        Bson::Document(d) => Ok(d),
        other => Err(ShapeError::mismatch(path, "geometry document", bson_kind(other))),
    }
}

fn required<'d>(path: &str, doc: &'d Document, key: &str) -> Result<&'d Bson, ShapeError> {
    doc.get(key).ok_or_else(|| ShapeError::MissingKey { path: path.to_string(), key: key.to_string() })
}

fn only_keys(path: &str, doc: &Document, allowed: &[&str]) -> Result<(), ShapeError> {
    match doc.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(k) => Err(ShapeError::UnknownKey { path: path.to_string(), key: k.clone() }),
        None => Ok(()),
    }
}

fn check_within(path: &str, shape: &GeoShape, doc: &Document) -> Result<(), ShapeError> {
    let Some((key, value)) = WITHIN_SHAPES.select(path, doc)? else {
        return Ok(());
    };
    only_keys(path, doc, WITHIN_SHAPES.options())?;
    let at = join(path, key);
    match key {
        "$geometry" => check_geometry(&at, value, AREAS),
        "$box" => {
            point_like(path, shape, key)?;
            positions(&at, value, 2, Some(2))
        }
        "$centerSphere" => {
            point_like(path, shape, key)?;
            center(&at, value)
        }
        "$center" => {
            legacy_only(path, shape, key)?;
            center(&at, value)
        }
        _ => {
            legacy_only(path, shape, key)?;
            positions(&at, value, 3, None)
        }
    }
}

fn point_like(path: &str, shape: &GeoShape, key: &str) -> Result<(), ShapeError> {
    if shape.is_point_like() {
        Ok(())
    } else {
        Err(ShapeError::incompatible(path, key, "non-point geometry"))
    }
}

fn legacy_only(path: &str, shape: &GeoShape, key: &str) -> Result<(), ShapeError> {
    if shape.is_legacy() {
        Ok(())
    } else {
        Err(ShapeError::incompatible(path, key, "GeoJSON field"))
    }
}

/// `[[x, y], radius]`.
fn center(path: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::Array(items) if items.len() == 2 && is_position(&items[0]) && is_number(&items[1]) => Ok(()),
        other => Err(ShapeError::mismatch(path, "[coordinates, radius]", bson_kind(other))),
    }
}

fn check_near(path: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        v if is_position(v) => Ok(()),
        Bson::Document(doc) => {
            only_keys(path, doc, &["$geometry", "$maxDistance", "$minDistance"])?;
            check_geometry(&join(path, "$geometry"), required(path, doc, "$geometry")?, &["Point"])?;
            for key in ["$maxDistance", "$minDistance"] {
                if let Some(v) = doc.get(key) {
                    if !as_f64(v).is_some_and(|d| d >= 0.0) {
                        return Err(ShapeError::mismatch(&join(path, key), "non-negative number", bson_kind(v)));
                    }
                }
            }
            Ok(())
        }
        other => Err(ShapeError::mismatch(path, "coordinates or { $geometry: Point }", bson_kind(other))),
    }
}

/// A GeoJSON geometry whose `type` is one of `allowed`.
pub(crate) fn check_geometry(path: &str, value: &Bson, allowed: &[&str]) -> Result<(), ShapeError> {
    let Bson::Document(doc) = value else {
        return Err(ShapeError::mismatch(path, "GeoJSON geometry", bson_kind(value)));
    };
    let kind = match required(path, doc, "type")? {
        Bson::String(s) if GEOJSON_KINDS.contains(&s.as_str()) => s.as_str(),
        other => return Err(ShapeError::mismatch(&join(path, "type"), "GeoJSON type name", bson_kind(other))),
    };
    if !allowed.contains(&kind) {
        return Err(ShapeError::invalid(path, format!("expected {}, found {kind}", allowed.join(" | "))));
    }
    if kind == "GeometryCollection" {
        only_keys(path, doc, &["type", "geometries", "crs"])?;
        let members = match required(path, doc, "geometries")? {
            Bson::Array(members) => members,
            other => return Err(ShapeError::mismatch(&join(path, "geometries"), "array", bson_kind(other))),
        };
        let members_allowed: Vec<&str> =
            GEOJSON_KINDS.iter().copied().filter(|k| *k != "GeometryCollection").collect();
        for (i, m) in members.iter().enumerate() {
            check_geometry(&join(&join(path, "geometries"), &i.to_string()), m, &members_allowed)?;
        }
    } else {
        only_keys(path, doc, &["type", "coordinates", "crs"])?;
        let coords = required(path, doc, "coordinates")?;
        let depth = match kind {
            "Point" => 0,
            "MultiPoint" | "LineString" => 1,
            "MultiLineString" | "Polygon" => 2,
            _ => 3,
        };
        if !nested_positions(coords, depth) {
            return Err(ShapeError::mismatch(&join(path, "coordinates"), format!("{kind} coordinates"), bson_kind(coords)));
        }
    }
    if let Some(crs) = doc.get("crs") {
        check_crs(&join(path, "crs"), crs)?;
    }
    Ok(())
}

fn check_crs(path: &str, value: &Bson) -> Result<(), ShapeError> {
    let ok = value.as_document().is_some_and(|d| {
        matches!(d.get("type"), Some(Bson::String(_)))
            && d.get_document("properties").is_ok_and(|p| matches!(p.get("name"), Some(Bson::String(_))))
    });
    if ok { Ok(()) } else { Err(ShapeError::mismatch(path, "{ type, properties: { name } }", bson_kind(value))) }
}

fn nested_positions(value: &Bson, depth: usize) -> bool {
    if depth == 0 {
        return is_position(value);
    }
    match value {
        Bson::Array(items) => items.iter().all(|i| nested_positions(i, depth - 1)),
        _ => false,
    }
}

fn positions(path: &str, value: &Bson, min: usize, max: Option<usize>) -> Result<(), ShapeError> {
    match value {
        Bson::Array(items)
            if items.len() >= min && max.is_none_or(|m| items.len() <= m) && items.iter().all(is_position) =>
        {
            Ok(())
        }
        other => Err(ShapeError::mismatch(path, format!("at least {min} coordinate pairs"), bson_kind(other))),
    }
}

/// `[x, y]` or `[x, y, z]`.
pub(crate) fn is_position(value: &Bson) -> bool {
    matches!(value, Bson::Array(items) if (2..=3).contains(&items.len()) && items.iter().all(is_number))
}
