use bson::Bson;

use crate::config::{IndexMode, ValidationConfig};
use crate::errors::ShapeError;
use crate::path::IndexRepr;
use crate::schema::{SchemaContext, SchemaType, bson_kind};

const KEYS: &[&str] = &["from", "localField", "foreignField", "as"];

/// `{ from, localField, foreignField, as }`, with the two join fields of
/// compatible types.
pub(super) fn check_lookup(
    primary: &SchemaContext,
    foreign: &SchemaContext,
    config: &ValidationConfig,
    body: &Bson,
) -> Result<(), ShapeError> {
    let Bson::Document(doc) = body else {
        return Err(ShapeError::mismatch("$lookup", "lookup document", bson_kind(body)));
    };
    if let Some(extra) = doc.keys().find(|k| !KEYS.contains(&k.as_str())) {
        return Err(ShapeError::UnknownKey { path: "$lookup".into(), key: extra.clone() });
    }
    let mut names = [""; 4];
    for (slot, key) in names.iter_mut().zip(KEYS) {
        match doc.get(key) {
            Some(Bson::String(s)) => *slot = s.as_str(),
            Some(other) => return Err(ShapeError::mismatch(&format!("$lookup.{key}"), "string", bson_kind(other))),
            None => return Err(ShapeError::MissingKey { path: "$lookup".into(), key: key.to_string() }),
        }
    }
    let [_, local, foreign_field, _] = names;
    let local_ty = field_type(primary, config, local, "$lookup.localField")?;
    let foreign_ty = field_type(foreign, config, foreign_field, "$lookup.foreignField")?;
    match (local_ty, foreign_ty) {
        (Some(l), Some(f)) if !compatible(&l, &f) => Err(ShapeError::mismatch(
            "$lookup.foreignField",
            format!("a type comparable with {l}"),
            f.to_string(),
        )),
        _ => Ok(()),
    }
}

fn field_type(ctx: &SchemaContext, config: &ValidationConfig, path: &str, at: &str) -> Result<Option<SchemaType>, ShapeError> {
    match ctx.lookup(path, IndexRepr::Numeric) {
        Some(t) => Ok(Some(t)),
        None if config.index_mode == IndexMode::Tolerant => Ok(None),
        None => Err(ShapeError::UnknownPath { path: format!("{at}: {path}") }),
    }
}

/// Join keys match after unwrapping arrays on either side.
pub(crate) fn compatible(a: &SchemaType, b: &SchemaType) -> bool {
    let (a, b) = (unwrap(a), unwrap(b));
    branches(&a).iter().any(|x| branches(&b).iter().any(|y| same_class(x, y)))
}

fn unwrap(ty: &SchemaType) -> SchemaType {
    let base = ty.non_null();
    match base.array_element() {
        Some(elem) => unwrap(&elem),
        None => base,
    }
}

fn branches(ty: &SchemaType) -> Vec<SchemaType> {
    match ty {
        SchemaType::Union { variants } => variants.clone(),
        other => vec![other.clone()],
    }
}

fn same_class(a: &SchemaType, b: &SchemaType) -> bool {
    if matches!(a, SchemaType::Any) || matches!(b, SchemaType::Any) {
        return true;
    }
    if a.is_numeric() && b.is_numeric() {
        return true;
    }
    if a.is_stringish() && b.is_stringish() {
        return true;
    }
    match (a, b) {
        (SchemaType::Record { .. } | SchemaType::Map { .. }, SchemaType::Record { .. } | SchemaType::Map { .. }) => true,
        (SchemaType::Branded { brand: x }, SchemaType::Branded { brand: y }) => x == y,
        (SchemaType::Literal { value: x }, SchemaType::Literal { value: y }) => x == y,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}
