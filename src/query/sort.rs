use bson::{Bson, Document};

use crate::config::{IndexMode, ValidationConfig};
use crate::errors::ShapeError;
use crate::path::{IndexRepr, join};
use crate::schema::{SchemaContext, SchemaType, as_integer, bson_kind};
use crate::telemetry::{self, CheckKind};

const DIRECTIONS: &[&str] = &["asc", "desc", "ascending", "descending"];
const META: &[&str] = &["textScore", "indexKey"];

/// Checks sort specifications. Array positions are never written in a sort.
pub struct SortChecker<'s> {
    ctx: &'s SchemaContext,
    config: &'s ValidationConfig,
}

impl<'s> SortChecker<'s> {
    pub fn new(ctx: &'s SchemaContext, config: &'s ValidationConfig) -> Self {
        Self { ctx, config }
    }

    /// # Errors
    /// Returns the first key that is unknown, unsortable or has an invalid
    /// direction.
    pub fn check(&self, sort: &Document) -> Result<(), ShapeError> {
        let result = self.check_quiet(sort);
        telemetry::record(CheckKind::Sort, &result);
        result
    }

    pub(crate) fn check_quiet(&self, sort: &Document) -> Result<(), ShapeError> {
        for (path, value) in sort {
            let Some(ty) = self.ctx.lookup(path, IndexRepr::Omitted) else {
                if self.config.index_mode == IndexMode::Tolerant {
                    log::debug!("sort path `{path}` not in schema; accepted unchecked");
                    continue;
                }
                return Err(ShapeError::unknown_path(path));
            };
            check_sort_value(path, &ty, value)?;
        }
        Ok(())
    }
}

/// Whether a field of type `ty` can be ordered.
pub fn sortable(ty: &SchemaType) -> bool {
    let base = ty.non_null();
    !matches!(base, SchemaType::Null)
        && base.all_branches(|t| match t {
            SchemaType::Boolean => true,
            other => other.is_orderable() || other.is_stringish(),
        })
}

pub(crate) fn check_sort_value(path: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    if !sortable(ty) {
        return Err(ShapeError::incompatible(path, "sort", ty));
    }
    match value {
        Bson::Document(d) => {
            let meta = d.get("$meta");
            if d.len() != 1 || meta.is_none() {
                return Err(ShapeError::invalid(path, "sort documents take a single $meta key"));
            }
            if !ty.non_null().is_stringish() {
                return Err(ShapeError::incompatible(path, "$meta", ty));
            }
            match meta {
                Some(Bson::String(m)) if META.contains(&m.as_str()) => Ok(()),
                Some(other) => Err(ShapeError::mismatch(&join(path, "$meta"), "\"textScore\" | \"indexKey\"", bson_kind(other))),
                None => Ok(()),
            }
        }
        other => {
            if is_direction(other) {
                Ok(())
            } else {
                Err(ShapeError::mismatch(path, "1 | -1 | \"asc\" | \"desc\"", bson_kind(other)))
            }
        }
    }
}

/// `1`, `-1` or one of the named directions.
pub fn is_direction(value: &Bson) -> bool {
    match value {
        Bson::String(s) => DIRECTIONS.contains(&s.as_str()),
        other => matches!(as_integer(other), Some(1 | -1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::doc;

    fn ctx() -> SchemaContext {
        SchemaContext::document(&SchemaType::record([
            Field::new("title", SchemaType::String),
            Field::new("rank", SchemaType::Number.nullable()),
            Field::new("blob", SchemaType::Binary),
            Field::new(
                "items",
                SchemaType::array(SchemaType::record([Field::new("qty", SchemaType::Number)])),
            ),
        ]))
        .unwrap()
    }

    #[test]
    fn directions_and_meta() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let s = SortChecker::new(&ctx, &cfg);
        assert!(s.check(&doc! { "rank": -1, "title": "asc", "items.qty": 1 }).is_ok());
        assert!(s.check(&doc! { "title": { "$meta": "textScore" } }).is_ok());
        assert!(s.check(&doc! { "rank": { "$meta": "textScore" } }).is_err());
        assert!(s.check(&doc! { "rank": 2 }).is_err());
    }

    #[test]
    fn unsortable_and_indexed_paths_are_rejected() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let s = SortChecker::new(&ctx, &cfg);
        assert!(matches!(s.check(&doc! { "blob": 1 }), Err(ShapeError::OperatorIncompatible { .. })));
        assert!(matches!(s.check(&doc! { "items.0.qty": 1 }), Err(ShapeError::UnknownPath { .. })));
    }
}
