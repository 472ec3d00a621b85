use bson::{Bson, Document};

use crate::config::{IndexMode, ValidationConfig};
use crate::errors::ShapeError;
use crate::ops::{Env, check_operator_document};
use crate::path::{IndexRepr, join};
use crate::schema::{SchemaContext, SchemaType, as_integer, bson_kind};
use crate::telemetry::{self, CheckKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Include,
    Exclude,
    /// Unknown paths passed through in tolerant mode.
    Neutral,
}

/// Checks projections: all inclusions or all exclusions, `_id` aside.
///
/// Array directives (`$elemMatch`, `$slice`) belong to the inclusion shape.
pub struct ProjectionChecker<'s> {
    ctx: &'s SchemaContext,
    config: &'s ValidationConfig,
}

impl<'s> ProjectionChecker<'s> {
    pub fn new(ctx: &'s SchemaContext, config: &'s ValidationConfig) -> Self {
        Self { ctx, config }
    }

    /// # Errors
    /// Returns the first unknown path or invalid entry, or
    /// `MixedProjection` at the first entry that contradicts the earlier ones.
    pub fn check(&self, projection: &Document) -> Result<(), ShapeError> {
        let result = self.check_quiet(projection);
        telemetry::record(CheckKind::Projection, &result);
        result
    }

    pub(crate) fn check_quiet(&self, projection: &Document) -> Result<(), ShapeError> {
        let env = Env::new(self.config);
        let mut mode: Option<Entry> = None;
        for (path, value) in projection {
            let ty = match self.ctx.lookup(path, IndexRepr::Projection) {
                Some(ty) => Some(ty),
                None if self.config.index_mode == IndexMode::Tolerant => None,
                None => return Err(ShapeError::unknown_path(path)),
            };
            let entry = match (value, &ty) {
                (Bson::Document(d), Some(ty)) => self.check_directive(&env, path, ty, d)?,
                (Bson::Document(_), None) => Entry::Neutral,
                (flag, _) => flag_entry(path, flag)?,
            };
            if path.ends_with(".$") && entry != Entry::Include {
                return Err(ShapeError::invalid(path, "positional projection only includes"));
            }
            if path == "_id" || entry == Entry::Neutral {
                continue;
            }
            match mode {
                None => mode = Some(entry),
                Some(m) if m != entry => return Err(ShapeError::MixedProjection { path: path.clone() }),
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn check_directive(&self, env: &Env<'_>, path: &str, ty: &SchemaType, d: &Document) -> Result<Entry, ShapeError> {
        let Some(elem) = ty.non_null().array_element() else {
            return Err(ShapeError::incompatible(path, "$elemMatch | $slice", ty));
        };
        if d.is_empty() {
            return Err(ShapeError::invalid(path, "empty projection directive"));
        }
        for (key, v) in d {
            let at = join(path, key);
            match key.as_str() {
                "$elemMatch" => match v {
                    Bson::Document(inner) => check_operator_document(&env.deeper(&at)?, path, &elem, inner)?,
                    other => return Err(ShapeError::mismatch(&at, "element filter document", bson_kind(other))),
                },
                "$slice" => check_slice(&at, v)?,
                other => return Err(ShapeError::UnknownKey { path: path.to_string(), key: other.to_string() }),
            }
        }
        Ok(Entry::Include)
    }
}

fn flag_entry(path: &str, value: &Bson) -> Result<Entry, ShapeError> {
    match value {
        Bson::Boolean(true) => Ok(Entry::Include),
        Bson::Boolean(false) => Ok(Entry::Exclude),
        other => match as_integer(other) {
            Some(1) => Ok(Entry::Include),
            Some(0) => Ok(Entry::Exclude),
            _ => Err(ShapeError::mismatch(path, "0 | 1 | true | false", bson_kind(other))),
        },
    }
}

/// `n` or `[skip, limit]` with a positive limit.
fn check_slice(at: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::Array(pair) if pair.len() == 2 => match (as_integer(&pair[0]), as_integer(&pair[1])) {
            (Some(_), Some(limit)) if limit > 0 => Ok(()),
            _ => Err(ShapeError::invalid(at, "expected [skip, positive limit]")),
        },
        other if as_integer(other).is_some() => Ok(()),
        other => Err(ShapeError::mismatch(at, "integer | [integer, integer]", bson_kind(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::doc;

    fn ctx() -> SchemaContext {
        SchemaContext::document(&SchemaType::record([
            Field::new("a", SchemaType::Number),
            Field::new("b", SchemaType::String),
            Field::new("scores", SchemaType::array(SchemaType::Number)),
        ]))
        .unwrap()
    }

    #[test]
    fn id_exclusion_is_allowed_with_inclusions() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let p = ProjectionChecker::new(&ctx, &cfg);
        assert!(p.check(&doc! { "_id": 0, "a": 1, "b": true }).is_ok());
        assert!(p.check(&doc! { "_id": 0, "a": 0 }).is_ok());
        assert!(matches!(p.check(&doc! { "a": 1, "b": 0 }), Err(ShapeError::MixedProjection { .. })));
    }

    #[test]
    fn directives_only_join_inclusions() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let p = ProjectionChecker::new(&ctx, &cfg);
        assert!(p.check(&doc! { "a": 1, "scores": { "$elemMatch": { "$gt": 3 } } }).is_ok());
        assert!(p.check(&doc! { "_id": 0, "scores": { "$slice": [1, 2] } }).is_ok());
        assert!(matches!(
            p.check(&doc! { "a": 0, "scores": { "$elemMatch": { "$gt": 3 } } }),
            Err(ShapeError::MixedProjection { .. })
        ));
        assert!(matches!(
            p.check(&doc! { "scores": { "$slice": 2 }, "b": false }),
            Err(ShapeError::MixedProjection { .. })
        ));
        assert!(p.check(&doc! { "scores": { "$slice": [1, 0] } }).is_err());
        assert!(p.check(&doc! { "a": { "$slice": 1 } }).is_err());
    }

    #[test]
    fn positional_projection() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let p = ProjectionChecker::new(&ctx, &cfg);
        assert!(p.check(&doc! { "scores.$": 1 }).is_ok());
        assert!(p.check(&doc! { "scores.$": 0 }).is_err());
        assert!(matches!(p.check(&doc! { "scores.0": 1 }), Err(ShapeError::UnknownPath { .. })));
    }
}
