use bson::{Bson, Document};

use crate::config::{IndexMode, ValidationConfig};
use crate::errors::ShapeError;
use crate::ops::{Env, check_field_value, check_text_search};
use crate::path::IndexRepr;
use crate::schema::{SchemaContext, bson_kind};
use crate::telemetry::{self, CheckKind};

const LOGICAL: &[&str] = &["$and", "$or", "$nor"];

/// Checks query filters against a document schema.
pub struct FilterChecker<'s> {
    ctx: &'s SchemaContext,
    config: &'s ValidationConfig,
}

impl<'s> FilterChecker<'s> {
    pub fn new(ctx: &'s SchemaContext, config: &'s ValidationConfig) -> Self {
        Self { ctx, config }
    }

    /// # Errors
    /// Returns the first entry of `filter` that does not fit the schema.
    pub fn check(&self, filter: &Document) -> Result<(), ShapeError> {
        let result = self.check_at(&Env::new(self.config), filter);
        telemetry::record(CheckKind::Filter, &result);
        result
    }

    pub(crate) fn check_at(&self, env: &Env<'_>, filter: &Document) -> Result<(), ShapeError> {
        for (key, value) in filter {
            match key.as_str() {
                k if LOGICAL.contains(&k) => self.check_logical(env, k, value)?,
                "$text" => check_text_search("$text", value)?,
                "$comment" => {
                    if !matches!(value, Bson::String(_)) {
                        return Err(ShapeError::mismatch("$comment", "string", bson_kind(value)));
                    }
                }
                k if k.starts_with('$') => {
                    return Err(ShapeError::UnknownOperator { path: String::new(), operator: k.to_string() });
                }
                path => match self.ctx.lookup(path, IndexRepr::Numeric) {
                    Some(ty) => check_field_value(env, path, &ty, value)?,
                    None if self.config.index_mode == IndexMode::Tolerant => {
                        log::debug!("filter path `{path}` not in schema; accepted unchecked");
                    }
                    None => return Err(ShapeError::unknown_path(path)),
                },
            }
        }
        Ok(())
    }

    fn check_logical(&self, env: &Env<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let Bson::Array(clauses) = value else {
            return Err(ShapeError::mismatch(op, "array of filters", bson_kind(value)));
        };
        if clauses.is_empty() {
            return Err(ShapeError::invalid(op, "needs at least one clause"));
        }
        let inner = env.deeper(op)?;
        for (i, clause) in clauses.iter().enumerate() {
            match clause {
                Bson::Document(d) => self.check_at(&inner, d)?,
                other => {
                    return Err(ShapeError::mismatch(&format!("{op}.{i}"), "filter document", bson_kind(other)));
                }
            }
        }
        Ok(())
    }
}
