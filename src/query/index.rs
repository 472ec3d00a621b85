use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use super::filter::FilterChecker;
use crate::config::ValidationConfig;
use crate::errors::ShapeError;
use crate::path::IndexRepr;
use crate::schema::{SchemaContext, SchemaType, as_integer, bson_kind};
use crate::telemetry::{self, CheckKind};

/// Options of a secondary index. Field names follow the server's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sparse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexModel {
    pub keys: Document,
    #[serde(default)]
    pub options: IndexOptions,
}

impl IndexModel {
    pub fn new(keys: Document) -> Self {
        Self { keys, options: IndexOptions::default() }
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// The explicit name, or the server's default `field_dir_field_dir` form.
    pub fn name(&self) -> String {
        if let Some(n) = &self.options.name {
            return n.clone();
        }
        self.keys
            .iter()
            .map(|(k, v)| match v {
                Bson::String(s) => format!("{k}_{s}"),
                other => format!("{k}_{}", as_integer(other).unwrap_or(1)),
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Checks index key specifications and partial filter expressions.
pub struct IndexChecker<'s> {
    ctx: &'s SchemaContext,
    config: &'s ValidationConfig,
}

impl<'s> IndexChecker<'s> {
    pub fn new(ctx: &'s SchemaContext, config: &'s ValidationConfig) -> Self {
        Self { ctx, config }
    }

    /// # Errors
    /// Unknown key paths, invalid index kinds, kinds that do not fit the
    /// field type, and invalid partial filters.
    pub fn check(&self, model: &IndexModel) -> Result<(), ShapeError> {
        let result = self.check_model(model);
        telemetry::record(CheckKind::Index, &result);
        result
    }

    fn check_model(&self, model: &IndexModel) -> Result<(), ShapeError> {
        if model.keys.is_empty() {
            return Err(ShapeError::invalid("", "index has no keys"));
        }
        for (path, kind) in &model.keys {
            if path == "$**" || path.ends_with(".$**") {
                let prefix = path.trim_end_matches("$**").trim_end_matches('.');
                if !prefix.is_empty() && self.ctx.lookup(prefix, IndexRepr::Omitted).is_none() {
                    return Err(ShapeError::unknown_path(prefix));
                }
                continue;
            }
            let ty = self.ctx.lookup(path, IndexRepr::Omitted).ok_or_else(|| ShapeError::unknown_path(path))?;
            check_kind(path, &ty, kind)?;
        }
        if let Some(partial) = &model.options.partial_filter_expression {
            FilterChecker::new(self.ctx, self.config).check_at(&crate::ops::Env::new(self.config), partial)?;
        }
        Ok(())
    }
}

fn check_kind(path: &str, ty: &SchemaType, kind: &Bson) -> Result<(), ShapeError> {
    let base = ty.non_null();
    let elem = base.array_element().unwrap_or_else(|| base.clone());
    match kind {
        Bson::String(s) => match s.as_str() {
            "text" if base.is_stringish() || elem.is_stringish() => Ok(()),
            "2d" if base.geo_shape().is_some_and(|g| g.is_legacy()) => Ok(()),
            "2dsphere" if base.geo_shape().is_some() || elem.geo_shape().is_some() => Ok(()),
            "hashed" if !base.is_array() => Ok(()),
            "text" | "2d" | "2dsphere" | "hashed" => Err(ShapeError::incompatible(path, s, ty)),
            other => Err(ShapeError::invalid(path, format!("unknown index kind {other:?}"))),
        },
        other => match as_integer(other) {
            Some(1 | -1) => Ok(()),
            _ => Err(ShapeError::mismatch(path, "1 | -1 | \"text\" | \"2d\" | \"2dsphere\" | \"hashed\"", bson_kind(other))),
        },
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
            Field::new("loc", SchemaType::geo_point()),
            Field::new("n", SchemaType::Number),
        ]))
        .unwrap()
    }

    #[test]
    fn kinds_must_fit_fields() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let c = IndexChecker::new(&ctx, &cfg);
        assert!(c.check(&IndexModel::new(doc! { "title": "text", "n": -1 })).is_ok());
        assert!(c.check(&IndexModel::new(doc! { "loc": "2dsphere" })).is_ok());
        assert!(c.check(&IndexModel::new(doc! { "n": "text" })).is_err());
        assert!(c.check(&IndexModel::new(doc! { "nope": 1 })).is_err());
    }

    #[test]
    fn default_names() {
        assert_eq!(IndexModel::new(doc! { "a": 1, "b": -1 }).name(), "a_1_b_-1");
        assert_eq!(IndexModel::new(doc! { "t": "text" }).name(), "t_text");
    }

    #[test]
    fn partial_filters_are_checked() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let model = IndexModel::new(doc! { "n": 1 }).with_options(IndexOptions {
            partial_filter_expression: Some(doc! { "n": { "$gt": "x" } }),
            ..IndexOptions::default()
        });
        assert!(IndexChecker::new(&ctx, &cfg).check(&model).is_err());
    }
}
