use bson::{Bson, Document};
use std::collections::BTreeMap;

use super::sort::{SortChecker, check_sort_value, is_direction};
use crate::config::{IndexMode, ValidationConfig};
use crate::errors::ShapeError;
use crate::ops::{ARRAY_MODIFIERS, Env, check_field_value};
use crate::path::{IndexRepr, PathSet, filtered_identifier, join, resolve_type};
use crate::schema::{Conformance, SchemaContext, SchemaType, as_integer, bson_kind, conforms, is_number};
use crate::telemetry::{self, CheckKind};


/// Which paths an update operator may touch, decided on the non-null type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Any,
    Numeric,
    Ordered,
    DateLike,
    Array,
}

impl Selection {
    fn admits(self, ty: &SchemaType) -> bool {
        let base = ty.non_null();
        if matches!(base, SchemaType::Any) {
            return true;
        }
        match self {
            Self::Any => true,
            Self::Numeric => base.is_numeric(),
            Self::Ordered => base.is_numeric() || base.is_date_like(),
            Self::DateLike => base.is_date_like(),
            Self::Array => base.is_array(),
        }
    }
}

/// Checks update documents against a document schema.
pub struct UpdateChecker<'s> {
    ctx: &'s SchemaContext,
    config: &'s ValidationConfig,
}

impl<'s> UpdateChecker<'s> {
    pub fn new(ctx: &'s SchemaContext, config: &'s ValidationConfig) -> Self {
        Self { ctx, config }
    }

    /// # Errors
    /// Rejects empty updates, non-operator keys and every operator entry
    /// whose path or value does not fit.
    pub fn check(&self, update: &Document) -> Result<(), ShapeError> {
        let result = self.check_update(update);
        telemetry::record(CheckKind::Update, &result);
        result
    }

    /// Checks an update together with the `arrayFilters` binding its
    /// `$[ident]` positions.
    ///
    /// # Errors
    /// As [`check`](Self::check); additionally every identifier must have
    /// exactly one filter and every filter must name a used identifier.
    pub fn check_with_array_filters(&self, update: &Document, filters: &[Document]) -> Result<(), ShapeError> {
        let result = self.check_update(update).and_then(|()| self.check_array_filters(update, filters));
        telemetry::record(CheckKind::Update, &result);
        result
    }

    fn check_update(&self, update: &Document) -> Result<(), ShapeError> {
        if update.is_empty() {
            return Err(ShapeError::invalid("", "update document is empty"));
        }
        let env = Env::new(self.config);
        for (op, payload) in update {
            if !op.starts_with('$') {
                return Err(ShapeError::invalid(
                    op,
                    "update documents contain only operators; use a replacement for whole documents",
                ));
            }
            let Bson::Document(fields) = payload else {
                return Err(ShapeError::mismatch(op, "document", bson_kind(payload)));
            };
            if fields.is_empty() {
                return Err(ShapeError::invalid(op, "operator has no fields"));
            }
            for (path, value) in fields {
                self.check_entry(&env, op, path, value)?;
            }
        }
        Ok(())
    }

    fn check_entry(&self, env: &Env<'_>, op: &str, path: &str, value: &Bson) -> Result<(), ShapeError> {
        let (selection, repr) = match op {
            "$set" | "$setOnInsert" | "$unset" | "$rename" => (Selection::Any, IndexRepr::Positional),
            "$inc" | "$mul" | "$bit" => (Selection::Numeric, IndexRepr::Positional),
            "$min" | "$max" => (Selection::Ordered, IndexRepr::Positional),
            "$currentDate" => (Selection::DateLike, IndexRepr::Positional),
            "$push" | "$addToSet" | "$pop" => (Selection::Array, IndexRepr::Positional),
            "$pull" | "$pullAll" => (Selection::Array, IndexRepr::Numeric),
            _ => {
                return Err(ShapeError::UnknownOperator { path: String::new(), operator: op.to_string() });
            }
        };
        if op == "$rename" {
            return self.check_rename(path, value);
        }
        let Some(ty) = self.ctx.lookup(path, repr) else {
            if self.config.index_mode == IndexMode::Tolerant {
                log::debug!("update path `{path}` not in schema; accepted unchecked");
                return Ok(());
            }
            return Err(ShapeError::unknown_path(path));
        };
        if !selection.admits(&ty) {
            return Err(ShapeError::incompatible(path, op, &ty));
        }
        let at = join(op, path);
        match op {
            "$set" | "$setOnInsert" => exact(&at, &ty, value),
            "$unset" => match value {
                Bson::String(s) if s.is_empty() => Ok(()),
                Bson::Boolean(true) => Ok(()),
                v if as_integer(v) == Some(1) => Ok(()),
                other => Err(ShapeError::mismatch(&at, "\"\" | true | 1", bson_kind(other))),
            },
            "$inc" | "$mul" => {
                if is_number(value) || matches!(value, Bson::Decimal128(_)) {
                    Ok(())
                } else {
                    Err(ShapeError::mismatch(&at, "number", bson_kind(value)))
                }
            }
            "$bit" => check_bit(&at, value),
            "$min" | "$max" => exact(&at, &ty.non_null(), value),
            "$currentDate" => check_current_date(&at, &ty, value),
            "$push" | "$addToSet" => self.check_push(env, op, &at, &ty, value),
            "$pop" => match as_integer(value) {
                Some(1 | -1) => Ok(()),
                _ => Err(ShapeError::mismatch(&at, "1 | -1", bson_kind(value))),
            },
            "$pull" => {
                let elem = element(&ty);
                check_field_value(env, path, &elem, value)
            }
            _ => {
                let Bson::Array(items) = value else {
                    return Err(ShapeError::mismatch(&at, "array", bson_kind(value)));
                };
                env.check_set_size(&at, items.len())?;
                let elem = element(&ty);
                items.iter().try_for_each(|item| exact(&at, &elem, item))
            }
        }
    }

    fn check_push(&self, env: &Env<'_>, op: &str, at: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
        let elem = element(ty);
        let Bson::Document(doc) = value else {
            return exact(at, &elem, value);
        };
        if !doc.keys().any(|k| k.starts_with('$')) {
            return exact(at, &elem, value);
        }
        if op == "$addToSet" {
            ARRAY_MODIFIERS.select(at, doc)?;
        }
        let Some(each) = doc.get("$each") else {
            return Err(ShapeError::MissingKey { path: at.to_string(), key: "$each".into() });
        };
        for (key, v) in doc {
            let modifier_at = join(at, key);
            match key.as_str() {
                "$each" => {
                    let Bson::Array(items) = each else {
                        return Err(ShapeError::mismatch(&modifier_at, "array", bson_kind(each)));
                    };
                    env.check_set_size(&modifier_at, items.len())?;
                    items.iter().try_for_each(|item| exact(&modifier_at, &elem, item))?;
                }
                "$position" | "$slice" => {
                    if as_integer(v).is_none() {
                        return Err(ShapeError::mismatch(&modifier_at, "integer", bson_kind(v)));
                    }
                }
                "$sort" => self.check_push_sort(&modifier_at, &elem, v)?,
                other => {
                    return Err(ShapeError::UnknownKey { path: at.to_string(), key: other.to_string() });
                }
            }
        }
        Ok(())
    }

    fn check_push_sort(&self, at: &str, elem: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
        match value {
            Bson::Document(spec) if elem.non_null().is_record_like() => {
                let nested = SchemaContext::nested(&elem.non_null());
                SortChecker::new(&nested, self.config).check_quiet(spec)
            }
            v if is_direction(v) => check_sort_value(at, elem, &Bson::Int32(1)),
            other => Err(ShapeError::mismatch(at, "1 | -1 | sort document", bson_kind(other))),
        }
    }

    fn check_rename(&self, path: &str, value: &Bson) -> Result<(), ShapeError> {
        let at = join("$rename", path);
        let Bson::String(target) = value else {
            return Err(ShapeError::mismatch(&at, "string", bson_kind(value)));
        };
        let source = self.plain_path(path).ok_or_else(|| ShapeError::unknown_path(path))?;
        let dest = self.plain_path(target).ok_or_else(|| ShapeError::unknown_path(target.as_str()))?;
        let (s, d) = (source.non_null(), dest.non_null());
        if matches!(s, SchemaType::Any) || matches!(d, SchemaType::Any) || s == d {
            return Ok(());
        }
        Err(ShapeError::mismatch(&at, d.to_string(), s.to_string()))
    }

    /// Resolves a path that only crosses records.
    fn plain_path(&self, path: &str) -> Option<SchemaType> {
        let mut ty = self.ctx.schema().clone();
        for key in path.split('.') {
            let base = ty.non_null();
            ty = match &base {
                SchemaType::Any => return Some(SchemaType::Any),
                SchemaType::Record { .. } => {
                    let f = base.field(key)?;
                    if f.required { f.ty.clone() } else { f.ty.clone().nullable() }
                }
                SchemaType::Map { values } if !key.starts_with('$') => (**values).clone(),
                _ => return None,
            };
        }
        Some(ty)
    }

    fn check_array_filters(&self, update: &Document, filters: &[Document]) -> Result<(), ShapeError> {
        let bound = self.identifiers(update);
        let env = Env::new(self.config);
        let mut used: Vec<&str> = Vec::new();
        for (i, filter) in filters.iter().enumerate() {
            let at = format!("arrayFilters.{i}");
            for (key, value) in filter {
                let (ident, rest) = match key.split_once('.') {
                    Some((ident, rest)) => (ident, Some(rest)),
                    None => (key.as_str(), None),
                };
                let Some((name, elem)) = bound.get_key_value(ident) else {
                    return Err(ShapeError::UnknownKey { path: at, key: key.clone() });
                };
                if !used.contains(&name.as_str()) {
                    used.push(name);
                }
                match rest {
                    None => check_field_value(&env, key, elem, value)?,
                    Some(rest) => {
                        let base = elem.non_null();
                        if !PathSet::of(&base, IndexRepr::Numeric).contains(rest) {
                            return Err(ShapeError::unknown_path(key.as_str()));
                        }
                        let sub = resolve_type(&base, rest, IndexRepr::Numeric)
                            .into_type()
                            .ok_or_else(|| ShapeError::unknown_path(key.as_str()))?;
                        check_field_value(&env, key, &sub, value)?;
                    }
                }
            }
        }
        if let Some(missing) = bound.keys().find(|k| !used.contains(&k.as_str())) {
            return Err(ShapeError::MissingKey { path: "arrayFilters".into(), key: missing.clone() });
        }
        Ok(())
    }

    /// Element types bound to each `$[ident]` used by the update.
    fn identifiers(&self, update: &Document) -> BTreeMap<String, SchemaType> {
        let mut out: BTreeMap<String, SchemaType> = BTreeMap::new();
        let paths = update.values().filter_map(Bson::as_document).flat_map(|d| d.keys());
        for path in paths {
            let tokens: Vec<&str> = path.split('.').collect();
            for (i, token) in tokens.iter().enumerate() {
                let Some(ident) = filtered_identifier(token) else { continue };
                let prefix = tokens[..=i].join(".");
                let Some(elem) = resolve_type(self.ctx.schema(), &prefix, IndexRepr::Positional).into_type() else {
                    continue;
                };
                let merged = match out.remove(ident) {
                    Some(prev) => SchemaType::union([prev, elem]),
                    None => elem,
                };
                out.insert(ident.to_string(), merged);
            }
        }
        out
    }
}

fn element(ty: &SchemaType) -> SchemaType {
    ty.non_null().array_element().unwrap_or(SchemaType::Any)
}

fn exact(at: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    conforms(ty, value, Conformance::Exact).map_err(|m| {
        if m.path.is_empty() {
            ShapeError::mismatch(at, ty.to_string(), m.found)
        } else {
            ShapeError::mismatch(&m.full_path(at), m.expected, m.found)
        }
    })
}

fn check_current_date(at: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::Boolean(true) => Ok(()),
        Bson::Document(d) if d.len() == 1 => match d.get("$type") {
            Some(Bson::String(t)) if t == "date" || t == "timestamp" => {
                let wanted = if t == "date" { SchemaType::Date } else { SchemaType::Timestamp };
                let admits = match ty.non_null() {
                    SchemaType::Any => true,
                    SchemaType::Union { variants } => variants.contains(&wanted),
                    other => other == wanted,
                };
                if admits { Ok(()) } else { Err(ShapeError::mismatch(at, ty.to_string(), t.clone())) }
            }
            _ => Err(ShapeError::mismatch(at, "{ $type: \"date\" | \"timestamp\" }", "document")),
        },
        other => Err(ShapeError::mismatch(at, "true | { $type }", bson_kind(other))),
    }
}

fn check_bit(at: &str, value: &Bson) -> Result<(), ShapeError> {
    let Bson::Document(d) = value else {
        return Err(ShapeError::mismatch(at, "{ and | or | xor: integer }", bson_kind(value)));
    };
    if d.is_empty() {
        return Err(ShapeError::invalid(at, "needs one of and, or, xor"));
    }
    for (k, v) in d {
        if !matches!(k.as_str(), "and" | "or" | "xor") {
            return Err(ShapeError::UnknownKey { path: at.to_string(), key: k.clone() });
        }
        if !matches!(v, Bson::Int32(_) | Bson::Int64(_)) {
            return Err(ShapeError::mismatch(&join(at, k), "integer", bson_kind(v)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::doc;

    fn ctx() -> SchemaContext {
        SchemaContext::document(&SchemaType::record([
            Field::new("count", SchemaType::Number),
            Field::new("name", SchemaType::String),
            Field::new("tags", SchemaType::array(SchemaType::String)),
            Field::new("seen", SchemaType::Date),
        ]))
        .unwrap()
    }

    #[test]
    fn empty_and_non_operator_updates_are_rejected() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let u = UpdateChecker::new(&ctx, &cfg);
        assert!(u.check(&doc! {}).is_err());
        assert!(u.check(&doc! { "count": 1 }).is_err());
        assert!(matches!(u.check(&doc! { "$frob": { "count": 1 } }), Err(ShapeError::UnknownOperator { .. })));
    }

    #[test]
    fn current_date_targets_dates() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let u = UpdateChecker::new(&ctx, &cfg);
        assert!(u.check(&doc! { "$currentDate": { "seen": true } }).is_ok());
        assert!(u.check(&doc! { "$currentDate": { "seen": { "$type": "date" } } }).is_ok());
        assert!(u.check(&doc! { "$currentDate": { "seen": { "$type": "timestamp" } } }).is_err());
        assert!(matches!(
            u.check(&doc! { "$currentDate": { "count": true } }),
            Err(ShapeError::OperatorIncompatible { .. })
        ));
    }

    #[test]
    fn bit_updates_numbers() {
        let ctx = ctx();
        let cfg = ValidationConfig::default();
        let u = UpdateChecker::new(&ctx, &cfg);
        assert!(u.check(&doc! { "$bit": { "count": { "and": 5 } } }).is_ok());
        assert!(u.check(&doc! { "$bit": { "count": { "nand": 5 } } }).is_err());
    }
}
