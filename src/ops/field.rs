use bson::{Bson, Document};

use super::{Env, FAMILIES, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::{IndexRepr, PathSet, join, resolve_type};
use crate::schema::{Conformance, SchemaType, bson_kind, conforms};

/// The operator families applicable to one field type.
pub struct OperatorRecord<'t> {
    ty: &'t SchemaType,
    families: Vec<&'static dyn OperatorFamily>,
}

impl<'t> OperatorRecord<'t> {
    pub fn for_type(ty: &'t SchemaType) -> Self {
        let base = ty.non_null();
        let families = FAMILIES.iter().copied().filter(|f| f.applies(&base)).collect();
        Self { ty, families }
    }

    pub fn supports(&self, op: &str) -> bool {
        self.families.iter().any(|f| f.owns(op))
    }

    pub fn family_names(&self) -> Vec<&'static str> {
        self.families.iter().map(|f| f.name()).collect()
    }

    /// Operator keys usable on the field, in family order.
    pub fn operators(&self) -> Vec<&'static str> {
        self.families.iter().flat_map(|f| f.keys().iter().copied()).collect()
    }

    fn check_key(&self, env: &Env<'_>, path: &str, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let field = FieldRef { path, ty: self.ty };
        match self.families.iter().find(|f| f.owns(op)) {
            Some(family) => family.check(env, field, op, value),
            None if super::is_known_operator(op) => Err(ShapeError::incompatible(path, op, self.ty)),
            None => Err(ShapeError::UnknownOperator {
                path: path.to_string(),
                operator: op.to_string(),
            }),
        }
    }
}

/// Checks the value given for a filter path whose resolved type is `ty`.
///
/// Accepts an operator document, `{ $not: .. }`, a record sub-path
/// document, or a raw value conforming to the recursively partial type.
pub(crate) fn check_field_value(env: &Env<'_>, path: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    if matches!(ty, SchemaType::Any) {
        return Ok(());
    }
    if let Bson::Document(doc) = value {
        if doc.keys().any(|k| k.starts_with('$')) {
            return check_operator_or_negation(env, path, ty, doc);
        }
        if ty.non_null().is_record_like() {
            return check_operator_document(env, path, ty, doc);
        }
    }
    check_raw_value(path, ty, value)
}

fn check_operator_or_negation(env: &Env<'_>, path: &str, ty: &SchemaType, doc: &Document) -> Result<(), ShapeError> {
    let Some(inner) = doc.get("$not") else {
        return check_operator_document(env, path, ty, doc);
    };
    if doc.len() != 1 {
        let mut keys = vec!["$not".to_string()];
        keys.extend(doc.keys().filter(|k| *k != "$not").cloned());
        return Err(ShapeError::MutuallyExclusive { path: path.to_string(), keys });
    }
    match inner {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => {
            check_operator_document(&env.deeper(path)?, path, ty, d)
        }
        Bson::RegularExpression(_) if ty.non_null().is_stringish() => Ok(()),
        Bson::RegularExpression(_) => Err(ShapeError::incompatible(path, "$not", ty)),
        other => Err(ShapeError::mismatch(path, "operator document", bson_kind(other))),
    }
}

/// Checks a document of operators and, for record fields, relative sub-paths.
pub(crate) fn check_operator_document(
    env: &Env<'_>,
    path: &str,
    ty: &SchemaType,
    doc: &Document,
) -> Result<(), ShapeError> {
    let record = OperatorRecord::for_type(ty);
    let base = ty.non_null();
    let mut sub_paths: Option<PathSet> = None;
    for (key, value) in doc {
        if key == "$not" {
            return Err(ShapeError::MutuallyExclusive {
                path: path.to_string(),
                keys: doc.keys().cloned().collect(),
            });
        }
        if key.starts_with('$') {
            record.check_key(env, path, key, value)?;
            continue;
        }
        let sub = join(path, key);
        if matches!(base, SchemaType::Any) {
            continue;
        }
        if !base.is_record_like() {
            return Err(ShapeError::unknown_path(sub));
        }
        let paths = sub_paths.get_or_insert_with(|| PathSet::of(&base, IndexRepr::Numeric));
        if !paths.contains(key) {
            return Err(ShapeError::unknown_path(sub));
        }
        let Some(sub_ty) = resolve_type(&base, key, IndexRepr::Numeric).into_type() else {
            return Err(ShapeError::unknown_path(sub));
        };
        check_field_value(&env.deeper(&sub)?, &sub, &sub_ty, value)?;
    }
    let field = FieldRef { path, ty };
    for family in &record.families {
        if doc.keys().any(|k| family.owns(k)) {
            family.check_document(field, doc)?;
        }
    }
    Ok(())
}

/// A raw value is an implicit equality: the partial field type, or a
/// single element of an array field.
fn check_raw_value(path: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    let Err(mismatch) = conforms(ty, value, Conformance::Partial) else {
        return Ok(());
    };
    let base = ty.non_null();
    if let Some(elem) = base.array_element() {
        if conforms(&elem, value, Conformance::Partial).is_ok() {
            return Ok(());
        }
    }
    if mismatch.path.is_empty() {
        Err(ShapeError::mismatch(path, ty.to_string(), mismatch.found))
    } else {
        Err(ShapeError::mismatch(&mismatch.full_path(path), mismatch.expected, mismatch.found))
    }
}

/// Value operand of `$eq`-like operators: the exact field type, or an
/// element of an array field.
pub(crate) fn check_operand(path: &str, op: &str, ty: &SchemaType, value: &Bson) -> Result<(), ShapeError> {
    if conforms(ty, value, Conformance::Exact).is_ok() {
        return Ok(());
    }
    if let Some(elem) = ty.non_null().array_element() {
        if conforms(&elem, value, Conformance::Exact).is_ok() {
            return Ok(());
        }
    }
    Err(ShapeError::mismatch(&join(path, op), ty.to_string(), bson_kind(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn record_for_number_includes_comparison_and_bitwise() {
        let rec = OperatorRecord::for_type(&SchemaType::Number);
        assert!(rec.supports("$gt"));
        assert!(rec.supports("$bitsAllSet"));
        assert!(!rec.supports("$regex"));
        assert!(!rec.supports("$size"));
    }

    #[test]
    fn nullable_fields_use_their_base_families() {
        let ty = SchemaType::String.nullable();
        let rec = OperatorRecord::for_type(&ty);
        assert!(rec.supports("$regex"));
        assert!(rec.supports("$exists"));
    }

    #[test]
    fn records_only_get_generic_families() {
        let ty = SchemaType::record([Field::new("a", SchemaType::Number)]);
        assert_eq!(OperatorRecord::for_type(&ty).family_names(), vec!["equality", "element"]);
    }
}
