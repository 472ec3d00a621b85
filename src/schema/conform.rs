use bson::{Bson, Document};

use super::classify::{as_f64, is_number};
use super::types::SchemaType;

/// How strictly a value must match a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conformance {
    /// Required fields must be present.
    Exact,
    /// Every field, at every depth, may be omitted.
    Partial,
}

/// Where and why a value failed to conform. `path` is relative to the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl Mismatch {
    fn new(expected: &SchemaType, found: &Bson) -> Self {
        Self { path: String::new(), expected: expected.to_string(), found: bson_kind(found).to_string() }
    }

    fn nested(mut self, key: &str) -> Self {
        self.path = if self.path.is_empty() { key.to_string() } else { format!("{key}.{}", self.path) };
        self
    }

    /// The mismatch path prefixed with the path of the checked value.
    pub fn full_path(&self, base: &str) -> String {
        match (base.is_empty(), self.path.is_empty()) {
            (_, true) => base.to_string(),
            (true, false) => self.path.clone(),
            (false, false) => format!("{base}.{}", self.path),
        }
    }
}

/// Checks that `value` is an instance of `ty`.
///
/// # Errors
/// Returns the first mismatch found, depth first.
pub fn conforms(ty: &SchemaType, value: &Bson, mode: Conformance) -> Result<(), Mismatch> {
    match ty {
        SchemaType::Any => Ok(()),
        SchemaType::Union { variants } => {
            let mut first = None;
            for v in variants {
                match conforms(v, value, mode) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        // Prefer the failure that got furthest into the value.
                        if first.as_ref().is_none_or(|f: &Mismatch| f.path.len() < e.path.len()) {
                            first = Some(e);
                        }
                    }
                }
            }
            match first {
                Some(e) if !e.path.is_empty() => Err(e),
                _ => Err(Mismatch::new(ty, value)),
            }
        }
        SchemaType::Array { items } => match value {
            Bson::Array(values) => values.iter().enumerate().try_for_each(|(i, v)| {
                conforms(items, v, mode).map_err(|e| e.nested(&i.to_string()))
            }),
            other => Err(Mismatch::new(ty, other)),
        },
        SchemaType::Tuple { items } => match value {
            Bson::Array(values) if values.len() == items.len() => {
                items.iter().zip(values).enumerate().try_for_each(|(i, (t, v))| {
                    conforms(t, v, mode).map_err(|e| e.nested(&i.to_string()))
                })
            }
            other => Err(Mismatch::new(ty, other)),
        },
        SchemaType::Record { fields } => match value {
            Bson::Document(doc) => {
                for (key, v) in doc {
                    let Some(field) = fields.iter().find(|f| f.name == *key) else {
                        return Err(Mismatch {
                            path: key.clone(),
                            expected: "no such field".to_string(),
                            found: bson_kind(v).to_string(),
                        });
                    };
                    conforms(&field.ty, v, mode).map_err(|e| e.nested(key))?;
                }
                if mode == Conformance::Exact {
                    if let Some(missing) =
                        fields.iter().find(|f| f.required && !doc.contains_key(&f.name))
                    {
                        return Err(Mismatch {
                            path: missing.name.clone(),
                            expected: missing.ty.to_string(),
                            found: "nothing".to_string(),
                        });
                    }
                }
                Ok(())
            }
            other => Err(Mismatch::new(ty, other)),
        },
        SchemaType::Map { values } => match value {
            Bson::Document(doc) => doc
                .iter()
                .try_for_each(|(k, v)| conforms(values, v, mode).map_err(|e| e.nested(k))),
            other => Err(Mismatch::new(ty, other)),
        },
        leaf => {
            if leaf_matches(leaf, value) {
                Ok(())
            } else {
                Err(Mismatch::new(leaf, value))
            }
        }
    }
}

/// Document conformance where an `_id` absent from the schema is tolerated.
pub fn conforms_document(ty: &SchemaType, doc: &Document, mode: Conformance) -> Result<(), Mismatch> {
    if doc.contains_key("_id") && ty.field("_id").is_none() {
        let mut rest = doc.clone();
        rest.remove("_id");
        return conforms(ty, &Bson::Document(rest), mode);
    }
    conforms(ty, &Bson::Document(doc.clone()), mode)
}

fn leaf_matches(ty: &SchemaType, value: &Bson) -> bool {
    match ty {
        SchemaType::Null => matches!(value, Bson::Null | Bson::Undefined),
        SchemaType::String => matches!(value, Bson::String(_)),
        SchemaType::Number => is_number(value),
        SchemaType::Boolean => matches!(value, Bson::Boolean(_)),
        SchemaType::Date => matches!(value, Bson::DateTime(_)),
        SchemaType::Regex => matches!(value, Bson::RegularExpression(_)),
        SchemaType::Binary => matches!(value, Bson::Binary(_)),
        SchemaType::ObjectId => matches!(value, Bson::ObjectId(_)),
        SchemaType::Timestamp => matches!(value, Bson::Timestamp(_)),
        SchemaType::Decimal128 => matches!(value, Bson::Decimal128(_)),
        SchemaType::Branded { brand } => brand_of(value).is_some_and(|b| b == brand),
        SchemaType::Literal { value: lit } => literal_eq(lit, value),
        _ => false,
    }
}

/// Literals compare numerically across integer widths and doubles.
pub fn literal_eq(lit: &Bson, value: &Bson) -> bool {
    match (as_f64(lit), as_f64(value)) {
        (Some(a), Some(b)) => a == b,
        _ => lit == value,
    }
}

/// Brand name of BSON wrapper values.
pub fn brand_of(value: &Bson) -> Option<&'static str> {
    match value {
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => Some("Code"),
        Bson::Symbol(_) => Some("Symbol"),
        Bson::MinKey => Some("MinKey"),
        Bson::MaxKey => Some("MaxKey"),
        Bson::DbPointer(_) => Some("DBRef"),
        _ => None,
    }
}

/// Human name of a BSON value's type, as used in error messages.
pub fn bson_kind(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::{bson, doc};

    fn person() -> SchemaType {
        SchemaType::record([
            Field::new("name", SchemaType::String),
            Field::new("age", SchemaType::Number),
            Field::new(
                "address",
                SchemaType::record([
                    Field::new("city", SchemaType::String),
                    Field::new("zip", SchemaType::String),
                ]),
            ),
        ])
    }

    #[test]
    fn partial_accepts_missing_fields_at_every_depth() {
        let v = Bson::Document(doc! { "address": { "city": "Oslo" } });
        assert!(conforms(&person(), &v, Conformance::Partial).is_ok());
        let err = conforms(&person(), &v, Conformance::Exact).unwrap_err();
        assert_eq!(err.path, "name");
    }

    #[test]
    fn mismatch_reports_nested_path() {
        let v = Bson::Document(doc! { "address": { "zip": 1234 } });
        let err = conforms(&person(), &v, Conformance::Partial).unwrap_err();
        assert_eq!(err.path, "address.zip");
        assert_eq!(err.expected, "string");
        assert_eq!(err.found, "int");
        assert_eq!(err.full_path("doc"), "doc.address.zip");
    }

    #[test]
    fn extra_fields_are_rejected() {
        let v = Bson::Document(doc! { "nickname": "x" });
        assert_eq!(conforms(&person(), &v, Conformance::Partial).unwrap_err().path, "nickname");
    }

    #[test]
    fn numeric_literals_compare_across_widths() {
        let t = SchemaType::literal(1i32);
        assert!(conforms(&t, &bson!(1i64), Conformance::Exact).is_ok());
        assert!(conforms(&t, &bson!(1.0), Conformance::Exact).is_ok());
        assert!(conforms(&t, &bson!(2), Conformance::Exact).is_err());
    }

    #[test]
    fn tuples_check_length() {
        let t = SchemaType::legacy_coordinates();
        assert!(conforms(&t, &bson!([1.5, 2]), Conformance::Exact).is_ok());
        assert!(conforms(&t, &bson!([1.5]), Conformance::Exact).is_err());
    }
}
