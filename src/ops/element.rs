use bson::Bson;

use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{SchemaType, as_integer, bson_kind};

/// BSON type aliases with their numeric codes.
pub const TYPE_ALIASES: &[(&str, i32)] = &[
    ("double", 1),
    ("string", 2),
    ("object", 3),
    ("array", 4),
    ("binData", 5),
    ("undefined", 6),
    ("objectId", 7),
    ("bool", 8),
    ("date", 9),
    ("null", 10),
    ("regex", 11),
    ("dbPointer", 12),
    ("javascript", 13),
    ("symbol", 14),
    ("int", 16),
    ("timestamp", 17),
    ("long", 18),
    ("decimal", 19),
    ("minKey", -1),
    ("maxKey", 127),
];

/// `$exists` and `$type`, valid on any field.
pub(super) struct Element;

impl OperatorFamily for Element {
    fn name(&self) -> &'static str {
        "element"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$exists", "$type"]
    }

    fn applies(&self, _ty: &SchemaType) -> bool {
        true
    }

    fn check(&self, _env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let path = join(field.path, op);
        match op {
            "$exists" => match value {
                Bson::Boolean(_) => Ok(()),
                other => Err(ShapeError::mismatch(&path, "boolean", bson_kind(other))),
            },
            _ => match value {
                Bson::Array(items) if !items.is_empty() => {
                    items.iter().try_for_each(|t| check_type_spec(&path, t))
                }
                Bson::Array(_) => Err(ShapeError::invalid(&path, "empty type list")),
                single => check_type_spec(&path, single),
            },
        }
    }
}

fn check_type_spec(path: &str, value: &Bson) -> Result<(), ShapeError> {
    match value {
        Bson::String(s) if s == "number" || TYPE_ALIASES.iter().any(|(a, _)| a == s) => Ok(()),
        Bson::String(s) => Err(ShapeError::invalid(path, format!("unknown type alias {s:?}"))),
        other => match as_integer(other) {
            Some(code) if TYPE_ALIASES.iter().any(|(_, c)| i64::from(*c) == code) => Ok(()),
            Some(code) => Err(ShapeError::invalid(path, format!("unknown type code {code}"))),
            None => Err(ShapeError::mismatch(path, "type alias or code", bson_kind(other))),
        },
    }
}
