use bson::Bson;

use super::field::check_operator_document;
use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{Conformance, SchemaType, as_integer, bson_kind, conforms};

/// `$size`, `$all` and `$elemMatch` on array fields.
pub(super) struct ArrayOps;

impl OperatorFamily for ArrayOps {
    fn name(&self) -> &'static str {
        "array"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$size", "$all", "$elemMatch"]
    }

    fn applies(&self, ty: &SchemaType) -> bool {
        ty.is_array()
    }

    fn check(&self, env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let path = join(field.path, op);
        let elem = field.ty.non_null().array_element().unwrap_or(SchemaType::Any);
        match op {
            "$size" => match as_integer(value) {
                Some(n) if n >= 0 => Ok(()),
                Some(n) => Err(ShapeError::invalid(&path, format!("negative size {n}"))),
                None => Err(ShapeError::mismatch(&path, "non-negative integer", bson_kind(value))),
            },
            "$all" => {
                let Bson::Array(items) = value else {
                    return Err(ShapeError::mismatch(&path, "array", bson_kind(value)));
                };
                env.check_set_size(&path, items.len())?;
                for item in items {
                    check_all_item(env, field.path, &path, &elem, item)?;
                }
                Ok(())
            }
            _ => match value {
                Bson::Document(doc) => check_operator_document(&env.deeper(&path)?, field.path, &elem, doc),
                other => Err(ShapeError::mismatch(&path, "element filter document", bson_kind(other))),
            },
        }
    }
}

fn check_all_item(env: &Env<'_>, field_path: &str, path: &str, elem: &SchemaType, item: &Bson) -> Result<(), ShapeError> {
    if let Bson::Document(doc) = item {
        if let Some(inner) = doc.get("$elemMatch") {
            if doc.len() != 1 || !elem.non_null().is_record_like() {
                return Err(ShapeError::invalid(path, "$elemMatch inside $all needs record elements and no siblings"));
            }
            let Bson::Document(inner) = inner else {
                return Err(ShapeError::mismatch(path, "element filter document", bson_kind(inner)));
            };
            return check_operator_document(&env.deeper(path)?, field_path, elem, inner);
        }
    }
    conforms(elem, item, Conformance::Partial)
        .map_err(|m| ShapeError::mismatch(&m.full_path(path), m.expected, m.found))
}
