use bson::Bson;

use super::field::check_operand;
use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{SchemaType, bson_kind};

pub(super) struct Equality;

impl OperatorFamily for Equality {
    fn name(&self) -> &'static str {
        "equality"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$eq", "$ne", "$in", "$nin"]
    }

    fn applies(&self, _ty: &SchemaType) -> bool {
        true
    }

    fn check(&self, env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        match op {
            "$eq" | "$ne" => check_operand(field.path, op, field.ty, value),
            _ => {
                let Bson::Array(items) = value else {
                    return Err(ShapeError::mismatch(&join(field.path, op), "array", bson_kind(value)));
                };
                env.check_set_size(&join(field.path, op), items.len())?;
                let stringish = field.ty.non_null().is_stringish();
                items.iter().try_for_each(|item| match item {
                    Bson::RegularExpression(_) if stringish => Ok(()),
                    other => check_operand(field.path, op, field.ty, other),
                })
            }
        }
    }
}
