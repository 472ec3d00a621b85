use bson::Bson;

use super::field::check_operand;
use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::schema::SchemaType;

pub(super) struct Bitwise;

impl OperatorFamily for Bitwise {
    fn name(&self) -> &'static str {
        "bitwise"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$bitsAllClear", "$bitsAllSet", "$bitsAnyClear", "$bitsAnySet"]
    }

    fn applies(&self, ty: &SchemaType) -> bool {
        match ty {
            SchemaType::Number | SchemaType::Binary => true,
            SchemaType::Array { items } => matches!(**items, SchemaType::Number),
            _ => false,
        }
    }

    fn check(&self, _env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        check_operand(field.path, op, &field.ty.non_null(), value)
    }
}
