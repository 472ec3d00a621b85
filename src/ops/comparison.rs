use bson::Bson;

use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{Conformance, SchemaType, bson_kind, conforms};

/// `$gt`, `$gte`, `$lt`, `$lte` on numbers, dates and object ids.
pub(super) struct Comparison;

impl OperatorFamily for Comparison {
    fn name(&self) -> &'static str {
        "comparison"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$gt", "$gte", "$lt", "$lte"]
    }

    fn applies(&self, ty: &SchemaType) -> bool {
        !matches!(ty, SchemaType::Any | SchemaType::Null) && ty.is_orderable()
    }

    fn check(&self, _env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let base = field.ty.non_null();
        conforms(&base, value, Conformance::Exact)
            .map_err(|_| ShapeError::mismatch(&join(field.path, op), base.to_string(), bson_kind(value)))
    }
}
