//! Query operator families and the per-field operator record.
//!
//! Each family owns a set of `$` keys and decides which field types it
//! applies to. The record for a field is the union of its applicable
//! families; a key that exists but does not apply is reported differently
//! from a key nobody owns.

mod array;
mod bitwise;
mod comparison;
mod element;
mod equality;
mod exclusive;
mod field;
mod geo;
mod string;

use bson::{Bson, Document};

use crate::config::ValidationConfig;
use crate::errors::ShapeError;
use crate::schema::SchemaType;

pub use exclusive::{ARRAY_MODIFIERS, OneOf};
pub use field::OperatorRecord;
pub(crate) use field::{check_field_value, check_operator_document};
pub(crate) use geo::{check_geometry, is_position};
pub(crate) use string::check_text_search;

/// Shared state threaded through a check.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    pub config: &'a ValidationConfig,
    pub depth: usize,
}

impl<'a> Env<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config, depth: 0 }
    }

    /// One level deeper, or `DepthExceeded` at `path`.
    pub fn deeper(&self, path: &str) -> Result<Env<'a>, ShapeError> {
        if self.depth >= self.config.max_depth {
            return Err(ShapeError::DepthExceeded {
                path: path.to_string(),
                limit: self.config.max_depth,
            });
        }
        Ok(Self { config: self.config, depth: self.depth + 1 })
    }

    pub(crate) fn check_set_size(&self, path: &str, len: usize) -> Result<(), ShapeError> {
        if len > self.config.max_in_set {
            return Err(ShapeError::LimitExceeded { path: path.to_string(), limit: self.config.max_in_set });
        }
        Ok(())
    }
}

/// The field an operator document is attached to.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    pub path: &'a str,
    /// The resolved type, possibly nullable.
    pub ty: &'a SchemaType,
}

pub trait OperatorFamily: Sync {
    fn name(&self) -> &'static str;

    fn keys(&self) -> &'static [&'static str];

    /// Whether the family's operators can be used on a field of type `ty`.
    fn applies(&self, ty: &SchemaType) -> bool;

    /// Checks the value of one owned operator key.
    fn check(&self, env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError>;

    /// Constraints between keys of the same operator document.
    fn check_document(&self, _field: FieldRef<'_>, _doc: &Document) -> Result<(), ShapeError> {
        Ok(())
    }

    fn owns(&self, op: &str) -> bool {
        self.keys().contains(&op)
    }
}

pub(crate) static FAMILIES: [&dyn OperatorFamily; 7] = [
    &equality::Equality,
    &comparison::Comparison,
    &element::Element,
    &string::StringOps,
    &array::ArrayOps,
    &bitwise::Bitwise,
    &geo::GeoSpatial,
];

/// Whether any family owns `op`.
pub fn is_known_operator(op: &str) -> bool {
    op == "$not" || FAMILIES.iter().any(|f| f.owns(op))
}
