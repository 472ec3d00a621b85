use std::sync::{LazyLock, OnceLock};

use super::types::{Field, SchemaType};
use super::union::normalize;
use super::Schematic;
use crate::errors::SchemaError;
use crate::path::{IndexRepr, PathSet, Resolution, resolve_type};

/// A validated, normalized schema with its path sets computed on demand.
///
/// Checkers borrow a context; the flattened sets are built once per index
/// representation.
#[derive(Debug, Clone)]
pub struct SchemaContext {
    ty: SchemaType,
    numeric: OnceLock<PathSet>,
    positional: OnceLock<PathSet>,
    projection: OnceLock<PathSet>,
    omitted: OnceLock<PathSet>,
}

static ANY: LazyLock<SchemaContext> = LazyLock::new(|| SchemaContext::from_normalized(SchemaType::Any));

impl SchemaContext {
    /// A stored-document schema: checked against the field-name policy,
    /// unions merged, and `_id` added when the schema does not declare it.
    ///
    /// # Errors
    /// Returns [`SchemaError`] for invalid field names, duplicate fields or
    /// empty unions.
    pub fn document(ty: &SchemaType) -> Result<Self, SchemaError> {
        ty.validate()?;
        Ok(Self::from_normalized(with_id(normalize(ty))))
    }

    pub fn of<T: Schematic>() -> Result<Self, SchemaError> {
        Self::document(&T::schema())
    }

    /// A schema for a value nested inside a document (no implicit `_id`).
    pub fn nested(ty: &SchemaType) -> Self {
        Self::from_normalized(normalize(ty))
    }

    /// Accepts every path with type `Any`.
    pub fn any() -> &'static SchemaContext {
        &ANY
    }

    fn from_normalized(ty: SchemaType) -> Self {
        Self {
            ty,
            numeric: OnceLock::new(),
            positional: OnceLock::new(),
            projection: OnceLock::new(),
            omitted: OnceLock::new(),
        }
    }

    pub fn schema(&self) -> &SchemaType {
        &self.ty
    }

    pub fn paths(&self, repr: IndexRepr) -> &PathSet {
        let cell = match repr {
            IndexRepr::Numeric => &self.numeric,
            IndexRepr::Positional => &self.positional,
            IndexRepr::Projection => &self.projection,
            IndexRepr::Omitted => &self.omitted,
        };
        cell.get_or_init(|| PathSet::of(&self.ty, repr))
    }

    /// Resolves `path` if it is one of the schema's flattened paths.
    pub fn lookup(&self, path: &str, repr: IndexRepr) -> Option<SchemaType> {
        if !self.paths(repr).contains(path) {
            return None;
        }
        match resolve_type(&self.ty, path, repr) {
            Resolution::Type(t) => Some(t),
            Resolution::NoMatch => None,
        }
    }
}

fn with_id(ty: SchemaType) -> SchemaType {
    match ty {
        SchemaType::Record { mut fields } => {
            if !fields.iter().any(|f| f.name == "_id") {
                fields.insert(0, Field::new("_id", SchemaType::ObjectId));
            }
            SchemaType::Record { fields }
        }
        SchemaType::Union { variants } => SchemaType::union(variants.into_iter().map(with_id)),
        other => other,
    }
}
