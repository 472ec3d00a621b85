use bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SchemaError;

/// GeoJSON geometry names understood by the geospatial operators.
pub const GEOJSON_KINDS: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

/// The shape of a stored document, or of any value inside one.
///
/// Serialized with an internal `kind` tag so schemas can be written as JSON:
/// `{"kind":"record","fields":[{"name":"age","type":{"kind":"number"}}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaType {
    Any,
    Null,
    String,
    Number,
    Boolean,
    Date,
    Regex,
    Binary,
    ObjectId,
    Timestamp,
    Decimal128,
    /// A BSON wrapper value such as `Code`, `Symbol`, `MinKey` or `DbPointer`.
    Branded { brand: String },
    Literal { value: Bson },
    Array { items: Box<SchemaType> },
    Tuple { items: Vec<SchemaType> },
    Record { fields: Vec<Field> },
    /// A record with arbitrary keys.
    Map { values: Box<SchemaType> },
    Union { variants: Vec<SchemaType> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SchemaType,
    #[serde(default = "required_default")]
    pub required: bool,
}

fn required_default() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, ty: SchemaType) -> Self {
        Self { name: name.into(), ty, required: true }
    }

    pub fn optional(name: impl Into<String>, ty: SchemaType) -> Self {
        Self { name: name.into(), ty, required: false }
    }
}

impl SchemaType {
    pub fn array(items: SchemaType) -> Self {
        Self::Array { items: Box::new(items) }
    }

    pub fn tuple(items: impl IntoIterator<Item = SchemaType>) -> Self {
        Self::Tuple { items: items.into_iter().collect() }
    }

    pub fn map(values: SchemaType) -> Self {
        Self::Map { values: Box::new(values) }
    }

    pub fn literal(value: impl Into<Bson>) -> Self {
        Self::Literal { value: value.into() }
    }

    pub fn branded(brand: impl Into<String>) -> Self {
        Self::Branded { brand: brand.into() }
    }

    pub fn record(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::Record { fields: fields.into_iter().collect() }
    }

    /// Builds a union, flattening nested unions and dropping duplicates.
    /// A single remaining variant is returned as is.
    pub fn union(variants: impl IntoIterator<Item = SchemaType>) -> Self {
        let mut out: Vec<SchemaType> = Vec::new();
        for v in variants {
            match v {
                Self::Union { variants } => {
                    for inner in variants {
                        if !out.contains(&inner) {
                            out.push(inner);
                        }
                    }
                }
                other => {
                    if !out.contains(&other) {
                        out.push(other);
                    }
                }
            }
        }
        if out.len() == 1 {
            out.pop().unwrap_or(Self::Any)
        } else {
            Self::Union { variants: out }
        }
    }

    /// A union of records told apart by a string literal in `tag`.
    pub fn tagged_union<'a>(
        tag: &str,
        variants: impl IntoIterator<Item = (&'a str, Vec<Field>)>,
    ) -> Self {
        Self::union(variants.into_iter().map(|(name, mut fields)| {
            fields.insert(0, Field::new(tag, Self::literal(name)));
            Self::Record { fields }
        }))
    }

    pub fn nullable(self) -> Self {
        Self::union([self, Self::Null])
    }

    pub fn geo_point() -> Self {
        Self::geometry("Point", Self::position())
    }

    pub fn geo_multi_point() -> Self {
        Self::geometry("MultiPoint", Self::array(Self::position()))
    }

    pub fn geo_line_string() -> Self {
        Self::geometry("LineString", Self::array(Self::position()))
    }

    pub fn geo_multi_line_string() -> Self {
        Self::geometry("MultiLineString", Self::array(Self::array(Self::position())))
    }

    pub fn geo_polygon() -> Self {
        Self::geometry("Polygon", Self::array(Self::array(Self::position())))
    }

    pub fn geo_multi_polygon() -> Self {
        Self::geometry("MultiPolygon", Self::array(Self::array(Self::array(Self::position()))))
    }

    pub fn geo_geometry_collection() -> Self {
        let members = Self::union([
            Self::geo_point(),
            Self::geo_multi_point(),
            Self::geo_line_string(),
            Self::geo_multi_line_string(),
            Self::geo_polygon(),
            Self::geo_multi_polygon(),
        ]);
        Self::record([
            Field::new("type", Self::literal("GeometryCollection")),
            Field::new("geometries", Self::array(members)),
        ])
    }

    /// A `[longitude, latitude]` pair in the legacy layout.
    pub fn legacy_coordinates() -> Self {
        Self::tuple([Self::Number, Self::Number])
    }

    fn position() -> Self {
        Self::array(Self::Number)
    }

    fn geometry(kind: &str, coordinates: SchemaType) -> Self {
        Self::record([
            Field::new("type", Self::literal(kind)),
            Field::new("coordinates", coordinates),
        ])
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Record { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Checks the field-name policy and union sanity over the whole tree.
    ///
    /// # Errors
    /// Returns the first offending field with its enclosing path.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_at("")
    }

    fn validate_at(&self, path: &str) -> Result<(), SchemaError> {
        match self {
            Self::Record { fields } => {
                let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
                for f in fields {
                    check_field_name(path, &f.name)?;
                    if seen.contains(&f.name.as_str()) {
                        return Err(SchemaError::DuplicateField {
                            path: display_path(path),
                            name: f.name.clone(),
                        });
                    }
                    seen.push(&f.name);
                    f.ty.validate_at(&join(path, &f.name))?;
                }
                Ok(())
            }
            Self::Array { items } => items.validate_at(path),
            Self::Map { values } => values.validate_at(path),
            Self::Tuple { items } => items.iter().try_for_each(|t| t.validate_at(path)),
            Self::Union { variants } => {
                if variants.is_empty() {
                    return Err(SchemaError::EmptyUnion { path: display_path(path) });
                }
                variants.iter().try_for_each(|t| t.validate_at(path))
            }
            _ => Ok(()),
        }
    }
}

fn check_field_name(path: &str, name: &str) -> Result<(), SchemaError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.contains('.') {
        Some("contains '.'")
    } else if name.starts_with('$') {
        Some("starts with '$'")
    } else if name.bytes().all(|b| b.is_ascii_digit()) {
        Some("digit-only names collide with array indexes")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SchemaError::InvalidFieldName {
            path: display_path(path),
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() { key.to_string() } else { format!("{path}.{key}") }
}

fn display_path(path: &str) -> String {
    if path.is_empty() { "<root>".to_string() } else { path.to_string() }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Regex => f.write_str("regex"),
            Self::Binary => f.write_str("binary"),
            Self::ObjectId => f.write_str("objectId"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Decimal128 => f.write_str("decimal128"),
            Self::Branded { brand } => write!(f, "{brand}"),
            Self::Literal { value } => match value {
                Bson::String(s) => write!(f, "'{s}'"),
                other => write!(f, "{other}"),
            },
            Self::Array { items } => write!(f, "array<{items}>"),
            Self::Tuple { items } => {
                f.write_str("[")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str("]")
            }
            Self::Record { fields } => {
                f.write_str("{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let opt = if field.required { "" } else { "?" };
                    write!(f, "{}{opt}: {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            Self::Map { values } => write!(f, "map<{values}>"),
            Self::Union { variants } => {
                for (i, t) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
        }
    }
}
