//! Schema model: the shape of stored documents as a runtime value.

mod classify;
mod conform;
mod context;
mod schematic;
mod types;
mod union;

pub use classify::{GeoShape, Kind, classify};
pub use conform::{Conformance, Mismatch, bson_kind, brand_of, conforms, conforms_document, literal_eq};
pub use context::SchemaContext;
pub use schematic::Schematic;
pub use types::{Field, GEOJSON_KINDS, SchemaType};
pub use union::normalize;

pub(crate) use classify::{as_f64, as_integer, is_number};
