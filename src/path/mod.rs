//! Dotted paths: flattening a schema into the paths it admits and resolving
//! a concrete path back to a type. Both walk the schema the same way, so a
//! path is in the flattened set exactly when it resolves.

mod flatten;
mod pathset;
mod resolve;
mod segment;

pub use flatten::{flatten_document_paths, flatten_paths};
pub use pathset::PathSet;
pub use resolve::{Resolution, resolve_document_type, resolve_type};
pub use segment::{FieldPath, IndexRepr, Segment, filtered_identifier};

/// Joins a base path and a key with `.`.
pub fn join(base: &str, key: &str) -> String {
    if base.is_empty() { key.to_string() } else { format!("{base}.{key}") }
}
