//! Schema-aware request checking for document-database clients.
//!
//! A document type describes its schema through [`Schematic`]; a
//! [`TypedCollection`] checks every filter, update, projection, sort, index
//! and pipeline against that schema before handing it to a [`Driver`].
//! The checkers in [`query`] and [`pipeline`] can also be used on their own.

pub mod cli;
pub mod collection;
pub mod config;
pub mod converter;
pub mod driver;
pub mod errors;
pub mod logger;
pub mod middleware;
pub mod ops;
pub mod path;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod telemetry;

pub use collection::{Collection, ReadCollection, ReadOperations, TypedCollection, TypedCursor};
pub use config::{IndexMode, ValidationConfig};
pub use converter::{ConvertedDriver, Converter, TimestampConverter, ValidatingConverter};
pub use driver::{Driver, Operation};
pub use errors::{Error, SchemaError, ShapeError};
pub use middleware::{Handler, MiddlewareDriver};
pub use pipeline::{PipelineChecker, PipelineSchemas};
pub use query::{FilterChecker, IndexChecker, ProjectionChecker, SortChecker, UpdateChecker};
pub use schema::{Field, SchemaContext, SchemaType, Schematic};

// Generated by build.rs: the cargo features this crate was compiled with.
include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));
