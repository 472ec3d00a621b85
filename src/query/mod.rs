//! Checkers for the request documents sent with collection operations.

mod filter;
mod index;
mod options;
mod projection;
mod sort;
mod update;

pub use filter::FilterChecker;
pub use index::{IndexChecker, IndexModel, IndexOptions};
pub use options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, FindOptions, ModifyOptions, ModifyResult,
    ReplaceOptions, ReturnDocument, UpdateOptions,
};
pub use projection::ProjectionChecker;
pub use sort::{SortChecker, is_direction, sortable};
pub use update::UpdateChecker;
