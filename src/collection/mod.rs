//! Typed collections over a [`Driver`](crate::driver::Driver).

mod core;
mod cursor;
mod read;

pub use self::core::{Collection, TypedCollection};
pub use cursor::{TypedCursor, TypedStream};
pub use read::{ReadCollection, ReadOperations, ReadParts};

use bson::Document;
use serde::de::DeserializeOwned;

use crate::driver::Operation;
use crate::errors::Error;

/// Logged once every argument of `op` has passed its checks.
pub(crate) fn accepted(op: Operation) {
    log::debug!("{op}: request accepted");
}

pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, Error> {
    Ok(bson::deserialize_from_document(doc)?)
}
