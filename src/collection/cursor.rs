use bson::Document;
use serde::de::DeserializeOwned;

use super::{accepted, decode};
use super::read::ReadParts;
use crate::driver::{Driver, Operation};
use crate::errors::Error;
use crate::query::FindOptions;

type Decoder<'a, T> = Box<dyn Fn(Document) -> Result<T, Error> + Send + Sync + 'a>;

/// Decoded results of a cursor.
pub type TypedStream<'a, T> = Box<dyn Iterator<Item = Result<T, Error>> + Send + 'a>;

/// A `find` that has been checked but not sent yet. Sorts and projections
/// are checked as they are added.
pub struct TypedCursor<'a, T, D> {
    parts: ReadParts<'a, D>,
    filter: Document,
    options: FindOptions,
    decode: Decoder<'a, T>,
}

impl<'a, T: DeserializeOwned + 'a, D: Driver> TypedCursor<'a, T, D> {
    pub(crate) fn new(parts: ReadParts<'a, D>, filter: Document) -> Self {
        Self { parts, filter, options: FindOptions::default(), decode: Box::new(decode::<T>) }
    }
}

impl<'a, T: 'a, D: Driver> TypedCursor<'a, T, D> {
    pub fn sort(mut self, sort: Document) -> Result<Self, Error> {
        self.parts.check_sort(&sort)?;
        self.options.sort = Some(sort);
        Ok(self)
    }

    /// Projected documents no longer have the collection's type; the
    /// cursor yields raw documents from here on.
    pub fn project(self, projection: Document) -> Result<TypedCursor<'a, Document, D>, Error> {
        self.parts.check_projection(&projection)?;
        let mut options = self.options;
        options.projection = Some(projection);
        Ok(TypedCursor { parts: self.parts, filter: self.filter, options, decode: Box::new(Ok) })
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }

    pub fn map<U: 'a, F>(self, f: F) -> TypedCursor<'a, U, D>
    where
        F: Fn(T) -> U + Send + Sync + 'a,
    {
        let inner = self.decode;
        TypedCursor {
            parts: self.parts,
            filter: self.filter,
            options: self.options,
            decode: Box::new(move |doc| inner(doc).map(&f)),
        }
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    pub fn execute(self) -> Result<TypedStream<'a, T>, Error> {
        let decode = self.decode;
        accepted(Operation::Find);
        let raw = self.parts.driver.find(self.filter, self.options)?;
        Ok(Box::new(raw.map(move |doc| doc.and_then(&decode))))
    }

    pub fn to_vec(self) -> Result<Vec<T>, Error> {
        self.execute()?.collect()
    }
}
