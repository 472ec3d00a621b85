use std::marker::PhantomData;

use bson::{Bson, Document};
use serde::de::DeserializeOwned;

use super::cursor::TypedCursor;
use super::{accepted, decode};
use crate::config::ValidationConfig;
use crate::driver::{DocStream, Driver, Operation};
use crate::errors::{Error, ShapeError};
use crate::path::IndexRepr;
use crate::pipeline::check_change_stream_options;
use crate::query::{ChangeStreamOptions, CountOptions, FilterChecker, FindOptions, IndexModel, ProjectionChecker, SortChecker};
use crate::schema::{Conformance, SchemaContext, Schematic, SchemaType, bson_kind, conforms};

/// What the read operations need from a collection.
pub struct ReadParts<'a, D> {
    pub driver: &'a D,
    pub schema: &'a SchemaContext,
    pub config: &'a ValidationConfig,
}

impl<D> ReadParts<'_, D> {
    pub(crate) fn check_filter(&self, filter: &Document) -> Result<(), Error> {
        FilterChecker::new(self.schema, self.config).check(filter)?;
        Ok(())
    }

    pub(crate) fn check_sort(&self, sort: &Document) -> Result<(), Error> {
        SortChecker::new(self.schema, self.config).check(sort)?;
        Ok(())
    }

    pub(crate) fn check_projection(&self, projection: &Document) -> Result<(), Error> {
        ProjectionChecker::new(self.schema, self.config).check(projection)?;
        Ok(())
    }

    pub(crate) fn check_find_options(&self, options: &FindOptions) -> Result<(), Error> {
        if let Some(sort) = &options.sort {
            self.check_sort(sort)?;
        }
        if let Some(projection) = &options.projection {
            self.check_projection(projection)?;
        }
        Ok(())
    }

    fn key_type(&self, key: &str) -> Result<SchemaType, Error> {
        self.schema
            .lookup(key, IndexRepr::Numeric)
            .ok_or_else(|| Error::Shape(ShapeError::unknown_path(key)))
    }
}

/// The read half of a collection. Every method checks its arguments
/// against the read schema before the driver is called.
pub trait ReadOperations {
    type Item: DeserializeOwned + Send + 'static;
    type Driver: Driver;

    fn read_parts(&self) -> ReadParts<'_, Self::Driver>;

    /// A projected `find_one` decodes to [`Self::Item`]; use
    /// [`TypedCursor::project`] to read partial documents.
    fn find_one(&self, filter: Document, options: FindOptions) -> Result<Option<Self::Item>, Error> {
        let parts = self.read_parts();
        parts.check_filter(&filter)?;
        parts.check_find_options(&options)?;
        accepted(Operation::FindOne);
        parts.driver.find_one(filter, options)?.map(decode).transpose()
    }

    fn find(&self, filter: Document) -> Result<TypedCursor<'_, Self::Item, Self::Driver>, Error> {
        let parts = self.read_parts();
        parts.check_filter(&filter)?;
        Ok(TypedCursor::new(parts, filter))
    }

    fn count_documents(&self, filter: Document, options: CountOptions) -> Result<u64, Error> {
        let parts = self.read_parts();
        parts.check_filter(&filter)?;
        accepted(Operation::CountDocuments);
        parts.driver.count_documents(filter, options)
    }

    fn estimated_document_count(&self) -> Result<u64, Error> {
        self.read_parts().driver.estimated_document_count()
    }

    /// Distinct values of `key`. Each returned value must fit the key's type,
    /// or its element type when the key names an array.
    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error> {
        let parts = self.read_parts();
        let ty = parts.key_type(key)?;
        parts.check_filter(&filter)?;
        accepted(Operation::Distinct);
        let values = parts.driver.distinct(key, filter)?;
        let element = ty.non_null().array_element();
        for value in &values {
            let fits = conforms(&ty, value, Conformance::Partial).is_ok()
                || element.as_ref().is_some_and(|e| conforms(e, value, Conformance::Partial).is_ok());
            if !fits {
                let expected = element.as_ref().unwrap_or(&ty).to_string();
                return Err(ShapeError::mismatch(key, expected, bson_kind(value)).into());
            }
        }
        Ok(values)
    }

    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error> {
        self.read_parts().driver.list_indexes()
    }

    fn index_exists(&self, name: &str) -> Result<bool, Error> {
        self.read_parts().driver.index_exists(name)
    }

    /// Change events do not have the collection's shape, so only the
    /// options are checked here.
    fn watch(&self, pipeline: Vec<Document>, options: ChangeStreamOptions) -> Result<DocStream<'_>, Error> {
        check_change_stream_options(&options)?;
        accepted(Operation::Watch);
        self.read_parts().driver.watch(pipeline, options)
    }
}

/// A collection exposing only [`ReadOperations`].
pub struct ReadCollection<R, D> {
    driver: D,
    schema: SchemaContext,
    config: ValidationConfig,
    _item: PhantomData<fn() -> R>,
}

impl<R: Schematic, D: Driver> ReadCollection<R, D> {
    /// # Errors
    /// Returns [`Error::Schema`] when `R`'s schema is invalid.
    pub fn new(driver: D) -> Result<Self, Error> {
        Self::with_config(driver, ValidationConfig::default())
    }

    pub fn with_config(driver: D, config: ValidationConfig) -> Result<Self, Error> {
        Ok(Self::from_parts(driver, SchemaContext::of::<R>()?, config))
    }
}

impl<R, D> ReadCollection<R, D> {
    pub(crate) fn from_parts(driver: D, schema: SchemaContext, config: ValidationConfig) -> Self {
        Self { driver, schema, config, _item: PhantomData }
    }

    pub fn schema(&self) -> &SchemaContext {
        &self.schema
    }
}

impl<R, D> ReadOperations for ReadCollection<R, D>
where
    R: DeserializeOwned + Send + 'static,
    D: Driver,
{
    type Item = R;
    type Driver = D;

    fn read_parts(&self) -> ReadParts<'_, D> {
        ReadParts { driver: &self.driver, schema: &self.schema, config: &self.config }
    }
}
