//! Document conversion between a collection and its driver.
//!
//! A [`Converter`] rewrites what is written and what is read back; a
//! [`ConvertedDriver`] applies it around every call of the wrapped driver:
//!
//! | operation                         | hooks                                 |
//! |-----------------------------------|---------------------------------------|
//! | `insert_one`, `insert_many`       | `pre_insert`                          |
//! | `update_one`, `update_many`       | `pre_filter`, `pre_update`            |
//! | `replace_one`                     | `pre_filter`, `pre_replace`           |
//! | `delete_one`, `delete_many`       | `pre_filter`                          |
//! | `find`, `find_one`                | `pre_filter`, `post_find`             |
//! | `find_one_and_*`                  | as above, `post_find` on the value    |
//!
//! Every other operation is forwarded unchanged.

mod time;
mod validate;

pub use time::{CREATED_AT, Clock, FixedClock, SystemClock, TimestampConverter, UPDATED_AT, with_time};
pub use validate::ValidatingConverter;

use bson::{Bson, Document};

use crate::driver::{DeleteResult, DocStream, Driver, InsertManyResult, InsertOneResult, UpdateResult};
use crate::errors::Error;
use crate::query::{
    AggregateOptions, ChangeStreamOptions, CountOptions, FindOptions, IndexModel, ModifyOptions, ModifyResult,
    ReplaceOptions, UpdateOptions,
};

pub trait Converter: Send + Sync {
    fn pre_insert(&self, doc: Document) -> Result<Document, Error> {
        Ok(doc)
    }

    fn pre_update(&self, update: Document) -> Result<Document, Error> {
        Ok(update)
    }

    fn pre_replace(&self, replacement: Document) -> Result<Document, Error> {
        Ok(replacement)
    }

    fn post_find(&self, doc: Document) -> Result<Document, Error> {
        Ok(doc)
    }

    fn pre_filter(&self, filter: Document) -> Result<Document, Error> {
        Ok(filter)
    }
}

/// A driver whose traffic passes through a [`Converter`].
pub struct ConvertedDriver<D, C> {
    inner: D,
    converter: C,
}

impl<D: Driver, C: Converter> ConvertedDriver<D, C> {
    pub fn new(inner: D, converter: C) -> Self {
        Self { inner, converter }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    fn post_modify(&self, result: ModifyResult<Document>) -> Result<ModifyResult<Document>, Error> {
        Ok(ModifyResult { value: result.value.map(|d| self.converter.post_find(d)).transpose()? })
    }
}

impl<D: Driver, C: Converter> Driver for ConvertedDriver<D, C> {
    fn insert_one(&self, doc: Document) -> Result<InsertOneResult, Error> {
        self.inner.insert_one(self.converter.pre_insert(doc)?)
    }

    fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, Error> {
        let docs = docs.into_iter().map(|d| self.converter.pre_insert(d)).collect::<Result<Vec<_>, _>>()?;
        self.inner.insert_many(docs)
    }

    fn update_one(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        let filter = self.converter.pre_filter(filter)?;
        self.inner.update_one(filter, self.converter.pre_update(update)?, options)
    }

    fn update_many(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        let filter = self.converter.pre_filter(filter)?;
        self.inner.update_many(filter, self.converter.pre_update(update)?, options)
    }

    fn replace_one(&self, filter: Document, replacement: Document, options: ReplaceOptions) -> Result<UpdateResult, Error> {
        let filter = self.converter.pre_filter(filter)?;
        self.inner.replace_one(filter, self.converter.pre_replace(replacement)?, options)
    }

    fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.inner.delete_one(self.converter.pre_filter(filter)?)
    }

    fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.inner.delete_many(self.converter.pre_filter(filter)?)
    }

    fn find(&self, filter: Document, options: FindOptions) -> Result<DocStream<'_>, Error> {
        let raw = self.inner.find(self.converter.pre_filter(filter)?, options)?;
        Ok(Box::new(raw.map(move |doc| doc.and_then(|d| self.converter.post_find(d)))))
    }

    fn find_one(&self, filter: Document, options: FindOptions) -> Result<Option<Document>, Error> {
        let found = self.inner.find_one(self.converter.pre_filter(filter)?, options)?;
        found.map(|d| self.converter.post_find(d)).transpose()
    }

    fn find_one_and_delete(&self, filter: Document, options: ModifyOptions) -> Result<ModifyResult<Document>, Error> {
        let result = self.inner.find_one_and_delete(self.converter.pre_filter(filter)?, options)?;
        self.post_modify(result)
    }

    fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        let filter = self.converter.pre_filter(filter)?;
        let replacement = self.converter.pre_replace(replacement)?;
        let result = self.inner.find_one_and_replace(filter, replacement, options)?;
        self.post_modify(result)
    }

    fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        let filter = self.converter.pre_filter(filter)?;
        let update = self.converter.pre_update(update)?;
        let result = self.inner.find_one_and_update(filter, update, options)?;
        self.post_modify(result)
    }

    fn count_documents(&self, filter: Document, options: CountOptions) -> Result<u64, Error> {
        self.inner.count_documents(filter, options)
    }

    fn estimated_document_count(&self) -> Result<u64, Error> {
        self.inner.estimated_document_count()
    }

    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error> {
        self.inner.distinct(key, filter)
    }

    fn create_index(&self, index: IndexModel) -> Result<String, Error> {
        self.inner.create_index(index)
    }

    fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>, Error> {
        self.inner.create_indexes(indexes)
    }

    fn drop_index(&self, name: &str) -> Result<(), Error> {
        self.inner.drop_index(name)
    }

    fn drop_indexes(&self) -> Result<(), Error> {
        self.inner.drop_indexes()
    }

    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error> {
        self.inner.list_indexes()
    }

    fn index_exists(&self, name: &str) -> Result<bool, Error> {
        self.inner.index_exists(name)
    }

    fn aggregate(&self, pipeline: Vec<Document>, options: AggregateOptions) -> Result<DocStream<'_>, Error> {
        self.inner.aggregate(pipeline, options)
    }

    fn watch(&self, pipeline: Vec<Document>, options: ChangeStreamOptions) -> Result<DocStream<'_>, Error> {
        self.inner.watch(pipeline, options)
    }

    fn rename(&self, new_name: &str) -> Result<(), Error> {
        self.inner.rename(new_name)
    }

    fn drop_collection(&self) -> Result<(), Error> {
        self.inner.drop_collection()
    }
}
