use std::marker::PhantomData;

use bson::{Bson, Document};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{accepted, decode};
use super::read::{ReadCollection, ReadOperations, ReadParts};
use crate::config::ValidationConfig;
use crate::driver::{DeleteResult, DocStream, Driver, InsertManyResult, InsertOneResult, Operation, UpdateResult};
use crate::errors::Error;
use crate::pipeline::{PipelineChecker, PipelineSchemas};
use crate::query::{
    AggregateOptions, IndexChecker, IndexModel, ModifyOptions, ModifyResult, ReplaceOptions, UpdateChecker,
    UpdateOptions,
};
use crate::schema::{SchemaContext, Schematic};

/// A collection whose documents are written as `W` and read back as `R`.
///
/// Filters, sorts, projections, pipelines, index keys and distinct keys are
/// checked against `R`; updates against `W`.
pub struct TypedCollection<W, R, D> {
    driver: D,
    read: SchemaContext,
    write: SchemaContext,
    config: ValidationConfig,
    _types: PhantomData<fn(W) -> R>,
}

/// The common case: one type for reads and writes.
pub type Collection<T, D> = TypedCollection<T, T, D>;

impl<W: Schematic, R: Schematic, D: Driver> TypedCollection<W, R, D> {
    /// # Errors
    /// Returns [`Error::Schema`] when either schema is invalid.
    pub fn new(driver: D) -> Result<Self, Error> {
        Self::with_config(driver, ValidationConfig::default())
    }

    pub fn with_config(driver: D, config: ValidationConfig) -> Result<Self, Error> {
        Ok(Self {
            driver,
            read: SchemaContext::of::<R>()?,
            write: SchemaContext::of::<W>()?,
            config,
            _types: PhantomData,
        })
    }
}

impl<W, R, D: Driver> TypedCollection<W, R, D> {
    pub fn schema(&self) -> &SchemaContext {
        &self.read
    }

    pub fn write_schema(&self) -> &SchemaContext {
        &self.write
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The raw driver, with no checks applied.
    pub fn unchecked(&self) -> &D {
        &self.driver
    }

    pub fn read_only(self) -> ReadCollection<R, D> {
        ReadCollection::from_parts(self.driver, self.read, self.config)
    }

    fn parts(&self) -> ReadParts<'_, D> {
        ReadParts { driver: &self.driver, schema: &self.read, config: &self.config }
    }

    fn check_update(&self, update: &Document, array_filters: Option<&[Document]>) -> Result<(), Error> {
        // `$[ident]` without a matching filter is an error even when no
        // filters were given at all.
        UpdateChecker::new(&self.write, &self.config).check_with_array_filters(update, array_filters.unwrap_or(&[]))?;
        Ok(())
    }

    fn check_modify_options(&self, options: &ModifyOptions) -> Result<(), Error> {
        let parts = self.parts();
        if let Some(sort) = &options.sort {
            parts.check_sort(sort)?;
        }
        if let Some(projection) = &options.projection {
            parts.check_projection(projection)?;
        }
        Ok(())
    }

    pub fn update_one(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        self.parts().check_filter(&filter)?;
        self.check_update(&update, options.array_filters.as_deref())?;
        accepted(Operation::UpdateOne);
        self.driver.update_one(filter, update, options)
    }

    pub fn update_many(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        self.parts().check_filter(&filter)?;
        self.check_update(&update, options.array_filters.as_deref())?;
        accepted(Operation::UpdateMany);
        self.driver.update_many(filter, update, options)
    }

    pub fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.parts().check_filter(&filter)?;
        accepted(Operation::DeleteOne);
        self.driver.delete_one(filter)
    }

    pub fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.parts().check_filter(&filter)?;
        accepted(Operation::DeleteMany);
        self.driver.delete_many(filter)
    }

    pub fn create_index(&self, index: IndexModel) -> Result<String, Error> {
        IndexChecker::new(&self.read, &self.config).check(&index)?;
        accepted(Operation::CreateIndex);
        self.driver.create_index(index)
    }

    pub fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>, Error> {
        let checker = IndexChecker::new(&self.read, &self.config);
        for index in &indexes {
            checker.check(index)?;
        }
        accepted(Operation::CreateIndexes);
        self.driver.create_indexes(indexes)
    }

    pub fn drop_index(&self, name: &str) -> Result<(), Error> {
        self.driver.drop_index(name)
    }

    pub fn drop_indexes(&self) -> Result<(), Error> {
        self.driver.drop_indexes()
    }

    /// Runs `pipeline` over this collection; `$lookup` and `$unionWith`
    /// targets accept any path.
    pub fn aggregate(&self, pipeline: Vec<Document>, options: AggregateOptions) -> Result<DocStream<'_>, Error> {
        self.aggregate_with(pipeline, options, None, None)
    }

    /// Like [`Self::aggregate`] with schemas for the collections named by
    /// `$lookup` and `$unionWith`.
    pub fn aggregate_with(
        &self,
        pipeline: Vec<Document>,
        options: AggregateOptions,
        lookup: Option<&SchemaContext>,
        union_with: Option<&SchemaContext>,
    ) -> Result<DocStream<'_>, Error> {
        let mut schemas = PipelineSchemas::new(&self.read);
        if let Some(l) = lookup {
            schemas = schemas.with_lookup(l);
        }
        if let Some(u) = union_with {
            schemas = schemas.with_union_with(u);
        }
        PipelineChecker::new(schemas, &self.config).check(&pipeline)?;
        accepted(Operation::Aggregate);
        self.driver.aggregate(pipeline, options)
    }

    pub fn rename(&self, new_name: &str) -> Result<(), Error> {
        self.driver.rename(new_name)
    }

    pub fn drop_collection(&self) -> Result<(), Error> {
        self.driver.drop_collection()
    }
}

impl<W, R, D> TypedCollection<W, R, D>
where
    W: Serialize,
    D: Driver,
{
    pub fn insert_one(&self, doc: &W) -> Result<InsertOneResult, Error> {
        self.driver.insert_one(encode(doc)?)
    }

    pub fn insert_many(&self, docs: &[W]) -> Result<InsertManyResult, Error> {
        let docs = docs.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
        self.driver.insert_many(docs)
    }

    pub fn replace_one(&self, filter: Document, replacement: &W, options: ReplaceOptions) -> Result<UpdateResult, Error> {
        self.parts().check_filter(&filter)?;
        accepted(Operation::ReplaceOne);
        self.driver.replace_one(filter, encode(replacement)?, options)
    }
}

impl<W, R, D> TypedCollection<W, R, D>
where
    W: Serialize,
    R: DeserializeOwned,
    D: Driver,
{
    pub fn find_one_and_delete(&self, filter: Document, options: ModifyOptions) -> Result<ModifyResult<R>, Error> {
        self.parts().check_filter(&filter)?;
        self.check_modify_options(&options)?;
        accepted(Operation::FindOneAndDelete);
        decode_modify(self.driver.find_one_and_delete(filter, options)?)
    }

    pub fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: &W,
        options: ModifyOptions,
    ) -> Result<ModifyResult<R>, Error> {
        self.parts().check_filter(&filter)?;
        self.check_modify_options(&options)?;
        accepted(Operation::FindOneAndReplace);
        decode_modify(self.driver.find_one_and_replace(filter, encode(replacement)?, options)?)
    }

    pub fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<R>, Error> {
        self.parts().check_filter(&filter)?;
        self.check_modify_options(&options)?;
        self.check_update(&update, options.array_filters.as_deref())?;
        accepted(Operation::FindOneAndUpdate);
        decode_modify(self.driver.find_one_and_update(filter, update, options)?)
    }
}

impl<W, R, D> ReadOperations for TypedCollection<W, R, D>
where
    R: DeserializeOwned + Send + 'static,
    D: Driver,
{
    type Item = R;
    type Driver = D;

    fn read_parts(&self) -> ReadParts<'_, D> {
        self.parts()
    }
}

/// Serializes a written document. An `_id` of `null` is left for the
/// database to assign.
fn encode<W: Serialize>(doc: &W) -> Result<Document, Error> {
    let mut out = bson::serialize_to_document(doc)?;
    if matches!(out.get("_id"), Some(Bson::Null)) {
        out.remove("_id");
    }
    Ok(out)
}

fn decode_modify<R: DeserializeOwned>(result: ModifyResult<Document>) -> Result<ModifyResult<R>, Error> {
    Ok(ModifyResult { value: result.value.map(decode).transpose()? })
}
