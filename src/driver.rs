//! The driver capability a collection delegates to, and the result types it
//! reports. Drivers see raw BSON documents only; every typed check happens
//! in [`crate::collection`] before a call reaches this trait.

use std::sync::Arc;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::query::{
    AggregateOptions, ChangeStreamOptions, CountOptions, FindOptions, IndexModel, ModifyOptions, ModifyResult,
    ReplaceOptions, UpdateOptions,
};

/// A lazily produced sequence of documents (cursor, aggregation, change stream).
pub type DocStream<'a> = Box<dyn Iterator<Item = Result<Document, Error>> + Send + 'a>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Bson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Database client operations over a single collection.
/// Implementations must be Send + Sync to be shared across threads.
pub trait Driver: Send + Sync {
    fn insert_one(&self, doc: Document) -> Result<InsertOneResult, Error>;
    fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, Error>;
    fn update_one(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error>;
    fn update_many(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error>;
    fn replace_one(&self, filter: Document, replacement: Document, options: ReplaceOptions) -> Result<UpdateResult, Error>;
    fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error>;
    fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error>;

    fn find(&self, filter: Document, options: FindOptions) -> Result<DocStream<'_>, Error>;

    fn find_one(&self, filter: Document, options: FindOptions) -> Result<Option<Document>, Error> {
        let options = FindOptions { limit: Some(1), ..options };
        self.find(filter, options)?.next().transpose()
    }

    fn find_one_and_delete(&self, filter: Document, options: ModifyOptions) -> Result<ModifyResult<Document>, Error>;
    fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error>;
    fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error>;

    fn count_documents(&self, filter: Document, options: CountOptions) -> Result<u64, Error>;
    fn estimated_document_count(&self) -> Result<u64, Error>;
    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error>;

    /// Returns the name of the created index.
    fn create_index(&self, index: IndexModel) -> Result<String, Error>;

    fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>, Error> {
        indexes.into_iter().map(|i| self.create_index(i)).collect()
    }

    fn drop_index(&self, name: &str) -> Result<(), Error>;
    fn drop_indexes(&self) -> Result<(), Error>;
    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error>;

    fn index_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.list_indexes()?.iter().any(|i| i.name() == name))
    }

    fn aggregate(&self, pipeline: Vec<Document>, options: AggregateOptions) -> Result<DocStream<'_>, Error>;
    fn watch(&self, pipeline: Vec<Document>, options: ChangeStreamOptions) -> Result<DocStream<'_>, Error>;

    fn rename(&self, new_name: &str) -> Result<(), Error>;
    fn drop_collection(&self) -> Result<(), Error>;
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn insert_one(&self, doc: Document) -> Result<InsertOneResult, Error> {
        (**self).insert_one(doc)
    }
    fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, Error> {
        (**self).insert_many(docs)
    }
    fn update_one(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        (**self).update_one(filter, update, options)
    }
    fn update_many(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        (**self).update_many(filter, update, options)
    }
    fn replace_one(&self, filter: Document, replacement: Document, options: ReplaceOptions) -> Result<UpdateResult, Error> {
        (**self).replace_one(filter, replacement, options)
    }
    fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error> {
        (**self).delete_one(filter)
    }
    fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        (**self).delete_many(filter)
    }
    fn find(&self, filter: Document, options: FindOptions) -> Result<DocStream<'_>, Error> {
        (**self).find(filter, options)
    }
    fn find_one(&self, filter: Document, options: FindOptions) -> Result<Option<Document>, Error> {
        (**self).find_one(filter, options)
    }
    fn find_one_and_delete(&self, filter: Document, options: ModifyOptions) -> Result<ModifyResult<Document>, Error> {
        (**self).find_one_and_delete(filter, options)
    }
    fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        (**self).find_one_and_replace(filter, replacement, options)
    }
    fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        (**self).find_one_and_update(filter, update, options)
    }
    fn count_documents(&self, filter: Document, options: CountOptions) -> Result<u64, Error> {
        (**self).count_documents(filter, options)
    }
    fn estimated_document_count(&self) -> Result<u64, Error> {
        (**self).estimated_document_count()
    }
    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error> {
        (**self).distinct(key, filter)
    }
    fn create_index(&self, index: IndexModel) -> Result<String, Error> {
        (**self).create_index(index)
    }
    fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>, Error> {
        (**self).create_indexes(indexes)
    }
    fn drop_index(&self, name: &str) -> Result<(), Error> {
        (**self).drop_index(name)
    }
    fn drop_indexes(&self) -> Result<(), Error> {
        (**self).drop_indexes()
    }
    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error> {
        (**self).list_indexes()
    }
    fn index_exists(&self, name: &str) -> Result<bool, Error> {
        (**self).index_exists(name)
    }
    fn aggregate(&self, pipeline: Vec<Document>, options: AggregateOptions) -> Result<DocStream<'_>, Error> {
        (**self).aggregate(pipeline, options)
    }
    fn watch(&self, pipeline: Vec<Document>, options: ChangeStreamOptions) -> Result<DocStream<'_>, Error> {
        (**self).watch(pipeline, options)
    }
    fn rename(&self, new_name: &str) -> Result<(), Error> {
        (**self).rename(new_name)
    }
    fn drop_collection(&self) -> Result<(), Error> {
        (**self).drop_collection()
    }
}

/// Every collection operation, by its client-facing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    InsertOne,
    InsertMany,
    UpdateOne,
    UpdateMany,
    ReplaceOne,
    DeleteOne,
    DeleteMany,
    FindOne,
    Find,
    FindOneAndDelete,
    FindOneAndReplace,
    FindOneAndUpdate,
    CountDocuments,
    EstimatedDocumentCount,
    Distinct,
    CreateIndex,
    CreateIndexes,
    DropIndex,
    DropIndexes,
    ListIndexes,
    IndexExists,
    Aggregate,
    Watch,
    Rename,
    Drop,
}

impl Operation {
    pub const ALL: [Operation; 25] = [
        Operation::InsertOne,
        Operation::InsertMany,
        Operation::UpdateOne,
        Operation::UpdateMany,
        Operation::ReplaceOne,
        Operation::DeleteOne,
        Operation::DeleteMany,
        Operation::FindOne,
        Operation::Find,
        Operation::FindOneAndDelete,
        Operation::FindOneAndReplace,
        Operation::FindOneAndUpdate,
        Operation::CountDocuments,
        Operation::EstimatedDocumentCount,
        Operation::Distinct,
        Operation::CreateIndex,
        Operation::CreateIndexes,
        Operation::DropIndex,
        Operation::DropIndexes,
        Operation::ListIndexes,
        Operation::IndexExists,
        Operation::Aggregate,
        Operation::Watch,
        Operation::Rename,
        Operation::Drop,
    ];

    /// Operations offered by a read-only collection.
    pub const READ_OPERATIONS: [Operation; 8] = [
        Operation::FindOne,
        Operation::Find,
        Operation::CountDocuments,
        Operation::EstimatedDocumentCount,
        Operation::Distinct,
        Operation::ListIndexes,
        Operation::IndexExists,
        Operation::Watch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InsertOne => "insertOne",
            Self::InsertMany => "insertMany",
            Self::UpdateOne => "updateOne",
            Self::UpdateMany => "updateMany",
            Self::ReplaceOne => "replaceOne",
            Self::DeleteOne => "deleteOne",
            Self::DeleteMany => "deleteMany",
            Self::FindOne => "findOne",
            Self::Find => "find",
            Self::FindOneAndDelete => "findOneAndDelete",
            Self::FindOneAndReplace => "findOneAndReplace",
            Self::FindOneAndUpdate => "findOneAndUpdate",
            Self::CountDocuments => "countDocuments",
            Self::EstimatedDocumentCount => "estimatedDocumentCount",
            Self::Distinct => "distinct",
            Self::CreateIndex => "createIndex",
            Self::CreateIndexes => "createIndexes",
            Self::DropIndex => "dropIndex",
            Self::DropIndexes => "dropIndexes",
            Self::ListIndexes => "listIndexes",
            Self::IndexExists => "indexExists",
            Self::Aggregate => "aggregate",
            Self::Watch => "watch",
            Self::Rename => "rename",
            Self::Drop => "drop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn is_read(self) -> bool {
        Self::READ_OPERATIONS.contains(&self)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
