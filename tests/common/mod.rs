#![allow(dead_code)]

use bson::{Bson, Document, doc, oid::ObjectId};
use docsafe::driver::{DeleteResult, DocStream, Driver, InsertManyResult, InsertOneResult, Operation, UpdateResult};
use docsafe::errors::Error;
use docsafe::query::{
    AggregateOptions, ChangeStreamOptions, CountOptions, FindOptions, IndexModel, ModifyOptions, ModifyResult,
    ReplaceOptions, UpdateOptions,
};
use parking_lot::Mutex;

/// One call as the driver saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Operation,
    pub docs: Vec<Document>,
    pub find: Option<FindOptions>,
}

/// Records every call and answers reads from canned documents.
#[derive(Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<Call>>,
    canned: Mutex<Vec<Document>>,
    distinct: Mutex<Vec<Bson>>,
    indexes: Mutex<Vec<IndexModel>>,
    failing: Mutex<bool>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs(docs: Vec<Document>) -> Self {
        let d = Self::default();
        *d.canned.lock() = docs;
        d
    }

    pub fn set_distinct(&self, values: Vec<Bson>) {
        *self.distinct.lock() = values;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn ops(&self) -> Vec<Operation> {
        self.calls.lock().iter().map(|c| c.op).collect()
    }

    pub fn last(&self) -> Option<Call> {
        self.calls.lock().last().cloned()
    }

    fn record(&self, op: Operation, docs: Vec<Document>) -> Result<(), Error> {
        self.calls.lock().push(Call { op, docs, find: None });
        if *self.failing.lock() {
            return Err(Error::Driver(format!("{op} failed")));
        }
        Ok(())
    }

    fn first_canned(&self) -> Option<Document> {
        self.canned.lock().first().cloned()
    }

    fn stream(&self) -> DocStream<'_> {
        let docs = self.canned.lock().clone();
        Box::new(docs.into_iter().map(Ok))
    }
}

impl Driver for RecordingDriver {
    fn insert_one(&self, doc: Document) -> Result<InsertOneResult, Error> {
        self.record(Operation::InsertOne, vec![doc])?;
        Ok(InsertOneResult { inserted_id: Bson::ObjectId(ObjectId::new()) })
    }

    fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, Error> {
        let n = docs.len();
        self.record(Operation::InsertMany, docs)?;
        Ok(InsertManyResult { inserted_ids: (0..n).map(|_| Bson::ObjectId(ObjectId::new())).collect() })
    }

    fn update_one(&self, filter: Document, update: Document, _options: UpdateOptions) -> Result<UpdateResult, Error> {
        self.record(Operation::UpdateOne, vec![filter, update])?;
        Ok(UpdateResult { matched_count: 1, modified_count: 1, upserted_id: None })
    }

    fn update_many(&self, filter: Document, update: Document, _options: UpdateOptions) -> Result<UpdateResult, Error> {
        self.record(Operation::UpdateMany, vec![filter, update])?;
        Ok(UpdateResult { matched_count: 2, modified_count: 2, upserted_id: None })
    }

    fn replace_one(&self, filter: Document, replacement: Document, _options: ReplaceOptions) -> Result<UpdateResult, Error> {
        self.record(Operation::ReplaceOne, vec![filter, replacement])?;
        Ok(UpdateResult { matched_count: 1, modified_count: 1, upserted_id: None })
    }

    fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.record(Operation::DeleteOne, vec![filter])?;
        Ok(DeleteResult { deleted_count: 1 })
    }

    fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.record(Operation::DeleteMany, vec![filter])?;
        Ok(DeleteResult { deleted_count: 3 })
    }

    fn find(&self, filter: Document, options: FindOptions) -> Result<DocStream<'_>, Error> {
        self.calls.lock().push(Call { op: Operation::Find, docs: vec![filter], find: Some(options) });
        if *self.failing.lock() {
            return Err(Error::Driver("find failed".into()));
        }
        Ok(self.stream())
    }

    fn find_one_and_delete(&self, filter: Document, _options: ModifyOptions) -> Result<ModifyResult<Document>, Error> {
        self.record(Operation::FindOneAndDelete, vec![filter])?;
        Ok(ModifyResult { value: self.first_canned() })
    }

    fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        _options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        self.record(Operation::FindOneAndReplace, vec![filter, replacement])?;
        Ok(ModifyResult { value: self.first_canned() })
    }

    fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        _options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        self.record(Operation::FindOneAndUpdate, vec![filter, update])?;
        Ok(ModifyResult { value: self.first_canned() })
    }

    fn count_documents(&self, filter: Document, _options: CountOptions) -> Result<u64, Error> {
        self.record(Operation::CountDocuments, vec![filter])?;
        Ok(self.canned.lock().len() as u64)
    }

    fn estimated_document_count(&self) -> Result<u64, Error> {
        self.record(Operation::EstimatedDocumentCount, Vec::new())?;
        Ok(self.canned.lock().len() as u64)
    }

    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error> {
        self.record(Operation::Distinct, vec![doc! { "key": key }, filter])?;
        Ok(self.distinct.lock().clone())
    }

    fn create_index(&self, index: IndexModel) -> Result<String, Error> {
        self.record(Operation::CreateIndex, vec![index.keys.clone()])?;
        let name = index.name();
        self.indexes.lock().push(index);
        Ok(name)
    }

    fn drop_index(&self, name: &str) -> Result<(), Error> {
        self.record(Operation::DropIndex, vec![doc! { "name": name }])?;
        self.indexes.lock().retain(|i| i.name() != name);
        Ok(())
    }

    fn drop_indexes(&self) -> Result<(), Error> {
        self.record(Operation::DropIndexes, Vec::new())?;
        self.indexes.lock().clear();
        Ok(())
    }

    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error> {
        self.record(Operation::ListIndexes, Vec::new())?;
        Ok(self.indexes.lock().clone())
    }

    fn aggregate(&self, pipeline: Vec<Document>, _options: AggregateOptions) -> Result<DocStream<'_>, Error> {
        self.record(Operation::Aggregate, pipeline)?;
        Ok(self.stream())
    }

    fn watch(&self, pipeline: Vec<Document>, _options: ChangeStreamOptions) -> Result<DocStream<'_>, Error> {
        self.record(Operation::Watch, pipeline)?;
        Ok(Box::new(std::iter::empty()))
    }

    fn rename(&self, new_name: &str) -> Result<(), Error> {
        self.record(Operation::Rename, vec![doc! { "to": new_name }])
    }

    fn drop_collection(&self) -> Result<(), Error> {
        self.record(Operation::Drop, Vec::new())
    }
}
