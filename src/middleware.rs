//! Per-operation hooks around a driver.
//!
//! Handlers are registered for one operation or for all of them; each call
//! runs every `before` hook in registration order, then the driver, then
//! every `after` hook. A `before` hook may veto the call.

use std::collections::HashMap;
use std::sync::Arc;

use bson::{Bson, Document};
use parking_lot::RwLock;

use crate::driver::{DeleteResult, DocStream, Driver, InsertManyResult, InsertOneResult, Operation, UpdateResult};
use crate::errors::Error;
use crate::query::{
    AggregateOptions, ChangeStreamOptions, CountOptions, FindOptions, IndexModel, ModifyOptions, ModifyResult,
    ReplaceOptions, UpdateOptions,
};
use crate::telemetry;

/// How a driver call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed(String),
}

pub trait Handler: Send + Sync {
    /// `args` are the documents and names passed to the operation.
    ///
    /// # Errors
    /// Any error aborts the call before it reaches the driver.
    fn before(&self, _op: Operation, _args: &[Bson]) -> Result<(), Error> {
        Ok(())
    }

    fn after(&self, _op: Operation, _outcome: &Outcome) {}
}

/// Logs every call; failures also go to the audit log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl Handler for LoggingHandler {
    fn before(&self, op: Operation, args: &[Bson]) -> Result<(), Error> {
        log::debug!("{op} args={}", args.len());
        Ok(())
    }

    fn after(&self, op: Operation, outcome: &Outcome) {
        match outcome {
            Outcome::Ok => log::info!("{op} ok"),
            Outcome::Failed(reason) => telemetry::audit(&format!("{op} failed error=\"{reason}\"")),
        }
    }
}

type HandlerTable = HashMap<Operation, Vec<Arc<dyn Handler>>>;

/// A driver with a handler table.
pub struct MiddlewareDriver<D> {
    inner: D,
    handlers: RwLock<HandlerTable>,
}

impl<D: Driver> MiddlewareDriver<D> {
    pub fn new(inner: D) -> Self {
        Self { inner, handlers: RwLock::new(HashMap::new()) }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Registers `handler` for every operation.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        let mut table = self.handlers.write();
        for op in Operation::ALL {
            table.entry(op).or_default().push(handler.clone());
        }
    }

    pub fn add_handler_for(&self, op: Operation, handler: Arc<dyn Handler>) {
        self.handlers.write().entry(op).or_default().push(handler);
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    pub fn handler_count(&self, op: Operation) -> usize {
        self.handlers.read().get(&op).map_or(0, Vec::len)
    }

    fn hooks(&self, op: Operation) -> Hooks {
        // Snapshot so handlers may register others without deadlocking.
        let handlers = self.handlers.read().get(&op).cloned().unwrap_or_default();
        Hooks { op, handlers }
    }
}

struct Hooks {
    op: Operation,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Hooks {
    fn before(&self, args: impl FnOnce() -> Vec<Bson>) -> Result<(), Error> {
        if self.handlers.is_empty() {
            return Ok(());
        }
        let args = args();
        for h in &self.handlers {
            if let Err(e) = h.before(self.op, &args) {
                log::warn!("{} vetoed: {e}", self.op);
                return Err(e);
            }
        }
        Ok(())
    }

    fn after<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if self.handlers.is_empty() {
            return result;
        }
        let outcome = match &result {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::Failed(e.to_string()),
        };
        for h in &self.handlers {
            h.after(self.op, &outcome);
        }
        result
    }
}

fn docs(items: &[&Document]) -> Vec<Bson> {
    items.iter().map(|d| Bson::Document((*d).clone())).collect()
}

fn pipeline(stages: &[Document]) -> Vec<Bson> {
    vec![Bson::Array(stages.iter().cloned().map(Bson::Document).collect())]
}

impl<D: Driver> Driver for MiddlewareDriver<D> {
    fn insert_one(&self, doc: Document) -> Result<InsertOneResult, Error> {
        let hooks = self.hooks(Operation::InsertOne);
        hooks.before(|| docs(&[&doc]))?;
        hooks.after(self.inner.insert_one(doc))
    }

    fn insert_many(&self, items: Vec<Document>) -> Result<InsertManyResult, Error> {
        let hooks = self.hooks(Operation::InsertMany);
        hooks.before(|| items.iter().cloned().map(Bson::Document).collect())?;
        hooks.after(self.inner.insert_many(items))
    }

    fn update_one(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        let hooks = self.hooks(Operation::UpdateOne);
        hooks.before(|| docs(&[&filter, &update]))?;
        hooks.after(self.inner.update_one(filter, update, options))
    }

    fn update_many(&self, filter: Document, update: Document, options: UpdateOptions) -> Result<UpdateResult, Error> {
        let hooks = self.hooks(Operation::UpdateMany);
        hooks.before(|| docs(&[&filter, &update]))?;
        hooks.after(self.inner.update_many(filter, update, options))
    }

    fn replace_one(&self, filter: Document, replacement: Document, options: ReplaceOptions) -> Result<UpdateResult, Error> {
        let hooks = self.hooks(Operation::ReplaceOne);
        hooks.before(|| docs(&[&filter, &replacement]))?;
        hooks.after(self.inner.replace_one(filter, replacement, options))
    }

    fn delete_one(&self, filter: Document) -> Result<DeleteResult, Error> {
        let hooks = self.hooks(Operation::DeleteOne);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.delete_one(filter))
    }

    fn delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        let hooks = self.hooks(Operation::DeleteMany);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.delete_many(filter))
    }

    fn find(&self, filter: Document, options: FindOptions) -> Result<DocStream<'_>, Error> {
        let hooks = self.hooks(Operation::Find);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.find(filter, options))
    }

    fn find_one(&self, filter: Document, options: FindOptions) -> Result<Option<Document>, Error> {
        let hooks = self.hooks(Operation::FindOne);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.find_one(filter, options))
    }

    fn find_one_and_delete(&self, filter: Document, options: ModifyOptions) -> Result<ModifyResult<Document>, Error> {
        let hooks = self.hooks(Operation::FindOneAndDelete);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.find_one_and_delete(filter, options))
    }

    fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        let hooks = self.hooks(Operation::FindOneAndReplace);
        hooks.before(|| docs(&[&filter, &replacement]))?;
        hooks.after(self.inner.find_one_and_replace(filter, replacement, options))
    }

    fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: ModifyOptions,
    ) -> Result<ModifyResult<Document>, Error> {
        let hooks = self.hooks(Operation::FindOneAndUpdate);
        hooks.before(|| docs(&[&filter, &update]))?;
        hooks.after(self.inner.find_one_and_update(filter, update, options))
    }

    fn count_documents(&self, filter: Document, options: CountOptions) -> Result<u64, Error> {
        let hooks = self.hooks(Operation::CountDocuments);
        hooks.before(|| docs(&[&filter]))?;
        hooks.after(self.inner.count_documents(filter, options))
    }

    fn estimated_document_count(&self) -> Result<u64, Error> {
        let hooks = self.hooks(Operation::EstimatedDocumentCount);
        hooks.before(Vec::new)?;
        hooks.after(self.inner.estimated_document_count())
    }

    fn distinct(&self, key: &str, filter: Document) -> Result<Vec<Bson>, Error> {
        let hooks = self.hooks(Operation::Distinct);
        hooks.before(|| vec![Bson::String(key.to_string()), Bson::Document(filter.clone())])?;
        hooks.after(self.inner.distinct(key, filter))
    }

    fn create_index(&self, index: IndexModel) -> Result<String, Error> {
        let hooks = self.hooks(Operation::CreateIndex);
        hooks.before(|| docs(&[&index.keys]))?;
        hooks.after(self.inner.create_index(index))
    }

    fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>, Error> {
        let hooks = self.hooks(Operation::CreateIndexes);
        hooks.before(|| indexes.iter().map(|i| Bson::Document(i.keys.clone())).collect())?;
        hooks.after(self.inner.create_indexes(indexes))
    }

    fn drop_index(&self, name: &str) -> Result<(), Error> {
        let hooks = self.hooks(Operation::DropIndex);
        hooks.before(|| vec![Bson::String(name.to_string())])?;
        hooks.after(self.inner.drop_index(name))
    }

    fn drop_indexes(&self) -> Result<(), Error> {
        let hooks = self.hooks(Operation::DropIndexes);
        hooks.before(Vec::new)?;
        hooks.after(self.inner.drop_indexes())
    }

    fn list_indexes(&self) -> Result<Vec<IndexModel>, Error> {
        let hooks = self.hooks(Operation::ListIndexes);
        hooks.before(Vec::new)?;
        hooks.after(self.inner.list_indexes())
    }

    fn index_exists(&self, name: &str) -> Result<bool, Error> {
        let hooks = self.hooks(Operation::IndexExists);
        hooks.before(|| vec![Bson::String(name.to_string())])?;
        hooks.after(self.inner.index_exists(name))
    }

    fn aggregate(&self, stages: Vec<Document>, options: AggregateOptions) -> Result<DocStream<'_>, Error> {
        let hooks = self.hooks(Operation::Aggregate);
        hooks.before(|| pipeline(&stages))?;
        hooks.after(self.inner.aggregate(stages, options))
    }

    fn watch(&self, stages: Vec<Document>, options: ChangeStreamOptions) -> Result<DocStream<'_>, Error> {
        let hooks = self.hooks(Operation::Watch);
        hooks.before(|| pipeline(&stages))?;
        hooks.after(self.inner.watch(stages, options))
    }

    fn rename(&self, new_name: &str) -> Result<(), Error> {
        let hooks = self.hooks(Operation::Rename);
        hooks.before(|| vec![Bson::String(new_name.to_string())])?;
        hooks.after(self.inner.rename(new_name))
    }

    fn drop_collection(&self) -> Result<(), Error> {
        let hooks = self.hooks(Operation::Drop);
        hooks.before(Vec::new)?;
        hooks.after(self.inner.drop_collection())
    }
}
