use bson::Document;
use serde::{Deserialize, Serialize};

/// Options for `find`.
///
/// Semantics:
/// - `projection` and `sort` are checked against the read schema before the
///   driver sees them.
/// - `limit` of `None` means no limit; `skip` of `None` means zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOptions {
    pub upsert: bool,
    /// Filters binding the `$[ident]` positions of the update.
    pub array_filters: Option<Vec<Document>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaceOptions {
    pub upsert: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

/// Options shared by `find_one_and_delete`, `_replace` and `_update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyOptions {
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub upsert: bool,
    pub return_document: ReturnDocument,
    pub array_filters: Option<Vec<Document>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountOptions {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub allow_disk_use: bool,
    pub batch_size: Option<u32>,
    pub comment: Option<String>,
}

/// Options for change streams; `resume_after`, `start_after` and
/// `start_at_operation_time` are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeStreamOptions {
    pub full_document: Option<String>,
    pub full_document_before_change: Option<String>,
    pub resume_after: Option<Document>,
    pub start_after: Option<Document>,
    pub start_at_operation_time: Option<bson::Timestamp>,
    pub show_expanded_events: bool,
}

/// Outcome of a modifying `find_one_and_*` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyResult<T> {
    /// The document before or after the change, per [`ReturnDocument`].
    pub value: Option<T>,
}

impl<T> ModifyResult<T> {
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}
