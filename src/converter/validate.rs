use bson::{Bson, Document};

use super::Converter;
use crate::errors::{Error, SchemaError, ShapeError};
use crate::path::IndexRepr;
use crate::schema::{Conformance, Mismatch, SchemaContext, SchemaType, bson_kind, conforms, conforms_document};
use crate::telemetry;

const CHECKED_UPDATES: &[&str] = &["$set", "$inc", "$min", "$max"];

/// Validates written values against a schema at run time.
///
/// Inserted and replaced documents must match the schema exactly; the
/// payloads of `$set`, `$inc`, `$min` and `$max` must fit the types of
/// the paths they name, `_id` included. Whole documents may omit `_id`,
/// which the database assigns. In silent mode a failure is logged and the
/// value is passed on unchanged.
pub struct ValidatingConverter {
    schema: SchemaContext,
    paths: SchemaContext,
    silent: bool,
}

impl ValidatingConverter {
    /// # Errors
    /// Returns [`SchemaError`] when `ty` breaks the field-name policy.
    pub fn new(ty: &SchemaType) -> Result<Self, SchemaError> {
        let paths = SchemaContext::document(ty)?;
        Ok(Self { schema: SchemaContext::nested(ty), paths, silent: false })
    }

    pub fn silent(ty: &SchemaType) -> Result<Self, SchemaError> {
        Ok(Self { silent: true, ..Self::new(ty)? })
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    fn whole(&self, doc: Document) -> Result<Document, Error> {
        let outcome = conforms_document(self.schema.schema(), &doc, Conformance::Exact)
            .map_err(|m| from_mismatch("", m));
        self.settle(outcome).map(|()| doc)
    }

    fn payload(&self, op: &str, payload: &Bson) -> Result<(), ShapeError> {
        let Bson::Document(fields) = payload else {
            return Err(ShapeError::mismatch(op, "document", bson_kind(payload)));
        };
        for (path, value) in fields {
            let ty = self
                .paths
                .lookup(path, IndexRepr::Positional)
                .ok_or_else(|| ShapeError::unknown_path(path.as_str()))?;
            conforms(&ty, value, Conformance::Partial).map_err(|m| from_mismatch(path, m))?;
        }
        Ok(())
    }

    fn settle(&self, outcome: Result<(), ShapeError>) -> Result<(), Error> {
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if self.silent => {
                log::warn!("validation skipped: {e}");
                Ok(())
            }
            Err(e) => {
                telemetry::audit(&format!("rejected write kind={} error=\"{e}\"", e.kind()));
                Err(e.into())
            }
        }
    }
}

fn from_mismatch(base: &str, m: Mismatch) -> ShapeError {
    ShapeError::TypeMismatch { path: m.full_path(base), expected: m.expected, found: m.found }
}

impl Converter for ValidatingConverter {
    fn pre_insert(&self, doc: Document) -> Result<Document, Error> {
        self.whole(doc)
    }

    fn pre_replace(&self, replacement: Document) -> Result<Document, Error> {
        self.whole(replacement)
    }

    fn pre_update(&self, update: Document) -> Result<Document, Error> {
        for op in CHECKED_UPDATES {
            if let Some(payload) = update.get(*op) {
                self.settle(self.payload(op, payload))?;
            }
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use bson::doc;

    fn schema() -> SchemaType {
        SchemaType::record([Field::new("a", SchemaType::Number), Field::optional("b", SchemaType::String)])
    }

    #[test]
    fn strict_rejects_and_silent_passes() {
        let strict = ValidatingConverter::new(&schema()).unwrap();
        assert!(strict.pre_insert(doc! { "a": 1 }).is_ok());
        assert!(strict.pre_insert(doc! { "a": "x" }).is_err());

        let silent = ValidatingConverter::silent(&schema()).unwrap();
        let out = silent.pre_insert(doc! { "a": "x" }).unwrap();
        assert_eq!(out, doc! { "a": "x" });
    }

    #[test]
    fn update_payloads_follow_path_types() {
        let strict = ValidatingConverter::new(&schema()).unwrap();
        assert!(strict.pre_update(doc! { "$set": { "b": "ok" }, "$inc": { "a": 2 } }).is_ok());
        let err = strict.pre_update(doc! { "$inc": { "a": "two" } }).unwrap_err();
        assert!(matches!(err.shape(), Some(ShapeError::TypeMismatch { path, .. }) if path == "a"));
    }

    #[test]
    fn id_is_a_known_update_path() {
        let strict = ValidatingConverter::new(&schema()).unwrap();
        assert!(strict.pre_insert(doc! { "a": 1 }).is_ok());
        assert!(strict.pre_update(doc! { "$set": { "_id": bson::oid::ObjectId::new() } }).is_ok());
        let err = strict.pre_update(doc! { "$set": { "_id": "abc" } }).unwrap_err();
        assert!(matches!(err.shape(), Some(ShapeError::TypeMismatch { path, .. }) if path == "_id"));
    }
}
