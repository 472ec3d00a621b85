use bson::{Bson, DateTime, Document};
use chrono::Utc;

use super::Converter;
use crate::errors::{Error, ShapeError};
use crate::schema::{Field, SchemaType, bson_kind};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

pub trait Clock: Send + Sync {
    fn now(&self) -> chrono::DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub chrono::DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        self.0
    }
}

/// Stamps `createdAt` on insert and upsert, and `updatedAt` on every write.
/// Whole-document replacement would lose `createdAt` and is refused.
#[derive(Debug, Clone, Default)]
pub struct TimestampConverter<C = SystemClock> {
    clock: C,
}

impl TimestampConverter {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> TimestampConverter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    fn now(&self) -> DateTime {
        DateTime::from_millis(self.clock.now().timestamp_millis())
    }
}

impl<C: Clock> Converter for TimestampConverter<C> {
    fn pre_insert(&self, mut doc: Document) -> Result<Document, Error> {
        let now = self.now();
        doc.insert(CREATED_AT, now);
        doc.insert(UPDATED_AT, now);
        Ok(doc)
    }

    fn pre_update(&self, mut update: Document) -> Result<Document, Error> {
        let now = self.now();
        stamp(&mut update, "$setOnInsert", CREATED_AT, now)?;
        stamp(&mut update, "$set", UPDATED_AT, now)?;
        Ok(update)
    }

    fn pre_replace(&self, _replacement: Document) -> Result<Document, Error> {
        Err(Error::Unsupported("replace on a timestamped collection".into()))
    }
}

fn stamp(update: &mut Document, op: &str, field: &str, now: DateTime) -> Result<(), Error> {
    match update.get_mut(op) {
        Some(Bson::Document(payload)) => {
            payload.insert(field, now);
        }
        Some(other) => return Err(ShapeError::mismatch(op, "document", bson_kind(other)).into()),
        None => {
            let mut payload = Document::new();
            payload.insert(field, now);
            update.insert(op, payload);
        }
    }
    Ok(())
}

/// `ty` with the `createdAt` and `updatedAt` dates a [`TimestampConverter`]
/// adds. Non-record types are returned unchanged.
pub fn with_time(ty: SchemaType) -> SchemaType {
    match ty {
        SchemaType::Record { mut fields } => {
            for name in [CREATED_AT, UPDATED_AT] {
                if !fields.iter().any(|f| f.name == name) {
                    fields.push(Field::new(name, SchemaType::Date));
                }
            }
            SchemaType::Record { fields }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::TimeZone;

    fn fixed() -> TimestampConverter<FixedClock> {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default();
        TimestampConverter::with_clock(FixedClock(at))
    }

    #[test]
    fn update_merges_into_existing_operators() {
        let out = fixed().pre_update(doc! { "$set": { "a": 1 } }).unwrap();
        let set = out.get_document("$set").unwrap();
        assert_eq!(set.get_i32("a").unwrap(), 1);
        assert!(set.get_datetime(UPDATED_AT).is_ok());
        assert!(out.get_document("$setOnInsert").unwrap().get_datetime(CREATED_AT).is_ok());
    }

    #[test]
    fn replace_is_refused() {
        assert!(matches!(fixed().pre_replace(doc! { "a": 1 }), Err(Error::Unsupported(_))));
    }
}
