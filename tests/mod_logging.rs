mod common;

use std::sync::Arc;

use bson::doc;
use common::RecordingDriver;
use docsafe::collection::{Collection, ReadOperations};
use docsafe::query::{CountOptions, IndexModel, ModifyOptions};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::{Mutex, const_mutex};
use serde::{Deserialize, Serialize};

struct Capture(Mutex<Vec<String>>);

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record<'_>) {
        if record.target().starts_with("docsafe::collection") {
            self.0.lock().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture(const_mutex(Vec::new()));

#[derive(Debug, Serialize, Deserialize)]
struct Note {
    title: String,
    stars: i32,
}
docsafe::impl_schematic!(Note { title: String, stars: i32 });

// One test: the logger is process-wide.
#[test]
fn every_checked_operation_logs_its_acceptance() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Debug);

    let driver = Arc::new(RecordingDriver::new());
    let notes: Collection<Note, _> = Collection::new(Arc::clone(&driver)).unwrap();
    notes.delete_one(doc! { "title": "a" }).unwrap();
    notes.delete_many(doc! { "stars": { "$lt": 2 } }).unwrap();
    notes.create_index(IndexModel::new(doc! { "stars": -1 })).unwrap();
    notes.count_documents(doc! {}, CountOptions::default()).unwrap();
    notes.find_one_and_delete(doc! { "title": "a" }, ModifyOptions::default()).unwrap();
    assert!(notes.delete_one(doc! { "missing": 1 }).is_err());

    let lines = CAPTURE.0.lock().clone();
    for op in ["deleteOne", "deleteMany", "createIndex", "countDocuments", "findOneAndDelete"] {
        let line = format!("{op}: request accepted");
        assert!(lines.contains(&line), "no `{line}` in {lines:?}");
    }
    assert_eq!(lines.iter().filter(|l| l.starts_with("deleteOne")).count(), 1);
}
