mod common;

use std::sync::Arc;

use bson::{Bson, doc};
use common::RecordingDriver;
use docsafe::driver::{Driver, Operation};
use docsafe::errors::Error;
use docsafe::middleware::{Handler, LoggingHandler, MiddlewareDriver, Outcome};
use docsafe::query::{FindOptions, UpdateOptions};
use parking_lot::Mutex;

/// Appends `name:before:op` and `name:after:op` entries to a shared log.
struct Trace {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Handler for Trace {
    fn before(&self, op: Operation, _args: &[Bson]) -> Result<(), Error> {
        self.log.lock().push(format!("{}:before:{op}", self.name));
        Ok(())
    }

    fn after(&self, op: Operation, outcome: &Outcome) {
        let tag = match outcome {
            Outcome::Ok => "ok",
            Outcome::Failed(_) => "failed",
        };
        self.log.lock().push(format!("{}:after:{op}:{tag}", self.name));
    }
}

/// Refuses deletes with an empty filter.
struct NoBlanketDeletes;

impl Handler for NoBlanketDeletes {
    fn before(&self, _op: Operation, args: &[Bson]) -> Result<(), Error> {
        match args.first() {
            Some(Bson::Document(filter)) if filter.is_empty() => Err(Error::Rejected("empty delete filter".into())),
            _ => Ok(()),
        }
    }
}

fn traced() -> (Arc<RecordingDriver>, MiddlewareDriver<Arc<RecordingDriver>>, Arc<Mutex<Vec<String>>>) {
    let inner = Arc::new(RecordingDriver::new());
    let driver = MiddlewareDriver::new(Arc::clone(&inner));
    let log = Arc::new(Mutex::new(Vec::new()));
    (inner, driver, log)
}

#[test]
fn hooks_run_in_registration_order() {
    let (_inner, driver, log) = traced();
    driver.add_handler(Arc::new(Trace { name: "a", log: Arc::clone(&log) }));
    driver.add_handler(Arc::new(Trace { name: "b", log: Arc::clone(&log) }));
    driver.insert_one(doc! { "x": 1 }).unwrap();
    let op = Operation::InsertOne;
    assert_eq!(
        *log.lock(),
        vec![
            format!("a:before:{op}"),
            format!("b:before:{op}"),
            format!("a:after:{op}:ok"),
            format!("b:after:{op}:ok"),
        ]
    );
}

#[test]
fn a_veto_stops_the_call() {
    let (inner, driver, log) = traced();
    driver.add_handler_for(Operation::DeleteMany, Arc::new(NoBlanketDeletes));
    driver.add_handler(Arc::new(Trace { name: "t", log: Arc::clone(&log) }));

    assert!(matches!(driver.delete_many(doc! {}), Err(Error::Rejected(_))));
    assert!(inner.calls().is_empty());
    assert!(log.lock().is_empty());

    driver.delete_many(doc! { "stale": true }).unwrap();
    assert_eq!(inner.ops(), vec![Operation::DeleteMany]);
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn after_hooks_see_driver_failures() {
    let (inner, driver, log) = traced();
    inner.set_failing(true);
    driver.add_handler(Arc::new(Trace { name: "t", log: Arc::clone(&log) }));
    assert!(driver.update_one(doc! {}, doc! { "$set": { "a": 1 } }, UpdateOptions::default()).is_err());
    assert_eq!(log.lock().last().unwrap(), &format!("t:after:{}:failed", Operation::UpdateOne));
}

#[test]
fn handlers_can_target_one_operation() {
    let (_inner, driver, log) = traced();
    driver.add_handler_for(Operation::FindOne, Arc::new(Trace { name: "f", log: Arc::clone(&log) }));
    assert_eq!(driver.handler_count(Operation::FindOne), 1);
    assert_eq!(driver.handler_count(Operation::Find), 0);

    driver.find(doc! {}, FindOptions::default()).unwrap();
    assert!(log.lock().is_empty());
    driver.find_one(doc! {}, FindOptions::default()).unwrap();
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn clearing_removes_every_handler() {
    let (inner, driver, _log) = traced();
    driver.add_handler(Arc::new(LoggingHandler));
    driver.add_handler_for(Operation::Distinct, Arc::new(NoBlanketDeletes));
    assert_eq!(driver.handler_count(Operation::Distinct), 2);
    for op in Operation::ALL {
        assert!(driver.handler_count(op) >= 1);
    }
    driver.clear();
    assert_eq!(driver.handler_count(Operation::Distinct), 0);
    driver.delete_one(doc! {}).unwrap();
    assert_eq!(inner.ops(), vec![Operation::DeleteOne]);
}

#[test]
fn handlers_receive_operation_arguments() {
    struct Capture(Arc<Mutex<Vec<Bson>>>);
    impl Handler for Capture {
        fn before(&self, _op: Operation, args: &[Bson]) -> Result<(), Error> {
            self.0.lock().extend_from_slice(args);
            Ok(())
        }
    }

    let (_inner, driver, _log) = traced();
    let seen = Arc::new(Mutex::new(Vec::new()));
    driver.add_handler(Arc::new(Capture(Arc::clone(&seen))));
    driver.distinct("tags", doc! { "a": 1 }).unwrap();
    assert_eq!(*seen.lock(), vec![Bson::from("tags"), Bson::Document(doc! { "a": 1 })]);
}
