use std::sync::Arc;

use bson::doc;
use docsafe::config::ValidationConfig;
use docsafe::converter::{Converter, ValidatingConverter};
use docsafe::pipeline::{PipelineChecker, PipelineSchemas};
use docsafe::query::FilterChecker;
use docsafe::schema::{Field, SchemaContext, SchemaType};
use docsafe::telemetry::{set_audit_sink, snapshot};
use parking_lot::RwLock;

// One test: the audit sink is process-wide.
#[test]
fn rejections_are_counted_and_audited() {
    let sink = Arc::new(RwLock::new(Vec::new()));
    set_audit_sink(Some(Arc::clone(&sink)));

    let ty = SchemaType::record([Field::new("n", SchemaType::Number)]);
    let ctx = SchemaContext::document(&ty).unwrap();
    let cfg = ValidationConfig::default();
    let before = snapshot();

    assert!(FilterChecker::new(&ctx, &cfg).check(&doc! { "n": 1 }).is_ok());
    assert!(FilterChecker::new(&ctx, &cfg).check(&doc! { "m": 1 }).is_err());
    let pipeline = PipelineChecker::new(PipelineSchemas::new(&ctx), &cfg);
    assert!(pipeline.check(&[doc! { "$match": { "n": "x" } }]).is_err());
    let converter = ValidatingConverter::new(&ty).unwrap();
    assert!(converter.pre_insert(doc! { "n": "x" }).is_err());

    let after = snapshot();
    set_audit_sink(None);

    assert!(after.checks_total >= before.checks_total + 3);
    assert!(after.rejections_total >= before.rejections_total + 2);
    assert!(after.unknown_path_total > before.unknown_path_total);
    assert!(after.stage_total > before.stage_total);

    let lines = sink.read();
    assert!(lines.iter().any(|l| l.starts_with("rejected filter kind=unknown_path")));
    assert!(lines.iter().any(|l| l.starts_with("rejected pipeline kind=type_mismatch")));
    assert!(lines.iter().any(|l| l.starts_with("rejected write kind=type_mismatch")));
}
