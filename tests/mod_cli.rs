use std::path::{Path, PathBuf};

use docsafe::cli::{Command, OutputMode, PathContext, Verdict, run_to};
use docsafe::config::ValidationConfig;
use docsafe::errors::{Error, ShapeError};

const PRODUCT: &str = r#"{
    "kind": "record",
    "fields": [
        { "name": "name", "type": { "kind": "string" } },
        { "name": "price", "type": { "kind": "number" } },
        { "name": "variants", "type": { "kind": "array", "items": {
            "kind": "record", "fields": [{ "name": "sku", "type": { "kind": "string" } }]
        } } }
    ]
}"#;

const REVIEW: &str = r#"{
    "kind": "record",
    "fields": [
        { "name": "product", "type": { "kind": "objectId" } },
        { "name": "stars", "type": { "kind": "number" } }
    ]
}"#;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn run(cmd: Command, mode: OutputMode) -> (Verdict, String) {
    run_with(cmd, &ValidationConfig::default(), mode)
}

fn run_with(cmd: Command, cfg: &ValidationConfig, mode: OutputMode) -> (Verdict, String) {
    let mut buf = Vec::new();
    let verdict = run_to(cmd, cfg, mode, &mut buf).unwrap();
    (verdict, String::from_utf8(buf).unwrap())
}

#[test]
fn filter_verdicts_in_each_format() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let good = || Command::CheckFilter { schema: schema.clone(), filter: r#"{"price": {"$gt": 5}}"#.into() };
    let bad = || Command::CheckFilter { schema: schema.clone(), filter: r#"{"price": "cheap"}"#.into() };

    assert_eq!(run(good(), OutputMode::Human), (Verdict::Accepted, "ok\n".to_string()));
    assert_eq!(run(good(), OutputMode::Plain).1, "accepted\n");
    assert_eq!(run(good(), OutputMode::Json).1.trim(), r#"{"accepted":true}"#);

    let (verdict, text) = run(bad(), OutputMode::Human);
    assert!(matches!(verdict, Verdict::Rejected(ShapeError::TypeMismatch { .. })));
    assert!(text.starts_with("rejected: "));
    let (_, text) = run(bad(), OutputMode::Plain);
    assert!(text.starts_with("rejected kind=type_mismatch"));
    let (_, text) = run(bad(), OutputMode::Json);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["accepted"], false);
    assert_eq!(json["kind"], "type_mismatch");
}

#[test]
fn arguments_may_come_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let update = write(dir.path(), "update.json", r#"{"$set": {"variants.$[v].sku": "A-1"}}"#);
    let filters = write(dir.path(), "filters.json", r#"[{"v.sku": "A-0"}]"#);
    let cmd = Command::CheckUpdate {
        schema: schema.clone(),
        update: format!("@{}", update.display()),
        array_filters: Some(format!("@{}", filters.display())),
    };
    assert!(run(cmd, OutputMode::Plain).0.is_accepted());

    let cmd = Command::CheckUpdate { schema, update: format!("@{}", update.display()), array_filters: None };
    assert!(matches!(run(cmd, OutputMode::Plain).0, Verdict::Rejected(ShapeError::MissingKey { .. })));
}

#[test]
fn projection_and_sort_commands() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let cmd = Command::CheckProjection { schema: schema.clone(), projection: r#"{"name": 1, "price": 0}"#.into() };
    assert!(matches!(run(cmd, OutputMode::Human).0, Verdict::Rejected(ShapeError::MixedProjection { .. })));
    let cmd = Command::CheckSort { schema, sort: r#"{"variants.sku": 1}"#.into() };
    assert!(run(cmd, OutputMode::Human).0.is_accepted());
}

#[test]
fn pipeline_rejections_report_the_root_kind() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write(dir.path(), "review.json", REVIEW);
    let products = write(dir.path(), "product.json", PRODUCT);
    let join = r#"[{"$lookup": {"from": "products", "localField": "product", "foreignField": "_id", "as": "p"}}]"#;
    let cmd = Command::CheckPipeline {
        schema: reviews.clone(),
        pipeline: join.into(),
        lookup: Some(products.clone()),
        union_with: None,
    };
    assert!(run(cmd, OutputMode::Plain).0.is_accepted());

    let cmd = Command::CheckPipeline {
        schema: reviews,
        pipeline: r#"[{"$match": {"stars": {"$gte": 4}}}, {"$limit": 0}]"#.into(),
        lookup: None,
        union_with: Some(products),
    };
    let (verdict, text) = run(cmd, OutputMode::Plain);
    assert!(matches!(verdict, Verdict::Rejected(ShapeError::InvalidStage { index: 1, .. })));
    assert!(text.starts_with("rejected kind=invalid_value"));
}

#[test]
fn paths_lists_patterns_per_context() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let (_, text) = run(Command::Paths { schema: schema.clone(), context: PathContext::Filter }, OutputMode::Plain);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"_id"));
    assert!(lines.contains(&"variants.<n>.sku"));
    assert!(lines.contains(&"variants.sku"));

    let (_, text) = run(Command::Paths { schema, context: PathContext::Sort }, OutputMode::Json);
    let paths: Vec<String> = serde_json::from_str(text.trim()).unwrap();
    assert!(paths.iter().all(|p| !p.contains("<n>")));
    assert_eq!(PathContext::parse("Project"), Some(PathContext::Projection));
}

#[test]
fn tolerant_config_accepts_unknown_paths() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let cmd = || Command::CheckFilter { schema: schema.clone(), filter: r#"{"legacy": 1}"#.into() };
    assert!(!run(cmd(), OutputMode::Plain).0.is_accepted());
    assert!(run_with(cmd(), &ValidationConfig::tolerant(), OutputMode::Plain).0.is_accepted());
}

#[test]
fn usage_problems_are_errors_not_verdicts() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "product.json", PRODUCT);
    let mut sink = Vec::new();
    let cfg = ValidationConfig::default();
    let result = run_to(
        Command::CheckFilter { schema: schema.clone(), filter: "{not json".into() },
        &cfg,
        OutputMode::Plain,
        &mut sink,
    );
    assert!(matches!(result, Err(Error::Json(_))));
    let result = run_to(
        Command::CheckFilter { schema: dir.path().join("nope.json"), filter: "{}".into() },
        &cfg,
        OutputMode::Plain,
        &mut sink,
    );
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(sink.is_empty());
}

#[test]
fn info_reports_config_as_json() {
    let (verdict, text) = run(Command::Info, OutputMode::Json);
    assert!(verdict.is_accepted());
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["name"], "docsafe");
    assert_eq!(json["config"]["max_depth"], 32);
}
