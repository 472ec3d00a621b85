#![no_main]
use bson::Document;
use docsafe::config::ValidationConfig;
use docsafe::pipeline::{PipelineChecker, PipelineSchemas};
use docsafe::schema::{Field, SchemaContext, SchemaType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(stages) = serde_json::from_str::<Vec<Document>>(s) else { return };
    let ty = SchemaType::record([
        Field::new("k", SchemaType::ObjectId),
        Field::new("n", SchemaType::Number),
        Field::new("at", SchemaType::legacy_coordinates()),
    ]);
    let Ok(ctx) = SchemaContext::document(&ty) else { return };
    let cfg = ValidationConfig::default();
    let _ = PipelineChecker::new(PipelineSchemas::new(&ctx), &cfg).check(&stages);
});
