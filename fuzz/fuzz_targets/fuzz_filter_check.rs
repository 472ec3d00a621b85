#![no_main]
use bson::Document;
use docsafe::config::ValidationConfig;
use docsafe::query::FilterChecker;
use docsafe::schema::{Field, SchemaContext, SchemaType};
use libfuzzer_sys::fuzz_target;

fn schema() -> SchemaType {
    SchemaType::record([
        Field::new("name", SchemaType::String),
        Field::new("n", SchemaType::Number),
        Field::new("tags", SchemaType::array(SchemaType::String)),
        Field::new("items", SchemaType::array(SchemaType::record([Field::new("q", SchemaType::Number)]))),
        Field::new("loc", SchemaType::geo_point()),
        Field::new("meta", SchemaType::map(SchemaType::Any)),
    ])
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(filter) = serde_json::from_str::<Document>(s) else { return };
    let Ok(ctx) = SchemaContext::document(&schema()) else { return };
    // Any verdict is fine; panics and stack overflows are not
    let _ = FilterChecker::new(&ctx, &ValidationConfig::default()).check(&filter);
});
