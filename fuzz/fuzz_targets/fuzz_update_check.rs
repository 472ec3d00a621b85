#![no_main]
use bson::Document;
use docsafe::config::ValidationConfig;
use docsafe::query::UpdateChecker;
use docsafe::schema::{Field, SchemaContext, SchemaType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    // A JSON array is read as `[update, arrayFilters...]`
    let Ok(mut docs) = serde_json::from_str::<Vec<Document>>(s) else { return };
    if docs.is_empty() { return; }
    let update = docs.remove(0);
    let ty = SchemaType::record([
        Field::new("s", SchemaType::String),
        Field::new("n", SchemaType::Number),
        Field::new("lines", SchemaType::array(SchemaType::record([Field::new("q", SchemaType::Number)]))),
        Field::optional("opt", SchemaType::Date),
    ]);
    let Ok(ctx) = SchemaContext::document(&ty) else { return };
    let cfg = ValidationConfig::default();
    let _ = UpdateChecker::new(&ctx, &cfg).check_with_array_filters(&update, &docs);
});
