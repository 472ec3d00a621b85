use std::collections::BTreeMap;

use bson::{Bson, doc, oid::ObjectId};
use docsafe::cli::load_schema;
use docsafe::errors::{Error, SchemaError};
use docsafe::path::IndexRepr;
use docsafe::schema::{Conformance, Field, SchemaContext, SchemaType, Schematic, conforms, conforms_document};

#[test]
fn field_names_follow_the_storage_rules() {
    for bad in ["", "a.b", "$set", "12"] {
        let ty = SchemaType::record([Field::new(bad, SchemaType::String)]);
        assert!(
            matches!(SchemaContext::document(&ty), Err(SchemaError::InvalidFieldName { .. })),
            "{bad:?} accepted"
        );
    }
    let nested = SchemaType::record([Field::new(
        "outer",
        SchemaType::array(SchemaType::record([Field::new("in.ner", SchemaType::Number)])),
    )]);
    match SchemaContext::document(&nested) {
        Err(SchemaError::InvalidFieldName { path, name, .. }) => {
            assert_eq!(path, "outer");
            assert_eq!(name, "in.ner");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(SchemaContext::document(&SchemaType::record([Field::new("a1", SchemaType::Number)])).is_ok());
}

#[test]
fn duplicates_and_empty_unions_are_rejected() {
    let dup = SchemaType::record([Field::new("a", SchemaType::Number), Field::new("a", SchemaType::String)]);
    assert!(matches!(SchemaContext::document(&dup), Err(SchemaError::DuplicateField { .. })));
    let empty = SchemaType::record([Field::new("a", SchemaType::Union { variants: Vec::new() })]);
    assert!(matches!(SchemaContext::document(&empty), Err(SchemaError::EmptyUnion { .. })));
}

#[test]
fn documents_get_an_object_id() {
    let ctx = SchemaContext::document(&SchemaType::record([Field::new("a", SchemaType::Number)])).unwrap();
    assert_eq!(ctx.lookup("_id", IndexRepr::Numeric), Some(SchemaType::ObjectId));
    let custom = SchemaType::record([Field::new("_id", SchemaType::String)]);
    let ctx = SchemaContext::document(&custom).unwrap();
    assert_eq!(ctx.lookup("_id", IndexRepr::Numeric), Some(SchemaType::String));
    let nested = SchemaContext::nested(&SchemaType::record([Field::new("a", SchemaType::Number)]));
    assert_eq!(nested.lookup("_id", IndexRepr::Numeric), None);
}

#[test]
fn tagged_unions_merge_into_one_record() {
    let ty = SchemaType::tagged_union(
        "kind",
        [
            ("card", vec![Field::new("last4", SchemaType::String)]),
            ("bank", vec![Field::new("iban", SchemaType::String)]),
        ],
    );
    let ctx = SchemaContext::document(&ty).unwrap();
    assert_eq!(
        ctx.lookup("kind", IndexRepr::Numeric),
        Some(SchemaType::union([SchemaType::literal("card"), SchemaType::literal("bank")]))
    );
    assert_eq!(ctx.lookup("iban", IndexRepr::Numeric), Some(SchemaType::String.nullable()));
}

#[test]
fn schemas_load_from_json() {
    let json = r#"{
        "kind": "record",
        "fields": [
            { "name": "title", "type": { "kind": "string" } },
            { "name": "tags", "type": { "kind": "array", "items": { "kind": "string" } } },
            { "name": "state", "type": { "kind": "literal", "value": "open" }, "required": false }
        ]
    }"#;
    let ty: SchemaType = serde_json::from_str(json).unwrap();
    assert_eq!(
        ty,
        SchemaType::record([
            Field::new("title", SchemaType::String),
            Field::new("tags", SchemaType::array(SchemaType::String)),
            Field::optional("state", SchemaType::literal("open")),
        ])
    );
    let back: SchemaType = serde_json::from_str(&serde_json::to_string(&ty).unwrap()).unwrap();
    assert_eq!(back, ty);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("schema.json");
    std::fs::write(&file, json).unwrap();
    let ctx = load_schema(&file).unwrap();
    assert!(ctx.lookup("tags.0", IndexRepr::Numeric).is_some());

    std::fs::write(&file, r#"{ "kind": "record", "fields": [{ "name": "$x", "type": { "kind": "any" } }] }"#).unwrap();
    assert!(matches!(load_schema(&file), Err(Error::Schema(_))));
    std::fs::write(&file, r#"{ "kind": "hexagon" }"#).unwrap();
    assert!(matches!(load_schema(&file), Err(Error::Json(_))));
    assert!(matches!(load_schema(&dir.path().join("missing.json")), Err(Error::Io(_))));
}

#[test]
fn display_reads_like_a_type() {
    let ty = SchemaType::record([
        Field::new("a", SchemaType::array(SchemaType::Number)),
        Field::optional("b", SchemaType::literal("x").nullable()),
    ]);
    assert_eq!(ty.to_string(), "{ a: array<number>, b?: 'x' | null }");
}

#[test]
fn conformance_modes() {
    let ty = SchemaType::record([
        Field::new("name", SchemaType::String),
        Field::new("dims", SchemaType::record([Field::new("w", SchemaType::Number)])),
    ]);
    assert!(conforms_document(&ty, &doc! { "name": "a", "dims": { "w": 2 } }, Conformance::Exact).is_ok());
    assert!(conforms_document(&ty, &doc! { "name": "a" }, Conformance::Exact).is_err());
    assert!(conforms_document(&ty, &doc! { "dims": {} }, Conformance::Partial).is_ok());
    let err = conforms(&ty, &Bson::Document(doc! { "dims": { "w": "x" } }), Conformance::Partial).unwrap_err();
    assert_eq!(err.path, "dims.w");
    assert!(conforms(&ty, &Bson::Document(doc! { "extra": 1 }), Conformance::Partial).is_err());
}

#[allow(dead_code)]
struct Address {
    city: String,
    zip: Option<String>,
}
docsafe::impl_schematic!(Address { city: String, zip: Option<String> });

#[allow(dead_code)]
struct Customer {
    id: ObjectId,
    name: String,
    address: Address,
    scores: BTreeMap<String, f64>,
    spot: (f64, f64),
}
docsafe::impl_schematic!(Customer {
    id as "_id": ObjectId,
    name: String,
    address: Address,
    scores: BTreeMap<String, f64>,
    spot: (f64, f64),
});

#[test]
fn struct_schemas_from_the_macro() {
    let ty = Customer::schema();
    assert_eq!(ty.field("_id").map(|f| &f.ty), Some(&SchemaType::ObjectId));
    let ctx = SchemaContext::of::<Customer>().unwrap();
    assert_eq!(ctx.lookup("address.zip", IndexRepr::Numeric), Some(SchemaType::String.nullable()));
    assert_eq!(ctx.lookup("scores.math", IndexRepr::Numeric), Some(SchemaType::Number));
    assert!(ctx.schema().field("spot").is_some_and(|f| f.ty.geo_shape().is_some()));
}
