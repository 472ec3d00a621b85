use docsafe::path::{FieldPath, IndexRepr, Segment};
use docsafe::schema::{Field, SchemaContext, SchemaType};
use proptest::prelude::*;

const REPRS: [IndexRepr; 4] = [IndexRepr::Numeric, IndexRepr::Positional, IndexRepr::Projection, IndexRepr::Omitted];

fn leaf() -> impl Strategy<Value = SchemaType> {
    prop_oneof![
        Just(SchemaType::Number),
        Just(SchemaType::String),
        Just(SchemaType::Boolean),
        Just(SchemaType::Date),
        Just(SchemaType::Any),
    ]
}

fn record_of(fields: Vec<(SchemaType, bool)>) -> SchemaType {
    SchemaType::record(fields.into_iter().enumerate().map(|(i, (ty, required))| {
        let name = format!("f{i}");
        if required { Field::new(name, ty) } else { Field::optional(name, ty) }
    }))
}

fn schema_type() -> impl Strategy<Value = SchemaType> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(SchemaType::array),
            inner.clone().prop_map(SchemaType::map),
            inner.clone().prop_map(SchemaType::nullable),
            prop::collection::vec((inner, any::<bool>()), 0..4).prop_map(record_of),
        ]
    })
}

fn document_schema() -> impl Strategy<Value = SchemaType> {
    prop::collection::vec((schema_type(), any::<bool>()), 1..5).prop_map(record_of)
}

/// A concrete key that the pattern should match.
fn concretize(path: &FieldPath, repr: IndexRepr) -> String {
    path.segments()
        .iter()
        .map(|s| match s {
            Segment::Key(k) => k.clone(),
            Segment::Index => match repr {
                IndexRepr::Numeric => "0".to_string(),
                IndexRepr::Positional => "$[]".to_string(),
                IndexRepr::Projection | IndexRepr::Omitted => "$".to_string(),
            },
            Segment::AnyKey => "k".to_string(),
            Segment::Rest => "x".to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

proptest! {
    #[test]
    fn every_flattened_path_resolves(ty in document_schema()) {
        let ctx = SchemaContext::document(&ty).unwrap();
        for repr in REPRS {
            let paths = ctx.paths(repr);
            prop_assert!(paths.contains("_id"));
            for pattern in paths.iter() {
                if repr == IndexRepr::Omitted {
                    prop_assert!(!pattern.segments().contains(&Segment::Index));
                }
                let key = concretize(pattern, repr);
                prop_assert!(ctx.lookup(&key, repr).is_some(), "{key} under {repr:?} in {ty}");
            }
        }
    }

    #[test]
    fn undeclared_top_level_keys_are_unknown(ty in document_schema()) {
        let ctx = SchemaContext::document(&ty).unwrap();
        for repr in REPRS {
            prop_assert!(ctx.lookup("zz_missing", repr).is_none());
            prop_assert!(!ctx.paths(repr).contains("f0.."));
        }
    }

    #[test]
    fn rendering_keeps_one_line_per_pattern(ty in document_schema()) {
        let ctx = SchemaContext::document(&ty).unwrap();
        let paths = ctx.paths(IndexRepr::Numeric);
        prop_assert_eq!(paths.rendered().len(), paths.len());
    }
}
