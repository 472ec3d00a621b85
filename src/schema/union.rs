use super::types::{Field, SchemaType};

/// Merges the record branches of every union in the tree into one record.
///
/// A field present in only some branches becomes optional; a field present
/// in all of them keeps `required` only when every branch requires it. The
/// merged field type is the union of the branch types. Non-record branches
/// are kept beside the merged record.
pub fn normalize(ty: &SchemaType) -> SchemaType {
    match ty {
        SchemaType::Union { variants } => {
            let normalized: Vec<SchemaType> = variants.iter().map(normalize).collect();
            merge_records(normalized)
        }
        SchemaType::Array { items } => SchemaType::array(normalize(items)),
        SchemaType::Tuple { items } => SchemaType::tuple(items.iter().map(normalize)),
        SchemaType::Map { values } => SchemaType::map(normalize(values)),
        SchemaType::Record { fields } => SchemaType::record(fields.iter().map(|f| Field {
            name: f.name.clone(),
            ty: normalize(&f.ty),
            required: f.required,
        })),
        other => other.clone(),
    }
}

fn merge_records(variants: Vec<SchemaType>) -> SchemaType {
    let flat = match SchemaType::union(variants) {
        SchemaType::Union { variants } => variants,
        single => return single,
    };
    let record_count = flat.iter().filter(|v| matches!(v, SchemaType::Record { .. })).count();
    if record_count < 2 {
        return SchemaType::Union { variants: flat };
    }

    let mut merged: Vec<(String, Vec<SchemaType>, bool, usize)> = Vec::new();
    let mut others = Vec::new();
    let mut record_pos = None;
    for (i, v) in flat.into_iter().enumerate() {
        let SchemaType::Record { fields } = v else {
            others.push(v);
            continue;
        };
        record_pos.get_or_insert(i);
        for f in fields {
            match merged.iter_mut().find(|(name, ..)| *name == f.name) {
                Some((_, tys, required, seen)) => {
                    if !tys.contains(&f.ty) {
                        tys.push(f.ty);
                    }
                    *required &= f.required;
                    *seen += 1;
                }
                None => merged.push((f.name, vec![f.ty], f.required, 1)),
            }
        }
    }

    let record = SchemaType::record(merged.into_iter().map(|(name, tys, required, seen)| {
        // Merging can bring nested records of the same name together again.
        let ty = merge_records(tys);
        Field { name, ty, required: required && seen == record_count }
    }));
    let pos = record_pos.unwrap_or(0).min(others.len());
    others.insert(pos, record);
    SchemaType::union(others)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminated_union_becomes_one_record() {
        let t = SchemaType::tagged_union(
            "type",
            [
                ("a", vec![Field::new("bar", SchemaType::String)]),
                ("b", vec![Field::new("baz", SchemaType::Number)]),
            ],
        );
        let merged = normalize(&t);
        assert_eq!(
            merged,
            SchemaType::record([
                Field::new("type", SchemaType::union([SchemaType::literal("a"), SchemaType::literal("b")])),
                Field::optional("bar", SchemaType::String),
                Field::optional("baz", SchemaType::Number),
            ])
        );
    }

    #[test]
    fn non_record_branches_survive() {
        let t = SchemaType::union([
            SchemaType::Null,
            SchemaType::record([Field::new("a", SchemaType::Number)]),
            SchemaType::record([Field::new("a", SchemaType::String)]),
        ]);
        let merged = normalize(&t);
        assert_eq!(
            merged,
            SchemaType::union([
                SchemaType::Null,
                SchemaType::record([Field::new(
                    "a",
                    SchemaType::union([SchemaType::Number, SchemaType::String])
                )]),
            ])
        );
    }
}
