use super::segment::{FieldPath, IndexRepr, Segment};
use crate::schema::SchemaType;

/// Every dotted path that names a value inside `ty`.
///
/// Arrays contribute their position (`[Index]`, `[Index, ..]`); arrays of
/// records additionally expose the element paths with the position left
/// out. Under [`IndexRepr::Omitted`] only the omitted form exists.
pub fn flatten_paths(ty: &SchemaType, repr: IndexRepr) -> Vec<FieldPath> {
    let mut out = Vec::new();
    collect(ty, repr, &mut out);
    dedup(out)
}

/// Like [`flatten_paths`] for a stored document: `_id` always exists.
pub fn flatten_document_paths(ty: &SchemaType, repr: IndexRepr) -> Vec<FieldPath> {
    let mut out = flatten_paths(ty, repr);
    let id = FieldPath::key("_id");
    if !out.contains(&id) && !matches!(ty, SchemaType::Any) {
        out.insert(0, id);
    }
    out
}

fn collect(ty: &SchemaType, repr: IndexRepr, out: &mut Vec<FieldPath>) {
    match ty {
        SchemaType::Any => out.push(FieldPath::new(vec![Segment::Rest])),
        SchemaType::Record { fields } => {
            for f in fields {
                out.push(FieldPath::key(f.name.clone()));
                for sub in flatten_paths(&f.ty, repr) {
                    out.push(sub.prepend(Segment::Key(f.name.clone())));
                }
            }
        }
        SchemaType::Map { values } => {
            out.push(FieldPath::new(vec![Segment::AnyKey]));
            for sub in flatten_paths(values, repr) {
                out.push(sub.prepend(Segment::AnyKey));
            }
        }
        SchemaType::Union { variants } => {
            for v in variants {
                collect(v, repr, out);
            }
        }
        SchemaType::Array { .. } | SchemaType::Tuple { .. } => {
            let Some(elem) = ty.array_element() else { return };
            let element_paths = flatten_paths(&elem, repr);
            if elem.is_record_like() {
                out.extend(element_paths.iter().cloned());
            }
            if !repr.omits_indexes() {
                out.push(FieldPath::new(vec![Segment::Index]));
                for sub in element_paths {
                    out.push(sub.prepend(Segment::Index));
                }
            }
        }
        _ => {}
    }
}

fn dedup(paths: Vec<FieldPath>) -> Vec<FieldPath> {
    let mut seen = std::collections::HashSet::with_capacity(paths.len());
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}
