use super::segment::IndexRepr;
use crate::schema::SchemaType;

/// Outcome of looking a dotted path up in a type.
///
/// `NoMatch` is deliberately not a [`SchemaType`]: it never unifies with one.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Type(SchemaType),
    NoMatch,
}

impl Resolution {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Type(_))
    }

    pub fn into_type(self) -> Option<SchemaType> {
        match self {
            Self::Type(t) => Some(t),
            Self::NoMatch => None,
        }
    }
}

/// The type of the value a dotted path designates.
///
/// Lenient on purpose: a base type absorbs any remaining path, so callers
/// check membership in the flattened path set first.
pub fn resolve_type(ty: &SchemaType, path: &str, repr: IndexRepr) -> Resolution {
    if let SchemaType::Union { variants } = ty {
        let matched: Vec<SchemaType> = variants
            .iter()
            .filter_map(|v| resolve_type(v, path, repr).into_type())
            .collect();
        return if matched.is_empty() {
            Resolution::NoMatch
        } else {
            Resolution::Type(SchemaType::union(matched))
        };
    }
    if ty.is_base() {
        return Resolution::Type(ty.clone());
    }
    if let Some(found) = direct_key(ty, path) {
        return Resolution::Type(found);
    }
    if repr.accepts(path) {
        return match ty.array_element() {
            Some(elem) => Resolution::Type(elem),
            None => Resolution::NoMatch,
        };
    }
    if let Some((head, rest)) = path.split_once('.') {
        if repr.accepts(head) {
            if let Some(elem) = ty.array_element() {
                return resolve_type(&elem, rest, repr);
            }
        } else if let Some(found) = direct_key(ty, head) {
            let r = resolve_type(&found, rest, repr);
            if r.is_match() {
                return r;
            }
        }
    }
    // Index-omitted descent into an array of records.
    match ty.array_element() {
        Some(elem) if elem.is_record_like() => resolve_type(&elem, path, repr),
        _ => Resolution::NoMatch,
    }
}

/// Resolves `path` for a stored document, where `_id` always exists.
pub fn resolve_document_type(ty: &SchemaType, path: &str, repr: IndexRepr) -> Resolution {
    if path == "_id" && ty.field("_id").is_none() && !matches!(ty, SchemaType::Union { .. }) {
        return Resolution::Type(SchemaType::ObjectId);
    }
    resolve_type(ty, path, repr)
}

fn direct_key(ty: &SchemaType, key: &str) -> Option<SchemaType> {
    match ty {
        SchemaType::Record { fields } => fields.iter().find(|f| f.name == key).map(|f| {
            if f.required { f.ty.clone() } else { f.ty.clone().nullable() }
        }),
        SchemaType::Map { values } if !key.contains('.') && !key.starts_with('$') => {
            Some((**values).clone())
        }
        _ => None,
    }
}
