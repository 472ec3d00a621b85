use super::flatten::{flatten_document_paths, flatten_paths};
use super::segment::{FieldPath, IndexRepr};
use crate::schema::SchemaType;

/// The flattened paths of one type under one index representation.
#[derive(Debug, Clone)]
pub struct PathSet {
    patterns: Vec<FieldPath>,
    repr: IndexRepr,
}

impl PathSet {
    pub fn of(ty: &SchemaType, repr: IndexRepr) -> Self {
        Self { patterns: flatten_paths(ty, repr), repr }
    }

    pub fn of_document(ty: &SchemaType, repr: IndexRepr) -> Self {
        Self { patterns: flatten_document_paths(ty, repr), repr }
    }

    pub fn repr(&self) -> IndexRepr {
        self.repr
    }

    pub fn contains(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(key, self.repr))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.render(self.repr)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn contains_concrete_keys() {
        let t = SchemaType::record([
            Field::new("scores", SchemaType::array(SchemaType::Number)),
            Field::new("meta", SchemaType::map(SchemaType::Number)),
        ]);
        let set = PathSet::of_document(&t, IndexRepr::Numeric);
        assert!(set.contains("_id"));
        assert!(set.contains("scores.11"));
        assert!(set.contains("meta.anything"));
        assert!(!set.contains("meta.a.b"));
        assert!(!set.contains("scores.x"));
    }
}
