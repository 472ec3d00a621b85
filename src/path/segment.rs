use std::fmt;

/// One step of a flattened path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    /// An array position, spelled according to the [`IndexRepr`].
    Index,
    /// Any key of a map.
    AnyKey,
    /// Any non-empty remainder, below an `Any` type.
    Rest,
}

/// How array positions are written in a particular request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexRepr {
    /// Filters: canonical non-negative integers (`0`, `12`).
    Numeric,
    /// Updates: `$`, `$[]` and filtered `$[ident]`.
    Positional,
    /// Projections: `$`.
    Projection,
    /// Sorts and index keys: positions are never written.
    Omitted,
}

impl IndexRepr {
    /// Whether a single path token denotes an array position.
    pub fn accepts(self, token: &str) -> bool {
        match self {
            Self::Numeric => is_canonical_index(token),
            Self::Positional => {
                token == "$" || token == "$[]" || filtered_identifier(token).is_some()
            }
            Self::Projection => token == "$",
            Self::Omitted => false,
        }
    }

    /// Whether paths with the index left out are produced.
    pub fn omits_indexes(self) -> bool {
        matches!(self, Self::Omitted)
    }

    fn sample(self) -> &'static str {
        match self {
            Self::Numeric => "<n>",
            Self::Positional => "$[]",
            Self::Projection => "$",
            Self::Omitted => "",
        }
    }
}

fn is_canonical_index(token: &str) -> bool {
    match token.as_bytes() {
        [b'0'] => true,
        [first, rest @ ..] => {
            (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit) && token.len() <= 10
        }
        [] => false,
    }
}

/// The identifier of a filtered positional token `$[ident]`.
pub fn filtered_identifier(token: &str) -> Option<&str> {
    let ident = token.strip_prefix("$[")?.strip_suffix(']')?;
    let mut chars = ident.chars();
    let first = chars.next()?;
    (first.is_ascii_lowercase() && chars.all(|c| c.is_ascii_alphanumeric())).then_some(ident)
}

/// A flattened path pattern such as `tags.<n>` or `meta.*.score`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self(vec![Segment::Key(name.into())])
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn prepend(mut self, segment: Segment) -> Self {
        self.0.insert(0, segment);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Matches a concrete dotted key under the given representation.
    pub fn matches(&self, key: &str, repr: IndexRepr) -> bool {
        let tokens: Vec<&str> = key.split('.').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return false;
        }
        let mut i = 0;
        for seg in &self.0 {
            let Some(token) = tokens.get(i) else { return false };
            match seg {
                Segment::Key(k) => {
                    if k != token {
                        return false;
                    }
                }
                Segment::Index => {
                    if !repr.accepts(token) {
                        return false;
                    }
                }
                Segment::AnyKey => {
                    if token.starts_with('$') {
                        return false;
                    }
                }
                Segment::Rest => return true,
            }
            i += 1;
        }
        i == tokens.len()
    }

    /// Renders the pattern with a sample token for positions.
    pub fn render(&self, repr: IndexRepr) -> String {
        self.0
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index => repr.sample().to_string(),
                Segment::AnyKey => "*".to_string(),
                Segment::Rest => "**".to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(IndexRepr::Numeric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_indexes_are_canonical() {
        assert!(IndexRepr::Numeric.accepts("0"));
        assert!(IndexRepr::Numeric.accepts("42"));
        assert!(!IndexRepr::Numeric.accepts("01"));
        assert!(!IndexRepr::Numeric.accepts("-1"));
        assert!(!IndexRepr::Numeric.accepts("$"));
    }

    #[test]
    fn positional_tokens() {
        for t in ["$", "$[]", "$[elem]", "$[e2]"] {
            assert!(IndexRepr::Positional.accepts(t), "{t}");
        }
        for t in ["0", "$[]x", "$[Elem]", "$[]]"] {
            assert!(!IndexRepr::Positional.accepts(t), "{t}");
        }
        assert_eq!(filtered_identifier("$[item]"), Some("item"));
    }

    #[test]
    fn pattern_matching() {
        let p = FieldPath::new(vec![Segment::Key("tags".into()), Segment::Index]);
        assert!(p.matches("tags.3", IndexRepr::Numeric));
        assert!(!p.matches("tags", IndexRepr::Numeric));
        assert!(!p.matches("tags.3.x", IndexRepr::Numeric));
        assert!(p.matches("tags.$", IndexRepr::Projection));

        let rest = FieldPath::new(vec![Segment::Key("extra".into()), Segment::Rest]);
        assert!(rest.matches("extra.a.b", IndexRepr::Numeric));
        assert!(!rest.matches("extra", IndexRepr::Numeric));
        assert!(!rest.matches("extra..a", IndexRepr::Numeric));
    }
}
