use thiserror::Error;

/// A request document that does not fit the schema it is checked against.
///
/// Every variant carries the dotted path of the offending entry; top-level
/// problems use the empty path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("unknown path `{path}`")]
    UnknownPath { path: String },

    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String },

    #[error("operator `{operator}` is not applicable to `{path}` ({ty})")]
    OperatorIncompatible { path: String, operator: String, ty: String },

    #[error("unknown operator `{operator}` at `{path}`")]
    UnknownOperator { path: String, operator: String },

    #[error("unknown key `{key}` at `{path}`")]
    UnknownKey { path: String, key: String },

    #[error("mutually exclusive keys at `{path}`: {}", keys.join(", "))]
    MutuallyExclusive { path: String, keys: Vec<String> },

    #[error("missing key `{key}` at `{path}`")]
    MissingKey { path: String, key: String },

    #[error("projection mixes inclusion and exclusion at `{path}`")]
    MixedProjection { path: String },

    #[error("invalid value at `{path}`: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("stage {index} ({stage}): {source}")]
    InvalidStage { index: usize, stage: String, source: Box<ShapeError> },

    #[error("nesting deeper than {limit} at `{path}`")]
    DepthExceeded { path: String, limit: usize },

    #[error("more than {limit} entries at `{path}`")]
    LimitExceeded { path: String, limit: usize },
}

impl ShapeError {
    /// Short stable name of the variant, used by telemetry and audit lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownPath { .. } => "unknown_path",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::OperatorIncompatible { .. } => "operator_incompatible",
            Self::UnknownOperator { .. } => "unknown_operator",
            Self::UnknownKey { .. } => "unknown_key",
            Self::MutuallyExclusive { .. } => "mutually_exclusive",
            Self::MissingKey { .. } => "missing_key",
            Self::MixedProjection { .. } => "mixed_projection",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidStage { .. } => "invalid_stage",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::LimitExceeded { .. } => "limit_exceeded",
        }
    }

    /// The innermost error, looking through pipeline stage wrappers.
    pub fn root(&self) -> &ShapeError {
        match self {
            Self::InvalidStage { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn mismatch(path: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch { path: path.to_string(), expected: expected.into(), found: found.into() }
    }

    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { path: path.to_string(), reason: reason.into() }
    }

    pub(crate) fn incompatible(path: &str, operator: &str, ty: impl std::fmt::Display) -> Self {
        Self::OperatorIncompatible {
            path: path.to_string(),
            operator: operator.to_string(),
            ty: ty.to_string(),
        }
    }

    pub(crate) fn unknown_path(path: impl Into<String>) -> Self {
        Self::UnknownPath { path: path.into() }
    }
}

/// A schema that cannot be used for checking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid field name `{name}` in `{path}`: {reason}")]
    InvalidFieldName { path: String, name: String, reason: &'static str },

    #[error("duplicate field `{name}` in `{path}`")]
    DuplicateField { path: String, name: String },

    #[error("empty union in `{path}`")]
    EmptyUnion { path: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("driver: {0}")]
    Driver(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

impl Error {
    pub fn shape(&self) -> Option<&ShapeError> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_expose_their_root() {
        let inner = ShapeError::unknown_path("a.b");
        let err = ShapeError::InvalidStage {
            index: 2,
            stage: "$match".into(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(err.root(), &inner);
        assert_eq!(err.kind(), "invalid_stage");
        assert_eq!(err.to_string(), "stage 2 ($match): unknown path `a.b`");
    }

    #[test]
    fn mutually_exclusive_lists_keys() {
        let err = ShapeError::MutuallyExclusive {
            path: "loc".into(),
            keys: vec!["$near".into(), "$geoWithin".into()],
        };
        assert_eq!(err.to_string(), "mutually exclusive keys at `loc`: $near, $geoWithin");
    }
}
