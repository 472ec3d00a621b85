use std::path::PathBuf;

use crate::path::IndexRepr;

/// Which request the listed paths are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathContext {
    Filter,
    Update,
    Projection,
    Sort,
}

impl PathContext {
    pub fn repr(self) -> IndexRepr {
        match self {
            Self::Filter => IndexRepr::Numeric,
            Self::Update => IndexRepr::Positional,
            Self::Projection => IndexRepr::Projection,
            Self::Sort => IndexRepr::Omitted,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "filter" => Some(Self::Filter),
            "update" => Some(Self::Update),
            "projection" | "project" => Some(Self::Projection),
            "sort" => Some(Self::Sort),
            _ => None,
        }
    }
}

/// Request arguments are JSON text, or `@file` to read the JSON from a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CheckFilter { schema: PathBuf, filter: String },
    CheckUpdate { schema: PathBuf, update: String, array_filters: Option<String> },
    CheckProjection { schema: PathBuf, projection: String },
    CheckSort { schema: PathBuf, sort: String },
    CheckPipeline { schema: PathBuf, pipeline: String, lookup: Option<PathBuf>, union_with: Option<PathBuf> },
    Paths { schema: PathBuf, context: PathContext },
    Info,
}
