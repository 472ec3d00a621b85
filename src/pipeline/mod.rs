//! Aggregation pipelines: a sequence of single-key stage documents, each
//! checked against the schema of the documents it reads.
//!
//! The supported stages are the ones listed in [`Stage`]; any other stage
//! name is rejected as an unknown operator.

mod change_stream;
mod coll_stats;
mod geo_near;
mod lookup;
mod output;
mod stages;

use bson::{Bson, Document};

use crate::config::ValidationConfig;
use crate::errors::ShapeError;
use crate::ops::Env;
use crate::schema::{SchemaContext, bson_kind};
use crate::telemetry::{self, CheckKind};

pub use change_stream::check_change_stream_options;

/// Schemas a pipeline may refer to. Missing secondaries accept any path.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSchemas<'s> {
    pub primary: &'s SchemaContext,
    pub lookup: Option<&'s SchemaContext>,
    pub union_with: Option<&'s SchemaContext>,
}

impl<'s> PipelineSchemas<'s> {
    pub fn new(primary: &'s SchemaContext) -> Self {
        Self { primary, lookup: None, union_with: None }
    }

    pub fn with_lookup(mut self, lookup: &'s SchemaContext) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_union_with(mut self, union_with: &'s SchemaContext) -> Self {
        self.union_with = Some(union_with);
        self
    }

    pub(crate) fn lookup(&self) -> &'s SchemaContext {
        self.lookup.unwrap_or_else(|| SchemaContext::any())
    }

    pub(crate) fn union_with(&self) -> &'s SchemaContext {
        self.union_with.unwrap_or_else(|| SchemaContext::any())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Match,
    Project,
    Sort,
    Limit,
    Skip,
    Lookup,
    CollStats,
    ChangeStream,
    GeoNear,
    UnionWith,
    Out,
    Merge,
}

impl Stage {
    pub const ALL: [Stage; 12] = [
        Stage::Match,
        Stage::Project,
        Stage::Sort,
        Stage::Limit,
        Stage::Skip,
        Stage::Lookup,
        Stage::CollStats,
        Stage::ChangeStream,
        Stage::GeoNear,
        Stage::UnionWith,
        Stage::Out,
        Stage::Merge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Match => "$match",
            Self::Project => "$project",
            Self::Sort => "$sort",
            Self::Limit => "$limit",
            Self::Skip => "$skip",
            Self::Lookup => "$lookup",
            Self::CollStats => "$collStats",
            Self::ChangeStream => "$changeStream",
            Self::GeoNear => "$geoNear",
            Self::UnionWith => "$unionWith",
            Self::Out => "$out",
            Self::Merge => "$merge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Stages that must open the pipeline.
    pub fn first_only(self) -> bool {
        matches!(self, Self::CollStats | Self::ChangeStream | Self::GeoNear)
    }

    /// Stages that write results and must close the pipeline.
    pub fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::Merge)
    }
}

/// Checks aggregation pipelines.
pub struct PipelineChecker<'s> {
    schemas: PipelineSchemas<'s>,
    config: &'s ValidationConfig,
}

impl<'s> PipelineChecker<'s> {
    pub fn new(schemas: PipelineSchemas<'s>, config: &'s ValidationConfig) -> Self {
        Self { schemas, config }
    }

    /// # Errors
    /// `InvalidStage` wrapping the first problem, with the stage's index
    /// and name.
    pub fn check(&self, pipeline: &[Document]) -> Result<(), ShapeError> {
        let result = self.check_at(&Env::new(self.config), pipeline, true);
        telemetry::record(CheckKind::Pipeline, &result);
        result
    }

    pub(crate) fn check_at(&self, env: &Env<'_>, pipeline: &[Document], allow_output: bool) -> Result<(), ShapeError> {
        let last = pipeline.len().saturating_sub(1);
        for (index, stage_doc) in pipeline.iter().enumerate() {
            let (name, body) = single_key(stage_doc).map_err(|e| wrap(index, "<stage>", e))?;
            let stage = Stage::from_name(name).ok_or_else(|| {
                wrap(index, name, ShapeError::UnknownOperator { path: String::new(), operator: name.to_string() })
            })?;
            let misplaced = if stage.first_only() && index != 0 {
                Some("must be the first stage")
            } else if stage.is_output() && !allow_output {
                Some("output stages are not allowed in a sub-pipeline")
            } else if stage.is_output() && index != last {
                Some("must be the last stage")
            } else {
                None
            };
            if let Some(reason) = misplaced {
                return Err(wrap(index, name, ShapeError::invalid(name, reason)));
            }
            self.check_stage(env, stage, body).map_err(|e| wrap(index, name, e))?;
        }
        Ok(())
    }

    fn check_stage(&self, env: &Env<'_>, stage: Stage, body: &Bson) -> Result<(), ShapeError> {
        let primary = self.schemas.primary;
        match stage {
            Stage::Match => stages::check_match(env, primary, self.config, body),
            Stage::Project => stages::check_project(primary, self.config, body),
            Stage::Sort => stages::check_sort(primary, self.config, body),
            Stage::Limit => stages::check_limit(body),
            Stage::Skip => stages::check_skip(body),
            Stage::Lookup => lookup::check_lookup(primary, self.schemas.lookup(), self.config, body),
            Stage::CollStats => coll_stats::check_coll_stats(body),
            Stage::ChangeStream => change_stream::check_change_stream(body),
            Stage::GeoNear => geo_near::check_geo_near(env, primary, self.config, body),
            Stage::UnionWith => self.check_union_with(env, body),
            Stage::Out => output::check_out(body),
            Stage::Merge => output::check_merge(body),
        }
    }

    fn check_union_with(&self, env: &Env<'_>, body: &Bson) -> Result<(), ShapeError> {
        let doc = match body {
            Bson::String(_) => return Ok(()),
            Bson::Document(d) => d,
            other => return Err(ShapeError::mismatch("$unionWith", "collection name or document", bson_kind(other))),
        };
        for key in doc.keys() {
            if key != "coll" && key != "pipeline" {
                return Err(ShapeError::UnknownKey { path: "$unionWith".into(), key: key.clone() });
            }
        }
        match doc.get("coll") {
            Some(Bson::String(_)) => {}
            Some(other) => return Err(ShapeError::mismatch("$unionWith.coll", "string", bson_kind(other))),
            None => return Err(ShapeError::MissingKey { path: "$unionWith".into(), key: "coll".into() }),
        }
        let Some(sub) = doc.get("pipeline") else { return Ok(()) };
        let stages = stage_list("$unionWith.pipeline", sub)?;
        let nested = PipelineChecker::new(PipelineSchemas::new(self.schemas.union_with()), self.config);
        nested.check_at(&env.deeper("$unionWith.pipeline")?, &stages, false)
    }
}

fn wrap(index: usize, stage: &str, source: ShapeError) -> ShapeError {
    ShapeError::InvalidStage { index, stage: stage.to_string(), source: Box::new(source) }
}

fn single_key(stage: &Document) -> Result<(&str, &Bson), ShapeError> {
    let mut iter = stage.iter();
    match (iter.next(), iter.next()) {
        (Some((k, v)), None) => Ok((k.as_str(), v)),
        (None, _) => Err(ShapeError::invalid("", "empty stage document")),
        (Some(_), Some(_)) => Err(ShapeError::invalid("", "a stage document has exactly one key")),
    }
}

pub(crate) fn stage_list(path: &str, value: &Bson) -> Result<Vec<Document>, ShapeError> {
    let Bson::Array(items) = value else {
        return Err(ShapeError::mismatch(path, "array of stages", bson_kind(value)));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, s)| match s {
            Bson::Document(d) => Ok(d.clone()),
            other => Err(ShapeError::mismatch(&format!("{path}.{i}"), "stage document", bson_kind(other))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for s in Stage::ALL {
            assert_eq!(Stage::from_name(s.name()), Some(s));
        }
        assert_eq!(Stage::from_name("$group"), None);
    }
}
