use bson::Bson;

use crate::config::ValidationConfig;
use crate::errors::ShapeError;
use crate::ops::Env;
use crate::query::{FilterChecker, ProjectionChecker, SortChecker};
use crate::schema::{SchemaContext, as_integer, bson_kind};

pub(super) fn check_match(env: &Env<'_>, ctx: &SchemaContext, config: &ValidationConfig, body: &Bson) -> Result<(), ShapeError> {
    match body {
        Bson::Document(filter) => FilterChecker::new(ctx, config).check_at(env, filter),
        other => Err(ShapeError::mismatch("$match", "filter document", bson_kind(other))),
    }
}

pub(super) fn check_project(ctx: &SchemaContext, config: &ValidationConfig, body: &Bson) -> Result<(), ShapeError> {
    match body {
        Bson::Document(p) if !p.is_empty() => ProjectionChecker::new(ctx, config).check_quiet(p),
        Bson::Document(_) => Err(ShapeError::invalid("$project", "projection is empty")),
        other => Err(ShapeError::mismatch("$project", "projection document", bson_kind(other))),
    }
}

pub(super) fn check_sort(ctx: &SchemaContext, config: &ValidationConfig, body: &Bson) -> Result<(), ShapeError> {
    match body {
        Bson::Document(s) if !s.is_empty() => SortChecker::new(ctx, config).check_quiet(s),
        Bson::Document(_) => Err(ShapeError::invalid("$sort", "sort is empty")),
        other => Err(ShapeError::mismatch("$sort", "sort document", bson_kind(other))),
    }
}

pub(super) fn check_limit(body: &Bson) -> Result<(), ShapeError> {
    match as_integer(body) {
        Some(n) if n > 0 => Ok(()),
        Some(_) => Err(ShapeError::invalid("$limit", "must be positive")),
        None => Err(ShapeError::mismatch("$limit", "positive integer", bson_kind(body))),
    }
}

pub(super) fn check_skip(body: &Bson) -> Result<(), ShapeError> {
    match as_integer(body) {
        Some(n) if n >= 0 => Ok(()),
        Some(_) => Err(ShapeError::invalid("$skip", "must not be negative")),
        None => Err(ShapeError::mismatch("$skip", "non-negative integer", bson_kind(body))),
    }
}
