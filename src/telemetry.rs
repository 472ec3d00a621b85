use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ShapeError;

/// Which checker produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Filter,
    Update,
    Projection,
    Sort,
    Pipeline,
    Index,
}

impl CheckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Update => "update",
            Self::Projection => "projection",
            Self::Sort => "sort",
            Self::Pipeline => "pipeline",
            Self::Index => "index",
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub checks_total: AtomicU64,
    pub rejections_total: AtomicU64,
    pub unknown_path_total: AtomicU64,
    pub type_mismatch_total: AtomicU64,
    pub operator_total: AtomicU64,
    pub exclusive_total: AtomicU64,
    pub stage_total: AtomicU64,
    pub limit_total: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub metrics: Metrics,
    // Tests capture audit lines in memory
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: LazyLock<Telemetry> = LazyLock::new(Telemetry::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub checks_total: u64,
    pub rejections_total: u64,
    pub unknown_path_total: u64,
    pub type_mismatch_total: u64,
    pub operator_total: u64,
    pub exclusive_total: u64,
    pub stage_total: u64,
    pub limit_total: u64,
}

pub fn snapshot() -> MetricsSnapshot {
    let m = &TELEMETRY.metrics;
    MetricsSnapshot {
        checks_total: m.checks_total.load(Ordering::Relaxed),
        rejections_total: m.rejections_total.load(Ordering::Relaxed),
        unknown_path_total: m.unknown_path_total.load(Ordering::Relaxed),
        type_mismatch_total: m.type_mismatch_total.load(Ordering::Relaxed),
        operator_total: m.operator_total.load(Ordering::Relaxed),
        exclusive_total: m.exclusive_total.load(Ordering::Relaxed),
        stage_total: m.stage_total.load(Ordering::Relaxed),
        limit_total: m.limit_total.load(Ordering::Relaxed),
    }
}

/// Routes audit lines to `sink` in addition to the log.
pub fn set_audit_sink(sink: Option<Arc<RwLock<Vec<String>>>>) {
    *TELEMETRY.audit_sink.write() = sink;
}

/// Counts a check outcome and audits rejections.
pub(crate) fn record(kind: CheckKind, result: &Result<(), ShapeError>) {
    let m = &TELEMETRY.metrics;
    m.checks_total.fetch_add(1, Ordering::Relaxed);
    let Err(err) = result else {
        log::trace!("{} accepted", kind.as_str());
        return;
    };
    m.rejections_total.fetch_add(1, Ordering::Relaxed);
    let counter = match err.root() {
        ShapeError::UnknownPath { .. } | ShapeError::UnknownKey { .. } => &m.unknown_path_total,
        ShapeError::TypeMismatch { .. } | ShapeError::InvalidValue { .. } => &m.type_mismatch_total,
        ShapeError::OperatorIncompatible { .. } | ShapeError::UnknownOperator { .. } => &m.operator_total,
        ShapeError::MutuallyExclusive { .. }
        | ShapeError::MissingKey { .. }
        | ShapeError::MixedProjection { .. } => &m.exclusive_total,
        ShapeError::DepthExceeded { .. } | ShapeError::LimitExceeded { .. } => &m.limit_total,
        ShapeError::InvalidStage { .. } => &m.stage_total,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    if matches!(err, ShapeError::InvalidStage { .. }) {
        m.stage_total.fetch_add(1, Ordering::Relaxed);
    }
    audit(&format!("rejected {} kind={} error=\"{}\"", kind.as_str(), err.root().kind(), err));
}

pub(crate) fn audit(line: &str) {
    log::warn!(target: "docsafe::audit", "{line}");
    if let Some(sink) = TELEMETRY.audit_sink.read().as_ref() {
        sink.write().push(line.to_string());
    }
}
