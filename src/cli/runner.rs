use std::io::Write;

use crate::config::ValidationConfig;
use crate::errors::{Error, ShapeError};
use crate::pipeline::{PipelineChecker, PipelineSchemas};
use crate::query::{FilterChecker, ProjectionChecker, SortChecker, UpdateChecker};

use super::command::Command;
use super::util::{load_schema, parse_document, parse_documents};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// The result of a check command. Usage and I/O problems are errors instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted,
    Rejected(ShapeError),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    fn from_check(result: Result<(), ShapeError>) -> Self {
        match result {
            Ok(()) => Self::Accepted,
            Err(e) => Self::Rejected(e),
        }
    }
}

pub fn run(cmd: Command, config: &ValidationConfig, mode: OutputMode) -> Result<Verdict, Error> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_to(cmd, config, mode, &mut out)
}

pub fn run_to(cmd: Command, config: &ValidationConfig, mode: OutputMode, out: &mut dyn Write) -> Result<Verdict, Error> {
    let verdict = match cmd {
        Command::CheckFilter { schema, filter } => {
            let ctx = load_schema(&schema)?;
            Verdict::from_check(FilterChecker::new(&ctx, config).check(&parse_document(&filter)?))
        }
        Command::CheckUpdate { schema, update, array_filters } => {
            let ctx = load_schema(&schema)?;
            let update = parse_document(&update)?;
            let filters = match array_filters {
                Some(af) => parse_documents(&af)?,
                None => Vec::new(),
            };
            Verdict::from_check(UpdateChecker::new(&ctx, config).check_with_array_filters(&update, &filters))
        }
        Command::CheckProjection { schema, projection } => {
            let ctx = load_schema(&schema)?;
            Verdict::from_check(ProjectionChecker::new(&ctx, config).check(&parse_document(&projection)?))
        }
        Command::CheckSort { schema, sort } => {
            let ctx = load_schema(&schema)?;
            Verdict::from_check(SortChecker::new(&ctx, config).check(&parse_document(&sort)?))
        }
        Command::CheckPipeline { schema, pipeline, lookup, union_with } => {
            let ctx = load_schema(&schema)?;
            let lookup = lookup.as_deref().map(load_schema).transpose()?;
            let union_with = union_with.as_deref().map(load_schema).transpose()?;
            let mut schemas = PipelineSchemas::new(&ctx);
            if let Some(l) = &lookup {
                schemas = schemas.with_lookup(l);
            }
            if let Some(u) = &union_with {
                schemas = schemas.with_union_with(u);
            }
            Verdict::from_check(PipelineChecker::new(schemas, config).check(&parse_documents(&pipeline)?))
        }
        Command::Paths { schema, context } => {
            let ctx = load_schema(&schema)?;
            let paths = ctx.paths(context.repr()).rendered();
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&paths)?)?,
                OutputMode::Plain | OutputMode::Human => {
                    for p in &paths {
                        writeln!(out, "{p}")?;
                    }
                }
            }
            return Ok(Verdict::Accepted);
        }
        Command::Info => {
            let report = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "features": crate::COMPILED_FEATURES,
                "config": config,
            });
            match mode {
                OutputMode::Json => writeln!(out, "{report}")?,
                OutputMode::Plain => writeln!(
                    out,
                    "version={} features={} index_mode={:?} max_depth={}",
                    env!("CARGO_PKG_VERSION"),
                    crate::COMPILED_FEATURES.join(","),
                    config.index_mode,
                    config.max_depth
                )?,
                OutputMode::Human => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
            }
            return Ok(Verdict::Accepted);
        }
    };
    report(&verdict, mode, out)?;
    Ok(verdict)
}

fn report(verdict: &Verdict, mode: OutputMode, out: &mut dyn Write) -> Result<(), Error> {
    match (verdict, mode) {
        (Verdict::Accepted, OutputMode::Json) => writeln!(out, "{}", serde_json::json!({ "accepted": true }))?,
        (Verdict::Accepted, OutputMode::Plain) => writeln!(out, "accepted")?,
        (Verdict::Accepted, OutputMode::Human) => writeln!(out, "ok")?,
        (Verdict::Rejected(e), OutputMode::Json) => {
            let json = serde_json::json!({ "accepted": false, "kind": e.root().kind(), "error": e.to_string() });
            writeln!(out, "{json}")?;
        }
        (Verdict::Rejected(e), OutputMode::Plain) => writeln!(out, "rejected kind={} error=\"{e}\"", e.root().kind())?,
        (Verdict::Rejected(e), OutputMode::Human) => writeln!(out, "rejected: {e}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_lists_version() {
        let mut buf = Vec::new();
        let v = run_to(Command::Info, &ValidationConfig::default(), OutputMode::Plain, &mut buf).unwrap();
        assert!(v.is_accepted());
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("version="));
    }
}
