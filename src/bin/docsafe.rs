use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use docsafe::cli::{self, Command, OutputMode, PathContext, Verdict};
use docsafe::config::{IndexMode, ValidationConfig};

#[derive(Parser, Debug)]
#[command(name = "docsafe", version, about = "Check database requests against a document schema", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Path to a config file (TOML). If omitted, DOCSAFE_CONFIG or ./docsafe.toml are tried.")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = Format::Human, help = "Output format")]
    format: Format,
    #[arg(long, global = true, help = "Accept paths missing from the schema without checking them")]
    tolerant: bool,
    #[arg(long, global = true, help = "Log to files in this directory")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level: error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Human,
    Plain,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Context {
    Filter,
    Update,
    Projection,
    Sort,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    #[command(name = "check-filter", about = "Check a query filter")]
    CheckFilter {
        #[arg(help = "Schema file (JSON SchemaType)")]
        schema: PathBuf,
        #[arg(help = "Filter JSON, or @file")]
        filter: String,
    },
    #[command(name = "check-update", about = "Check an update document")]
    CheckUpdate {
        #[arg(help = "Schema file (JSON SchemaType)")]
        schema: PathBuf,
        #[arg(help = "Update JSON, or @file")]
        update: String,
        #[arg(long, help = "Array filters JSON array, or @file")]
        array_filters: Option<String>,
    },
    #[command(name = "check-projection", about = "Check a projection")]
    CheckProjection {
        schema: PathBuf,
        #[arg(help = "Projection JSON, or @file")]
        projection: String,
    },
    #[command(name = "check-sort", about = "Check a sort specification")]
    CheckSort {
        schema: PathBuf,
        #[arg(help = "Sort JSON, or @file")]
        sort: String,
    },
    #[command(name = "check-pipeline", about = "Check an aggregation pipeline")]
    CheckPipeline {
        schema: PathBuf,
        #[arg(help = "Pipeline JSON array, or @file")]
        pipeline: String,
        #[arg(long, help = "Schema of the collection named by $lookup")]
        lookup: Option<PathBuf>,
        #[arg(long, help = "Schema of the collection named by $unionWith")]
        union_with: Option<PathBuf>,
    },
    #[command(about = "List the dotted paths a schema accepts")]
    Paths {
        schema: PathBuf,
        #[arg(long, value_enum, default_value_t = Context::Filter)]
        context: Context,
    },
    #[command(about = "Show version, compiled features and effective configuration")]
    Info,
}

impl From<Cmd> for Command {
    fn from(cmd: Cmd) -> Self {
        match cmd {
            Cmd::CheckFilter { schema, filter } => Command::CheckFilter { schema, filter },
            Cmd::CheckUpdate { schema, update, array_filters } => Command::CheckUpdate { schema, update, array_filters },
            Cmd::CheckProjection { schema, projection } => Command::CheckProjection { schema, projection },
            Cmd::CheckSort { schema, sort } => Command::CheckSort { schema, sort },
            Cmd::CheckPipeline { schema, pipeline, lookup, union_with } => {
                Command::CheckPipeline { schema, pipeline, lookup, union_with }
            }
            Cmd::Paths { schema, context } => {
                let context = match context {
                    Context::Filter => PathContext::Filter,
                    Context::Update => PathContext::Update,
                    Context::Projection => PathContext::Projection,
                    Context::Sort => PathContext::Sort,
                };
                Command::Paths { schema, context }
            }
            Cmd::Info => Command::Info,
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if args.log_dir.is_some() || args.log_level.is_some() {
        if let Err(e) = docsafe::logger::configure_logging(args.log_dir.as_deref(), args.log_level.as_deref(), None) {
            eprintln!("logging disabled: {e}");
        }
    } else if std::env::var_os("DOCSAFE_LOG_DIR").is_some() {
        if let Err(e) = docsafe::logger::configure_from_env() {
            eprintln!("logging disabled: {e}");
        }
    }

    let mut config = match ValidationConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    if args.tolerant {
        config.index_mode = IndexMode::Tolerant;
    }
    let mode = match args.format {
        Format::Human => OutputMode::Human,
        Format::Plain => OutputMode::Plain,
        Format::Json => OutputMode::Json,
    };

    match cli::run(args.command.into(), &config, mode) {
        Ok(Verdict::Accepted) => ExitCode::SUCCESS,
        Ok(Verdict::Rejected(_)) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
