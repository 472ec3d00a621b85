mod command;
mod runner;
mod util;

pub use command::{Command, PathContext};
pub use runner::{OutputMode, Verdict, run, run_to};
pub use util::{load_schema, parse_document, parse_documents};
