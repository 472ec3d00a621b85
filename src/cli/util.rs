use std::path::Path;

use bson::Document;

use crate::errors::Error;
use crate::schema::{SchemaContext, SchemaType};

/// `@path` reads the argument from a file; anything else is taken as is.
pub fn read_arg(arg: &str) -> Result<String, Error> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(arg.to_string()),
    }
}

pub fn parse_document(arg: &str) -> Result<Document, Error> {
    Ok(serde_json::from_str::<Document>(&read_arg(arg)?)?)
}

pub fn parse_documents(arg: &str) -> Result<Vec<Document>, Error> {
    Ok(serde_json::from_str::<Vec<Document>>(&read_arg(arg)?)?)
}

/// Loads a JSON-encoded [`SchemaType`] as a document schema.
pub fn load_schema(path: &Path) -> Result<SchemaContext, Error> {
    let text = std::fs::read_to_string(path)?;
    let ty: SchemaType = serde_json::from_str(&text)?;
    Ok(SchemaContext::document(&ty)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_and_file_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.json");
        std::fs::write(&file, r#"{"a": 1}"#).unwrap();
        let from_file = parse_document(&format!("@{}", file.display())).unwrap();
        let inline = parse_document(r#"{"a": 1}"#).unwrap();
        assert_eq!(from_file, inline);
        assert!(parse_document("not json").is_err());
    }
}
