use bson::{Bson, Document};

use super::{Env, FieldRef, OperatorFamily};
use crate::errors::ShapeError;
use crate::path::join;
use crate::schema::{SchemaType, bson_kind};

const REGEX_FLAGS: &str = "imxsu";

/// `$regex`, `$options` and `$text` on string fields.
pub(super) struct StringOps;

impl OperatorFamily for StringOps {
    fn name(&self) -> &'static str {
        "string"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["$regex", "$options", "$text"]
    }

    fn applies(&self, ty: &SchemaType) -> bool {
        !matches!(ty, SchemaType::Any) && ty.is_stringish()
    }

    fn check(&self, env: &Env<'_>, field: FieldRef<'_>, op: &str, value: &Bson) -> Result<(), ShapeError> {
        let path = join(field.path, op);
        match op {
            "$regex" => match value {
                Bson::String(pattern) => check_pattern(env, &path, pattern),
                Bson::RegularExpression(_) => Ok(()),
                other => Err(ShapeError::mismatch(&path, "string or regex", bson_kind(other))),
            },
            "$options" => match value {
                Bson::String(flags) => match flags.chars().find(|c| !REGEX_FLAGS.contains(*c)) {
                    Some(c) => Err(ShapeError::invalid(&path, format!("unknown regex option '{c}'"))),
                    None => Ok(()),
                },
                other => Err(ShapeError::mismatch(&path, "string", bson_kind(other))),
            },
            _ => check_text_search(&path, value),
        }
    }

    fn check_document(&self, field: FieldRef<'_>, doc: &Document) -> Result<(), ShapeError> {
        if doc.contains_key("$options") && !doc.contains_key("$regex") {
            return Err(ShapeError::MissingKey { path: field.path.to_string(), key: "$regex".into() });
        }
        Ok(())
    }
}

/// `{ $search, $language?, $caseSensitive?, $diacriticSensitive? }`.
pub(crate) fn check_text_search(path: &str, value: &Bson) -> Result<(), ShapeError> {
    let Bson::Document(doc) = value else {
        return Err(ShapeError::mismatch(path, "text search document", bson_kind(value)));
    };
    if !doc.contains_key("$search") {
        return Err(ShapeError::MissingKey { path: path.to_string(), key: "$search".into() });
    }
    for (key, v) in doc {
        let ok = match key.as_str() {
            "$search" | "$language" => matches!(v, Bson::String(_)),
            "$caseSensitive" | "$diacriticSensitive" => matches!(v, Bson::Boolean(_)),
            _ => return Err(ShapeError::UnknownKey { path: path.to_string(), key: key.clone() }),
        };
        if !ok {
            let expected = if key == "$search" || key == "$language" { "string" } else { "boolean" };
            return Err(ShapeError::mismatch(&join(path, key), expected, bson_kind(v)));
        }
    }
    Ok(())
}

#[cfg(feature = "regex")]
fn check_pattern(env: &Env<'_>, path: &str, pattern: &str) -> Result<(), ShapeError> {
    if !env.config.regex_check {
        return Ok(());
    }
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ShapeError::invalid(path, format!("invalid regular expression: {e}")))
}

#[cfg(not(feature = "regex"))]
fn check_pattern(_env: &Env<'_>, _path: &str, _pattern: &str) -> Result<(), ShapeError> {
    Ok(())
}
