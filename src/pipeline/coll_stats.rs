use bson::Bson;

use crate::errors::ShapeError;
use crate::schema::{as_f64, bson_kind};

pub(super) fn check_coll_stats(body: &Bson) -> Result<(), ShapeError> {
    let Bson::Document(doc) = body else {
        return Err(ShapeError::mismatch("$collStats", "options document", bson_kind(body)));
    };
    for (key, value) in doc {
        let at = format!("$collStats.{key}");
        let Bson::Document(inner) = value else {
            return Err(ShapeError::mismatch(&at, "document", bson_kind(value)));
        };
        match key.as_str() {
            "latencyStats" => {
                for (k, v) in inner {
                    if k != "histograms" {
                        return Err(ShapeError::UnknownKey { path: at, key: k.clone() });
                    }
                    if !matches!(v, Bson::Boolean(_)) {
                        return Err(ShapeError::mismatch(&format!("{at}.histograms"), "boolean", bson_kind(v)));
                    }
                }
            }
            "storageStats" => {
                for (k, v) in inner {
                    if k != "scale" {
                        return Err(ShapeError::UnknownKey { path: at, key: k.clone() });
                    }
                    if !as_f64(v).is_some_and(|s| s >= 1.0) {
                        return Err(ShapeError::mismatch(&format!("{at}.scale"), "number >= 1", bson_kind(v)));
                    }
                }
            }
            "count" | "queryExecStats" => {
                if !inner.is_empty() {
                    return Err(ShapeError::invalid(&at, "takes an empty document"));
                }
            }
            other => return Err(ShapeError::UnknownKey { path: "$collStats".into(), key: other.to_string() }),
        }
    }
    Ok(())
}
