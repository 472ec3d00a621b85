use bson::{Bson, Document};

use crate::errors::ShapeError;

/// A set of keys of which at most one (or exactly one) may appear.
///
/// Keys outside the set are ignored; callers check them separately.
#[derive(Debug, Clone, Copy)]
pub struct OneOf {
    options: &'static [&'static str],
    required: bool,
}

impl OneOf {
    pub const fn required(options: &'static [&'static str]) -> Self {
        Self { options, required: true }
    }

    pub const fn optional(options: &'static [&'static str]) -> Self {
        Self { options, required: false }
    }

    pub fn options(&self) -> &'static [&'static str] {
        self.options
    }

    /// The chosen key and its value.
    ///
    /// # Errors
    /// `MutuallyExclusive` when several options are present, `MissingKey`
    /// when a required group has none.
    pub fn select<'d>(&self, path: &str, doc: &'d Document) -> Result<Option<(&'static str, &'d Bson)>, ShapeError> {
        let present: Vec<&'static str> =
            self.options.iter().copied().filter(|k| doc.contains_key(k)).collect();
        match present.as_slice() {
            [] if self.required => Err(ShapeError::MissingKey {
                path: path.to_string(),
                key: self.options.join(" | "),
            }),
            [] => Ok(None),
            [one] => Ok(doc.get(one).map(|v| (*one, v))),
            many => Err(ShapeError::MutuallyExclusive {
                path: path.to_string(),
                keys: many.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }
}

/// `$push` / `$addToSet` modifier keys. `$addToSet` takes `$each` alone,
/// so for it the whole set is one group.
pub const ARRAY_MODIFIERS: OneOf = OneOf::optional(&["$each", "$position", "$slice", "$sort"]);
