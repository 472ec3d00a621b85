use std::collections::{BTreeMap, HashMap};

use super::types::SchemaType;

/// Rust types that know the schema of their BSON form.
///
/// Implemented for primitives, BSON value types and the std containers;
/// structs implement it with [`impl_schematic!`](crate::impl_schematic) or by
/// hand.
pub trait Schematic {
    fn schema() -> SchemaType;

    /// Whether a record field of this type may be absent.
    fn optional() -> bool {
        false
    }
}

macro_rules! leaf {
    ($variant:ident => $($t:ty),+ $(,)?) => {
        $(impl Schematic for $t {
            fn schema() -> SchemaType {
                SchemaType::$variant
            }
        })+
    };
}

leaf!(Number => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, usize, isize);
leaf!(String => String, &str, char);
leaf!(Boolean => bool);
leaf!(ObjectId => bson::oid::ObjectId);
leaf!(Date => bson::DateTime, chrono::DateTime<chrono::Utc>);
leaf!(Timestamp => bson::Timestamp);
leaf!(Decimal128 => bson::Decimal128);
leaf!(Binary => bson::Binary);
leaf!(Regex => bson::Regex);
leaf!(Any => bson::Bson);

impl Schematic for bson::Document {
    fn schema() -> SchemaType {
        SchemaType::map(SchemaType::Any)
    }
}

impl<T: Schematic> Schematic for Option<T> {
    fn schema() -> SchemaType {
        T::schema().nullable()
    }

    fn optional() -> bool {
        true
    }
}

impl<T: Schematic> Schematic for Vec<T> {
    fn schema() -> SchemaType {
        SchemaType::array(T::schema())
    }
}

impl<T: Schematic> Schematic for Box<T> {
    fn schema() -> SchemaType {
        T::schema()
    }

    fn optional() -> bool {
        T::optional()
    }
}

impl<T: Schematic, S> Schematic for HashMap<String, T, S> {
    fn schema() -> SchemaType {
        SchemaType::map(T::schema())
    }
}

impl<T: Schematic> Schematic for BTreeMap<String, T> {
    fn schema() -> SchemaType {
        SchemaType::map(T::schema())
    }
}

macro_rules! tuple {
    ($($name:ident),+) => {
        impl<$($name: Schematic),+> Schematic for ($($name,)+) {
            fn schema() -> SchemaType {
                SchemaType::tuple([$($name::schema()),+])
            }
        }
    };
}

tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);

/// Implements [`Schematic`] for a struct from its field list.
///
/// Field names are used as written; `Option` fields become optional and
/// nullable. A field whose BSON name differs can be renamed with `as`:
///
/// ```
/// use docsafe::impl_schematic;
///
/// struct User { name: String, age: Option<u32>, user_id: String }
/// impl_schematic!(User { name: String, age: Option<u32>, user_id as "userId": String });
/// ```
#[macro_export]
macro_rules! impl_schematic {
    (@name $field:ident $rename:literal) => { $rename };
    (@name $field:ident) => { stringify!($field) };
    ($ty:ty { $($field:ident $(as $rename:literal)? : $fty:ty),* $(,)? }) => {
        impl $crate::schema::Schematic for $ty {
            fn schema() -> $crate::schema::SchemaType {
                $crate::schema::SchemaType::record([
                    $($crate::schema::Field {
                        name: $crate::impl_schematic!(@name $field $($rename)?).to_string(),
                        ty: <$fty as $crate::schema::Schematic>::schema(),
                        required: !<$fty as $crate::schema::Schematic>::optional(),
                    }),*
                ])
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[allow(dead_code)]
    struct Inner {
        x: f64,
    }
    crate::impl_schematic!(Inner { x: f64 });

    #[allow(dead_code)]
    struct Outer {
        name: String,
        inner: Option<Inner>,
        tags: Vec<String>,
        created: bson::DateTime,
    }
    crate::impl_schematic!(Outer {
        name: String,
        inner: Option<Inner>,
        tags: Vec<String>,
        created as "createdAt": bson::DateTime,
    });

    #[test]
    fn struct_schema_from_macro() {
        assert_eq!(
            Outer::schema(),
            SchemaType::record([
                Field::new("name", SchemaType::String),
                Field::optional(
                    "inner",
                    SchemaType::record([Field::new("x", SchemaType::Number)]).nullable()
                ),
                Field::new("tags", SchemaType::array(SchemaType::String)),
                Field::new("createdAt", SchemaType::Date),
            ])
        );
    }

    #[test]
    fn containers_map_to_schema_shapes() {
        assert_eq!(<(f64, f64)>::schema(), SchemaType::legacy_coordinates());
        assert_eq!(
            <HashMap<String, i32>>::schema(),
            SchemaType::map(SchemaType::Number)
        );
        assert!(<Option<i32>>::optional());
    }
}
