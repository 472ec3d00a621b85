use bson::Bson;

use super::types::{GEOJSON_KINDS, SchemaType};

/// Coarse traversal class of a schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Base,
    Array,
    Record,
    Map,
    Union,
}

pub fn classify(ty: &SchemaType) -> Kind {
    match ty {
        SchemaType::Array { .. } | SchemaType::Tuple { .. } => Kind::Array,
        SchemaType::Record { .. } => Kind::Record,
        SchemaType::Map { .. } => Kind::Map,
        SchemaType::Union { .. } => Kind::Union,
        _ => Kind::Base,
    }
}

impl SchemaType {
    /// True for leaf types; a union is base only when every branch is.
    pub fn is_base(&self) -> bool {
        match self {
            Self::Union { variants } => variants.iter().all(Self::is_base),
            other => classify(other) == Kind::Base,
        }
    }

    pub fn is_array(&self) -> bool {
        classify(self) == Kind::Array
    }

    /// A record, a map, or a union made only of those.
    pub fn is_record_like(&self) -> bool {
        match self {
            Self::Record { .. } | Self::Map { .. } => true,
            Self::Union { variants } => {
                !variants.is_empty() && variants.iter().all(Self::is_record_like)
            }
            _ => false,
        }
    }

    /// Element type of an array or tuple.
    pub fn array_element(&self) -> Option<SchemaType> {
        match self {
            Self::Array { items } => Some((**items).clone()),
            Self::Tuple { items } if items.is_empty() => Some(Self::Any),
            Self::Tuple { items } => Some(Self::union(items.iter().cloned())),
            _ => None,
        }
    }

    /// The type without its `null` branches. `null` itself stays `null`.
    pub fn non_null(&self) -> SchemaType {
        match self {
            Self::Union { variants } => {
                let kept: Vec<SchemaType> =
                    variants.iter().filter(|v| **v != Self::Null).cloned().collect();
                if kept.is_empty() { Self::Null } else { Self::union(kept) }
            }
            other => other.clone(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Null | Self::Any => true,
            Self::Union { variants } => variants.iter().any(Self::is_nullable),
            _ => false,
        }
    }

    /// Every branch satisfies `pred`; `Any` satisfies everything.
    pub fn all_branches(&self, pred: impl Fn(&SchemaType) -> bool + Copy) -> bool {
        match self {
            Self::Any => true,
            Self::Union { variants } => variants.iter().all(|v| v.all_branches(pred)),
            other => pred(other),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.all_branches(|t| match t {
            Self::Number | Self::Decimal128 => true,
            Self::Literal { value } => is_number(value),
            _ => false,
        })
    }

    /// Number, date or object id.
    pub fn is_orderable(&self) -> bool {
        self.all_branches(|t| match t {
            Self::Number | Self::Decimal128 | Self::Date | Self::ObjectId => true,
            Self::Literal { value } => is_number(value),
            _ => false,
        })
    }

    pub fn is_stringish(&self) -> bool {
        self.all_branches(|t| match t {
            Self::String => true,
            Self::Literal { value } => matches!(value, Bson::String(_)),
            _ => false,
        })
    }

    pub fn is_date_like(&self) -> bool {
        self.all_branches(|t| matches!(t, Self::Date | Self::Timestamp))
    }

    /// Recognizes legacy coordinate pairs and GeoJSON records.
    pub fn geo_shape(&self) -> Option<GeoShape> {
        match self {
            Self::Array { items } if items.is_numeric() && !matches!(**items, Self::Any) => {
                Some(GeoShape::Legacy)
            }
            Self::Tuple { items }
                if !items.is_empty() && items.iter().all(|t| t.is_numeric() && *t != Self::Any) =>
            {
                Some(GeoShape::Legacy)
            }
            Self::Record { .. } => geojson_kinds(self).map(|kinds| GeoShape::GeoJson { kinds }),
            Self::Union { .. } => match self.non_null() {
                Self::Union { variants } => {
                    let mut kinds = Vec::new();
                    for v in &variants {
                        match v.geo_shape()? {
                            GeoShape::GeoJson { kinds: k } => kinds.extend(k),
                            GeoShape::Legacy => return None,
                        }
                    }
                    Some(GeoShape::GeoJson { kinds })
                }
                inner => inner.geo_shape(),
            },
            _ => None,
        }
    }
}

/// How a geospatial field stores its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoShape {
    Legacy,
    GeoJson { kinds: Vec<String> },
}

impl GeoShape {
    /// Legacy pairs and GeoJSON points.
    pub fn is_point_like(&self) -> bool {
        match self {
            Self::Legacy => true,
            Self::GeoJson { kinds } => kinds.iter().all(|k| k == "Point"),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy)
    }
}

fn geojson_kinds(record: &SchemaType) -> Option<Vec<String>> {
    let tag = record.field("type")?;
    let names = literal_strings(&tag.ty.non_null())?;
    if names.is_empty() || !names.iter().all(|n| GEOJSON_KINDS.contains(&n.as_str())) {
        return None;
    }
    let has_collection = names.iter().any(|n| n == "GeometryCollection");
    let has_coords = names.iter().any(|n| n != "GeometryCollection");
    if has_coords && record.field("coordinates").is_none() {
        return None;
    }
    if has_collection && record.field("geometries").is_none() {
        return None;
    }
    Some(names)
}

fn literal_strings(ty: &SchemaType) -> Option<Vec<String>> {
    match ty {
        SchemaType::Literal { value: Bson::String(s) } => Some(vec![s.clone()]),
        SchemaType::Union { variants } => {
            let mut out = Vec::new();
            for v in variants {
                out.extend(literal_strings(v)?);
            }
            Some(out)
        }
        _ => None,
    }
}

pub(crate) fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Integral numbers only; doubles qualify when they have no fraction.
pub(crate) fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    #[test]
    fn unions_are_base_only_when_every_branch_is() {
        let mixed = SchemaType::union([
            SchemaType::String,
            SchemaType::record([Field::new("a", SchemaType::Number)]),
        ]);
        assert!(!mixed.is_base());
        assert!(SchemaType::String.nullable().is_base());
    }

    #[test]
    fn tuple_element_is_union_of_members() {
        let t = SchemaType::tuple([SchemaType::Number, SchemaType::String]);
        assert_eq!(
            t.array_element(),
            Some(SchemaType::union([SchemaType::Number, SchemaType::String]))
        );
    }

    #[test]
    fn geo_shapes_are_recognized() {
        assert_eq!(SchemaType::legacy_coordinates().geo_shape(), Some(GeoShape::Legacy));
        let point = SchemaType::geo_point().geo_shape().unwrap();
        assert!(point.is_point_like());
        let poly = SchemaType::geo_polygon().geo_shape().unwrap();
        assert!(!poly.is_point_like());
        assert_eq!(SchemaType::String.geo_shape(), None);
        assert_eq!(SchemaType::geo_point().nullable().geo_shape(), Some(point));
    }
}
