//! Scalar values and row-prefix keys.
//!
//! Keys are compared lexicographically, component by component; a shorter
//! prefix sorts before every key it is a prefix of. Scalars carry a total
//! order across types so that mixed-type key columns and the `Min`/`Max`
//! sentinels can always be compared:
//!
//! `Min < Null < integers < floats < booleans < strings < binaries < Max`

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::DataType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    /// Sentinel below every value.
    Min,
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    /// Sentinel above every value.
    Max,
}

impl Scalar {
    /// `None` for `Null` and the sentinels, which carry no type.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Scalar::Min | Scalar::Null | Scalar::Max => None,
            Scalar::Bool(_) => Some(DataType::Boolean),
            Scalar::I32(_) => Some(DataType::Int32),
            Scalar::I64(_) => Some(DataType::Int64),
            Scalar::F32(_) => Some(DataType::Float32),
            Scalar::F64(_) => Some(DataType::Float64),
            Scalar::Str(_) => Some(DataType::Utf8),
            Scalar::Bin(_) => Some(DataType::Binary),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Scalar::Min | Scalar::Max)
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Min => 0,
            Scalar::Null => 1,
            Scalar::I32(_) | Scalar::I64(_) => 2,
            Scalar::F32(_) | Scalar::F64(_) => 3,
            Scalar::Bool(_) => 4,
            Scalar::Str(_) => 5,
            Scalar::Bin(_) => 6,
            Scalar::Max => 7,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::I32(v) => Some(i64::from(*v)),
            Scalar::I64(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::F32(v) => Some(f64::from(*v)),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            (Scalar::Bin(a), Scalar::Bin(b)) => a.cmp(b),
            _ => {
                if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
                    a.cmp(&b)
                } else if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    a.total_cmp(&b)
                } else {
                    // Same rank, no payload: Min/Null/Max.
                    Ordering::Equal
                }
            }
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Min => f.write_str("<Min>"),
            Scalar::Null => f.write_str("#"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
            Scalar::Bin(v) => write!(f, "<{} bytes>", v.len()),
            Scalar::Max => f.write_str("<Max>"),
        }
    }
}

/// Row-prefix tuple used as a range bound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Vec<Scalar>);

impl Key {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self(values)
    }

    /// Smallest key: sorts before every row.
    pub fn min() -> Self {
        Self(vec![Scalar::Min])
    }

    /// Largest key: sorts after every row.
    pub fn max() -> Self {
        Self(vec![Scalar::Max])
    }

    pub fn values(&self) -> &[Scalar] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Key {
    fn from(values: Vec<T>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_bracket_every_value() {
        let values = [
            Scalar::Null,
            Scalar::I64(-5),
            Scalar::F64(1.5),
            Scalar::Bool(true),
            Scalar::from("abc"),
            Scalar::Bin(vec![1, 2]),
        ];
        for v in &values {
            assert!(Scalar::Min < *v, "{v} should sort after Min");
            assert!(*v < Scalar::Max, "{v} should sort before Max");
        }
    }

    #[test]
    fn integers_compare_across_widths() {
        assert_eq!(Scalar::I32(7), Scalar::I64(7));
        assert!(Scalar::I32(7) < Scalar::I64(8));
        assert!(Scalar::I64(i64::MAX) < Scalar::F64(f64::NEG_INFINITY));
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        let short = Key::from(vec![1i64]);
        let long = Key::from(vec![1i64, 0]);
        assert!(short < long);
        assert!(long < Key::from(vec![2i64]));
        assert!(Key::min() < short);
        assert!(long < Key::max());
    }
}
