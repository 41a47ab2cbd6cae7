//! Data splits: addressable, optionally range-bounded slices of a table.

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;
use crate::range::KeyRange;
use crate::schema::Schema;
use crate::types::Key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplit {
    pub object_id: ObjectId,
    pub table_schema: Schema,
    /// Ordered comparison columns. Empty for unsorted data.
    pub key_columns: Vec<String>,
    /// Inclusive.
    pub lower_bound: Key,
    /// Exclusive; `<Max>` when unbounded.
    pub upper_bound: Key,
    /// Optional size hint used to pick a representative split.
    pub data_weight: Option<u64>,
}

impl DataSplit {
    /// Unbounded, unsorted split of `object_id`.
    pub fn new(object_id: ObjectId, table_schema: Schema) -> Self {
        Self {
            object_id,
            table_schema,
            key_columns: vec![],
            lower_bound: Key::min(),
            upper_bound: Key::max(),
            data_weight: None,
        }
    }

    pub fn with_key_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bounds(mut self, range: KeyRange) -> Self {
        self.set_bounds(range);
        self
    }

    pub fn with_data_weight(mut self, weight: u64) -> Self {
        self.data_weight = Some(weight);
        self
    }

    pub fn bounds(&self) -> KeyRange {
        KeyRange::new(self.lower_bound.clone(), self.upper_bound.clone())
    }

    pub fn set_bounds(&mut self, range: KeyRange) {
        self.lower_bound = range.lower;
        self.upper_bound = range.upper;
    }

    /// A split is sorted if it declares key columns.
    pub fn is_sorted(&self) -> bool {
        !self.key_columns.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_empty()
    }

    pub fn peer_index(&self) -> Option<usize> {
        self.object_id.peer_index()
    }
}
