//! Shared test fixtures: a recording collaborator and split builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing_subscriber::EnvFilter;

use qcoord_core::error::BoxError;
use qcoord_core::id::{FragmentId, ObjectId, ObjectType};
use qcoord_core::range::KeyRange;
use qcoord_core::schema::{DataType, Field, Schema};
use qcoord_core::split::DataSplit;
use qcoord_core::types::Key;
use qcoord_exec::CoordinateCallbacks;
use qcoord_planner::PlanFragment;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn table_schema() -> Schema {
    Schema::new(vec![
        Field::new("k", DataType::Int64, false),
        Field::new("v", DataType::Int64, true),
        Field::new("name", DataType::Utf8, true),
    ])
}

pub fn table_id(counter: u32) -> ObjectId {
    ObjectId::new(ObjectType::Table, 1, counter, 0xfeed)
}

pub fn chunk_id(counter: u32) -> ObjectId {
    ObjectId::new(ObjectType::Chunk, 1, counter, 0xbeef)
}

/// Split sorted by `k` covering `[lower, upper)`.
pub fn sorted_split(id: ObjectId, lower: i64, upper: i64) -> DataSplit {
    DataSplit::new(id, table_schema())
        .with_key_columns(["k"])
        .with_bounds(KeyRange::new(Key::from(vec![lower]), Key::from(vec![upper])))
}

pub fn unsorted_split(id: ObjectId) -> DataSplit {
    DataSplit::new(id, table_schema())
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockReader {
    Local(ObjectId),
    Remote { fragment: FragmentId, hint: DataSplit },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SplitFurther(ObjectId),
    GetReader(ObjectId),
    Delegate(FragmentId),
}

/// Collaborator backed by a fixed table of splits. A split is splittable
/// iff it has an entry in `splits`.
#[derive(Default)]
pub struct MockCallbacks {
    splits: HashMap<ObjectId, Vec<DataSplit>>,
    fail_split: bool,
    fail_delegate_at: Option<usize>,
    calls: Mutex<Vec<Call>>,
}

impl MockCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_splits(mut self, id: ObjectId, splits: Vec<DataSplit>) -> Self {
        self.splits.insert(id, splits);
        self
    }

    pub fn failing_split(mut self) -> Self {
        self.fail_split = true;
        self
    }

    /// Fail the `n`-th delegate call (zero-based).
    pub fn failing_delegate_at(mut self, n: usize) -> Self {
        self.fail_delegate_at = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delegate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Delegate(_)))
            .count()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

impl CoordinateCallbacks for MockCallbacks {
    type Reader = MockReader;

    fn can_split(&self, split: &DataSplit) -> bool {
        self.splits.contains_key(&split.object_id)
    }

    fn split_further<'a>(
        &'a self,
        split: &'a DataSplit,
    ) -> BoxFuture<'a, Result<Vec<DataSplit>, BoxError>> {
        async move {
            self.record(Call::SplitFurther(split.object_id));
            tokio::task::yield_now().await;
            if self.fail_split {
                return Err(BoxError::from("partition service unavailable"));
            }
            Ok(self.splits.get(&split.object_id).cloned().unwrap_or_default())
        }
        .boxed()
    }

    fn get_reader(&self, split: &DataSplit) -> MockReader {
        self.record(Call::GetReader(split.object_id));
        MockReader::Local(split.object_id)
    }

    fn delegate<'a>(
        &'a self,
        fragment: &'a PlanFragment,
        hint: &'a DataSplit,
    ) -> BoxFuture<'a, Result<MockReader, BoxError>> {
        async move {
            let n = self.record(Call::Delegate(fragment.id()));
            tokio::task::yield_now().await;
            let delegated = self
                .calls()
                .iter()
                .take(n)
                .filter(|c| matches!(c, Call::Delegate(_)))
                .count();
            if self.fail_delegate_at == Some(delegated - 1) {
                return Err(BoxError::from("peer rejected fragment"));
            }
            Ok(MockReader::Remote {
                fragment: fragment.id(),
                hint: hint.clone(),
            })
        }
        .boxed()
    }
}
