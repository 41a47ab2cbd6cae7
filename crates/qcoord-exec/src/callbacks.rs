//! What the coordinator needs from the surrounding system.

use futures::future::BoxFuture;

use qcoord_core::error::BoxError;
use qcoord_core::split::DataSplit;
use qcoord_planner::PlanFragment;

/// Partition discovery, leaf-reader resolution and remote delegation.
///
/// Retrying failed calls is the implementor's business; the coordinator
/// aborts the run on the first error.
pub trait CoordinateCallbacks: Send + Sync {
    /// Handle through which rows of a split or a peer are read.
    type Reader: Clone + Send + Sync;

    /// Whether `split` may be broken into smaller splits.
    fn can_split(&self, split: &DataSplit) -> bool;

    /// Break `split` into sub-splits. Must yield at least one.
    fn split_further<'a>(
        &'a self,
        split: &'a DataSplit,
    ) -> BoxFuture<'a, Result<Vec<DataSplit>, BoxError>>;

    /// Reader for a split backed by real storage.
    fn get_reader(&self, split: &DataSplit) -> Self::Reader;

    /// Ship `fragment` for remote execution. `hint` is the fragment's
    /// heaviest split, with its tightened bounds.
    fn delegate<'a>(
        &'a self,
        fragment: &'a PlanFragment,
        hint: &'a DataSplit,
    ) -> BoxFuture<'a, Result<Self::Reader, BoxError>>;
}
