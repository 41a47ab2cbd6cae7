#![forbid(unsafe_code)]
//! qcoord-exec: the coordinate controller.
//!
//! A run takes one plan fragment through six passes, strictly in order:
//!
//! 1. SplitFurther: ask the collaborator to split every splittable scan.
//! 2. PushdownFilters: move filters below unions.
//! 3. PushdownProjects: move projections below unions.
//! 4. PushdownGroups: split groupings into partial (per branch) and final.
//! 5. DistributeToPeers: turn every union branch into a peer fragment and
//!    leave a facade scan in its place.
//! 6. InitializeReaders: delegate each peer and keep the returned reader.
//!
//! The result is a `Coordination`: the residual coordinator fragment, the
//! ordered peers and the address-resolution helpers.

pub mod callbacks;
pub mod controller;
pub mod passes;

pub use callbacks::CoordinateCallbacks;
pub use controller::{CoordinateController, Coordination, Peer};
