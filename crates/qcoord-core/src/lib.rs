#![forbid(unsafe_code)]
//! qcoord-core: the leaf vocabulary shared by the planner and the coordinator.
//!
//! - strongly-typed ids (`ObjectId`, `FragmentId`, `ContextId`)
//! - logical schemas and scalar values with a total order
//! - keys, key ranges and the range algebra used for pruning
//! - `DataSplit`, the addressable handle to a slice of a table
//! - configuration, hashing, manifests and the error taxonomy
//!
//! No async, no I/O in here.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod range;
pub mod schema;
pub mod split;
pub mod types;

/// Version string recorded in coordination manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
