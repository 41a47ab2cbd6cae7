//! Convenient re-exports for downstream crates.

pub use crate::config::CoordinatorConfig;
pub use crate::error::{BoxError, Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{ContextId, FragmentId, ObjectId, ObjectType};
pub use crate::manifest::{CoordinationManifest, PeerEntry};
pub use crate::range::KeyRange;
pub use crate::schema::{DataType, Field, Schema};
pub use crate::split::DataSplit;
pub use crate::types::{Key, Scalar};
