//! Strongly-typed identifiers used across the coordinator.
//!
//! Downstream crates should *not* pass raw integers around for ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Identity of a plan arena; operator handles carry it so they cannot be used
// against a foreign arena.
new_id!(ContextId);

/// Type tag of an addressable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub enum ObjectType {
    Table,
    Tablet,
    Chunk,
    /// Reserved tag: the counter holds the index of a coordinator peer.
    QueryPlan,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectType::Table => "table",
            ObjectType::Tablet => "tablet",
            ObjectType::Chunk => "chunk",
            ObjectType::QueryPlan => "query_plan",
        };
        f.write_str(s)
    }
}

/// Address of a storage object (or, with `ObjectType::QueryPlan`, of a peer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct ObjectId {
    kind: ObjectType,
    cell_tag: u16,
    counter: u32,
    hash: u32,
}

impl ObjectId {
    pub const fn new(kind: ObjectType, cell_tag: u16, counter: u32, hash: u32) -> Self {
        Self {
            kind,
            cell_tag,
            counter,
            hash,
        }
    }

    /// Id of the facade that stands for peer number `index`.
    pub fn peer(index: usize, cell_tag: u16) -> Self {
        let counter = u32::try_from(index)
            .unwrap_or_else(|_| panic!("peer index {index} does not fit into an object id"));
        Self::new(ObjectType::QueryPlan, cell_tag, counter, 0)
    }

    pub const fn kind(&self) -> ObjectType {
        self.kind
    }

    pub const fn cell_tag(&self) -> u16 {
        self.cell_tag
    }

    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub const fn hash(&self) -> u32 {
        self.hash
    }

    pub fn is_peer_reference(&self) -> bool {
        self.kind == ObjectType::QueryPlan
    }

    /// Peer index encoded in the id, if this is a peer reference.
    pub fn peer_index(&self) -> Option<usize> {
        self.is_peer_reference().then_some(self.counter as usize)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:x}-{:x}-{:x}",
            self.kind, self.cell_tag, self.counter, self.hash
        )
    }
}

/// Globally unique identity of a plan fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(pub Uuid);

impl FragmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
