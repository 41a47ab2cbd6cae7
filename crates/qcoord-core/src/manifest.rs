//! Record of one successful coordination run, for audit and debugging.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::{hash_all, Hash256};
use crate::id::FragmentId;
use crate::range::KeyRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub index: usize,
    pub fragment: FragmentId,
    pub fingerprint: Hash256,
    /// Key range the peer's facade advertises.
    pub range: KeyRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationManifest {
    pub id: ManifestId,

    /// The fragment that was coordinated.
    pub fragment: FragmentId,

    /// Fingerprint of the residual coordinator plan.
    pub coordinator_fingerprint: Hash256,

    pub peers: Vec<PeerEntry>,

    /// Version string for provenance.
    pub engine_version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl CoordinationManifest {
    pub fn new(fragment: FragmentId, coordinator_fingerprint: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            fragment,
            coordinator_fingerprint,
            peers: vec![],
            engine_version: crate::VERSION.to_string(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn with_peer(mut self, entry: PeerEntry) -> Self {
        self.peers.push(entry);
        self
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }

    /// Single fingerprint over the coordinator plan and every peer, in order.
    pub fn plan_fingerprint(&self) -> Hash256 {
        hash_all(
            std::iter::once(&self.coordinator_fingerprint)
                .chain(self.peers.iter().map(|p| &p.fingerprint)),
        )
    }
}
