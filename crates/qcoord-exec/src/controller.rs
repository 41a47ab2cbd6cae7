//! Coordinate controller: drives one plan fragment through the passes and
//! exposes the result.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, debug_span, error, trace, Instrument};

use qcoord_core::config::CoordinatorConfig;
use qcoord_core::error::{Error, Result};
use qcoord_core::manifest::{CoordinationManifest, PeerEntry};
use qcoord_core::split::DataSplit;
use qcoord_planner::explain::explain_subtree;
use qcoord_planner::{OperatorId, PlanContext, PlanFragment};

use crate::callbacks::CoordinateCallbacks;
use crate::passes;

/// One coordination run over `fragment`. Consumed by `run`.
pub struct CoordinateController<'a, C: CoordinateCallbacks> {
    callbacks: &'a C,
    fragment: PlanFragment,
    config: CoordinatorConfig,
}

impl<'a, C: CoordinateCallbacks> CoordinateController<'a, C> {
    pub fn new(callbacks: &'a C, fragment: PlanFragment) -> Self {
        Self::with_config(callbacks, fragment, CoordinatorConfig::default())
    }

    pub fn with_config(
        callbacks: &'a C,
        fragment: PlanFragment,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            callbacks,
            fragment,
            config,
        }
    }

    /// Run all passes. On failure nothing of the run survives; the error
    /// names the fragment and carries the cause.
    pub async fn run(self) -> Result<Coordination<'a, C>> {
        let fragment_id = self.fragment.id();
        let span = debug_span!("coordinate", fragment_id = %fragment_id);

        match self.coordinate().instrument(span).await {
            Ok(coordination) => Ok(coordination),
            Err(e) => {
                error!(
                    fragment_id = %fragment_id,
                    error = %e,
                    "Failed to coordinate plan fragment"
                );
                Err(Error::Coordinate {
                    fragment: fragment_id,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn coordinate(self) -> Result<Coordination<'a, C>> {
        let started_ms = now_millis();
        let config = &self.config;

        let mut context = PlanContext::new();
        let head = context.import_subtree(self.fragment.context(), self.fragment.head());
        self.explain_pass(&context, head, "input");

        let head =
            passes::split_further(self.callbacks, config.concurrent_split, &mut context, head)
                .await?;
        self.explain_pass(&context, head, "split_further");

        let head = passes::pushdown_filters(&mut context, head);
        self.explain_pass(&context, head, "pushdown_filters");

        let head = passes::pushdown_projects(&mut context, head);
        self.explain_pass(&context, head, "pushdown_projects");

        let head = passes::pushdown_groups(&mut context, head);
        self.explain_pass(&context, head, "pushdown_groups");

        let distribution = passes::distribute_to_peers(&mut context, head, config.peer_cell_tag);
        self.explain_pass(&context, distribution.head, "distribute_to_peers");

        let readers = passes::initialize_readers(
            self.callbacks,
            config.concurrent_delegate,
            &distribution.peers,
        )
        .await?;
        assert_eq!(
            readers.len(),
            distribution.peers.len(),
            "one reader per peer"
        );

        let coordinator = PlanFragment::with_id(context, distribution.head, self.fragment.id());
        let peers: Vec<Peer<C::Reader>> = distribution
            .peers
            .into_iter()
            .zip(readers)
            .map(|(fragment, reader)| Peer { fragment, reader })
            .collect();

        let mut manifest =
            CoordinationManifest::new(coordinator.id(), coordinator.fingerprint()?, started_ms);
        for (index, peer) in peers.iter().enumerate() {
            manifest = manifest.with_peer(PeerEntry {
                index,
                fragment: peer.fragment.id(),
                fingerprint: peer.fragment.fingerprint()?,
                range: peer.fragment.key_range(),
            });
        }
        let manifest = manifest.finish(now_millis());

        debug!(
            peers = peers.len(),
            fingerprint = %manifest.plan_fingerprint().short(),
            "Coordinated plan fragment"
        );

        Ok(Coordination {
            callbacks: self.callbacks,
            coordinator,
            peers,
            manifest,
        })
    }

    fn explain_pass(&self, context: &PlanContext, head: OperatorId, pass: &str) {
        if self.config.explain_passes {
            trace!(pass, plan = %explain_subtree(context, head), "Plan after pass");
        }
    }
}

/// A peer fragment and the reader its delegation returned.
#[derive(Debug, Clone)]
pub struct Peer<R> {
    fragment: PlanFragment,
    reader: R,
}

impl<R> Peer<R> {
    pub fn fragment(&self) -> &PlanFragment {
        &self.fragment
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

/// Frozen outcome of a successful run.
pub struct Coordination<'a, C: CoordinateCallbacks> {
    callbacks: &'a C,
    coordinator: PlanFragment,
    peers: Vec<Peer<C::Reader>>,
    manifest: CoordinationManifest,
}

impl<'a, C: CoordinateCallbacks> Coordination<'a, C> {
    /// The residual plan the coordinator evaluates itself.
    pub fn coordinator_fragment(&self) -> &PlanFragment {
        &self.coordinator
    }

    /// Peer fragments; the position of each is its peer index.
    pub fn peer_fragments(&self) -> Vec<&PlanFragment> {
        self.peers.iter().map(|p| &p.fragment).collect()
    }

    pub fn peers(&self) -> &[Peer<C::Reader>] {
        &self.peers
    }

    /// Index of the peer `split` stands for, or `None` for a split backed
    /// by real storage.
    ///
    /// Panics if `split` addresses a peer this run did not produce.
    pub fn peer_index(&self, split: &DataSplit) -> Option<usize> {
        let index = split.peer_index()?;
        assert!(
            index < self.peers.len(),
            "peer index {index} out of range ({} peers)",
            self.peers.len()
        );
        Some(index)
    }

    /// Reader for any scan of the coordinator plan, local or remote.
    pub fn get_reader(&self, split: &DataSplit) -> C::Reader {
        match self.peer_index(split) {
            Some(index) => self.peers[index].reader.clone(),
            None => {
                debug!(object_id = %split.object_id, "Creating reader");
                self.callbacks.get_reader(split)
            }
        }
    }

    pub fn manifest(&self) -> &CoordinationManifest {
        &self.manifest
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
