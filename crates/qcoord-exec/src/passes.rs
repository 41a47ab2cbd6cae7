//! The six coordination passes.
//!
//! Every pass takes the current head and returns a new one; nodes are only
//! ever appended to the context, so the previous tree stays intact and
//! shares every untouched subtree with the new one.

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::debug;

use qcoord_core::error::{Error, Result};
use qcoord_core::id::{FragmentId, ObjectId};
use qcoord_core::split::DataSplit;
use qcoord_planner::infer::{
    infer_key_columns, infer_key_range, infer_table_schema, references_peer,
};
use qcoord_planner::rewrite::count;
use qcoord_planner::{
    rewrite, visit_post_order, AggregateItem, GroupOperator, NamedExpr, Operator, OperatorId,
    PlanContext, PlanFragment,
};

use crate::callbacks::CoordinateCallbacks;

/// Rewrite
///   S
/// to
///   U -> { S1 ... Sk }
/// for every scan the collaborator agrees to split.
pub async fn split_further<C: CoordinateCallbacks>(
    callbacks: &C,
    concurrent: bool,
    context: &mut PlanContext,
    head: OperatorId,
) -> Result<OperatorId> {
    debug!("Splitting inputs");

    let mut candidates: Vec<(OperatorId, DataSplit)> = Vec::new();
    visit_post_order(context, head, |id, op| {
        if let Operator::Scan(scan) = op {
            if callbacks.can_split(&scan.data_split) {
                candidates.push((id, scan.data_split.clone()));
            }
        }
    });

    if candidates.is_empty() {
        return Ok(head);
    }

    let mut replacements: HashMap<OperatorId, Vec<DataSplit>> = HashMap::new();
    if concurrent {
        for (_, split) in &candidates {
            debug!(object_id = %split.object_id, "Splitting input");
        }
        let results = try_join_all(
            candidates
                .iter()
                .map(|(_, split)| call_split_further(callbacks, split)),
        )
        .await?;
        for ((id, split), splits) in candidates.iter().zip(results) {
            replacements.insert(*id, checked_splits(split, splits)?);
        }
    } else {
        for (id, split) in &candidates {
            debug!(object_id = %split.object_id, "Splitting input");
            let splits = call_split_further(callbacks, split).await?;
            replacements.insert(*id, checked_splits(split, splits)?);
        }
    }

    // Scans are leaves and keep their ids under rewrite, so the ids collected
    // above still name them.
    Ok(rewrite(context, head, |ctx, id| match replacements.remove(&id) {
        Some(splits) => {
            let scans = splits.into_iter().map(|split| ctx.scan(split)).collect();
            ctx.union(scans)
        }
        None => id,
    }))
}

async fn call_split_further<C: CoordinateCallbacks>(
    callbacks: &C,
    split: &DataSplit,
) -> Result<Vec<DataSplit>> {
    callbacks
        .split_further(split)
        .await
        .map_err(|e| Error::collaborator("split_further", e))
}

fn checked_splits(split: &DataSplit, splits: Vec<DataSplit>) -> Result<Vec<DataSplit>> {
    debug!(
        object_id = %split.object_id,
        count = splits.len(),
        "Got splits for input"
    );
    if splits.is_empty() {
        return Err(Error::InputEmpty(split.object_id));
    }
    Ok(splits)
}

/// Rewrite
///   F -> U -> { O1 ... Ok }
/// to
///   U -> { F -> O1 ... F -> Ok }
pub fn pushdown_filters(context: &mut PlanContext, head: OperatorId) -> OperatorId {
    debug!("Pushing down filter operators");
    rewrite(context, head, |ctx, id| {
        if matches!(ctx.get(id), Operator::Filter(_)) {
            push_through_union(ctx, id)
        } else {
            id
        }
    })
}

/// Rewrite
///   P -> U -> { O1 ... Ok }
/// to
///   U -> { P -> O1 ... P -> Ok }
pub fn pushdown_projects(context: &mut PlanContext, head: OperatorId) -> OperatorId {
    debug!("Pushing down project operators");
    rewrite(context, head, |ctx, id| {
        if matches!(ctx.get(id), Operator::Project(_)) {
            push_through_union(ctx, id)
        } else {
            id
        }
    })
}

/// Clone the unary operator `id` onto every branch of the union below it.
fn push_through_union(ctx: &mut PlanContext, id: OperatorId) -> OperatorId {
    let op = ctx.get(id).clone();
    let Some(branches) = op.source().and_then(|source| union_leaves(ctx, source)) else {
        return id;
    };
    let pushed = branches
        .into_iter()
        .map(|branch| ctx.add(op.with_sources(vec![branch])))
        .collect();
    ctx.union(pushed)
}

fn union_branches(ctx: &PlanContext, id: OperatorId) -> Option<Vec<OperatorId>> {
    ctx.get(id).as_union().map(|union| union.sources.clone())
}

/// Branches of the union `id` with directly nested unions expanded, so an
/// operator pushed onto them lands below every fan-out point at once.
fn union_leaves(ctx: &PlanContext, id: OperatorId) -> Option<Vec<OperatorId>> {
    let branches = union_branches(ctx, id)?;
    let mut leaves = Vec::with_capacity(branches.len());
    for branch in branches {
        match union_leaves(ctx, branch) {
            Some(nested) => leaves.extend(nested),
            None => leaves.push(branch),
        }
    }
    Some(leaves)
}

/// Rewrite
///   G -> U -> { O1 ... Ok }
/// to
///   G' -> U -> { G -> O1 ... G -> Ok }
/// where G' regroups the partial results by name with the same functions.
pub fn pushdown_groups(context: &mut PlanContext, head: OperatorId) -> OperatorId {
    debug!("Pushing down group operators");
    rewrite(context, head, |ctx, id| {
        let Operator::Group(group) = ctx.get(id) else {
            return id;
        };
        let group = group.clone();
        let Some(branches) = union_leaves(ctx, group.source) else {
            return id;
        };

        let partials = branches
            .into_iter()
            .map(|branch| {
                ctx.add(Operator::Group(GroupOperator {
                    source: branch,
                    group_items: group.group_items.clone(),
                    aggregate_items: group.aggregate_items.clone(),
                }))
            })
            .collect();
        let union = ctx.union(partials);

        let final_group_items = group
            .group_items
            .iter()
            .map(|item| NamedExpr::identity(item.name.clone()))
            .collect();
        let final_aggregate_items = group
            .aggregate_items
            .iter()
            .map(AggregateItem::finalizer)
            .collect();
        ctx.group(union, final_group_items, final_aggregate_items)
    })
}

/// Outcome of `distribute_to_peers`.
#[derive(Debug)]
pub struct Distribution {
    pub head: OperatorId,
    /// Peer fragments; the position is the peer's address.
    pub peers: Vec<PlanFragment>,
}

/// Rewrite
///   U -> { O1 ... Ok }
/// to
///   U -> { S1 ... Sk }  and  S1 -> O1, ..., Sk -> Ok
/// where every Si is a facade scan addressing peer fragment Oi. Branches
/// with an empty key range are dropped.
pub fn distribute_to_peers(
    context: &mut PlanContext,
    head: OperatorId,
    peer_cell_tag: u16,
) -> Distribution {
    debug!("Distributing plan to peers");

    let scans = count(context, head, Operator::is_scan);
    debug!(scans, "Got scan operators in plan fragment");
    if scans == 0 {
        debug!("Nothing to distribute");
        return Distribution {
            head,
            peers: vec![],
        };
    }

    let head = flatten_unions(context, head);

    let mut peers = Vec::new();
    let head = rewrite(context, head, |ctx, id| {
        let Some(branches) = union_branches(ctx, id) else {
            return id;
        };
        let facades = branches
            .into_iter()
            .filter_map(|branch| distribute_branch(ctx, branch, peer_cell_tag, &mut peers))
            .collect();
        ctx.union(facades)
    });

    debug!(peers = peers.len(), "Distributed subfragments to peers");
    Distribution { head, peers }
}

/// Splice the sources of a union directly below a union into the outer one.
fn flatten_unions(context: &mut PlanContext, head: OperatorId) -> OperatorId {
    rewrite(context, head, |ctx, id| {
        let Some(branches) = union_branches(ctx, id) else {
            return id;
        };
        if !branches.iter().any(|b| ctx.get(*b).is_union()) {
            return id;
        }
        let mut flat = Vec::with_capacity(branches.len());
        for branch in branches {
            match ctx.get(branch) {
                Operator::Union(inner) => flat.extend(inner.sources.iter().copied()),
                _ => flat.push(branch),
            }
        }
        ctx.union(flat)
    })
}

/// Turn one union branch into a peer. Returns the node that takes the
/// branch's place in the coordinator, or `None` if the branch is empty.
fn distribute_branch(
    ctx: &mut PlanContext,
    branch: OperatorId,
    peer_cell_tag: u16,
    peers: &mut Vec<PlanFragment>,
) -> Option<OperatorId> {
    let fragment_id = FragmentId::generate();
    debug!(sub_fragment_id = %fragment_id, "Created subfragment");

    let range = infer_key_range(ctx, branch);
    if range.is_empty() {
        debug!(sub_fragment_id = %fragment_id, "Subfragment is empty");
        return None;
    }
    debug!(
        sub_fragment_id = %fragment_id,
        lower = %range.lower,
        upper = %range.upper,
        "Inferred key range"
    );

    // A branch over facades of an inner distribution reads from peers that
    // only the coordinator can resolve.
    if references_peer(ctx, branch) {
        debug!(sub_fragment_id = %fragment_id, "Subfragment reads from peers, keeping it local");
        return Some(branch);
    }

    let mut peer_context = PlanContext::new();
    let peer_head = peer_context.import_subtree(ctx, branch);
    let peer_head = rewrite(&mut peer_context, peer_head, |pctx, id| {
        let Operator::Scan(scan) = pctx.get(id) else {
            return id;
        };
        if !scan.data_split.is_sorted() {
            return id;
        }
        let tightened = scan.data_split.bounds().intersect(&range);
        let split = scan.data_split.clone().with_bounds(tightened);
        pctx.scan(split)
    });

    let index = peers.len();
    peers.push(PlanFragment::with_id(peer_context, peer_head, fragment_id));

    let facade = DataSplit::new(
        ObjectId::peer(index, peer_cell_tag),
        infer_table_schema(ctx, branch),
    )
    .with_key_columns(infer_key_columns(ctx, branch))
    .with_bounds(range);
    Some(ctx.scan(facade))
}

/// Delegate every peer, in order, and collect the readers.
pub async fn initialize_readers<C: CoordinateCallbacks>(
    callbacks: &C,
    concurrent: bool,
    peers: &[PlanFragment],
) -> Result<Vec<C::Reader>> {
    debug!(peers = peers.len(), "Initializing readers");

    if concurrent {
        return try_join_all(peers.iter().map(|peer| delegate(callbacks, peer))).await;
    }

    let mut readers = Vec::with_capacity(peers.len());
    for peer in peers {
        readers.push(delegate(callbacks, peer).await?);
    }
    Ok(readers)
}

async fn delegate<C: CoordinateCallbacks>(callbacks: &C, peer: &PlanFragment) -> Result<C::Reader> {
    let Some(hint) = peer.heaviest_split() else {
        panic!("peer fragment {} contains no scan", peer.id());
    };
    debug!(
        sub_fragment_id = %peer.id(),
        object_id = %hint.object_id,
        "Delegating subfragment"
    );
    callbacks
        .delegate(peer, hint)
        .await
        .map_err(|e| Error::collaborator("delegate", e))
}
