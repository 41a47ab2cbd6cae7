//! Post-order tree rewriting.
//!
//! `rewrite` walks the tree below `head` children-first. When any child of a
//! node was replaced, the node is re-allocated with the new children before
//! the transform sees it; the transform then returns either the id it was
//! given (no change) or the id of a replacement it allocated. Untouched
//! subtrees keep their ids, so consecutive trees share structure.

use crate::context::PlanContext;
use crate::operator::{Operator, OperatorId};

/// Rewrite the tree rooted at `head` with `transform`; returns the new head.
pub fn rewrite<F>(context: &mut PlanContext, head: OperatorId, mut transform: F) -> OperatorId
where
    F: FnMut(&mut PlanContext, OperatorId) -> OperatorId,
{
    rewrite_node(context, head, &mut transform)
}

fn rewrite_node<F>(context: &mut PlanContext, id: OperatorId, transform: &mut F) -> OperatorId
where
    F: FnMut(&mut PlanContext, OperatorId) -> OperatorId,
{
    let sources = context.get(id).sources().to_vec();

    let mut changed = false;
    let mut new_sources = Vec::with_capacity(sources.len());
    for source in sources {
        let new_source = rewrite_node(context, source, transform);
        changed |= new_source != source;
        new_sources.push(new_source);
    }

    let id = if changed {
        let op = context.get(id).with_sources(new_sources);
        context.add(op)
    } else {
        id
    };

    transform(context, id)
}

/// Visit every operator below `head` children-first, in the order `rewrite`
/// hands them to its transform.
pub fn visit_post_order<'a, F>(context: &'a PlanContext, head: OperatorId, mut visitor: F)
where
    F: FnMut(OperatorId, &'a Operator),
{
    visit_node(context, head, &mut visitor);
}

fn visit_node<'a, F>(context: &'a PlanContext, id: OperatorId, visitor: &mut F)
where
    F: FnMut(OperatorId, &'a Operator),
{
    let op = context.get(id);
    for source in op.sources() {
        visit_node(context, *source, visitor);
    }
    visitor(id, op);
}

/// Number of operators below `head` matching `predicate`.
pub fn count<P>(context: &PlanContext, head: OperatorId, mut predicate: P) -> usize
where
    P: FnMut(&Operator) -> bool,
{
    let mut n = 0;
    visit_post_order(context, head, |_, op| {
        if predicate(op) {
            n += 1;
        }
    });
    n
}
