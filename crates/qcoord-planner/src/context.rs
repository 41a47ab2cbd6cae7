//! Index arena holding every operator built during one fragment-construction
//! episode.
//!
//! Operators are append-only: nothing is ever mutated or removed, so any id
//! handed out stays valid (and keeps meaning the same node) for the lifetime
//! of the context. Superseded nodes are simply left behind.

use std::sync::atomic::{AtomicU64, Ordering};

use qcoord_core::id::ContextId;
use qcoord_core::split::DataSplit;

use crate::expr::{AggregateItem, Expr, NamedExpr};
use crate::operator::{
    FilterOperator, GroupOperator, Operator, OperatorId, ProjectOperator, ScanOperator,
    UnionOperator,
};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct PlanContext {
    id: ContextId,
    operators: Vec<Operator>,
}

impl PlanContext {
    pub fn new() -> Self {
        Self {
            id: ContextId::new(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            operators: Vec::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Number of operators ever allocated here, reachable or not.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn contains(&self, id: OperatorId) -> bool {
        id.context() == self.id && id.index() < self.operators.len()
    }

    /// Panics if `id` belongs to another context.
    pub fn get(&self, id: OperatorId) -> &Operator {
        self.check(id);
        &self.operators[id.index()]
    }

    /// Allocate `op`. All of its sources must already live in this context.
    pub fn add(&mut self, op: Operator) -> OperatorId {
        for source in op.sources() {
            self.check(*source);
        }
        let index = u32::try_from(self.operators.len())
            .unwrap_or_else(|_| panic!("plan context {} is full", self.id));
        self.operators.push(op);
        OperatorId::new(self.id, index)
    }

    pub fn scan(&mut self, data_split: DataSplit) -> OperatorId {
        self.add(Operator::Scan(ScanOperator { data_split }))
    }

    pub fn filter(&mut self, source: OperatorId, predicate: Expr) -> OperatorId {
        self.add(Operator::Filter(FilterOperator { source, predicate }))
    }

    pub fn project(&mut self, source: OperatorId, projections: Vec<NamedExpr>) -> OperatorId {
        self.add(Operator::Project(ProjectOperator {
            source,
            projections,
        }))
    }

    pub fn group(
        &mut self,
        source: OperatorId,
        group_items: Vec<NamedExpr>,
        aggregate_items: Vec<AggregateItem>,
    ) -> OperatorId {
        self.add(Operator::Group(GroupOperator {
            source,
            group_items,
            aggregate_items,
        }))
    }

    pub fn union(&mut self, sources: Vec<OperatorId>) -> OperatorId {
        self.add(Operator::Union(UnionOperator { sources }))
    }

    /// Deep-copy the subtree rooted at `id` in `from` into this context.
    pub fn import_subtree(&mut self, from: &PlanContext, id: OperatorId) -> OperatorId {
        let op = from.get(id);
        let sources = op
            .sources()
            .iter()
            .map(|source| self.import_subtree(from, *source))
            .collect();
        let copy = op.with_sources(sources);
        self.add(copy)
    }

    fn check(&self, id: OperatorId) {
        assert!(
            id.context() == self.id,
            "operator {id} does not belong to plan context {}",
            self.id
        );
        assert!(
            id.index() < self.operators.len(),
            "operator {id} is out of range for plan context {}",
            self.id
        );
    }
}

impl Default for PlanContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcoord_core::id::{ObjectId, ObjectType};
    use qcoord_core::schema::Schema;

    fn split(counter: u32) -> DataSplit {
        DataSplit::new(
            ObjectId::new(ObjectType::Table, 1, counter, 0),
            Schema::empty(),
        )
    }

    #[test]
    fn import_copies_into_target_context() {
        let mut source = PlanContext::new();
        let scan = source.scan(split(1));
        let filter = source.filter(scan, Expr::literal(true));

        let mut target = PlanContext::new();
        let copied = target.import_subtree(&source, filter);

        assert_eq!(copied.context(), target.id());
        assert_eq!(target.len(), 2);
        let Operator::Filter(op) = target.get(copied) else {
            panic!("expected a filter");
        };
        assert!(target.get(op.source).is_scan());
    }

    #[test]
    #[should_panic(expected = "does not belong to plan context")]
    fn foreign_handles_are_rejected() {
        let mut a = PlanContext::new();
        let scan = a.scan(split(1));
        let b = PlanContext::new();
        let _ = b.get(scan);
    }
}
