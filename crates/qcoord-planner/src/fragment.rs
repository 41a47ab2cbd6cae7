//! Plan fragments: a frozen arena plus its head operator and identity.

use std::sync::Arc;

use qcoord_core::error::Result;
use qcoord_core::hash::{hash_serde, Hash256};
use qcoord_core::id::FragmentId;
use qcoord_core::range::KeyRange;
use qcoord_core::split::DataSplit;

use crate::context::PlanContext;
use crate::infer;
use crate::logical::LogicalPlan;
use crate::operator::{Operator, OperatorId};
use crate::rewrite::visit_post_order;

/// Immutable `(context, head, id)` triple. Cloning is cheap: the arena is
/// shared.
#[derive(Debug, Clone)]
pub struct PlanFragment {
    context: Arc<PlanContext>,
    head: OperatorId,
    id: FragmentId,
}

impl PlanFragment {
    pub fn new(context: PlanContext, head: OperatorId) -> Self {
        Self::with_id(context, head, FragmentId::generate())
    }

    pub fn with_id(context: PlanContext, head: OperatorId, id: FragmentId) -> Self {
        assert!(
            context.contains(head),
            "fragment head {head} is not part of its plan context"
        );
        Self {
            context: Arc::new(context),
            head,
            id,
        }
    }

    pub fn from_logical(plan: &LogicalPlan) -> Self {
        let mut context = PlanContext::new();
        let head = context.add_plan(plan);
        Self::new(context, head)
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn context(&self) -> &PlanContext {
        &self.context
    }

    pub fn head(&self) -> OperatorId {
        self.head
    }

    pub fn head_operator(&self) -> &Operator {
        self.context.get(self.head)
    }

    pub fn to_logical(&self) -> LogicalPlan {
        self.context.to_logical(self.head)
    }

    /// blake3 over the canonical serialized plan; equal plans hash equal
    /// regardless of arena layout or fragment id.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde(&self.to_logical())
    }

    /// Splits of every scan, in post-order.
    pub fn scans(&self) -> Vec<&DataSplit> {
        let mut out = Vec::new();
        visit_post_order(&self.context, self.head, |_, op| {
            if let Operator::Scan(scan) = op {
                out.push(&scan.data_split);
            }
        });
        out
    }

    pub fn key_range(&self) -> KeyRange {
        infer::infer_key_range(&self.context, self.head)
    }

    pub fn heaviest_split(&self) -> Option<&DataSplit> {
        infer::heaviest_split(&self.context, self.head)
    }
}
