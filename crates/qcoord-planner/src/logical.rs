//! Owned, boxed mirror of an operator subtree.
//!
//! Used to hand plans into an arena, to get them back out for inspection,
//! and as the canonical form that fingerprints are computed over.

use serde::{Deserialize, Serialize};

use qcoord_core::split::DataSplit;

use crate::context::PlanContext;
use crate::expr::{AggregateItem, Expr, NamedExpr};
use crate::operator::{Operator, OperatorId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalPlan {
    Scan {
        split: DataSplit,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    Project {
        input: Box<LogicalPlan>,
        projections: Vec<NamedExpr>,
    },
    Group {
        input: Box<LogicalPlan>,
        group_items: Vec<NamedExpr>,
        aggregate_items: Vec<AggregateItem>,
    },
    Union {
        inputs: Vec<LogicalPlan>,
    },
}

impl LogicalPlan {
    pub fn scan(split: DataSplit) -> Self {
        LogicalPlan::Scan { split }
    }

    pub fn union(inputs: Vec<LogicalPlan>) -> Self {
        LogicalPlan::Union { inputs }
    }

    pub fn filter(self, predicate: Expr) -> Self {
        LogicalPlan::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    pub fn project(self, projections: Vec<NamedExpr>) -> Self {
        LogicalPlan::Project {
            input: Box::new(self),
            projections,
        }
    }

    pub fn group(self, group_items: Vec<NamedExpr>, aggregate_items: Vec<AggregateItem>) -> Self {
        LogicalPlan::Group {
            input: Box::new(self),
            group_items,
            aggregate_items,
        }
    }

    /// Children in order.
    pub fn inputs(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Project { input, .. }
            | LogicalPlan::Group { input, .. } => vec![input.as_ref()],
            LogicalPlan::Union { inputs } => inputs.iter().collect(),
        }
    }

    /// Splits of every scan, in post-order.
    pub fn scans(&self) -> Vec<&DataSplit> {
        let mut out = Vec::new();
        self.collect_scans(&mut out);
        out
    }

    fn collect_scans<'a>(&'a self, out: &mut Vec<&'a DataSplit>) {
        if let LogicalPlan::Scan { split } = self {
            out.push(split);
        }
        for input in self.inputs() {
            input.collect_scans(out);
        }
    }
}

impl PlanContext {
    /// Allocate `plan` into this context and return its head.
    pub fn add_plan(&mut self, plan: &LogicalPlan) -> OperatorId {
        match plan {
            LogicalPlan::Scan { split } => self.scan(split.clone()),
            LogicalPlan::Filter { input, predicate } => {
                let source = self.add_plan(input);
                self.filter(source, predicate.clone())
            }
            LogicalPlan::Project { input, projections } => {
                let source = self.add_plan(input);
                self.project(source, projections.clone())
            }
            LogicalPlan::Group {
                input,
                group_items,
                aggregate_items,
            } => {
                let source = self.add_plan(input);
                self.group(source, group_items.clone(), aggregate_items.clone())
            }
            LogicalPlan::Union { inputs } => {
                let sources = inputs.iter().map(|input| self.add_plan(input)).collect();
                self.union(sources)
            }
        }
    }

    /// Owned copy of the subtree rooted at `id`.
    pub fn to_logical(&self, id: OperatorId) -> LogicalPlan {
        match self.get(id) {
            Operator::Scan(op) => LogicalPlan::Scan {
                split: op.data_split.clone(),
            },
            Operator::Filter(op) => LogicalPlan::Filter {
                input: Box::new(self.to_logical(op.source)),
                predicate: op.predicate.clone(),
            },
            Operator::Project(op) => LogicalPlan::Project {
                input: Box::new(self.to_logical(op.source)),
                projections: op.projections.clone(),
            },
            Operator::Group(op) => LogicalPlan::Group {
                input: Box::new(self.to_logical(op.source)),
                group_items: op.group_items.clone(),
                aggregate_items: op.aggregate_items.clone(),
            },
            Operator::Union(op) => LogicalPlan::Union {
                inputs: op.sources.iter().map(|s| self.to_logical(*s)).collect(),
            },
        }
    }
}
