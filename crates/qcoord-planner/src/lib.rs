#![forbid(unsafe_code)]
//! qcoord-planner: the operator model and the generic machinery the
//! coordinator's passes are written with.
//!
//! Design:
//! - Operators are a closed enum (`Operator`) living in an index arena
//!   (`PlanContext`). Handles (`OperatorId`) remember their arena.
//! - A `PlanFragment` freezes an arena together with its head operator.
//! - `rewrite` is a post-order tree transformer; passes only reshape the
//!   node kind they care about and hand everything else back untouched.
//! - `infer` folds key ranges, schemas and key columns bottom-up.
//! - `LogicalPlan` is an owned mirror of a subtree for import/export,
//!   structural comparison and fingerprinting.

pub mod context;
pub mod explain;
pub mod expr;
pub mod fragment;
pub mod infer;
pub mod logical;
pub mod operator;
pub mod rewrite;

pub use context::PlanContext;
pub use expr::{AggregateFunction, AggregateItem, BinaryOp, Expr, NamedExpr};
pub use fragment::PlanFragment;
pub use logical::LogicalPlan;
pub use operator::{
    FilterOperator, GroupOperator, Operator, OperatorId, OperatorKind, ProjectOperator,
    ScanOperator, UnionOperator,
};
pub use rewrite::{rewrite, visit_post_order};
