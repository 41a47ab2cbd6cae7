//! Relational operators.
//!
//! `Scan` is the only leaf, `Filter`/`Project`/`Group` have exactly one
//! source and `Union` is the only fan-in. Children are `OperatorId`s into the
//! owning `PlanContext`.

use std::fmt;

use qcoord_core::id::ContextId;
use qcoord_core::split::DataSplit;

use crate::expr::{AggregateItem, Expr, NamedExpr};

/// Handle to an operator inside a specific `PlanContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorId {
    context: ContextId,
    index: u32,
}

impl OperatorId {
    pub(crate) const fn new(context: ContextId, index: u32) -> Self {
        Self { context, index }
    }

    pub const fn context(self) -> ContextId {
        self.context
    }

    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}@{}", self.index, self.context.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Scan,
    Filter,
    Project,
    Group,
    Union,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperatorKind::Scan => "Scan",
            OperatorKind::Filter => "Filter",
            OperatorKind::Project => "Project",
            OperatorKind::Group => "Group",
            OperatorKind::Union => "Union",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOperator {
    pub data_split: DataSplit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOperator {
    pub source: OperatorId,
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOperator {
    pub source: OperatorId,
    pub projections: Vec<NamedExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOperator {
    pub source: OperatorId,
    pub group_items: Vec<NamedExpr>,
    pub aggregate_items: Vec<AggregateItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionOperator {
    pub sources: Vec<OperatorId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Scan(ScanOperator),
    Filter(FilterOperator),
    Project(ProjectOperator),
    Group(GroupOperator),
    Union(UnionOperator),
}

impl Operator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Scan(_) => OperatorKind::Scan,
            Operator::Filter(_) => OperatorKind::Filter,
            Operator::Project(_) => OperatorKind::Project,
            Operator::Group(_) => OperatorKind::Group,
            Operator::Union(_) => OperatorKind::Union,
        }
    }

    /// Children in order.
    pub fn sources(&self) -> &[OperatorId] {
        match self {
            Operator::Scan(_) => &[],
            Operator::Filter(op) => std::slice::from_ref(&op.source),
            Operator::Project(op) => std::slice::from_ref(&op.source),
            Operator::Group(op) => std::slice::from_ref(&op.source),
            Operator::Union(op) => &op.sources,
        }
    }

    /// The single source of a unary operator.
    pub fn source(&self) -> Option<OperatorId> {
        match self {
            Operator::Filter(op) => Some(op.source),
            Operator::Project(op) => Some(op.source),
            Operator::Group(op) => Some(op.source),
            Operator::Scan(_) | Operator::Union(_) => None,
        }
    }

    /// Copy of this operator (own expressions deep-copied) re-parented onto
    /// `sources`.
    ///
    /// Panics if the arity does not match the operator kind.
    pub fn with_sources(&self, sources: Vec<OperatorId>) -> Operator {
        match self {
            Operator::Scan(op) => {
                assert!(
                    sources.is_empty(),
                    "Scan operator cannot have sources, got {}",
                    sources.len()
                );
                Operator::Scan(op.clone())
            }
            Operator::Filter(op) => Operator::Filter(FilterOperator {
                source: single_source(OperatorKind::Filter, &sources),
                predicate: op.predicate.clone(),
            }),
            Operator::Project(op) => Operator::Project(ProjectOperator {
                source: single_source(OperatorKind::Project, &sources),
                projections: op.projections.clone(),
            }),
            Operator::Group(op) => Operator::Group(GroupOperator {
                source: single_source(OperatorKind::Group, &sources),
                group_items: op.group_items.clone(),
                aggregate_items: op.aggregate_items.clone(),
            }),
            Operator::Union(_) => Operator::Union(UnionOperator { sources }),
        }
    }

    pub fn as_scan(&self) -> Option<&ScanOperator> {
        match self {
            Operator::Scan(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionOperator> {
        match self {
            Operator::Union(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_scan(&self) -> bool {
        matches!(self, Operator::Scan(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Operator::Union(_))
    }
}

fn single_source(kind: OperatorKind, sources: &[OperatorId]) -> OperatorId {
    match sources {
        [source] => *source,
        _ => panic!(
            "{kind} operator must have exactly one source, got {}",
            sources.len()
        ),
    }
}
