//! Bottom-up inference over operator subtrees: key ranges, representative
//! splits, output schemas and preserved key columns.

use qcoord_core::range::KeyRange;
use qcoord_core::schema::{DataType, Field, Schema};
use qcoord_core::split::DataSplit;

use crate::context::PlanContext;
use crate::expr::{AggregateFunction, NamedExpr};
use crate::operator::{Operator, OperatorId};
use crate::rewrite::visit_post_order;

/// Range of keys the subtree can produce: the hull of every scan's bounds,
/// empty scans contributing nothing. A subtree without scans is empty.
pub fn infer_key_range(context: &PlanContext, id: OperatorId) -> KeyRange {
    match context.get(id) {
        Operator::Scan(op) => op.data_split.bounds(),
        Operator::Filter(op) => infer_key_range(context, op.source),
        Operator::Project(op) => infer_key_range(context, op.source),
        Operator::Group(op) => infer_key_range(context, op.source),
        Operator::Union(op) => op
            .sources
            .iter()
            .fold(KeyRange::empty(), |acc, source| {
                acc.unite(&infer_key_range(context, *source))
            }),
    }
}

/// The scan with the largest data-weight hint; the first one in post-order
/// wins ties and missing hints count as zero.
pub fn heaviest_split(context: &PlanContext, id: OperatorId) -> Option<&DataSplit> {
    let mut heaviest: Option<&DataSplit> = None;
    visit_post_order(context, id, |_, op| {
        if let Operator::Scan(scan) = op {
            let split = &scan.data_split;
            let better = match heaviest {
                None => true,
                Some(current) => split.data_weight.unwrap_or(0) > current.data_weight.unwrap_or(0),
            };
            if better {
                heaviest = Some(split);
            }
        }
    });
    heaviest
}

/// True if any scan below `id` is a facade standing for a peer.
pub fn references_peer(context: &PlanContext, id: OperatorId) -> bool {
    let mut found = false;
    visit_post_order(context, id, |_, op| {
        if let Operator::Scan(scan) = op {
            found |= scan.data_split.object_id.is_peer_reference();
        }
    });
    found
}

/// Output schema of the subtree.
///
/// Projected and grouped columns get the statically inferable type of their
/// expression; anything the coordinator cannot type is reported as `Utf8`.
pub fn infer_table_schema(context: &PlanContext, id: OperatorId) -> Schema {
    match context.get(id) {
        Operator::Scan(op) => op.data_split.table_schema.clone(),
        Operator::Filter(op) => infer_table_schema(context, op.source),
        Operator::Project(op) => {
            let source = infer_table_schema(context, op.source);
            Schema::new(
                op.projections
                    .iter()
                    .map(|item| named_field(item, &source))
                    .collect(),
            )
        }
        Operator::Group(op) => {
            let source = infer_table_schema(context, op.source);
            let mut fields: Vec<Field> = op
                .group_items
                .iter()
                .map(|item| named_field(item, &source))
                .collect();
            fields.extend(op.aggregate_items.iter().map(|item| {
                let arg = item.expr.infer_type(&source).unwrap_or(DataType::Utf8);
                let data_type = match (item.function, arg) {
                    (AggregateFunction::Sum, DataType::Int32) => DataType::Int64,
                    (AggregateFunction::Sum, DataType::Float32) => DataType::Float64,
                    (_, t) => t,
                };
                Field::new(item.name.clone(), data_type, true)
            }));
            Schema::new(fields)
        }
        Operator::Union(op) => op
            .sources
            .first()
            .map(|source| infer_table_schema(context, *source))
            .unwrap_or_default(),
    }
}

/// Key columns still ordering the subtree's output.
///
/// Projections and groupings keep the longest prefix of their source's key
/// columns that they pass through by identity; a union keeps the prefix
/// shared by all of its inputs.
pub fn infer_key_columns(context: &PlanContext, id: OperatorId) -> Vec<String> {
    match context.get(id) {
        Operator::Scan(op) => op.data_split.key_columns.clone(),
        Operator::Filter(op) => infer_key_columns(context, op.source),
        Operator::Project(op) => {
            let source = infer_key_columns(context, op.source);
            preserved_prefix(source, &op.projections)
        }
        Operator::Group(op) => {
            let source = infer_key_columns(context, op.source);
            preserved_prefix(source, &op.group_items)
        }
        Operator::Union(op) => {
            let mut inputs = op.sources.iter().map(|s| infer_key_columns(context, *s));
            let Some(mut common) = inputs.next() else {
                return vec![];
            };
            for columns in inputs {
                let shared = common
                    .iter()
                    .zip(columns.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                common.truncate(shared);
            }
            common
        }
    }
}

fn named_field(item: &NamedExpr, source: &Schema) -> Field {
    Field::new(
        item.name.clone(),
        item.expr.infer_type(source).unwrap_or(DataType::Utf8),
        item.expr.is_nullable(source),
    )
}

fn preserved_prefix(mut key_columns: Vec<String>, items: &[NamedExpr]) -> Vec<String> {
    let kept = key_columns
        .iter()
        .take_while(|key| {
            items
                .iter()
                .any(|item| item.name == **key && item.expr.is_reference_to(key))
        })
        .count();
    key_columns.truncate(kept);
    key_columns
}
