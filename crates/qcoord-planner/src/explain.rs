//! Human-readable renderings of a plan: indented text and Graphviz DOT.

use std::fmt::Write as _;

use qcoord_core::split::DataSplit;

use crate::context::PlanContext;
use crate::fragment::PlanFragment;
use crate::operator::{Operator, OperatorId};
use crate::rewrite::visit_post_order;

/// Render a fragment as multiline text, one operator per line.
pub fn explain(fragment: &PlanFragment) -> String {
    explain_subtree(fragment.context(), fragment.head())
}

pub fn explain_subtree(context: &PlanContext, head: OperatorId) -> String {
    let mut s = String::new();
    fmt_operator(context, head, 0, &mut s);
    s
}

fn fmt_operator(context: &PlanContext, id: OperatorId, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let op = context.get(id);
    match op {
        Operator::Scan(scan) => {
            let _ = writeln!(out, "{pad}Scan {}", describe_split(&scan.data_split));
        }
        Operator::Filter(filter) => {
            let _ = writeln!(out, "{pad}Filter {}", filter.predicate);
        }
        Operator::Project(project) => {
            let items: Vec<String> = project
                .projections
                .iter()
                .map(|p| format!("{} := {}", p.name, p.expr))
                .collect();
            let _ = writeln!(out, "{pad}Project {}", items.join(", "));
        }
        Operator::Group(group) => {
            let keys: Vec<String> = group
                .group_items
                .iter()
                .map(|g| format!("{} := {}", g.name, g.expr))
                .collect();
            let aggs: Vec<String> = group
                .aggregate_items
                .iter()
                .map(|a| format!("{} := {}({})", a.name, a.function, a.expr))
                .collect();
            let _ = writeln!(
                out,
                "{pad}Group by [{}] aggregate [{}]",
                keys.join(", "),
                aggs.join(", ")
            );
        }
        Operator::Union(union) => {
            let _ = writeln!(out, "{pad}Union ({} sources)", union.sources.len());
        }
    }
    for source in op.sources() {
        fmt_operator(context, *source, indent + 1, out);
    }
}

fn describe_split(split: &DataSplit) -> String {
    let mut s = format!("id={}", split.object_id);
    if split.is_sorted() {
        let _ = write!(s, " keys=[{}]", split.key_columns.join(", "));
    }
    let _ = write!(s, " range={}", split.bounds());
    if let Some(weight) = split.data_weight {
        let _ = write!(s, " weight={weight}");
    }
    s
}

/// Render a fragment as a Graphviz digraph. Edges point from an operator to
/// its sources.
pub fn to_dot(fragment: &PlanFragment) -> String {
    let context = fragment.context();
    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", fragment.id());
    out.push_str("  node [shape=none, fontname=\"monospace\"];\n");

    visit_post_order(context, fragment.head(), |id, op| {
        let _ = writeln!(
            out,
            "  {} [label=<{}>];",
            node_name(id),
            node_label(op)
        );
        for source in op.sources() {
            let _ = writeln!(out, "  {} -> {};", node_name(id), node_name(*source));
        }
    });

    out.push_str("}\n");
    out
}

fn node_name(id: OperatorId) -> String {
    format!("op{}", id.index())
}

fn node_label(op: &Operator) -> String {
    let mut rows = vec![op.kind().to_string()];
    match op {
        Operator::Scan(scan) => {
            let split = &scan.data_split;
            rows.push(format!("Id: {}", split.object_id));
            rows.push(format!("Type: {}", split.object_id.kind()));
            rows.push(format!("Sorted: {}", split.is_sorted()));
            rows.push(format!("Range: {}", split.bounds()));
        }
        Operator::Filter(filter) => rows.push(format!("[P]: {}", filter.predicate)),
        Operator::Project(project) => {
            for p in &project.projections {
                rows.push(format!("{} := {}", p.name, p.expr));
            }
        }
        Operator::Group(group) => {
            for g in &group.group_items {
                rows.push(format!("[G] {} := {}", g.name, g.expr));
            }
            for a in &group.aggregate_items {
                rows.push(format!("[A] {} := {}({})", a.name, a.function, a.expr));
            }
        }
        Operator::Union(_) => {}
    }

    let mut label = String::from("<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\">");
    for row in rows {
        let _ = write!(
            label,
            "<TR><TD ALIGN=\"LEFT\">{}</TD></TR>",
            escape_html(&row)
        );
    }
    label.push_str("</TABLE>");
    label
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
