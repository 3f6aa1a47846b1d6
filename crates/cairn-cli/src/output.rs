//! Formatted output helpers for CLI commands.
//!
//! Renders provisioning plans and catalog schemas as human-readable text.

use std::fmt::Write as _;

use cairn_graph::synth::{PlannedValue, ProvisioningPlan};
use cairn_graph::{Availability, ResourceCatalog};

const RULE_WIDTH: usize = 35;

fn rule() -> String {
    "\u{2550}".repeat(RULE_WIDTH)
}

/// Renders a single attribute value on one line.
///
/// Concrete values print as compact JSON, tokens as their placeholder with
/// the pinned value appended when the producer chose one.
#[must_use]
pub fn format_value(value: &PlannedValue) -> String {
    match value {
        PlannedValue::Concrete(v) => v.to_string(),
        PlannedValue::Reference(reference) => match &reference.pinned {
            Some(pinned) => format!("{} (= {pinned})", reference.placeholder),
            None => reference.placeholder.clone(),
        },
        PlannedValue::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        PlannedValue::Map(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, item)| format!("{key}: {}", format_value(item)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Renders a plan as the text report printed by `cairn plan`.
#[must_use]
pub fn format_plan(plan: &ProvisioningPlan, fingerprint: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Provisioning Plan (format v{})", plan.version);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);

    for stack in &plan.stacks {
        let _ = write!(out, "  {}. {}", stack.position + 1, stack.name);
        if !stack.depends_on.is_empty() {
            let _ = write!(out, "  (after {})", stack.depends_on.join(", "));
        }
        let _ = writeln!(out);

        for node in &stack.nodes {
            let marker = if node.origin.is_imported() { '=' } else { '+' };
            let _ = writeln!(out, "      {marker} {} [{}]", node.id, node.kind);
            for (name, value) in &node.attributes {
                let _ = writeln!(out, "          {name}: {}", format_value(value));
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} stack(s), {} resource(s) will be provisioned.",
        plan.stacks.len(),
        plan.node_count()
    );

    if !plan.edges.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Dependencies:");
        for edge in &plan.edges {
            let _ = writeln!(out, "    {} -> {}", edge.from, edge.to);
            for cause in &edge.causes {
                let _ = writeln!(out, "        {cause}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  Fingerprint: {fingerprint}");
    out
}

/// Renders every kind of a catalog with its attributes and availability.
#[must_use]
pub fn format_catalog(catalog: &ResourceCatalog) -> String {
    let mut out = String::new();
    for (kind, schema) in &catalog.kinds {
        let _ = writeln!(out, "{kind}");
        for (attribute, availability) in &schema.attributes {
            let label = match availability {
                Availability::Declared => "declared",
                Availability::Deferred => "deferred",
            };
            let _ = writeln!(out, "  {attribute:<28}{label}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cairn_common::types::ResourceKind;
    use cairn_graph::{CompositionGraph, ResourceNode, Stack, synthesize};
    use serde_json::json;

    use super::*;

    fn plan() -> ProvisioningPlan {
        let catalog = Arc::new(ResourceCatalog::aws());
        let mut streams = Stack::new("Streams", Arc::clone(&catalog));
        streams
            .declare(
                ResourceNode::new("upstream", ResourceKind::Stream)
                    .with("streamName", "market-data")
                    .with("shardCount", 2_u32),
            )
            .expect("declare stream");
        let name = streams.output("upstream", "streamName").expect("token");

        let mut ingest = Stack::new("Ingest", Arc::clone(&catalog));
        ingest
            .declare(
                ResourceNode::new("taskDef", ResourceKind::TaskDefinition)
                    .with("environment", cairn_graph::AttributeValue::map([("STREAM", name)])),
            )
            .expect("declare task");

        let mut graph = CompositionGraph::new();
        graph.add_stack(streams).expect("add streams");
        graph.add_stack(ingest).expect("add ingest");
        synthesize(&graph).expect("synthesize")
    }

    #[test]
    fn concrete_values_render_as_json() {
        assert_eq!(format_value(&PlannedValue::Concrete(json!("HTTP"))), "\"HTTP\"");
        assert_eq!(format_value(&PlannedValue::Concrete(json!(80))), "80");
    }

    #[test]
    fn nested_values_render_inline() {
        let value = PlannedValue::List(vec![
            PlannedValue::Concrete(json!(1)),
            PlannedValue::Map([("a".to_owned(), PlannedValue::Concrete(json!(true)))].into()),
        ]);
        assert_eq!(format_value(&value), "[1, {a: true}]");
    }

    #[test]
    fn plan_lists_stacks_in_order_with_placeholders() {
        let text = format_plan(&plan(), "abc123");
        let streams = text.find("1. Streams").expect("streams line");
        let ingest = text.find("2. Ingest  (after Streams)").expect("ingest line");
        assert!(streams < ingest);
        assert!(
            text.contains("STREAM: ${Streams.upstream.streamName} (= \"market-data\")"),
            "got: {text}"
        );
        assert!(text.contains("upstream.streamName -> taskDef.environment"), "got: {text}");
        assert!(text.contains("Fingerprint: abc123"));
    }

    #[test]
    fn catalog_marks_availability() {
        let text = format_catalog(&ResourceCatalog::aws());
        let line = text
            .lines()
            .find(|l| l.trim_start().starts_with("dnsName"))
            .expect("dnsName line");
        assert!(line.ends_with("deferred"), "got: {line}");
    }
}
