//! Custom assertions for compiled graphs

use std::collections::HashMap;
use viewgraph_engine::features::graph_builder::DependencyGraph;
use viewgraph_engine::shared::models::TargetSpec;

/// Assert that every input precedes its consumer and Kahn's order covers the graph
pub fn assert_acyclic(graph: &DependencyGraph) {
    let order = graph
        .topological_order()
        .unwrap_or_else(|| panic!("graph '{}' has a cycle", graph.calculation_configuration));
    assert_eq!(order.len(), graph.len());
    for (id, node) in graph.nodes().iter().enumerate() {
        for input in &node.inputs {
            assert!(input.index() < id, "input {input} does not precede n{id}");
        }
    }
}

/// Assert that each observed (target, value) appears as exactly one leaf
pub fn assert_unique_leaves(graph: &DependencyGraph) {
    let mut seen: HashMap<(&TargetSpec, &str), usize> = HashMap::new();
    for (_, node) in graph.market_data_leaves() {
        *seen.entry((&node.target, node.output.value_name.as_str())).or_default() += 1;
    }
    let duplicates: Vec<_> = seen.iter().filter(|(_, count)| **count > 1).collect();
    assert!(duplicates.is_empty(), "duplicate leaves: {duplicates:?}");
}

pub fn leaf_count(graph: &DependencyGraph, target: &TargetSpec, value_name: &str) -> usize {
    graph
        .market_data_leaves()
        .filter(|(_, node)| &node.target == target && node.output.value_name == value_name)
        .count()
}
