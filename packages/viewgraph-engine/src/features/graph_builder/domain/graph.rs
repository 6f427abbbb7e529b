//! Dependency graphs
//!
//! A `DependencyGraph` holds the nodes of one calculation configuration in
//! topological order (inputs before consumers), the node answering each
//! requested output, and the optional outputs that could not be resolved.

use super::error::CompileError;
use crate::features::function_catalog::FunctionId;
use crate::features::resolution::domain::{DependencyNode, NodeId};
use crate::features::resolution::infrastructure::ResolutionContext;
use crate::features::value_model::ValueRequirement;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// A requested output and the node producing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutput {
    pub requirement: ValueRequirement,
    pub node: NodeId,
}

/// An optional output that failed to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedOutput {
    pub requirement: ValueRequirement,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub calculation_configuration: String,
    nodes: Vec<DependencyNode>,
    terminal_outputs: Vec<TerminalOutput>,
    unresolved: Vec<UnresolvedOutput>,
}

impl DependencyGraph {
    /// Extract the nodes reachable from `terminals`
    ///
    /// Context node ids are renumbered densely. Inputs are always interned
    /// before their consumers, so ascending context id is a topological order.
    pub fn from_context(
        calculation_configuration: impl Into<String>,
        ctx: &ResolutionContext,
        terminals: &[(ValueRequirement, NodeId)],
        unresolved: Vec<UnresolvedOutput>,
    ) -> Self {
        let mut reachable: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = terminals.iter().map(|(_, id)| *id).collect();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(node) = ctx.node(id) {
                stack.extend(node.inputs.iter().copied());
            }
        }

        let mut ordered: Vec<NodeId> = reachable.into_iter().collect();
        ordered.sort_unstable();
        let local: HashMap<NodeId, NodeId> = ordered
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, NodeId(i)))
            .collect();

        let nodes = ordered
            .iter()
            .filter_map(|id| ctx.node(*id))
            .map(|node| DependencyNode {
                inputs: node.inputs.iter().filter_map(|id| local.get(id).copied()).collect(),
                ..node.clone()
            })
            .collect();

        let terminal_outputs = terminals
            .iter()
            .filter_map(|(requirement, id)| {
                local.get(id).map(|node| TerminalOutput {
                    requirement: requirement.clone(),
                    node: *node,
                })
            })
            .collect();

        Self {
            calculation_configuration: calculation_configuration.into(),
            nodes,
            terminal_outputs,
            unresolved,
        }
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn terminal_outputs(&self) -> &[TerminalOutput] {
        &self.terminal_outputs
    }

    pub fn unresolved(&self) -> &[UnresolvedOutput] {
        &self.unresolved
    }

    /// Node answering a requested output
    pub fn terminal_for(&self, requirement: &ValueRequirement) -> Option<NodeId> {
        self.terminal_outputs
            .iter()
            .find(|t| &t.requirement == requirement)
            .map(|t| t.node)
    }

    pub fn terminal_node(&self, requirement: &ValueRequirement) -> Option<&DependencyNode> {
        self.terminal_for(requirement).and_then(|id| self.node(id))
    }

    pub fn market_data_leaves(&self) -> impl Iterator<Item = (NodeId, &DependencyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_market_data())
            .map(|(i, node)| (NodeId(i), node))
    }

    /// Nodes consuming `id`'s output
    pub fn consumers_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.inputs.contains(&id))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Distinct functions the graph applies
    pub fn function_ids(&self) -> BTreeSet<&FunctionId> {
        self.nodes.iter().filter_map(|n| n.function_id()).collect()
    }

    /// Kahn's algorithm; `None` if the graph has a cycle
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                if input.index() >= n {
                    return None;
                }
                in_degree[i] += 1;
                consumers[input.index()].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop_front() {
            order.push(NodeId(i));
            for &consumer in &consumers[i] {
                in_degree[consumer] -= 1;
                if in_degree[consumer] == 0 {
                    queue.push_back(consumer);
                }
            }
        }

        (order.len() == n).then_some(order)
    }

    /// Edges run input → consumer
    pub fn to_petgraph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), 0);
        let indices: Vec<NodeIndex> = (0..self.nodes.len())
            .map(|i| graph.add_node(NodeId(i)))
            .collect();
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                if let Some(&from) = indices.get(input.index()) {
                    graph.add_edge(from, indices[i], ());
                }
            }
        }
        graph
    }

    pub fn is_acyclic(&self) -> bool {
        toposort(&self.to_petgraph(), None).is_ok()
    }

    /// Structural invariants: acyclic, every input produced by exactly one
    /// in-graph node whose output matches the recorded input specification
    pub fn validate(&self) -> Result<(), CompileError> {
        let invalid = || CompileError::CyclicGraph(self.calculation_configuration.clone());

        for node in &self.nodes {
            if node.inputs.len() != node.input_specifications.len() {
                return Err(invalid());
            }
            for (input, spec) in node.inputs.iter().zip(&node.input_specifications) {
                match self.node(*input) {
                    Some(producer) if &producer.output == spec => {}
                    _ => return Err(invalid()),
                }
            }
        }

        if !self.is_acyclic() {
            return Err(invalid());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::resolution::domain::NodeKind;
    use crate::features::value_model::{PropertyConstraintSet, ValueSpecification};
    use crate::shared::models::TargetSpec;

    fn leaf(name: &str) -> DependencyNode {
        DependencyNode::market_data(&ValueRequirement::unconstrained(name, TargetSpec::security("1")))
    }

    fn function(id: &str, inputs: Vec<(NodeId, &DependencyNode)>) -> DependencyNode {
        DependencyNode {
            kind: NodeKind::Function(FunctionId::new(id)),
            target: TargetSpec::security("1"),
            inputs: inputs.iter().map(|(i, _)| *i).collect(),
            input_specifications: inputs.iter().map(|(_, n)| n.output.clone()).collect(),
            output: ValueSpecification::new(id, TargetSpec::security("1"), PropertyConstraintSet::empty())
                .with_function(id),
        }
    }

    fn graph(nodes: Vec<DependencyNode>) -> DependencyGraph {
        DependencyGraph {
            calculation_configuration: "Default".into(),
            nodes,
            terminal_outputs: vec![],
            unresolved: vec![],
        }
    }

    #[test]
    fn test_topological_order_and_consumers() {
        let mv = leaf("MARKET_VALUE");
        let pv = function("PV", vec![(NodeId(0), &mv)]);
        let delta = function("DELTA", vec![(NodeId(0), &mv)]);
        let g = graph(vec![mv.clone(), pv, delta]);

        assert_eq!(g.topological_order(), Some(vec![NodeId(0), NodeId(1), NodeId(2)]));
        assert_eq!(g.consumers_of(NodeId(0)), vec![NodeId(1), NodeId(2)]);
        assert_eq!(g.market_data_leaves().count(), 1);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut a = function("A", vec![]);
        let mut b = function("B", vec![]);
        a.inputs = vec![NodeId(1)];
        a.input_specifications = vec![b.output.clone()];
        b.inputs = vec![NodeId(0)];
        b.input_specifications = vec![a.output.clone()];
        let g = graph(vec![a, b]);

        assert_eq!(g.topological_order(), None);
        assert!(!g.is_acyclic());
        assert_eq!(g.validate(), Err(CompileError::CyclicGraph("Default".into())));
    }

    #[test]
    fn test_dangling_input_is_rejected() {
        let mv = leaf("MARKET_VALUE");
        let pv = function("PV", vec![(NodeId(7), &mv)]);
        let g = graph(vec![pv]);

        assert!(g.validate().is_err());
        assert_eq!(g.topological_order(), None);
    }
}
