//! Per-compile resolution state
//!
//! One `ResolutionContext` is shared across every requirement of a compile so
//! identical sub-requirements resolve once and produce one node.
//!
//! Outcomes that depend on the recursion stack (cycle guard, depth bound)
//! taint every enclosing resolution; tainted outcomes are never memoized.

use crate::features::function_catalog::FunctionId;
use crate::features::resolution::domain::{DependencyNode, NodeId, ResolutionError, ResolutionStats};
use crate::features::value_model::{ValueRequirement, ValueSpecification};
use crate::shared::models::TargetSpec;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub(crate) enum MemoEntry {
    Resolved(NodeId),
    Failed(ResolutionError),
}

impl MemoEntry {
    fn to_result(&self) -> Result<NodeId, ResolutionError> {
        match self {
            MemoEntry::Resolved(id) => Ok(*id),
            MemoEntry::Failed(error) => Err(error.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolutionContext {
    memo: HashMap<ValueRequirement, MemoEntry>,
    nodes: Vec<DependencyNode>,
    by_output: HashMap<ValueSpecification, NodeId>,
    leaves: HashMap<(TargetSpec, String), NodeId>,
    contextual: bool,
    in_progress: HashSet<(TargetSpec, String)>,
    requirement_stack: Vec<ValueRequirement>,
    function_stack: Vec<(FunctionId, TargetSpec)>,
    stats: ResolutionStats,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ResolutionStats {
        &mut self.stats
    }

    pub(crate) fn memoized(&self, requirement: &ValueRequirement) -> Option<Result<NodeId, ResolutionError>> {
        self.memo.get(requirement).map(MemoEntry::to_result)
    }

    /// Record an outcome unless it depended on the recursion stack
    pub(crate) fn memoize(
        &mut self,
        requirement: &ValueRequirement,
        outcome: &Result<NodeId, ResolutionError>,
        contextual: bool,
    ) {
        let entry = match outcome {
            _ if contextual => return,
            Ok(id) => MemoEntry::Resolved(*id),
            Err(error) if !error.is_contextual() => MemoEntry::Failed(error.clone()),
            Err(_) => return,
        };
        self.memo.insert(requirement.clone(), entry);
    }

    /// Start resolving a requirement; returns the enclosing taint
    pub(crate) fn enter_scope(&mut self) -> bool {
        std::mem::replace(&mut self.contextual, false)
    }

    /// Finish a requirement; returns whether it was tainted and passes the
    /// taint on to the enclosing scope
    pub(crate) fn exit_scope(&mut self, enclosing: bool) -> bool {
        let tainted = self.contextual;
        self.contextual = enclosing || tainted;
        tainted
    }

    pub(crate) fn mark_contextual(&mut self) {
        self.contextual = true;
    }

    /// One leaf per observed (target, value name); it keeps the output of
    /// the first requirement that reached it
    pub(crate) fn market_data_leaf(&mut self, requirement: &ValueRequirement) -> NodeId {
        let key = observation(requirement);
        if let Some(&id) = self.leaves.get(&key) {
            return id;
        }
        let id = self.intern(DependencyNode::market_data(requirement));
        self.leaves.insert(key, id);
        id
    }

    /// Add a node, or return the existing node with the same output
    pub(crate) fn intern(&mut self, node: DependencyNode) -> NodeId {
        if let Some(&id) = self.by_output.get(&node.output) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        if node.is_market_data() {
            self.stats.market_data_leaves += 1;
        } else {
            self.stats.function_nodes += 1;
        }
        self.by_output.insert(node.output.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Is the same value on the same target being resolved further up,
    /// under any constraints?
    pub(crate) fn is_in_progress(&self, requirement: &ValueRequirement) -> bool {
        self.in_progress.contains(&observation(requirement))
    }

    /// Requirements from the first one for the same value to the top of the stack
    pub(crate) fn cycle_path(&self, requirement: &ValueRequirement) -> Vec<ValueRequirement> {
        let start = self
            .requirement_stack
            .iter()
            .position(|r| r.target == requirement.target && r.value_name == requirement.value_name)
            .unwrap_or(0);
        let mut path = self.requirement_stack[start..].to_vec();
        path.push(requirement.clone());
        path
    }

    pub(crate) fn push_requirement(&mut self, requirement: &ValueRequirement) {
        self.in_progress.insert(observation(requirement));
        self.requirement_stack.push(requirement.clone());
    }

    pub(crate) fn pop_requirement(&mut self, requirement: &ValueRequirement) {
        self.requirement_stack.pop();
        self.in_progress.remove(&observation(requirement));
    }

    pub(crate) fn is_function_active(&self, function: &FunctionId, target: &TargetSpec) -> bool {
        self.function_stack
            .iter()
            .any(|(f, t)| f == function && t == target)
    }

    pub(crate) fn push_function(&mut self, function: FunctionId, target: TargetSpec) {
        self.function_stack.push((function, target));
    }

    pub(crate) fn pop_function(&mut self) {
        self.function_stack.pop();
    }
}

fn observation(requirement: &ValueRequirement) -> (TargetSpec, String) {
    (requirement.target.clone(), requirement.value_name.clone())
}
