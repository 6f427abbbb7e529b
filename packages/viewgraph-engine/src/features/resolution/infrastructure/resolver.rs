//! Depth-first requirement resolver
//!
//! For one `ValueRequirement`:
//! 1. memo hit → done
//! 2. observable market data → leaf node
//! 3. otherwise try compatible catalog candidates in comparator order,
//!    recursively resolving each candidate's inputs
//!
//! Cycle avoidance works at two levels: a value already being resolved for
//! the same target further up, under any constraints, fails with
//! `CycleDetected`, and a (function, target) pair already
//! on the stack is skipped. Both outcomes depend on the stack, so neither
//! they nor any success or failure resting on them is memoized.

use crate::config::ResolverConfig;
use crate::features::function_catalog::CatalogSnapshot;
use crate::features::resolution::domain::{
    AmbiguityMode, Candidate, CandidateComparator, DependencyNode, NodeId, NodeKind,
    RejectedCandidate, RejectionReason, ResolutionError, ResolutionFailure,
};
use crate::features::resolution::infrastructure::context::ResolutionContext;
use crate::features::resolution::ports::{MarketDataAvailability, TargetResolver};
use crate::features::value_model::{ValueRequirement, ValueSpecification};
use crate::shared::models::ComputationTarget;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct Resolver<'a> {
    catalog: &'a CatalogSnapshot,
    availability: &'a dyn MarketDataAvailability,
    targets: &'a dyn TargetResolver,
    max_depth: usize,
    ambiguity: AmbiguityMode,
    comparator: Arc<dyn CandidateComparator>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a CatalogSnapshot,
        availability: &'a dyn MarketDataAvailability,
        targets: &'a dyn TargetResolver,
    ) -> Self {
        Self::with_config(catalog, availability, targets, &ResolverConfig::default())
    }

    pub fn with_config(
        catalog: &'a CatalogSnapshot,
        availability: &'a dyn MarketDataAvailability,
        targets: &'a dyn TargetResolver,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            catalog,
            availability,
            targets,
            max_depth: config.max_depth,
            ambiguity: config.ambiguity,
            comparator: config.tie_break.comparator(),
        }
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn CandidateComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve `requirement` into a node of `ctx`
    pub fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        requirement: &ValueRequirement,
    ) -> Result<NodeId, ResolutionError> {
        self.resolve_at(ctx, requirement, 0)
    }

    fn resolve_at(
        &self,
        ctx: &mut ResolutionContext,
        requirement: &ValueRequirement,
        depth: usize,
    ) -> Result<NodeId, ResolutionError> {
        ctx.stats_mut().requirements += 1;

        if let Some(outcome) = ctx.memoized(requirement) {
            ctx.stats_mut().memo_hits += 1;
            return outcome;
        }

        if self
            .availability
            .is_available(&requirement.target, &requirement.value_name)
        {
            let id = ctx.market_data_leaf(requirement);
            trace!(%requirement, node = %id, "Resolved to market data");
            let outcome = Ok(id);
            ctx.memoize(requirement, &outcome, false);
            return outcome;
        }

        if ctx.is_in_progress(requirement) {
            ctx.mark_contextual();
            ctx.stats_mut().cycle_rejections += 1;
            return Err(ResolutionError::CycleDetected {
                requirement: requirement.clone(),
                path: ctx.cycle_path(requirement),
            });
        }

        if depth >= self.max_depth {
            ctx.mark_contextual();
            return Err(ResolutionError::DepthExceeded {
                requirement: requirement.clone(),
                limit: self.max_depth,
            });
        }

        let enclosing = ctx.enter_scope();
        ctx.push_requirement(requirement);
        let outcome = self.resolve_with_functions(ctx, requirement, depth);
        ctx.pop_requirement(requirement);
        let contextual = ctx.exit_scope(enclosing);

        ctx.memoize(requirement, &outcome, contextual);
        outcome
    }

    fn resolve_with_functions(
        &self,
        ctx: &mut ResolutionContext,
        requirement: &ValueRequirement,
        depth: usize,
    ) -> Result<NodeId, ResolutionError> {
        let target = self
            .targets
            .resolve(&requirement.target)
            .ok_or_else(|| ResolutionError::UnknownTarget(requirement.target.clone()))?;

        let mut rejected = Vec::new();
        let mut candidates = self.candidates(&target, requirement, &mut rejected);
        candidates.sort_by(|a, b| self.comparator.compare(a, b));

        let mut contextual = false;
        let mut resolved: Option<(Candidate, NodeId)> = None;

        for candidate in candidates {
            let function = candidate.id().clone();

            if ctx.is_function_active(&function, &requirement.target) {
                ctx.stats_mut().cycle_rejections += 1;
                ctx.mark_contextual();
                contextual = true;
                rejected.push(RejectedCandidate::new(function, RejectionReason::CycleDetected));
                continue;
            }

            let Some(inputs) = candidate.definition.requirements(&target, requirement) else {
                rejected.push(RejectedCandidate::new(
                    function,
                    RejectionReason::RequirementsUnavailable,
                ));
                continue;
            };

            ctx.push_function(function.clone(), requirement.target.clone());
            let input_outcome = self.resolve_inputs(ctx, &inputs, depth);
            ctx.pop_function();

            match input_outcome {
                Ok(input_ids) => {
                    let input_specifications = input_ids
                        .iter()
                        .filter_map(|id| ctx.node(*id).map(|node| node.output.clone()))
                        .collect();
                    let id = ctx.intern(DependencyNode {
                        kind: NodeKind::Function(function.clone()),
                        target: requirement.target.clone(),
                        inputs: input_ids,
                        input_specifications,
                        output: candidate.output.clone(),
                    });

                    if let Some((first, _)) = &resolved {
                        return Err(ResolutionError::Ambiguous {
                            requirement: requirement.clone(),
                            candidates: vec![first.id().clone(), function],
                        });
                    }
                    if self.ambiguity == AmbiguityMode::Deterministic {
                        debug!(%requirement, %function, node = %id, "Resolved");
                        return Ok(id);
                    }
                    resolved = Some((candidate, id));
                }
                Err(error @ ResolutionError::Ambiguous { .. }) => return Err(error),
                Err(error) => {
                    contextual |= error.is_contextual();
                    rejected.push(RejectedCandidate::new(
                        function,
                        RejectionReason::InputFailed(Box::new(error)),
                    ));
                }
            }
        }

        if let Some((candidate, id)) = resolved {
            debug!(%requirement, function = %candidate.id(), node = %id, "Resolved");
            return Ok(id);
        }

        ctx.stats_mut().candidates_rejected += rejected.len() as u64;
        debug!(%requirement, rejected = rejected.len(), "Unresolved");
        Err(ResolutionError::Unresolved(ResolutionFailure {
            requirement: requirement.clone(),
            rejected,
            contextual,
        }))
    }

    /// Candidates whose output template composes with the requirement
    fn candidates(
        &self,
        target: &ComputationTarget,
        requirement: &ValueRequirement,
        rejected: &mut Vec<RejectedCandidate>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        let entries = self.catalog.lookup(requirement.target.target_type);
        for (rank, entry) in entries.into_iter().enumerate() {
            let definition = &entry.definition;
            let id = definition.id();

            if !definition.can_apply_to(target) {
                rejected.push(RejectedCandidate::new(id.clone(), RejectionReason::NotApplicable));
                continue;
            }

            let templates: Vec<ValueSpecification> = definition
                .results(target)
                .into_iter()
                .filter(|spec| spec.value_name == requirement.value_name)
                .collect();
            if templates.is_empty() {
                rejected.push(RejectedCandidate::new(id.clone(), RejectionReason::NoMatchingOutput));
                continue;
            }

            let composed = templates.iter().find_map(|template| {
                let tagged = template.with_function(id.as_str());
                tagged
                    .properties
                    .compose(&requirement.constraints)
                    .map(|properties| ValueSpecification {
                        properties,
                        ..tagged
                    })
            });

            match composed {
                Some(output) => candidates.push(Candidate {
                    definition: Arc::clone(definition),
                    rank,
                    priority: entry.priority,
                    output,
                }),
                None => rejected.push(RejectedCandidate::new(
                    id.clone(),
                    RejectionReason::IncompatibleProperties,
                )),
            }
        }

        candidates
    }

    fn resolve_inputs(
        &self,
        ctx: &mut ResolutionContext,
        inputs: &[ValueRequirement],
        depth: usize,
    ) -> Result<Vec<NodeId>, ResolutionError> {
        inputs
            .iter()
            .map(|input| self.resolve_at(ctx, input, depth + 1))
            .collect()
    }
}

/// Resolve a single requirement in a fresh context
pub fn resolve_one(
    catalog: &CatalogSnapshot,
    availability: &dyn MarketDataAvailability,
    targets: &dyn TargetResolver,
    requirement: &ValueRequirement,
) -> Result<(ResolutionContext, NodeId), ResolutionError> {
    let mut ctx = ResolutionContext::new();
    let id = Resolver::new(catalog, availability, targets).resolve(&mut ctx, requirement)?;
    Ok((ctx, id))
}
