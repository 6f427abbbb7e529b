// Graph Builder - Main Entry Point
//
// Drives the resolver over every (target, value name, constraints) tuple a view
// requests, sharing one resolution context across the whole pass so identical
// sub-requirements resolve once. Produces one DependencyGraph per calculation
// configuration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::features::function_catalog::CatalogSnapshot;
use crate::features::graph_builder::domain::{
    CalculationConfiguration, CompileError, CompileResult, DependencyGraph, RequiredFailure,
    TargetUniverse, UnresolvedOutput, ViewDefinition,
};
use crate::features::resolution::{
    MarketDataAvailability, NodeId, ResolutionContext, ResolutionStats, Resolver,
};
use crate::features::value_model::ValueRequirement;

/// Graphs for every calculation configuration of a view
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graphs: Vec<DependencyGraph>,
    pub stats: ResolutionStats,
}

/// One requested output
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedOutput {
    pub requirement: ValueRequirement,
    pub required: bool,
}

/// Expand a configuration into its requested outputs, in enumeration order
///
/// Portfolio requirements apply to each matching target in universe order,
/// then specific requirements follow. Duplicates collapse into the first
/// occurrence, which becomes required if any duplicate is.
pub fn requested_outputs(
    configuration: &CalculationConfiguration,
    universe: &TargetUniverse,
) -> Vec<RequestedOutput> {
    let mut outputs: Vec<RequestedOutput> = Vec::new();
    let mut seen: HashMap<ValueRequirement, usize> = HashMap::new();

    let mut add = |requirement: ValueRequirement, required: bool| match seen.get(&requirement) {
        Some(&i) => outputs[i].required |= required,
        None => {
            seen.insert(requirement.clone(), outputs.len());
            outputs.push(RequestedOutput {
                requirement,
                required,
            });
        }
    };

    for target in universe.targets() {
        for portfolio_requirement in &configuration.portfolio_requirements {
            if portfolio_requirement.matches(target) {
                add(
                    portfolio_requirement.requirement_for(target),
                    portfolio_requirement.required,
                );
            }
        }
    }
    for specific in &configuration.specific_requirements {
        add(specific.requirement.clone(), specific.required);
    }

    outputs
}

pub struct GraphBuilder<'a> {
    catalog: &'a CatalogSnapshot,
    availability: &'a dyn MarketDataAvailability,
    config: &'a ResolverConfig,
    cancelled: Option<&'a AtomicBool>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        catalog: &'a CatalogSnapshot,
        availability: &'a dyn MarketDataAvailability,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            catalog,
            availability,
            config,
            cancelled: None,
        }
    }

    /// Abort with `CompileError::Cancelled` once `flag` is set
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancelled = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Build every calculation configuration of `view` over `universe`
    ///
    /// Fails with `CompileError::Unresolved` listing every required output
    /// that could not be resolved, across all configurations.
    pub fn build(&self, view: &ViewDefinition, universe: &TargetUniverse) -> CompileResult<BuildOutput> {
        let start = Instant::now();
        let resolver = Resolver::with_config(self.catalog, self.availability, universe, self.config);
        let mut ctx = ResolutionContext::new();
        let mut failures: Vec<RequiredFailure> = Vec::new();
        let mut graphs = Vec::with_capacity(view.calculation_configurations.len());

        for configuration in &view.calculation_configurations {
            let mut terminals: Vec<(ValueRequirement, NodeId)> = Vec::new();
            let mut unresolved: Vec<UnresolvedOutput> = Vec::new();

            for output in requested_outputs(configuration, universe) {
                if self.is_cancelled() {
                    debug!(view = %view.id, "Graph build cancelled");
                    return Err(CompileError::Cancelled);
                }

                match resolver.resolve(&mut ctx, &output.requirement) {
                    Ok(id) => terminals.push((output.requirement, id)),
                    Err(error) if output.required => failures.push(RequiredFailure {
                        calculation_configuration: configuration.name.clone(),
                        requirement: output.requirement,
                        error,
                    }),
                    Err(error) => {
                        debug!(requirement = %output.requirement, %error, "Optional output unresolved");
                        unresolved.push(UnresolvedOutput {
                            requirement: output.requirement,
                            reason: error.to_string(),
                        });
                    }
                }
            }

            graphs.push(DependencyGraph::from_context(
                configuration.name.clone(),
                &ctx,
                &terminals,
                unresolved,
            ));
        }

        if !failures.is_empty() {
            info!(
                view = %view.id,
                failures = failures.len(),
                "Graph build failed: required outputs unresolved"
            );
            return Err(CompileError::Unresolved { failures });
        }

        for graph in &graphs {
            graph.validate()?;
        }

        let stats = ctx.stats();
        info!(
            view = %view.id,
            configurations = graphs.len(),
            nodes = graphs.iter().map(DependencyGraph::len).sum::<usize>(),
            memo_hits = stats.memo_hits,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Graph build complete"
        );

        Ok(BuildOutput { graphs, stats })
    }
}
