//! Drives a scheduler to convergence and extracts posterior marginals.

use crate::pmf::Pmf;
use crate::types::Result;

use super::graph::FactorGraph;
use super::scheduler::{ScheduleOutcome, Scheduler};

/// The belief-propagation engine: runs a [`Scheduler`] to fixpoint, then reads off
/// requested marginals.
pub struct BeliefPropagation;

impl BeliefPropagation {
    /// Runs `scheduler` against `graph` to convergence (or until its step budget is spent).
    pub fn run(
        graph: &mut FactorGraph,
        scheduler: &mut dyn Scheduler,
        lambda: f64,
        epsilon: f64,
        max_steps: u32,
    ) -> Result<ScheduleOutcome> {
        scheduler.run(graph, lambda, epsilon, max_steps)
    }

    /// Reads the current posterior belief of each requested variable: `normalize(product of
    /// incoming f -> v messages)`.
    pub fn estimate_posteriors(graph: &FactorGraph, vars: &[usize]) -> Result<Vec<(usize, Pmf)>> {
        vars.iter().map(|&v| Ok((v, graph.belief(v)?))).collect()
    }
}
