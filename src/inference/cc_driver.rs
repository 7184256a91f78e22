//! The CC-parallel driver: builds a factor graph per connected component via the Bethe
//! builder, runs the configured scheduler to convergence, reads off posteriors, and
//! serializes write-back onto the identification graph.
//!
//! Whether peptide-grouping ran upstream is entirely a property of the `ComponentView`s this
//! driver is handed, not of the driver itself, so one type covers both cases rather than a
//! pair of near-identical copies.

use rayon::prelude::*;

use crate::config::SchedulingType;
use crate::factor_graph::{BeliefPropagation, FactorFactory, Scheduler, build_factor_graph};
use crate::factor_graph::scheduler::{Fifo, Priority, RandomSpanningTree};
use crate::fdr::ProteinPosterior;
use crate::ident_graph::{ComponentView, IdentificationGraph, VertexKind};
use crate::types::Result;

use super::CancellationToken;

/// The resolved set of parameters a single inference run needs, independent of where they
/// came from (a [`crate::config::Config`] or a grid-search trial point).
#[derive(Debug, Clone, Copy)]
pub struct InferenceConfig {
    /// Peptide emission `α`.
    pub alpha: f64,
    /// Spurious emission `β`.
    pub beta: f64,
    /// Protein prior `γ`.
    pub gamma: f64,
    /// The scheduler variant to use.
    pub scheduling_type: SchedulingType,
    /// Dampening factor `λ`.
    pub dampening_lambda: f64,
    /// Convergence threshold `ε`.
    pub convergence_threshold: f64,
    /// Maximum scheduler iterations `N`.
    pub max_iterations: u32,
    /// Seed used by `random_spanning_tree`.
    pub random_seed: u64,
    /// Whether CCs may be processed across a `rayon` worker pool.
    pub parallel: bool,
}

impl InferenceConfig {
    fn scheduler(&self) -> Box<dyn Scheduler> {
        match self.scheduling_type {
            SchedulingType::Priority => Box::new(Priority::new()),
            SchedulingType::Fifo => Box::new(Fifo::new()),
            SchedulingType::RandomSpanningTree => {
                Box::new(RandomSpanningTree::new(self.random_seed))
            }
        }
    }
}

/// The outcome of running inference on a single connected component.
#[derive(Debug, Clone)]
pub struct CcOutcome {
    /// Index of the component within the `ccs` slice passed to [`run_inference`].
    pub component: usize,
    /// Number of vertices in the component.
    pub size: usize,
    /// Whether the scheduler converged within the iteration budget.
    pub converged: bool,
    /// Number of scheduler steps taken.
    pub steps: u32,
}

/// The aggregated result of running inference over every connected component.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutcome {
    /// Per-component results, for components that were actually processed (skips
    /// degenerate CCs with fewer than two vertices).
    pub cc_outcomes: Vec<CcOutcome>,
    /// Components that raised a structural error, paired with the error. These do not abort
    /// the driver.
    pub failed: Vec<(usize, crate::types::Error)>,
    /// Set when a [`CancellationToken`] was observed between components; `cc_outcomes` and
    /// `failed` still carry whatever was computed before the cancellation point.
    pub cancelled_at: Option<usize>,
}

impl InferenceOutcome {
    /// Whether every processed component converged and none failed or were cancelled.
    pub fn is_complete(&self) -> bool {
        self.cancelled_at.is_none() && self.failed.is_empty() && self.cc_outcomes.iter().all(|c| c.converged)
    }
}

struct CcComputation {
    outcome: Option<CcOutcome>,
    writebacks: Vec<(usize, f64)>,
    error: Option<crate::types::Error>,
}

fn process_component<G: IdentificationGraph>(
    ident: &G,
    index: usize,
    cc: &ComponentView,
    config: &InferenceConfig,
) -> CcComputation {
    let factory = FactorFactory::new(config.alpha, config.beta, config.gamma);
    let run = (|| -> Result<CcComputation> {
        let Some(built) = build_factor_graph(ident, &cc.vertices, &factory)? else {
            return Ok(CcComputation {
                outcome: None,
                writebacks: Vec::new(),
                error: None,
            });
        };
        let mut graph = built.graph;
        let mut scheduler = config.scheduler();
        let schedule = BeliefPropagation::run(
            &mut graph,
            scheduler.as_mut(),
            config.dampening_lambda,
            config.convergence_threshold,
            config.max_iterations,
        )?;
        if !schedule.converged {
            log::warn!(
                "connected component {index} ({} vertices) did not converge within {} iterations",
                cc.vertices.len(),
                config.max_iterations
            );
        }
        let vars: Vec<usize> = built.posterior_vars.iter().map(|&(_, var)| var).collect();
        let posteriors = BeliefPropagation::estimate_posteriors(&graph, &vars)?;
        let writebacks = built
            .posterior_vars
            .iter()
            .zip(posteriors.iter())
            .map(|(&(vertex, _), (_, pmf))| (vertex, pmf.presence()))
            .collect();
        Ok(CcComputation {
            outcome: Some(CcOutcome {
                component: index,
                size: cc.vertices.len(),
                converged: schedule.converged,
                steps: schedule.steps,
            }),
            writebacks,
            error: None,
        })
    })();

    match run {
        Ok(computation) => computation,
        Err(error) => {
            log::warn!("connected component {index} failed: {error}");
            CcComputation {
                outcome: None,
                writebacks: Vec::new(),
                error: Some(error),
            }
        }
    }
}

/// Runs loopy belief propagation on every component in `ccs`, writing posteriors back onto
/// `ident`'s `Protein` vertices.
///
/// Components are processed independently (in parallel, via `rayon`, when
/// `config.parallel` is set) and write-back is always serialized by this function afterward,
/// since that is correct regardless of which mode computed the components.
///
/// Cancellation is checked only between components in the sequential path; the parallel path
/// computes every component's result unconditionally and then honors cancellation only when
/// deciding how much of the already-computed result to report, preserving the cancel-at-CC-
/// boundaries-only guarantee without adding synchronization inside the `rayon` pool.
pub fn run_inference<G: IdentificationGraph + Sync>(
    ident: &mut G,
    ccs: &[ComponentView],
    config: &InferenceConfig,
    cancel: Option<&CancellationToken>,
) -> Result<InferenceOutcome> {
    let mut outcome = InferenceOutcome::default();

    let computations: Vec<CcComputation> = if config.parallel {
        ccs.par_iter()
            .enumerate()
            .map(|(i, cc)| process_component(ident, i, cc, config))
            .collect()
    } else {
        let mut out = Vec::with_capacity(ccs.len());
        for (i, cc) in ccs.iter().enumerate() {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    outcome.cancelled_at = Some(i);
                    break;
                }
            }
            out.push(process_component(ident, i, cc, config));
        }
        out
    };

    if config.parallel {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                outcome.cancelled_at = Some(computations.len());
            }
        }
    }

    for (i, computation) in computations.into_iter().enumerate() {
        if let Some(error) = computation.error {
            outcome.failed.push((i, error));
            continue;
        }
        if let Some(cc_outcome) = computation.outcome {
            outcome.cc_outcomes.push(cc_outcome);
        }
        for (vertex, score) in computation.writebacks {
            ident.set_protein_score(vertex, score);
        }
    }

    Ok(outcome)
}

/// Collects every `Protein` vertex's current (posterior, after [`run_inference`]) score as a
/// [`ProteinPosterior`] list, the shape the downstream FDR objective consumes.
pub fn collect_protein_posteriors<G: IdentificationGraph>(ident: &G) -> Vec<ProteinPosterior> {
    (0..ident.num_vertices())
        .filter(|&v| ident.kind(v) == VertexKind::Protein)
        .map(|v| ProteinPosterior {
            accession: ident.protein_accession(v).to_string(),
            score: ident.protein_score(v),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::ident_graph::IdGraph;
    use crate::types::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DAMPENING_LAMBDA};

    use super::*;

    fn default_config() -> InferenceConfig {
        InferenceConfig {
            alpha: 0.1,
            beta: 0.001,
            gamma: 0.5,
            scheduling_type: SchedulingType::Priority,
            dampening_lambda: DEFAULT_DAMPENING_LAMBDA,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: 1_000,
            random_seed: 42,
            parallel: false,
        }
    }

    fn single_protein_single_peptide_single_psm() -> IdGraph {
        let mut g = IdGraph::new();
        let protein = g.add_protein("P00001", 0.0);
        let peptide = g.add_peptide();
        let psm = g.add_psm(0.9, 1, 0);
        g.add_edge(protein, peptide);
        g.add_edge(peptide, psm);
        g
    }

    #[test]
    fn writes_back_posterior_onto_protein_vertex() {
        let mut ident = single_protein_single_peptide_single_psm();
        let ccs = ident.connected_components();
        let config = default_config();
        let outcome = run_inference(&mut ident, &ccs, &config, None).unwrap();
        assert_eq!(outcome.cc_outcomes.len(), 1);
        assert!(outcome.is_complete());
        assert!(ident.protein_score(0) > 0.0 && ident.protein_score(0) < 1.0);
    }

    #[test]
    fn degenerate_single_vertex_component_is_skipped() {
        let mut ident = IdGraph::new();
        ident.add_protein("LONE", 0.5);
        let ccs = ident.connected_components();
        let config = default_config();
        let outcome = run_inference(&mut ident, &ccs, &config, None).unwrap();
        assert!(outcome.cc_outcomes.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn parallel_mode_matches_sequential_mode() {
        let mut seq = single_protein_single_peptide_single_psm();
        let mut par = seq.clone();
        let ccs = seq.connected_components();
        let mut config = default_config();
        run_inference(&mut seq, &ccs, &config, None).unwrap();
        config.parallel = true;
        run_inference(&mut par, &ccs, &config, None).unwrap();
        assert!((seq.protein_score(0) - par.protein_score(0)).abs() < 1e-9);
    }

    #[test]
    fn cancellation_before_first_component_reports_zero_processed() {
        let mut ident = single_protein_single_peptide_single_psm();
        let ccs = ident.connected_components();
        let config = default_config();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = run_inference(&mut ident, &ccs, &config, Some(&token)).unwrap();
        assert_eq!(outcome.cancelled_at, Some(0));
        assert!(outcome.cc_outcomes.is_empty());
    }

    #[test]
    fn unconverged_case_four_cycle_reports_non_convergence_and_valid_posteriors() {
        let _ = env_logger::builder().is_test(true).try_init();
        // A 4-cycle: two proteins sharing two peptides (p1-pep1-p2, p2-pep2-p1).
        let mut ident = IdGraph::new();
        let p1 = ident.add_protein("P1", 0.0);
        let p2 = ident.add_protein("P2", 0.0);
        let pep1 = ident.add_peptide();
        let pep2 = ident.add_peptide();
        ident.add_edge(p1, pep1);
        ident.add_edge(p2, pep1);
        ident.add_edge(p1, pep2);
        ident.add_edge(p2, pep2);
        let psm1 = ident.add_psm(0.9, 1, 0);
        let psm2 = ident.add_psm(0.9, 1, 1);
        ident.add_edge(pep1, psm1);
        ident.add_edge(pep2, psm2);

        let ccs = ident.connected_components();
        let mut config = default_config();
        config.max_iterations = 2;
        config.dampening_lambda = 0.0;
        let outcome = run_inference(&mut ident, &ccs, &config, None).unwrap();
        assert!(!outcome.cc_outcomes[0].converged);
        for v in [p1, p2] {
            let score = ident.protein_score(v);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
