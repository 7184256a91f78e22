//! The hyperparameter grid search: a cartesian scan over `(α, β, γ)` driven by an external
//! FDR objective, followed by one more inference run at the selected point.

use itertools::iproduct;
use rayon::prelude::*;

use crate::fdr::{FdrObjective, ModelPoint};
use crate::ident_graph::{ComponentView, IdentificationGraph};
use crate::types::Result;

use super::cc_driver::{CcOutcome, InferenceConfig, collect_protein_posteriors, run_inference};

/// One evaluated grid point: the hyperparameter triple and the objective value it scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Peptide emission `α`.
    pub alpha: f64,
    /// Spurious emission `β`.
    pub beta: f64,
    /// Protein prior `γ`.
    pub gamma: f64,
    /// `J = objective.evaluate_protein_ids(proteins, point)` at this point.
    pub objective: f64,
}

/// The full result of a grid search: every evaluated point, the selected argmax, the
/// re-run's inference outcome at that point, and the annotated protein groups.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Every `(α, β, γ)` point evaluated, in scan order.
    pub evaluations: Vec<GridPoint>,
    /// The point with the highest `objective`, ties broken lexicographically by
    /// `(α, β, γ)` scan order (the first point encountered wins a tie).
    pub best: GridPoint,
    /// The inference outcome of the final re-run at `best`.
    pub final_outcome: super::cc_driver::InferenceOutcome,
}

/// A finite, sorted cartesian grid over `(α, β, γ)`, scanned to maximize an [`FdrObjective`].
#[derive(Debug, Clone)]
pub struct GridSearch {
    /// Candidate peptide-emission values.
    pub alphas: Vec<f64>,
    /// Candidate spurious-emission values.
    pub betas: Vec<f64>,
    /// Candidate protein-prior values.
    pub gammas: Vec<f64>,
}

impl GridSearch {
    /// Builds a grid search over the given candidate vectors.
    ///
    /// # Panics
    ///
    /// * If any of the three vectors is empty.
    pub fn new(alphas: Vec<f64>, betas: Vec<f64>, gammas: Vec<f64>) -> Self {
        assert!(!alphas.is_empty() && !betas.is_empty() && !gammas.is_empty());
        Self {
            alphas,
            betas,
            gammas,
        }
    }

    /// Runs the scan: for each `(α, β, γ)` in `alphas × betas × gammas`, runs inference on a
    /// fresh clone of `ident` (so trial points never see each other's write-back) and scores
    /// the resulting protein posteriors via `objective`. Selects the argmax, then re-runs
    /// inference on `ident` itself (in place) at that point.
    ///
    /// Grid points are evaluated in parallel (`rayon`, when `base.parallel` is set) but
    /// CC-level parallelism is disabled for every trial run to avoid nesting two unbounded
    /// worker pools; the final re-run honors `base.parallel` as given, since at that point
    /// there is only one point left to run.
    pub fn run<G: IdentificationGraph + Sync + Clone>(
        &self,
        ident: &mut G,
        ccs: &[ComponentView],
        base: &InferenceConfig,
        objective: &(dyn FdrObjective + Sync),
    ) -> Result<GridSearchResult> {
        let points: Vec<(f64, f64, f64)> = iproduct!(
            self.alphas.iter().copied(),
            self.betas.iter().copied(),
            self.gammas.iter().copied()
        )
        .collect();

        let evaluate = |&(alpha, beta, gamma): &(f64, f64, f64)| -> Result<GridPoint> {
            let mut trial = ident.clone();
            let trial_config = InferenceConfig {
                alpha,
                beta,
                gamma,
                parallel: false,
                ..*base
            };
            run_inference(&mut trial, ccs, &trial_config, None)?;
            let proteins = collect_protein_posteriors(&trial);
            let point = ModelPoint { alpha, beta, gamma };
            Ok(GridPoint {
                alpha,
                beta,
                gamma,
                objective: objective.evaluate_protein_ids(&proteins, point),
            })
        };

        let evaluations: Vec<GridPoint> = if base.parallel {
            points
                .par_iter()
                .map(evaluate)
                .collect::<Result<Vec<_>>>()?
        } else {
            points.iter().map(evaluate).collect::<Result<Vec<_>>>()?
        };

        let best = evaluations
            .iter()
            .copied()
            .fold(None::<GridPoint>, |acc, point| match acc {
                None => Some(point),
                Some(current) if point.objective > current.objective => Some(point),
                Some(current) => Some(current),
            })
            .expect("grid search scans at least one point");

        let final_config = InferenceConfig {
            alpha: best.alpha,
            beta: best.beta,
            gamma: best.gamma,
            ..*base
        };
        let final_outcome = run_inference(ident, ccs, &final_config, None)?;

        Ok(GridSearchResult {
            evaluations,
            best,
            final_outcome,
        })
    }
}

/// Total number of CCs that converged across a set of outcomes, for progress reporting.
pub fn count_converged(outcomes: &[CcOutcome]) -> usize {
    outcomes.iter().filter(|o| o.converged).count()
}

#[cfg(test)]
mod tests {
    use crate::config::SchedulingType;
    use crate::fdr::QuadraticProbeObjective;
    use crate::ident_graph::IdGraph;
    use crate::types::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DAMPENING_LAMBDA};

    use super::*;

    fn base_config() -> InferenceConfig {
        InferenceConfig {
            alpha: 0.1,
            beta: 0.001,
            gamma: 0.9,
            scheduling_type: SchedulingType::Priority,
            dampening_lambda: DEFAULT_DAMPENING_LAMBDA,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: 1_000,
            random_seed: 42,
            parallel: false,
        }
    }

    fn toy_graph() -> IdGraph {
        let mut g = IdGraph::new();
        let protein = g.add_protein("P00001", 0.0);
        let peptide = g.add_peptide();
        let psm = g.add_psm(0.9, 1, 0);
        g.add_edge(protein, peptide);
        g.add_edge(peptide, psm);
        g
    }

    #[test]
    fn grid_search_selects_point_closest_to_quadratic_target() {
        let mut ident = toy_graph();
        let ccs = ident.connected_components();
        let search = GridSearch::new(
            vec![0.1, 0.3, 0.5],
            vec![0.001, 0.01],
            vec![0.3, 0.5, 0.7],
        );
        let objective = QuadraticProbeObjective::new(0.3, 0.001, 0.5);
        let result = search
            .run(&mut ident, &ccs, &base_config(), &objective)
            .unwrap();
        assert_eq!(result.best.alpha, 0.3);
        assert_eq!(result.best.beta, 0.001);
        assert_eq!(result.best.gamma, 0.5);
        assert_eq!(result.evaluations.len(), 3 * 2 * 3);
    }

    #[test]
    fn grid_search_leaves_ident_at_best_point_posteriors() {
        let mut ident = toy_graph();
        let ccs = ident.connected_components();
        let search = GridSearch::new(vec![0.1], vec![0.001], vec![0.5]);
        let objective = QuadraticProbeObjective::new(0.1, 0.001, 0.5);
        let result = search
            .run(&mut ident, &ccs, &base_config(), &objective)
            .unwrap();
        assert_eq!(result.final_outcome.cc_outcomes.len(), 1);
        assert!(ident.protein_score(0) > 0.0);
    }

    #[test]
    fn parallel_grid_search_matches_sequential() {
        let mut seq_ident = toy_graph();
        let mut par_ident = toy_graph();
        let ccs = seq_ident.connected_components();
        let search = GridSearch::new(vec![0.1, 0.3], vec![0.001], vec![0.3, 0.9]);
        let objective = QuadraticProbeObjective::new(0.3, 0.001, 0.9);

        let mut seq_base = base_config();
        seq_base.parallel = false;
        let seq_result = search
            .run(&mut seq_ident, &ccs, &seq_base, &objective)
            .unwrap();

        let mut par_base = base_config();
        par_base.parallel = true;
        let par_result = search
            .run(&mut par_ident, &ccs, &par_base, &objective)
            .unwrap();

        assert_eq!(seq_result.best.alpha, par_result.best.alpha);
        assert_eq!(seq_result.best.beta, par_result.best.beta);
        assert_eq!(seq_result.best.gamma, par_result.best.gamma);
    }
}
