//! The downstream false-discovery-rate objective the grid search optimizes against.
//!
//! Protein-FDR computation is treated as an external collaborator, consumed only through a
//! single scalar signature: `evaluate_protein_ids(proteins, point) -> f64`, larger-is-better.
//! This module defines that interface ([`FdrObjective`]) plus two reference scorers so the
//! grid search is exercisable without a real FDR pipeline.

/// A protein posterior, as presented to the FDR objective after inference: the accession and
/// the posterior presence probability written back onto the `Protein` vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinPosterior {
    /// The protein's accession.
    pub accession: String,
    /// The posterior presence probability, `P(present) \in [0, 1]`.
    pub score: f64,
}

/// The `(α, β, γ)` hyperparameter point an [`FdrObjective`] is being evaluated at.
///
/// Passed alongside the protein posteriors rather than stashed in interior-mutable state on
/// the objective, since the grid search may evaluate many points concurrently over a single
/// shared `&dyn FdrObjective`: interior mutability shared across threads would make the
/// evaluated point racy. A real FDR scorer has no use for it and simply ignores the argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPoint {
    /// Peptide emission `α`.
    pub alpha: f64,
    /// Spurious emission `β`.
    pub beta: f64,
    /// Protein prior `γ`.
    pub gamma: f64,
}

/// The downstream FDR objective: scores a completed inference run so the grid search can pick
/// the hyperparameter point that maximizes it.
pub trait FdrObjective: Send + Sync {
    /// Scores a set of protein posteriors computed at `point`. Larger is better.
    fn evaluate_protein_ids(&self, proteins: &[ProteinPosterior], point: ModelPoint) -> f64;
}

/// A synthetic objective whose value is a quadratic bowl centered on a target `(α, β, γ)`,
/// independent of the actual protein posteriors.
///
/// Exists purely to make a grid search's "selects the maximum" behavior mechanically
/// checkable: seeded with a target point, the grid search's argmax must land on the grid
/// point closest to it.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticProbeObjective {
    target_alpha: f64,
    target_beta: f64,
    target_gamma: f64,
}

impl QuadraticProbeObjective {
    /// Builds a probe objective targeting `(target_alpha, target_beta, target_gamma)`.
    pub fn new(target_alpha: f64, target_beta: f64, target_gamma: f64) -> Self {
        Self {
            target_alpha,
            target_beta,
            target_gamma,
        }
    }
}

impl FdrObjective for QuadraticProbeObjective {
    fn evaluate_protein_ids(&self, _proteins: &[ProteinPosterior], point: ModelPoint) -> f64 {
        -(point.alpha - self.target_alpha).powi(2)
            - (point.beta - self.target_beta).powi(2)
            - (point.gamma - self.target_gamma).powi(2)
    }
}

/// A target-decoy-style counting scorer: among proteins accepted at `score_threshold`, scores
/// higher when the decoy fraction is lower and mean accepted score is higher, blended by
/// `aucweight` (the `param_optimize:aucweight` configuration knob, forwarded here verbatim).
///
/// Decoys are identified by accession prefix, the common target-decoy database convention.
#[derive(Debug, Clone)]
pub struct TargetDecoyObjective {
    score_threshold: f64,
    decoy_prefix: String,
    aucweight: f64,
}

impl TargetDecoyObjective {
    /// Builds a counting scorer accepting proteins at posterior `>= score_threshold`,
    /// identifying decoys by `decoy_prefix`, blending the FDR term and the mean-score term by
    /// `aucweight \in [0, 1]`.
    pub fn new(score_threshold: f64, decoy_prefix: impl Into<String>, aucweight: f64) -> Self {
        Self {
            score_threshold,
            decoy_prefix: decoy_prefix.into(),
            aucweight,
        }
    }
}

impl FdrObjective for TargetDecoyObjective {
    fn evaluate_protein_ids(&self, proteins: &[ProteinPosterior], _point: ModelPoint) -> f64 {
        let accepted: Vec<&ProteinPosterior> = proteins
            .iter()
            .filter(|p| p.score >= self.score_threshold)
            .collect();
        if accepted.is_empty() {
            return 0.0;
        }
        let decoys = accepted
            .iter()
            .filter(|p| p.accession.starts_with(&self.decoy_prefix))
            .count();
        let fdr = decoys as f64 / accepted.len() as f64;
        let mean_score: f64 =
            accepted.iter().map(|p| p.score).sum::<f64>() / accepted.len() as f64;
        (1.0 - fdr) * (1.0 - self.aucweight) + mean_score * self.aucweight
    }
}
