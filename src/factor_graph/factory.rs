//! Builds factor kinds from the model hyperparameters (γ, α, β).

use std::sync::Arc;

use crate::pmf::{Pmf, Table};

use super::factor::{AdderFactor, FactorKind};

/// Extension point for adjusting a protein's prior before it enters the factor graph, for
/// proteins whose peptide evidence was filtered out upstream (e.g. by `top_psms`) and would
/// otherwise see a flat `γ` with no supporting evidence at all.
///
/// The default implementation is the identity: the factory ships no built-in policy for
/// this case, only the hook.
pub trait MissingPeptidePrior: Send + Sync {
    /// Returns the (possibly adjusted) prior to use for `protein_vertex`.
    fn adjust(&self, prior: Pmf, protein_vertex: usize) -> Pmf;
}

#[derive(Debug, Default, Clone, Copy)]
struct IdentityMissingPeptidePrior;

impl MissingPeptidePrior for IdentityMissingPeptidePrior {
    #[inline]
    fn adjust(&self, prior: Pmf, _protein_vertex: usize) -> Pmf {
        prior
    }
}

/// Constructs `ProteinFactor`, `PeptideEvidenceFactor`, `SumEvidenceFactor` and
/// `PeptideProbabilisticAdderFactor` instances from a fixed set of model hyperparameters.
#[derive(Clone)]
pub struct FactorFactory {
    alpha: f64,
    beta: f64,
    gamma: f64,
    #[allow(dead_code)]
    p: f64,
    missing_peptide_prior: Arc<dyn MissingPeptidePrior>,
}

impl FactorFactory {
    /// Builds a factory for peptide emission `alpha`, spurious emission `beta` and protein
    /// prior `gamma`. The marginalization exponent is fixed at `1` (sum-product); `p != 1`
    /// (max-product) is reserved for future use and not exposed here.
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            p: 1.0,
            missing_peptide_prior: Arc::new(IdentityMissingPeptidePrior),
        }
    }

    /// Installs a [`MissingPeptidePrior`] hook, replacing the identity default.
    #[must_use]
    pub fn with_missing_prior(mut self, hook: Arc<dyn MissingPeptidePrior>) -> Self {
        self.missing_peptide_prior = hook;
        self
    }

    /// `ProteinFactor(v)`: unary prior, `P(v=1) = γ`, passed through the missing-peptide
    /// hook.
    pub fn protein_factor(&self, protein_vertex: usize) -> FactorKind {
        let prior = self
            .missing_peptide_prior
            .adjust(Pmf::bernoulli(self.gamma), protein_vertex);
        FactorKind::Unary(prior)
    }

    /// `PeptideEvidenceFactor(v, s)`: unary evidence, `P(v=1) = s`.
    pub fn peptide_evidence_factor(&self, score: f64) -> FactorKind {
        FactorKind::Unary(Pmf::bernoulli(score))
    }

    /// `SumEvidenceFactor(n, parent, child)`: the noisy-OR over `n` independent sources,
    /// collapsed into a binary `[parent, child]` table since `parent` mirrors whether the
    /// single upstream peptide variable is present (every variable node is binary; `n` only
    /// scales how many independent chances that presence has to explain the PSM).
    ///
    /// `P(child=1 | parent=1) = 1 - (1-α)^n·(1-β)`, `P(child=1 | parent=0) = β`.
    pub fn sum_evidence_factor(&self, n: usize) -> FactorKind {
        let alpha = self.alpha;
        let beta = self.beta;
        let table = Table::from_fn((0, 1), (0, 1), move |parent, child| {
            let p_present = if parent == 1 {
                1.0 - (1.0 - alpha).powi(n as i32) * (1.0 - beta)
            } else {
                beta
            };
            if child == 1 {
                p_present
            } else {
                1.0 - p_present
            }
        });
        FactorKind::Table(table)
    }

    /// `PeptideProbabilisticAdderFactor(parents, out)`: presence-of-at-least-one aggregator
    /// over an arbitrary number of parents.
    pub fn probabilistic_adder_factor(&self) -> FactorKind {
        FactorKind::Adder(AdderFactor::new())
    }
}
