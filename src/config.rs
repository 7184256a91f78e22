//! The crate's configuration surface: a `serde`-deserializable set of tunables, with
//! documented defaults and a [`Config::validate`] that turns an out-of-range value into an
//! [`Error::Config`] rather than a panic, since config values originate from the outside
//! world, unlike an internal invariant.

use serde::{Deserialize, Serialize};

use crate::types::{
    DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DAMPENING_LAMBDA, DEFAULT_MAX_ITERATIONS, Error,
    Result,
};

/// The message-update policy a run should use, mirroring
/// `loopy_belief_propagation:scheduling_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingType {
    /// Lazy residual-priority scheduling.
    Priority,
    /// Round-robin over all directed edges.
    Fifo,
    /// Randomized spanning-tree two-pass propagation, reproducible given a seed.
    RandomSpanningTree,
}

impl Default for SchedulingType {
    #[inline]
    fn default() -> Self {
        Self::Priority
    }
}

/// The three model hyperparameters: protein prior `γ`, peptide emission `α`, spurious
/// emission `β`. Mirrors `model_parameters:*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelParameters {
    /// Protein prior `γ \in [0, 1]`.
    #[serde(default = "default_prot_prior", rename = "prot_prior")]
    pub gamma: f64,
    /// Peptide emission `α \in [0, 1]`.
    #[serde(default = "default_pep_emission", rename = "pep_emission")]
    pub alpha: f64,
    /// Spurious emission `β \in [0, 1]`.
    #[serde(
        default = "default_pep_spurious_emission",
        rename = "pep_spurious_emission"
    )]
    pub beta: f64,
}

fn default_prot_prior() -> f64 {
    0.9
}
fn default_pep_emission() -> f64 {
    0.1
}
fn default_pep_spurious_emission() -> f64 {
    0.001
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            gamma: default_prot_prior(),
            alpha: default_pep_emission(),
            beta: default_pep_spurious_emission(),
        }
    }
}

/// Loopy belief propagation tuning. Mirrors `loopy_belief_propagation:*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoopyBeliefPropagationConfig {
    /// The scheduler variant.
    #[serde(default)]
    pub scheduling_type: SchedulingType,
    /// Convergence threshold `ε > 0`.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
    /// Dampening factor `λ \in [0, 1)`.
    #[serde(default = "default_dampening_lambda")]
    pub dampening_lambda: f64,
    /// Maximum number of LBP iterations `N`. Defaults to [`DEFAULT_MAX_ITERATIONS`], i.e.
    /// effectively unbounded: `u32::MAX` iterations relying on the convergence test to stop
    /// a run first.
    #[serde(default = "default_max_nr_iterations")]
    pub max_nr_iterations: u32,
    /// Seed for `random_spanning_tree`'s per-iteration tree sampling, defaulted so the
    /// scheduler stays deterministic without requiring every caller to supply one.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_convergence_threshold() -> f64 {
    DEFAULT_CONVERGENCE_THRESHOLD
}
fn default_dampening_lambda() -> f64 {
    DEFAULT_DAMPENING_LAMBDA
}
fn default_max_nr_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_random_seed() -> u64 {
    42
}

impl Default for LoopyBeliefPropagationConfig {
    fn default() -> Self {
        Self {
            scheduling_type: SchedulingType::default(),
            convergence_threshold: default_convergence_threshold(),
            dampening_lambda: default_dampening_lambda(),
            max_nr_iterations: default_max_nr_iterations(),
            random_seed: default_random_seed(),
        }
    }
}

/// Options forwarded verbatim to the downstream FDR objective. Mirrors `param_optimize:*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParamOptimizeConfig {
    /// Weight blending an AUC-style term into the FDR objective, `\in [0, 1]`.
    #[serde(default = "default_aucweight")]
    pub aucweight: f64,
}

fn default_aucweight() -> f64 {
    0.2
}

impl Default for ParamOptimizeConfig {
    fn default() -> Self {
        Self {
            aucweight: default_aucweight(),
        }
    }
}

/// The crate's top-level configuration: every tunable option, with its documented default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Skip inference entirely and only run the indistinguishable-group annotator.
    #[serde(default)]
    pub annotate_groups_only: bool,
    /// Keep only the top-`N` PSMs per spectrum; `0` keeps all.
    #[serde(default = "default_top_psms")]
    pub top_psms: usize,
    /// The three model hyperparameters.
    #[serde(default)]
    pub model_parameters: ModelParameters,
    /// LBP tuning.
    #[serde(default)]
    pub loopy_belief_propagation: LoopyBeliefPropagationConfig,
    /// Options forwarded to the FDR objective.
    #[serde(default)]
    pub param_optimize: ParamOptimizeConfig,
    /// Whether CCs (and, independently, grid-search points) may run across a worker pool.
    #[serde(default)]
    pub parallel: bool,
}

fn default_top_psms() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotate_groups_only: false,
            top_psms: default_top_psms(),
            model_parameters: ModelParameters::default(),
            loopy_belief_propagation: LoopyBeliefPropagationConfig::default(),
            param_optimize: ParamOptimizeConfig::default(),
            parallel: false,
        }
    }
}

impl Config {
    /// Validates every declared range, returning the first violation found as
    /// [`Error::Config`].
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("model_parameters.prot_prior", self.model_parameters.gamma),
            ("model_parameters.pep_emission", self.model_parameters.alpha),
            (
                "model_parameters.pep_spurious_emission",
                self.model_parameters.beta,
            ),
            ("param_optimize.aucweight", self.param_optimize.aucweight),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "`{name}` must be in [0, 1], found {value}."
                )));
            }
        }
        let lambda = self.loopy_belief_propagation.dampening_lambda;
        if !(0.0..1.0).contains(&lambda) {
            return Err(Error::Config(format!(
                "`loopy_belief_propagation.dampening_lambda` must be in [0, 1), found {lambda}."
            )));
        }
        let epsilon = self.loopy_belief_propagation.convergence_threshold;
        if !(epsilon > 0.0) {
            return Err(Error::Config(format!(
                "`loopy_belief_propagation.convergence_threshold` must be > 0, found {epsilon}."
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert!(!config.annotate_groups_only);
        assert_eq!(config.top_psms, 1);
        assert_eq!(config.model_parameters.gamma, 0.9);
        assert_eq!(config.model_parameters.alpha, 0.1);
        assert_eq!(config.model_parameters.beta, 0.001);
        assert_eq!(config.loopy_belief_propagation.scheduling_type, SchedulingType::Priority);
        assert_eq!(config.param_optimize.aucweight, 0.2);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_gamma_fails_validation() {
        let mut config = Config::default();
        config.model_parameters.gamma = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn dampening_lambda_of_one_fails_validation() {
        let mut config = Config::default();
        config.loopy_belief_propagation.dampening_lambda = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_from_json_with_partial_overrides() {
        let json = r#"{"model_parameters": {"prot_prior": 0.5}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.model_parameters.gamma, 0.5);
        assert_eq!(config.model_parameters.alpha, 0.1);
        assert_eq!(config.top_psms, 1);
    }
}
