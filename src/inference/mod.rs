//! The connected-component driver, grid search and indistinguishable-group annotator: the
//! orchestration layer wrapping the factor-graph core.

/// The indistinguishable-group annotator.
pub mod annotate;
/// A cooperative, CC-boundary cancellation signal.
pub mod cancellation;
/// The CC-parallel driver: builds, runs and writes back inference for every component.
pub mod cc_driver;
/// The `(α, β, γ)` grid search wrapping the CC driver.
pub mod grid_search;

pub use annotate::{ProteinGroupRecord, annotate_indistinguishable_groups};
pub use cancellation::CancellationToken;
pub use cc_driver::{CcOutcome, InferenceConfig, InferenceOutcome, collect_protein_posteriors, run_inference};
pub use grid_search::{GridPoint, GridSearch, GridSearchResult};

use crate::config::Config;
use crate::fdr::FdrObjective;
use crate::ident_graph::{ComponentView, IdentificationGraph};
use crate::types::Result;

/// The final output of a full run: either a grid search plus annotated groups, or (when
/// `config.annotate_groups_only` is set) just the annotated groups over `ident`'s current
/// scores, with inference skipped entirely.
pub enum RunOutcome {
    /// Inference ran: the grid search's result plus the resulting groups.
    Inferred {
        /// The grid search result.
        grid_search: GridSearchResult,
        /// Indistinguishable protein groups, annotated after the final re-run.
        groups: Vec<ProteinGroupRecord>,
    },
    /// `annotate_groups_only` was set: groups were annotated from whatever scores `ident`
    /// already carried, with no inference performed.
    AnnotateOnly {
        /// Indistinguishable protein groups.
        groups: Vec<ProteinGroupRecord>,
    },
}

/// Runs the full pipeline: grid search (if `config.annotate_groups_only` is false) followed
/// by the indistinguishable-group annotator, or just the annotator otherwise.
///
/// `ccs` is the caller-computed connected-component partition of `ident` (typically
/// `ident.connected_components()`); CC computation is an external collaborator's concern,
/// so this entry point consumes it rather than recomputing it.
pub fn run<G: IdentificationGraph + Sync + Clone>(
    ident: &mut G,
    ccs: &[ComponentView],
    config: &Config,
    search: &GridSearch,
    objective: &(dyn FdrObjective + Sync),
) -> Result<RunOutcome> {
    config.validate()?;

    if config.annotate_groups_only {
        let groups = annotate_indistinguishable_groups(ident, ccs)?;
        return Ok(RunOutcome::AnnotateOnly { groups });
    }

    let base = InferenceConfig {
        alpha: config.model_parameters.alpha,
        beta: config.model_parameters.beta,
        gamma: config.model_parameters.gamma,
        scheduling_type: config.loopy_belief_propagation.scheduling_type,
        dampening_lambda: config.loopy_belief_propagation.dampening_lambda,
        convergence_threshold: config.loopy_belief_propagation.convergence_threshold,
        max_iterations: config.loopy_belief_propagation.max_nr_iterations,
        random_seed: config.loopy_belief_propagation.random_seed,
        parallel: config.parallel,
    };

    let grid_search = search.run(ident, ccs, &base, objective)?;
    let groups = annotate_indistinguishable_groups(ident, ccs)?;
    Ok(RunOutcome::Inferred {
        grid_search,
        groups,
    })
}
