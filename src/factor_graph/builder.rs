//! Builds a [`FactorGraph`] for a single connected component of an identification graph
//! (the "Bethe builder").

use crate::ident_graph::{IdentificationGraph, VertexKind};
use crate::types::{Error, FxIndexMap, Map, Result};

use super::factory::FactorFactory;
use super::graph::FactorGraph;

/// The factor graph built for one connected component, plus the identification-graph
/// vertex ids whose posteriors should be reported back (the `Protein` vertices).
pub struct BuiltComponent {
    /// The constructed factor graph.
    pub graph: FactorGraph,
    /// Identification-graph vertex ids, paired with their local variable index in `graph`,
    /// that should receive posterior write-back (`Protein` vertices only).
    pub posterior_vars: Vec<(usize, usize)>,
}

/// Builds a factor graph for the vertices of one connected component, following the table:
/// `Protein` gets a `ProteinFactor` and is recorded for posterior write-back; `ProteinGroup`
/// and `PeptideGroup` get a `PeptideProbabilisticAdderFactor` over their lower-kind
/// neighbors; `Psm` gets both a `SumEvidenceFactor` (parameterized by its evidence count) and
/// a `PeptideEvidenceFactor`. Components with fewer than two vertices are skipped, since a
/// singleton vertex has no factors to attach.
///
/// # Errors
///
/// * [`Error::Structural`] if a `Psm` vertex does not have exactly one lower-kind neighbor, or
///   has zero supporting evidences -- both violate the identification graph's invariants and
///   must abort only the offending component, not the whole crate.
///
pub fn build_factor_graph<G: IdentificationGraph>(
    ident: &G,
    component: &[usize],
    factory: &FactorFactory,
) -> Result<Option<BuiltComponent>> {
    if component.len() < 2 {
        return Ok(None);
    }

    let mut graph = FactorGraph::new();
    let mut var_of: Map<usize> = FxIndexMap::default();
    for &v in component {
        var_of.insert(v, graph.add_var(v));
    }

    let mut posterior_vars = Vec::new();

    for &v in component {
        let var = var_of[&v];
        let lower: Vec<usize> = ident
            .neighbors(v)
            .iter()
            .copied()
            .filter(|&u| ident.kind(u) < ident.kind(v))
            .collect();

        match ident.kind(v) {
            VertexKind::Protein => {
                graph.add_factor(factory.protein_factor(v), &[var]);
                posterior_vars.push((v, var));
            }
            VertexKind::ProteinGroup | VertexKind::PeptideGroup | VertexKind::Peptide => {
                // An ungrouped Peptide behaves like a one-member PeptideGroup: the adder
                // with a single parent reduces to an identity copy, so this also covers the
                // Protein--Peptide shortcut edge without a special case.
                let parents: Vec<usize> = lower.iter().map(|u| var_of[u]).collect();
                let mut adjacent = parents;
                adjacent.push(var);
                graph.add_factor(factory.probabilistic_adder_factor(), &adjacent);
            }
            VertexKind::Psm => {
                if lower.len() != 1 {
                    return Err(Error::Structural(format!(
                        "Psm vertex {v} must have exactly one lower-kind neighbor, found {}.",
                        lower.len()
                    )));
                }
                let parent = var_of[&lower[0]];
                let n = ident.psm_evidences_count(v);
                if n == 0 {
                    return Err(Error::Structural(format!(
                        "Psm vertex {v} has zero supporting evidences."
                    )));
                }
                graph.add_factor(factory.sum_evidence_factor(n), &[parent, var]);
                let score = ident.psm_score(v);
                graph.add_factor(factory.peptide_evidence_factor(score), &[var]);
            }
        }
    }

    Ok(Some(BuiltComponent {
        graph,
        posterior_vars,
    }))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::factor_graph::engine::BeliefPropagation;
    use crate::factor_graph::scheduler::Priority;
    use crate::ident_graph::IdGraph;
    use crate::types::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DAMPENING_LAMBDA};

    use super::*;

    #[test]
    fn single_protein_single_peptide_single_psm_matches_closed_form() {
        let mut ident = IdGraph::new();
        let protein = ident.add_protein("P00001", 0.0);
        let peptide = ident.add_peptide();
        let psm = ident.add_psm(0.9, 1, 0);
        ident.add_edge(protein, peptide);
        ident.add_edge(peptide, psm);

        let factory = FactorFactory::new(0.1, 0.001, 0.5);
        let cc = ident.connected_components().remove(0);
        let built = build_factor_graph(&ident, &cc.vertices, &factory).unwrap().unwrap();

        let mut graph = built.graph;
        let mut scheduler = Priority::new();
        scheduler
            .run(
                &mut graph,
                DEFAULT_DAMPENING_LAMBDA,
                DEFAULT_CONVERGENCE_THRESHOLD,
                1_000,
            )
            .unwrap();

        let (_, protein_var) = built.posterior_vars[0];
        let posteriors =
            BeliefPropagation::estimate_posteriors(&graph, &[protein_var]).unwrap();
        let posterior = posteriors[0].1.presence();

        // The peptide adder has a single parent, so it is an identity copy of the protein
        // variable; the joint over (protein, psm) is then Prior(protein) * SumEvidence(protein,
        // psm) * PeptideEvidence(psm), marginalized over psm and normalized over protein.
        let sum_ev_present = 1.0 - (1.0 - 0.1) * (1.0 - 0.001); // P(psm=1 | peptide=1)
        let sum_ev_absent = 0.001; // P(psm=1 | peptide=0) = beta
        let numerator = 0.5 * (sum_ev_present * 0.9 + (1.0 - sum_ev_present) * 0.1);
        let denominator =
            numerator + 0.5 * (sum_ev_absent * 0.9 + (1.0 - sum_ev_absent) * 0.1);
        let expected = numerator / denominator;
        assert_relative_eq!(posterior, expected, epsilon = 1e-9);
    }

    #[test]
    fn psm_with_more_than_one_lower_neighbor_is_a_structural_error() {
        // A Psm vertex must have exactly one lower-kind neighbor; wiring two peptides to
        // the same PSM violates that invariant. The builder must report this as a
        // recoverable error rather than silently picking one of the two.
        let mut ident = IdGraph::new();
        let protein = ident.add_protein("P00001", 0.0);
        let peptide1 = ident.add_peptide();
        let peptide2 = ident.add_peptide();
        let psm = ident.add_psm(0.9, 1, 0);
        ident.add_edge(protein, peptide1);
        ident.add_edge(peptide1, psm);
        ident.add_edge(peptide2, psm);

        let factory = FactorFactory::new(0.1, 0.001, 0.5);
        let cc = ident.connected_components().remove(0);
        let err = build_factor_graph(&ident, &cc.vertices, &factory).unwrap_err();
        assert!(matches!(err, crate::types::Error::Structural(_)));
    }

    #[test]
    fn psm_with_zero_evidences_is_a_structural_error() {
        let mut ident = IdGraph::new();
        let protein = ident.add_protein("P00001", 0.0);
        let peptide = ident.add_peptide();
        let psm = ident.add_psm(0.9, 0, 0);
        ident.add_edge(protein, peptide);
        ident.add_edge(peptide, psm);

        let factory = FactorFactory::new(0.1, 0.001, 0.5);
        let cc = ident.connected_components().remove(0);
        let err = build_factor_graph(&ident, &cc.vertices, &factory).unwrap_err();
        assert!(matches!(err, crate::types::Error::Structural(_)));
    }
}
