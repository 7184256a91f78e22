//! The indistinguishable-group annotator: emits protein-group records from `ProteinGroup`
//! vertices once posteriors have been written back by the CC driver.

use crate::ident_graph::{ComponentView, IdentificationGraph, VertexKind};
use crate::types::{EPSILON, Error, Result};

/// A single indistinguishable protein group: the accessions of its members and their shared
/// posterior probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinGroupRecord {
    /// The accessions of every `Protein` vertex belonging to this group.
    pub accessions: Vec<String>,
    /// The group's posterior probability: the shared score of every member.
    pub probability: f64,
}

/// Emits a [`ProteinGroupRecord`] for every `ProteinGroup` vertex in a component with at
/// least two vertices (the same degenerate-CC skip the Bethe builder applies).
///
/// Every member of a `ProteinGroup` shares a posterior score by construction, so a mismatch
/// beyond [`EPSILON`] is always a hard [`Error::Structural`] rather than silently picking one
/// member's score, since a silent pass would misreport group posteriors to the caller.
pub fn annotate_indistinguishable_groups<G: IdentificationGraph>(
    ident: &G,
    ccs: &[ComponentView],
) -> Result<Vec<ProteinGroupRecord>> {
    let mut groups = Vec::new();
    for cc in ccs {
        if cc.vertices.len() < 2 {
            continue;
        }
        for &v in &cc.vertices {
            if ident.kind(v) != VertexKind::ProteinGroup {
                continue;
            }
            let members: Vec<usize> = ident
                .neighbors(v)
                .iter()
                .copied()
                .filter(|&u| ident.kind(u) == VertexKind::Protein)
                .collect();
            if members.is_empty() {
                continue;
            }
            let representative = ident.protein_score(members[0]);
            for &m in &members[1..] {
                let score = ident.protein_score(m);
                if (score - representative).abs() >= EPSILON {
                    return Err(Error::Structural(format!(
                        "ProteinGroup {v} members disagree on posterior score: {representative} vs {score}"
                    )));
                }
            }
            groups.push(ProteinGroupRecord {
                accessions: members
                    .iter()
                    .map(|&m| ident.protein_accession(m).to_string())
                    .collect(),
                probability: representative,
            });
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use crate::ident_graph::IdGraph;

    use super::*;

    #[test]
    fn two_member_group_shares_score_after_writeback() {
        let mut ident = IdGraph::new();
        let peptide = ident.add_peptide();
        let p1 = ident.add_protein("P1", 0.0);
        let p2 = ident.add_protein("P2", 0.0);
        ident.add_edge(p1, peptide);
        ident.add_edge(p2, peptide);
        ident.cluster_indistinguishable(false);
        ident.set_protein_score(p1, 0.42);
        ident.set_protein_score(p2, 0.42);

        let ccs = ident.connected_components();
        let groups = annotate_indistinguishable_groups(&ident, &ccs).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].accessions.len(), 2);
        assert!((groups[0].probability - 0.42).abs() < 1e-12);
    }

    #[test]
    fn mismatched_scores_are_a_structural_error() {
        let mut ident = IdGraph::new();
        let peptide = ident.add_peptide();
        let p1 = ident.add_protein("P1", 0.0);
        let p2 = ident.add_protein("P2", 0.0);
        ident.add_edge(p1, peptide);
        ident.add_edge(p2, peptide);
        ident.cluster_indistinguishable(false);
        ident.set_protein_score(p1, 0.42);
        ident.set_protein_score(p2, 0.99);

        let ccs = ident.connected_components();
        assert!(annotate_indistinguishable_groups(&ident, &ccs).is_err());
    }

    #[test]
    fn components_without_protein_groups_produce_no_records() {
        let mut ident = IdGraph::new();
        let protein = ident.add_protein("P1", 0.1);
        let peptide = ident.add_peptide();
        ident.add_edge(protein, peptide);
        let psm = ident.add_psm(0.5, 1, 0);
        ident.add_edge(peptide, psm);
        let ccs = ident.connected_components();
        assert!(annotate_indistinguishable_groups(&ident, &ccs).unwrap().is_empty());
    }
}
