#![warn(missing_docs)]
//! # ProteoHub
//!
//! ProteoHub performs Bayesian protein inference over peptide-spectrum match (PSM)
//! evidence. Given an identification graph connecting proteins, protein groups, peptide
//! groups, peptides and PSMs, it builds a binary-variable factor graph per connected
//! component and runs loopy belief propagation to obtain posterior probabilities of
//! protein presence, then selects model hyperparameters via a grid search driven by an
//! external false-discovery-rate objective.

/// A `serde`-deserializable configuration surface with defaults for every tunable.
pub mod config;
/// The downstream false-discovery-rate objective the grid search optimizes against.
pub mod fdr;
/// The factor graph data model, message-passer factory, scheduler and belief
/// propagation engine.
pub mod factor_graph;
/// The identification graph: the upstream data model the factor graph is built from.
pub mod ident_graph;
/// The connected-component driver, grid search and indistinguishable-group annotator.
pub mod inference;
/// The probability mass function used as the message/belief representation.
pub mod pmf;
/// Support types: error handling, shared aliases, numeric constants.
pub mod types;

pub use crate::types::{Error, Result};
