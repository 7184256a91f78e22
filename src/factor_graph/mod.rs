//! The factor graph data model, message-passer factory, Bethe builder, scheduler and
//! belief-propagation engine: everything needed to run loopy belief propagation on a single
//! connected component.

/// Builds a [`FactorGraph`] for one connected component of an identification graph.
pub mod builder;
/// Drives a [`scheduler::Scheduler`] to fixpoint and extracts posterior marginals.
pub mod engine;
/// Factor representations: unary tables, dense two-variable tables, and the parametric
/// probabilistic-adder.
pub mod factor;
/// Constructs factor instances from the model hyperparameters (α, β, γ).
pub mod factory;
/// The factor-graph arena: variable nodes, factor nodes and edges.
pub mod graph;
/// Message-update policies (priority, FIFO, random spanning tree) with dampening and a
/// convergence test.
pub mod scheduler;

pub use builder::{BuiltComponent, build_factor_graph};
pub use engine::BeliefPropagation;
pub use factor::{AdderFactor, FactorKind};
pub use factory::{FactorFactory, MissingPeptidePrior};
pub use graph::{Edge, FactorGraph, FactorNode, VarNode};
pub use scheduler::{Fifo, Priority, RandomSpanningTree, ScheduleOutcome, Scheduler};
