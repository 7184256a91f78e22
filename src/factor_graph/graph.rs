use crate::{
    pmf::Pmf,
    types::{Error, Result},
};

use super::factor::FactorKind;

/// A binary-domain variable node, mirroring one identification-graph vertex.
///
/// Every variable node has domain `{0, 1}`; the current belief is kept denormalized
/// between sweeps and only renormalized when read via [`VarNode::belief`].
#[derive(Debug, Clone)]
pub struct VarNode {
    /// The identification-graph vertex id this variable mirrors, used for posterior
    /// write-back by the CC driver.
    pub source_vertex: usize,
    /// Indices into [`FactorGraph::edges`] incident to this variable, in insertion order.
    pub incident_edges: Vec<usize>,
}

/// A factor node: either a small dense table or a parametric adder closure.
#[derive(Debug, Clone)]
pub struct FactorNode {
    /// The factor's function.
    pub kind: FactorKind,
    /// Indices into [`FactorGraph::edges`] incident to this factor, in the order the factor
    /// expects its adjacent variables (for [`FactorKind::Table`], `[parent, child]`; for
    /// [`FactorKind::Adder`], `[parents.., out]`).
    pub incident_edges: Vec<usize>,
}

/// An undirected edge between a variable and a factor, carrying the two directed messages
/// `v -> f` and `f -> v`.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Index of the incident [`VarNode`].
    pub var: usize,
    /// Index of the incident [`FactorNode`].
    pub factor: usize,
    /// The message sent from the variable to the factor.
    pub v_to_f: Pmf,
    /// The message sent from the factor to the variable.
    pub f_to_v: Pmf,
}

/// A factor graph built for a single connected component of the identification graph.
///
/// The graph owns its variables, factors and edges; [`VarNode::source_vertex`] carries the
/// back-reference needed to write posteriors onto the originating identification-graph
/// vertex.
#[derive(Debug, Clone, Default)]
pub struct FactorGraph {
    vars: Vec<VarNode>,
    factors: Vec<FactorNode>,
    edges: Vec<Edge>,
}

impl FactorGraph {
    /// Creates an empty factor graph.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable mirroring `source_vertex`, returning its local index.
    pub fn add_var(&mut self, source_vertex: usize) -> usize {
        self.vars.push(VarNode {
            source_vertex,
            incident_edges: Vec::new(),
        });
        self.vars.len() - 1
    }

    /// Adds a factor of the given kind connected to `adjacent_vars`, in order, returning its
    /// local index. Also creates the corresponding edges, seeded to the uniform message in
    /// the `v -> f` direction and to the factor's own unary table (or uniform, for
    /// multi-variable factors) in the `f -> v` direction.
    pub fn add_factor(&mut self, kind: FactorKind, adjacent_vars: &[usize]) -> usize {
        let seed_f_to_v = match &kind {
            FactorKind::Unary(pmf) => pmf.clone(),
            _ => Pmf::uniform_binary(),
        };
        let factor_idx = self.factors.len();
        let mut incident_edges = Vec::with_capacity(adjacent_vars.len());
        for &var in adjacent_vars {
            let edge_idx = self.edges.len();
            self.edges.push(Edge {
                var,
                factor: factor_idx,
                v_to_f: Pmf::uniform_binary(),
                f_to_v: seed_f_to_v.clone(),
            });
            self.vars[var].incident_edges.push(edge_idx);
            incident_edges.push(edge_idx);
        }
        self.factors.push(FactorNode {
            kind,
            incident_edges,
        });
        factor_idx
    }

    /// The number of variables in the graph.
    #[inline]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// The number of factors in the graph.
    #[inline]
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    /// The number of undirected edges in the graph.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// A reference to a variable node by local index.
    #[inline]
    pub fn var(&self, i: usize) -> &VarNode {
        &self.vars[i]
    }

    /// A reference to a factor node by local index.
    #[inline]
    pub fn factor(&self, i: usize) -> &FactorNode {
        &self.factors[i]
    }

    /// A reference to an edge by local index.
    #[inline]
    pub fn edge(&self, i: usize) -> &Edge {
        &self.edges[i]
    }

    /// The current `v -> f` message for the given edge.
    #[inline]
    pub fn v_to_f(&self, edge: usize) -> &Pmf {
        &self.edges[edge].v_to_f
    }

    /// The current `f -> v` message for the given edge.
    #[inline]
    pub fn f_to_v(&self, edge: usize) -> &Pmf {
        &self.edges[edge].f_to_v
    }

    /// Overwrites the `v -> f` message for the given edge.
    #[inline]
    pub fn set_v_to_f(&mut self, edge: usize, msg: Pmf) {
        self.edges[edge].v_to_f = msg;
    }

    /// Overwrites the `f -> v` message for the given edge.
    #[inline]
    pub fn set_f_to_v(&mut self, edge: usize, msg: Pmf) {
        self.edges[edge].f_to_v = msg;
    }

    /// Computes the raw (undampened) `v -> f` message for `edge`: the normalized product of
    /// `f -> v` messages on all of the variable's *other* incident edges, or the uniform
    /// distribution if this is the variable's only edge.
    pub fn raw_var_to_factor(&self, edge: usize) -> Result<Pmf> {
        let var = &self.vars[self.edges[edge].var];
        var.incident_edges
            .iter()
            .filter(|&&e| e != edge)
            .try_fold(Pmf::uniform_binary(), |acc, &e| {
                acc.product(&self.edges[e].f_to_v)
            })
    }

    /// Computes the raw (undampened) `f -> v` message for `edge`, dispatching on the
    /// factor's kind.
    pub fn raw_factor_to_var(&self, edge: usize) -> Result<Pmf> {
        let e = &self.edges[edge];
        let factor = &self.factors[e.factor];
        match &factor.kind {
            FactorKind::Unary(pmf) => Ok(pmf.clone()),
            FactorKind::Table(table) => {
                let pos = Self::position(&factor.incident_edges, edge)?;
                match pos {
                    0 => {
                        let incoming_child = self.raw_var_to_factor(factor.incident_edges[1])?;
                        Ok(table.message_to_a(&incoming_child))
                    }
                    1 => {
                        let incoming_parent = self.raw_var_to_factor(factor.incident_edges[0])?;
                        Ok(table.message_to_b(&incoming_parent))
                    }
                    _ => Err(Error::Structural(
                        "A table factor must have exactly two adjacent variables.".into(),
                    )),
                }
            }
            FactorKind::Adder(adder) => {
                let n = factor.incident_edges.len();
                let pos = Self::position(&factor.incident_edges, edge)?;
                if pos == n - 1 {
                    let parent_msgs = factor.incident_edges[..n - 1]
                        .iter()
                        .map(|&pe| self.raw_var_to_factor(pe))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(adder.message_to_out(&parent_msgs))
                } else {
                    let other_parent_msgs = factor.incident_edges[..n - 1]
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != pos)
                        .map(|(_, &pe)| self.raw_var_to_factor(pe))
                        .collect::<Result<Vec<_>>>()?;
                    let out_msg = self.raw_var_to_factor(factor.incident_edges[n - 1])?;
                    Ok(adder.message_to_parent(&other_parent_msgs, &out_msg))
                }
            }
        }
    }

    fn position(incident_edges: &[usize], edge: usize) -> Result<usize> {
        incident_edges
            .iter()
            .position(|&e| e == edge)
            .ok_or_else(|| Error::Structural("Edge not incident to its own factor.".into()))
    }

    /// The current belief of variable `i`: the normalized product of `f -> v` messages over
    /// all of its incident edges.
    pub fn belief(&self, i: usize) -> Result<Pmf> {
        self.vars[i]
            .incident_edges
            .iter()
            .try_fold(Pmf::uniform_binary(), |acc, &e| {
                acc.product(&self.edges[e].f_to_v)
            })
    }
}
