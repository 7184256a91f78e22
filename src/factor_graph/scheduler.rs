//! Message schedulers: the policies that decide, at each step of loopy belief propagation,
//! which directed edge to recompute next.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::pmf::Pmf;
use crate::types::Result;

use super::graph::FactorGraph;

/// The outcome of running a scheduler to convergence (or exhausting its iteration budget).
#[derive(Debug, Clone, Copy)]
pub struct ScheduleOutcome {
    /// The number of scheduler steps taken (meaning varies by scheduler: message updates
    /// for `Priority`/`Fifo`, full tree sweeps for `RandomSpanningTree`).
    pub steps: u32,
    /// Whether all pending deltas fell below the convergence threshold before the step
    /// budget was exhausted.
    pub converged: bool,
}

/// A message-update policy for loopy belief propagation.
pub trait Scheduler {
    /// Runs message updates against `graph` until convergence or `max_steps` is reached.
    fn run(
        &mut self,
        graph: &mut FactorGraph,
        lambda: f64,
        epsilon: f64,
        max_steps: u32,
    ) -> Result<ScheduleOutcome>;
}

/// A directed message slot: either the `v -> f` or `f -> v` side of an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DirectedEdge {
    edge: usize,
    to_factor: bool,
}

impl DirectedEdge {
    fn raw(&self, graph: &FactorGraph) -> Result<Pmf> {
        if self.to_factor {
            graph.raw_var_to_factor(self.edge)
        } else {
            graph.raw_factor_to_var(self.edge)
        }
    }

    fn current(&self, graph: &FactorGraph) -> Pmf {
        if self.to_factor {
            graph.v_to_f(self.edge).clone()
        } else {
            graph.f_to_v(self.edge).clone()
        }
    }

    fn store(&self, graph: &mut FactorGraph, msg: Pmf) {
        if self.to_factor {
            graph.set_v_to_f(self.edge, msg);
        } else {
            graph.set_f_to_v(self.edge, msg);
        }
    }

    /// Directed edges whose value depends on this one having just changed: the other
    /// incident edges of the node on the *receiving* side.
    fn downstream(&self, graph: &FactorGraph) -> Vec<DirectedEdge> {
        if self.to_factor {
            let factor = graph.edge(self.edge).factor;
            graph
                .factor(factor)
                .incident_edges
                .iter()
                .filter(|&&e| e != self.edge)
                .map(|&e| DirectedEdge {
                    edge: e,
                    to_factor: false,
                })
                .collect()
        } else {
            let var = graph.edge(self.edge).var;
            graph
                .var(var)
                .incident_edges
                .iter()
                .filter(|&&e| e != self.edge)
                .map(|&e| DirectedEdge {
                    edge: e,
                    to_factor: true,
                })
                .collect()
        }
    }
}

fn all_directed_edges(graph: &FactorGraph) -> Vec<DirectedEdge> {
    (0..graph.num_edges())
        .flat_map(|edge| {
            [
                DirectedEdge {
                    edge,
                    to_factor: true,
                },
                DirectedEdge {
                    edge,
                    to_factor: false,
                },
            ]
        })
        .collect()
}

fn apply_update(
    graph: &mut FactorGraph,
    de: DirectedEdge,
    lambda: f64,
    epsilon: f64,
) -> Result<f64> {
    let raw = de.raw(graph)?;
    let old = de.current(graph);
    let delta = raw.l_inf_distance(&old);
    let damped = Pmf::dampen(&old, &raw, lambda).normalize()?;
    de.store(graph, damped);
    Ok(if delta.is_nan() { epsilon } else { delta })
}

/// Round-robins over every directed edge, sweeping until a full sweep produces deltas below
/// `epsilon` everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fifo;

impl Fifo {
    /// Constructs a FIFO scheduler.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for Fifo {
    fn run(
        &mut self,
        graph: &mut FactorGraph,
        lambda: f64,
        epsilon: f64,
        max_steps: u32,
    ) -> Result<ScheduleOutcome> {
        let directed = all_directed_edges(graph);
        let mut steps = 0;
        loop {
            let mut max_delta: f64 = 0.0;
            for &de in &directed {
                let delta = apply_update(graph, de, lambda, epsilon)?;
                max_delta = max_delta.max(delta);
            }
            steps += 1;
            if max_delta < epsilon {
                return Ok(ScheduleOutcome {
                    steps,
                    converged: true,
                });
            }
            if steps >= max_steps {
                return Ok(ScheduleOutcome {
                    steps,
                    converged: false,
                });
            }
        }
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    delta: f64,
    de: DirectedEdge,
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delta.partial_cmp(&other.delta).unwrap_or(Ordering::Equal)
    }
}

/// Lazy residual-priority scheduling: maintains a max-heap of pending deltas and always
/// updates the most stale directed edge next, recomputing only the edges its update could
/// have affected.
#[derive(Debug, Default, Clone, Copy)]
pub struct Priority;

impl Priority {
    /// Constructs a priority scheduler.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for Priority {
    fn run(
        &mut self,
        graph: &mut FactorGraph,
        lambda: f64,
        epsilon: f64,
        max_steps: u32,
    ) -> Result<ScheduleOutcome> {
        let mut heap = BinaryHeap::new();
        for de in all_directed_edges(graph) {
            let raw = de.raw(graph)?;
            let delta = raw.l_inf_distance(&de.current(graph));
            heap.push(HeapEntry { delta, de });
        }

        let mut steps = 0;
        while let Some(HeapEntry { delta, de }) = heap.pop() {
            if delta < epsilon {
                // The max-heap's top entry is stale (smaller than when pushed) and already
                // below threshold: every remaining entry is too, since recomputing only
                // shrinks toward zero as messages stabilize.
                return Ok(ScheduleOutcome {
                    steps,
                    converged: true,
                });
            }

            let fresh = de.raw(graph)?.l_inf_distance(&de.current(graph));
            if fresh > epsilon && (fresh - delta).abs() > epsilon {
                // Stale entry: neighbors changed since this was pushed. Re-push with the
                // current delta instead of applying a now-outdated update.
                heap.push(HeapEntry { delta: fresh, de });
                continue;
            }

            apply_update(graph, de, lambda, epsilon)?;
            steps += 1;
            if steps >= max_steps {
                return Ok(ScheduleOutcome {
                    steps,
                    converged: false,
                });
            }

            for downstream in de.downstream(graph) {
                let raw = downstream.raw(graph)?;
                let d = raw.l_inf_distance(&downstream.current(graph));
                if d >= epsilon {
                    heap.push(HeapEntry {
                        delta: d,
                        de: downstream,
                    });
                }
            }
        }

        Ok(ScheduleOutcome {
            steps,
            converged: true,
        })
    }
}

/// Samples a fresh spanning tree of the factor graph each iteration and runs an exact
/// two-pass (leaves-to-root, root-to-leaves) propagation along it.
pub struct RandomSpanningTree {
    rng: Xoshiro256PlusPlus,
}

impl RandomSpanningTree {
    /// Builds a scheduler seeded for reproducible tree sampling.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// A spanning tree of the factor graph's underlying (variable, factor) bipartite graph,
    /// as a parent-pointer array over a combined node space `[0, num_vars) ∪ [num_vars,
    /// num_vars + num_factors)`, built by a randomized BFS from vertex `0`.
    fn sample_spanning_tree(&mut self, graph: &FactorGraph) -> Vec<(usize, usize, bool)> {
        let num_vars = graph.num_vars();
        let total = num_vars + graph.num_factors();
        let mut visited = vec![false; total];
        let mut order = Vec::with_capacity(total.saturating_sub(1));
        let mut frontier = vec![0usize];
        visited[0] = true;

        while !frontier.is_empty() {
            frontier.shuffle(&mut self.rng);
            let mut next = Vec::new();
            for &node in &frontier {
                let neighbors = Self::adjacent_nodes(graph, node, num_vars);
                for n in neighbors {
                    if !visited[n] {
                        visited[n] = true;
                        let (edge, to_factor) = Self::connecting_edge(graph, node, n, num_vars);
                        order.push((edge, edge, to_factor));
                        next.push(n);
                    }
                }
            }
            frontier = next;
        }
        order.into_iter().map(|(e, _, d)| (e, e, d)).collect()
    }

    fn adjacent_nodes(graph: &FactorGraph, node: usize, num_vars: usize) -> Vec<usize> {
        if node < num_vars {
            graph
                .var(node)
                .incident_edges
                .iter()
                .map(|&e| num_vars + graph.edge(e).factor)
                .collect()
        } else {
            let factor = node - num_vars;
            graph
                .factor(factor)
                .incident_edges
                .iter()
                .map(|&e| graph.edge(e).var)
                .collect()
        }
    }

    fn connecting_edge(
        graph: &FactorGraph,
        from: usize,
        to: usize,
        num_vars: usize,
    ) -> (usize, bool) {
        if from < num_vars {
            let edges = &graph.var(from).incident_edges;
            let factor = to - num_vars;
            let edge = *edges
                .iter()
                .find(|&&e| graph.edge(e).factor == factor)
                .expect("spanning tree visited a node without a connecting edge");
            (edge, true)
        } else {
            let factor = from - num_vars;
            let edges = &graph.factor(factor).incident_edges;
            let edge = *edges
                .iter()
                .find(|&&e| graph.edge(e).var == to)
                .expect("spanning tree visited a node without a connecting edge");
            (edge, false)
        }
    }
}

impl Scheduler for RandomSpanningTree {
    fn run(
        &mut self,
        graph: &mut FactorGraph,
        lambda: f64,
        epsilon: f64,
        max_steps: u32,
    ) -> Result<ScheduleOutcome> {
        let mut steps = 0;
        loop {
            let tree_edges = self.sample_spanning_tree(graph);

            let mut max_delta: f64 = 0.0;
            // Leaves-to-root pass (the order spanning-out from the BFS root, reversed),
            // then root-to-leaves (forward): each pass updates the directed message that
            // flows in that direction along the sampled edge.
            for &(edge, _, to_factor) in tree_edges.iter().rev() {
                let de = DirectedEdge {
                    edge,
                    to_factor: !to_factor,
                };
                let delta = apply_update(graph, de, lambda, epsilon)?;
                max_delta = max_delta.max(delta);
            }
            for &(edge, _, to_factor) in &tree_edges {
                let de = DirectedEdge { edge, to_factor };
                let delta = apply_update(graph, de, lambda, epsilon)?;
                max_delta = max_delta.max(delta);
            }

            steps += 1;
            if max_delta < epsilon {
                return Ok(ScheduleOutcome {
                    steps,
                    converged: true,
                });
            }
            if steps >= max_steps {
                return Ok(ScheduleOutcome {
                    steps,
                    converged: false,
                });
            }
        }
    }
}
