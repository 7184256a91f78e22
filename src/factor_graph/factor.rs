//! Factor kinds: either a small dense [`Table`] or the parametric probabilistic-adder
//! closure used for sum-of-evidence aggregation.

use crate::pmf::{Pmf, Table};
use crate::types::LOG_SPACE_ARITY_THRESHOLD;

/// A factor's representation: a unary prior/evidence table, a dense two-variable table, or
/// a parametric adder.
#[derive(Debug, Clone)]
pub enum FactorKind {
    /// A unary factor: its outgoing message to its single adjacent variable never depends
    /// on the incoming message, so the factor *is* the message.
    Unary(Pmf),
    /// A dense factor over exactly two adjacent variables, ordered `[parent, child]`.
    Table(Table),
    /// A deterministic "is at least one parent present" aggregator over an arbitrary
    /// number of binary parents plus one binary output, represented without ever
    /// materializing a `2^k`-sized table.
    Adder(AdderFactor),
}

/// The probabilistic-adder factor: its output is `1` iff at least one parent is `1`, and
/// `0` otherwise. It is exposed as a pair of message rules rather than a table because the
/// number of parents (protein-group or peptide-group members) is unbounded.
///
/// Internally it only ever needs `P(sum of parents = 0)`, the probability every parent is
/// absent, since the output is a threshold at one: this is computed either by convolving
/// the parent messages (small arity) or by summing log-probabilities (arity above
/// [`LOG_SPACE_ARITY_THRESHOLD`], where a product of many near-zero terms would otherwise
/// underflow).
#[derive(Debug, Clone, Copy, Default)]
pub struct AdderFactor;

impl AdderFactor {
    /// Constructs the adder. Stateless: all parameters live in the incoming messages.
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// `P(sum of the given messages' variables = 0)`, i.e. every one of them is absent.
    fn prob_all_absent(msgs: &[Pmf]) -> f64 {
        if msgs.is_empty() {
            return 1.0;
        }
        if msgs.len() > LOG_SPACE_ARITY_THRESHOLD {
            msgs.iter()
                .map(|m| m.at(0).max(f64::MIN_POSITIVE).ln())
                .sum::<f64>()
                .exp()
        } else {
            msgs.iter()
                .skip(1)
                .fold(msgs[0].clone(), |acc, m| acc.convolve(m))
                .at(0)
        }
    }

    /// The message sent to the `out` variable, given the current `v -> f` messages of every
    /// parent: `P(out=0) = P(all parents absent)`, `P(out=1)` is the complement.
    pub fn message_to_out(&self, parent_msgs: &[Pmf]) -> Pmf {
        let p_absent = Self::prob_all_absent(parent_msgs);
        Pmf::new(0, vec![p_absent, 1.0 - p_absent].into())
    }

    /// The message sent to one parent, given the `v -> f` messages of every *other* parent
    /// and the `v -> f` message of `out`.
    ///
    /// Since the parent being `1` forces `out=1` regardless of the other parents,
    /// `μ(parent=1) = μ_out(1)`; `μ(parent=0)` splits on whether the others already force
    /// `out=1`.
    pub fn message_to_parent(&self, other_parent_msgs: &[Pmf], out_msg: &Pmf) -> Pmf {
        let p_others_absent = Self::prob_all_absent(other_parent_msgs);
        let absent = p_others_absent * out_msg.at(0) + (1.0 - p_others_absent) * out_msg.at(1);
        let present = out_msg.at(1);
        Pmf::new(0, vec![absent, present].into())
    }
}
