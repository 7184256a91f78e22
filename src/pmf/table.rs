use ndarray::Array2;

use super::Pmf;

/// A dense factor table over exactly two integer-valued variables, `a` and `b`.
///
/// Used for table-represented factors whose arity is small and fixed (`SumEvidenceFactor`);
/// higher-arity adders are represented parametrically instead, to avoid materializing an
/// exponential table.
#[derive(Debug, Clone)]
pub struct Table {
    first_a: i64,
    first_b: i64,
    /// `values[[i, j]]` is `phi(first_a + i, first_b + j)`.
    values: Array2<f64>,
}

impl Table {
    /// Builds a table from an explicit evaluator over the cartesian product of two supports.
    ///
    /// # Arguments
    ///
    /// * `support_a` - Inclusive `(first, last)` support of variable `a`.
    /// * `support_b` - Inclusive `(first, last)` support of variable `b`.
    /// * `phi` - The (non-negative) factor function.
    ///
    pub fn from_fn(
        support_a: (i64, i64),
        support_b: (i64, i64),
        phi: impl Fn(i64, i64) -> f64,
    ) -> Self {
        let (first_a, last_a) = support_a;
        let (first_b, last_b) = support_b;
        let na = (last_a - first_a + 1) as usize;
        let nb = (last_b - first_b + 1) as usize;
        let values = Array2::from_shape_fn((na, nb), |(i, j)| {
            phi(first_a + i as i64, first_b + j as i64)
        });
        Self {
            first_a,
            first_b,
            values,
        }
    }

    /// Marginalizes axis `b` out, weighting each row by the corresponding entry of
    /// `incoming_b`: `marginalize(table * broadcast(incoming_b), axis = b)`, returning the
    /// resulting message over `a`.
    pub fn message_to_a(&self, incoming_b: &Pmf) -> Pmf {
        let values = self
            .values
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, &phi)| phi * incoming_b.at(self.first_b + j as i64))
                    .sum()
            })
            .collect();
        Pmf::new(self.first_a, values)
    }

    /// Symmetric to [`Table::message_to_a`]: marginalizes axis `a` out, weighted by
    /// `incoming_a`, returning the resulting message over `b`.
    pub fn message_to_b(&self, incoming_a: &Pmf) -> Pmf {
        let nb = self.values.ncols();
        let values = (0..nb)
            .map(|j| {
                self.values
                    .column(j)
                    .iter()
                    .enumerate()
                    .map(|(i, &phi)| phi * incoming_a.at(self.first_a + i as i64))
                    .sum()
            })
            .collect();
        Pmf::new(self.first_b, values)
    }
}
