//! Pseudo-residual losses for boosting-style pursuit.
//!
//! Without a loss, the engine maintains `y - prediction` incrementally.
//! With one, the pseudo-residual is recomputed from scratch each step as
//! the negative gradient, and the step size comes from a line search along
//! the selected atom's column.

use ndarray::ArrayView1;

/// Loss function driving the pseudo-residual.
///
/// Only the squared loss exists today; it reproduces the incremental
/// no-loss path exactly (same closed-form step against the running
/// prediction), which is covered by an equivalence test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossKind {
    Squared,
}

impl LossKind {
    /// Negative gradient of the loss at the current prediction.
    pub fn negative_gradient(
        &self,
        y: ArrayView1<'_, f64>,
        prediction: ArrayView1<'_, f64>,
        out: &mut [f64],
    ) {
        match self {
            LossKind::Squared => {
                for (o, (t, p)) in out.iter_mut().zip(y.iter().zip(prediction.iter())) {
                    *o = t - p;
                }
            }
        }
    }

    /// Optimal step size along `column` from the current prediction.
    pub fn line_search(
        &self,
        y: ArrayView1<'_, f64>,
        prediction: ArrayView1<'_, f64>,
        column: ArrayView1<'_, f64>,
    ) -> f64 {
        match self {
            LossKind::Squared => {
                let squared_norm = column.dot(&column);
                if squared_norm == 0.0 {
                    return 0.0;
                }
                let mut dot = 0.0;
                for ((&c, &t), &p) in column.iter().zip(y.iter()).zip(prediction.iter()) {
                    dot += c * (t - p);
                }
                dot / squared_norm
            }
        }
    }
}
