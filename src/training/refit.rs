//! Joint refitting of the selected atoms (backfitting).
//!
//! At a refit boundary the engine hands the kernel sub-matrix of all
//! currently-selected atoms to a [`Refitter`], overwrites the selected
//! coefficients with the returned solution, and rebuilds the residual or
//! prediction from the refitter's decision function. The refitter is an
//! external capability behind a trait; [`Ridge`] is the provided solver.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::RefitError;

/// When joint refits happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefitMode {
    /// Only ever update the newest atom's coefficient.
    Incremental,
    /// Refit all selected atoms whenever the iteration index is a multiple
    /// of the refit period. A period of 0 disables backfitting entirely.
    Backfitting,
}

impl Default for RefitMode {
    fn default() -> Self {
        RefitMode::Incremental
    }
}

/// Coefficients and fitted values returned by a refitter.
#[derive(Clone, Debug)]
pub struct RefitSolution {
    /// One coefficient per design column, in column order.
    pub coef: Array1<f64>,
    /// Decision-function values on the design matrix, one per row.
    pub decision: Array1<f64>,
}

/// Solves the joint least-squares-like problem over the selected atoms.
///
/// Implementations must accept an empty design matrix (zero selected
/// atoms) and return an empty solution for it.
pub trait Refitter: Send + Sync {
    fn fit(
        &self,
        design: ArrayView2<'_, f64>,
        targets: ArrayView1<'_, f64>,
    ) -> Result<RefitSolution, RefitError>;
}

/// Ridge regression via the normal equations, `(XᵀX + αI) w = Xᵀy`.
///
/// No intercept is fit, so the decision function is exactly `X w` and the
/// final kernel expansion reproduces it without a hidden offset.
#[derive(Clone, Copy, Debug)]
pub struct Ridge {
    /// L2 penalty. Zero gives plain least squares, at the cost of a
    /// possible [`RefitError::Singular`] on rank-deficient designs.
    pub alpha: f64,
}

impl Default for Ridge {
    fn default() -> Self {
        Ridge { alpha: 1.0 }
    }
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Ridge { alpha }
    }

    /// Unpenalized least squares.
    pub fn least_squares() -> Self {
        Ridge { alpha: 0.0 }
    }
}

impl Refitter for Ridge {
    fn fit(
        &self,
        design: ArrayView2<'_, f64>,
        targets: ArrayView1<'_, f64>,
    ) -> Result<RefitSolution, RefitError> {
        let n = design.nrows();
        let p = design.ncols();
        if p == 0 {
            return Ok(RefitSolution {
                coef: Array1::zeros(0),
                decision: Array1::zeros(n),
            });
        }

        let x = DMatrix::from_fn(n, p, |i, j| design[[i, j]]);
        let y = DVector::from_fn(n, |i, _| targets[i]);

        let mut gram = x.transpose() * &x;
        for i in 0..p {
            gram[(i, i)] += self.alpha;
        }
        let rhs = x.transpose() * &y;

        let chol = gram
            .cholesky()
            .ok_or(RefitError::Singular { alpha: self.alpha })?;
        let w = chol.solve(&rhs);
        let fitted = &x * &w;

        Ok(RefitSolution {
            coef: Array1::from_iter(w.iter().copied()),
            decision: Array1::from_iter(fitted.iter().copied()),
        })
    }
}
