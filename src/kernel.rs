//! Kernel (Gram matrix) evaluation between point sets and the dictionary.
//!
//! The pursuit engine only consumes the resulting matrices; swapping in a
//! different kernel means adding a variant here. All evaluations are
//! deterministic given identical inputs.
//!
//! # Layout
//!
//! `gram(a, b)` returns `[a_rows, b_rows]`: entry `(i, j)` is the kernel
//! value between row `i` of `a` and row `j` of `b`. Dictionaries are stored
//! atom-major, `[n_atoms, n_features]`, so `gram(x, dictionary)` is the
//! `n_samples x n_atoms` matrix the pursuit scores against.

use ndarray::{Array2, ArrayView2};

use crate::error::DataShapeError;

/// Kernel function between two points.
///
/// `Precomputed` treats the left-hand matrix as already-computed
/// similarities: [`Kernel::gram`] returns it unchanged after checking its
/// width against the dictionary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Kernel {
    Linear,
    Polynomial { degree: u32, coef0: f64, gamma: f64 },
    Rbf { gamma: f64 },
    Precomputed,
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Linear
    }
}

impl Kernel {
    /// RBF kernel with the original library's default `gamma`.
    pub fn rbf() -> Self {
        Kernel::Rbf { gamma: 0.1 }
    }

    /// Polynomial kernel with the original library's defaults.
    pub fn polynomial() -> Self {
        Kernel::Polynomial {
            degree: 4,
            coef0: 1.0,
            gamma: 0.1,
        }
    }

    /// Returns `true` for the precomputed pass-through kernel.
    pub fn is_precomputed(&self) -> bool {
        matches!(self, Kernel::Precomputed)
    }

    /// Pairwise kernel values between the rows of `a` and the rows of `b`.
    ///
    /// For `Precomputed`, `b` only contributes its expected width
    /// (`b.nrows()` atoms) and `a` is returned as-is.
    pub fn gram(
        &self,
        a: ArrayView2<'_, f64>,
        b: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>, DataShapeError> {
        match self {
            Kernel::Precomputed => {
                if a.ncols() != b.nrows() {
                    return Err(DataShapeError::PrecomputedWidth {
                        expected: b.nrows(),
                        got: a.ncols(),
                    });
                }
                Ok(a.to_owned())
            }
            Kernel::Linear => Ok(a.dot(&b.t())),
            Kernel::Polynomial {
                degree,
                coef0,
                gamma,
            } => {
                let mut k = a.dot(&b.t());
                k.mapv_inplace(|v| (gamma * v + coef0).powi(*degree as i32));
                Ok(k)
            }
            Kernel::Rbf { gamma } => {
                // ||x - z||^2 = ||x||^2 + ||z||^2 - 2 x.z
                let mut k = a.dot(&b.t());
                let a_sq: Vec<f64> = a.rows().into_iter().map(|r| r.dot(&r)).collect();
                let b_sq: Vec<f64> = b.rows().into_iter().map(|r| r.dot(&r)).collect();
                for ((i, j), v) in k.indexed_iter_mut() {
                    let d2 = a_sq[i] + b_sq[j] - 2.0 * *v;
                    *v = (-gamma * d2.max(0.0)).exp();
                }
                Ok(k)
            }
        }
    }
}

/// L2 norm of each column of a kernel matrix.
///
/// Zero norms (degenerate or duplicate atoms) are returned as-is; the
/// pursuit scorer treats those atoms as unselectable instead of dividing.
pub fn column_norms(k: ArrayView2<'_, f64>) -> Vec<f64> {
    k.columns()
        .into_iter()
        .map(|c| c.dot(&c).sqrt())
        .collect()
}
