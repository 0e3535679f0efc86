//! Fitted kernel expansions and task-specific prediction wrappers.
//!
//! A [`KmpModel`] is the pruned result of a fit: the surviving dictionary
//! atoms, one coefficient row per output and the checkpoint score history.
//! [`KmpClassifier`] and [`KmpRegressor`] wrap it with label decoding and
//! target layout respectively.

use ndarray::{Array2, ArrayView2, Axis};

use crate::data::LabelBinarizer;
use crate::error::DataShapeError;
use crate::kernel::Kernel;
use crate::training::CheckpointHistory;

// =============================================================================
// KmpModel
// =============================================================================

/// A fitted kernel expansion, pruned to the atoms actually used.
#[derive(Clone, Debug)]
pub struct KmpModel {
    /// Surviving dictionary atoms, `[n_used, n_features]`. Empty-width for
    /// precomputed-kernel models.
    components: Array2<f64>,
    /// Original dictionary column index of each surviving atom, ascending.
    used_indices: Vec<usize>,
    /// Coefficients, `[n_outputs, n_used]`.
    coef: Array2<f64>,
    kernel: Kernel,
    /// Width of the dictionary the model was fit against, before pruning.
    dictionary_size: usize,
    history: CheckpointHistory,
}

impl KmpModel {
    pub(crate) fn from_parts(
        components: Array2<f64>,
        used_indices: Vec<usize>,
        coef: Array2<f64>,
        kernel: Kernel,
        dictionary_size: usize,
        history: CheckpointHistory,
    ) -> Self {
        Self {
            components,
            used_indices,
            coef,
            kernel,
            dictionary_size,
            history,
        }
    }

    /// Surviving atoms, `[n_used, n_features]`.
    pub fn components(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    /// Original dictionary indices of the surviving atoms.
    pub fn used_atom_indices(&self) -> &[usize] {
        &self.used_indices
    }

    /// Coefficients, `[n_outputs, n_used]`.
    pub fn coef(&self) -> ArrayView2<'_, f64> {
        self.coef.view()
    }

    pub fn n_outputs(&self) -> usize {
        self.coef.nrows()
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Checkpoint iteration numbers recorded during the fit.
    pub fn iterations(&self) -> &[u32] {
        &self.history.iterations
    }

    pub fn training_scores(&self) -> &[f64] {
        &self.history.training_scores
    }

    /// Empty when the fit had no validation set.
    pub fn validation_scores(&self) -> &[f64] {
        &self.history.validation_scores
    }

    pub fn history(&self) -> &CheckpointHistory {
        &self.history
    }

    /// Raw decision values for `x`, `[n_samples, n_outputs]`.
    ///
    /// For a precomputed kernel, `x` must be similarities against the full
    /// original dictionary; the surviving columns are selected internally.
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, DataShapeError> {
        let k = match self.kernel {
            Kernel::Precomputed => {
                if x.ncols() != self.dictionary_size {
                    return Err(DataShapeError::PrecomputedWidth {
                        expected: self.dictionary_size,
                        got: x.ncols(),
                    });
                }
                x.select(Axis(1), &self.used_indices)
            }
            _ => self.kernel.gram(x, self.components.view())?,
        };
        Ok(k.dot(&self.coef.t()))
    }
}

// =============================================================================
// KmpClassifier
// =============================================================================

/// One-vs-rest classifier over a fitted kernel expansion.
#[derive(Clone, Debug)]
pub struct KmpClassifier {
    model: KmpModel,
    binarizer: LabelBinarizer,
}

impl KmpClassifier {
    pub(crate) fn from_parts(model: KmpModel, binarizer: LabelBinarizer) -> Self {
        Self { model, binarizer }
    }

    pub fn model(&self) -> &KmpModel {
        &self.model
    }

    /// Class labels in the order of the decision-function columns.
    pub fn classes(&self) -> &[i64] {
        self.binarizer.classes()
    }

    /// Raw per-class decision values, `[n_samples, n_outputs]`.
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, DataShapeError> {
        self.model.decision_function(x)
    }

    /// Predicted class labels, one per input row.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>, DataShapeError> {
        let decisions = self.model.decision_function(x)?;
        Ok(self.binarizer.inverse_transform(decisions.t()))
    }
}

// =============================================================================
// KmpRegressor
// =============================================================================

/// Multi-target regressor over a fitted kernel expansion.
#[derive(Clone, Debug)]
pub struct KmpRegressor {
    model: KmpModel,
}

impl KmpRegressor {
    pub(crate) fn from_parts(model: KmpModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &KmpModel {
        &self.model
    }

    /// Predicted target values, `[n_samples, n_targets]`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, DataShapeError> {
        self.model.decision_function(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn linear_model() -> KmpModel {
        // Two atoms in feature space, one output: f(x) = 2 <x, a0> - <x, a1>.
        KmpModel::from_parts(
            array![[1.0, 0.0], [0.0, 1.0]],
            vec![0, 3],
            array![[2.0, -1.0]],
            Kernel::Linear,
            5,
            CheckpointHistory::default(),
        )
    }

    #[test]
    fn decision_function_is_kernel_expansion() {
        let model = linear_model();
        let x = array![[1.0, 1.0], [3.0, 0.0]];
        let d = model.decision_function(x.view()).unwrap();
        assert_eq!(d.dim(), (2, 1));
        assert_abs_diff_eq!(d[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d[[1, 0]], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn precomputed_model_selects_surviving_columns() {
        let model = KmpModel::from_parts(
            Array2::zeros((2, 0)),
            vec![1, 3],
            array![[1.0, 2.0]],
            Kernel::Precomputed,
            4,
            CheckpointHistory::default(),
        );
        // Similarities against all 4 original atoms.
        let sims = array![[0.9, 0.5, 0.1, 0.25]];
        let d = model.decision_function(sims.view()).unwrap();
        assert_abs_diff_eq!(d[[0, 0]], 0.5 + 2.0 * 0.25, epsilon = 1e-12);

        // Wrong width is rejected.
        let narrow = array![[0.5, 0.25]];
        assert!(matches!(
            model.decision_function(narrow.view()),
            Err(DataShapeError::PrecomputedWidth {
                expected: 4,
                got: 2
            })
        ));
    }
}
