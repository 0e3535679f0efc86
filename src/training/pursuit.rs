//! The greedy pursuit engine: one instance per output dimension.
//!
//! A pursuit owns its coefficient vector, selection mask and residual (or
//! running prediction) exclusively; the kernel matrix, column norms and
//! target vector are shared read-only. The orchestrator advances pursuits
//! in chunks so all of them meet at checkpoint barriers.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::RefitError;

use super::loss::LossKind;
use super::refit::{RefitMode, Refitter};

/// Per-fit pursuit configuration, identical across outputs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PursuitConfig {
    /// Iteration budget per output.
    pub n_nonzero_coefs: usize,
    /// Pseudo-residual loss; `None` maintains `y - prediction` incrementally.
    pub loss: Option<LossKind>,
    /// Exclude already-selected atoms from candidacy.
    pub check_duplicates: bool,
    pub refit: RefitMode,
    /// Backfitting period; 0 disables backfitting regardless of mode.
    pub n_refit: u32,
}

/// State machine for one output's pursuit.
pub(crate) struct Pursuit<'a> {
    k: ArrayView2<'a, f64>,
    norms: &'a [f64],
    y: ArrayView1<'a, f64>,
    config: PursuitConfig,

    coef: Array1<f64>,
    selected: Vec<bool>,
    /// `y - prediction`, maintained incrementally in no-loss mode and
    /// recomputed from the loss gradient otherwise.
    residual: Array1<f64>,
    /// Running prediction; only maintained in loss mode.
    prediction: Array1<f64>,
    used_iterations: u32,
    stopped: bool,
}

impl<'a> Pursuit<'a> {
    pub fn new(
        k: ArrayView2<'a, f64>,
        norms: &'a [f64],
        y: ArrayView1<'a, f64>,
        config: PursuitConfig,
    ) -> Self {
        let n_samples = k.nrows();
        let n_atoms = k.ncols();
        Self {
            k,
            norms,
            y,
            config,
            coef: Array1::zeros(n_atoms),
            selected: vec![false; n_atoms],
            residual: y.to_owned(),
            prediction: Array1::zeros(n_samples),
            used_iterations: 0,
            stopped: false,
        }
    }

    pub fn coef(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }

    pub fn selected(&self) -> &[bool] {
        &self.selected
    }

    pub fn used_iterations(&self) -> u32 {
        self.used_iterations
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Broadcast early stop: the pursuit takes no further steps.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Advance up to `steps` iterations, stopping early when the budget is
    /// exhausted or no selectable atom remains.
    pub fn run(&mut self, steps: u32, refitter: &dyn Refitter) -> Result<(), RefitError> {
        for _ in 0..steps {
            if self.stopped {
                break;
            }
            self.step(refitter)?;
        }
        Ok(())
    }

    fn step(&mut self, refitter: &dyn Refitter) -> Result<(), RefitError> {
        // Pseudo-residual: incremental without a loss, recomputed with one.
        if let Some(loss) = self.config.loss {
            let out = self
                .residual
                .as_slice_mut()
                .expect("residual is contiguous");
            loss.negative_gradient(self.y, self.prediction.view(), out);
        }

        let Some((best, best_dot)) = self.select_best() else {
            // No selectable atom left (duplicates excluded or all degenerate).
            self.stopped = true;
            return Ok(());
        };
        self.selected[best] = true;

        let i = self.used_iterations;
        let backfit = matches!(self.config.refit, RefitMode::Backfitting)
            && self.config.n_refit > 0
            && i % self.config.n_refit == 0;

        if backfit {
            self.backfit(refitter)?;
        } else {
            let column = self.k.column(best);
            let alpha = match self.config.loss {
                None => best_dot / (self.norms[best] * self.norms[best]),
                Some(loss) => loss.line_search(self.y, self.prediction.view(), column),
            };
            self.coef[best] += alpha;
            match self.config.loss {
                None => self.residual.scaled_add(-alpha, &column),
                Some(_) => self.prediction.scaled_add(alpha, &column),
            }
        }

        self.used_iterations += 1;
        if self.used_iterations as usize >= self.config.n_nonzero_coefs {
            self.stopped = true;
        }
        Ok(())
    }

    /// Stable argmax of `|K[:,j] . residual| / norm_j` over candidate atoms.
    ///
    /// Zero-norm columns are never selectable (degenerate atoms score 0
    /// without dividing); ties resolve to the lowest index. Returns the
    /// winning index and its raw (signed) dot product.
    fn select_best(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = f64::NEG_INFINITY;
        for (j, column) in self.k.columns().into_iter().enumerate() {
            if self.config.check_duplicates && self.selected[j] {
                continue;
            }
            let norm = self.norms[j];
            if norm == 0.0 {
                continue;
            }
            let dot = column.dot(&self.residual);
            let score = dot.abs() / norm;
            if score > best_score {
                best_score = score;
                best = Some((j, dot));
            }
        }
        best
    }

    /// Joint refit over all selected atoms; rebuilds coef and residual or
    /// prediction from the refitter's solution.
    fn backfit(&mut self, refitter: &dyn Refitter) -> Result<(), RefitError> {
        let active: Vec<usize> = self
            .selected
            .iter()
            .enumerate()
            .filter_map(|(j, &s)| s.then_some(j))
            .collect();
        let design = self.k.select(Axis(1), &active);
        let solution = refitter.fit(design.view(), self.y)?;

        self.coef.fill(0.0);
        for (c, &j) in active.iter().enumerate() {
            self.coef[j] = solution.coef[c];
        }

        match self.config.loss {
            None => {
                self.residual.assign(&self.y);
                self.residual -= &solution.decision;
            }
            Some(_) => self.prediction.assign(&solution.decision),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::column_norms;
    use crate::training::refit::Ridge;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn config(n: usize) -> PursuitConfig {
        PursuitConfig {
            n_nonzero_coefs: n,
            loss: None,
            check_duplicates: false,
            refit: RefitMode::Incremental,
            n_refit: 0,
        }
    }

    #[test]
    fn single_step_takes_closed_form_alpha() {
        // Orthogonal columns; y = 3 * column 1.
        let k = array![[1.0, 0.0], [0.0, 2.0]];
        let norms = column_norms(k.view());
        let y = array![0.0, 6.0];
        let mut p = Pursuit::new(k.view(), &norms, y.view(), config(1));
        p.run(1, &Ridge::least_squares()).unwrap();

        assert_eq!(p.selected(), &[false, true]);
        assert_abs_diff_eq!(p.coef()[1], 3.0, epsilon = 1e-12);
        assert!(p.is_stopped());
        assert_eq!(p.used_iterations(), 1);
    }

    #[test]
    fn ties_break_to_lowest_index() {
        // Identical columns score identically; index 0 must win.
        let k = array![[1.0, 1.0], [1.0, 1.0]];
        let norms = column_norms(k.view());
        let y = array![1.0, 1.0];
        let mut p = Pursuit::new(k.view(), &norms, y.view(), config(1));
        p.run(1, &Ridge::least_squares()).unwrap();
        assert_eq!(p.selected(), &[true, false]);
    }

    #[test]
    fn duplicate_columns_reselect_without_check_duplicates() {
        // After atom 0 absorbs y exactly, every later step re-picks atom 0
        // (stable argmax over all-zero scores) with a zero alpha.
        let k = array![[1.0, 1.0], [1.0, 1.0]];
        let norms = column_norms(k.view());
        let y = array![2.0, 2.0];
        let mut p = Pursuit::new(k.view(), &norms, y.view(), config(3));
        p.run(3, &Ridge::least_squares()).unwrap();
        assert_eq!(p.selected(), &[true, false]);
        assert_abs_diff_eq!(p.coef()[0], 2.0, epsilon = 1e-12);
        assert_eq!(p.coef()[1], 0.0);
    }

    #[test]
    fn check_duplicates_forces_distinct_atoms() {
        let k = array![[1.0, 1.0], [1.0, 1.0]];
        let norms = column_norms(k.view());
        let y = array![2.0, 2.0];
        let mut cfg = config(2);
        cfg.check_duplicates = true;
        let mut p = Pursuit::new(k.view(), &norms, y.view(), cfg);
        p.run(2, &Ridge::least_squares()).unwrap();
        assert_eq!(p.selected(), &[true, true]);
    }

    #[test]
    fn zero_norm_atom_is_never_selected() {
        let k = array![[0.0, 1.0], [0.0, 1.0]];
        let norms = column_norms(k.view());
        let y = array![1.0, 1.0];
        let mut p = Pursuit::new(k.view(), &norms, y.view(), config(2));
        p.run(2, &Ridge::least_squares()).unwrap();
        assert!(!p.selected()[0]);
        assert!(p.selected()[1]);
    }

    #[test]
    fn exhausted_candidates_stop_the_pursuit() {
        let k = array![[1.0], [1.0]];
        let norms = column_norms(k.view());
        let y = array![1.0, 1.0];
        let mut cfg = config(5);
        cfg.check_duplicates = true;
        let mut p = Pursuit::new(k.view(), &norms, y.view(), cfg);
        p.run(5, &Ridge::least_squares()).unwrap();
        // One atom, then nothing left to select.
        assert!(p.is_stopped());
        assert_eq!(p.used_iterations(), 1);
    }

    #[test]
    fn backfitting_residual_matches_direct_recomputation() {
        // Period 1: after every step the residual must equal
        // y - K[:, selected] . coef[selected] up to solver tolerance.
        let k = array![
            [1.0, 0.5, 0.2],
            [0.3, 1.0, 0.4],
            [0.1, 0.2, 1.0],
            [0.6, 0.1, 0.3]
        ];
        let norms = column_norms(k.view());
        let y = array![1.0, -0.5, 2.0, 0.7];
        let mut cfg = config(3);
        cfg.refit = RefitMode::Backfitting;
        cfg.n_refit = 1;
        let refitter = Ridge::new(1e-8);
        let mut p = Pursuit::new(k.view(), &norms, y.view(), cfg);

        for step in 0..3 {
            p.run(1, &refitter).unwrap();
            let direct = &y - &k.dot(&p.coef());
            for (r, d) in p.residual.iter().zip(direct.iter()) {
                assert_abs_diff_eq!(r, d, epsilon = 1e-6);
            }
            assert_eq!(p.used_iterations(), step + 1);
        }
    }

    #[test]
    fn squared_loss_matches_no_loss_path() {
        let k = array![
            [1.0, 0.5, 0.2],
            [0.3, 1.0, 0.4],
            [0.1, 0.2, 1.0],
            [0.6, 0.1, 0.3]
        ];
        let norms = column_norms(k.view());
        let y = array![1.0, -0.5, 2.0, 0.7];

        let mut plain = Pursuit::new(k.view(), &norms, y.view(), config(3));
        plain.run(3, &Ridge::least_squares()).unwrap();

        let mut cfg = config(3);
        cfg.loss = Some(LossKind::Squared);
        let mut squared = Pursuit::new(k.view(), &norms, y.view(), cfg);
        squared.run(3, &Ridge::least_squares()).unwrap();

        for (a, b) in plain.coef().iter().zip(squared.coef().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }
}
