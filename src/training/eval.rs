//! Checkpoint scoring and early stopping.
//!
//! Every `n_validate` pursuit iterations the orchestrator snapshots all
//! pursuits' coefficients at a barrier and scores the joint partial model
//! on the training set and, when supplied, on the validation set. The
//! recorded history is what callers inspect after the fit.

use ndarray::ArrayView2;

// =============================================================================
// ScoreMetric
// =============================================================================

/// Targets a metric scores against.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EvalTargets<'a> {
    /// Class position per sample (one-vs-rest classification).
    Classes(&'a [usize]),
    /// Raw target values, output-major `[n_outputs, n_samples]`.
    Values(ArrayView2<'a, f64>),
}

/// Checkpoint score metric, chosen by task type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreMetric {
    /// Fraction of one-vs-rest decisions matching the true class.
    Accuracy,
    /// Mean squared error over all outputs and samples.
    MeanSquaredError,
}

impl ScoreMetric {
    pub fn name(&self) -> &'static str {
        match self {
            ScoreMetric::Accuracy => "accuracy",
            ScoreMetric::MeanSquaredError => "mse",
        }
    }

    /// Whether higher values are better (true for accuracy, false for MSE).
    pub fn higher_is_better(&self) -> bool {
        matches!(self, ScoreMetric::Accuracy)
    }

    /// Score decision values `[n_outputs, n_samples]` against targets.
    ///
    /// Binary classification uses a single column with a 0.5 threshold;
    /// multiclass takes the argmax across output rows.
    pub(crate) fn compute(&self, decisions: ArrayView2<'_, f64>, targets: &EvalTargets<'_>) -> f64 {
        match (self, targets) {
            (ScoreMetric::Accuracy, EvalTargets::Classes(true_idx)) => {
                let n = decisions.ncols();
                debug_assert_eq!(true_idx.len(), n);
                let mut hits = 0usize;
                if decisions.nrows() == 1 {
                    for (i, &t) in true_idx.iter().enumerate() {
                        let predicted = usize::from(decisions[[0, i]] > 0.5);
                        if predicted == t {
                            hits += 1;
                        }
                    }
                } else {
                    for (i, &t) in true_idx.iter().enumerate() {
                        let col = decisions.column(i);
                        let mut best = 0usize;
                        let mut best_val = f64::NEG_INFINITY;
                        for (c, &v) in col.iter().enumerate() {
                            if v > best_val {
                                best_val = v;
                                best = c;
                            }
                        }
                        if best == t {
                            hits += 1;
                        }
                    }
                }
                hits as f64 / n as f64
            }
            (ScoreMetric::MeanSquaredError, EvalTargets::Values(values)) => {
                let mut sum = 0.0;
                for (d, t) in decisions.iter().zip(values.iter()) {
                    let err = d - t;
                    sum += err * err;
                }
                sum / decisions.len() as f64
            }
            _ => unreachable!("metric and target kinds are paired by the orchestrator"),
        }
    }
}

// =============================================================================
// CheckpointHistory
// =============================================================================

/// Score history recorded at checkpoint boundaries.
///
/// `iterations`, `training_scores` and, when a validation set was supplied,
/// `validation_scores` move in lock step; without a validation set the
/// validation vector stays empty. On early stop the triggering checkpoint
/// is removed, so the history ends at the last checkpoint that passed the
/// improvement test.
#[derive(Clone, Debug, Default)]
pub struct CheckpointHistory {
    pub iterations: Vec<u32>,
    pub training_scores: Vec<f64>,
    pub validation_scores: Vec<f64>,
}

impl CheckpointHistory {
    pub(crate) fn record(&mut self, iteration: u32, training: f64, validation: Option<f64>) {
        self.iterations.push(iteration);
        self.training_scores.push(training);
        if let Some(v) = validation {
            self.validation_scores.push(v);
        }
    }

    /// Drop the most recent checkpoint (the one that triggered early stop).
    pub(crate) fn pop_last(&mut self) {
        self.iterations.pop();
        self.training_scores.pop();
        self.validation_scores.pop();
    }

    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }
}

// =============================================================================
// EarlyStopping
// =============================================================================

/// Outcome of an early-stopping check at a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EarlyStopAction {
    Continue,
    /// Improvement fell below epsilon; all pursuits must stop.
    Stop,
}

/// Epsilon-improvement early stopping on validation scores.
///
/// Enabled only when `epsilon > 0` and a validation set exists. The first
/// checkpoint always continues (nothing to compare against).
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    epsilon: f64,
    higher_is_better: bool,
    previous: Option<f64>,
}

impl EarlyStopping {
    pub fn new(epsilon: f64, higher_is_better: bool) -> Self {
        Self {
            epsilon,
            higher_is_better,
            previous: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.epsilon > 0.0
    }

    /// Record the latest validation score and decide whether to stop.
    pub fn update(&mut self, value: f64) -> EarlyStopAction {
        if !self.is_enabled() {
            return EarlyStopAction::Continue;
        }
        let action = match self.previous {
            None => EarlyStopAction::Continue,
            Some(prev) => {
                let improvement = if self.higher_is_better {
                    value - prev
                } else {
                    prev - value
                };
                if improvement < self.epsilon {
                    EarlyStopAction::Stop
                } else {
                    EarlyStopAction::Continue
                }
            }
        };
        self.previous = Some(value);
        action
    }
}
