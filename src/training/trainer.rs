//! The parallel orchestrator: one pursuit per output, shared checkpoints.
//!
//! Fitting decomposes into independent pursuits (one per one-vs-rest class
//! column, one per regression target column). Pursuits advance in lock-step
//! chunks of `n_validate` iterations: each chunk fans out across outputs,
//! then a sequential barrier scores the joint partial model from a
//! consistent snapshot and applies early stopping. Thread count never
//! affects numerical results.

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::LabelBinarizer;
use crate::dictionary::{build_dictionary, resolve_size, DictionaryParams};
use crate::error::{ConfigError, DataShapeError, FitError};
use crate::kernel::{column_norms, Kernel};
use crate::model::{KmpClassifier, KmpModel, KmpRegressor};
use crate::utils::run_with_threads;

use super::eval::{CheckpointHistory, EarlyStopAction, EarlyStopping, EvalTargets, ScoreMetric};
use super::logger::{TrainingLogger, Verbosity};
use super::loss::LossKind;
use super::pursuit::{Pursuit, PursuitConfig};
use super::refit::{RefitMode, Refitter, Ridge};

// =============================================================================
// KmpParams
// =============================================================================

/// Immutable configuration for one fit call.
#[derive(Clone, Debug)]
pub struct KmpParams {
    /// Pursuit iteration budget per output: a fraction of `n_samples` in
    /// (0, 1], or an absolute count when > 1.
    pub n_nonzero_coefs: f64,

    /// Pseudo-residual loss; `None` uses the incremental residual path.
    pub loss: Option<LossKind>,

    /// Dictionary construction.
    pub dictionary: DictionaryParams,

    /// Exclude already-selected atoms from re-selection.
    pub check_duplicates: bool,

    /// Single-atom updates or periodic joint refits.
    pub refit: RefitMode,

    /// Backfitting period; 0 disables backfitting regardless of `refit`.
    pub n_refit: u32,

    /// Kernel between samples and atoms.
    pub kernel: Kernel,

    /// Checkpoint every this many pursuit iterations; 0 disables score
    /// tracking (and with it early stopping).
    pub n_validate: u32,

    /// Minimum validation-score improvement between checkpoints. Only
    /// active when positive and a validation set is supplied.
    pub epsilon: f64,

    /// Worker threads for the per-output fan-out (0 = auto, 1 = sequential).
    pub n_threads: usize,

    /// Seed for dictionary selection/creation. All other computation is
    /// deterministic.
    pub seed: u64,

    pub verbosity: Verbosity,
}

impl Default for KmpParams {
    fn default() -> Self {
        Self {
            n_nonzero_coefs: 0.1,
            loss: None,
            dictionary: DictionaryParams::default(),
            check_duplicates: false,
            refit: RefitMode::Incremental,
            n_refit: 1,
            kernel: Kernel::Linear,
            n_validate: 1,
            epsilon: 0.0,
            n_threads: 0,
            seed: 0,
            verbosity: Verbosity::Silent,
        }
    }
}

// =============================================================================
// KmpTrainer
// =============================================================================

/// Fits kernel matching pursuit models.
///
/// The refitter is the external capability used for backfitting; the
/// provided [`Ridge`] covers the common case.
#[derive(Clone, Debug)]
pub struct KmpTrainer<R: Refitter = Ridge> {
    refitter: R,
    params: KmpParams,
}

struct FitOutcome {
    components: Array2<f64>,
    used_indices: Vec<usize>,
    coef: Array2<f64>,
    history: CheckpointHistory,
    dictionary_size: usize,
}

/// Scoring plan for checkpoints: metric plus targets for each set.
struct EvalPlan<'a> {
    metric: ScoreMetric,
    train: EvalTargets<'a>,
    validation: Option<(ArrayView2<'a, f64>, EvalTargets<'a>)>,
}

impl<R: Refitter> KmpTrainer<R> {
    pub fn new(refitter: R, params: KmpParams) -> Self {
        Self { refitter, params }
    }

    pub fn params(&self) -> &KmpParams {
        &self.params
    }

    /// Fit a one-vs-rest classifier.
    ///
    /// `labels` are arbitrary integer class labels; C classes produce C
    /// pursuits, collapsed to one for binary problems. The optional
    /// validation set drives score tracking and early stopping.
    pub fn fit_classifier(
        &self,
        x: ArrayView2<'_, f64>,
        labels: &[i64],
        validation: Option<(ArrayView2<'_, f64>, &[i64])>,
    ) -> Result<KmpClassifier, FitError> {
        if labels.len() != x.nrows() {
            return Err(DataShapeError::SampleCount {
                n_samples: x.nrows(),
                n_targets: labels.len(),
            }
            .into());
        }
        if let Some((x_val, val_labels)) = &validation {
            if val_labels.len() != x_val.nrows() {
                return Err(DataShapeError::SampleCount {
                    n_samples: x_val.nrows(),
                    n_targets: val_labels.len(),
                }
                .into());
            }
        }

        let binarizer = LabelBinarizer::fit(labels);
        let targets = binarizer.transform(labels);
        let train_classes = binarizer.class_indices(labels);
        let val_classes = validation.map(|(_, l)| binarizer.class_indices(l));

        let plan = EvalPlan {
            metric: ScoreMetric::Accuracy,
            train: EvalTargets::Classes(&train_classes),
            validation: validation
                .as_ref()
                .zip(val_classes.as_ref())
                .map(|((x_val, _), classes)| (x_val.view(), EvalTargets::Classes(classes))),
        };

        let outcome = self.fit_core(x, &targets, Some(&train_classes), plan)?;
        Ok(KmpClassifier::from_parts(
            self.finish_model(outcome),
            binarizer,
        ))
    }

    /// Fit a multi-target regressor.
    ///
    /// `targets` is `[n_samples, n_targets]`; each column gets its own
    /// pursuit.
    pub fn fit_regressor(
        &self,
        x: ArrayView2<'_, f64>,
        targets: ArrayView2<'_, f64>,
        validation: Option<(ArrayView2<'_, f64>, ArrayView2<'_, f64>)>,
    ) -> Result<KmpRegressor, FitError> {
        if targets.nrows() != x.nrows() {
            return Err(DataShapeError::SampleCount {
                n_samples: x.nrows(),
                n_targets: targets.nrows(),
            }
            .into());
        }
        if let Some((x_val, y_val)) = &validation {
            if y_val.nrows() != x_val.nrows() {
                return Err(DataShapeError::SampleCount {
                    n_samples: x_val.nrows(),
                    n_targets: y_val.nrows(),
                }
                .into());
            }
            if y_val.ncols() != targets.ncols() {
                return Err(DataShapeError::TargetWidth {
                    train: targets.ncols(),
                    validation: y_val.ncols(),
                }
                .into());
            }
        }

        let targets_t = targets.t().to_owned();
        let val_t = validation.map(|(_, y)| y.t().to_owned());

        let plan = EvalPlan {
            metric: ScoreMetric::MeanSquaredError,
            train: EvalTargets::Values(targets_t.view()),
            validation: validation
                .as_ref()
                .zip(val_t.as_ref())
                .map(|((x_val, _), y_t)| (x_val.view(), EvalTargets::Values(y_t.view()))),
        };

        let outcome = self.fit_core(x, &targets_t, None, plan)?;
        Ok(KmpRegressor::from_parts(self.finish_model(outcome)))
    }

    fn finish_model(&self, outcome: FitOutcome) -> KmpModel {
        KmpModel::from_parts(
            outcome.components,
            outcome.used_indices,
            outcome.coef,
            self.params.kernel,
            outcome.dictionary_size,
            outcome.history,
        )
    }

    /// The orchestrated fit shared by both tasks.
    ///
    /// `targets` is output-major `[n_outputs, n_samples]`; `dict_labels`
    /// carries class positions for class-aware dictionary modes.
    fn fit_core(
        &self,
        x: ArrayView2<'_, f64>,
        targets: &Array2<f64>,
        dict_labels: Option<&[usize]>,
        plan: EvalPlan<'_>,
    ) -> Result<FitOutcome, FitError> {
        let params = &self.params;
        let n_samples = x.nrows();

        // Fail fast: configuration and shapes before any kernel work.
        if params.n_nonzero_coefs <= 0.0 {
            return Err(ConfigError::NonPositiveCoefs(params.n_nonzero_coefs).into());
        }
        let budget = resolve_size(params.n_nonzero_coefs, n_samples);
        if budget == 0 {
            return Err(ConfigError::NonPositiveCoefs(params.n_nonzero_coefs).into());
        }
        if let Some((x_val, _)) = &plan.validation {
            if !params.kernel.is_precomputed() && x_val.ncols() != x.ncols() {
                return Err(DataShapeError::ValidationWidth {
                    train: x.ncols(),
                    validation: x_val.ncols(),
                }
                .into());
            }
        }

        let dictionary = if params.kernel.is_precomputed() {
            if params.dictionary.size.is_some() || params.dictionary.init_components.is_some() {
                return Err(ConfigError::PrecomputedDictionary.into());
            }
            // Atoms are the columns of the supplied similarity matrix.
            Array2::zeros((x.ncols(), 0))
        } else {
            let mut rng = StdRng::seed_from_u64(params.seed);
            build_dictionary(x, dict_labels, &params.dictionary, &mut rng)?
        };
        let n_atoms = dictionary.nrows();
        if budget > n_atoms {
            return Err(ConfigError::CoefsExceedDictionary {
                requested: budget,
                dictionary_size: n_atoms,
            }
            .into());
        }

        let k = params.kernel.gram(x, dictionary.view()).map_err(FitError::DataShape)?;
        let k_val = match &plan.validation {
            Some((x_val, _)) => Some(
                params
                    .kernel
                    .gram(*x_val, dictionary.view())
                    .map_err(FitError::DataShape)?,
            ),
            None => None,
        };
        let norms = column_norms(k.view());

        let n_outputs = targets.nrows();
        let pursuit_config = PursuitConfig {
            n_nonzero_coefs: budget,
            loss: params.loss,
            check_duplicates: params.check_duplicates,
            refit: params.refit,
            n_refit: params.n_refit,
        };
        let mut pursuits: Vec<Pursuit<'_>> = targets
            .axis_iter(Axis(0))
            .map(|y| Pursuit::new(k.view(), &norms, y, pursuit_config))
            .collect();

        let logger = TrainingLogger::new(params.verbosity);
        logger.start_fit(n_outputs, n_atoms, budget);

        let mut history = CheckpointHistory::default();
        let track = params.n_validate > 0;
        let mut early_stopping = EarlyStopping::new(
            if plan.validation.is_some() {
                params.epsilon
            } else {
                0.0
            },
            plan.metric.higher_is_better(),
        );

        let budget = budget as u32;
        let refitter = &self.refitter;
        run_with_threads(params.n_threads, |parallelism| {
            let mut iteration = 0u32;
            while iteration < budget && pursuits.iter().any(|p| !p.is_stopped()) {
                let steps = if track {
                    params.n_validate.min(budget - iteration)
                } else {
                    budget - iteration
                };

                // Fan out one chunk per output; pursuits share only
                // read-only data.
                let results =
                    parallelism.maybe_par_map(&mut pursuits[..], |p| p.run(steps, refitter));
                for (output, result) in results.into_iter().enumerate() {
                    if let Err(source) = result {
                        // Abort the whole fit; no partially-fit model.
                        return Err(FitError::Refit {
                            output,
                            iteration: pursuits[output].used_iterations(),
                            source,
                        });
                    }
                }
                iteration += steps;

                // Checkpoint barrier: full boundaries only.
                if track && iteration % params.n_validate == 0 {
                    let coef = stack_coefficients(&pursuits, n_atoms);
                    let train_decisions = coef.dot(&k.t());
                    let train_score = plan.metric.compute(train_decisions.view(), &plan.train);
                    let val_score = match (&plan.validation, &k_val) {
                        (Some((_, targets)), Some(k_val)) => {
                            Some(plan.metric.compute(coef.dot(&k_val.t()).view(), targets))
                        }
                        _ => None,
                    };

                    history.record(iteration, train_score, val_score);
                    logger.log_checkpoint(iteration, plan.metric, train_score, val_score);

                    if let Some(v) = val_score {
                        if early_stopping.update(v) == EarlyStopAction::Stop {
                            history.pop_last();
                            logger.log_early_stop(iteration, plan.metric);
                            for p in &mut pursuits {
                                p.stop();
                            }
                            break;
                        }
                    }
                }
            }
            Ok(())
        })?;

        // Assemble and prune: atoms with an all-zero coefficient column are
        // dropped from both the dictionary and the coefficient matrix.
        let coef_full = stack_coefficients(&pursuits, n_atoms);
        let used_indices: Vec<usize> = (0..n_atoms)
            .filter(|&j| coef_full.column(j).iter().any(|&v| v != 0.0))
            .collect();
        let coef = coef_full.select(Axis(1), &used_indices);
        let components = dictionary.select(Axis(0), &used_indices);

        logger.finish_fit(used_indices.len(), n_atoms);

        Ok(FitOutcome {
            components,
            used_indices,
            coef,
            history,
            dictionary_size: n_atoms,
        })
    }
}

/// Snapshot every pursuit's coefficients as `[n_outputs, n_atoms]`.
fn stack_coefficients(pursuits: &[Pursuit<'_>], n_atoms: usize) -> Array2<f64> {
    let mut coef = Array2::zeros((pursuits.len(), n_atoms));
    for (row, pursuit) in pursuits.iter().enumerate() {
        coef.row_mut(row).assign(&pursuit.coef());
    }
    coef
}
