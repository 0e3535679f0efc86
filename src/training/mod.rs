//! Training infrastructure for kernel matching pursuit.
//!
//! - [`KmpTrainer`], [`KmpParams`]: the orchestrated fit over all outputs
//! - [`Refitter`], [`Ridge`], [`RefitMode`]: joint refitting (backfitting)
//! - [`LossKind`]: pseudo-residual losses for the functional-gradient path
//! - [`ScoreMetric`], [`CheckpointHistory`], [`EarlyStopping`]: checkpoint
//!   scoring and validation-driven stopping
//! - [`TrainingLogger`], [`Verbosity`]: structured fit logging

mod eval;
mod logger;
mod loss;
mod pursuit;
mod refit;
mod trainer;

pub use eval::{CheckpointHistory, EarlyStopAction, EarlyStopping, ScoreMetric};
pub use logger::{TrainingLogger, Verbosity};
pub use loss::LossKind;
pub use refit::{RefitMode, RefitSolution, Refitter, Ridge};
pub use trainer::{KmpParams, KmpTrainer};
