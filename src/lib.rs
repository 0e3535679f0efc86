//! kernel-pursuit: sparse kernel models via greedy matching pursuit.
//!
//! A model is a sparse expansion over a dictionary of atoms: each fit
//! greedily selects the atom whose kernel column best matches the current
//! residual, optionally refitting all selected atoms jointly (backfitting),
//! and tracks checkpoint scores for validation-driven early stopping.
//! Multi-output problems fan one pursuit per output across a thread pool
//! with results independent of the thread count.
//!
//! # Key Types
//!
//! - [`KmpTrainer`] / [`KmpParams`] - Configure and run a fit
//! - [`KmpClassifier`] / [`KmpRegressor`] - Fitted models with predict
//! - [`Kernel`] - Linear, polynomial, RBF or precomputed similarities
//! - [`DictionaryParams`] - Atom selection or k-means creation
//! - [`Ridge`] / [`Refitter`] - The backfitting solver seam
//!
//! # Example
//!
//! ```no_run
//! use kernel_pursuit::{KmpParams, KmpTrainer, Ridge};
//! use ndarray::Array2;
//!
//! let x = Array2::<f64>::zeros((100, 4));
//! let labels = vec![0i64; 100];
//! let trainer = KmpTrainer::new(Ridge::default(), KmpParams::default());
//! let classifier = trainer.fit_classifier(x.view(), &labels, None)?;
//! let predicted = classifier.predict(x.view())?;
//! # Ok::<(), kernel_pursuit::FitError>(())
//! ```

pub mod data;
pub mod dictionary;
pub mod error;
pub mod kernel;
pub mod model;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level model types
pub use model::{KmpClassifier, KmpModel, KmpRegressor};

// Configuration and training types
pub use dictionary::{DictionaryParams, DictionaryStrategy, GroupMode};
pub use kernel::Kernel;
pub use training::{
    CheckpointHistory, EarlyStopping, KmpParams, KmpTrainer, LossKind, RefitMode, Refitter, Ridge,
    ScoreMetric, Verbosity,
};

// Errors
pub use error::{ConfigError, DataShapeError, FitError, RefitError};

// Data helpers
pub use data::LabelBinarizer;

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
