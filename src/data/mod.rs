//! Target encoding for pursuit fan-out.
//!
//! Classification problems are decomposed one-vs-rest: C classes become C
//! binary 0/1 target columns, collapsed to a single column for binary
//! problems. Regression targets pass through unchanged.
//!
//! # Layout
//!
//! Target matrices are output-major, `[n_outputs, n_samples]`: each output's
//! targets are contiguous, matching the per-pursuit fan-out.

mod labels;

pub use labels::LabelBinarizer;
