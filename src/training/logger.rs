//! Structured logging for fit progress.
//!
//! Emission goes through the `log` facade; [`Verbosity`] gates what the
//! trainer bothers to format at all, independent of the subscriber's own
//! level filtering.

use super::eval::ScoreMetric;

/// How much the trainer logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    /// Checkpoint scores and stop reasons.
    Info,
    /// Everything, including per-output pursuit completion.
    Debug,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Silent
    }
}

/// Logs fit lifecycle events at the configured verbosity.
#[derive(Clone, Copy, Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn start_fit(&self, n_outputs: usize, n_atoms: usize, n_nonzero_coefs: usize) {
        if self.verbosity >= Verbosity::Info {
            log::info!(
                "fitting {} pursuit(s) over {} atoms, budget {} per output",
                n_outputs,
                n_atoms,
                n_nonzero_coefs
            );
        }
    }

    pub fn log_checkpoint(
        &self,
        iteration: u32,
        metric: ScoreMetric,
        training: f64,
        validation: Option<f64>,
    ) {
        if self.verbosity < Verbosity::Info {
            return;
        }
        match validation {
            Some(v) => log::info!(
                "iter {:>5}  train-{}: {:.6}  valid-{}: {:.6}",
                iteration,
                metric.name(),
                training,
                metric.name(),
                v
            ),
            None => log::info!(
                "iter {:>5}  train-{}: {:.6}",
                iteration,
                metric.name(),
                training
            ),
        }
    }

    pub fn log_early_stop(&self, iteration: u32, metric: ScoreMetric) {
        if self.verbosity >= Verbosity::Info {
            log::info!(
                "early stop at iteration {}: {} improvement below epsilon",
                iteration,
                metric.name()
            );
        }
    }

    pub fn finish_fit(&self, n_used_atoms: usize, n_atoms: usize) {
        if self.verbosity >= Verbosity::Debug {
            log::debug!("fit done: {} of {} atoms used", n_used_atoms, n_atoms);
        }
    }
}
