//! Error types for fitting kernel matching pursuit models.
//!
//! Configuration and shape problems are detected at fit entry, before any
//! kernel computation. Refitter failures abort the fit and identify the
//! output and iteration that triggered them.

/// Invalid hyperparameter combination.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `n_nonzero_coefs` must resolve to a positive iteration count.
    #[error("n_nonzero_coefs must be > 0, got {0}")]
    NonPositiveCoefs(f64),

    /// `n_nonzero_coefs` cannot exceed the dictionary size.
    #[error("n_nonzero_coefs ({requested}) cannot exceed dictionary size ({dictionary_size})")]
    CoefsExceedDictionary {
        requested: usize,
        dictionary_size: usize,
    },

    /// Requested dictionary size exceeds the available samples.
    #[error("dictionary size ({requested}) exceeds available samples ({available})")]
    DictionaryExceedsSamples { requested: usize, available: usize },

    /// Dictionary size was non-positive, non-finite, or a fraction too
    /// small to yield a single atom.
    #[error("dictionary size {0} does not resolve to a positive atom count")]
    InvalidDictionarySize(f64),

    /// Balanced/stratified dictionary modes need class labels.
    #[error("dictionary mode {mode:?} requires class labels")]
    GroupModeNeedsLabels { mode: crate::dictionary::GroupMode },

    /// A precomputed kernel uses every training sample as an atom.
    #[error("precomputed kernel does not support dictionary sub-sampling")]
    PrecomputedDictionary,
}

/// Mismatched array dimensions between inputs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataShapeError {
    /// Features and targets disagree on the number of samples.
    #[error("features have {n_samples} samples but targets have {n_targets}")]
    SampleCount { n_samples: usize, n_targets: usize },

    /// Train and validation sets disagree on feature dimensionality.
    #[error("training features have {train} columns but validation features have {validation}")]
    ValidationWidth { train: usize, validation: usize },

    /// Train and validation targets disagree on output dimensionality.
    #[error("training targets have {train} columns but validation targets have {validation}")]
    TargetWidth { train: usize, validation: usize },

    /// A precomputed similarity matrix has the wrong width.
    #[error("precomputed matrix has {got} columns, expected {expected}")]
    PrecomputedWidth { expected: usize, got: usize },
}

/// Failure inside an external refitter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefitError {
    /// The normal equations were singular. A larger ridge penalty fixes this.
    #[error("normal equations are singular (ridge alpha = {alpha})")]
    Singular { alpha: f64 },
}

/// Top-level fit error.
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("invalid configuration")]
    Configuration(#[from] ConfigError),

    #[error("data shape mismatch")]
    DataShape(#[from] DataShapeError),

    /// A refitter call failed during backfitting.
    #[error("refit failed for output {output} at iteration {iteration}")]
    Refit {
        output: usize,
        iteration: u32,
        #[source]
        source: RefitError,
    },
}
