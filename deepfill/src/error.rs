use thiserror::Error;

/// The error type for `DeepFill-Burn` operations.
///
/// This enum covers everything that can end a training run: configuration problems,
/// broken data contracts, failing sinks and checkpoint I/O.
#[derive(Error, Debug)]
pub enum DeepFillError {
    /// Error for when an invalid training configuration is provided.
    /// This can happen if configuration parameters are logically inconsistent.
    #[error("Invalid training configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when a tensor has an unexpected shape.
    #[error("Invalid tensor shape for {name}: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The tensor that failed the check.
        name: String,
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for when dataset operations fail.
    #[error("Dataset error: {message}")]
    DatasetError {
        /// The error message.
        message: String,
    },

    /// Error for when a fresh pass over the data source still yields no batch.
    #[error("Data source failed after starting a new pass: {reason}")]
    DataSourceFailed {
        /// Why the fresh pass could not produce a batch.
        reason: String,
    },

    /// Error for when saving or loading a checkpoint fails.
    #[error("Checkpoint error at {path}: {reason}")]
    CheckpointError {
        /// The checkpoint file or directory involved.
        path: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Error for when a metrics, log or image sink cannot be written.
    #[error("Failed to write {sink}: {reason}")]
    SinkError {
        /// The sink that failed.
        sink: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Error for when a loss bundle misses a term a composite loss needs.
    #[error("Loss bundle is missing the `{term}` term")]
    MissingLossTerm {
        /// The missing term.
        term: &'static str,
    },

    /// An evaluation error that must not be skipped.
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

impl DeepFillError {
    /// Shorthand for an [`DeepFillError::InvalidTensorShape`] built from two shapes.
    pub fn shape(name: impl Into<String>, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::InvalidTensorShape {
            name: name.into(),
            expected: expected.into(),
            actual: format!("{actual:?}"),
        }
    }
}

/// A specialized `Result` type for `DeepFill-Burn` operations.
pub type DeepFillResult<T> = Result<T, DeepFillError>;

/// Errors raised by a forward evaluation of the trainer.
///
/// Only some kinds are expected to be transient. [`EvalError::is_recoverable`]
/// tells the training loop whether skipping the iteration is enough.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A loss term evaluated to NaN or infinity.
    #[error("loss term `{term}` is not finite ({value})")]
    NonFinite {
        /// The offending loss term.
        term: &'static str,
        /// The value that was observed.
        value: f64,
    },

    /// The compute device reported a fault for this batch.
    #[error("device fault: {reason}")]
    Device {
        /// What the device reported.
        reason: String,
    },

    /// The inputs violate the trainer's contract (shapes, box geometry, ...).
    #[error("invalid evaluation input: {reason}")]
    InvalidInput {
        /// What is wrong with the input.
        reason: String,
    },
}

impl EvalError {
    /// Whether the iteration can be skipped and training can go on.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonFinite { .. } | Self::Device { .. })
    }
}
