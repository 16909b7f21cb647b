//! Machine-shell error type.

use thiserror::Error;

use crate::config::SpectrumModel;

/// Errors raised by machine configuration and by host-contract violations.
///
/// Loop termination is never an error; see
/// [`TerminationReason`](crate::TerminationReason).
#[derive(Debug, Error)]
pub enum MachineError {
    /// A ROM resource could not be resolved.
    #[error("missing ROM resource `{0}`")]
    MissingRom(String),

    /// A ROM blob has the wrong size for the model.
    #[error("ROM size mismatch: expected {expected} bytes, got {actual}")]
    RomSize { expected: usize, actual: usize },

    /// The configured model is not supported by this machine.
    #[error("unsupported Spectrum model {0:?}")]
    UnsupportedModel(SpectrumModel),

    /// The clock multiplier is outside the accepted range.
    #[error("invalid clock multiplier {0} (must be 1..=16)")]
    InvalidMultiplier(u32),

    /// A host or hook broke a core invariant. Not recoverable.
    #[error("machine invariant violated: {0}")]
    Invariant(&'static str),
}
