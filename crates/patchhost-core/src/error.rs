//! Error types for the adapter.
//!
//! Every variant is also mirrored into the adapter's status pair, so hosts
//! that never look at a returned `Result` still see the failure.

use thiserror::Error;

/// Errors raised on the control context.
///
/// None of these ever reach the audio path; the block translator degrades to
/// silence instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// The patch engine library could not be initialised. Fatal for the
    /// lifetime of the adapter.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
    /// A manifest file is missing, unreadable or malformed.
    #[error("{0}")]
    ManifestInvalid(String),
    /// An incoming state blob could not be decoded.
    #[error("invalid state: {0}")]
    StateMalformed(String),
    /// A host-proposed bus layout does not match the patch's buses.
    #[error("bus layout rejected (inputs {inputs:?}, outputs {outputs:?})")]
    LayoutRejected { inputs: Vec<u32>, outputs: Vec<u32> },
    /// The engine failed to instantiate a patch.
    #[error("{0}")]
    Engine(String),
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
