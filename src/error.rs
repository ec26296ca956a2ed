//! Domain errors for the sequencing core

use thiserror::Error;
use uuid::Uuid;

use crate::types::RecordId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Malformed input that must be rejected before it reaches the core
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The external routing provider failed; always recovered by local fallback
    #[error("routing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("cannot optimize: no start position")]
    GeolocationUnavailable,

    #[error("record {0} not found in route")]
    RecordNotFound(RecordId),

    #[error("an optimization is already running for route {0}")]
    OptimizationInProgress(Uuid),

    #[error("optimization cancelled")]
    OptimizationCancelled,
}
