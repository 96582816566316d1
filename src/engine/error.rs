//! Engine error taxonomy
//!
//! Load failures and computation failures stay distinct so the boundary can
//! tell resource problems apart from bad inputs or broken model assets.

use thiserror::Error;

use super::session::SessionError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The model asset could not be read or materialized. The identifier is
    /// left unresolved in the registry; a later call retries the load.
    #[error("failed to load model {model}: {source}")]
    ModelLoad {
        model: String,
        #[source]
        source: SessionError,
    },

    /// The loaded model's forward pass failed for the given input.
    #[error("inference failed for model {model}: {source}")]
    Inference {
        model: String,
        #[source]
        source: SessionError,
    },

    /// The admission gate has been closed by shutdown.
    #[error("engine is shutting down")]
    ShuttingDown,
}
