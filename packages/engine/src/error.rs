use thiserror::Error;

use crate::config::ConfigLoadError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Top-level error of the `wordcat` binary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("terminal io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
