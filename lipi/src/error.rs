use thiserror::Error;

use crate::ocr::{EngineKind, Script};

#[derive(Error, Debug)]
pub enum LipiError {
    #[error("Unreadable image: {0}")]
    InvalidImage(String),

    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    /// The remote OCR service reported a processing failure. The message is
    /// the service's own, unmodified.
    #[error("{0}")]
    ExternalService(String),

    #[error("OCR engine unavailable ({engine}): {reason}")]
    EngineUnavailable { engine: EngineKind, reason: String },

    #[error("OCR error ({engine}): {message}")]
    Ocr { engine: EngineKind, message: String },

    #[error("OCR operation timed out after {0} seconds")]
    Timeout(u64),
}

impl LipiError {
    pub fn unavailable(engine: EngineKind, reason: impl Into<String>) -> Self {
        LipiError::EngineUnavailable {
            engine,
            reason: reason.into(),
        }
    }

    pub fn ocr(engine: EngineKind, message: impl Into<String>) -> Self {
        LipiError::Ocr {
            engine,
            message: message.into(),
        }
    }

    /// Attach the script and engine a failure originated from.
    ///
    /// Only the image error is rewritten. Service messages stay verbatim and
    /// engine errors already name their engine.
    pub fn in_context(self, script: Script, engine: EngineKind) -> Self {
        match self {
            LipiError::InvalidImage(msg) => {
                LipiError::InvalidImage(format!("{script} via {engine}: {msg}"))
            }
            other => other,
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LipiError::ExternalService(_) | LipiError::Timeout(_))
    }

    /// Whether the failure was caused by the request itself rather than the
    /// environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LipiError::InvalidImage(_) | LipiError::UnsupportedScript(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LipiError>;
