use thiserror::Error;

/// Fatal error categories for a speed camera session.
///
/// Both variants end the session; nothing retries them. They are usually
/// carried inside `anyhow::Error` and recovered with `downcast_ref`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeedCamError {
    /// Zone geometry or calibration parameters are unusable. Raised at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The frame source stopped producing frames.
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),
}

impl SpeedCamError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }
}

/// Returns the typed category of an `anyhow` error, if it has one.
pub fn classify(err: &anyhow::Error) -> Option<&SpeedCamError> {
    err.downcast_ref::<SpeedCamError>()
}
