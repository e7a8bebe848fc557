use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContainerError>;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed container: {0}")]
    Malformed(String),

    #[error("audio track has no `adrm` box; file is not DRM-encoded")]
    NotEncrypted,
}

impl ContainerError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ContainerError::Malformed(msg.into())
    }
}
