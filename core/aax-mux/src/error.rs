use thiserror::Error;

pub type Result<T> = std::result::Result<T, MuxError>;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("muxer refused packet: {0}")]
    RejectedPacket(String),

    #[error("muxer failed to finalize: {0}")]
    FinalizeFailed(String),
}
