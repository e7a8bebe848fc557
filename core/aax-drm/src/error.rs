use thiserror::Error;

pub type Result<T> = std::result::Result<T, DrmError>;

#[derive(Error, Debug)]
pub enum DrmError {
    #[error("activation value does not match this file's `adrm` checksum")]
    ActivationMismatch,

    #[error("`adrm` blob decrypted payload failed its post-decryption sanity check")]
    CorruptDrmPayload,
}
