use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Which §6 exit code a failure maps to. Kept distinct from `CliError`
/// itself so new error variants can't silently drift the exit-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorKind {
    GeneralFailure,
    BadArguments,
    FileNotFound,
    ConversionFailed,
    MissingActivation,
}

impl CoreErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreErrorKind::GeneralFailure => 1,
            CoreErrorKind::BadArguments => 2,
            CoreErrorKind::FileNotFound => 3,
            CoreErrorKind::ConversionFailed => 4,
            CoreErrorKind::MissingActivation => 5,
        }
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input file was not provided")]
    MissingInput,

    #[error("input file {0:?} does not exist")]
    InputNotFound(PathBuf),

    #[error("unsupported output format: {0} (only m4a and m4b are accepted)")]
    UnsupportedOutputFormat(String),

    #[error("no activation code was supplied; pass --activation-bytes or set AAX_ACTIVATION_BYTES")]
    MissingActivation,

    #[error("activation code {0:?} is not 8 hex characters")]
    InvalidActivationFormat(String),

    #[error(transparent)]
    Container(#[from] aax_container::ContainerError),

    #[error(transparent)]
    Drm(#[from] aax_drm::DrmError),

    #[error(transparent)]
    Mux(#[from] aax_mux::MuxError),
}

impl CliError {
    pub fn kind(&self) -> CoreErrorKind {
        match self {
            CliError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => CoreErrorKind::FileNotFound,
            CliError::Io(_) => CoreErrorKind::GeneralFailure,
            CliError::MissingInput => CoreErrorKind::BadArguments,
            CliError::InputNotFound(_) => CoreErrorKind::FileNotFound,
            CliError::UnsupportedOutputFormat(_) => CoreErrorKind::BadArguments,
            CliError::InvalidActivationFormat(_) => CoreErrorKind::BadArguments,
            CliError::MissingActivation => CoreErrorKind::MissingActivation,
            CliError::Container(aax_container::ContainerError::Io(e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                CoreErrorKind::FileNotFound
            }
            CliError::Container(_) => CoreErrorKind::ConversionFailed,
            // A present-but-wrong activation (or a corrupt `adrm` payload) is
            // a conversion failure, not the "no activation supplied" case —
            // that one is `CliError::MissingActivation` above.
            CliError::Drm(_) => CoreErrorKind::ConversionFailed,
            CliError::Mux(_) => CoreErrorKind::ConversionFailed,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}
