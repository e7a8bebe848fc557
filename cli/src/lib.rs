//! Conversion driver for the AAX-to-MP4 tool: resolves `ConversionOptions`,
//! orchestrates the container/DRM/mux crates through the seven-step
//! pipeline, and exposes that pipeline as a plain function so both the
//! binary's `main` and integration tests can drive a conversion in-process.

pub mod driver;
pub mod error;
pub mod options;
pub mod output_guard;
pub mod output_path;
pub mod progress;

pub use driver::{convert, convert_with_progress, try_convert_with_progress, ConversionResult};
pub use error::{CliError, CoreErrorKind, Result};
pub use options::{ConversionOptions, OptionsBuilder, OutputFormat};
