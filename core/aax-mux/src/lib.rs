//! Fast-start M4A/M4B muxer: takes decrypted AAC packets plus the metadata,
//! chapter list, and codec configuration the container crate extracted, and
//! writes a standard `ftyp`/`moov`/`mdat` MP4 a conforming player can open
//! without a second pass.

mod boxwrite;
pub mod error;
mod model;
mod moov;
mod mux;

pub use error::{MuxError, Result};
pub use model::{MuxOptions, OutputBrand, Packet};
pub use mux::Muxer;
