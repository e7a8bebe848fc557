//! Streaming ISO-BMFF parser for Audible AAX containers.
//!
//! Locates and interprets the subset of boxes required to read an
//! Audible-branded file: movie header, track headers, sample tables, the
//! proprietary `adrm` box, the AAC decoder configuration, and a text-based
//! chapter track. Never reads `mdat` sample payload bytes itself — callers
//! (the DRM deriver, the sample pump) do that with the offsets this crate
//! resolves.

pub mod boxes;
pub mod error;
pub mod metadata;
pub mod model;
pub mod parse;
pub mod reader;
pub mod resolver;

pub use boxes::{fourcc, fourcc_str, BoxHeader, Boxes, FourCc};
pub use error::{ContainerError, Result};
pub use model::{
    ActivationValue, AdrmBlob, BookMetadata, Chapter, CoverImage, HandlerType, InvalidActivationFormat,
    ParsedAax, SampleEntry, TrackInfo,
};
pub use parse::{parse, parse_reader};
pub use reader::AaxReader;
