use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 4-byte opaque, account-bound secret. Canonical external form is exactly
/// 8 hexadecimal characters, case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationValue([u8; 4]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("activation value must be exactly 8 hex characters")]
pub struct InvalidActivationFormat;

impl ActivationValue {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The four bytes in reverse order, used by the post-decryption sanity
    /// check in §4.E.
    pub fn reversed(&self) -> [u8; 4] {
        let mut r = self.0;
        r.reverse();
        r
    }

    pub fn is_valid_text(s: &str) -> bool {
        s.len() == 8 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl FromStr for ActivationValue {
    type Err = InvalidActivationFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid_text(s) {
            return Err(InvalidActivationFormat);
        }
        let mut bytes = [0u8; 4];
        for i in 0..4 {
            bytes[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| InvalidActivationFormat)?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ActivationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// The raw payload of the `adrm` box (content after its 8-byte header),
/// at least 88 bytes.
#[derive(Debug, Clone)]
pub struct AdrmBlob(pub Vec<u8>);

impl AdrmBlob {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// bytes 8..56: the 48-byte encrypted DRM payload.
    pub fn encrypted_payload(&self) -> Option<&[u8]> {
        self.0.get(8..56)
    }

    /// bytes 68..88: the 20-byte SHA-1 checksum used for activation
    /// validation.
    pub fn checksum(&self) -> Option<&[u8]> {
        self.0.get(68..88)
    }
}

/// Whether a track carries audio or chapter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Sound,
    Text,
    Other,
}

#[derive(Debug, Clone)]
pub struct SampleEntry {
    pub byte_offset: u64,
    pub byte_size: u32,
    pub duration_ticks: u32,
    pub is_keyframe: bool,
}

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub handler: HandlerType,
    pub timescale: u32,
    pub duration_ticks: u64,
    /// AAC `AudioSpecificConfig`, opaque, copied verbatim. `None` for
    /// non-sound tracks.
    pub codec_config: Option<Vec<u8>>,
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Present only on `soun` tracks whose sample entry carries an `adrm`
    /// child box.
    pub adrm: Option<AdrmBlob>,
    pub samples: Vec<SampleEntry>,
}

impl TrackInfo {
    pub fn duration_seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration_ticks as f64 / self.timescale as f64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub cover: Option<CoverImage>,
}

#[derive(Debug, Clone)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime: &'static str,
}

impl CoverImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime = if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
            "image/jpeg"
        } else {
            "image/png"
        };
        Self { data, mime }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Everything the parser produces from a single AAX file, consumed
/// read-only by the DRM deriver and the muxer.
#[derive(Debug, Clone)]
pub struct ParsedAax {
    pub audio: TrackInfo,
    pub text: Option<TrackInfo>,
    pub metadata: BookMetadata,
    pub chapters: Vec<Chapter>,
    pub file_len: u64,
}
