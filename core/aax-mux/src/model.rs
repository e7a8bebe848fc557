/// One decoded-and-decrypted audio frame (or chapter-text cue) ready to be
/// appended to the output container.
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Vec<u8>,
    pub duration_ticks: u32,
    pub is_keyframe: bool,
}

/// The output container's top-level brand. Audible audiobooks conventionally
/// ship as `.m4b`; plain `.m4a` is offered for callers who want a player that
/// doesn't special-case audiobook brands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBrand {
    M4a,
    M4b,
}

impl OutputBrand {
    pub fn major_brand(&self) -> &'static [u8; 4] {
        match self {
            OutputBrand::M4a => b"M4A ",
            OutputBrand::M4b => b"M4B ",
        }
    }

    pub fn compatible_brands(&self) -> &'static [&'static [u8; 4]] {
        match self {
            OutputBrand::M4a => &[b"M4A ", b"mp42", b"isom"],
            OutputBrand::M4b => &[b"M4B ", b"mp42", b"isom"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MuxOptions {
    pub brand: OutputBrand,
    pub timescale: u32,
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Opaque AAC `AudioSpecificConfig`, copied verbatim into `esds`.
    pub codec_config: Vec<u8>,
}
