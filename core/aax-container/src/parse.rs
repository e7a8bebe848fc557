use crate::boxes::{find_box, fourcc_str, Boxes};
use crate::error::{ContainerError, Result};
use crate::metadata::{extract_chapters, extract_metadata};
use crate::model::{HandlerType, ParsedAax};
use crate::reader::AaxReader;
use crate::resolver::resolve_tracks;
use std::path::Path;

/// Parses an AAX (or already-decrypted MP4/M4A/M4B) file at `path`: locates
/// `ftyp`/`moov`, resolves the sound and text tracks, and pulls metadata and
/// chapters. Never reads `mdat` payload bytes.
pub fn parse(path: impl AsRef<Path>) -> Result<ParsedAax> {
    let mut reader = AaxReader::open(path)?;
    parse_reader(&mut reader)
}

pub fn parse_reader(reader: &mut AaxReader) -> Result<ParsedAax> {
    let file_len = reader.len();
    check_ftyp(reader)?;

    let moov = find_box(reader, 0, file_len, "moov")?
        .ok_or_else(|| ContainerError::malformed("no `moov` box found"))?;

    let tracks = resolve_tracks(reader, moov.content_offset, moov.end_offset())?;

    let audio = tracks
        .iter()
        .find(|t| t.handler == HandlerType::Sound)
        .cloned()
        .ok_or_else(|| ContainerError::malformed("no sound track found"))?;

    if audio.adrm.is_none() {
        return Err(ContainerError::NotEncrypted);
    }

    for sample in &audio.samples {
        if sample.byte_offset + sample.byte_size as u64 > file_len {
            return Err(ContainerError::malformed(format!(
                "sample at offset {} (size {}) extends past end of file",
                sample.byte_offset, sample.byte_size
            )));
        }
    }

    let text = tracks.into_iter().find(|t| t.handler == HandlerType::Text);

    let metadata = extract_metadata(reader, moov.content_offset, moov.end_offset())?;
    let chapters = extract_chapters(reader, text.as_ref())?;

    Ok(ParsedAax {
        audio,
        text,
        metadata,
        chapters,
        file_len,
    })
}

/// Validates the leading `ftyp` box carries brand `aax` or `M4B `/`M4B`
/// (trimmed), per §6.
fn check_ftyp(reader: &mut AaxReader) -> Result<()> {
    let ftyp = find_box(reader, 0, reader.len(), "ftyp")?
        .ok_or_else(|| ContainerError::malformed("no `ftyp` box found"))?;
    let brand_bytes = reader.read_exact_at(ftyp.content_offset, 4)?;
    let brand = String::from_utf8_lossy(&brand_bytes);
    let trimmed = brand.trim();
    if trimmed != "aax" && trimmed != "M4B" && trimmed != "M4A" {
        return Err(ContainerError::malformed(format!(
            "unexpected `ftyp` brand `{}`, expected aax/M4B/M4A",
            fourcc_str(brand_bytes.try_into().unwrap())
        )));
    }
    Ok(())
}

/// Total number of top-level boxes at the root of the file; used by tests
/// and diagnostics to sanity-check a fixture without a full parse.
pub fn top_level_box_count(reader: &mut AaxReader) -> Result<usize> {
    let mut boxes = Boxes::new(reader, 0, reader.len(), true);
    let mut count = 0;
    while boxes.next_box()?.is_some() {
        count += 1;
    }
    Ok(count)
}
