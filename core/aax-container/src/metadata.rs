use crate::boxes::{find_box, fourcc, FourCc, Boxes};
use crate::error::Result;
use crate::model::{BookMetadata, Chapter, CoverImage, TrackInfo};
use crate::reader::AaxReader;

/// iTunes-style item-list keys beginning with the copyright-sign byte
/// (0xA9) are not valid UTF-8 four-character codes; build them as raw
/// bytes rather than through the ASCII `fourcc` helper.
const NAM: FourCc = [0xA9, b'n', b'a', b'm'];
const ART: FourCc = [0xA9, b'A', b'R', b'T'];
const PUB: FourCc = [0xA9, b'p', b'u', b'b'];
const DAY: FourCc = [0xA9, b'd', b'a', b'y'];
const GEN: FourCc = [0xA9, b'g', b'e', b'n'];

/// Reads `udta/meta/ilst` (if present) under `moov` into a `BookMetadata`.
/// Every field is optional; absence is never an error, per §4.D.
pub fn extract_metadata(reader: &mut AaxReader, moov_start: u64, moov_end: u64) -> Result<BookMetadata> {
    let mut metadata = BookMetadata::default();

    let Some(udta) = find_box(reader, moov_start, moov_end, "udta")? else {
        return Ok(metadata);
    };
    let Some(meta) = find_box(reader, udta.content_offset, udta.end_offset(), "meta")? else {
        return Ok(metadata);
    };
    // `meta` carries a 4-byte version/flags header before its children.
    let Some(ilst) = find_box(reader, meta.content_offset + 4, meta.end_offset(), "ilst")? else {
        return Ok(metadata);
    };

    let mut boxes = Boxes::new(reader, ilst.content_offset, ilst.end_offset(), false);
    while let Some(item) = boxes.next_box()? {
        let reader = boxes.reader();
        let Some(data_box) = find_box(reader, item.content_offset, item.end_offset(), "data")? else {
            continue;
        };
        // `data` box: version/flags(4) + reserved(4) + payload.
        let payload_offset = data_box.content_offset + 8;
        let payload_len = data_box.end_offset().saturating_sub(payload_offset) as usize;
        if payload_len == 0 {
            continue;
        }
        let payload = reader.read_exact_at(payload_offset, payload_len)?;

        match &item.box_type {
            t if *t == NAM => metadata.title = Some(text(&payload)),
            t if *t == ART => metadata.author = Some(text(&payload)),
            t if *t == fourcc("aART") => metadata.narrator = Some(text(&payload)),
            t if *t == PUB => metadata.publisher = Some(text(&payload)),
            t if *t == DAY => metadata.year = Some(text(&payload)),
            t if *t == fourcc("cprt") => metadata.copyright = Some(text(&payload)),
            t if *t == GEN || *t == fourcc("desc") => {
                metadata.description = Some(text(&payload))
            }
            t if *t == fourcc("covr") => metadata.cover = Some(CoverImage::from_bytes(payload)),
            _ => {}
        }
    }

    Ok(metadata)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
}

/// Builds the chapter list from the text-handler track's samples, per §4.D.
/// Each sample is `[u16 BE length][utf-8 bytes]`; chapters form a
/// contiguous, time-ordered partition.
pub fn extract_chapters(reader: &mut AaxReader, text_track: Option<&TrackInfo>) -> Result<Vec<Chapter>> {
    let Some(track) = text_track else {
        return Ok(Vec::new());
    };
    if track.timescale == 0 {
        return Ok(Vec::new());
    }

    let mut chapters = Vec::with_capacity(track.samples.len());
    let mut cumulative_ticks: u64 = 0;

    for sample in &track.samples {
        let bytes = reader.read_exact_at(sample.byte_offset, sample.byte_size as usize)?;
        let title = if bytes.len() >= 2 {
            let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
            let end = (2 + len).min(bytes.len());
            String::from_utf8_lossy(&bytes[2..end]).into_owned()
        } else {
            String::new()
        };

        let start_seconds = cumulative_ticks as f64 / track.timescale as f64;
        cumulative_ticks += sample.duration_ticks as u64;
        let end_seconds = cumulative_ticks as f64 / track.timescale as f64;

        chapters.push(Chapter {
            title,
            start_seconds,
            end_seconds,
        });
    }

    Ok(chapters)
}
