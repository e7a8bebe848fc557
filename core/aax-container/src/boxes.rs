use crate::error::{ContainerError, Result};
use crate::reader::AaxReader;

/// A four-character box type code, e.g. `moov`, `trak`, `stsd`.
pub type FourCc = [u8; 4];

pub fn fourcc(s: &str) -> FourCc {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes.len(), 4, "fourcc must be exactly 4 ASCII bytes");
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

pub fn fourcc_str(fcc: FourCc) -> String {
    String::from_utf8_lossy(&fcc).into_owned()
}

/// A decoded ISO-BMFF box header: total size (including header), type, and
/// the offset at which the box's content begins.
#[derive(Debug, Clone, Copy)]
pub struct BoxHeader {
    pub offset: u64,
    pub total_size: u64,
    pub box_type: FourCc,
    pub content_offset: u64,
}

impl BoxHeader {
    /// End offset of this box (one past its last content byte).
    pub fn end_offset(&self) -> u64 {
        self.offset + self.total_size
    }

    pub fn content_size(&self) -> u64 {
        self.total_size - (self.content_offset - self.offset)
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.box_type == fourcc(name)
    }
}

/// Reads a single box header at `offset`. `at_top_level` controls whether a
/// `size == 0` ("extends to EOF") header is tolerated, per §4.B: only the
/// top-level box stream may use it.
pub fn read_box_header(
    reader: &mut AaxReader,
    offset: u64,
    at_top_level: bool,
) -> Result<BoxHeader> {
    if offset + 8 > reader.len() {
        return Err(ContainerError::malformed(format!(
            "box header at {offset} runs past end of file"
        )));
    }
    reader.seek_to(offset)?;
    let small_size = reader.read_u32_be()? as u64;
    let mut box_type = [0u8; 4];
    let raw = reader.read_exact_n(4)?;
    box_type.copy_from_slice(&raw);

    let (total_size, content_offset) = if small_size == 1 {
        let large_size = reader.read_u64_be()?;
        (large_size, offset + 16)
    } else if small_size == 0 {
        if !at_top_level {
            return Err(ContainerError::malformed(
                "size == 0 (extends to EOF) is only valid for top-level boxes",
            ));
        }
        (reader.len() - offset, offset + 8)
    } else {
        (small_size, offset + 8)
    };

    if total_size < 8 {
        return Err(ContainerError::malformed(format!(
            "box `{}` at {offset} has invalid size {total_size}",
            fourcc_str(box_type)
        )));
    }
    if offset + total_size > reader.len() {
        return Err(ContainerError::malformed(format!(
            "box `{}` at {offset} (size {total_size}) extends past end of file",
            fourcc_str(box_type)
        )));
    }

    Ok(BoxHeader {
        offset,
        total_size,
        box_type,
        content_offset,
    })
}

/// Iterates sibling boxes within `[start, end)`.
pub struct Boxes<'r> {
    reader: &'r mut AaxReader,
    cursor: u64,
    end: u64,
    at_top_level: bool,
}

impl<'r> Boxes<'r> {
    pub fn new(reader: &'r mut AaxReader, start: u64, end: u64, at_top_level: bool) -> Self {
        Self {
            reader,
            cursor: start,
            end,
            at_top_level,
        }
    }

    pub fn next_box(&mut self) -> Result<Option<BoxHeader>> {
        if self.cursor >= self.end {
            return Ok(None);
        }
        let header = read_box_header(self.reader, self.cursor, self.at_top_level)?;
        self.cursor = header.end_offset();
        Ok(Some(header))
    }

    pub fn reader(&mut self) -> &mut AaxReader {
        self.reader
    }
}

/// Finds the first child box of the given fourcc within `[start, end)`,
/// without descending further.
pub fn find_box(reader: &mut AaxReader, start: u64, end: u64, want: &str) -> Result<Option<BoxHeader>> {
    let mut boxes = Boxes::new(reader, start, end, false);
    let target = fourcc(want);
    while let Some(h) = boxes.next_box()? {
        if h.box_type == target {
            return Ok(Some(h));
        }
    }
    Ok(None)
}
