//! Builds a minimal, synthetic AAX-shaped file byte-for-byte and exercises
//! the parser against it. The fixture carries a placeholder (all-zero)
//! `adrm` payload — good enough to exercise box-walking and sample-table
//! assembly, which never interpret `adrm`'s bytes themselves.

use aax_container::parse::parse_reader;
use aax_container::reader::AaxReader;
use std::io::Write;

struct BoxBuilder {
    fourcc: [u8; 4],
    body: Vec<u8>,
}

impl BoxBuilder {
    fn new(fourcc: &str) -> Self {
        let bytes = fourcc.as_bytes();
        assert_eq!(bytes.len(), 4);
        Self {
            fourcc: [bytes[0], bytes[1], bytes[2], bytes[3]],
            body: Vec::new(),
        }
    }

    fn raw_fourcc(fourcc: [u8; 4]) -> Self {
        Self {
            fourcc,
            body: Vec::new(),
        }
    }

    fn u8(mut self, v: u8) -> Self {
        self.body.push(v);
        self
    }

    fn u16(mut self, v: u16) -> Self {
        self.body.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn u32(mut self, v: u32) -> Self {
        self.body.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn bytes(mut self, v: &[u8]) -> Self {
        self.body.extend_from_slice(v);
        self
    }

    fn child(mut self, child: Vec<u8>) -> Self {
        self.body.extend_from_slice(&child);
        self
    }

    fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        let total_size = 8 + self.body.len() as u32;
        out.extend_from_slice(&total_size.to_be_bytes());
        out.extend_from_slice(&self.fourcc);
        out.extend_from_slice(&self.body);
        out
    }
}

fn stsd_sound_entry(entry_type: &str, channels: u16, sample_rate: u32, esds: &[u8], adrm: &[u8]) -> Vec<u8> {
    // reserved(6) + data_ref_index(2) + version/revision/vendor(8) = 16
    let mut fixed_header = vec![0u8; 16];
    fixed_header.extend_from_slice(&channels.to_be_bytes()); // offset 16
    fixed_header.extend_from_slice(&[0u8; 6]); // samplesize/compressionid/packetsize filler up to 24
    fixed_header.extend_from_slice(&((sample_rate as u32) << 16).to_be_bytes()); // offset 24..28

    let esds_box = BoxBuilder::new("esds").bytes(esds).build();
    let adrm_box = BoxBuilder::new("adrm").bytes(adrm).build();

    BoxBuilder::new(entry_type)
        .bytes(&fixed_header)
        .child(esds_box)
        .child(adrm_box)
        .build()
}

fn stsd_box(entry: Vec<u8>) -> Vec<u8> {
    BoxBuilder::new("stsd")
        .u32(0) // version/flags
        .u32(1) // entry_count
        .child(entry)
        .build()
}

fn stts_box(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut b = BoxBuilder::new("stts").u32(0).u32(entries.len() as u32);
    for (count, delta) in entries {
        b = b.u32(*count).u32(*delta);
    }
    b.build()
}

fn stsz_box(default_size: u32, sizes: &[u32]) -> Vec<u8> {
    let mut b = BoxBuilder::new("stsz")
        .u32(0)
        .u32(default_size)
        .u32(sizes.len() as u32);
    for s in sizes {
        b = b.u32(*s);
    }
    b.build()
}

fn stsc_box(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut b = BoxBuilder::new("stsc").u32(0).u32(entries.len() as u32);
    for (first_chunk, per_chunk) in entries {
        b = b.u32(*first_chunk).u32(*per_chunk).u32(1);
    }
    b.build()
}

fn stco_box(offsets: &[u32]) -> Vec<u8> {
    let mut b = BoxBuilder::new("stco").u32(0).u32(offsets.len() as u32);
    for o in offsets {
        b = b.u32(*o);
    }
    b.build()
}

fn mdhd_box(timescale: u32, duration: u32) -> Vec<u8> {
    BoxBuilder::new("mdhd")
        .u32(0) // version/flags
        .u32(0) // creation
        .u32(0) // modification
        .u32(timescale)
        .u32(duration)
        .u16(0)
        .u16(0)
        .build()
}

fn hdlr_box(handler: &str) -> Vec<u8> {
    let handler_bytes = handler.as_bytes();
    assert_eq!(handler_bytes.len(), 4);
    BoxBuilder::new("hdlr")
        .bytes(&[0u8; 8]) // version/flags + predefined, handler type lands at +8
        .bytes(handler_bytes)
        .bytes(&[0u8; 12]) // reserved
        .u8(0) // empty name
        .build()
}

fn trak_box(mdhd: Vec<u8>, hdlr: Vec<u8>, stbl: Vec<u8>) -> Vec<u8> {
    let minf = BoxBuilder::new("minf")
        .child(BoxBuilder::new("stbl").child(stbl).build())
        .build();
    let mdia = BoxBuilder::new("mdia")
        .child(mdhd)
        .child(hdlr)
        .child(minf)
        .build();
    BoxBuilder::new("trak").child(mdia).build()
}

fn text_sample(title: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(title.len() as u16).to_be_bytes());
    out.extend_from_slice(title.as_bytes());
    out
}

fn ilst_item(key: [u8; 4], value: &str) -> Vec<u8> {
    let data = BoxBuilder::raw_fourcc(*b"data")
        .u32(1) // type indicator (UTF-8 text)
        .u32(0) // locale
        .bytes(value.as_bytes())
        .build();
    BoxBuilder::raw_fourcc(key).child(data).build()
}

/// Builds a full fixture: `ftyp` + `moov` (sound track with 4 samples across
/// two chunks, text track with 2 chapter samples, `udta/meta/ilst` with a
/// title) + `mdat` holding the raw (placeholder) sample bytes.
fn build_fixture() -> (Vec<u8>, Vec<u64>) {
    // Sound samples: sizes 100, 150 in chunk 1; 120, 90 in chunk 2.
    let sound_sizes = [100u32, 150, 120, 90];
    let sound_chunk1_offset = 2000u64; // placeholder, patched below
    let sound_chunk2_offset = 2000u64 + 250;

    let esds = vec![0x03, 0x19, 0x00, 0x00, 0x00]; // opaque AudioSpecificConfig stand-in
    let adrm = vec![0u8; 88];

    let stsd = stsd_box(stsd_sound_entry("aavd", 2, 44100, &esds, &adrm));
    let stts = stts_box(&[(4, 1000)]);
    let stsz = stsz_box(0, &sound_sizes);
    let stsc = stsc_box(&[(1, 2)]);
    let stco = stco_box(&[sound_chunk1_offset as u32, sound_chunk2_offset as u32]);

    let mut sound_stbl = Vec::new();
    sound_stbl.extend_from_slice(&stsd);
    sound_stbl.extend_from_slice(&stts);
    sound_stbl.extend_from_slice(&stsz);
    sound_stbl.extend_from_slice(&stsc);
    sound_stbl.extend_from_slice(&stco);

    let sound_trak = trak_box(mdhd_box(1000, 4000), hdlr_box("soun"), sound_stbl);

    // Text track: 2 chapters, each a single sample.
    let chapter_titles = ["Chapter One", "Chapter Two"];
    let text_samples: Vec<Vec<u8>> = chapter_titles.iter().map(|t| text_sample(t)).collect();
    let text_sizes: Vec<u32> = text_samples.iter().map(|s| s.len() as u32).collect();
    let text_chunk_offset = 9000u64; // placeholder, patched below

    let text_stsd = {
        // Minimal non-sound stsd: version/flags + entry_count=1 + an opaque entry.
        let entry = BoxBuilder::new("text").bytes(&[0u8; 4]).build();
        stsd_box(entry)
    };
    let text_stts = stts_box(&[(2, 2000)]);
    let text_stsz = stsz_box(0, &text_sizes);
    let text_stco = stco_box(&[text_chunk_offset as u32]);

    let mut text_stbl = Vec::new();
    text_stbl.extend_from_slice(&text_stsd);
    text_stbl.extend_from_slice(&text_stts);
    text_stbl.extend_from_slice(&text_stsz);
    text_stbl.extend_from_slice(&stsc_box(&[(1, 2)]));
    text_stbl.extend_from_slice(&text_stco);

    let text_trak = trak_box(mdhd_box(1000, 4000), hdlr_box("text"), text_stbl);

    let ilst = BoxBuilder::new("ilst")
        .child(ilst_item([0xA9, b'n', b'a', b'm'], "Test Book"))
        .child(ilst_item(*b"cprt", "2024 Example"))
        .build();
    let meta = BoxBuilder::new("meta").u32(0).child(ilst).build();
    let udta = BoxBuilder::new("udta").child(meta).build();

    let moov = BoxBuilder::new("moov")
        .child(sound_trak)
        .child(text_trak)
        .child(udta)
        .build();

    let ftyp = BoxBuilder::new("ftyp").bytes(b"aax ").u32(0).build();

    // Lay out: ftyp, moov, then mdat holding sound samples followed by text
    // samples, at the offsets baked into stco above.
    let header_len = (ftyp.len() + moov.len()) as u64;
    assert!(
        header_len < sound_chunk1_offset,
        "fixture header grew past the hardcoded mdat offset; bump the placeholder"
    );

    let mut mdat_body = Vec::new();
    mdat_body.extend_from_slice(&vec![0xAAu8; (sound_chunk1_offset - header_len - 8) as usize]);
    for size in &sound_sizes {
        mdat_body.extend_from_slice(&vec![0x11u8; *size as usize]);
    }
    while header_len + 8 + mdat_body.len() as u64 < text_chunk_offset {
        mdat_body.push(0xBB);
    }
    for sample in &text_samples {
        mdat_body.extend_from_slice(sample);
    }

    let mdat = BoxBuilder::new("mdat").bytes(&mdat_body).build();

    let mut file = Vec::new();
    file.write_all(&ftyp).unwrap();
    file.write_all(&moov).unwrap();
    file.write_all(&mdat).unwrap();

    (file, vec![sound_chunk1_offset, sound_chunk2_offset, text_chunk_offset])
}

#[test]
fn parses_synthetic_fixture_end_to_end() {
    let (bytes, _offsets) = build_fixture();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.aax");
    std::fs::write(&path, &bytes).unwrap();

    let mut reader = AaxReader::open(&path).unwrap();
    let parsed = parse_reader(&mut reader).unwrap();

    assert_eq!(parsed.audio.channel_count, 2);
    assert_eq!(parsed.audio.sample_rate, 44100);
    assert_eq!(parsed.audio.samples.len(), 4);
    assert!(parsed.audio.adrm.is_some());
    assert_eq!(parsed.audio.adrm.unwrap().len(), 88);

    // Sample table covers every byte with no gaps within a chunk.
    assert_eq!(parsed.audio.samples[0].byte_offset, 2000);
    assert_eq!(parsed.audio.samples[1].byte_offset, 2100);
    assert_eq!(parsed.audio.samples[2].byte_offset, 2250);
    assert_eq!(parsed.audio.samples[3].byte_offset, 2370);

    // Sum of per-sample durations equals track duration from `mdhd`.
    let total_ticks: u64 = parsed.audio.samples.iter().map(|s| s.duration_ticks as u64).sum();
    assert_eq!(total_ticks, parsed.audio.duration_ticks);

    assert_eq!(parsed.chapters.len(), 2);
    assert_eq!(parsed.chapters[0].title, "Chapter One");
    assert_eq!(parsed.chapters[0].start_seconds, 0.0);
    assert_eq!(parsed.chapters[0].end_seconds, parsed.chapters[1].start_seconds);

    assert_eq!(parsed.metadata.title.as_deref(), Some("Test Book"));
    assert_eq!(parsed.metadata.copyright.as_deref(), Some("2024 Example"));
}

#[test]
fn rejects_file_without_adrm_as_not_encrypted() {
    // Reuse the fixture builder but swap `aavd` for `mp4a` with no `adrm` child.
    let esds = vec![0x03, 0x19, 0x00, 0x00, 0x00];
    let entry = {
        let mut fixed_header = vec![0u8; 16];
        fixed_header.extend_from_slice(&2u16.to_be_bytes());
        fixed_header.extend_from_slice(&[0u8; 6]);
        fixed_header.extend_from_slice(&(44100u32 << 16).to_be_bytes());
        let esds_box = BoxBuilder::new("esds").bytes(&esds).build();
        BoxBuilder::new("mp4a").bytes(&fixed_header).child(esds_box).build()
    };
    let stsd = stsd_box(entry);
    let stts = stts_box(&[(1, 1000)]);
    let stsz = stsz_box(100, &[]);
    let stco = stco_box(&[1000]);
    let mut stbl = Vec::new();
    stbl.extend_from_slice(&stsd);
    stbl.extend_from_slice(&stts);
    stbl.extend_from_slice(&stsz);
    stbl.extend_from_slice(&stco);
    let trak = trak_box(mdhd_box(1000, 1000), hdlr_box("soun"), stbl);
    let moov = BoxBuilder::new("moov").child(trak).build();
    let ftyp = BoxBuilder::new("ftyp").bytes(b"M4A ").u32(0).build();

    let mut mdat_body = vec![0u8; (1000 - (ftyp.len() + moov.len()) as u64 - 8) as usize];
    mdat_body.extend_from_slice(&[0x11u8; 100]);
    let mdat = BoxBuilder::new("mdat").bytes(&mdat_body).build();

    let mut file = Vec::new();
    file.extend_from_slice(&ftyp);
    file.extend_from_slice(&moov);
    file.extend_from_slice(&mdat);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.m4a");
    std::fs::write(&path, &file).unwrap();

    let mut reader = AaxReader::open(&path).unwrap();
    let err = parse_reader(&mut reader).unwrap_err();
    assert!(matches!(err, aax_container::ContainerError::NotEncrypted));
}
