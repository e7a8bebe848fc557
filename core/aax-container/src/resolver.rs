use crate::boxes::{find_box, fourcc, fourcc_str, Boxes};
use crate::error::{ContainerError, Result};
use crate::model::{AdrmBlob, HandlerType, SampleEntry, TrackInfo};
use crate::reader::AaxReader;

/// Parses the `moov` box content (offset range `[content_start, content_end)`
/// within `reader`) into one `TrackInfo` per `trak`. Never reads sample
/// payload bytes, only the table boxes, per §4.C.
pub fn resolve_tracks(
    reader: &mut AaxReader,
    content_start: u64,
    content_end: u64,
) -> Result<Vec<TrackInfo>> {
    let mut tracks = Vec::new();
    let mut boxes = Boxes::new(reader, content_start, content_end, false);
    while let Some(h) = boxes.next_box()? {
        if h.is_type("trak") {
            let reader = boxes.reader();
            let track = resolve_track(reader, h.content_offset, h.end_offset())?;
            tracks.push(track);
        }
        // `mvhd` and anything else under `moov` is skipped: timescales come
        // from individual tracks per §4.C.
    }
    Ok(tracks)
}

fn resolve_track(reader: &mut AaxReader, start: u64, end: u64) -> Result<TrackInfo> {
    let mdia = find_box(reader, start, end, "mdia")?
        .ok_or_else(|| ContainerError::malformed("`trak` missing `mdia`"))?;

    let mdhd = find_box(reader, mdia.content_offset, mdia.end_offset(), "mdhd")?
        .ok_or_else(|| ContainerError::malformed("`mdia` missing `mdhd`"))?;
    let (timescale, duration_ticks) = parse_mdhd(reader, mdhd.content_offset)?;

    let hdlr = find_box(reader, mdia.content_offset, mdia.end_offset(), "hdlr")?
        .ok_or_else(|| ContainerError::malformed("`mdia` missing `hdlr`"))?;
    let handler = parse_hdlr(reader, hdlr.content_offset)?;

    let minf = find_box(reader, mdia.content_offset, mdia.end_offset(), "minf")?
        .ok_or_else(|| ContainerError::malformed("`mdia` missing `minf`"))?;
    let stbl = find_box(reader, minf.content_offset, minf.end_offset(), "stbl")?
        .ok_or_else(|| ContainerError::malformed("`minf` missing `stbl`"))?;

    let table = parse_stbl(reader, stbl.content_offset, stbl.end_offset(), handler)?;

    Ok(TrackInfo {
        handler,
        timescale,
        duration_ticks,
        codec_config: table.codec_config,
        channel_count: table.channel_count,
        sample_rate: table.sample_rate,
        adrm: table.adrm,
        samples: table.samples,
    })
}

/// `mdhd`: version 0 has 32-bit fields, version 1 has 64-bit duration split
/// across two 32-bit halves (high, then low) per §4.C.
fn parse_mdhd(reader: &mut AaxReader, content_offset: u64) -> Result<(u32, u64)> {
    reader.seek_to(content_offset)?;
    let version = reader.read_u8()?;
    let _flags = reader.read_exact_n(3)?;
    if version == 1 {
        let _creation = reader.read_u64_be()?;
        let _modification = reader.read_u64_be()?;
        let timescale = reader.read_u32_be()?;
        let duration = reader.read_u64_be()?;
        Ok((timescale, duration))
    } else {
        let _creation = reader.read_u32_be()?;
        let _modification = reader.read_u32_be()?;
        let timescale = reader.read_u32_be()?;
        let duration = reader.read_u32_be()? as u64;
        Ok((timescale, duration))
    }
}

/// `hdlr`: handler type four-character code lives right after
/// version/flags(4) + pre_defined(4), at content offset + 8.
fn parse_hdlr(reader: &mut AaxReader, content_offset: u64) -> Result<HandlerType> {
    let bytes = reader.read_exact_at(content_offset + 8, 4)?;
    Ok(match &bytes[..] {
        b"soun" => HandlerType::Sound,
        b"text" => HandlerType::Text,
        _ => HandlerType::Other,
    })
}

struct SampleTable {
    codec_config: Option<Vec<u8>>,
    adrm: Option<AdrmBlob>,
    channel_count: u16,
    sample_rate: u32,
    samples: Vec<SampleEntry>,
}

fn parse_stbl(
    reader: &mut AaxReader,
    start: u64,
    end: u64,
    handler: HandlerType,
) -> Result<SampleTable> {
    let mut codec_config = None;
    let mut adrm = None;
    let mut channel_count = 0u16;
    let mut sample_rate = 0u32;
    let mut durations: Option<Vec<u32>> = None;
    let mut sizes: Option<Vec<u32>> = None;
    let mut default_size = 0u32;
    let mut sample_count = 0u32;
    let mut stsc: Vec<(u32, u32)> = Vec::new();
    let mut chunk_offsets: Option<Vec<u64>> = None;

    let mut boxes = Boxes::new(reader, start, end, false);
    while let Some(h) = boxes.next_box()? {
        let reader = boxes.reader();
        match &h.box_type {
            t if *t == fourcc("stsd") => {
                if handler == HandlerType::Sound {
                    let (cfg, blob, ch, sr) =
                        parse_stsd_sound(reader, h.content_offset, h.end_offset())?;
                    codec_config = cfg;
                    adrm = blob;
                    channel_count = ch;
                    sample_rate = sr;
                }
            }
            t if *t == fourcc("stts") => {
                durations = Some(parse_stts(reader, h.content_offset)?);
            }
            t if *t == fourcc("stsz") => {
                let (def, per_sample, count) = parse_stsz(reader, h.content_offset)?;
                default_size = def;
                sizes = per_sample;
                sample_count = count;
            }
            t if *t == fourcc("stsc") => {
                stsc = parse_stsc(reader, h.content_offset)?;
            }
            t if *t == fourcc("stco") => {
                chunk_offsets = Some(parse_stco(reader, h.content_offset)?);
            }
            t if *t == fourcc("co64") => {
                chunk_offsets = Some(parse_co64(reader, h.content_offset)?);
            }
            _ => {}
        }
    }

    if handler != HandlerType::Sound && handler != HandlerType::Text {
        // Only sound and text tracks matter to this crate; still validate
        // nothing if neither table nor offsets were found.
        return Ok(SampleTable {
            codec_config,
            adrm,
            channel_count,
            sample_rate,
            samples: Vec::new(),
        });
    }

    let durations = durations
        .ok_or_else(|| ContainerError::malformed("sample table missing `stts`"))?;
    let chunk_offsets = chunk_offsets
        .ok_or_else(|| ContainerError::malformed("sample table missing `stco`/`co64`"))?;

    if handler == HandlerType::Sound && sizes.is_none() && default_size == 0 {
        return Err(ContainerError::malformed(
            "sound track `stsz` specifies neither a default size nor per-sample sizes",
        ));
    }

    let samples = assemble_samples(durations, sizes, default_size, sample_count, &stsc, &chunk_offsets)?;

    Ok(SampleTable {
        codec_config,
        adrm,
        channel_count,
        sample_rate,
        samples,
    })
}

/// Parses the `soun` entry of `stsd`: the first sample entry must be `aavd`
/// or `mp4a`; within it, `esds` yields the codec config and `adrm` yields
/// the DRM blob. Channel count and sample rate live at fixed offsets in the
/// sample entry's legacy "sound sample description" header.
fn parse_stsd_sound(
    reader: &mut AaxReader,
    content_offset: u64,
    end: u64,
) -> Result<(Option<Vec<u8>>, Option<AdrmBlob>, u16, u32)> {
    // version/flags (4) + entry_count (4)
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let entry_count = reader.read_u32_be()?;
    if entry_count == 0 {
        return Err(ContainerError::malformed("`stsd` has zero entries"));
    }

    let entry_start = content_offset + 8;
    let entry_header = crate::boxes::read_box_header(reader, entry_start, false)?;
    let entry_type = fourcc_str(entry_header.box_type);
    if entry_type != "aavd" && entry_type != "mp4a" {
        return Err(ContainerError::malformed(format!(
            "sound `stsd` entry must be `aavd` or `mp4a`, found `{entry_type}`"
        )));
    }

    // Fixed legacy audio sample-entry header: reserved(6) + data_ref_index(2)
    // + version/revision/vendor(8) + channels(2) @ +16, packetsize(2) +
    // samplesize(2) + compressionid/reserved(4) + sample_rate(4, 16.16) @ +24.
    let channel_count = reader.read_exact_at(entry_header.content_offset + 16, 2)?;
    let channel_count = u16::from_be_bytes([channel_count[0], channel_count[1]]);
    let sample_rate_raw = reader.read_exact_at(entry_header.content_offset + 24, 4)?;
    let sample_rate_fixed =
        u32::from_be_bytes([sample_rate_raw[0], sample_rate_raw[1], sample_rate_raw[2], sample_rate_raw[3]]);
    let sample_rate = sample_rate_fixed >> 16;

    let mut codec_config = None;
    let mut adrm = None;

    // Child boxes (`esds`, `adrm`) start right after the fixed
    // AudioSampleEntry header.
    let fixed_header_len = 28u64;
    let mut child_boxes = Boxes::new(
        reader,
        entry_header.content_offset + fixed_header_len,
        entry_header.end_offset(),
        false,
    );
    while let Some(child) = child_boxes.next_box()? {
        let reader = child_boxes.reader();
        if child.is_type("esds") {
            let bytes = reader.read_exact_at(child.content_offset, child.content_size() as usize)?;
            codec_config = Some(bytes);
        } else if child.is_type("adrm") {
            let bytes = reader.read_exact_at(child.content_offset, child.content_size() as usize)?;
            adrm = Some(AdrmBlob(bytes));
        }
    }

    // Guard against a child box walk that wandered past the entry into a
    // sibling: clamp by construction, `end` is unused otherwise.
    let _ = end;

    Ok((codec_config, adrm, channel_count, sample_rate))
}

/// `stts`: list of (count, delta), expanded to one duration per sample.
fn parse_stts(reader: &mut AaxReader, content_offset: u64) -> Result<Vec<u32>> {
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let entry_count = reader.read_u32_be()?;
    let mut durations = Vec::new();
    for _ in 0..entry_count {
        let count = reader.read_u32_be()?;
        let delta = reader.read_u32_be()?;
        durations.resize(durations.len() + count as usize, delta);
    }
    Ok(durations)
}

/// `stsz`: if `default_size != 0` every sample shares that size; otherwise a
/// per-sample list follows.
fn parse_stsz(reader: &mut AaxReader, content_offset: u64) -> Result<(u32, Option<Vec<u32>>, u32)> {
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let default_size = reader.read_u32_be()?;
    let sample_count = reader.read_u32_be()?;
    if default_size != 0 {
        return Ok((default_size, None, sample_count));
    }
    let mut sizes = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        sizes.push(reader.read_u32_be()?);
    }
    Ok((default_size, Some(sizes), sample_count))
}

/// `stsc`: list of (first_chunk, samples_per_chunk, desc_index).
/// `first_chunk` is 1-based in the file format.
fn parse_stsc(reader: &mut AaxReader, content_offset: u64) -> Result<Vec<(u32, u32)>> {
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let entry_count = reader.read_u32_be()?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let first_chunk = reader.read_u32_be()?;
        let samples_per_chunk = reader.read_u32_be()?;
        let _sample_desc_index = reader.read_u32_be()?;
        entries.push((first_chunk, samples_per_chunk));
    }
    Ok(entries)
}

fn parse_stco(reader: &mut AaxReader, content_offset: u64) -> Result<Vec<u64>> {
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let entry_count = reader.read_u32_be()?;
    let mut offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        offsets.push(reader.read_u32_be()? as u64);
    }
    Ok(offsets)
}

fn parse_co64(reader: &mut AaxReader, content_offset: u64) -> Result<Vec<u64>> {
    reader.seek_to(content_offset)?;
    let _version_flags = reader.read_u32_be()?;
    let entry_count = reader.read_u32_be()?;
    let mut offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        offsets.push(reader.read_u64_be()?);
    }
    Ok(offsets)
}

/// Builds sample offsets by walking chunks in order: each chunk starts at
/// its chunk offset, and each assigned sample advances the cursor by its
/// size. `stsc` absent implies one sample per chunk (§4.C).
fn assemble_samples(
    durations: Vec<u32>,
    sizes: Option<Vec<u32>>,
    default_size: u32,
    sample_count: u32,
    stsc: &[(u32, u32)],
    chunk_offsets: &[u64],
) -> Result<Vec<SampleEntry>> {
    let total_samples = sample_count.max(durations.len() as u32) as usize;
    let mut samples = Vec::with_capacity(total_samples);
    let mut sample_index = 0usize;

    for (chunk_index, &chunk_offset) in chunk_offsets.iter().enumerate() {
        let chunk_number = chunk_index as u32 + 1; // 1-based
        let samples_per_chunk = samples_per_chunk_for(stsc, chunk_number);
        let mut cursor = chunk_offset;
        for _ in 0..samples_per_chunk {
            if sample_index >= total_samples {
                break;
            }
            let size = match &sizes {
                Some(v) => *v.get(sample_index).unwrap_or(&default_size),
                None => default_size,
            };
            let duration = *durations.get(sample_index).unwrap_or(&0);
            samples.push(SampleEntry {
                byte_offset: cursor,
                byte_size: size,
                duration_ticks: duration,
                is_keyframe: true,
            });
            cursor += size as u64;
            sample_index += 1;
        }
    }

    Ok(samples)
}

/// Last `stsc` entry whose `first_chunk <= chunk_number`, per §4.C. Absent
/// `stsc` means one sample per chunk.
fn samples_per_chunk_for(stsc: &[(u32, u32)], chunk_number: u32) -> u32 {
    if stsc.is_empty() {
        return 1;
    }
    stsc.iter()
        .rev()
        .find(|(first_chunk, _)| *first_chunk <= chunk_number)
        .map(|(_, per_chunk)| *per_chunk)
        .unwrap_or(1)
}
