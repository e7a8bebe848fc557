use crate::boxwrite::{boxed, write_u16, write_u32, write_u64, write_u8};
use crate::model::{MuxOptions, OutputBrand};
use aax_container::{BookMetadata, Chapter};

/// One finalized sample: its absolute byte offset in the output file, its
/// size, and its duration in the track's timescale.
#[derive(Debug, Clone, Copy)]
pub struct FinalSample {
    pub offset: u64,
    pub size: u32,
    pub duration_ticks: u32,
}

/// Seconds between the Unix epoch (1970-01-01) and the QuickTime/MP4 epoch
/// (1904-01-01), added to wall-clock time for `mvhd`/`tkhd`/`mdhd` timestamps.
pub const QUICKTIME_EPOCH_OFFSET: u32 = 2_082_844_800;

pub struct MoovInput<'a> {
    pub options: &'a MuxOptions,
    pub samples: &'a [FinalSample],
    pub metadata: &'a BookMetadata,
    pub chapters: &'a [Chapter],
    pub creation_time: u32,
}

/// Builds the complete `moov` box. Called twice by the muxer: once with
/// `samples` offsets relative to 0 purely to measure the box's length, then
/// again with real absolute offsets once that length fixes where `mdat`
/// begins. The box's byte length never depends on the offset *values*
/// (`stco`/`co64` entries are fixed-width), only on the sample *count* and
/// whether 64-bit offsets are needed, so the second build is exact.
pub fn build_moov(input: &MoovInput) -> Vec<u8> {
    let duration_ticks: u64 = input.samples.iter().map(|s| s.duration_ticks as u64).sum();

    boxed(b"moov", |moov| {
        moov.extend_from_slice(&build_mvhd(input.options.timescale, duration_ticks, input.creation_time));
        moov.extend_from_slice(&build_audio_trak(input, duration_ticks));
        if metadata_has_content(input.metadata) || !input.chapters.is_empty() {
            moov.extend_from_slice(&build_udta(input.metadata, input.chapters));
        }
    })
}

fn build_mvhd(timescale: u32, duration_ticks: u64, creation_time: u32) -> Vec<u8> {
    boxed(b"mvhd", |b| {
        write_u8(b, 0);
        b.extend_from_slice(&[0, 0, 0]);
        write_u32(b, creation_time);
        write_u32(b, creation_time);
        write_u32(b, timescale);
        write_u32(b, duration_ticks.min(u32::MAX as u64) as u32);
        write_u32(b, 0x0001_0000); // rate 1.0
        write_u16(b, 0x0100); // volume 1.0
        b.extend_from_slice(&[0u8; 10]); // reserved
        // unity identity matrix
        for v in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
            write_u32(b, v);
        }
        b.extend_from_slice(&[0u8; 24]); // pre_defined
        write_u32(b, 2); // next_track_id
    })
}

fn build_audio_trak(input: &MoovInput, duration_ticks: u64) -> Vec<u8> {
    boxed(b"trak", |trak| {
        trak.extend_from_slice(&build_tkhd(1, duration_ticks, input.creation_time));
        trak.extend_from_slice(&boxed(b"mdia", |mdia| {
            mdia.extend_from_slice(&build_mdhd(input.options.timescale, duration_ticks, input.creation_time));
            mdia.extend_from_slice(&build_hdlr(b"soun", "SoundHandler"));
            mdia.extend_from_slice(&boxed(b"minf", |minf| {
                minf.extend_from_slice(&build_smhd());
                minf.extend_from_slice(&build_dinf());
                minf.extend_from_slice(&build_stbl(input));
            }));
        }));
    })
}

fn build_tkhd(track_id: u32, duration_ticks: u64, creation_time: u32) -> Vec<u8> {
    boxed(b"tkhd", |b| {
        write_u8(b, 0);
        b.extend_from_slice(&[0, 0, 7]); // flags: enabled | in_movie | in_preview
        write_u32(b, creation_time);
        write_u32(b, creation_time);
        write_u32(b, track_id);
        write_u32(b, 0); // reserved
        write_u32(b, duration_ticks.min(u32::MAX as u64) as u32);
        b.extend_from_slice(&[0u8; 8]); // reserved
        write_u16(b, 0); // layer
        write_u16(b, 0); // alternate_group
        write_u16(b, 0x0100); // volume 1.0 (audio track)
        write_u16(b, 0); // reserved
        for v in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
            write_u32(b, v);
        }
        write_u32(b, 0); // width (audio-only track)
        write_u32(b, 0); // height
    })
}

fn build_mdhd(timescale: u32, duration_ticks: u64, creation_time: u32) -> Vec<u8> {
    boxed(b"mdhd", |b| {
        write_u8(b, 0);
        b.extend_from_slice(&[0, 0, 0]);
        write_u32(b, creation_time);
        write_u32(b, creation_time);
        write_u32(b, timescale);
        write_u32(b, duration_ticks.min(u32::MAX as u64) as u32);
        write_u16(b, 0x55C4); // language: undetermined ("und")
        write_u16(b, 0);
    })
}

fn build_hdlr(subtype: &[u8; 4], name: &str) -> Vec<u8> {
    boxed(b"hdlr", |b| {
        write_u32(b, 0); // version/flags
        b.extend_from_slice(&[0u8; 4]); // pre_defined; handler type lands at +8
        b.extend_from_slice(subtype);
        b.extend_from_slice(&[0u8; 12]); // reserved
        b.extend_from_slice(name.as_bytes());
        b.push(0);
    })
}

fn build_smhd() -> Vec<u8> {
    boxed(b"smhd", |b| {
        write_u32(b, 0);
        write_u16(b, 0); // balance
        write_u16(b, 0); // reserved
    })
}

fn build_dinf() -> Vec<u8> {
    boxed(b"dinf", |dinf| {
        dinf.extend_from_slice(&boxed(b"dref", |dref| {
            write_u32(dref, 0);
            write_u32(dref, 1); // entry_count
            dref.extend_from_slice(&boxed(b"url ", |url| {
                write_u32(url, 1); // flags: self-contained
            }));
        }));
    })
}

fn build_stbl(input: &MoovInput) -> Vec<u8> {
    boxed(b"stbl", |stbl| {
        stbl.extend_from_slice(&build_stsd(input.options));
        stbl.extend_from_slice(&build_stts(input.samples));
        stbl.extend_from_slice(&build_stsz(input.samples));
        stbl.extend_from_slice(&build_stsc(input.samples.len()));
        stbl.extend_from_slice(&build_chunk_offsets(input.samples));
    })
}

fn build_stsd(options: &MuxOptions) -> Vec<u8> {
    boxed(b"stsd", |stsd| {
        write_u32(stsd, 0);
        write_u32(stsd, 1); // entry_count
        stsd.extend_from_slice(&boxed(b"mp4a", |entry| {
            entry.extend_from_slice(&[0u8; 6]); // reserved
            write_u16(entry, 1); // data_reference_index
            // Standard AudioSampleEntry fixed header: version/revision/vendor(8),
            // then channel count @ +16, sample rate @ +24; children (`esds`,
            // `adrm`) start at +28. Mirrors this crate's own reader,
            // `resolver.rs::parse_stsd_sound`.
            write_u16(entry, 0); // version
            write_u16(entry, 0); // revision_level
            write_u32(entry, 0); // vendor
            write_u16(entry, options.channel_count);
            write_u16(entry, 16); // sample_size bits
            write_u16(entry, 0); // compression_id
            write_u16(entry, 0); // packet_size
            write_u32(entry, (options.sample_rate as u32) << 16); // sample_rate, 16.16 fixed
            entry.extend_from_slice(&build_esds(&options.codec_config));
        }));
    })
}

fn build_esds(codec_config: &[u8]) -> Vec<u8> {
    boxed(b"esds", |b| {
        write_u32(b, 0); // version/flags
        // ES_Descriptor
        write_descriptor_tag(b, 0x03, |d| {
            write_u16(d, 1); // ES_ID
            write_u8(d, 0); // flags
            write_descriptor_tag(d, 0x04, |dc| {
                write_u8(dc, 0x40); // objectTypeIndication: MPEG-4 Audio
                write_u8(dc, 0x15); // streamType: AudioStream, upStream=0, reserved=1
                dc.extend_from_slice(&[0, 0, 0]); // bufferSizeDB
                write_u32(dc, 0); // maxBitrate
                write_u32(dc, 0); // avgBitrate
                write_descriptor_tag(dc, 0x05, |dsi| {
                    dsi.extend_from_slice(codec_config);
                });
            });
            write_descriptor_tag(d, 0x06, |sl| {
                write_u8(sl, 0x02);
            });
        });
    })
}

fn write_descriptor_tag(out: &mut Vec<u8>, tag: u8, build: impl FnOnce(&mut Vec<u8>)) {
    let mut body = Vec::new();
    build(&mut body);
    out.push(tag);
    write_expandable_length(out, body.len());
    out.extend_from_slice(&body);
}

fn write_expandable_length(out: &mut Vec<u8>, mut len: usize) {
    let mut bytes = [0u8; 4];
    let mut n = 0;
    loop {
        bytes[n] = (len & 0x7F) as u8;
        len >>= 7;
        n += 1;
        if len == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let mut byte = bytes[i];
        if i != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

fn build_stts(samples: &[FinalSample]) -> Vec<u8> {
    boxed(b"stts", |b| {
        write_u32(b, 0);
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for s in samples {
            match runs.last_mut() {
                Some((count, delta)) if *delta == s.duration_ticks => *count += 1,
                _ => runs.push((1, s.duration_ticks)),
            }
        }
        write_u32(b, runs.len() as u32);
        for (count, delta) in runs {
            write_u32(b, count);
            write_u32(b, delta);
        }
    })
}

fn build_stsz(samples: &[FinalSample]) -> Vec<u8> {
    boxed(b"stsz", |b| {
        write_u32(b, 0);
        let uniform = samples.windows(2).all(|w| w[0].size == w[1].size);
        if uniform && !samples.is_empty() {
            write_u32(b, samples[0].size);
            write_u32(b, samples.len() as u32);
        } else {
            write_u32(b, 0);
            write_u32(b, samples.len() as u32);
            for s in samples {
                write_u32(b, s.size);
            }
        }
    })
}

fn build_stsc(sample_count: usize) -> Vec<u8> {
    boxed(b"stsc", |b| {
        write_u32(b, 0);
        if sample_count == 0 {
            write_u32(b, 0);
            return;
        }
        write_u32(b, 1);
        write_u32(b, 1); // first_chunk
        write_u32(b, 1); // samples_per_chunk: one sample per chunk
        write_u32(b, 1); // sample_description_index
    })
}

fn build_chunk_offsets(samples: &[FinalSample]) -> Vec<u8> {
    let needs_64bit = samples.last().map(|s| s.offset + s.size as u64 > u32::MAX as u64).unwrap_or(false);
    if needs_64bit {
        boxed(b"co64", |b| {
            write_u32(b, 0);
            write_u32(b, samples.len() as u32);
            for s in samples {
                write_u64(b, s.offset);
            }
        })
    } else {
        boxed(b"stco", |b| {
            write_u32(b, 0);
            write_u32(b, samples.len() as u32);
            for s in samples {
                write_u32(b, s.offset as u32);
            }
        })
    }
}

fn metadata_has_content(metadata: &BookMetadata) -> bool {
    metadata.title.is_some()
        || metadata.author.is_some()
        || metadata.narrator.is_some()
        || metadata.publisher.is_some()
        || metadata.year.is_some()
        || metadata.copyright.is_some()
        || metadata.description.is_some()
        || metadata.cover.is_some()
}

fn build_udta(metadata: &BookMetadata, chapters: &[Chapter]) -> Vec<u8> {
    boxed(b"udta", |udta| {
        udta.extend_from_slice(&boxed(b"meta", |meta| {
            write_u32(meta, 0);
            meta.extend_from_slice(&boxed(b"hdlr", |hdlr| {
                write_u32(hdlr, 0);
                write_u32(hdlr, 0);
                hdlr.extend_from_slice(b"mdir");
                hdlr.extend_from_slice(b"appl");
                hdlr.extend_from_slice(&[0u8; 8]);
                hdlr.push(0);
            }));
            meta.extend_from_slice(&boxed(b"ilst", |ilst| {
                write_ilst_text(ilst, &[0xA9, b'n', b'a', b'm'], metadata.title.as_deref());
                write_ilst_text(ilst, &[0xA9, b'A', b'R', b'T'], metadata.author.as_deref());
                write_ilst_text(ilst, b"aART", metadata.author.as_deref());
                write_ilst_text(ilst, &[0xA9, b'w', b'r', b't'], metadata.narrator.as_deref());
                write_ilst_text(ilst, &[0xA9, b'p', b'u', b'b'], metadata.publisher.as_deref());
                write_ilst_text(ilst, &[0xA9, b'd', b'a', b'y'], metadata.year.as_deref());
                write_ilst_text(ilst, b"cprt", metadata.copyright.as_deref());
                write_ilst_text(ilst, &[0xA9, b'g', b'e', b'n'], Some("Audiobook"));
                write_ilst_text(ilst, b"desc", metadata.description.as_deref());
                if let Some(cover) = &metadata.cover {
                    ilst.extend_from_slice(&boxed(b"covr", |covr| {
                        covr.extend_from_slice(&boxed(b"data", |data| {
                            let flags = if cover.mime == "image/png" { 14u32 } else { 13u32 };
                            write_u32(data, flags);
                            write_u32(data, 0);
                            data.extend_from_slice(&cover.data);
                        }));
                    }));
                }
            }));
        }));
        if !chapters.is_empty() {
            udta.extend_from_slice(&build_chpl(chapters));
        }
    })
}

fn write_ilst_text(ilst: &mut Vec<u8>, key: &[u8; 4], value: Option<&str>) {
    let Some(value) = value else { return };
    ilst.extend_from_slice(&boxed(key, |item| {
        item.extend_from_slice(&boxed(b"data", |data| {
            write_u32(data, 1); // type indicator: UTF-8
            write_u32(data, 0);
            data.extend_from_slice(value.as_bytes());
        }));
    }));
}

/// Nero-style `chpl` chapter list, written under `udta` alongside `meta`.
/// Simpler than a synthesized QuickTime `text` track for a feature most
/// players already recognize from this exact atom.
fn build_chpl(chapters: &[Chapter]) -> Vec<u8> {
    boxed(b"chpl", |b| {
        write_u8(b, 1); // version
        b.extend_from_slice(&[0, 0, 0]); // flags
        write_u32(b, 0); // reserved
        write_u8(b, chapters.len() as u8);
        for chapter in chapters {
            let start_100ns = (chapter.start_seconds * 10_000_000.0) as u64;
            write_u64(b, start_100ns);
            let title_bytes = chapter.title.as_bytes();
            let len = title_bytes.len().min(255);
            write_u8(b, len as u8);
            b.extend_from_slice(&title_bytes[..len]);
        }
    })
}
