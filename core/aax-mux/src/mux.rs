use crate::boxwrite::boxed;
use crate::error::{MuxError, Result};
use crate::model::{MuxOptions, Packet};
use crate::moov::{build_moov, FinalSample, MoovInput, QUICKTIME_EPOCH_OFFSET};
use aax_container::{BookMetadata, Chapter};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Fast-start MP4/M4B muxer. Packets are appended to a scratch file as they
/// arrive (bounding memory to one packet at a time, never the whole book);
/// `finalize` then writes `ftyp` + `moov` to the real output file followed by
/// the buffered `mdat`, so playback can begin without seeking past the audio
/// payload first.
pub struct Muxer {
    scratch: BufWriter<NamedTempFile>,
    relative_offset: u64,
    samples: Vec<FinalSample>,
    options: MuxOptions,
}

impl Muxer {
    pub fn new(options: MuxOptions) -> Result<Self> {
        let scratch = NamedTempFile::new()?;
        Ok(Self {
            scratch: BufWriter::new(scratch),
            relative_offset: 0,
            samples: Vec::new(),
            options,
        })
    }

    /// Appends one packet's payload to the scratch buffer and records its
    /// place in the eventual sample table.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        if packet.data.is_empty() {
            return Err(MuxError::RejectedPacket("packet payload is empty".into()));
        }
        self.scratch.write_all(&packet.data)?;
        self.samples.push(FinalSample {
            offset: self.relative_offset,
            size: packet.data.len() as u32,
            duration_ticks: packet.duration_ticks,
        });
        self.relative_offset += packet.data.len() as u64;
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Writes the finished container to `output_path`. Consumes the muxer:
    /// there is nothing useful to do with it afterward.
    pub fn finalize(
        mut self,
        output_path: &Path,
        metadata: &BookMetadata,
        chapters: &[Chapter],
    ) -> Result<()> {
        if self.samples.is_empty() {
            return Err(MuxError::FinalizeFailed("no samples were written".into()));
        }
        self.scratch.flush()?;
        let mdat_body_len = self.relative_offset;

        let ftyp = build_ftyp(&self.options);
        let mdat_header_len: u64 = if mdat_body_len + 8 > u32::MAX as u64 { 16 } else { 8 };

        let creation_time = unix_now_as_mac_epoch();
        let dry_run_samples = self.samples.clone();
        let dry_moov = build_moov(&MoovInput {
            options: &self.options,
            samples: &dry_run_samples,
            metadata,
            chapters,
            creation_time,
        });

        let base_offset = ftyp.len() as u64 + dry_moov.len() as u64 + mdat_header_len;
        let final_samples: Vec<FinalSample> = self
            .samples
            .iter()
            .map(|s| FinalSample {
                offset: s.offset + base_offset,
                size: s.size,
                duration_ticks: s.duration_ticks,
            })
            .collect();
        let moov = build_moov(&MoovInput {
            options: &self.options,
            samples: &final_samples,
            metadata,
            chapters,
            creation_time,
        });
        debug_assert_eq!(
            moov.len(),
            dry_moov.len(),
            "moov length must be independent of offset values, only of sample count"
        );

        let out_file = File::create(output_path)?;
        let mut out = BufWriter::new(out_file);
        out.write_all(&ftyp)?;
        out.write_all(&moov)?;
        write_mdat_header(&mut out, mdat_body_len, mdat_header_len)?;

        let mut scratch_file = self.scratch.into_inner().map_err(|e| e.into_error())?;
        scratch_file.seek(SeekFrom::Start(0))?;
        std::io::copy(&mut scratch_file, &mut out)?;
        out.flush()?;

        info!(
            samples = final_samples.len(),
            bytes = base_offset + mdat_body_len,
            path = %output_path.display(),
            "wrote container"
        );
        Ok(())
    }
}

fn write_mdat_header<W: Write>(out: &mut W, body_len: u64, header_len: u64) -> Result<()> {
    use byteorder::{BigEndian, WriteBytesExt};
    if header_len == 16 {
        out.write_u32::<BigEndian>(1)?;
        out.write_all(b"mdat")?;
        out.write_u64::<BigEndian>(body_len + 16)?;
    } else {
        out.write_u32::<BigEndian>(body_len as u32 + 8)?;
        out.write_all(b"mdat")?;
    }
    Ok(())
}

fn build_ftyp(options: &MuxOptions) -> Vec<u8> {
    boxed(b"ftyp", |b| {
        b.extend_from_slice(options.brand.major_brand());
        b.extend_from_slice(&[0, 0, 0, 0]); // minor_version
        for brand in options.brand.compatible_brands() {
            b.extend_from_slice(*brand);
        }
    })
}

fn unix_now_as_mac_epoch() -> u32 {
    let unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    (unix_secs as u32).wrapping_add(QUICKTIME_EPOCH_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutputBrand;

    fn options() -> MuxOptions {
        MuxOptions {
            brand: OutputBrand::M4b,
            timescale: 44100,
            channel_count: 2,
            sample_rate: 44100,
            codec_config: vec![0x12, 0x10],
        }
    }

    #[test]
    fn finalize_rejects_empty_packet_stream() {
        let muxer = Muxer::new(options()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.m4b");
        let result = muxer.finalize(&out_path, &BookMetadata::default(), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn write_packet_rejects_empty_payload() {
        let mut muxer = Muxer::new(options()).unwrap();
        let err = muxer
            .write_packet(&Packet { data: vec![], duration_ticks: 1024, is_keyframe: true })
            .unwrap_err();
        assert!(matches!(err, MuxError::RejectedPacket(_)));
    }

    #[test]
    fn finalize_produces_a_well_formed_ftyp_and_moov_prefix() {
        let mut muxer = Muxer::new(options()).unwrap();
        for _ in 0..4 {
            muxer
                .write_packet(&Packet { data: vec![0xAB; 100], duration_ticks: 1024, is_keyframe: true })
                .unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.m4b");
        muxer.finalize(&out_path, &BookMetadata::default(), &[]).unwrap();

        let bytes = std::fs::read(&out_path).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
        assert_eq!(&bytes[8..12], b"M4B ");

        let ftyp_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(&bytes[ftyp_len + 4..ftyp_len + 8], b"moov");

        let moov_len = u32::from_be_bytes(bytes[ftyp_len..ftyp_len + 4].try_into().unwrap()) as usize;
        let mdat_start = ftyp_len + moov_len;
        assert_eq!(&bytes[mdat_start + 4..mdat_start + 8], b"mdat");

        let mdat_len = u32::from_be_bytes(bytes[mdat_start..mdat_start + 4].try_into().unwrap()) as usize;
        assert_eq!(mdat_start + mdat_len, bytes.len());
        assert_eq!(mdat_len, 8 + 4 * 100);
    }

    #[test]
    fn written_stco_offsets_resolve_to_the_exact_bytes_each_packet_wrote() {
        let mut muxer = Muxer::new(options()).unwrap();
        let payloads: Vec<Vec<u8>> = vec![vec![0x01; 77], vec![0x02; 203], vec![0x03; 50]];
        for p in &payloads {
            muxer
                .write_packet(&Packet { data: p.clone(), duration_ticks: 1024, is_keyframe: true })
                .unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.m4b");
        muxer.finalize(&out_path, &BookMetadata::default(), &[]).unwrap();

        let mut reader = aax_container::AaxReader::open(&out_path).unwrap();
        let file_len = reader.len();
        let moov = aax_container::boxes::find_box(&mut reader, 0, file_len, "moov")
            .unwrap()
            .unwrap();
        let tracks =
            aax_container::resolver::resolve_tracks(&mut reader, moov.content_offset, moov.end_offset()).unwrap();
        let audio = tracks
            .iter()
            .find(|t| t.handler == aax_container::HandlerType::Sound)
            .unwrap();

        assert_eq!(audio.samples.len(), payloads.len());
        for (sample, expected) in audio.samples.iter().zip(&payloads) {
            assert_eq!(sample.byte_size as usize, expected.len());
            let bytes_on_disk = reader.read_exact_at(sample.byte_offset, sample.byte_size as usize).unwrap();
            assert_eq!(&bytes_on_disk, expected);
        }
    }
}
