use crate::error::{CliError, Result};
use crate::options::ConversionOptions;
use crate::output_guard::OutputGuard;
use crate::output_path::build_output_path;
use crate::progress::{NullProgressSink, ProgressSink};
use aax_container::{parse, ActivationValue};
use aax_drm::{derive_keys, validate, decrypt_sample};
use aax_mux::{Muxer, MuxOptions, Packet};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Emit a progress event roughly every this-many samples; fine enough to be
/// informative, coarse enough not to dominate the loop.
const PROGRESS_GRANULARITY: u64 = 200;

#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl ConversionResult {
    fn ok(output_path: PathBuf) -> Self {
        Self { success: true, output_path: Some(output_path), error: None }
    }

    fn failed(err: &CliError) -> Self {
        Self { success: false, output_path: None, error: Some(err.to_string()) }
    }
}

/// Runs the full seven-step conversion pipeline and returns a result rather
/// than propagating an error, so both `main` and in-process callers get a
/// uniform `{success, output_path, error}` shape regardless of which step
/// failed.
pub fn convert(options: &ConversionOptions) -> ConversionResult {
    match convert_inner(options, &NullProgressSink) {
        Ok(path) => ConversionResult::ok(path),
        Err(e) => ConversionResult::failed(&e),
    }
}

pub fn convert_with_progress(options: &ConversionOptions, progress: &dyn ProgressSink) -> ConversionResult {
    match convert_inner(options, progress) {
        Ok(path) => ConversionResult::ok(path),
        Err(e) => ConversionResult::failed(&e),
    }
}

/// Same pipeline as [`convert_with_progress`], but surfaces the structured
/// `CliError` rather than collapsing it to a string — for callers (the
/// binary's `main`) that need `CliError::kind()` to pick a process exit code.
pub fn try_convert_with_progress(options: &ConversionOptions, progress: &dyn ProgressSink) -> Result<PathBuf> {
    convert_inner(options, progress)
}

fn convert_inner(options: &ConversionOptions, progress: &dyn ProgressSink) -> Result<PathBuf> {
    if !options.input_file_path.exists() {
        return Err(CliError::InputNotFound(options.input_file_path.clone()));
    }

    // Step 1: parse input.
    info!(path = %options.input_file_path.display(), "parsing AAX container");
    let parsed = parse(&options.input_file_path)?;

    // Step 2: resolve activation value.
    let activation_text = options.activation_code.as_deref().ok_or(CliError::MissingActivation)?;
    let activation = ActivationValue::from_str(activation_text)
        .map_err(|_| CliError::InvalidActivationFormat(activation_text.to_string()))?;

    let adrm = parsed.audio.adrm.as_ref().ok_or(aax_container::ContainerError::NotEncrypted)?;

    // Step 3: validate & derive keys, with the one-shot lowercase retry §4.H specifies.
    let mut ok = validate(adrm, &activation);
    let mut effective = activation;
    if !ok {
        let lowercase = activation_text.to_ascii_lowercase();
        if let Ok(retry) = ActivationValue::from_str(&lowercase) {
            if validate(adrm, &retry) {
                ok = true;
                effective = retry;
            }
        }
    }
    if !ok {
        warn!("activation value did not validate against this file's checksum");
        return Err(aax_drm::DrmError::ActivationMismatch.into());
    }
    let keys = derive_keys(adrm, &effective)?;
    debug!("derived file key/IV");

    // Step 4: compute output path, create directories.
    let output_path = build_output_path(options, &parsed.metadata, None);
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let guard = OutputGuard::new(&output_path);

    if options.extract_cover_image {
        if let Some(cover) = &parsed.metadata.cover {
            let ext = if cover.mime == "image/png" { "png" } else { "jpg" };
            let cover_path = output_path.with_file_name(format!(
                "{}.cover.{ext}",
                output_path.file_stem().and_then(|s| s.to_str()).unwrap_or("cover")
            ));
            if let Err(e) = std::fs::write(&cover_path, &cover.data) {
                warn!(error = %e, "failed to write cover image side-file, continuing");
            }
        }
    }

    if options.dump_metadata {
        if let Ok(json) = serde_json::to_string_pretty(&parsed.metadata) {
            let json_path = output_path.with_extension("metadata.json");
            if let Err(e) = std::fs::write(&json_path, json) {
                warn!(error = %e, "failed to write metadata dump, continuing");
            }
        }
    }

    // Step 5: open the muxer.
    let chapters: Vec<aax_container::Chapter> = if options.use_named_chapters {
        parsed.chapters.clone()
    } else {
        parsed
            .chapters
            .iter()
            .enumerate()
            .map(|(i, c)| aax_container::Chapter {
                title: format!("Chapter {}", i + 1),
                start_seconds: c.start_seconds,
                end_seconds: c.end_seconds,
            })
            .collect()
    };

    let codec_config = parsed.audio.codec_config.clone().unwrap_or_default();
    let mut muxer = Muxer::new(MuxOptions {
        brand: options.output_format.brand(),
        timescale: parsed.audio.timescale,
        channel_count: parsed.audio.channel_count,
        sample_rate: parsed.audio.sample_rate,
        codec_config,
    })?;

    // Step 6: read, decrypt, and write every sample in order.
    let total = parsed.audio.samples.len() as u64;
    progress.started(total);
    let mut reader = aax_container::AaxReader::open(&options.input_file_path)?;
    for (i, sample) in parsed.audio.samples.iter().enumerate() {
        let ciphertext = reader.read_exact_at(sample.byte_offset, sample.byte_size as usize)?;
        let plaintext = decrypt_sample(&ciphertext, &keys);
        muxer.write_packet(&Packet {
            data: plaintext,
            duration_ticks: sample.duration_ticks,
            is_keyframe: sample.is_keyframe,
        })?;

        if i as u64 % PROGRESS_GRANULARITY == 0 {
            progress.advance(i as u64, total);
        }
    }
    progress.advance(total, total);

    // Step 7: finalize muxer, close source, commit output.
    muxer.finalize(guard.path(), &parsed.metadata, &chapters)?;
    reader.close();
    progress.finished();
    guard.commit();

    info!(path = %output_path.display(), "conversion complete");
    Ok(output_path)
}
