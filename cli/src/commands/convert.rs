use aax_cli::OptionsBuilder;
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConvertArgs {
    /// Input .aax file
    pub input: PathBuf,
    /// Output directory (default: current directory, or $AAX_OUTPUT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Output container: m4a or m4b
    #[arg(short = 'f', long, default_value = "m4b")]
    pub format: String,
    /// 8-hex-digit activation code (default: $AAX_ACTIVATION_BYTES)
    #[arg(short, long)]
    pub activation_bytes: Option<String>,
    /// Write output.ext directly under output_dir instead of author/series folders
    #[arg(long)]
    pub flat: bool,
    /// Nest a series-title folder between author and title, when known
    #[arg(long)]
    pub series_folder: bool,
    /// Replace chapter titles with "Chapter N" instead of the embedded titles
    #[arg(long)]
    pub numbered_chapters: bool,
    /// Also write the cover image as a side-file next to the output
    #[arg(long)]
    pub extract_cover: bool,
    /// Also write a `<output>.metadata.json` sidecar with the parsed tags
    #[arg(long)]
    pub dump_metadata: bool,
}

pub fn handle(args: ConvertArgs) -> Result<()> {
    let options = OptionsBuilder {
        input_file_path: Some(args.input),
        output_dir: args.output_dir,
        output_format: Some(args.format),
        activation_code: args.activation_bytes,
        flat_folder_structure: args.flat,
        series_title_in_folder_structure: args.series_folder,
        use_named_chapters: !args.numbered_chapters,
        extract_cover_image: args.extract_cover,
        dump_metadata: args.dump_metadata,
    }
    .build()
    .context("invalid conversion options")?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} samples ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let sink = IndicatifProgressSink { bar: bar.clone() };

    let result = aax_cli::try_convert_with_progress(&options, &sink);
    bar.finish_and_clear();

    match result {
        Ok(output_path) => {
            println!("Converted to {:?}", output_path);
            Ok(())
        }
        Err(err) => {
            eprintln!("Conversion failed: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

struct IndicatifProgressSink {
    bar: ProgressBar,
}

impl aax_cli::progress::ProgressSink for IndicatifProgressSink {
    fn started(&self, total_samples: u64) {
        self.bar.set_length(total_samples);
    }

    fn advance(&self, samples_done: u64, _total_samples: u64) {
        self.bar.set_position(samples_done);
    }

    fn finished(&self) {
        self.bar.finish();
    }
}
