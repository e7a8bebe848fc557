use crate::error::{CliError, Result};
use aax_mux::OutputBrand;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    M4a,
    M4b,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "m4a" => Ok(OutputFormat::M4a),
            "m4b" => Ok(OutputFormat::M4b),
            other => Err(CliError::UnsupportedOutputFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::M4a => "m4a",
            OutputFormat::M4b => "m4b",
        }
    }

    pub fn brand(&self) -> OutputBrand {
        match self {
            OutputFormat::M4a => OutputBrand::M4a,
            OutputFormat::M4b => OutputBrand::M4b,
        }
    }
}

/// Immutable, fully-resolved input to one conversion run. Built once by
/// `OptionsBuilder` and never mutated or re-read by the core afterward.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub input_file_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub activation_code: Option<String>,
    pub flat_folder_structure: bool,
    pub series_title_in_folder_structure: bool,
    pub use_named_chapters: bool,
    pub extract_cover_image: bool,
    pub dump_metadata: bool,
}

/// Merges explicit CLI flags over environment variables over built-in
/// defaults, exactly once, ahead of any container I/O.
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    pub input_file_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub output_format: Option<String>,
    pub activation_code: Option<String>,
    pub flat_folder_structure: bool,
    pub series_title_in_folder_structure: bool,
    pub use_named_chapters: bool,
    pub extract_cover_image: bool,
    pub dump_metadata: bool,
}

impl OptionsBuilder {
    pub fn build(self) -> Result<ConversionOptions> {
        let input_file_path = self.input_file_path.ok_or(CliError::MissingInput)?;

        let output_dir = self
            .output_dir
            .or_else(|| env::var("AAX_OUTPUT_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let output_format = OutputFormat::parse(self.output_format.as_deref().unwrap_or("m4b"))?;

        let activation_code = self
            .activation_code
            .or_else(|| env::var("AAX_ACTIVATION_BYTES").ok());

        Ok(ConversionOptions {
            input_file_path,
            output_dir,
            output_format,
            activation_code,
            flat_folder_structure: self.flat_folder_structure,
            series_title_in_folder_structure: self.series_title_in_folder_structure,
            use_named_chapters: self.use_named_chapters,
            extract_cover_image: self.extract_cover_image,
            dump_metadata: self.dump_metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_is_rejected_before_any_io() {
        let err = OutputFormat::parse("mp3").unwrap_err();
        assert!(matches!(err, CliError::UnsupportedOutputFormat(_)));
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!(OutputFormat::parse("M4B").unwrap(), OutputFormat::M4b);
        assert_eq!(OutputFormat::parse("m4a").unwrap(), OutputFormat::M4a);
    }

    #[test]
    fn builder_rejects_missing_input() {
        let err = OptionsBuilder::default().build().unwrap_err();
        assert!(matches!(err, CliError::MissingInput));
    }

    #[test]
    fn builder_defaults_output_dir_to_current_directory_without_env() {
        // SAFETY: test-local env mutation, no other test reads this var concurrently
        // within this process in a way that would race on its value.
        unsafe { env::remove_var("AAX_OUTPUT_DIR") };
        let opts = OptionsBuilder {
            input_file_path: Some(PathBuf::from("book.aax")),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(opts.output_dir, PathBuf::from("."));
    }
}
