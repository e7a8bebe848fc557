use crate::options::{ConversionOptions, OutputFormat};
use aax_container::BookMetadata;
use std::path::PathBuf;

/// Replaces `:` with ` -`, strips `/\?*"<>|`, collapses runs of whitespace,
/// and trims the result, per §6's output path rule.
pub fn sanitize_path_component(raw: &str) -> String {
    let replaced = raw.replace(':', " -");
    let stripped: String = replaced
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '*' | '"' | '<' | '>' | '|'))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}

/// `<output_dir>/<author>/[<series>/]<title>.<ext>`, or a flat
/// `<output_dir>/<title>.<ext>` when `flat_folder_structure` is set.
pub fn build_output_path(
    options: &ConversionOptions,
    metadata: &BookMetadata,
    series_title: Option<&str>,
) -> PathBuf {
    let fallback_title = options
        .input_file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string());

    let title = sanitize_path_component(metadata.title.as_deref().unwrap_or(&fallback_title));
    let ext = options.output_format.extension();

    if options.flat_folder_structure {
        return options.output_dir.join(format!("{title}.{ext}"));
    }

    let author = sanitize_path_component(metadata.author.as_deref().unwrap_or("Unknown Author"));
    let mut path = options.output_dir.join(author);

    if options.series_title_in_folder_structure {
        if let Some(series) = series_title {
            path = path.join(sanitize_path_component(series));
        }
    }

    path.join(format!("{title}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with(flat: bool, series_in_folder: bool) -> ConversionOptions {
        ConversionOptions {
            input_file_path: PathBuf::from("Some Book.aax"),
            output_dir: PathBuf::from("/out"),
            output_format: OutputFormat::M4b,
            activation_code: None,
            flat_folder_structure: flat,
            series_title_in_folder_structure: series_in_folder,
            use_named_chapters: true,
            extract_cover_image: false,
            dump_metadata: false,
        }
    }

    #[test]
    fn sanitizes_colons_and_illegal_characters() {
        assert_eq!(sanitize_path_component("Foo: Bar/Baz?"), "Foo - BarBaz");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize_path_component("  Foo   Bar  "), "Foo Bar");
    }

    #[test]
    fn nested_path_includes_author_and_series() {
        let options = options_with(false, true);
        let mut metadata = BookMetadata::default();
        metadata.author = Some("Jane Doe".into());
        metadata.title = Some("Book One".into());
        let path = build_output_path(&options, &metadata, Some("The Series"));
        assert_eq!(path, PathBuf::from("/out/Jane Doe/The Series/Book One.m4b"));
    }

    #[test]
    fn flat_mode_ignores_author_and_series() {
        let options = options_with(true, true);
        let mut metadata = BookMetadata::default();
        metadata.author = Some("Jane Doe".into());
        metadata.title = Some("Book One".into());
        let path = build_output_path(&options, &metadata, Some("The Series"));
        assert_eq!(path, PathBuf::from("/out/Book One.m4b"));
    }

    #[test]
    fn missing_title_falls_back_to_input_file_stem() {
        let options = options_with(true, false);
        let path = build_output_path(&options, &BookMetadata::default(), None);
        assert_eq!(path, PathBuf::from("/out/Some Book.m4b"));
    }
}
