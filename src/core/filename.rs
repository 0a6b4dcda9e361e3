use crate::models::media::MediaFormat;

// Windows-forbidden characters are replaced on every platform.
pub fn suggested_filename(title: &str, format: MediaFormat) -> String {
    let options = sanitize_filename::Options {
        windows: true,
        truncate: true,
        replacement: "_",
    };
    let base = sanitize_filename::sanitize_with_options(title, options);
    format!("{}.{}", base, format.extension())
}
