//! File extension policy shared by staging and result lookup.
//!
//! The worker writes `<output_dir>/<stem><ext>` for `<input_dir>/<stem><ext>`, so both
//! sides must agree on the extension, including the fallback.

use std::path::Path;

/// Extension used when none can be derived.
pub const DEFAULT_EXTENSION: &str = ".jpg";

const MAX_EXTENSION_LEN: usize = 16;

/// Dotted extension of `path`'s final component, or [`DEFAULT_EXTENSION`].
///
/// Only ASCII alphanumeric extensions are kept so client-supplied names cannot
/// smuggle separators or control characters into staged paths.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.file_name()
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.bytes().all(|byte| byte.is_ascii_alphanumeric())
        })
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), |ext| format!(".{ext}"))
}

/// Extension for a client-supplied filename.
#[must_use]
pub fn extension_for_upload(filename: Option<&str>) -> String {
    filename.map_or_else(
        || DEFAULT_EXTENSION.to_string(),
        |name| extension_of(Path::new(name)),
    )
}
