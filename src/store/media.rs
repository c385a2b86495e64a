//! Upload naming and acceptance rules.

use std::time::{SystemTime, UNIX_EPOCH};

/// Hard cap on uploaded asset size.
pub const MAX_UPLOAD_BYTES: usize = 6 * 1024 * 1024;

/// Image formats the site can serve.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "svg", "avif"];

/// Whether the declared filename carries an allowed image extension.
pub fn ext_allowed(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Sanitize a declared filename into a URL-safe one: the extension is split
/// off and lowercased, the stem is lowercased with non-alphanumeric runs
/// collapsed to single hyphens. An empty stem becomes `upload`.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut cleaned = String::with_capacity(stem.len());
    let mut gap = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !cleaned.is_empty() {
                cleaned.push('-');
            }
            gap = false;
            cleaned.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    if cleaned.is_empty() {
        cleaned.push_str("upload");
    }

    match ext {
        Some(ext) => format!("{cleaned}.{}", ext.to_ascii_lowercase()),
        None => cleaned,
    }
}

/// Generate the stored name: `<epoch-ms>-<sanitized-name>`.
pub fn unique_upload_name(original: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{millis}-{}", sanitize_file_name(original))
}
