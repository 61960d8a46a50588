use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub fn sanitize_filename(filename: &str) -> String {
    // Remove or replace characters that are invalid in filenames
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Never let a header name the current or parent directory
    let trimmed = cleaned.trim().trim_start_matches('.');
    trimmed.to_string()
}

fn quoted_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)filename\s*=\s*"([^"]+)""#).expect("valid regex"))
}

fn bare_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)filename\s*=\s*([^";]+)"#).expect("valid regex"))
}

fn extended_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)filename\*\s*=\s*(?:UTF-8|utf-8)?''([^;]+)"#).expect("valid regex")
    })
}

/// Suggested filename from a `Content-Disposition` header value.
/// `filename*=UTF-8''...` wins over `filename="..."` and bare `filename=...`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let raw = if let Some(captures) = extended_filename_re().captures(header) {
        urlencoding::decode(captures[1].trim()).ok()?.into_owned()
    } else if let Some(captures) = quoted_filename_re().captures(header) {
        captures[1].to_string()
    } else {
        bare_filename_re().captures(header)?[1].trim().to_string()
    };

    let name = sanitize_filename(&raw);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// The `n`th candidate for `filename` in `dir`:
/// `clip.mp4`, `clip (1).mp4`, `clip (2).mp4`, ...
pub fn numbered_path(dir: &Path, filename: &str, n: u32) -> PathBuf {
    if n == 0 {
        return dir.join(filename);
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => dir.join(format!("{} ({}).{}", stem, n, ext)),
        _ => dir.join(format!("{} ({})", filename, n)),
    }
}
