//! Saving streamed artifacts into the download directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use audiofetch_logging::af_info;
use futures_util::StreamExt;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Response;
use tempfile::NamedTempFile;

use crate::api::map_reqwest_error;
use crate::persist::ensure_output_dir;
use crate::types::{ApiError, FailureKind};

const MAX_NAME_LEN: usize = 120;

pub(crate) async fn save_response(
    response: Response,
    dir: &Path,
    fallback_name: &str,
) -> Result<PathBuf, ApiError> {
    ensure_output_dir(dir).map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;

    let suggested = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_disposition);
    let filename = sanitize_filename(suggested.as_deref().unwrap_or(fallback_name));

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        tmp.write_all(&chunk).map_err(io_error)?;
        written += chunk.len() as u64;
    }
    tmp.flush().map_err(io_error)?;

    let target = unique_path(dir, &filename);
    tmp.persist_noclobber(&target)
        .map_err(|err| io_error(err.error))?;
    af_info!("Saved {} bytes to {}", written, target.display());
    Ok(target)
}

fn io_error(err: std::io::Error) -> ApiError {
    ApiError::new(FailureKind::Io, err.to_string())
}

/// Extracts the suggested file name from a `Content-Disposition` value.
/// `filename*` (RFC 5987) wins over a plain `filename`.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().rsplit('\'').next().unwrap_or_default();
                let decoded = percent_decode_str(encoded)
                    .decode_utf8()
                    .ok()
                    .map(|name| name.into_owned())
                    .filter(|name| !name.is_empty());
                if decoded.is_some() {
                    return decoded;
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

/// File name safe on every desktop platform; never empty and never a path.
pub fn sanitize_filename(input: &str) -> String {
    let base = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let mut compacted = String::with_capacity(base.len());
    let mut prev_underscore = false;
    for c in base.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut cleaned = compacted.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "download".to_string();
    }
    if cleaned.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
    }
    let stem = cleaned.split('.').next().unwrap_or_default();
    if is_reserved_windows_name(stem) {
        cleaned.insert(stem.len(), '_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// `name`, or `stem (n).ext` for the first `n` not already taken.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
