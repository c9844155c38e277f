//! Human-readable formatting for sizes, durations and response headers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Unit table used for upload sizes in the image converter.
pub const UNITS_TO_MB: &[&str] = &["Bytes", "KB", "MB"];

/// Unit table used everywhere else.
pub const UNITS_TO_GB: &[&str] = &["Bytes", "KB", "MB", "GB"];

/// Sentinel for a zero byte count.
pub const ZERO_BYTES: &str = "0 Bytes";

/// Sentinel for a size or duration the backend did not report.
pub const UNKNOWN: &str = "Unknown";

const STEP: u64 = 1024;

/// Format `bytes` with binary (1024-based) steps over `units`.
///
/// The unit index is `floor(log_1024(bytes))`, clamped to the last entry of
/// `units`; the value is rounded to two decimals and printed without trailing
/// zeros (`1.5 KB`, `2 MB`). Zero yields `zero_label`.
pub fn format_bytes_with(bytes: u64, units: &[&str], zero_label: &str) -> String {
    if bytes == 0 || units.is_empty() {
        return zero_label.to_string();
    }

    // Integer search instead of `ln(b) / ln(1024)`, which misfires at exact
    // powers of 1024 because of float rounding.
    let mut index = 0usize;
    let mut divisor = 1u64;
    while index + 1 < units.len() {
        match divisor.checked_mul(STEP) {
            Some(next) if bytes >= next => {
                divisor = next;
                index += 1;
            }
            _ => break,
        }
    }

    let value = bytes as f64 / divisor as f64;
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, units[index])
}

/// `Bytes`/`KB`/`MB`/`GB`, `"0 Bytes"` for zero.
pub fn format_bytes(bytes: u64) -> String {
    format_bytes_with(bytes, UNITS_TO_GB, ZERO_BYTES)
}

/// Like [`format_bytes`] but for values the backend may omit: `"Unknown"`
/// for zero or absent.
pub fn format_size(bytes: Option<u64>) -> String {
    format_bytes_with(bytes.unwrap_or(0), UNITS_TO_GB, UNKNOWN)
}

/// `H:MM:SS` when the duration reaches an hour, `M:SS` otherwise.
/// Zero or absent yields `"Unknown"`.
pub fn format_duration(seconds: Option<u64>) -> String {
    let seconds = match seconds {
        Some(s) if s > 0 => s,
        _ => return UNKNOWN.to_string(),
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

static FILENAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^"]+)"?"#).expect("valid regex"));

/// Extract the `filename="..."` token of a `Content-Disposition` header.
///
/// Quotes are optional. Returns `None` when the token is missing or empty.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let caps = FILENAME_TOKEN.captures(header)?;
    let name = caps.get(1)?.as_str().trim().trim_end_matches(';').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Strip the last extension of a file name (`photo.large.png` → `photo.large`).
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() && !name[pos + 1..].contains('/') => {
            &name[..pos]
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_uses_sentinel() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_size(Some(0)), "Unknown");
        assert_eq!(format_size(None), "Unknown");
    }

    #[test]
    fn picks_unit_by_magnitude() {
        assert_eq!(format_bytes(1), "1 Bytes");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn rounds_to_two_decimals() {
        // 1234 / 1024 = 1.205078…
        assert_eq!(format_bytes(1234), "1.21 KB");
        // 5_000_000 / 1024² = 4.768…
        assert_eq!(format_bytes(5_000_000), "4.77 MB");
    }

    #[test]
    fn clamps_to_largest_unit() {
        let tb = 1024u64.pow(4);
        assert_eq!(format_bytes(tb), "1024 GB");
        assert_eq!(format_bytes_with(tb, UNITS_TO_MB, ZERO_BYTES), "1048576 MB");
    }

    #[test]
    fn magnitude_stays_below_step_except_last_unit() {
        for bytes in [1u64, 7, 1000, 1025, 99_999, 1 << 20, (1 << 30) - 1, 5 << 30] {
            let mut divisor = 1u64;
            let mut index = 0;
            while index + 1 < UNITS_TO_GB.len() && bytes >= divisor * 1024 {
                divisor *= 1024;
                index += 1;
            }
            let raw = bytes as f64 / divisor as f64;
            assert!(raw >= 1.0 && raw < 1024.0, "{bytes} → {raw}");
            assert!(format_bytes(bytes).ends_with(UNITS_TO_GB[index]));
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(None), "Unknown");
        assert_eq!(format_duration(Some(0)), "Unknown");
        assert_eq!(format_duration(Some(5)), "0:05");
        assert_eq!(format_duration(Some(185)), "3:05");
        assert_eq!(format_duration(Some(3600)), "1:00:00");
        assert_eq!(format_duration(Some(3725)), "1:02:05");
    }

    #[test]
    fn disposition_filename() {
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="clip.mp4""#).as_deref(),
            Some("clip.mp4")
        );
        assert_eq!(
            content_disposition_filename("attachment; filename=raw.mp4").as_deref(),
            Some("raw.mp4")
        );
        assert_eq!(content_disposition_filename("attachment"), None);
        assert_eq!(content_disposition_filename(r#"attachment; filename="""#), None);
    }

    #[test]
    fn stems() {
        assert_eq!(file_stem("photo.png"), "photo");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem("trailing."), "trailing.");
    }
}
