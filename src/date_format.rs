//! Date/time formatting for file names.
//!
//! Resolves a timestamp for a file from one of three sources (filesystem
//! creation time, filesystem modification time, or the EXIF capture time of
//! an image) and renders it with a strftime-style format string.
//!
//! # Examples
//!
//! ```
//! use bulk_rename::date_format::validate_format;
//!
//! assert!(validate_format("%Y%m%d").is_ok());
//! assert!(validate_format("%Q").is_err());
//! ```

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::BufReader;
use std::path::Path;

use crate::error::RenameError;
use crate::scanner::FileEntry;

/// EXIF timestamps are stored as `YYYY:MM:DD HH:MM:SS`.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Where the timestamp for a file comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    #[default]
    Creation,
    Modification,
    Exif,
}

impl std::str::FromStr for DateSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creation" | "created" => Ok(Self::Creation),
            "modification" | "modified" => Ok(Self::Modification),
            "exif" => Ok(Self::Exif),
            other => Err(format!(
                "unknown date source '{}' (expected creation, modification or exif)",
                other
            )),
        }
    }
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation => write!(f, "creation"),
            Self::Modification => write!(f, "modification"),
            Self::Exif => write!(f, "exif"),
        }
    }
}

/// A rendered date together with the source it was actually read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDate {
    pub text: String,
    /// The source that produced `text`.
    pub used: DateSource,
    /// True when the requested source was unavailable and modification
    /// time was substituted.
    pub fallback: bool,
}

/// Failure to produce a date for one file.
#[derive(Debug)]
pub enum DateError {
    /// The format specifier itself is malformed.
    Format(RenameError),
    /// The file's metadata could not be read.
    Unreadable(std::io::Error),
}

impl std::fmt::Display for DateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(e) => write!(f, "{}", e),
            Self::Unreadable(e) => write!(f, "cannot read file metadata: {}", e),
        }
    }
}

impl std::error::Error for DateError {}

/// Checks that `format` is a usable strftime specifier.
///
/// # Errors
///
/// Returns `RenameError::Format` for an empty format or one containing
/// unknown or incomplete `%` codes.
pub fn validate_format(format: &str) -> Result<(), RenameError> {
    if format.is_empty() {
        return Err(RenameError::Format {
            format: format.to_string(),
            reason: "format cannot be empty".to_string(),
        });
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(RenameError::Format {
            format: format.to_string(),
            reason: "unknown or incomplete % specifier".to_string(),
        });
    }
    Ok(())
}

/// Formats a local timestamp, failing instead of panicking on a bad format.
pub fn render(datetime: &DateTime<Local>, format: &str) -> Result<String, RenameError> {
    render_naive(&datetime.naive_local(), format)
}

fn render_naive(datetime: &NaiveDateTime, format: &str) -> Result<String, RenameError> {
    validate_format(format)?;
    let mut out = String::new();
    write!(out, "{}", datetime.format_with_items(StrftimeItems::new(format))).map_err(|_| {
        RenameError::Format {
            format: format.to_string(),
            reason: "specifier cannot be rendered for this timestamp".to_string(),
        }
    })?;
    Ok(out)
}

/// Formats the timestamp of `entry` taken from `source`.
///
/// For [`DateSource::Exif`], non-image files and images without a capture
/// timestamp fall back to the modification time; the same happens when the
/// platform does not record creation times. The fallback is reported in
/// [`FormattedDate::fallback`], never as an error.
///
/// # Errors
///
/// `DateError::Format` if the format is malformed, `DateError::Unreadable`
/// if the file's metadata cannot be read at all.
pub fn format_date(
    entry: &FileEntry,
    source: DateSource,
    format: &str,
) -> Result<FormattedDate, DateError> {
    validate_format(format).map_err(DateError::Format)?;
    let path = &entry.original_path;

    match source {
        DateSource::Creation => {
            let metadata = fs::metadata(path).map_err(DateError::Unreadable)?;
            match metadata.created() {
                Ok(created) => {
                    let text = render(&DateTime::<Local>::from(created), format)
                        .map_err(DateError::Format)?;
                    Ok(FormattedDate {
                        text,
                        used: DateSource::Creation,
                        fallback: false,
                    })
                }
                Err(e) => {
                    log::debug!(
                        "Creation time unavailable for {} ({}), using modification time",
                        path.display(),
                        e
                    );
                    modification_date(path, format, true)
                }
            }
        }
        DateSource::Modification => modification_date(path, format, false),
        DateSource::Exif => match read_exif_datetime(path) {
            Some(captured) => {
                let text = render_naive(&captured, format).map_err(DateError::Format)?;
                Ok(FormattedDate {
                    text,
                    used: DateSource::Exif,
                    fallback: false,
                })
            }
            None => {
                log::debug!(
                    "No EXIF capture time in {}, using modification time",
                    path.display()
                );
                modification_date(path, format, true)
            }
        },
    }
}

fn modification_date(
    path: &Path,
    format: &str,
    fallback: bool,
) -> Result<FormattedDate, DateError> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(DateError::Unreadable)?;
    let text = render(&DateTime::<Local>::from(modified), format).map_err(DateError::Format)?;
    Ok(FormattedDate {
        text,
        used: DateSource::Modification,
        fallback,
    })
}

/// Reads the capture time of an image, preferring `DateTimeOriginal`.
///
/// Returns `None` for anything that is not detected as an image or has no
/// parseable timestamp.
pub fn read_exif_datetime(path: &Path) -> Option<NaiveDateTime> {
    let kind = infer::get_from_path(path).ok()??;
    if kind.matcher_type() != infer::MatcherType::Image {
        return None;
    }

    let file = fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    [Tag::DateTimeOriginal, Tag::DateTime]
        .iter()
        .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .find_map(|field| match &field.value {
            Value::Ascii(values) => values
                .first()
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .and_then(parse_exif_datetime),
            _ => None,
        })
}

fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_matches('"').trim_end_matches('\0');
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn file_with_mtime(dir: &Path, name: &str, content: &[u8]) -> FileEntry {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write file");
        let when: SystemTime = Local
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .single()
            .expect("Unambiguous local time")
            .into();
        fs::File::options()
            .write(true)
            .open(&path)
            .expect("Failed to open file")
            .set_modified(when)
            .expect("Failed to set mtime");
        FileEntry::from_path(&path)
    }

    /// Appends one ASCII IFD entry, storing its text in `data`.
    fn push_ascii(ifd: &mut Vec<u8>, data: &mut Vec<u8>, data_start: usize, tag: u16, text: &str) {
        let offset = (data_start + data.len()) as u32;
        ifd.extend_from_slice(&tag.to_be_bytes());
        ifd.extend_from_slice(&2u16.to_be_bytes());
        ifd.extend_from_slice(&(text.len() as u32 + 1).to_be_bytes());
        ifd.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(text.as_bytes());
        data.push(0);
    }

    /// Minimal JPEG with a big-endian EXIF block holding `DateTime` in IFD0
    /// and, optionally, `DateTimeOriginal` in the Exif sub-IFD.
    fn exif_jpeg(date_time: &str, date_time_original: Option<&str>) -> Vec<u8> {
        let ifd0_count: usize = if date_time_original.is_some() { 2 } else { 1 };
        let ifd0_start = 8;
        let exif_ifd_start = ifd0_start + 2 + 12 * ifd0_count + 4;
        let data_start = if date_time_original.is_some() {
            exif_ifd_start + 2 + 12 + 4
        } else {
            exif_ifd_start
        };

        let mut data = Vec::new();
        let mut ifd0 = (ifd0_count as u16).to_be_bytes().to_vec();
        push_ascii(&mut ifd0, &mut data, data_start, 0x0132, date_time);
        if date_time_original.is_some() {
            ifd0.extend_from_slice(&0x8769u16.to_be_bytes());
            ifd0.extend_from_slice(&4u16.to_be_bytes());
            ifd0.extend_from_slice(&1u32.to_be_bytes());
            ifd0.extend_from_slice(&(exif_ifd_start as u32).to_be_bytes());
        }
        ifd0.extend_from_slice(&0u32.to_be_bytes());

        let mut exif_ifd = Vec::new();
        if let Some(original) = date_time_original {
            exif_ifd.extend_from_slice(&1u16.to_be_bytes());
            push_ascii(&mut exif_ifd, &mut data, data_start, 0x9003, original);
            exif_ifd.extend_from_slice(&0u32.to_be_bytes());
        }

        let mut tiff = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&ifd0);
        tiff.extend_from_slice(&exif_ifd);
        tiff.extend_from_slice(&data);

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn test_validate_format() {
        assert!(validate_format("%Y-%m-%d").is_ok());
        assert!(validate_format("%Y%m%d_%H%M%S").is_ok());
        assert!(validate_format("").is_err());
        assert!(validate_format("%Y-%").is_err());
    }

    #[test]
    fn test_modification_date_renders_format() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = file_with_mtime(temp_dir.path(), "photo.jpg", b"not really a jpeg");

        let date = format_date(&entry, DateSource::Modification, "%Y%m%d").expect("Format failed");
        assert_eq!(date.text, "20240115");
        assert_eq!(date.used, DateSource::Modification);
        assert!(!date.fallback);
    }

    #[test]
    fn test_exif_on_non_image_falls_back_to_modification() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = file_with_mtime(temp_dir.path(), "notes.txt", b"plain text");

        let date = format_date(&entry, DateSource::Exif, "%Y-%m-%d").expect("Format failed");
        assert_eq!(date.text, "2024-01-15");
        assert_eq!(date.used, DateSource::Modification);
        assert!(date.fallback);
    }

    #[test]
    fn test_exif_capture_time_is_used() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let jpeg = exif_jpeg("2023:07:04 18:22:05", None);
        let entry = file_with_mtime(temp_dir.path(), "shot.jpg", &jpeg);

        let date = format_date(&entry, DateSource::Exif, "%Y%m%d").expect("Format failed");
        assert_eq!(date.text, "20230704");
        assert_eq!(date.used, DateSource::Exif);
        assert!(!date.fallback);
    }

    #[test]
    fn test_exif_prefers_date_time_original() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let jpeg = exif_jpeg("2020:01:01 00:00:00", Some("2023:07:04 18:22:05"));
        let entry = file_with_mtime(temp_dir.path(), "edited.jpg", &jpeg);

        let captured = read_exif_datetime(&entry.original_path).expect("Should read EXIF");
        assert_eq!(captured.format("%Y%m%d").to_string(), "20230704");

        let date = format_date(&entry, DateSource::Exif, "%Y-%m-%d").expect("Format failed");
        assert_eq!(date.text, "2023-07-04");
        assert!(!date.fallback);
    }

    #[test]
    fn test_exif_on_image_without_metadata_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let jpeg = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00,
            0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
        ];
        let entry = file_with_mtime(temp_dir.path(), "bare.jpg", &jpeg);

        let date = format_date(&entry, DateSource::Exif, "%Y").expect("Format failed");
        assert_eq!(date.text, "2024");
        assert!(date.fallback);
    }

    #[test]
    fn test_bad_format_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let entry = file_with_mtime(temp_dir.path(), "a.txt", b"a");

        let result = format_date(&entry, DateSource::Modification, "%Y-%");
        assert!(matches!(result, Err(DateError::Format(_))));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let entry = FileEntry::from_path(Path::new("/definitely/not/here.jpg"));
        let result = format_date(&entry, DateSource::Modification, "%Y");
        assert!(matches!(result, Err(DateError::Unreadable(_))));
    }

    #[test]
    fn test_parse_exif_datetime() {
        let parsed = parse_exif_datetime("2023:07:04 18:22:05").expect("Should parse");
        assert_eq!(parsed.format("%Y%m%d%H%M%S").to_string(), "20230704182205");
        assert!(parse_exif_datetime("yesterday").is_none());
    }

    #[test]
    fn test_date_source_from_str() {
        assert_eq!("Modified".parse::<DateSource>(), Ok(DateSource::Modification));
        assert!("ctime".parse::<DateSource>().is_err());
    }
}
