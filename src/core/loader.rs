use crate::core::FramesByCamera;
use chrono::{DateTime, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Capture time pattern used by cameras that do not write Unix timestamps
pub const DATE_PATTERN: &str = "%Y_%m_%d__%H_%M_%S";

const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp", "gif"];

/// Length of the camera id prefix in a frame filename
const CAMERA_ID_LEN: usize = 3;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("No images found in the folder '{path}'")]
    EmptyDirectory { path: String },

    #[error("Filename is empty")]
    EmptyFilename,

    #[error("Unable to convert '{value}' into a valid date format")]
    InvalidTimestamp { value: String },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Resolves a frame filename against the data directory
pub fn frame_path(data_dir: &Path, filename: &str) -> PathBuf {
    data_dir.join(filename)
}

/// Camera id prefix of a frame filename (`c21-1616778760501.png` -> `c21`)
pub fn camera_id_from_filename(filename: &str) -> Result<&str, LoadError> {
    if filename.is_empty() {
        return Err(LoadError::EmptyFilename);
    }

    let end = filename
        .char_indices()
        .nth(CAMERA_ID_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(filename.len());
    Ok(&filename[..end])
}

/// Timestamp text of a frame filename: everything after the camera id and its
/// separator, up to the first dot
pub fn timestamp_from_filename(filename: &str) -> Result<&str, LoadError> {
    if filename.is_empty() {
        return Err(LoadError::EmptyFilename);
    }

    let rest = match filename.char_indices().nth(CAMERA_ID_LEN + 1) {
        Some((idx, _)) => &filename[idx..],
        None => "",
    };
    Ok(rest.split('.').next().unwrap_or(""))
}

/// Parses either a Unix timestamp in milliseconds or a `DATE_PATTERN` date.
/// Millisecond timestamps are interpreted as UTC.
pub fn parse_capture_time(value: &str) -> Result<NaiveDateTime, LoadError> {
    let invalid = || LoadError::InvalidTimestamp {
        value: value.to_string(),
    };

    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = value.parse().map_err(|_| invalid())?;
        return DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(invalid);
    }

    NaiveDateTime::parse_from_str(value, DATE_PATTERN).map_err(|_| invalid())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists the frames directly inside `data_dir`, grouped by camera id and
/// sorted by capture time (ties by filename).
pub fn load_frames(data_dir: &Path) -> Result<FramesByCamera, LoadError> {
    if !data_dir.exists() || !data_dir.is_dir() {
        return Err(LoadError::InvalidPath {
            path: data_dir.to_string_lossy().to_string(),
        });
    }

    let mut timed: Vec<(String, NaiveDateTime, String)> = Vec::new();
    for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        let camera_id = camera_id_from_filename(&filename)?.to_string();
        let captured_at = parse_capture_time(timestamp_from_filename(&filename)?)?;
        timed.push((camera_id, captured_at, filename));
    }

    if timed.is_empty() {
        return Err(LoadError::EmptyDirectory {
            path: data_dir.to_string_lossy().to_string(),
        });
    }

    timed.sort_by(|a, b| (&a.0, a.1, &a.2).cmp(&(&b.0, b.1, &b.2)));

    let mut frames_by_camera = FramesByCamera::new();
    for (camera_id, _, filename) in timed {
        frames_by_camera.entry(camera_id).or_default().push(filename);
    }

    for (camera_id, frames) in &frames_by_camera {
        log::debug!("Camera {}: {} frame(s)", camera_id, frames.len());
    }

    Ok(frames_by_camera)
}
