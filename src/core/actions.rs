use crate::core::loader::frame_path;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Failed to delete {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} -> {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Deletes every listed frame from `data_dir`. Stops at the first failure.
pub fn remove_frames(
    delete: &BTreeMap<String, Vec<String>>,
    data_dir: &Path,
) -> Result<usize, ActionError> {
    let mut removed = 0;
    for (camera_id, filenames) in delete {
        for filename in filenames {
            let path = frame_path(data_dir, filename);
            fs::remove_file(&path).map_err(|source| ActionError::Remove {
                path: path.clone(),
                source,
            })?;
            log::debug!("[{}] Deleted {}", camera_id, path.display());
            removed += 1;
        }
    }

    log::info!("Deleted {} redundant frame(s) from {}", removed, data_dir.display());
    Ok(removed)
}

/// Copies frames from `data_dir` into `output_dir`, creating it first
pub fn copy_frames(
    filenames: &[String],
    data_dir: &Path,
    output_dir: &Path,
) -> Result<usize, ActionError> {
    fs::create_dir_all(output_dir).map_err(|source| ActionError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    for filename in filenames {
        let from = frame_path(data_dir, filename);
        let to = output_dir.join(filename);
        fs::copy(&from, &to).map_err(|source| ActionError::Copy {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        log::debug!("Copied {} -> {}", from.display(), to.display());
    }

    Ok(filenames.len())
}

/// One copy task per camera on a pool of `workers` threads
pub fn copy_frames_parallel(
    keep: &BTreeMap<String, Vec<String>>,
    data_dir: &Path,
    output_dir: &Path,
    workers: usize,
) -> Result<usize, ActionError> {
    fs::create_dir_all(output_dir).map_err(|source| ActionError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    let counts = pool.install(|| {
        keep.par_iter()
            .map(|(_, filenames)| copy_frames(filenames, data_dir, output_dir))
            .collect::<Result<Vec<usize>, ActionError>>()
    })?;

    let copied: usize = counts.iter().sum();
    log::info!("Copied {} unique frame(s) to {}", copied, output_dir.display());
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(camera, files)| {
                (
                    camera.to_string(),
                    files.iter().map(|f| f.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_remove_frames() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["c10-1.png", "c10-2.png", "c21-1.png"] {
            fs::write(dir.join(name), b"frame").unwrap();
        }

        let removed = remove_frames(&map(&[("c10", &["c10-1.png"][..]), ("c21", &["c21-1.png"][..])]), dir).unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.join("c10-1.png").exists());
        assert!(!dir.join("c21-1.png").exists());
        assert!(dir.join("c10-2.png").exists());
    }

    #[test]
    fn test_remove_missing_frame_fails() {
        let temp_dir = TempDir::new().unwrap();

        let result = remove_frames(&map(&[("c10", &["gone.png"][..])]), temp_dir.path());
        assert!(matches!(result, Err(ActionError::Remove { .. })));
    }

    #[test]
    fn test_copy_frames_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let output_dir = temp_dir.path().join("out").join("unique_images");
        fs::create_dir(&data_dir).unwrap();
        fs::write(data_dir.join("c10-1.png"), b"one").unwrap();
        fs::write(data_dir.join("c10-2.png"), b"two").unwrap();

        let files = vec!["c10-1.png".to_string(), "c10-2.png".to_string()];
        let copied = copy_frames(&files, &data_dir, &output_dir).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(output_dir.join("c10-2.png")).unwrap(), b"two");
        // originals stay in place
        assert!(data_dir.join("c10-1.png").exists());
    }

    #[test]
    fn test_copy_missing_frame_fails() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec!["gone.png".to_string()];

        let result = copy_frames(&files, temp_dir.path(), &temp_dir.path().join("out"));
        assert!(matches!(result, Err(ActionError::Copy { .. })));
    }

    #[test]
    fn test_copy_frames_parallel() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let output_dir = temp_dir.path().join("unique");
        fs::create_dir(&data_dir).unwrap();
        for name in ["c10-1.png", "c20-1.png", "c20-2.png"] {
            fs::write(data_dir.join(name), name.as_bytes()).unwrap();
        }

        let keep = map(&[
            ("c10", &["c10-1.png"][..]),
            ("c20", &["c20-1.png", "c20-2.png"][..]),
            ("c21", &[][..]),
        ]);
        let copied = copy_frames_parallel(&keep, &data_dir, &output_dir, 2).unwrap();

        assert_eq!(copied, 3);
        for name in ["c10-1.png", "c20-1.png", "c20-2.png"] {
            assert_eq!(fs::read(output_dir.join(name)).unwrap(), name.as_bytes());
        }
    }
}
