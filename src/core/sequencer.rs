use crate::core::loader::frame_path;
use crate::core::mask::Mask;
use crate::core::partition::CameraPartition;
use crate::core::preprocess::Preprocessor;
use crate::core::scorer::{equalize, ChangeScorer, ScoreError};
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Frame not found or unreadable: {}", path.display())]
    FrameUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Scoring error: {0}")]
    Score(#[from] ScoreError),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Resolves frame filenames to decoded images
pub trait FrameSource: Sync {
    fn load(&self, filename: &str) -> Result<DynamicImage, CompareError>;
}

/// Frames stored as image files directly inside one directory
#[derive(Debug, Clone)]
pub struct DiskFrames {
    data_dir: PathBuf,
}

impl DiskFrames {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl FrameSource for DiskFrames {
    fn load(&self, filename: &str) -> Result<DynamicImage, CompareError> {
        let path = frame_path(&self.data_dir, filename);
        image::open(&path).map_err(|source| CompareError::FrameUnreadable { path, source })
    }
}

/// Progress of one compared pair, reported as soon as it is scored
#[derive(Debug, Clone)]
pub struct PairProgress {
    pub camera_id: String,
    pub pair_index: usize,
    pub total_pairs: usize,
    pub score: f64,
}

pub type ProgressCallback = Box<dyn Fn(PairProgress) + Send + Sync>;

/// Verdict for the earlier frame of a compared pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Delete,
    Keep,
}

/// Run-collapsing keep/delete rule carried across consecutive pairs.
///
/// A frame that differs from its successor is kept and arms `prev_frame_same`.
/// If the very next pair differs as well, that next frame is demoted to
/// delete and the flag is cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionState {
    prev_frame_same: bool,
}

impl DecisionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prev_frame_same(&self) -> bool {
        self.prev_frame_same
    }

    pub fn step(&mut self, score: f64, threshold: f64) -> Verdict {
        if score < threshold {
            return Verdict::Delete;
        }

        if self.prev_frame_same {
            self.prev_frame_same = false;
            return Verdict::Delete;
        }

        self.prev_frame_same = true;
        Verdict::Keep
    }
}

/// Walks consecutive pairs of `frames` in order, asking `score_pair(i)` for the
/// score of `(frames[i], frames[i + 1])`, and partitions every frame.
///
/// The last frame is classified on the final pair using the state the walk
/// had when it reached that pair. A lone frame is always kept.
pub fn walk_scores<F, E>(
    frames: &[String],
    threshold: f64,
    mut score_pair: F,
) -> Result<CameraPartition, E>
where
    F: FnMut(usize) -> Result<f64, E>,
{
    let mut partition = CameraPartition::default();
    let n = frames.len();

    if n == 1 {
        partition.keep.push(frames[0].clone());
        return Ok(partition);
    }

    let mut state = DecisionState::new();
    for i in 0..n.saturating_sub(1) {
        let entering_same = state.prev_frame_same();
        let score = score_pair(i)?;

        match state.step(score, threshold) {
            Verdict::Delete => partition.delete.push(frames[i].clone()),
            Verdict::Keep => partition.keep.push(frames[i].clone()),
        }

        if i + 2 == n {
            let last = frames[n - 1].clone();
            if entering_same {
                partition.delete.push(last);
            } else {
                partition.keep.push(last);
            }
        }
    }

    Ok(partition)
}

/// Scores one camera's frames pair by pair and applies the decision rule
pub struct CameraSequencer<'a> {
    preprocessor: &'a Preprocessor,
    scorer: &'a ChangeScorer,
    score_threshold: f64,
}

impl<'a> CameraSequencer<'a> {
    pub fn new(preprocessor: &'a Preprocessor, scorer: &'a ChangeScorer, score_threshold: f64) -> Self {
        Self {
            preprocessor,
            scorer,
            score_threshold,
        }
    }

    pub fn partition<S: FrameSource + ?Sized>(
        &self,
        camera_id: &str,
        frames: &[String],
        mask: Mask,
        source: &S,
        progress: Option<&ProgressCallback>,
    ) -> Result<CameraPartition, CompareError> {
        let total_pairs = frames.len().saturating_sub(1);
        // The successor of one pair is the predecessor of the next
        let mut carried: Option<GrayImage> = None;

        walk_scores(frames, self.score_threshold, |i| -> Result<f64, CompareError> {
            let prev = match carried.take() {
                Some(img) => img,
                None => self.preprocessor.preprocess(&source.load(&frames[i])?, mask),
            };
            let next = self.preprocessor.preprocess(&source.load(&frames[i + 1])?, mask);
            carried = Some(next.clone());

            let (prev, next) = equalize(prev, next);
            let score = self.scorer.score(&prev, &next)?.score;
            log::debug!(
                "[{}] {} -> {}: score {:.1}",
                camera_id,
                frames[i],
                frames[i + 1],
                score
            );

            if let Some(callback) = progress {
                callback(PairProgress {
                    camera_id: camera_id.to_string(),
                    pair_index: i,
                    total_pairs,
                    score,
                });
            }

            Ok(score)
        })
    }
}
