use crate::config::Settings;
use crate::core::mask::MaskTable;
use crate::core::partition::{CameraPartition, GlobalPartition};
use crate::core::preprocess::Preprocessor;
use crate::core::scorer::ChangeScorer;
use crate::core::sequencer::{CameraSequencer, CompareError, FrameSource, ProgressCallback};
use crate::core::FramesByCamera;
use rayon::prelude::*;

pub use crate::core::sequencer::PairProgress;

/// Runs one camera sequencer per camera on a bounded worker pool and merges
/// the results into a single partition.
pub struct Coordinator {
    preprocessor: Preprocessor,
    scorer: ChangeScorer,
    score_threshold: f64,
    masks: MaskTable,
    workers: usize,
    progress: Option<ProgressCallback>,
}

impl Coordinator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            preprocessor: Preprocessor::new(settings.blur_kernels.clone()),
            scorer: ChangeScorer::new(settings.min_contour_area),
            score_threshold: settings.score_threshold,
            masks: settings.masks.clone(),
            workers: settings.worker_count(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Partitions every camera. Any failing camera fails the whole run and no
    /// partial partition is returned.
    pub fn run<S: FrameSource>(
        &self,
        frames_by_camera: &FramesByCamera,
        source: &S,
    ) -> Result<GlobalPartition, CompareError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("framecull-worker-{i}"))
            .build()?;

        log::info!(
            "Start image comparison for {} camera(s) on {} worker(s)",
            frames_by_camera.len(),
            self.workers
        );

        let sequencer = CameraSequencer::new(&self.preprocessor, &self.scorer, self.score_threshold);
        let progress = self.progress.as_ref();

        let results: Vec<_> = pool.install(|| {
            frames_by_camera
                .par_iter()
                .map(|(camera_id, frames)| -> Result<(String, CameraPartition), CompareError> {
                    let mask = self.masks.resolve(camera_id);
                    log::debug!("Camera {} uses mask {:?}", camera_id, <[f64; 4]>::from(mask));

                    let partition = sequencer
                        .partition(camera_id, frames, mask, source, progress)
                        .inspect_err(|e| log::error!("Camera {} comparison failed: {}", camera_id, e))?;

                    log::info!(
                        "Camera {} comparison finished: {} keep, {} delete",
                        camera_id,
                        partition.keep.len(),
                        partition.delete.len()
                    );
                    Ok((camera_id.clone(), partition))
                })
                .collect::<Result<Vec<_>, CompareError>>()
        })?;

        Ok(results.into_iter().collect())
    }
}
