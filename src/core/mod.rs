// Duplicate frame detection pipeline
// - mask: per-camera border masks
// - preprocess: grayscale, blur cascade, masking
// - scorer: contour-based change score between two frames
// - sequencer: keep/delete walk over one camera's frames
// - coordinator: one sequencer per camera on a worker pool
// - loader / actions: directory discovery and file side effects

pub mod actions;
pub mod coordinator;
pub mod loader;
pub mod mask;
pub mod partition;
pub mod preprocess;
pub mod scorer;
pub mod sequencer;

use std::collections::BTreeMap;

/// Filenames grouped by camera id, each list sorted by capture time.
pub type FramesByCamera = BTreeMap<String, Vec<String>>;
