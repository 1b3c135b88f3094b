use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Delete/keep split of one camera's frames, both in capture order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPartition {
    pub delete: Vec<String>,
    pub keep: Vec<String>,
}

impl CameraPartition {
    pub fn len(&self) -> usize {
        self.delete.len() + self.keep.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.keep.is_empty()
    }
}

/// Every camera's partition, keyed by camera id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalPartition {
    cameras: BTreeMap<String, CameraPartition>,
}

impl GlobalPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera ids are disjoint across sequencer tasks, so this never overwrites.
    pub fn insert(&mut self, camera_id: String, partition: CameraPartition) {
        let previous = self.cameras.insert(camera_id, partition);
        debug_assert!(previous.is_none(), "camera partitioned twice");
    }

    pub fn get(&self, camera_id: &str) -> Option<&CameraPartition> {
        self.cameras.get(camera_id)
    }

    pub fn cameras(&self) -> impl Iterator<Item = (&String, &CameraPartition)> {
        self.cameras.iter()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Camera id -> filenames judged redundant
    pub fn delete_map(&self) -> BTreeMap<String, Vec<String>> {
        self.cameras
            .iter()
            .map(|(id, p)| (id.clone(), p.delete.clone()))
            .collect()
    }

    /// Camera id -> filenames judged distinct
    pub fn keep_map(&self) -> BTreeMap<String, Vec<String>> {
        self.cameras
            .iter()
            .map(|(id, p)| (id.clone(), p.keep.clone()))
            .collect()
    }

    pub fn total_delete(&self) -> usize {
        self.cameras.values().map(|p| p.delete.len()).sum()
    }

    pub fn total_keep(&self) -> usize {
        self.cameras.values().map(|p| p.keep.len()).sum()
    }
}

impl FromIterator<(String, CameraPartition)> for GlobalPartition {
    fn from_iter<T: IntoIterator<Item = (String, CameraPartition)>>(iter: T) -> Self {
        let mut global = GlobalPartition::new();
        for (camera_id, partition) in iter {
            global.insert(camera_id, partition);
        }
        global
    }
}
