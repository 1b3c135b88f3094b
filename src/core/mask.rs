use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Border percentages blacked out before comparison, in `[left, top, right, bottom]` order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Mask {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Mask {
    pub const NONE: Mask = Mask {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Visible window `(x_min, y_min, x_max, y_max)` for an image of the given size.
    /// Pixels outside `[x_min, x_max) x [y_min, y_max)` are masked.
    pub fn window(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let edge = |pct: f64, len: u32| ((pct * len as f64 / 100.0).floor().max(0.0) as u32).min(len);

        let x_min = edge(self.left, width);
        let x_max = width - edge(self.right, width);
        let y_min = edge(self.top, height);
        let y_max = height - edge(self.bottom, height);
        (x_min, y_min, x_max, y_max)
    }
}

impl From<[f64; 4]> for Mask {
    fn from([left, top, right, bottom]: [f64; 4]) -> Self {
        Self::new(left, top, right, bottom)
    }
}

impl From<Mask> for [f64; 4] {
    fn from(mask: Mask) -> Self {
        [mask.left, mask.top, mask.right, mask.bottom]
    }
}

/// Camera id to mask lookup. Unknown cameras are never masked, since some
/// cameras change resolution between captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskTable {
    masks: BTreeMap<String, Mask>,
}

impl MaskTable {
    pub fn empty() -> Self {
        Self {
            masks: BTreeMap::new(),
        }
    }

    pub fn with_mask(mut self, camera_id: impl Into<String>, mask: Mask) -> Self {
        self.masks.insert(camera_id.into(), mask);
        self
    }

    pub fn resolve(&self, camera_id: &str) -> Mask {
        self.masks.get(camera_id).copied().unwrap_or(Mask::NONE)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl Default for MaskTable {
    // Timestamp overlays along the top edge of these cameras
    fn default() -> Self {
        Self::empty()
            .with_mask("c20", Mask::new(0.0, 29.0, 0.0, 0.0))
            .with_mask("c21", Mask::new(0.0, 30.0, 0.0, 0.0))
            .with_mask("c23", Mask::new(0.0, 32.0, 0.0, 0.0))
    }
}
