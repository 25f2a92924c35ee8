use serde::{Deserialize, Serialize};
use tch::Tensor;
/// Frequently used structs in the provided data loaders/augmenters

/// A ground truth object: box corners in pixels and its category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
    pub category: u32,
}

impl Label {
    /// Box part of the label, same layout as the anchor boxes
    pub fn bbox(&self) -> [f32; 4] {
        [self.xmin, self.xmax, self.ymin, self.ymax]
    }
}

/// An image paired with an augmented copy of itself, plus the image class
#[derive(Debug)]
pub struct SiameseSample {
    pub x: Tensor,
    pub xt: Tensor,
    pub label: i64,
}

/// A batch of siamese samples, stacked along dimension 0
#[derive(Debug)]
pub struct SiameseBatch {
    pub x: Tensor,
    pub xt: Tensor,
    pub labels: Tensor,
}

impl SiameseBatch {
    pub fn len(&self) -> usize {
        self.labels.size().first().copied().unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
