pub mod common_structs;

pub mod data_augmenters;
pub mod data_loaders;
pub mod data_transformers;
pub mod iterator_adapters;

use common_structs::Label;
use image::DynamicImage;

/// Where the visualizer gets its images from
pub trait ImageSource {
    fn load_image(&self, filename: &str) -> anyhow::Result<DynamicImage>;
}

/// Where the visualizer gets the ground truth labels of an image from
pub trait LabelSource {
    fn labels_for(&self, filename: &str) -> anyhow::Result<Vec<Label>>;
}
