use crate::dataset::ImageSource;
use anyhow::Context;
use image::DynamicImage;
use std::path::PathBuf;

/// Loads images by filename from a single directory
pub struct ImageFolder {
    data_dir: PathBuf,
}

impl ImageFolder {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> ImageFolder {
        ImageFolder {
            data_dir: data_dir.into(),
        }
    }
}

impl ImageSource for ImageFolder {
    fn load_image(&self, filename: &str) -> anyhow::Result<DynamicImage> {
        let path = self.data_dir.join(filename);
        image::open(&path).with_context(|| format!("Error loading image {}", path.display()))
    }
}
