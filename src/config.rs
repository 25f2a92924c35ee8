use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::ssd::anchors::DEFAULT_ASPECT_RATIOS;
use crate::ssd::classes::ClassTable;

/// Dataset location and anchor parameters of the box visualizer.
/// Missing fields of a json config fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub data_path: PathBuf,
    /// Label csv, relative to `data_path`
    pub train_labels: String,
    pub classes: Vec<String>,
    /// Number of anchor scales between 0.2 and 0.9. Set to 4 to get the
    /// scales of the 4 layer SSD, which leaves pyramid index 4 without anchors.
    pub n_layers: usize,
    pub aspect_ratios: Vec<f32>,
}

impl Default for VizConfig {
    fn default() -> Self {
        VizConfig {
            data_path: PathBuf::from("dataset/udacity_driving_datasets"),
            train_labels: "labels_train.csv".to_string(),
            classes: ["background", "car", "truck", "pedestrian", "street light"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            // one layer per pyramid index
            n_layers: 5,
            aspect_ratios: DEFAULT_ASPECT_RATIOS.to_vec(),
        }
    }
}

impl VizConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<VizConfig> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Config file {} not found", path.display()))?;
        serde_json::from_reader(file)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn labels_csv_path(&self) -> PathBuf {
        self.data_path.join(&self.train_labels)
    }

    pub fn class_table(&self) -> ClassTable {
        ClassTable::new(self.classes.clone())
    }
}
