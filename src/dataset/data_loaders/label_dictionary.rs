use crate::dataset::common_structs::Label;
use crate::dataset::LabelSource;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Ground truth labels of a dataset, grouped by image filename.
///
/// Read from a csv with a header and rows of `frame,xmin,xmax,ymin,ymax,class_id`.
#[derive(Debug, Clone, Default)]
pub struct CsvLabelDictionary {
    labels: HashMap<String, Vec<Label>>,
}

#[derive(Debug, Deserialize)]
struct LabelRow {
    frame: String,
    xmin: f32,
    xmax: f32,
    ymin: f32,
    ymax: f32,
    class_id: u32,
}

impl From<LabelRow> for Label {
    fn from(row: LabelRow) -> Self {
        Label {
            xmin: row.xmin,
            xmax: row.xmax,
            ymin: row.ymin,
            ymax: row.ymax,
            category: row.class_id,
        }
    }
}

impl CsvLabelDictionary {
    pub fn from_path<P: AsRef<Path>>(csv_path: P) -> anyhow::Result<CsvLabelDictionary> {
        let csv_path = csv_path.as_ref();
        let file = File::open(csv_path)
            .with_context(|| format!("Label csv {} not found", csv_path.display()))?;
        CsvLabelDictionary::from_reader(file)
            .with_context(|| format!("Invalid label csv {}", csv_path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<CsvLabelDictionary> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut labels: HashMap<String, Vec<Label>> = HashMap::new();
        for row in csv_reader.deserialize::<LabelRow>() {
            // csv errors carry the line number
            let row: LabelRow = row.context("Bad label row")?;
            let filename = row.frame.clone();
            labels.entry(filename).or_default().push(Label::from(row));
        }
        Ok(CsvLabelDictionary { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelSource for CsvLabelDictionary {
    fn labels_for(&self, filename: &str) -> anyhow::Result<Vec<Label>> {
        self.labels.labels_for(filename)
    }
}

impl LabelSource for HashMap<String, Vec<Label>> {
    fn labels_for(&self, filename: &str) -> anyhow::Result<Vec<Label>> {
        self.get(filename)
            .cloned()
            .ok_or_else(|| anyhow!("No labels for image {}", filename))
    }
}
