use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use anyhow::Context;
use clap::Parser;

use visionlab::config::VizConfig;
use visionlab::dataset::data_loaders::image_folder::ImageFolder;
use visionlab::dataset::data_loaders::label_dictionary::CsvLabelDictionary;
use visionlab::ssd::figure::PngViewer;
use visionlab::ssd::visualizer::{VizOutcome, VizRequest, Visualizer};

/// Visualize anchor boxes and ground truth labels
#[derive(Parser, Debug)]
#[command(name = "viz_boxes")]
struct Args {
    /// Image to visualize, relative to the dataset directory
    #[arg(long, default_value = "1479506174991516375.jpg")]
    image: String,
    /// Index of receptive field (0 to 4)
    #[arg(long, default_value_t = 0)]
    index: usize,
    /// Show grids
    #[arg(long = "show_grids")]
    show_grids: bool,
    /// Anchor indexes to draw: all batch indexes, then rows, cols and anchors
    #[arg(long = "maxiou_indexes", num_args = 0..)]
    maxiou_indexes: Option<Vec<usize>>,
    /// Show labels
    #[arg(long = "show_labels")]
    show_labels: bool,
    /// Json file overriding dataset paths, classes and anchor parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where the figure is written
    #[arg(long, default_value = "anchors.png")]
    output: PathBuf,
    /// TrueType font for the class captions
    #[arg(long)]
    font: Option<PathBuf>,
}

fn load_font(path: &Path) -> anyhow::Result<FontArc> {
    let data = std::fs::read(path)
        .with_context(|| format!("Error reading font {}", path.display()))?;
    FontArc::try_from_vec(data).with_context(|| format!("Invalid font {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    visionlab::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => VizConfig::from_json_file(path)?,
        None => VizConfig::default(),
    };
    let font = args.font.as_deref().map(load_font).transpose()?;

    let request = VizRequest {
        image: args.image,
        index: args.index,
        show_grids: args.show_grids,
        maxiou_indexes: args.maxiou_indexes,
        show_labels: args.show_labels,
    };
    let images = ImageFolder::new(&config.data_path);
    let mut viewer = PngViewer {
        out_path: args.output,
    };
    let mut visualizer = Visualizer::new(&config, font, &mut viewer);
    let outcome = visualizer.run(&request, &images, || {
        CsvLabelDictionary::from_path(config.labels_csv_path())
    })?;
    if outcome == VizOutcome::Skipped {
        log::debug!("Odd number of maxiou indexes, nothing to draw");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maxiou_indexes_take_any_number_of_values() {
        let args = Args::try_parse_from(["viz_boxes"]).unwrap();
        assert_eq!(args.maxiou_indexes, None);
        assert_eq!(args.index, 0);

        let args = Args::try_parse_from(["viz_boxes", "--maxiou_indexes"]).unwrap();
        assert_eq!(args.maxiou_indexes, Some(vec![]));

        let args = Args::try_parse_from([
            "viz_boxes",
            "--maxiou_indexes",
            "0",
            "0",
            "1",
            "2",
            "--index",
            "1",
        ])
        .unwrap();
        assert_eq!(args.maxiou_indexes, Some(vec![0, 0, 1, 2]));
        assert_eq!(args.index, 1);
    }

    #[test]
    fn flags_use_underscores() {
        let args = Args::try_parse_from([
            "viz_boxes",
            "--show_grids",
            "--show_labels",
            "--image",
            "a.jpg",
        ])
        .unwrap();
        assert!(args.show_grids);
        assert!(args.show_labels);
        assert_eq!(args.image, "a.jpg");
        assert_eq!(args.output, PathBuf::from("anchors.png"));
        assert!(Args::try_parse_from(["viz_boxes", "--show-grids"]).is_err());
    }
}
