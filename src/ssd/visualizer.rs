use crate::config::VizConfig;
use crate::dataset::common_structs::Label;
use crate::dataset::{ImageSource, LabelSource};
use crate::ssd::anchors::{feature_boxes, AnchorBoxes, FeatureShape, ImageShape};
use crate::ssd::classes::{box_color, named_color, ClassTable};
use crate::ssd::figure::{Figure, Viewer};
use crate::ssd::helpers::img_drawing::grid_lines;
use crate::ssd::iou::maxiou_for_anchors;
use ab_glyph::FontArc;
use anyhow::{anyhow, bail};
use image::{DynamicImage, GenericImageView, Rgba};
use log::info;

/// matplotlib's default line color
const GRID_COLOR: Rgba<u8> = Rgba([31, 119, 180, 255]);
const BOX_LINE_WIDTH: u32 = 2;

/// What to draw over one image
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VizRequest {
    pub image: String,
    pub index: usize,
    pub show_grids: bool,
    /// Flattened 4 x N list: batch indexes, then rows, cols and anchors
    pub maxiou_indexes: Option<Vec<usize>>,
    pub show_labels: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizOutcome {
    /// Odd number of maxiou indexes, nothing was drawn
    Skipped,
    Shown,
}

/// Reshapes the flattened index list into (batch, row, col, anchor) quadruples.
/// Returns None when the list has odd length.
pub fn parse_maxiou_indexes(flat: &[usize]) -> anyhow::Result<Option<Vec<[usize; 4]>>> {
    if flat.len() % 2 != 0 {
        return Ok(None);
    }
    if flat.len() % 4 != 0 {
        bail!(
            "Expected groups of 4 maxiou indexes (batch, row, col, anchor), got {}",
            flat.len()
        );
    }
    let n = flat.len() / 4;
    Ok(Some(
        (0..n)
            .map(|i| [flat[i], flat[n + i], flat[2 * n + i], flat[3 * n + i]])
            .collect(),
    ))
}

pub fn image_shape(image: &DynamicImage) -> ImageShape {
    let (width, height) = image.dimensions();
    ImageShape {
        height,
        width,
        channels: image.color().channel_count() as u32,
    }
}

/// Label minus anchor, per coordinate: (dxmin, dxmax, dymin, dymax)
pub fn deviation(label: &Label, anchor: &[f32; 4]) -> [f32; 4] {
    let bb = label.bbox();
    [
        bb[0] - anchor[0],
        bb[1] - anchor[1],
        bb[2] - anchor[2],
        bb[3] - anchor[3],
    ]
}

pub struct Visualizer<'a, V: Viewer> {
    pub n_layers: usize,
    pub aspect_ratios: Vec<f32>,
    pub classes: ClassTable,
    pub font: Option<FontArc>,
    pub viewer: &'a mut V,
}

impl<'a, V: Viewer> Visualizer<'a, V> {
    pub fn new(
        config: &VizConfig,
        font: Option<FontArc>,
        viewer: &'a mut V,
    ) -> Visualizer<'a, V> {
        Visualizer {
            n_layers: config.n_layers,
            aspect_ratios: config.aspect_ratios.clone(),
            classes: config.class_table(),
            font,
            viewer,
        }
    }

    /// Draws the grid and the anchors picked by `maxiou_indexes`.
    ///
    /// Without labels the figure is shown right away and None is returned.
    /// With labels each one gets a caption, its offset to the matched anchor is
    /// printed, and the figure is handed back so the labels can be drawn on top.
    #[allow(clippy::too_many_arguments)]
    pub fn show_anchors(
        &mut self,
        image: &DynamicImage,
        feature_shape: FeatureShape,
        anchors: &AnchorBoxes,
        maxiou_indexes: &[[usize; 4]],
        maxiou_per_gt: Option<&[f32]>,
        labels: Option<&[Label]>,
        show_grids: bool,
    ) -> anyhow::Result<Option<Figure>> {
        let mut figure = Figure::new(image, self.font.clone());
        if show_grids {
            let (width, height) = image.dimensions();
            let lines = grid_lines(width, height, feature_shape.height, feature_shape.width);
            for (start, end) in lines {
                figure.add_line(start, end, GRID_COLOR);
            }
        }

        for (index, &[batch, row, col, k]) in maxiou_indexes.iter().enumerate() {
            let anchor = anchors.get(batch, row, col, k).ok_or_else(|| {
                anyhow!(
                    "Anchor index {:?} outside of anchors shape {:?}",
                    [batch, row, col, k],
                    anchors.shape()
                )
            })?;
            figure.add_patch(anchor, named_color('y'), BOX_LINE_WIDTH);

            if let (Some(maxiou_per_gt), Some(labels)) = (maxiou_per_gt, labels) {
                let label = labels
                    .get(index)
                    .ok_or_else(|| anyhow!("No label for maxiou index {}", index))?;
                let iou = maxiou_per_gt
                    .get(index)
                    .copied()
                    .ok_or_else(|| anyhow!("No maxiou for maxiou index {}", index))?;
                let class_name = self.classes.index2class(label.category);
                let color = box_color(label.category);
                figure.add_caption(label.xmin, label.ymin, &class_name, color);
                let [dxmin, dxmax, dymin, dymax] = deviation(label, &anchor);
                println!(
                    "{} : {} {} {} {} {} {}",
                    index, label.category, iou, dxmin, dxmax, dymin, dymax
                );
            }
        }

        if labels.is_none() {
            self.viewer.show(&figure)?;
            return Ok(None);
        }
        Ok(Some(figure))
    }

    /// Draws the ground truth boxes in their class color and shows the figure
    pub fn show_labels(&mut self, mut figure: Figure, labels: &[Label]) -> anyhow::Result<()> {
        for label in labels {
            figure.add_patch(label.bbox(), box_color(label.category), BOX_LINE_WIDTH);
        }
        self.viewer.show(&figure)
    }

    fn feature_boxes(
        &self,
        image: &DynamicImage,
        index: usize,
    ) -> anyhow::Result<(FeatureShape, AnchorBoxes)> {
        feature_boxes(image_shape(image), index, self.n_layers, &self.aspect_ratios)
    }

    /// Runs one visualization. Labels are only loaded when they are needed.
    pub fn run<L, F>(
        &mut self,
        request: &VizRequest,
        images: &impl ImageSource,
        load_labels: F,
    ) -> anyhow::Result<VizOutcome>
    where
        L: LabelSource,
        F: FnOnce() -> anyhow::Result<L>,
    {
        if let Some(flat_indexes) = &request.maxiou_indexes {
            let maxiou_indexes = match parse_maxiou_indexes(flat_indexes)? {
                Some(indexes) => indexes,
                None => return Ok(VizOutcome::Skipped),
            };
            let image = images.load_image(&request.image)?;
            let (feature_shape, anchors) = self.feature_boxes(&image, request.index)?;
            self.show_anchors(
                &image,
                feature_shape,
                &anchors,
                &maxiou_indexes,
                None,
                None,
                request.show_grids,
            )?;
            return Ok(VizOutcome::Shown);
        }

        let image = images.load_image(&request.image)?;
        let (feature_shape, anchors) = self.feature_boxes(&image, request.index)?;
        if !request.show_labels {
            let show_grids = request.show_grids;
            self.show_anchors(&image, feature_shape, &anchors, &[], None, None, show_grids)?;
            return Ok(VizOutcome::Shown);
        }

        let labels = load_labels()?.labels_for(&request.image)?;
        let gt_boxes: Vec<[f32; 4]> = labels.iter().map(Label::bbox).collect();
        info!("GT labels shape {:?}", [labels.len(), 5]);
        info!("GT boxes shape {:?}", [gt_boxes.len(), 4]);
        info!(
            "Complete proposed anchors shape {:?}",
            [anchors.shape().to_vec(), vec![4]].concat()
        );
        info!("Proposed anchors shape {:?}", anchors.shape());

        info!("IOU shape: {:?}", [anchors.flat().len(), gt_boxes.len()]);
        let matches = maxiou_for_anchors(&anchors, &gt_boxes);
        let maxiou_indexes: Vec<[usize; 4]> = matches.iter().map(|m| m.index).collect();
        let maxiou_per_gt: Vec<f32> = matches.iter().map(|m| m.iou).collect();

        let figure = self.show_anchors(
            &image,
            feature_shape,
            &anchors,
            &maxiou_indexes,
            Some(&maxiou_per_gt),
            Some(&labels),
            false,
        )?;
        match figure {
            Some(figure) => self.show_labels(figure, &labels)?,
            None => bail!("Figure was shown before the labels were drawn"),
        }
        Ok(VizOutcome::Shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssd::figure::tests::RecordingViewer;
    use image::RgbaImage;
    use std::collections::HashMap;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    struct InMemoryImages(HashMap<String, DynamicImage>);

    impl ImageSource for InMemoryImages {
        fn load_image(&self, filename: &str) -> anyhow::Result<DynamicImage> {
            self.0
                .get(filename)
                .cloned()
                .ok_or_else(|| anyhow!("no image {}", filename))
        }
    }

    fn sample_images() -> InMemoryImages {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, BLACK));
        InMemoryImages(vec![("sample.jpg".to_string(), img)].into_iter().collect())
    }

    fn no_labels() -> anyhow::Result<HashMap<String, Vec<Label>>> {
        panic!("labels should not be loaded")
    }

    fn request(index: usize) -> VizRequest {
        VizRequest {
            image: "sample.jpg".to_string(),
            index,
            ..Default::default()
        }
    }

    #[test]
    fn grids_without_boxes() {
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            show_grids: true,
            ..request(0)
        };
        let outcome = viz.run(&req, &sample_images(), no_labels).unwrap();
        assert_eq!(outcome, VizOutcome::Shown);

        assert_eq!(viewer.shown.len(), 1);
        let (canvas, lines, patches, captions) = &viewer.shown[0];
        // 64 >> 4 = 4 rows and 4 cols of 16 pixels
        assert_eq!(*lines, 8);
        assert_eq!(*patches, 0);
        assert_eq!(*captions, 0);
        assert_eq!(canvas.get_pixel(5, 16), &GRID_COLOR);
        assert_eq!(canvas.get_pixel(32, 5), &GRID_COLOR);
        assert_eq!(canvas.get_pixel(5, 8), &BLACK);
        assert!(canvas.pixels().all(|p| *p != named_color('y')));
    }

    #[test]
    fn odd_index_list_does_nothing() {
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            image: "missing.jpg".to_string(),
            maxiou_indexes: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        let outcome = viz.run(&req, &sample_images(), no_labels).unwrap();
        assert_eq!(outcome, VizOutcome::Skipped);
        assert!(viewer.shown.is_empty());
    }

    #[test]
    fn index_list_must_come_in_fours() {
        assert!(parse_maxiou_indexes(&[0, 1, 2, 3, 4, 5]).is_err());
        assert_eq!(
            parse_maxiou_indexes(&[0, 0, 1, 2, 0, 3, 0, 1]).unwrap(),
            Some(vec![[0, 1, 0, 0], [0, 2, 3, 1]])
        );
    }

    #[test]
    fn requested_anchors_are_drawn() {
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            maxiou_indexes: Some(vec![0, 0, 1, 2, 0, 3, 0, 1]),
            ..request(0)
        };
        viz.run(&req, &sample_images(), no_labels).unwrap();
        let (canvas, lines, patches, _) = &viewer.shown[0];
        assert_eq!(*lines, 0);
        assert_eq!(*patches, 2);
        assert!(canvas.pixels().any(|p| *p == named_color('y')));
    }

    #[test]
    fn anchor_outside_grid_is_an_error() {
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            maxiou_indexes: Some(vec![0, 9, 0, 0]),
            ..request(0)
        };
        assert!(viz.run(&req, &sample_images(), no_labels).is_err());
        assert!(viewer.shown.is_empty());
    }

    #[test]
    fn labels_are_matched_and_drawn() {
        let (_, anchors) = feature_boxes(
            ImageShape {
                height: 64,
                width: 64,
                channels: 4,
            },
            0,
            5,
            &VizConfig::default().aspect_ratios,
        )
        .unwrap();
        let anchor = anchors.get(0, 1, 2, 0).unwrap();
        let label = Label {
            xmin: anchor[0] + 1.,
            xmax: anchor[1],
            ymin: anchor[2],
            ymax: anchor[3] - 1.,
            category: 2,
        };
        let offsets = deviation(&label, &anchor);
        for (offset, expected) in offsets.iter().zip([1., 0., 0., -1.].iter()) {
            assert!((offset - expected).abs() < 1e-4, "{:?}", offsets);
        }

        let labels: HashMap<String, Vec<Label>> =
            vec![("sample.jpg".to_string(), vec![label])].into_iter().collect();
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            show_labels: true,
            ..request(0)
        };
        viz.run(&req, &sample_images(), || Ok(labels)).unwrap();

        assert_eq!(viewer.shown.len(), 1);
        let (canvas, lines, patches, captions) = &viewer.shown[0];
        assert_eq!(*lines, 0);
        // matched anchor plus the label itself
        assert_eq!(*patches, 2);
        assert_eq!(*captions, 1);
        assert!(canvas.pixels().any(|p| *p == box_color(2)));
    }

    #[test]
    fn missing_labels_are_an_error() {
        let labels: HashMap<String, Vec<Label>> = HashMap::new();
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let req = VizRequest {
            show_labels: true,
            ..request(0)
        };
        assert!(viz.run(&req, &sample_images(), || Ok(labels)).is_err());
        assert!(viewer.shown.is_empty());
    }

    #[test]
    fn show_anchors_returns_figure_when_labels_are_given() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, BLACK));
        let (feature_shape, anchors) =
            feature_boxes(image_shape(&image), 0, 5, &[1., 2., 0.5]).unwrap();
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let figure = viz
            .show_anchors(&image, feature_shape, &anchors, &[], Some(&[]), Some(&[]), false)
            .unwrap();
        assert!(figure.is_some());
        assert!(viewer.shown.is_empty());
    }

    #[test]
    fn label_without_maxiou_is_an_error() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, BLACK));
        let (feature_shape, anchors) =
            feature_boxes(image_shape(&image), 0, 5, &[1., 2., 0.5]).unwrap();
        let label = Label {
            xmin: 0.,
            xmax: 10.,
            ymin: 0.,
            ymax: 10.,
            category: 1,
        };
        let mut viewer = RecordingViewer::default();
        let mut viz = Visualizer::new(&VizConfig::default(), None, &mut viewer);
        let result = viz.show_anchors(
            &image,
            feature_shape,
            &anchors,
            &[[0, 0, 0, 0]],
            Some(&[]),
            Some(&[label]),
            false,
        );
        assert!(result.is_err());
        assert!(viewer.shown.is_empty());
    }
}
