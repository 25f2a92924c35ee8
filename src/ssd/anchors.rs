use anyhow::{bail, ensure};
use itertools::iproduct;

/// Each pyramid level divides the image by 2^shift
pub const FEATURE_SHIFTS: [u32; 5] = [4, 5, 6, 7, 8];

pub const DEFAULT_ASPECT_RATIOS: [f32; 3] = [1., 2., 0.5];

/// (height, width, channels) of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

/// (batch, height, width, channels) of a feature map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureShape {
    pub batch: u32,
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

/// Anchor boxes for every cell of a feature map, indexed by (batch, row, col, anchor).
/// The batch dimension is always 1.
///
/// Boxes are (xmin, xmax, ymin, ymax) in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorBoxes {
    pub feature_height: usize,
    pub feature_width: usize,
    pub boxes_per_cell: usize,
    boxes: Vec<[f32; 4]>,
}

impl AnchorBoxes {
    /// (batch, row, col, anchor)
    pub fn shape(&self) -> [usize; 4] {
        [1, self.feature_height, self.feature_width, self.boxes_per_cell]
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// All boxes in (batch, row, col, anchor) order
    pub fn flat(&self) -> &[[f32; 4]] {
        &self.boxes
    }

    pub fn get(&self, batch: usize, row: usize, col: usize, anchor: usize) -> Option<[f32; 4]> {
        if batch != 0
            || row >= self.feature_height
            || col >= self.feature_width
            || anchor >= self.boxes_per_cell
        {
            return None;
        }
        let flat_index = (row * self.feature_width + col) * self.boxes_per_cell + anchor;
        self.boxes.get(flat_index).copied()
    }
}

/// Anchor scales per layer: the size of the square box and of the extra, larger box
pub fn anchor_sizes(n_layers: usize) -> Vec<(f32, f32)> {
    let scales = linspace(0.2, 0.9, n_layers + 1);
    scales
        .windows(2)
        .map(|pair| (pair[0], (pair[0] * pair[1]).sqrt()))
        .collect()
}

fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f32;
            (0..n).map(|i| start + step * i as f32).collect()
        }
    }
}

/// (center_x, center_y, width, height) to (xmin, xmax, ymin, ymax)
pub fn centroid2minmax(centroid: [f32; 4]) -> [f32; 4] {
    let [cx, cy, w, h] = centroid;
    [cx - 0.5 * w, cx + 0.5 * w, cy - 0.5 * h, cy + 0.5 * h]
}

pub fn anchor_boxes(
    feature_shape: FeatureShape,
    image_shape: ImageShape,
    index: usize,
    n_layers: usize,
    aspect_ratios: &[f32],
) -> anyhow::Result<AnchorBoxes> {
    let sizes = anchor_sizes(n_layers);
    let (small, large) = match sizes.get(index) {
        Some(size) => *size,
        None => bail!("Layer index {} out of range for {} layers", index, n_layers),
    };
    ensure!(
        feature_shape.height > 0 && feature_shape.width > 0,
        "Empty feature map {:?}",
        feature_shape
    );
    ensure!(
        aspect_ratios.iter().all(|ar| *ar > 0.),
        "Aspect ratios must be positive: {:?}",
        aspect_ratios
    );

    let image_height = image_shape.height as f32;
    let image_width = image_shape.width as f32;
    let norm_height = image_height * small;
    let norm_width = image_width * small;
    let mut width_height: Vec<(f32, f32)> = aspect_ratios
        .iter()
        .map(|ar| (norm_width * ar.sqrt(), norm_height / ar.sqrt()))
        .collect();
    width_height.push((image_width * large, image_height * large));

    let feature_height = feature_shape.height as usize;
    let feature_width = feature_shape.width as usize;
    let grid_height = image_height / feature_height as f32;
    let grid_width = image_width / feature_width as f32;

    let boxes = iproduct!(0..feature_height, 0..feature_width, width_height.iter())
        .map(|(row, col, &(w, h))| {
            let cx = (col as f32 + 0.5) * grid_width;
            let cy = (row as f32 + 0.5) * grid_height;
            centroid2minmax([cx, cy, w, h])
        })
        .collect();

    Ok(AnchorBoxes {
        feature_height,
        feature_width,
        boxes_per_cell: width_height.len(),
        boxes,
    })
}

/// Feature map of pyramid level `index` and its anchor boxes
pub fn feature_boxes(
    image_shape: ImageShape,
    index: usize,
    n_layers: usize,
    aspect_ratios: &[f32],
) -> anyhow::Result<(FeatureShape, AnchorBoxes)> {
    let shift = match FEATURE_SHIFTS.get(index) {
        Some(shift) => *shift,
        None => bail!(
            "Pyramid index {} out of range (0 to {})",
            index,
            FEATURE_SHIFTS.len() - 1
        ),
    };
    let feature_shape = FeatureShape {
        batch: 1,
        height: image_shape.height >> shift,
        width: image_shape.width >> shift,
        channels: image_shape.channels,
    };
    ensure!(
        feature_shape.height > 0 && feature_shape.width > 0,
        "Image {}x{} is too small for pyramid index {}",
        image_shape.width,
        image_shape.height,
        index
    );
    let boxes = anchor_boxes(feature_shape, image_shape, index, n_layers, aspect_ratios)?;
    Ok((feature_shape, boxes))
}
