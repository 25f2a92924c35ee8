use crate::ssd::anchors::AnchorBoxes;

fn area(bb: &[f32; 4]) -> f32 {
    (bb[1] - bb[0]).max(0.) * (bb[3] - bb[2]).max(0.)
}

/// Intersection over union of two (xmin, xmax, ymin, ymax) boxes
pub fn iou_bbs(bb1: &[f32; 4], bb2: &[f32; 4]) -> f32 {
    let i_xmin = bb1[0].max(bb2[0]);
    let i_xmax = bb1[1].min(bb2[1]);
    let i_ymin = bb1[2].max(bb2[2]);
    let i_ymax = bb1[3].min(bb2[3]);
    let i_area = (i_xmax - i_xmin).max(0.) * (i_ymax - i_ymin).max(0.);
    let union = area(bb1) + area(bb2) - i_area;
    if union <= 0. {
        0.
    } else {
        i_area / union
    }
}

/// IOU of every anchor against every ground truth box, `[n_anchors][n_gt]`
pub fn iou(anchors: &[[f32; 4]], gt_boxes: &[[f32; 4]]) -> Vec<Vec<f32>> {
    anchors
        .iter()
        .map(|anchor| gt_boxes.iter().map(|gt| iou_bbs(anchor, gt)).collect())
        .collect()
}

/// Best anchor for one ground truth box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxIou {
    /// (batch, row, col, anchor)
    pub index: [usize; 4],
    pub iou: f32,
}

/// Unravels a flat (batch, row, col, anchor) index
pub fn unravel_index(flat_index: usize, shape: [usize; 4]) -> [usize; 4] {
    let mut rest = flat_index;
    let mut index = [0; 4];
    for dim in (0..4).rev() {
        index[dim] = rest % shape[dim].max(1);
        rest /= shape[dim].max(1);
    }
    index
}

/// For each ground truth (column of `iou`), the anchor with highest overlap.
/// Ties go to the first anchor.
pub fn maxiou(iou: &[Vec<f32>], anchors_shape: [usize; 4]) -> Vec<MaxIou> {
    let n_gt = iou.first().map(|row| row.len()).unwrap_or(0);
    (0..n_gt)
        .filter_map(|gt| {
            let (flat_index, best) = iou
                .iter()
                .map(|row| row[gt])
                .enumerate()
                .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })?;
            Some(MaxIou {
                index: unravel_index(flat_index, anchors_shape),
                iou: best,
            })
        })
        .collect()
}

/// Shortcut over anchor boxes and labels' boxes
pub fn maxiou_for_anchors(anchors: &AnchorBoxes, gt_boxes: &[[f32; 4]]) -> Vec<MaxIou> {
    maxiou(&iou(anchors.flat(), gt_boxes), anchors.shape())
}
