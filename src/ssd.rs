pub mod anchors;
pub mod classes;
pub mod figure;
mod helpers;
pub mod iou;
pub mod visualizer;
