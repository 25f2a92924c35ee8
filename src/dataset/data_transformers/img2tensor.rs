use image::GrayImage;
use tch::Tensor;

/// [1, height, width] float tensor with values in [0, 1]
pub fn from_gray_img_to_tensor(img: &GrayImage) -> Tensor {
    let normalized: Vec<f32> = img.as_raw().iter().map(|&p| p as f32 / 255.).collect();
    Tensor::from_slice(&normalized).view([1, img.height() as i64, img.width() as i64])
}
