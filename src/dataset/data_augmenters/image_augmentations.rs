use anyhow::anyhow;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use rand::Rng;

/// Random rotation, shear and translation about the image center.
///
/// Angles are in degrees, translation is a fraction of the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomAffine {
    pub degrees: (f32, f32),
    /// (x_min, x_max, y_min, y_max)
    pub shear: (f32, f32, f32, f32),
    pub translate: (f32, f32),
}

impl Default for RandomAffine {
    // rotate up to 5 degrees, shear by 10 in both axes, shift up to 20%
    fn default() -> Self {
        RandomAffine {
            degrees: (-5., 5.),
            shear: (10., 10., 10., 10.),
            translate: (0.2, 0.2),
        }
    }
}

/// One draw of a RandomAffine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    pub angle: f32,
    pub shear_x: f32,
    pub shear_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

fn uniform<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if min < max {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

impl RandomAffine {
    pub fn sample_params<R: Rng>(&self, width: u32, height: u32, rng: &mut R) -> AffineParams {
        let max_dx = self.translate.0 * width as f32;
        let max_dy = self.translate.1 * height as f32;
        AffineParams {
            angle: uniform(rng, self.degrees.0, self.degrees.1),
            shear_x: uniform(rng, self.shear.0, self.shear.1),
            shear_y: uniform(rng, self.shear.2, self.shear.3),
            translate_x: uniform(rng, -max_dx, max_dx).round(),
            translate_y: uniform(rng, -max_dy, max_dy).round(),
        }
    }

    pub fn apply<R: Rng>(&self, img: &GrayImage, rng: &mut R) -> anyhow::Result<GrayImage> {
        let params = self.sample_params(img.width(), img.height(), rng);
        affine_transform(img, &params)
    }
}

/// Warps the image with nearest neighbour sampling, uncovered pixels are black
pub fn affine_transform(img: &GrayImage, params: &AffineParams) -> anyhow::Result<GrayImage> {
    let center_x = img.width() as f32 * 0.5;
    let center_y = img.height() as f32 * 0.5;
    let shear = Projection::from_matrix([
        1.,
        params.shear_x.to_radians().tan(),
        0.,
        params.shear_y.to_radians().tan(),
        1.,
        0.,
        0.,
        0.,
        1.,
    ])
    .ok_or_else(|| anyhow!("Shear {:?} is not invertible", params))?;

    let projection = Projection::translate(-center_x, -center_y)
        .and_then(shear)
        .and_then(Projection::rotate(params.angle.to_radians()))
        .and_then(Projection::translate(
            center_x + params.translate_x,
            center_y + params.translate_y,
        ));
    Ok(warp(img, &projection, Interpolation::Nearest, Luma([0])))
}
