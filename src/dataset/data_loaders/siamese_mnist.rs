use crate::dataset::common_structs::{SiameseBatch, SiameseSample};
use crate::dataset::data_augmenters::image_augmentations::RandomAffine;
use crate::dataset::data_transformers::img2tensor::from_gray_img_to_tensor;
use crate::dataset::iterator_adapters::{Batching, Shuffling};
use anyhow::{anyhow, bail, ensure};
use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::convert::TryFrom;
use tch::{vision, Device, Tensor};

/// MNIST where every digit comes with a randomly affine transformed copy of itself
pub struct SiameseMnist {
    pixels: Vec<u8>,
    labels: Vec<i64>,
    side: u32,
    affine: RandomAffine,
}

impl SiameseMnist {
    /// `images` is `[N, side * side]` or `[N, 1, side, side]` with values in [0, 1]
    pub fn new(
        images: &Tensor,
        labels: &Tensor,
        affine: RandomAffine,
    ) -> anyhow::Result<SiameseMnist> {
        let nb_images = images.size().first().copied().unwrap_or(0);
        let flat_images = images.to_device(Device::Cpu).flatten(0, -1);
        let flat_labels = labels.to_device(Device::Cpu).flatten(0, -1);
        let raw_pixels = Vec::<f32>::try_from(&flat_images)?;
        let labels = Vec::<i64>::try_from(&flat_labels)?;
        ensure!(
            labels.len() as i64 == nb_images,
            "Got {} images but {} labels",
            nb_images,
            labels.len()
        );

        let per_image = if nb_images == 0 { 0 } else { raw_pixels.len() / nb_images as usize };
        let side = (per_image as f64).sqrt().round() as u32;
        if (side * side) as usize != per_image {
            bail!("Images with {} pixels are not square", per_image);
        }
        let pixels = raw_pixels
            .into_iter()
            .map(|p| (p * 255.).round().max(0.).min(255.) as u8)
            .collect();
        Ok(SiameseMnist {
            pixels,
            labels,
            side,
            affine,
        })
    }

    /// Training split of a MNIST dataset
    pub fn from_dataset(
        dataset: &vision::dataset::Dataset,
        affine: RandomAffine,
    ) -> anyhow::Result<SiameseMnist> {
        SiameseMnist::new(&dataset.train_images, &dataset.train_labels, affine)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn image(&self, index: usize) -> anyhow::Result<GrayImage> {
        let per_image = (self.side * self.side) as usize;
        let start = index * per_image;
        let raw = self
            .pixels
            .get(start..start + per_image)
            .ok_or_else(|| anyhow!("Image index {} out of range (len {})", index, self.len()))?;
        GrayImage::from_raw(self.side, self.side, raw.to_vec())
            .ok_or_else(|| anyhow!("Bad buffer for image {}", index))
    }

    pub fn get<R: Rng>(&self, index: usize, rng: &mut R) -> anyhow::Result<SiameseSample> {
        let img = self.image(index)?;
        let transformed = self.affine.apply(&img, rng)?;
        Ok(SiameseSample {
            x: from_gray_img_to_tensor(&img),
            xt: from_gray_img_to_tensor(&transformed),
            label: self.labels[index],
        })
    }

    /// One epoch worth of batches in a fresh random order.
    ///
    /// Augmentation runs on `pool` when given. Every sample draws from its own rng,
    /// seeded from `rng`, so the result does not depend on how rayon schedules it.
    pub fn batches<'a, R: Rng>(
        &'a self,
        batch_size: usize,
        rng: &mut R,
        pool: Option<&'a ThreadPool>,
    ) -> SiameseBatches<'a> {
        let order_rng = StdRng::seed_from_u64(rng.gen());
        let index_batches: Vec<Vec<usize>> = (0..self.len())
            .shuffling(self.len(), order_rng)
            .batching(batch_size)
            .collect();
        SiameseBatches {
            dataset: self,
            index_batches: index_batches.into_iter(),
            seeds: StdRng::seed_from_u64(rng.gen()),
            pool,
        }
    }
}

pub struct SiameseBatches<'a> {
    dataset: &'a SiameseMnist,
    index_batches: std::vec::IntoIter<Vec<usize>>,
    seeds: StdRng,
    pool: Option<&'a ThreadPool>,
}

impl<'a> SiameseBatches<'a> {
    fn build_batch(&mut self, indexes: Vec<usize>) -> anyhow::Result<SiameseBatch> {
        let jobs: Vec<(usize, u64)> = indexes
            .into_iter()
            .map(|index| (index, self.seeds.gen()))
            .collect();
        let dataset = self.dataset;
        let build = |&(index, seed): &(usize, u64)| {
            dataset.get(index, &mut StdRng::seed_from_u64(seed))
        };
        let samples: anyhow::Result<Vec<SiameseSample>> = match self.pool {
            Some(pool) => pool.install(|| jobs.par_iter().map(build).collect()),
            None => jobs.iter().map(build).collect(),
        };
        let samples = samples?;

        let xs: Vec<&Tensor> = samples.iter().map(|s| &s.x).collect();
        let xts: Vec<&Tensor> = samples.iter().map(|s| &s.xt).collect();
        let labels: Vec<i64> = samples.iter().map(|s| s.label).collect();
        Ok(SiameseBatch {
            x: Tensor::stack(&xs, 0),
            xt: Tensor::stack(&xts, 0),
            labels: Tensor::from_slice(&labels),
        })
    }
}

impl<'a> Iterator for SiameseBatches<'a> {
    type Item = anyhow::Result<SiameseBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let indexes = self.index_batches.next()?;
        Some(self.build_batch(indexes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::ThreadPoolBuilder;
    use tch::Kind;

    fn synthetic(n: i64) -> SiameseMnist {
        let images = Tensor::rand([n, 784], (Kind::Float, Device::Cpu));
        let labels = Tensor::arange(n, (Kind::Int64, Device::Cpu)).remainder(10);
        SiameseMnist::new(&images, &labels, RandomAffine::default()).unwrap()
    }

    #[test]
    fn length_matches_split() {
        assert_eq!(synthetic(37).len(), 37);
    }

    #[test]
    fn sample_is_a_pair_of_same_shaped_images() {
        let dataset = synthetic(5);
        let sample = dataset.get(3, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(sample.x.size(), vec![1, 28, 28]);
        assert_eq!(sample.x.size(), sample.xt.size());
        assert_eq!(sample.label, 3);
    }

    #[test]
    fn four_dimensional_images_are_accepted() {
        let images = Tensor::rand([6, 1, 28, 28], (Kind::Float, Device::Cpu));
        let labels = Tensor::zeros([6], (Kind::Int64, Device::Cpu));
        let dataset = SiameseMnist::new(&images, &labels, RandomAffine::default()).unwrap();
        assert_eq!(dataset.len(), 6);
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let images = Tensor::rand([6, 784], (Kind::Float, Device::Cpu));
        let labels = Tensor::zeros([5], (Kind::Int64, Device::Cpu));
        assert!(SiameseMnist::new(&images, &labels, RandomAffine::default()).is_err());
    }

    #[test]
    fn batches_cover_the_dataset_once() {
        let dataset = synthetic(10);
        let mut rng = StdRng::seed_from_u64(42);
        let batches: Vec<SiameseBatch> = dataset
            .batches(4, &mut rng, None)
            .collect::<anyhow::Result<_>>()
            .unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(batches[0].x.size(), vec![4, 1, 28, 28]);
        assert_eq!(batches[0].x.size(), batches[0].xt.size());

        let mut labels: Vec<i64> = batches
            .iter()
            .flat_map(|b| Vec::<i64>::try_from(&b.labels).unwrap())
            .collect();
        labels.sort_unstable();
        assert_eq!(labels, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn pool_and_sequential_give_the_same_batches() {
        let dataset = synthetic(9);
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let sequential: Vec<SiameseBatch> = dataset
            .batches(4, &mut StdRng::seed_from_u64(5), None)
            .collect::<anyhow::Result<_>>()
            .unwrap();
        let pooled: Vec<SiameseBatch> = dataset
            .batches(4, &mut StdRng::seed_from_u64(5), Some(&pool))
            .collect::<anyhow::Result<_>>()
            .unwrap();
        for (a, b) in sequential.iter().zip(pooled.iter()) {
            assert!(a.xt.equal(&b.xt));
            assert!(a.labels.equal(&b.labels));
        }
    }
}
