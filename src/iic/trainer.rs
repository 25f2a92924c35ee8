use super::iic_loss::iic_loss;
use super::network::BACKBONE_PATH;
use super::*;
use crate::dataset::data_augmenters::image_augmentations::RandomAffine;
use crate::dataset::data_loaders::siamese_mnist::SiameseMnist;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tch::data::Iter2;
use tch::vision::dataset::Dataset;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub seed: u64,
    pub learning_rate: f64,
    pub device: Device,
    /// Threads used to augment a batch, 0 augments on the calling thread
    pub num_workers: usize,
    /// File name of the saved backbone weights, nothing is saved when None
    pub save_weights: Option<String>,
    pub weights_dir: PathBuf,
    /// Run the backbone over the test split after training
    pub eval: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            batch_size: 128,
            epochs: 40,
            seed: 1,
            learning_rate: 1e-3,
            device: Device::Cpu,
            num_workers: 0,
            save_weights: None,
            weights_dir: PathBuf::from("weights"),
            eval: false,
        }
    }
}

/// One line of training progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressLine {
    pub epoch: usize,
    pub seen: usize,
    pub total: usize,
    pub loss: f64,
}

impl fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percentage = if self.total == 0 {
            100.
        } else {
            100. * self.seen as f64 / self.total as f64
        };
        write!(
            f,
            "Epoch: {} [{}/{} ({:.0}%)]\tLoss: {:.6}",
            self.epoch, self.seen, self.total, percentage, self.loss
        )
    }
}

/// Log about five times per epoch
pub fn log_interval(dataset_len: usize, batch_size: usize) -> usize {
    (dataset_len / batch_size.max(1) / 5).max(1)
}

/// The last batch of an epoch is always logged, once
pub fn should_log(batch_index: usize, interval: usize, seen: usize, total: usize) -> bool {
    (batch_index + 1) % interval.max(1) == 0 || seen == total
}

/// One pass over the siamese training set, returns the logged progress
#[allow(clippy::too_many_arguments)]
pub fn train<R: Rng>(
    config: &TrainConfig,
    model: &IicModel,
    dataset: &SiameseMnist,
    optimizer: &mut nn::Optimizer,
    epoch: usize,
    rng: &mut R,
    pool: Option<&ThreadPool>,
) -> anyhow::Result<Vec<ProgressLine>> {
    let total = dataset.len();
    let interval = log_interval(total, config.batch_size);
    let mut seen = 0;
    let mut progress = vec![];
    for (batch_index, batch) in dataset.batches(config.batch_size, rng, pool).enumerate() {
        let batch = batch?;
        let x = batch.x.to_device(config.device);
        let xt = batch.xt.to_device(config.device);

        let (z, zt) = model.forward(&x, &xt, Mode::Train);
        let loss = iic_loss(&z, &zt);
        optimizer.backward_step(&loss);

        seen += batch.len();
        let loss = loss.double_value(&[]);
        debug!("Batch {} loss {}", batch_index, loss);
        if should_log(batch_index, interval, seen, total) {
            let line = ProgressLine {
                epoch,
                seen,
                total,
                loss,
            };
            info!("{}", line);
            progress.push(line);
        }
    }
    Ok(progress)
}

/// Backbone outputs of one test batch, kept on the CPU
#[derive(Debug)]
pub struct EvalBatch {
    pub outputs: Tensor,
    pub labels: Tensor,
}

/// Runs the backbone alone over held out images and prints the raw outputs
/// next to the labels. No metric is computed.
pub fn evaluate(
    model: &IicModel,
    images: &Tensor,
    labels: &Tensor,
    batch_size: usize,
    device: Device,
) -> Vec<EvalBatch> {
    let mut iter = Iter2::new(images, labels, batch_size.max(1) as i64);
    iter.shuffle().return_smaller_last_batch().to_device(device);
    tch::no_grad(|| {
        iter.map(|(inputs, labels)| {
            let inputs = inputs.view([-1, 1, 28, 28]);
            let outputs = model
                .backbone
                .forward_t(&inputs, Mode::Eval.is_train())
                .to_device(Device::Cpu);
            let labels = labels.to_device(Device::Cpu);
            outputs.print();
            labels.print();
            EvalBatch { outputs, labels }
        })
        .collect()
    })
}

/// Writes only the backbone variables to `weights_dir/name`
pub fn save_backbone(vs: &nn::VarStore, weights_dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(weights_dir)
        .with_context(|| format!("Error creating {}", weights_dir.display()))?;
    let path = weights_dir.join(name);
    let prefix = format!("{}.", BACKBONE_PATH);
    let mut named_tensors: Vec<(String, Tensor)> = vs
        .variables()
        .into_iter()
        .filter(|(name, _)| name.starts_with(&prefix))
        .collect();
    named_tensors.sort_by(|a, b| a.0.cmp(&b.0));
    Tensor::save_multi(&named_tensors, &path)
        .with_context(|| format!("Error saving weights to {}", path.display()))?;
    info!("Saved backbone weights to {}", path.display());
    Ok(path)
}

/// Whole training run: model, optimizer, all epochs, then the optional weight file.
/// Returns where the weights were saved.
pub fn run_training(config: &TrainConfig, mnist: &Dataset) -> anyhow::Result<Option<PathBuf>> {
    tch::manual_seed(config.seed as i64);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let train_set = SiameseMnist::from_dataset(mnist, RandomAffine::default())?;
    info!("Train dataset size: {}", train_set.len());
    info!("Test dataset size: {}", mnist.test_labels.size().first().copied().unwrap_or(0));

    let pool = if config.num_workers > 0 {
        Some(ThreadPoolBuilder::new().num_threads(config.num_workers).build()?)
    } else {
        None
    };

    let vs = nn::VarStore::new(config.device);
    let model = IicModel::new(&vs.root());
    for (name, tensor) in vs.variables() {
        debug!("{} {:?}", name, tensor.size());
    }
    info!("{:?}", config.device);
    let mut optimizer = nn::Adam::default().build(&vs, config.learning_rate)?;

    let progress_bar = ProgressBar::new(config.epochs as u64);
    progress_bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} [{elapsed_precise}<{eta_precise}]",
    )?);
    let start_time = Instant::now();
    for epoch in 0..config.epochs {
        train(
            config,
            &model,
            &train_set,
            &mut optimizer,
            epoch,
            &mut rng,
            pool.as_ref(),
        )?;
        progress_bar.inc(1);
    }
    progress_bar.finish();
    info!("Elapsed time (train): {:?}", start_time.elapsed());

    let saved = match &config.save_weights {
        Some(name) => Some(save_backbone(&vs, &config.weights_dir, name)?),
        None => None,
    };

    if config.eval {
        evaluate(
            &model,
            &mnist.test_images,
            &mnist.test_labels,
            config.batch_size,
            config.device,
        );
    }
    Ok(saved)
}
