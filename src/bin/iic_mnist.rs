use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tch::vision;

use visionlab::device::{num_workers, select_device};
use visionlab::iic::trainer::{run_training, TrainConfig};

/// Invariant Information Clustering on MNIST
#[derive(Parser, Debug)]
#[command(name = "iic_mnist")]
struct Args {
    /// disables CUDA training
    #[arg(long)]
    no_cuda: bool,
    /// random seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// input batch size for training
    #[arg(long, default_value_t = 128)]
    batch_size: usize,
    /// number of epochs to train
    #[arg(long, default_value_t = 40)]
    epochs: usize,
    /// Save the backbone weights under weights/ with this name
    #[arg(long)]
    save_weights: Option<String>,
    /// Directory with the uncompressed MNIST idx files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Print the backbone outputs over the test split after training
    #[arg(long)]
    eval: bool,
}

fn main() -> anyhow::Result<()> {
    visionlab::init_logging();
    let args = Args::parse();

    let device = select_device(args.no_cuda);
    let mnist = vision::mnist::load_dir(&args.data_dir)
        .with_context(|| format!("Error loading MNIST from {}", args.data_dir.display()))?;

    let config = TrainConfig {
        batch_size: args.batch_size,
        epochs: args.epochs,
        seed: args.seed,
        device,
        num_workers: num_workers(device),
        save_weights: args.save_weights,
        eval: args.eval,
        ..Default::default()
    };
    run_training(&config, &mnist)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["iic_mnist"]).unwrap();
        assert!(!args.no_cuda);
        assert_eq!(args.seed, 1);
        assert_eq!(args.batch_size, 128);
        assert_eq!(args.epochs, 40);
        assert_eq!(args.save_weights, None);
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert!(!args.eval);
    }

    #[test]
    fn flags_use_dashes() {
        let args = Args::try_parse_from([
            "iic_mnist",
            "--no-cuda",
            "--batch-size",
            "8",
            "--save-weights",
            "iic.ot",
            "--eval",
        ])
        .unwrap();
        assert!(args.no_cuda);
        assert_eq!(args.batch_size, 8);
        assert_eq!(args.save_weights, Some("iic.ot".to_string()));
        assert!(args.eval);
        assert!(Args::try_parse_from(["iic_mnist", "--save_weights", "iic.ot"]).is_err());
    }
}
