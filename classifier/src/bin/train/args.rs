use std::path::PathBuf;

use classifier::dataset::DatasetKind;
use classifier::network::Variant;
use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "CIFAR Trainer")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Directory holding the CIFAR binary files.
    #[arg(long, default_value = "data/cifar-100-binary")]
    pub data_dir: PathBuf,

    /// Which CIFAR archive the data directory contains.
    #[arg(long, value_enum, default_value_t = DatasetKind::Cifar100)]
    pub dataset: DatasetKind,

    /// Network variant to train.
    #[arg(long, value_enum, default_value_t = Variant::Small)]
    pub variant: Variant,

    /// Number of images per training batch.
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Learning rate for the Adam optimizer.
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Maximum number of passes over the training set.
    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    /// Steps without improvement before early stopping. Defaults to the variant's value.
    #[arg(long)]
    pub patience: Option<u64>,

    /// Minimum loss decrease that counts as improvement. Defaults to the variant's value.
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Stop after this many training steps regardless of loss.
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Seed for shuffling the training set.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Train on the CPU even when an accelerator is available.
    #[arg(long)]
    pub cpu: bool,

    /// Where to write the trained weights.
    #[arg(long, default_value = "model.safetensors")]
    pub output: PathBuf,

    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn patience(&self) -> u64 {
        self.patience.unwrap_or_else(|| self.variant.patience())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon.unwrap_or_else(|| self.variant.epsilon())
    }
}
