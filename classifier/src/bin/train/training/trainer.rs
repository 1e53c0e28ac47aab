use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use classifier::dataset::ImageSet;
use classifier::network::Network;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stopping::EarlyStopping;

use crate::args::Args;
use crate::training::evaluation::evaluate;
use crate::training::metrics::{RunMetrics, StopReason};
use crate::training::progress::TrainingProgressBar;
use crate::utils::device::select_device;
use crate::utils::loss::{accuracy, classification_loss};

pub struct Trainer {
    network: Network,
    optimizer: AdamW,
    varmap: VarMap,
    device: Device,
    stopper: EarlyStopping,
    batch_size: usize,
    epochs: usize,
    max_steps: Option<usize>,
    rng: StdRng,
    interrupt: Arc<AtomicBool>,
}

impl Trainer {
    pub fn new(
        args: &Args,
        num_classes: usize,
        interrupt: Arc<AtomicBool>,
    ) -> Result<Self, Box<dyn Error>> {
        let stopper = EarlyStopping::new(args.patience(), args.epsilon())?;

        let device = select_device(args.cpu)?;
        let varmap = VarMap::new();
        let vs = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let network = Network::new(args.variant, num_classes, &vs)?;

        // Zero weight decay makes AdamW plain Adam
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: args.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "Built {} network with {} parameters, stopping patience {} and epsilon {:e}",
            args.variant.name(),
            network.num_parameters(),
            stopper.patience(),
            stopper.epsilon()
        );

        Ok(Self {
            network,
            optimizer,
            varmap,
            device,
            stopper,
            batch_size: args.batch_size.max(1),
            epochs: args.epochs,
            max_steps: args.max_steps,
            rng,
            interrupt,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn stopper(&self) -> &EarlyStopping {
        &self.stopper
    }

    /// Runs up to `epochs` shuffled passes over `dataset`, consulting the
    /// early stopping controller after every step.
    pub fn train(&mut self, dataset: &ImageSet) -> Result<RunMetrics, Box<dyn Error>> {
        let mut metrics = RunMetrics::new();
        let device = self.device.clone();

        'epochs: for epoch in 1..=self.epochs {
            metrics.start_epoch();
            let order = dataset.shuffled_indices(&mut self.rng);
            let progress = TrainingProgressBar::new(dataset.num_batches(self.batch_size), epoch)?;

            for batch_res in dataset.batches(&order, self.batch_size, &device) {
                let (x, y) = batch_res?;
                let (loss, acc) = self.train_step(&x, &y)?;
                metrics.record(loss, acc);
                progress.update(loss, acc);

                if self.stopper.check(loss as f64) {
                    progress.finish(metrics.mean_loss() as f32, metrics.mean_accuracy() as f32);
                    log::info!("Early stopping at step {}: {}", metrics.steps(), self.stopper);
                    metrics.stop(StopReason::EarlyStopped);
                    break 'epochs;
                }

                if self.interrupt.load(Ordering::Relaxed) {
                    progress.finish(metrics.mean_loss() as f32, metrics.mean_accuracy() as f32);
                    log::info!("Interrupted at step {}: {}", metrics.steps(), self.stopper);
                    metrics.stop(StopReason::Interrupted);
                    break 'epochs;
                }

                if self.max_steps.is_some_and(|max| metrics.steps() >= max) {
                    progress.finish(metrics.mean_loss() as f32, metrics.mean_accuracy() as f32);
                    log::info!("Reached step limit of {}", metrics.steps());
                    metrics.stop(StopReason::StepLimit);
                    break 'epochs;
                }
            }

            progress.finish(metrics.mean_loss() as f32, metrics.mean_accuracy() as f32);
            log::debug!("Finished epoch {}: {}", epoch, self.stopper);
        }

        Ok(metrics)
    }

    /// One optimizer update. Returns the batch's mean cross-entropy, which is
    /// the value observed by early stopping, and its accuracy.
    fn train_step(&mut self, x: &Tensor, y: &Tensor) -> candle_core::Result<(f32, f32)> {
        let logits = self.network.forward(x)?;
        let loss = classification_loss(&logits, y)?;
        let objective = (&loss + self.network.l2_penalty()?)?;

        self.optimizer.backward_step(&objective)?;

        Ok((loss.to_scalar::<f32>()?, accuracy(&logits, y)?))
    }

    pub fn test(&self, dataset: &ImageSet) -> Result<(f32, f32), Box<dyn Error>> {
        log::info!("Evaluating on {} test images...", dataset.len());
        let (loss, acc) = evaluate(&self.network, dataset, self.batch_size, &self.device)?;
        log::info!("Test loss: {:.5}, test accuracy: {:.4}", loss, acc);
        Ok((loss, acc))
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.varmap.save(path)?;
        log::info!("Saved weights to {}", path.display());
        Ok(())
    }
}
