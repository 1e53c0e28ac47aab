mod args;
mod training;
mod utils;

use args::Args;
use clap::Parser;
use classifier::dataset::{ImageSet, Split};
use simplelog::{Config, SimpleLogger};
use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use training::Trainer;

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    // Set up SIGINT handler
    let interrupt = Arc::new(AtomicBool::new(false));
    let interrupt_handler = Arc::clone(&interrupt);

    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping after the current step...");
        interrupt_handler.store(true, Ordering::Relaxed);
    })?;

    log::info!("Loading {:?} from {}", args.dataset, args.data_dir.display());
    let train_set = ImageSet::load(args.dataset, &args.data_dir, Split::Train)?;
    if train_set.is_empty() {
        return Err("Training split contains no images".into());
    }
    log::info!(
        "Training on {} images across {} classes",
        train_set.len(),
        train_set.num_classes()
    );

    let mut trainer = Trainer::new(&args, train_set.num_classes(), interrupt)?;
    let metrics = trainer.train(&train_set)?;

    log::info!("\n{}", trainer.network().summary());
    metrics.log();
    log::info!("Final stopping state: {}", trainer.stopper());

    if ImageSet::has_split(args.dataset, &args.data_dir, Split::Test) {
        let test_set = ImageSet::load(args.dataset, &args.data_dir, Split::Test)?;
        trainer.test(&test_set)?;
    } else {
        log::warn!(
            "No test split in {}, skipping evaluation",
            args.data_dir.display()
        );
    }

    trainer.save(&args.output)?;

    log::info!("Done!");
    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::init(args.log_level, Config::default())?;

    Ok(args)
}
