pub mod evaluation;
pub mod metrics;
pub mod progress;
pub mod trainer;

pub use trainer::Trainer;
