pub mod model;
pub mod variant;

pub use model::Network;
pub use variant::{Block, Variant};

/// Spatial kernel size of every convolution.
pub const KERNEL_SIZE: usize = 3;

/// Side length of the max-pooling window (and its stride).
pub const POOL_SIZE: usize = 2;
