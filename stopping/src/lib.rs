pub mod early_stopping;
pub mod error;

pub use early_stopping::EarlyStopping;
pub use error::StoppingError;
