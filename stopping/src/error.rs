use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoppingError {
    /// The controller cannot be built from the supplied settings.
    #[error("invalid early stopping configuration: {0}")]
    InvalidConfiguration(String),
}
