use std::fmt;

use crate::error::StoppingError;

/// Loss-plateau monitor consulted once per training step.
///
/// An observation counts as an improvement only when it undercuts the best
/// loss seen so far by strictly more than `epsilon`. Every other observation,
/// including NaN and infinite losses, advances the wait counter. Once the
/// counter reaches `patience` the controller keeps answering `true`.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: u64,
    epsilon: f64,
    best_loss: f64,
    wait_count: u64,
}

impl EarlyStopping {
    pub fn new(patience: u64, epsilon: f64) -> Result<Self, StoppingError> {
        if patience < 1 {
            return Err(StoppingError::InvalidConfiguration(format!(
                "patience must be at least 1, got {}",
                patience
            )));
        }

        // NaN fails both comparisons, so check finiteness explicitly
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(StoppingError::InvalidConfiguration(format!(
                "epsilon must be a finite non-negative number, got {}",
                epsilon
            )));
        }

        Ok(Self {
            patience,
            epsilon,
            best_loss: f64::INFINITY,
            wait_count: 0,
        })
    }

    /// Records `loss` and returns whether training should halt.
    pub fn check(&mut self, loss: f64) -> bool {
        if !loss.is_finite() {
            log::warn!("Non-finite loss observed ({}), counting as no improvement", loss);
        } else if loss < self.best_loss - self.epsilon {
            self.best_loss = loss;
            self.wait_count = 0;
            return false;
        }

        self.wait_count += 1;
        self.wait_count >= self.patience
    }

    pub fn patience(&self) -> u64 {
        self.patience
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Lowest finite loss observed so far, `+inf` before the first one.
    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }
}

impl fmt::Display for EarlyStopping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EarlyStopping(best_loss: {:e}, wait_count: {}/{}, epsilon: {:e})",
            self.best_loss, self.wait_count, self.patience, self.epsilon
        )
    }
}
