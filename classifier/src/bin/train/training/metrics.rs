use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every requested epoch ran to the end.
    Completed,
    /// The loss plateaued for `patience` steps.
    EarlyStopped,
    /// `--max-steps` was reached.
    StepLimit,
    /// SIGINT was received.
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::Completed => "completed all epochs",
            StopReason::EarlyStopped => "early stopped",
            StopReason::StepLimit => "reached step limit",
            StopReason::Interrupted => "interrupted",
        };
        write!(f, "{}", reason)
    }
}

/// Running per-step loss and accuracy for one training run.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    epochs: usize,
    steps: usize,
    loss_sum: f64,
    accuracy_sum: f64,
    reason: StopReason,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            epochs: 0,
            steps: 0,
            loss_sum: 0.0,
            accuracy_sum: 0.0,
            reason: StopReason::Completed,
        }
    }

    pub fn start_epoch(&mut self) {
        self.epochs += 1;
    }

    pub fn record(&mut self, loss: f32, accuracy: f32) {
        self.steps += 1;
        self.loss_sum += loss as f64;
        self.accuracy_sum += accuracy as f64;
    }

    pub fn stop(&mut self, reason: StopReason) {
        self.reason = reason;
    }

    /// Epochs that ran at least partially.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reason(&self) -> StopReason {
        self.reason
    }

    pub fn mean_loss(&self) -> f64 {
        self.loss_sum / self.steps.max(1) as f64
    }

    pub fn mean_accuracy(&self) -> f64 {
        self.accuracy_sum / self.steps.max(1) as f64
    }

    pub fn log(&self) {
        log::info!(
            "Training {} after {} steps in {} epochs",
            self.reason(),
            self.steps(),
            self.epochs()
        );
        log::info!("Mean training loss: {:.5}", self.mean_loss());
        log::info!("Accuracy: {:.4}", self.mean_accuracy());
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_means_over_steps() {
        let mut metrics = RunMetrics::new();
        metrics.record(2.0, 0.25);
        metrics.record(1.0, 0.75);

        assert_eq!(metrics.steps(), 2);
        assert_eq!(metrics.mean_loss(), 1.5);
        assert_eq!(metrics.mean_accuracy(), 0.5);
        assert_eq!(metrics.reason(), StopReason::Completed);
    }

    #[test]
    fn test_empty_run_has_zero_means() {
        let metrics = RunMetrics::default();
        assert_eq!(metrics.epochs(), 0);
        assert_eq!(metrics.mean_loss(), 0.0);
        assert_eq!(metrics.mean_accuracy(), 0.0);
    }
}
