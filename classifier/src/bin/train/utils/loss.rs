use candle_core::{DType, Result, Tensor, D};
use candle_nn::loss::cross_entropy;

/// Mean softmax cross-entropy of `logits` `(B, C)` against u32 `labels` `(B,)`.
pub fn classification_loss(logits: &Tensor, labels: &Tensor) -> Result<Tensor> {
    cross_entropy(logits, labels)
}

/// Fraction of rows whose highest logit is the labeled class.
pub fn accuracy(logits: &Tensor, labels: &Tensor) -> Result<f32> {
    logits
        .argmax(D::Minus1)?
        .eq(labels)?
        .to_dtype(DType::F32)?
        .mean_all()?
        .to_scalar::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_accuracy() -> Result<()> {
        let logits = Tensor::new(&[[2f32, 1.0], [0.0, 3.0], [5.0, -1.0], [0.1, 0.2]], &Device::Cpu)?;
        let labels = Tensor::new(&[0u32, 1, 1, 0], &Device::Cpu)?;
        assert_eq!(accuracy(&logits, &labels)?, 0.5);
        Ok(())
    }

    #[test]
    fn test_uniform_logits_loss_is_log_classes() -> Result<()> {
        let logits = Tensor::zeros((3, 4), DType::F32, &Device::Cpu)?;
        let labels = Tensor::new(&[0u32, 2, 3], &Device::Cpu)?;
        let loss = classification_loss(&logits, &labels)?.to_scalar::<f32>()?;
        assert!((loss - 4f32.ln()).abs() < 1e-5);
        Ok(())
    }
}
