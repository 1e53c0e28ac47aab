use candle_core::{Device, Result};
use candle_nn::Module;
use classifier::dataset::ImageSet;
use classifier::network::Network;

use crate::utils::loss::{accuracy, classification_loss};

/// Mean loss and accuracy over `set`, weighted by batch length.
pub fn evaluate(
    network: &Network,
    set: &ImageSet,
    batch_size: usize,
    device: &Device,
) -> Result<(f32, f32)> {
    let order = set.indices();
    let mut total_loss = 0.0;
    let mut total_correct = 0.0;

    for batch_res in set.batches(&order, batch_size, device) {
        let (x, y) = batch_res?;
        let batch_len = y.dim(0)? as f32;

        let logits = network.forward(&x)?;
        total_loss += classification_loss(&logits, &y)?.to_scalar::<f32>()? * batch_len;
        total_correct += accuracy(&logits, &y)? * batch_len;
    }

    let count = set.len().max(1) as f32;
    Ok((total_loss / count, total_correct / count))
}
