use candle_core::{Device, Result, Tensor};
use rayon::prelude::*;

use super::{ImageSet, CHANNELS, IMAGE_LEN, IMAGE_SIZE};

pub struct Batches<'a> {
    set: &'a ImageSet,
    order: &'a [usize],
    device: &'a Device,
    batch_size: usize,
    idx: usize,
}

impl<'a> Batches<'a> {
    pub(super) fn new(
        set: &'a ImageSet,
        order: &'a [usize],
        batch_size: usize,
        device: &'a Device,
    ) -> Self {
        Self {
            set,
            order,
            device,
            batch_size: batch_size.max(1),
            idx: 0,
        }
    }

    fn build(&self, chunk: &[usize]) -> Result<(Tensor, Tensor)> {
        let mut pixels = vec![0f32; chunk.len() * IMAGE_LEN];
        pixels
            .par_chunks_mut(IMAGE_LEN)
            .zip(chunk.par_iter())
            .for_each(|(dst, &sample)| {
                for (d, &s) in dst.iter_mut().zip(self.set.image(sample)) {
                    *d = s as f32 / 255.0;
                }
            });

        let labels: Vec<u32> = chunk.iter().map(|&i| self.set.label(i)).collect();

        let x = Tensor::from_vec(
            pixels,
            (chunk.len(), CHANNELS, IMAGE_SIZE, IMAGE_SIZE),
            self.device,
        )?;
        let y = Tensor::from_vec(labels, chunk.len(), self.device)?;

        Ok((x, y))
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<(Tensor, Tensor)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.order.len() {
            return None;
        }
        let end = (self.idx + self.batch_size).min(self.order.len());
        let chunk = &self.order[self.idx..end];
        self.idx = end;

        Some(self.build(chunk))
    }
}
