use indicatif::{ProgressBar, ProgressStyle};

pub struct TrainingProgressBar {
    bar: ProgressBar,
}

impl TrainingProgressBar {
    pub fn new(num_batches: usize, epoch: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(num_batches as u64);
        bar.set_style(ProgressStyle::default_bar().template(
            "{prefix} {spinner:.cyan} {pos}/{len} [{wide_bar:.cyan/blue}] {eta_precise} | {msg}",
        )?);
        bar.set_prefix(format!("epoch {}", epoch));
        Ok(Self { bar })
    }

    pub fn update(&self, loss: f32, accuracy: f32) {
        self.bar
            .set_message(format!("loss: {:.5}, acc: {:.3}", loss, accuracy));
        self.bar.inc(1);
    }

    pub fn finish(&self, loss: f32, accuracy: f32) {
        self.bar
            .set_message(format!("mean loss: {:.5}, mean acc: {:.3}", loss, accuracy));
        self.bar.finish();
    }
}
