mod batches;

pub use batches::Batches;

use candle_core::Device;
use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Width and height of every CIFAR image.
pub const IMAGE_SIZE: usize = 32;
pub const CHANNELS: usize = 3;
/// Pixel bytes per record, stored channel-major (R plane, G plane, B plane).
pub const IMAGE_LEN: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    /// 10 classes, one label byte per record.
    #[value(name = "cifar10")]
    Cifar10,
    /// 100 fine classes, a coarse and a fine label byte per record.
    #[value(name = "cifar100")]
    Cifar100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl DatasetKind {
    pub fn num_classes(self) -> usize {
        match self {
            DatasetKind::Cifar10 => 10,
            DatasetKind::Cifar100 => 100,
        }
    }

    fn label_bytes(self) -> usize {
        match self {
            DatasetKind::Cifar10 => 1,
            DatasetKind::Cifar100 => 2,
        }
    }

    pub fn record_len(self) -> usize {
        self.label_bytes() + IMAGE_LEN
    }

    /// Binary files making up a split, as shipped in the official archives.
    pub fn files(self, split: Split) -> &'static [&'static str] {
        match (self, split) {
            (DatasetKind::Cifar10, Split::Train) => &[
                "data_batch_1.bin",
                "data_batch_2.bin",
                "data_batch_3.bin",
                "data_batch_4.bin",
                "data_batch_5.bin",
            ],
            (DatasetKind::Cifar10, Split::Test) => &["test_batch.bin"],
            (DatasetKind::Cifar100, Split::Train) => &["train.bin"],
            (DatasetKind::Cifar100, Split::Test) => &["test.bin"],
        }
    }
}

/// Labeled images kept as raw bytes; decoding to floats happens per batch.
#[derive(Debug, Clone)]
pub struct ImageSet {
    kind: DatasetKind,
    labels: Vec<u32>,
    pixels: Vec<u8>,
}

impl ImageSet {
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            pixels: Vec::new(),
        }
    }

    pub fn read<R: Read>(kind: DatasetKind, mut reader: R) -> io::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let record_len = kind.record_len();
        if buf.len() % record_len != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Truncated data: {} bytes is not a multiple of the {} byte record size",
                    buf.len(),
                    record_len
                ),
            ));
        }

        let num_records = buf.len() / record_len;
        let mut set = Self {
            kind,
            labels: Vec::with_capacity(num_records),
            pixels: Vec::with_capacity(num_records * IMAGE_LEN),
        };

        let label_bytes = kind.label_bytes();
        for (i, record) in buf.chunks_exact(record_len).enumerate() {
            // CIFAR-100 stores the coarse label first, we train on the fine one
            let label = record[label_bytes - 1] as u32;
            if label as usize >= kind.num_classes() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Record {} has label {}, but only {} classes exist",
                        i,
                        label,
                        kind.num_classes()
                    ),
                ));
            }

            set.labels.push(label);
            set.pixels.extend_from_slice(&record[label_bytes..]);
        }

        Ok(set)
    }

    /// Reads every file of `split` from `dir`.
    pub fn load(kind: DatasetKind, dir: &Path, split: Split) -> io::Result<Self> {
        let mut set = Self::new(kind);

        for name in kind.files(split) {
            let path = dir.join(name);
            let file = File::open(&path).map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
            })?;

            let part = Self::read(kind, BufReader::new(file))?;
            log::info!("Loaded {} images from {}", part.len(), path.display());

            set.extend(part);
        }

        Ok(set)
    }

    /// Whether all files of `split` are present in `dir`.
    pub fn has_split(kind: DatasetKind, dir: &Path, split: Split) -> bool {
        kind.files(split).iter().all(|name| dir.join(name).is_file())
    }

    pub fn extend(&mut self, other: ImageSet) {
        debug_assert_eq!(self.kind, other.kind);
        self.labels.extend(other.labels);
        self.pixels.extend(other.pixels);
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn num_classes(&self) -> usize {
        self.kind.num_classes()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, idx: usize) -> u32 {
        self.labels[idx]
    }

    pub fn image(&self, idx: usize) -> &[u8] {
        &self.pixels[idx * IMAGE_LEN..(idx + 1) * IMAGE_LEN]
    }

    pub fn indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    pub fn shuffled_indices<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut order = self.indices();
        order.shuffle(rng);
        order
    }

    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.len().div_ceil(batch_size)
    }

    /// Batches of `(images, labels)` following `order`. Images are
    /// `(B, 3, 32, 32)` f32 scaled to `[0, 1]`, labels are `(B,)` u32.
    pub fn batches<'a>(
        &'a self,
        order: &'a [usize],
        batch_size: usize,
        device: &'a Device,
    ) -> Batches<'a> {
        Batches::new(self, order, batch_size, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn record(kind: DatasetKind, label: u8, fill: u8) -> Vec<u8> {
        let mut bytes = match kind {
            DatasetKind::Cifar10 => vec![label],
            DatasetKind::Cifar100 => vec![label / 5, label],
        };
        bytes.extend(std::iter::repeat(fill).take(IMAGE_LEN));
        bytes
    }

    #[test]
    fn test_read_cifar100_uses_fine_label() {
        let mut bytes = record(DatasetKind::Cifar100, 73, 1);
        bytes.extend(record(DatasetKind::Cifar100, 4, 2));

        let set = ImageSet::read(DatasetKind::Cifar100, bytes.as_slice()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.label(0), 73);
        assert_eq!(set.label(1), 4);
        assert!(set.image(0).iter().all(|&p| p == 1));
        assert!(set.image(1).iter().all(|&p| p == 2));
    }

    #[test]
    fn test_read_cifar10() {
        let bytes = record(DatasetKind::Cifar10, 9, 200);
        let set = ImageSet::read(DatasetKind::Cifar10, bytes.as_slice()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.label(0), 9);
        assert_eq!(set.num_classes(), 10);
    }

    #[test]
    fn test_read_rejects_truncated_record() {
        let mut bytes = record(DatasetKind::Cifar10, 1, 0);
        bytes.pop();

        let err = ImageSet::read(DatasetKind::Cifar10, bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_rejects_out_of_range_label() {
        let bytes = record(DatasetKind::Cifar10, 10, 0);
        let err = ImageSet::read(DatasetKind::Cifar10, bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_empty_input() {
        let set = ImageSet::read(DatasetKind::Cifar100, io::empty()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_concatenates_split_files() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in DatasetKind::Cifar10
            .files(Split::Train)
            .iter()
            .enumerate()
        {
            let mut file = File::create(dir.path().join(name)).unwrap();
            file.write_all(&record(DatasetKind::Cifar10, i as u8, 0))
                .unwrap();
            file.write_all(&record(DatasetKind::Cifar10, 9, 0)).unwrap();
        }

        assert!(ImageSet::has_split(DatasetKind::Cifar10, dir.path(), Split::Train));
        assert!(!ImageSet::has_split(DatasetKind::Cifar10, dir.path(), Split::Test));

        let set = ImageSet::load(DatasetKind::Cifar10, dir.path(), Split::Train).unwrap();
        assert_eq!(set.len(), 10);
        assert_eq!(set.label(0), 0);
        assert_eq!(set.label(2), 1);
        assert_eq!(set.label(9), 9);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSet::load(DatasetKind::Cifar100, dir.path(), Split::Test).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_shuffled_indices_is_permutation() {
        let mut bytes = Vec::new();
        for label in 0..20 {
            bytes.extend(record(DatasetKind::Cifar100, label, 0));
        }
        let set = ImageSet::read(DatasetKind::Cifar100, bytes.as_slice()).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let mut order = set.shuffled_indices(&mut rng);
        order.sort_unstable();
        assert_eq!(order, set.indices());
        assert_eq!(set.num_batches(8), 3);
    }
}
