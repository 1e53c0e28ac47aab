use clap::ValueEnum;

/// One stage of the convolutional stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block {
    /// 3x3 same-padded convolution followed by ReLU. `l2` adds a kernel
    /// weight penalty of `l2 * sum(w^2)` to the training loss.
    Conv { filters: usize, l2: Option<f64> },
    /// 2x2 max pooling.
    Pool,
}

const SMALL: &[Block] = &[
    Block::Conv { filters: 32, l2: Some(0.01) },
    Block::Conv { filters: 64, l2: None },
    Block::Pool,
    Block::Conv { filters: 128, l2: None },
    Block::Conv { filters: 256, l2: None },
    Block::Pool,
];

const LARGE: &[Block] = &[
    Block::Conv { filters: 32, l2: Some(0.01) },
    Block::Conv { filters: 64, l2: Some(0.01) },
    Block::Conv { filters: 128, l2: None },
    Block::Pool,
    Block::Conv { filters: 256, l2: None },
    Block::Conv { filters: 512, l2: None },
    Block::Pool,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Four convolutions (32-64-128-256), patience 20.
    Small,
    /// Five convolutions (32-64-128-256-512), patience 30.
    Large,
}

impl Variant {
    pub fn blocks(self) -> &'static [Block] {
        match self {
            Variant::Small => SMALL,
            Variant::Large => LARGE,
        }
    }

    /// Default early stopping patience, in training steps.
    pub fn patience(self) -> u64 {
        match self {
            Variant::Small => 20,
            Variant::Large => 30,
        }
    }

    /// Default minimum loss decrease that counts as improvement.
    pub fn epsilon(self) -> f64 {
        1e-8
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Small => "small",
            Variant::Large => "large",
        }
    }
}
