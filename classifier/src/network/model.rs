use candle_core::{DType, Result, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder};

use crate::dataset::{CHANNELS, IMAGE_SIZE};

use super::{Block, Variant, KERNEL_SIZE, POOL_SIZE};

// (channels, height, width) after a layer
type Shape3 = (usize, usize, usize);

enum Layer {
    Conv {
        name: String,
        conv: Conv2d,
        l2: Option<f64>,
        out: Shape3,
    },
    Pool {
        out: Shape3,
    },
}

/// Convolutional classifier built from a [`Variant`]'s block list, ending in
/// a dense layer that produces unnormalized class logits.
pub struct Network {
    variant: Variant,
    layers: Vec<Layer>,
    output: Linear,
    num_classes: usize,
}

impl Network {
    pub fn new(variant: Variant, num_classes: usize, vs: &VarBuilder) -> Result<Self> {
        let config = Conv2dConfig {
            padding: KERNEL_SIZE / 2,
            ..Default::default()
        };

        let mut layers = Vec::with_capacity(variant.blocks().len());
        let mut shape = (CHANNELS, IMAGE_SIZE, IMAGE_SIZE);
        let mut conv_count = 0;

        for block in variant.blocks() {
            match *block {
                Block::Conv { filters, l2 } => {
                    conv_count += 1;
                    let name = format!("conv{}", conv_count);
                    let conv = conv2d(shape.0, filters, KERNEL_SIZE, config, vs.pp(&name))?;
                    shape.0 = filters;
                    layers.push(Layer::Conv {
                        name,
                        conv,
                        l2,
                        out: shape,
                    });
                }
                Block::Pool => {
                    shape.1 /= POOL_SIZE;
                    shape.2 /= POOL_SIZE;
                    layers.push(Layer::Pool { out: shape });
                }
            }
        }

        let flat = shape.0 * shape.1 * shape.2;
        let output = linear(flat, num_classes, vs.pp("output"))?;

        Ok(Self {
            variant,
            layers,
            output,
            num_classes,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Sum of `l2 * ||W||^2` over the regularized convolution kernels, as a
    /// scalar tensor. Zero when no layer is regularized.
    pub fn l2_penalty(&self) -> Result<Tensor> {
        let mut penalty = Tensor::zeros((), DType::F32, self.output.weight().device())?;

        for layer in &self.layers {
            if let Layer::Conv {
                conv, l2: Some(l2), ..
            } = layer
            {
                let term = (conv.weight().sqr()?.sum_all()? * *l2)?;
                penalty = (penalty + term)?;
            }
        }

        Ok(penalty)
    }

    pub fn num_parameters(&self) -> usize {
        let convs: usize = self
            .layers
            .iter()
            .map(|layer| match layer {
                Layer::Conv { conv, .. } => conv_params(conv),
                Layer::Pool { .. } => 0,
            })
            .sum();

        convs + linear_params(&self.output)
    }

    /// Layer-by-layer table of output shapes and parameter counts.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Network: {} ({} classes)", self.variant.name(), self.num_classes),
            format!("{:<10} {:<16} {:>12}", "layer", "output", "params"),
        ];

        let mut pools = 0;
        let mut last = (CHANNELS, IMAGE_SIZE, IMAGE_SIZE);
        for layer in &self.layers {
            let (name, out, params) = match layer {
                Layer::Conv { name, conv, out, .. } => (name.clone(), *out, conv_params(conv)),
                Layer::Pool { out } => {
                    pools += 1;
                    (format!("pool{}", pools), *out, 0)
                }
            };
            lines.push(format!(
                "{:<10} {:<16} {:>12}",
                name,
                format!("{}x{}x{}", out.0, out.1, out.2),
                params
            ));
            last = out;
        }

        lines.push(format!(
            "{:<10} {:<16} {:>12}",
            "flatten",
            last.0 * last.1 * last.2,
            0
        ));
        lines.push(format!(
            "{:<10} {:<16} {:>12}",
            "output",
            self.num_classes,
            linear_params(&self.output)
        ));
        lines.push(format!("Total params: {}", self.num_parameters()));

        lines.join("\n")
    }
}

impl Module for Network {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();

        for layer in &self.layers {
            x = match layer {
                Layer::Conv { conv, .. } => x.apply(conv)?.relu()?,
                Layer::Pool { .. } => x.max_pool2d(POOL_SIZE)?,
            };
        }

        x.flatten_from(1)?.apply(&self.output)
    }
}

fn conv_params(conv: &Conv2d) -> usize {
    conv.weight().elem_count() + conv.bias().map_or(0, |b| b.elem_count())
}

fn linear_params(linear: &Linear) -> usize {
    linear.weight().elem_count() + linear.bias().map_or(0, |b| b.elem_count())
}
