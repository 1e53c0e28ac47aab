use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{loss::cross_entropy, AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};

use crate::dataset::{CHANNELS, IMAGE_SIZE};
use crate::network::{Network, Variant};

fn build(variant: Variant, num_classes: usize) -> Result<(Network, VarMap)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let network = Network::new(variant, num_classes, &vb)?;
    Ok((network, varmap))
}

fn random_images(batch: usize) -> Result<Tensor> {
    Tensor::rand(0f32, 1f32, (batch, CHANNELS, IMAGE_SIZE, IMAGE_SIZE), &Device::Cpu)
}

#[test]
fn test_forward_produces_class_logits() -> Result<()> {
    for variant in [Variant::Small, Variant::Large] {
        let (network, _varmap) = build(variant, 100)?;
        let logits = network.forward(&random_images(2)?)?;
        assert_eq!(logits.dims(), &[2, 100], "variant {}", variant.name());
    }
    Ok(())
}

#[test]
fn test_parameter_count_matches_varmap() -> Result<()> {
    for variant in [Variant::Small, Variant::Large] {
        let (network, varmap) = build(variant, 10)?;
        let from_varmap: usize = varmap.all_vars().iter().map(|v| v.elem_count()).sum();
        assert_eq!(network.num_parameters(), from_varmap);
    }
    Ok(())
}

#[test]
fn test_small_parameter_count() -> Result<()> {
    let (network, _varmap) = build(Variant::Small, 100)?;

    let convs = (3 * 9 * 32 + 32) + (32 * 9 * 64 + 64) + (64 * 9 * 128 + 128) + (128 * 9 * 256 + 256);
    let dense = 256 * 8 * 8 * 100 + 100;
    assert_eq!(network.num_parameters(), convs + dense);
    Ok(())
}

#[test]
fn test_l2_penalty_covers_regularized_kernels_only() -> Result<()> {
    let (network, varmap) = build(Variant::Small, 10)?;
    let penalty = network.l2_penalty()?.to_scalar::<f32>()?;

    let data = varmap.data().lock().unwrap();
    let kernel = data.get("conv1.weight").expect("conv1 kernel");
    let expected = kernel.as_tensor().sqr()?.sum_all()?.to_scalar::<f32>()? * 0.01;

    assert!(penalty > 0.0);
    assert!(
        (penalty - expected).abs() <= expected * 1e-4,
        "penalty {} != expected {}",
        penalty,
        expected
    );
    Ok(())
}

#[test]
fn test_summary_lists_layers() -> Result<()> {
    let (network, _varmap) = build(Variant::Large, 100)?;
    let summary = network.summary();

    for name in ["conv1", "conv5", "pool2", "flatten", "output"] {
        assert!(summary.contains(name), "missing {} in:\n{}", name, summary);
    }
    assert!(summary.contains("512x8x8"));
    assert!(summary.contains(&format!("Total params: {}", network.num_parameters())));
    Ok(())
}

#[test]
fn test_few_steps_reduce_loss_on_fixed_batch() -> Result<()> {
    let (network, varmap) = build(Variant::Small, 10)?;
    let mut opt = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: 1e-3,
            weight_decay: 0.0,
            ..Default::default()
        },
    )?;

    let x = random_images(4)?;
    let y = Tensor::new(&[0u32, 3, 5, 9], &Device::Cpu)?;

    let initial = cross_entropy(&network.forward(&x)?, &y)?.to_scalar::<f32>()?;
    for _ in 0..20 {
        let loss = cross_entropy(&network.forward(&x)?, &y)?;
        opt.backward_step(&loss)?;
    }
    let last = cross_entropy(&network.forward(&x)?, &y)?.to_scalar::<f32>()?;

    assert!(last < initial, "loss went from {} to {}", initial, last);
    Ok(())
}
