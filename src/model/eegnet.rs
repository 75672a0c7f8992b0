//! EEGNetV4-compatible inference graph.
//!
//! Checkpoint layout: `firstconv` (temporal conv + batch norm),
//! `depthwise` (spatial conv + batch norm), `separable` (depthwise
//! temporal conv, pointwise conv, batch norm), `classifier` (linear).
//! Dropout stages are identity at inference and hold no weights.

use candle_core::{Module, Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, VarBuilder};

use crate::model::hparams::Hparams;
use crate::model::layers::{batch_norm_2d, BatchNorm2d};

const BN_EPS: f64 = 1e-5;

pub(crate) struct EegNet {
    firstconv: Conv2d,
    firstconv_bn: BatchNorm2d,
    depthwise: Conv2d,
    depthwise_bn: BatchNorm2d,
    separable_depth: Conv2d,
    separable_point: Conv2d,
    separable_bn: BatchNorm2d,
    k1_pad: usize,
    k2_pad: usize,
    pool1: usize,
    pool2: usize,
    classifier: Linear,
}

impl EegNet {
    pub(crate) fn load(
        hp: &Hparams,
        channels: usize,
        n_classes: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let f_mid = hp.f1 * hp.d;

        let firstconv = conv2d_no_bias(
            (hp.f1, 1, 1, hp.k1),
            Conv2dConfig::default(),
            vb.pp("firstconv").pp("0"),
        )?;
        let firstconv_bn = batch_norm_2d(hp.f1, BN_EPS, vb.pp("firstconv").pp("1"))?;

        let depthwise = conv2d_no_bias(
            (f_mid, 1, channels, 1),
            Conv2dConfig {
                groups: hp.f1,
                ..Default::default()
            },
            vb.pp("depthwise").pp("0"),
        )?;
        let depthwise_bn = batch_norm_2d(f_mid, BN_EPS, vb.pp("depthwise").pp("1"))?;

        let separable_depth = conv2d_no_bias(
            (f_mid, 1, 1, hp.k2),
            Conv2dConfig {
                groups: f_mid,
                ..Default::default()
            },
            vb.pp("separable").pp("0"),
        )?;
        let separable_point = conv2d_no_bias(
            (hp.f2, f_mid, 1, 1),
            Conv2dConfig::default(),
            vb.pp("separable").pp("1"),
        )?;
        let separable_bn = batch_norm_2d(hp.f2, BN_EPS, vb.pp("separable").pp("2"))?;

        let classifier = candle_nn::linear(hp.f2, n_classes, vb.pp("classifier"))?;

        Ok(Self {
            firstconv,
            firstconv_bn,
            depthwise,
            depthwise_bn,
            separable_depth,
            separable_point,
            separable_bn,
            k1_pad: hp.k1 / 2,
            k2_pad: hp.k2 / 2,
            pool1: hp.pool1.max(1),
            pool2: hp.pool2.max(1),
            classifier,
        })
    }

    /// `(batch, 1, channels, window_samples)` -> `(batch, n_classes)` raw
    /// scores.
    pub(crate) fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        // Temporal padding only; the channel axis is never padded.
        let h = x.pad_with_zeros(D::Minus1, self.k1_pad, self.k1_pad)?;
        let h = self.firstconv.forward(&h)?;
        let h = self.firstconv_bn.forward(&h)?;

        let h = self.depthwise.forward(&h)?;
        let h = self.depthwise_bn.forward(&h)?;
        let h = h.elu(1.0)?;
        let h = h.avg_pool2d((1, self.pool1))?;

        let h = h.pad_with_zeros(D::Minus1, self.k2_pad, self.k2_pad)?;
        let h = self.separable_depth.forward(&h)?;
        let h = self.separable_point.forward(&h)?;
        let h = self.separable_bn.forward(&h)?;
        let h = h.elu(1.0)?;
        let h = h.avg_pool2d((1, self.pool2))?;

        // Global average pool over the remaining (1, time) grid.
        let h = h.mean(D::Minus1)?.mean(D::Minus1)?;
        self.classifier.forward(&h)
    }
}

fn conv2d_no_bias(
    shape: (usize, usize, usize, usize),
    cfg: Conv2dConfig,
    vb: VarBuilder,
) -> candle_core::Result<Conv2d> {
    let weight = vb.get(shape, "weight")?;
    Ok(Conv2d::new(weight, None, cfg))
}
