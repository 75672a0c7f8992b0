use candle_core::Tensor;
use candle_nn::VarBuilder;

/// Inference-mode 2-D batch normalization over the channel axis of a
/// `(batch, channels, height, width)` tensor, using the checkpoint's
/// running statistics. Mirrors PyTorch `BatchNorm2d.eval()`.
pub(crate) struct BatchNorm2d {
    weight: Tensor,
    bias: Tensor,
    running_mean: Tensor,
    running_var: Tensor,
    eps: f64,
}

impl BatchNorm2d {
    pub(crate) fn load(channels: usize, eps: f64, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            weight: vb.get(channels, "weight")?,
            bias: vb.get(channels, "bias")?,
            running_mean: vb.get(channels, "running_mean")?,
            running_var: vb.get(channels, "running_var")?,
            eps,
        })
    }

    pub(crate) fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let c = self.weight.dim(0)?;
        let shape = (1, c, 1, 1);
        let mean = self.running_mean.reshape(shape)?;
        let var = self.running_var.reshape(shape)?;
        let weight = self.weight.reshape(shape)?;
        let bias = self.bias.reshape(shape)?;
        x.broadcast_sub(&mean)?
            .broadcast_div(&(var + self.eps)?.sqrt()?)?
            .broadcast_mul(&weight)?
            .broadcast_add(&bias)
    }
}

pub(crate) fn batch_norm_2d(
    channels: usize,
    eps: f64,
    vb: VarBuilder,
) -> candle_core::Result<BatchNorm2d> {
    BatchNorm2d::load(channels, eps, vb)
}
