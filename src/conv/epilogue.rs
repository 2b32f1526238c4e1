//! Fused bias + activation epilogue
//!
//! Applied in place over one destination image after all groups of its GEMM
//! have been written. Pure elementwise pass: per-output-channel bias add,
//! then the configured activation.

use super::param::{Activation, TensorFormat};

#[inline]
fn apply(activation: Activation, params: &[f32], channel: usize, x: f32) -> f32 {
    match activation {
        Activation::Identity => x,
        Activation::Relu => x.max(0.0),
        Activation::LeakyRelu => {
            if x > 0.0 {
                x
            } else {
                params[0] * x
            }
        }
        Activation::RestrictRange => x.clamp(params[0], params[1]),
        Activation::Prelu => {
            if x > 0.0 {
                x
            } else {
                params[channel] * x
            }
        }
        Activation::Elu => {
            if x > 0.0 {
                x
            } else {
                params[0] * (x.exp() - 1.0)
            }
        }
        Activation::HardSigmoid => (x * params[0] + params[1]).clamp(0.0, 1.0),
        Activation::Swish => x / (1.0 + (-params[0] * x).exp()),
    }
}

/// Add per-channel bias and apply the activation, in place
///
/// `dst` holds one image of `dst_c * spatial` elements in the given layout.
/// `params` must satisfy [`Activation::param_count`] for the activation;
/// `bias` is skipped when `None`.
pub fn bias_and_activation(
    bias: Option<&[f32]>,
    dst_c: usize,
    spatial: usize,
    activation: Activation,
    params: &[f32],
    format: TensorFormat,
    dst: &mut [f32],
) {
    match format {
        TensorFormat::Nchw => {
            for c in 0..dst_c {
                let b = bias.map_or(0.0, |bias| bias[c]);
                for v in &mut dst[c * spatial..(c + 1) * spatial] {
                    *v = apply(activation, params, c, *v + b);
                }
            }
        }
        TensorFormat::Nhwc => {
            for s in 0..spatial {
                let row = &mut dst[s * dst_c..(s + 1) * dst_c];
                for (c, v) in row.iter_mut().enumerate() {
                    let b = bias.map_or(0.0, |bias| bias[c]);
                    *v = apply(activation, params, c, *v + b);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_only_nchw() {
        let mut dst = vec![1.0, 2.0, 3.0, 4.0]; // 2 channels x 2 spatial
        bias_and_activation(
            Some(&[10.0, 20.0]),
            2,
            2,
            Activation::Identity,
            &[],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert_eq!(dst, vec![11.0, 12.0, 23.0, 24.0]);
    }

    #[test]
    fn test_bias_only_nhwc() {
        let mut dst = vec![1.0, 2.0, 3.0, 4.0]; // 2 spatial x 2 channels
        bias_and_activation(
            Some(&[10.0, 20.0]),
            2,
            2,
            Activation::Identity,
            &[],
            TensorFormat::Nhwc,
            &mut dst,
        );
        assert_eq!(dst, vec![11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_relu() {
        let mut dst = vec![-1.0, 2.0];
        bias_and_activation(None, 1, 2, Activation::Relu, &[], TensorFormat::Nchw, &mut dst);
        assert_eq!(dst, vec![0.0, 2.0]);
    }

    #[test]
    fn test_leaky_relu() {
        let mut dst = vec![-2.0, 4.0];
        bias_and_activation(
            None,
            1,
            2,
            Activation::LeakyRelu,
            &[0.1],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert!((dst[0] + 0.2).abs() < 1e-6);
        assert_eq!(dst[1], 4.0);
    }

    #[test]
    fn test_restrict_range() {
        let mut dst = vec![-5.0, 0.5, 5.0];
        bias_and_activation(
            None,
            1,
            3,
            Activation::RestrictRange,
            &[-1.0, 1.0],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert_eq!(dst, vec![-1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_prelu_per_channel_slope() {
        let mut dst = vec![-1.0, -1.0]; // 2 channels x 1 spatial
        bias_and_activation(
            None,
            2,
            1,
            Activation::Prelu,
            &[0.5, 0.25],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert_eq!(dst, vec![-0.5, -0.25]);
    }

    #[test]
    fn test_elu() {
        let mut dst = vec![-1.0, 3.0];
        bias_and_activation(None, 1, 2, Activation::Elu, &[1.0], TensorFormat::Nchw, &mut dst);
        assert!((dst[0] - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
        assert_eq!(dst[1], 3.0);
    }

    #[test]
    fn test_hard_sigmoid() {
        let mut dst = vec![-10.0, 0.0, 10.0];
        bias_and_activation(
            None,
            1,
            3,
            Activation::HardSigmoid,
            &[0.2, 0.5],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert_eq!(dst, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_swish() {
        let mut dst = vec![1.0];
        bias_and_activation(None, 1, 1, Activation::Swish, &[1.0], TensorFormat::Nchw, &mut dst);
        let expected = 1.0 / (1.0 + (-1.0f32).exp());
        assert!((dst[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bias_applied_before_activation() {
        // -3 + 2 = -1 -> relu -> 0
        let mut dst = vec![-3.0];
        bias_and_activation(
            Some(&[2.0]),
            1,
            1,
            Activation::Relu,
            &[],
            TensorFormat::Nchw,
            &mut dst,
        );
        assert_eq!(dst, vec![0.0]);
    }
}
