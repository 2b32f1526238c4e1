//! Convolution executor: orchestrates layout transform, per-group GEMM,
//! and the fused epilogue

use crate::bf16::{f32_to_bf16, Bf16};
use crate::error::{ReducirError, Result};

use super::epilogue::bias_and_activation;
use super::gemm::gemm_bf16;
use super::geometry::GemmShape;
use super::im2col::{img_to_col, img_to_row};
use super::param::{ConvParam, TensorFormat};

/// bf16 GEMM convolution executor
///
/// Geometry is fixed at construction; weights are encoded once per
/// [`set_params`](Bf16ConvGemm::set_params) call and read-only during
/// forward passes. `forward` takes `&self`, so one executor may serve
/// concurrent forward calls as long as each call owns its scratch and
/// destination buffers.
///
/// # Examples
///
/// ```
/// use reducir::conv::{Activation, Bf16ConvGemm, ConvParam, TensorFormat};
/// use reducir::Bf16;
///
/// // 1x1x3x3 source, 2x2 kernel, stride 1, no padding
/// let param = ConvParam {
///     batch: 1,
///     src_c: 1, src_h: 3, src_w: 3,
///     dst_c: 1, dst_h: 2, dst_w: 2,
///     kernel_y: 2, kernel_x: 2,
///     stride_y: 1, stride_x: 1,
///     pad_y: 0, pad_x: 0,
///     dilation_y: 1, dilation_x: 1,
///     group: 1,
///     format: TensorFormat::Nchw,
///     activation: Activation::Identity,
/// };
/// let mut conv = Bf16ConvGemm::new(param)?;
/// conv.set_params(&[1.0, 0.0, 0.0, 1.0], None, None)?;
///
/// let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
/// let mut scratch = vec![Bf16::ZERO; conv.external_buffer_size()];
/// let mut dst = [0.0f32; 4];
/// conv.forward(&src, &mut scratch, &mut dst)?;
///
/// // diagonal-tap kernel sums each 2x2 patch's diagonal
/// assert_eq!(dst, [6.0, 8.0, 12.0, 14.0]);
/// # Ok::<(), reducir::ReducirError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Bf16ConvGemm {
    param: ConvParam,
    shape: GemmShape,
    weight: Vec<Bf16>,
    bias: Vec<f32>,
    act_params: Vec<f32>,
}

impl Bf16ConvGemm {
    /// Construct an executor for the given geometry
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if the geometry fails
    /// [`ConvParam::validate`].
    pub fn new(param: ConvParam) -> Result<Self> {
        param.validate()?;
        let shape = GemmShape::resolve(&param);
        Ok(Self {
            param,
            shape,
            weight: Vec::new(),
            bias: Vec::new(),
            act_params: Vec::new(),
        })
    }

    /// Required scratch buffer length in elements
    ///
    /// One batch element's expanded patches, times the batch-merge factor
    /// (1 in the reference path).
    #[must_use]
    pub fn external_buffer_size(&self) -> usize {
        self.shape.size_b * self.shape.merge
    }

    /// The convolution geometry this executor was built for
    #[must_use]
    pub fn param(&self) -> &ConvParam {
        &self.param
    }

    /// The derived GEMM shape
    #[must_use]
    pub fn gemm_shape(&self) -> &GemmShape {
        &self.shape
    }

    /// Bind weights, bias, and activation parameters
    ///
    /// Encodes the f32 weight tensor into an internally owned bf16 copy;
    /// callers may drop or reuse `weight` afterwards. May be called again
    /// to replace the parameters.
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if `weight` does not match the geometry's
    /// weight tensor length, `bias` is present but shorter than `dst_c`,
    /// or `params` does not cover the activation's parameter count.
    pub fn set_params(
        &mut self,
        weight: &[f32],
        bias: Option<&[f32]>,
        params: Option<&[f32]>,
    ) -> Result<()> {
        if weight.len() != self.shape.weight_len {
            return Err(ReducirError::SizeMismatch {
                what: "weight",
                expected: self.shape.weight_len,
                actual: weight.len(),
            });
        }
        if let Some(bias) = bias {
            if bias.len() != self.param.dst_c {
                return Err(ReducirError::SizeMismatch {
                    what: "bias",
                    expected: self.param.dst_c,
                    actual: bias.len(),
                });
            }
        }
        let needed = self.param.activation.param_count(self.param.dst_c);
        let params = params.unwrap_or(&[]);
        if params.len() < needed {
            return Err(ReducirError::SizeMismatch {
                what: "activation params",
                expected: needed,
                actual: params.len(),
            });
        }

        self.weight.resize(weight.len(), Bf16::ZERO);
        f32_to_bf16(weight, &mut self.weight);
        self.bias = bias.map_or_else(Vec::new, <[f32]>::to_vec);
        self.act_params = params.to_vec();
        Ok(())
    }

    /// Run the forward pass
    ///
    /// For each batch element: layout transform into `buf`, per-group
    /// mixed-precision GEMM into the destination slice, then the fused
    /// bias + activation epilogue. `buf` contents are undefined on entry
    /// and not meaningful on return.
    ///
    /// # Errors
    ///
    /// Returns `WeightsNotSet` before the first successful `set_params`,
    /// or `SizeMismatch` if `src`, `buf`, or `dst` are not sized to
    /// `batch * src_size`,
    /// [`external_buffer_size`](Bf16ConvGemm::external_buffer_size), and
    /// `batch * dst_size`.
    pub fn forward(&self, src: &[f32], buf: &mut [Bf16], dst: &mut [f32]) -> Result<()> {
        if self.weight.is_empty() {
            return Err(ReducirError::WeightsNotSet);
        }
        let p = &self.param;
        let s = &self.shape;
        self.check_len("src", src.len(), p.batch * s.size_s)?;
        self.check_len("dst", dst.len(), p.batch * s.size_d)?;
        if buf.len() < self.external_buffer_size() {
            return Err(ReducirError::SizeMismatch {
                what: "scratch",
                expected: self.external_buffer_size(),
                actual: buf.len(),
            });
        }

        let bias = (!self.bias.is_empty()).then_some(self.bias.as_slice());
        for b in 0..p.batch {
            let src_b = &src[b * s.size_s..(b + 1) * s.size_s];
            let dst_b = &mut dst[b * s.size_d..(b + 1) * s.size_d];
            match p.format {
                TensorFormat::Nhwc => {
                    img_to_row(p, src_b, buf);
                    for g in 0..p.group {
                        gemm_bf16(
                            s.m,
                            s.n,
                            s.k,
                            &buf[s.gr_s * g..],
                            s.ld_s,
                            &self.weight[s.gr_w * g..],
                            s.ld_w,
                            &mut dst_b[s.gr_d * g..],
                            s.ld_d,
                        );
                    }
                }
                TensorFormat::Nchw => {
                    img_to_col(p, src_b, buf);
                    for g in 0..p.group {
                        gemm_bf16(
                            s.m,
                            s.n,
                            s.k,
                            &self.weight[s.gr_w * g..],
                            s.ld_w,
                            &buf[s.gr_s * g..],
                            s.ld_s,
                            &mut dst_b[s.gr_d * g..],
                            s.ld_d,
                        );
                    }
                }
            }
            bias_and_activation(
                bias,
                p.dst_c,
                p.dst_h * p.dst_w,
                p.activation,
                &self.act_params,
                p.format,
                dst_b,
            );
        }
        Ok(())
    }

    fn check_len(&self, what: &'static str, actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(ReducirError::SizeMismatch {
                what,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
