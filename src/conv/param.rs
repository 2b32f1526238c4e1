//! Convolution geometry and activation parameters

use serde::{Deserialize, Serialize};

use crate::error::{ReducirError, Result};

/// Memory layout of the source and destination tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorFormat {
    /// Channel-first: `[batch][channel][height][width]`
    Nchw,
    /// Channel-last: `[batch][height][width][channel]`
    Nhwc,
}

/// Activation applied by the fused epilogue
///
/// The meaning of the activation parameter vector depends on the kind:
/// - `LeakyRelu`: `params[0]` = negative slope
/// - `RestrictRange`: `params[0]` = lower bound, `params[1]` = upper bound
/// - `Prelu`: `params[c]` = per-channel negative slope
/// - `Elu`: `params[0]` = alpha
/// - `HardSigmoid`: `params[0]` = scale, `params[1]` = shift
/// - `Swish`: `params[0]` = slope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Pass-through
    #[default]
    Identity,
    /// `max(0, x)`
    Relu,
    /// `x > 0 ? x : slope * x`
    LeakyRelu,
    /// `clamp(x, lo, hi)`
    RestrictRange,
    /// Leaky ReLU with a per-channel slope
    Prelu,
    /// `x > 0 ? x : alpha * (exp(x) - 1)`
    Elu,
    /// `clamp(x * scale + shift, 0, 1)`
    HardSigmoid,
    /// `x * sigmoid(slope * x)`
    Swish,
}

impl Activation {
    /// Number of parameters the epilogue reads for this activation,
    /// given the destination channel count
    #[must_use]
    pub fn param_count(self, dst_c: usize) -> usize {
        match self {
            Activation::Identity | Activation::Relu => 0,
            Activation::LeakyRelu | Activation::Elu | Activation::Swish => 1,
            Activation::RestrictRange | Activation::HardSigmoid => 2,
            Activation::Prelu => dst_c,
        }
    }
}

/// Immutable convolution geometry
///
/// Fixed at executor construction. Destination spatial dims must be
/// consistent with the source dims, kernel, stride, pad, and dilation under
/// standard convolution arithmetic; use [`ConvParam::output_size`] to derive
/// them.
///
/// # Examples
///
/// ```
/// use reducir::conv::{ConvParam, TensorFormat, Activation};
///
/// let (dst_h, dst_w) = ConvParam::output_size(5, 5, 3, 3, 1, 1, 1, 1, 1, 1);
/// let param = ConvParam {
///     batch: 1,
///     src_c: 8, src_h: 5, src_w: 5,
///     dst_c: 16, dst_h, dst_w,
///     kernel_y: 3, kernel_x: 3,
///     stride_y: 1, stride_x: 1,
///     pad_y: 1, pad_x: 1,
///     dilation_y: 1, dilation_x: 1,
///     group: 1,
///     format: TensorFormat::Nchw,
///     activation: Activation::Relu,
/// };
/// assert!(param.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvParam {
    /// Number of images per forward call
    pub batch: usize,
    /// Source channels
    pub src_c: usize,
    /// Source height
    pub src_h: usize,
    /// Source width
    pub src_w: usize,
    /// Destination channels
    pub dst_c: usize,
    /// Destination height
    pub dst_h: usize,
    /// Destination width
    pub dst_w: usize,
    /// Kernel height
    pub kernel_y: usize,
    /// Kernel width
    pub kernel_x: usize,
    /// Vertical stride
    pub stride_y: usize,
    /// Horizontal stride
    pub stride_x: usize,
    /// Vertical padding (applied symmetrically)
    pub pad_y: usize,
    /// Horizontal padding (applied symmetrically)
    pub pad_x: usize,
    /// Vertical dilation
    pub dilation_y: usize,
    /// Horizontal dilation
    pub dilation_x: usize,
    /// Group count for grouped convolution
    pub group: usize,
    /// Tensor memory layout
    pub format: TensorFormat,
    /// Fused epilogue activation
    pub activation: Activation,
}

impl ConvParam {
    /// Destination spatial dims for the given convolution arithmetic
    ///
    /// An axis whose dilated kernel exceeds the padded source yields zero;
    /// [`validate`](ConvParam::validate) rejects such geometries.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn output_size(
        src_h: usize,
        src_w: usize,
        kernel_y: usize,
        kernel_x: usize,
        stride_y: usize,
        stride_x: usize,
        pad_y: usize,
        pad_x: usize,
        dilation_y: usize,
        dilation_x: usize,
    ) -> (usize, usize) {
        let span_y = dilation_y * (kernel_y - 1) + 1;
        let span_x = dilation_x * (kernel_x - 1) + 1;
        let dst_h = (src_h + 2 * pad_y)
            .checked_sub(span_y)
            .map_or(0, |r| r / stride_y + 1);
        let dst_w = (src_w + 2 * pad_x)
            .checked_sub(span_x)
            .map_or(0, |r| r / stride_x + 1);
        (dst_h, dst_w)
    }

    /// Check the geometry invariants
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if any dimension is zero, the group count does
    /// not divide both channel counts, the kernel (after dilation) exceeds
    /// the padded source extent, or the destination spatial dims are
    /// inconsistent with the convolution arithmetic.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("batch", self.batch),
            ("src_c", self.src_c),
            ("src_h", self.src_h),
            ("src_w", self.src_w),
            ("dst_c", self.dst_c),
            ("kernel_y", self.kernel_y),
            ("kernel_x", self.kernel_x),
            ("stride_y", self.stride_y),
            ("stride_x", self.stride_x),
            ("dilation_y", self.dilation_y),
            ("dilation_x", self.dilation_x),
            ("group", self.group),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(ReducirError::InvalidParam {
                    reason: format!("{name} must be > 0"),
                });
            }
        }

        if self.src_c % self.group != 0 || self.dst_c % self.group != 0 {
            return Err(ReducirError::InvalidParam {
                reason: format!(
                    "group {} must divide src_c {} and dst_c {}",
                    self.group, self.src_c, self.dst_c
                ),
            });
        }

        let span_y = self.dilation_y * (self.kernel_y - 1) + 1;
        let span_x = self.dilation_x * (self.kernel_x - 1) + 1;
        if span_y > self.src_h + 2 * self.pad_y || span_x > self.src_w + 2 * self.pad_x {
            return Err(ReducirError::InvalidParam {
                reason: format!(
                    "dilated kernel {span_y}x{span_x} exceeds padded source \
                     {}x{}",
                    self.src_h + 2 * self.pad_y,
                    self.src_w + 2 * self.pad_x
                ),
            });
        }

        let (dst_h, dst_w) = Self::output_size(
            self.src_h,
            self.src_w,
            self.kernel_y,
            self.kernel_x,
            self.stride_y,
            self.stride_x,
            self.pad_y,
            self.pad_x,
            self.dilation_y,
            self.dilation_x,
        );
        if dst_h != self.dst_h || dst_w != self.dst_w {
            return Err(ReducirError::InvalidParam {
                reason: format!(
                    "destination {}x{} inconsistent with convolution \
                     arithmetic (expected {dst_h}x{dst_w})",
                    self.dst_h, self.dst_w
                ),
            });
        }

        Ok(())
    }

    /// Element count of one source image
    #[must_use]
    pub fn src_size(&self) -> usize {
        self.src_c * self.src_h * self.src_w
    }

    /// Element count of one destination image
    #[must_use]
    pub fn dst_size(&self) -> usize {
        self.dst_c * self.dst_h * self.dst_w
    }

    /// Element count of the f32 weight tensor
    #[must_use]
    pub fn weight_size(&self) -> usize {
        self.dst_c * (self.src_c / self.group) * self.kernel_y * self.kernel_x
    }
}
