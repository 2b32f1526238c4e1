//! bf16 GEMM convolution
//!
//! Forward-pass convolution over f32 tensors with operands held in the
//! 16-bit truncated-float encoding and accumulation in f32. The pipeline:
//!
//! 1. [`GemmShape::resolve`] maps the convolution geometry to GEMM
//!    dimensions, leading strides, and per-group offsets (cached per
//!    executor)
//! 2. [`img_to_col`] / [`img_to_row`] expand one source image into a bf16
//!    patch matrix with implicit zero padding
//! 3. [`gemm_bf16`] multiplies the encoded weights against the patches,
//!    accumulating in f32
//! 4. [`bias_and_activation`] applies the per-channel bias and the fused
//!    activation in place
//!
//! [`Bf16ConvGemm`] orchestrates the pipeline per batch element and per
//! group and owns the encoded weight copy. This is the scalar reference
//! path; per-ISA accelerated backends share the same contract and must stay
//! numerically compatible with it.

mod epilogue;
mod executor;
mod gemm;
mod geometry;
mod im2col;
mod param;

pub use epilogue::bias_and_activation;
pub use executor::Bf16ConvGemm;
pub use gemm::gemm_bf16;
pub use geometry::GemmShape;
pub use im2col::{img_to_col, img_to_row};
pub use param::{Activation, ConvParam, TensorFormat};
