//! # Reducir
//!
//! Reduced-precision convolution inference kernels for CPU.
//!
//! Reducir (Spanish: "to reduce") computes CNN forward passes with operands
//! held in a 16-bit truncated-float (bf16) encoding, halving memory
//! bandwidth while accumulating in full f32 precision. It provides the
//! correctness-first scalar reference engine that per-ISA accelerated
//! backends are measured against, plus a vectorized AVX-512 conversion
//! primitive with masked tail handling.
//!
//! ## Features
//!
//! - **bf16 codec**: scalar and AVX-512BW batch conversion, bit-identical
//! - **im2col / im2row**: channel-first and channel-last patch expansion
//!   with implicit zero padding, fused with bf16 encoding
//! - **Mixed-precision GEMM**: bf16 operands, f32 accumulation
//! - **Fused epilogue**: per-channel bias plus eight activation kinds
//! - **Grouped convolution**: stride, padding, and dilation supported in
//!   both layouts
//!
//! ## Example
//!
//! ```rust
//! use reducir::conv::{Activation, Bf16ConvGemm, ConvParam, TensorFormat};
//! use reducir::Bf16;
//!
//! let param = ConvParam {
//!     batch: 1,
//!     src_c: 1, src_h: 3, src_w: 3,
//!     dst_c: 1, dst_h: 2, dst_w: 2,
//!     kernel_y: 2, kernel_x: 2,
//!     stride_y: 1, stride_x: 1,
//!     pad_y: 0, pad_x: 0,
//!     dilation_y: 1, dilation_x: 1,
//!     group: 1,
//!     format: TensorFormat::Nchw,
//!     activation: Activation::Identity,
//! };
//! let mut conv = Bf16ConvGemm::new(param)?;
//! conv.set_params(&[1.0, 0.0, 0.0, 1.0], None, None)?;
//!
//! let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
//! let mut scratch = vec![Bf16::ZERO; conv.external_buffer_size()];
//! let mut dst = [0.0f32; 4];
//! conv.forward(&src, &mut scratch, &mut dst)?;
//! assert_eq!(dst, [6.0, 8.0, 12.0, 14.0]);
//! # Ok::<(), reducir::ReducirError>(())
//! ```
//!
//! ## Concurrency
//!
//! All kernels are synchronous pure computation. `forward` takes `&self`;
//! distinct executors, or one executor with per-call scratch and
//! destination buffers, may run on independent threads. `set_params` takes
//! `&mut self`, so the borrow checker serializes weight updates against
//! in-flight forwards.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f32 in tests and geometry
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)] // coordinate arithmetic uses isize
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)] // bit-exact comparisons are intentional
#![allow(clippy::doc_markdown)]

pub mod bf16;
pub mod conv;
pub mod error;

// Re-exports for convenience
pub use bf16::{bf16_to_f32, detect_backend, f32_to_bf16, Bf16, SimdBackend};
pub use error::{ReducirError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
