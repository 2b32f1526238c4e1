//! GEMM shape derivation from convolution geometry

use super::param::{ConvParam, TensorFormat};

/// GEMM dimensions, leading strides, and per-group offsets derived from a
/// [`ConvParam`]
///
/// Resolved once at executor construction and cached for its lifetime. The
/// two layouts are asymmetric: channel-last weights keep the channel axis
/// contiguous and shared across groups (`ld_w = dst_c`), while channel-first
/// weights are fully separated per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmShape {
    /// Output rows per group
    pub m: usize,
    /// Output columns per group
    pub n: usize,
    /// Reduction length per group
    pub k: usize,
    /// Weight leading dimension
    pub ld_w: usize,
    /// Source (patch buffer) leading dimension
    pub ld_s: usize,
    /// Destination leading dimension
    pub ld_d: usize,
    /// Weight offset between groups
    pub gr_w: usize,
    /// Patch buffer offset between groups
    pub gr_s: usize,
    /// Destination offset between groups
    pub gr_d: usize,
    /// Batch-merge factor; the reference path uses 1, accelerated backends
    /// may batch several images through one GEMM call
    pub merge: usize,
    /// Elements in one source image
    pub size_s: usize,
    /// Elements in one image's expanded patch buffer
    pub size_b: usize,
    /// Elements in one destination image
    pub size_d: usize,
    /// Encoded weight buffer length covering all groups
    pub weight_len: usize,
}

impl GemmShape {
    /// Derive the GEMM shape for the given convolution geometry
    #[must_use]
    pub fn resolve(p: &ConvParam) -> Self {
        let k = p.src_c * p.kernel_y * p.kernel_x / p.group;
        let (m, n, ld_w, ld_s, ld_d, gr_w, gr_s, gr_d, weight_len) = match p.format {
            TensorFormat::Nhwc => {
                let m = p.dst_h * p.dst_w;
                let n = p.dst_c / p.group;
                // Weights are [k][dst_c]: rows stride over the full channel
                // axis, groups offset by columns only
                (m, n, p.dst_c, k, p.dst_c, n, k * m, n, k * p.dst_c)
            }
            TensorFormat::Nchw => {
                let m = p.dst_c / p.group;
                let n = p.dst_h * p.dst_w;
                (m, n, k, n, n, m * k, k * n, m * n, p.group * m * k)
            }
        };
        GemmShape {
            m,
            n,
            k,
            ld_w,
            ld_s,
            ld_d,
            gr_w,
            gr_s,
            gr_d,
            merge: 1,
            size_s: p.src_size(),
            size_b: p.src_c * p.kernel_y * p.kernel_x * p.dst_h * p.dst_w,
            size_d: p.dst_size(),
            weight_len,
        }
    }
}
