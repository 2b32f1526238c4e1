//! im2col / im2row layout transforms with fused bf16 encoding
//!
//! Expands one source image into the patch matrix consumed by the GEMM,
//! encoding each sampled value to bf16 on the way out. Taps that fall in
//! the padding region emit encoded zeros; nothing outside the source is
//! ever read.

use crate::bf16::{f32_to_bf16, Bf16};

use super::param::ConvParam;

/// Channel-first (NCHW) im2col
///
/// Output patch layout: `[src_c * kernel_y * kernel_x] x [dst_h * dst_w]`.
/// `dst` must hold at least `size_b` elements.
pub fn img_to_col(p: &ConvParam, src: &[f32], dst: &mut [Bf16]) {
    debug_assert_eq!(p.format, super::param::TensorFormat::Nchw);
    let src_h = p.src_h as isize;
    let src_w = p.src_w as isize;
    let src_size = p.src_h * p.src_w;
    let mut out = 0;
    for c in 0..p.src_c {
        let channel = &src[c * src_size..(c + 1) * src_size];
        for ky in 0..p.kernel_y {
            for kx in 0..p.kernel_x {
                for dy in 0..p.dst_h {
                    let sy = (dy * p.stride_y + ky * p.dilation_y) as isize - p.pad_y as isize;
                    if sy >= 0 && sy < src_h {
                        let row = sy as usize * p.src_w;
                        for dx in 0..p.dst_w {
                            let sx =
                                (dx * p.stride_x + kx * p.dilation_x) as isize - p.pad_x as isize;
                            dst[out] = if sx >= 0 && sx < src_w {
                                Bf16::from_f32(channel[row + sx as usize])
                            } else {
                                Bf16::ZERO
                            };
                            out += 1;
                        }
                    } else {
                        dst[out..out + p.dst_w].fill(Bf16::ZERO);
                        out += p.dst_w;
                    }
                }
            }
        }
    }
}

/// Channel-last (NHWC) im2row
///
/// Output patch layout per group:
/// `[dst_h * dst_w] x [src_c * kernel_y * kernel_x / group]`, groups
/// concatenated. In-bounds kernel taps batch-encode a contiguous run of
/// `src_c / group` channels; an out-of-bounds row zero-fills the whole
/// `kernel_x` span at once.
pub fn img_to_row(p: &ConvParam, src: &[f32], dst: &mut [Bf16]) {
    debug_assert_eq!(p.format, super::param::TensorFormat::Nhwc);
    let src_h = p.src_h as isize;
    let src_w = p.src_w as isize;
    let size = p.src_c / p.group;
    let mut out = 0;
    for g in 0..p.group {
        let ch = g * size;
        for dy in 0..p.dst_h {
            for dx in 0..p.dst_w {
                for ky in 0..p.kernel_y {
                    let sy = (dy * p.stride_y + ky * p.dilation_y) as isize - p.pad_y as isize;
                    if sy >= 0 && sy < src_h {
                        for kx in 0..p.kernel_x {
                            let sx =
                                (dx * p.stride_x + kx * p.dilation_x) as isize - p.pad_x as isize;
                            if sx >= 0 && sx < src_w {
                                let at = (sy as usize * p.src_w + sx as usize) * p.src_c + ch;
                                f32_to_bf16(&src[at..at + size], &mut dst[out..out + size]);
                            } else {
                                dst[out..out + size].fill(Bf16::ZERO);
                            }
                            out += size;
                        }
                    } else {
                        dst[out..out + p.kernel_x * size].fill(Bf16::ZERO);
                        out += p.kernel_x * size;
                    }
                }
            }
        }
    }
}
