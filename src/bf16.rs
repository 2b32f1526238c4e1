//! bf16 conversion primitives
//!
//! Implements the 16-bit truncated-float encoding used by the convolution
//! kernels: a `Bf16` value is the upper half of an IEEE 754 f32 bit pattern
//! (1 sign bit, 8 exponent bits, 7 mantissa bits). Encoding truncates the
//! low 16 mantissa bits; decoding zero-extends them back.
//!
//! Batch conversion dispatches once per call to the best available backend:
//! - AVX-512BW: 32 elements per iteration (two 16-lane sub-tiles), with
//!   mask-register tail handling for partial tiles
//! - Scalar fallback on all other hardware
//!
//! Scalar and vectorized outputs are bit-identical for every input.

use serde::{Deserialize, Serialize};

/// 16-bit truncated float (brain float)
///
/// Stores the upper 16 bits of an f32: sign, full 8-bit exponent, and the
/// top 7 mantissa bits. Conversion to f32 is exact on the retained bits.
///
/// # Examples
///
/// ```
/// use reducir::Bf16;
///
/// let x = Bf16::from_f32(1.0);
/// assert_eq!(x.to_f32(), 1.0);
///
/// // Encoding is lossy: low mantissa bits are dropped
/// let y = Bf16::from_f32(1.0 + f32::EPSILON);
/// assert_eq!(y.to_f32(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Bf16(u16);

impl Bf16 {
    /// Encoded zero
    pub const ZERO: Bf16 = Bf16(0);

    /// Encode an f32 by truncating the low 16 mantissa bits
    #[inline]
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Bf16((value.to_bits() >> 16) as u16)
    }

    /// Decode to f32 by zero-extending into the upper half
    #[inline]
    #[must_use]
    pub fn to_f32(self) -> f32 {
        f32::from_bits(u32::from(self.0) << 16)
    }

    /// Raw bit pattern
    #[inline]
    #[must_use]
    pub fn to_bits(self) -> u16 {
        self.0
    }

    /// Construct from a raw bit pattern
    #[inline]
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        Bf16(bits)
    }
}

impl From<f32> for Bf16 {
    fn from(value: f32) -> Self {
        Bf16::from_f32(value)
    }
}

impl From<Bf16> for f32 {
    fn from(value: Bf16) -> f32 {
        value.to_f32()
    }
}

/// SIMD backend detected at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimdBackend {
    /// AVX-512BW (512-bit, mask registers)
    Avx512,
    /// Scalar fallback
    #[default]
    Scalar,
}

impl std::fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimdBackend::Avx512 => write!(f, "AVX-512BW"),
            SimdBackend::Scalar => write!(f, "Scalar"),
        }
    }
}

/// Detect the best available conversion backend
pub fn detect_backend() -> SimdBackend {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
            return SimdBackend::Avx512;
        }
    }
    SimdBackend::Scalar
}

/// Batch-encode a contiguous run of f32 values
///
/// # Panics
/// Panics if `src.len() != dst.len()`
pub fn f32_to_bf16(src: &[f32], dst: &mut [Bf16]) {
    assert_eq!(
        src.len(),
        dst.len(),
        "f32_to_bf16: src and dst must have same length"
    );

    #[cfg(target_arch = "x86_64")]
    {
        if detect_backend() == SimdBackend::Avx512 {
            // SAFETY: AVX-512F and AVX-512BW are available, lengths match
            unsafe {
                f32_to_bf16_avx512(src, dst);
            }
            return;
        }
    }

    f32_to_bf16_scalar(src, dst);
}

/// Batch-decode a contiguous run of bf16 values
///
/// # Panics
/// Panics if `src.len() != dst.len()`
pub fn bf16_to_f32(src: &[Bf16], dst: &mut [f32]) {
    assert_eq!(
        src.len(),
        dst.len(),
        "bf16_to_f32: src and dst must have same length"
    );

    #[cfg(target_arch = "x86_64")]
    {
        if detect_backend() == SimdBackend::Avx512 {
            // SAFETY: AVX-512F and AVX-512BW are available, lengths match
            unsafe {
                bf16_to_f32_avx512(src, dst);
            }
            return;
        }
    }

    bf16_to_f32_scalar(src, dst);
}

/// Scalar encode loop
pub(crate) fn f32_to_bf16_scalar(src: &[f32], dst: &mut [Bf16]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = Bf16::from_f32(s);
    }
}

/// Scalar decode loop
pub(crate) fn bf16_to_f32_scalar(src: &[Bf16], dst: &mut [f32]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = s.to_f32();
    }
}

/// Mask selecting the low `n` of 16 lanes (`n` is clamped to 16)
#[cfg(target_arch = "x86_64")]
#[inline]
fn tail_mask16(n: usize) -> u16 {
    if n >= 16 {
        u16::MAX
    } else {
        ((1u32 << n) - 1) as u16
    }
}

/// Mask selecting the low `n` of 32 lanes (`n` is clamped to 32)
#[cfg(target_arch = "x86_64")]
#[inline]
fn tail_mask32(n: usize) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

/// AVX-512 encode: 32 f32 -> 32 bf16 per iteration, masked tail
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn f32_to_bf16_avx512(src: &[f32], dst: &mut [Bf16]) {
    #[allow(clippy::wildcard_imports)]
    use std::arch::x86_64::*;

    let len = src.len();
    let full = len & !31;
    let dst_ptr = dst.as_mut_ptr().cast::<u16>();
    let mut i = 0;

    while i < full {
        let s0 = _mm512_loadu_ps(src.as_ptr().add(i));
        let s1 = _mm512_loadu_ps(src.as_ptr().add(i + 16));
        let d0 = _mm512_srli_epi32::<16>(_mm512_castps_si512(s0));
        let d1 = _mm512_srli_epi32::<16>(_mm512_castps_si512(s1));
        // Narrow each 32-bit lane to its low 16 bits and pack the two
        // sub-tiles into one 512-bit store
        let lo = _mm512_cvtepi32_epi16(d0);
        let hi = _mm512_cvtepi32_epi16(d1);
        let packed = _mm512_inserti64x4::<1>(_mm512_castsi256_si512(lo), hi);
        _mm512_storeu_si512(dst_ptr.add(i).cast(), packed);
        i += 32;
    }

    if i < len {
        let rem = len - i;
        let src_mask0 = tail_mask16(rem);
        let dst_mask = tail_mask32(rem);
        let s0 = _mm512_maskz_loadu_ps(src_mask0, src.as_ptr().add(i));
        let s1 = if rem > 16 {
            let src_mask1 = tail_mask16(rem - 16);
            _mm512_maskz_loadu_ps(src_mask1, src.as_ptr().add(i + 16))
        } else {
            _mm512_setzero_ps()
        };
        let d0 = _mm512_srli_epi32::<16>(_mm512_castps_si512(s0));
        let d1 = _mm512_srli_epi32::<16>(_mm512_castps_si512(s1));
        let lo = _mm512_cvtepi32_epi16(d0);
        let hi = _mm512_cvtepi32_epi16(d1);
        let packed = _mm512_inserti64x4::<1>(_mm512_castsi256_si512(lo), hi);
        _mm512_mask_storeu_epi16(dst_ptr.add(i).cast(), dst_mask, packed);
    }
}

/// AVX-512 decode: 32 bf16 -> 32 f32 per iteration, masked tail
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn bf16_to_f32_avx512(src: &[Bf16], dst: &mut [f32]) {
    #[allow(clippy::wildcard_imports)]
    use std::arch::x86_64::*;

    let len = src.len();
    let full = len & !31;
    let src_ptr = src.as_ptr().cast::<u16>();
    let mut i = 0;

    while i < full {
        let v = _mm512_loadu_si512(src_ptr.add(i).cast());
        let s0 = _mm512_cvtepu16_epi32(_mm512_castsi512_si256(v));
        let s1 = _mm512_cvtepu16_epi32(_mm512_extracti64x4_epi64::<1>(v));
        let f0 = _mm512_castsi512_ps(_mm512_slli_epi32::<16>(s0));
        let f1 = _mm512_castsi512_ps(_mm512_slli_epi32::<16>(s1));
        _mm512_storeu_ps(dst.as_mut_ptr().add(i), f0);
        _mm512_storeu_ps(dst.as_mut_ptr().add(i + 16), f1);
        i += 32;
    }

    if i < len {
        let rem = len - i;
        let src_mask = tail_mask32(rem);
        let v = _mm512_maskz_loadu_epi16(src_mask, src_ptr.add(i).cast());
        let s0 = _mm512_cvtepu16_epi32(_mm512_castsi512_si256(v));
        let f0 = _mm512_castsi512_ps(_mm512_slli_epi32::<16>(s0));
        let dst_mask0 = tail_mask16(rem);
        _mm512_mask_storeu_ps(dst.as_mut_ptr().add(i), dst_mask0, f0);
        if rem > 16 {
            let s1 = _mm512_cvtepu16_epi32(_mm512_extracti64x4_epi64::<1>(v));
            let f1 = _mm512_castsi512_ps(_mm512_slli_epi32::<16>(s1));
            let dst_mask1 = tail_mask16(rem - 16);
            _mm512_mask_storeu_ps(dst.as_mut_ptr().add(i + 16), dst_mask1, f1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_exact_values() {
        // Values with at most 7 mantissa bits survive the round trip exactly
        for &v in &[0.0f32, 1.0, -1.0, 0.5, 2.0, -0.25, 128.0, -1024.0] {
            assert_eq!(Bf16::from_f32(v).to_f32(), v, "roundtrip of {v}");
        }
    }

    #[test]
    fn test_truncation_drops_low_mantissa() {
        let x = f32::from_bits(0x3F80_FFFF); // 1.0 + junk in low 16 bits
        let encoded = Bf16::from_f32(x);
        assert_eq!(encoded.to_bits(), 0x3F80);
        assert_eq!(encoded.to_f32(), 1.0);
    }

    #[test]
    fn test_sign_and_exponent_preserved() {
        let x = -3.75e-12f32;
        let decoded = Bf16::from_f32(x).to_f32();
        assert!(decoded < 0.0);
        assert_eq!(decoded.to_bits() >> 23, x.to_bits() >> 23);
    }

    #[test]
    fn test_special_values() {
        assert!(Bf16::from_f32(f32::INFINITY).to_f32().is_infinite());
        assert!(Bf16::from_f32(f32::NEG_INFINITY).to_f32() < 0.0);
        assert!(Bf16::from_f32(f32::NAN).to_f32().is_nan());
        assert_eq!(Bf16::from_f32(-0.0).to_bits(), 0x8000);
    }

    #[test]
    fn test_zero_constant() {
        assert_eq!(Bf16::ZERO.to_f32(), 0.0);
        assert_eq!(Bf16::default(), Bf16::ZERO);
    }

    #[test]
    fn test_matches_half_crate_truncate() {
        // half's bf16 rounds to nearest even; agreement is exact whenever
        // the dropped bits are zero
        for bits in (0u16..=0x7F7F).step_by(13) {
            let v = f32::from_bits(u32::from(bits) << 16);
            assert_eq!(
                Bf16::from_f32(v).to_f32(),
                half::bf16::from_f32(v).to_f32(),
                "bits 0x{bits:04X}"
            );
        }
    }

    #[test]
    fn test_batch_tail_sizes() {
        // Exercise every tail size across a few vector tiles, including the
        // exact tile boundaries at 32, 64, 96, 128
        for size in 0..=130 {
            let src: Vec<f32> = (0..size).map(|i| (i as f32 - 40.0) * 1.7).collect();
            let mut encoded = vec![Bf16::ZERO; size];
            f32_to_bf16(&src, &mut encoded);

            for (i, (&e, &s)) in encoded.iter().zip(src.iter()).enumerate() {
                assert_eq!(e, Bf16::from_f32(s), "encode size={size} index={i}");
            }

            let mut decoded = vec![0.0f32; size];
            bf16_to_f32(&encoded, &mut decoded);
            for (i, (&d, &e)) in decoded.iter().zip(encoded.iter()).enumerate() {
                assert_eq!(
                    d.to_bits(),
                    e.to_f32().to_bits(),
                    "decode size={size} index={i}"
                );
            }
        }
    }

    #[test]
    fn test_batch_matches_scalar_reference() {
        let src: Vec<f32> = (0..257).map(|i| (i as f32).sin() * 1e3).collect();
        let mut batch = vec![Bf16::ZERO; src.len()];
        let mut scalar = vec![Bf16::ZERO; src.len()];
        f32_to_bf16(&src, &mut batch);
        f32_to_bf16_scalar(&src, &mut scalar);
        assert_eq!(batch, scalar);

        let mut batch_f = vec![0.0f32; src.len()];
        let mut scalar_f = vec![0.0f32; src.len()];
        bf16_to_f32(&batch, &mut batch_f);
        bf16_to_f32_scalar(&scalar, &mut scalar_f);
        let batch_bits: Vec<u32> = batch_f.iter().map(|v| v.to_bits()).collect();
        let scalar_bits: Vec<u32> = scalar_f.iter().map(|v| v.to_bits()).collect();
        assert_eq!(batch_bits, scalar_bits);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_batch_length_mismatch_panics() {
        let src = [1.0f32; 4];
        let mut dst = [Bf16::ZERO; 3];
        f32_to_bf16(&src, &mut dst);
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(format!("{}", SimdBackend::Avx512), "AVX-512BW");
        assert_eq!(format!("{}", SimdBackend::Scalar), "Scalar");
        assert_eq!(SimdBackend::default(), SimdBackend::Scalar);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Decode-then-encode is identity on the retained bits
        #[test]
        fn prop_decode_encode_identity(bits in any::<u16>()) {
            let x = Bf16::from_bits(bits);
            prop_assert_eq!(Bf16::from_f32(x.to_f32()), x);
        }

        /// Encode-then-decode preserves sign, exponent, and top 7 mantissa bits
        #[test]
        fn prop_roundtrip_retains_top_bits(x in any::<f32>()) {
            let decoded = Bf16::from_f32(x).to_f32();
            prop_assert_eq!(decoded.to_bits(), x.to_bits() & 0xFFFF_0000);
        }

        /// Encoding is monotone on nonnegative finite values
        #[test]
        fn prop_encode_monotonic_nonnegative(
            a in 0.0f32..f32::MAX,
            b in 0.0f32..f32::MAX,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Bf16::from_f32(lo).to_bits() <= Bf16::from_f32(hi).to_bits());
        }

        /// Round trip error is bounded by one unit in the last retained
        /// mantissa bit (2^-7 relative)
        #[test]
        fn prop_roundtrip_error_bound(x in -1e30f32..1e30f32) {
            // relative bound does not hold for subnormals
            prop_assume!(x == 0.0 || x.abs() >= f32::MIN_POSITIVE);
            let decoded = Bf16::from_f32(x).to_f32();
            let tolerance = x.abs() / 128.0;
            prop_assert!((x - decoded).abs() <= tolerance,
                "x={} decoded={} tol={}", x, decoded, tolerance);
        }
    }
}
