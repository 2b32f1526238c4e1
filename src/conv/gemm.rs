//! Mixed-precision GEMM reference kernel

use crate::bf16::Bf16;

/// `C = decode(A) x decode(B)` with f32 accumulation
///
/// Strict `i, k, j` loop nest; every output row is zero-initialized before
/// accumulation, so `C` need not be cleared by the caller. Operands are
/// decoded per scalar access. Accelerated implementations may reorder the
/// summation, which changes rounding but must stay within the tolerance the
/// test suite fixes for cross-backend equivalence.
///
/// Caller guarantees `lda >= k`, `ldb >= n`, `ldc >= n`, and that the slices
/// reach `(m-1)*lda + k`, `(k-1)*ldb + n`, and `(m-1)*ldc + n` elements
/// respectively.
#[allow(clippy::too_many_arguments)]
pub fn gemm_bf16(
    m: usize,
    n: usize,
    k: usize,
    a: &[Bf16],
    lda: usize,
    b: &[Bf16],
    ldb: usize,
    c: &mut [f32],
    ldc: usize,
) {
    debug_assert!(lda >= k && ldb >= n && ldc >= n);
    for i in 0..m {
        let row = &mut c[i * ldc..i * ldc + n];
        row.fill(0.0);
        for x in 0..k {
            let a_val = a[i * lda + x].to_f32();
            let b_row = &b[x * ldb..x * ldb + n];
            for (acc, &b_val) in row.iter_mut().zip(b_row.iter()) {
                *acc += a_val * b_val.to_f32();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[f32]) -> Vec<Bf16> {
        values.iter().map(|&v| Bf16::from_f32(v)).collect()
    }

    #[test]
    fn test_identity_times_matrix() {
        let a = encode(&[1.0, 0.0, 0.0, 1.0]);
        let b = encode(&[3.0, 4.0, 5.0, 6.0]);
        let mut c = vec![0.0f32; 4];
        gemm_bf16(2, 2, 2, &a, 2, &b, 2, &mut c, 2);
        assert_eq!(c, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_2x2_product() {
        let a = encode(&[1.0, 2.0, 3.0, 4.0]);
        let b = encode(&[5.0, 6.0, 7.0, 8.0]);
        let mut c = vec![0.0f32; 4];
        gemm_bf16(2, 2, 2, &a, 2, &b, 2, &mut c, 2);
        // exact: all operands fit in 7 mantissa bits
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_output_zero_initialized() {
        let a = encode(&[2.0]);
        let b = encode(&[3.0]);
        let mut c = vec![99.0f32; 1];
        gemm_bf16(1, 1, 1, &a, 1, &b, 1, &mut c, 1);
        assert_eq!(c[0], 6.0);
    }

    #[test]
    fn test_leading_dims_larger_than_extent() {
        // lda/ldb/ldc wider than the logical matrix: padding columns must be
        // neither read into the product nor written
        let a = encode(&[1.0, 2.0, -1.0, 3.0, 4.0, -1.0]); // 2x2, lda=3
        let b = encode(&[1.0, 0.0, -1.0, 0.0, 1.0, -1.0]); // 2x2, ldb=3
        let mut c = vec![-5.0f32; 6]; // ldc=3
        gemm_bf16(2, 2, 2, &a, 3, &b, 3, &mut c, 3);
        assert_eq!(&c[0..2], &[1.0, 2.0]);
        assert_eq!(c[2], -5.0, "padding column must stay untouched");
        assert_eq!(&c[3..5], &[3.0, 4.0]);
        assert_eq!(c[5], -5.0);
    }

    #[test]
    fn test_matches_f32_reference_within_bf16_tolerance() {
        let m = 4;
        let n = 5;
        let k = 7;
        let a_f: Vec<f32> = (0..m * k).map(|i| (i as f32 * 0.37).sin()).collect();
        let b_f: Vec<f32> = (0..k * n).map(|i| (i as f32 * 0.61).cos()).collect();
        let a = encode(&a_f);
        let b = encode(&b_f);
        let mut c = vec![0.0f32; m * n];
        gemm_bf16(m, n, k, &a, k, &b, n, &mut c, n);

        for i in 0..m {
            for j in 0..n {
                let expected: f32 = (0..k)
                    .map(|x| a[i * k + x].to_f32() * b[x * n + j].to_f32())
                    .sum();
                assert!(
                    (c[i * n + j] - expected).abs() < 1e-6,
                    "({i},{j}): got {} expected {expected}",
                    c[i * n + j]
                );
            }
        }
    }
}
