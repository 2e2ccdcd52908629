//! Normality tests used to pick between parametric and rank-based methods.
//!
//! Small samples use the Shapiro-Wilk W test from `u_analytics`. Larger
//! samples use a one-sample Kolmogorov-Smirnov test against the standard
//! normal distribution. `u_analytics` standardizes the data before its KS
//! test, so that one is computed here on the raw values.

use super::distributions::normal_cdf;
use super::summary::sorted;
use crate::error::{Result, StatsError};
use serde::Serialize;
use u_analytics::testing;
use u_numflow::matrix::{Matrix, MatrixError};

/// Largest sample that is tested with Shapiro-Wilk.
pub const SHAPIRO_MAX_N: usize = 50;

/// Which normality test produced a [`NormalityResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalityTest {
    ShapiroWilk,
    KolmogorovSmirnov,
}

impl NormalityTest {
    pub fn label(&self) -> &'static str {
        match self {
            NormalityTest::ShapiroWilk => "Shapiro-Wilk",
            NormalityTest::KolmogorovSmirnov => "Kolmogorov-Smirnov",
        }
    }
}

/// Outcome of a normality check on one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityResult {
    pub test: NormalityTest,
    pub statistic: f64,
    pub p_value: f64,
}

impl NormalityResult {
    /// Normal unless rejected at the 0.05 level.
    pub fn is_normal(&self) -> bool {
        self.p_value > 0.05
    }
}

/// Run Shapiro-Wilk for `n <= 50`, otherwise Kolmogorov-Smirnov.
pub fn check_normality(values: &[f64]) -> Result<NormalityResult> {
    if values.len() <= SHAPIRO_MAX_N {
        let (statistic, p_value) = shapiro_wilk(values)?;
        Ok(NormalityResult {
            test: NormalityTest::ShapiroWilk,
            statistic,
            p_value,
        })
    } else {
        let (statistic, p_value) = ks_test_standard_normal(values)?;
        Ok(NormalityResult {
            test: NormalityTest::KolmogorovSmirnov,
            statistic,
            p_value,
        })
    }
}

// =============================================================================
// Shapiro-Wilk
// =============================================================================

/// Shapiro-Wilk W statistic and p-value (Royston's approximation).
///
/// A sample with no spread is reported as `W = 1, p = 1`.
pub fn shapiro_wilk(values: &[f64]) -> Result<(f64, f64)> {
    let n = values.len();
    if n < 3 {
        return Err(StatsError::insufficient("Shapiro-Wilk test", 3, n));
    }

    if let Some(result) = testing::shapiro_wilk_test(values) {
        return Ok((result.w, result.p_value));
    }

    let x = sorted(values);
    let magnitude = x[0].abs().max(x[n - 1].abs()).max(1.0);
    if x[n - 1] - x[0] <= f64::EPSILON * magnitude {
        return Ok((1.0, 1.0));
    }
    Err(StatsError::Numerical(
        "Shapiro-Wilk test is undefined for non-finite values".to_string(),
    ))
}

// =============================================================================
// Kolmogorov-Smirnov
// =============================================================================

/// Largest sample whose KS p-value is computed exactly.
const KS_EXACT_MAX_N: usize = 1000;

/// One-sample KS test of the raw values against N(0, 1).
///
/// The values are not standardized first. The p-value is exact up to
/// [`KS_EXACT_MAX_N`] values and uses Stephens' asymptotic form beyond.
pub fn ks_test_standard_normal(values: &[f64]) -> Result<(f64, f64)> {
    let n = values.len();
    if n == 0 {
        return Err(StatsError::EmptyInput(
            "Kolmogorov-Smirnov test needs at least one value".to_string(),
        ));
    }

    let x = sorted(values);
    let nf = n as f64;
    let d = x
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let cdf = normal_cdf(v);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0f64, f64::max);

    let p_value = if n <= KS_EXACT_MAX_N {
        1.0 - kolmogorov_cdf(n, d)?
    } else {
        let sqrt_n = nf.sqrt();
        kolmogorov_q((sqrt_n + 0.12 + 0.11 / sqrt_n) * d)
    };
    Ok((d, p_value.clamp(0.0, 1.0)))
}

/// `P(D_n < d)` by the Durbin matrix method of Marsaglia, Tsang and Wang (2003).
fn kolmogorov_cdf(n: usize, d: f64) -> Result<f64> {
    let nf = n as f64;
    let s = d * d * nf;
    // Far tail: the matrix would be large and the answer is ~1
    if s > 7.24 || (s > 3.76 && n > 99) {
        return Ok(1.0 - 2.0 * (-(2.000071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp());
    }

    let k = (nf * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut data = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..m.min(i + 2) {
            data[i * m + j] = 1.0;
        }
    }
    for i in 0..m {
        data[i * m] -= h.powi(i as i32 + 1);
        data[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        data[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..=i {
            for g in 1..=(i - j + 1) {
                data[i * m + j] /= g as f64;
            }
        }
    }

    let base = Matrix::new(m, m, data).map_err(matrix_error)?;
    let (power, mut exponent) = matrix_power(&base, n)?;

    let mut p = power.get(k - 1, k - 1);
    for i in 1..=n {
        p = p * i as f64 / nf;
        if p < 1e-140 {
            p *= 1e140;
            exponent -= 140;
        }
    }
    Ok(p * 10f64.powi(exponent))
}

/// `base^n` as a matrix and a power-of-ten exponent that keeps it in range.
fn matrix_power(base: &Matrix, n: usize) -> Result<(Matrix, i32)> {
    if n == 1 {
        return Ok((base.clone(), 0));
    }
    let (half, exponent) = matrix_power(base, n / 2)?;
    let squared = half.mul_mat(&half).map_err(matrix_error)?;
    let mut power = if n % 2 == 0 {
        squared
    } else {
        base.mul_mat(&squared).map_err(matrix_error)?
    };
    let mut exponent = 2 * exponent;

    let mid = base.rows() / 2;
    if power.get(mid, mid) > 1e140 {
        power = power.scale(1e-140);
        exponent += 140;
    }
    Ok((power, exponent))
}

fn matrix_error(err: MatrixError) -> StatsError {
    StatsError::Numerical(format!("Kolmogorov distribution: {}", err))
}

/// Complementary Kolmogorov distribution `Q(lambda)`.
fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda < 0.2 {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = sign * (-2.0 * jf * jf * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::distributions::normal_ppf;

    // ==================== Shapiro-Wilk ====================

    #[test]
    fn test_shapiro_normal_like_sample() {
        let values = [
            -1.2, -0.8, -0.5, -0.3, -0.1, 0.0, 0.1, 0.3, 0.5, 0.8, 1.2, 0.2, -0.2,
        ];
        let (w, p) = shapiro_wilk(&values).unwrap();
        assert!(w > 0.9);
        assert!(p > 0.05);
    }

    #[test]
    fn test_shapiro_rejects_skewed_sample() {
        let values = [
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 50.0, 100.0,
        ];
        let (_, p) = shapiro_wilk(&values).unwrap();
        assert!(p < 0.05);
    }

    #[test]
    fn test_shapiro_three_values() {
        // Equally spaced triple is as normal as three points can be
        let (w, p) = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((w - 1.0).abs() < 1e-9);
        assert!(p > 0.99);
    }

    #[test]
    fn test_shapiro_constant_sample() {
        assert_eq!(shapiro_wilk(&[4.0, 4.0, 4.0, 4.0]).unwrap(), (1.0, 1.0));
    }

    #[test]
    fn test_shapiro_too_small() {
        assert!(matches!(
            shapiro_wilk(&[1.0, 2.0]),
            Err(StatsError::InsufficientSample { .. })
        ));
    }

    // ==================== Kolmogorov-Smirnov ====================

    #[test]
    fn test_ks_standard_normal_quantiles_pass() {
        let values: Vec<f64> = (1..=100)
            .map(|i| normal_ppf((i as f64 - 0.5) / 100.0))
            .collect();
        let (d, p) = ks_test_standard_normal(&values).unwrap();
        assert!(d < 0.01);
        assert!(p > 0.99);
    }

    #[test]
    fn test_ks_shifted_data_rejected() {
        // Values far from N(0, 1) fail even if they are themselves bell-shaped
        let values: Vec<f64> = (1..=100)
            .map(|i| 50.0 + normal_ppf((i as f64 - 0.5) / 100.0))
            .collect();
        let (d, p) = ks_test_standard_normal(&values).unwrap();
        assert!(d > 0.99);
        assert!(p < 1e-6);
    }

    #[test]
    fn test_ks_exact_p_value_matches_reference() {
        // Same D and exact p as kstest(values, "norm"); p checked in rational arithmetic
        let values = [
            -0.04, 0.84, -0.01, -0.11, -0.82, 0.0, 1.53, 0.74, 1.44, 0.54, 0.7, 0.46, -1.67, 1.23,
            0.83, 0.82, -1.7, -1.76, -0.77, -0.29, 0.6, 0.2, 0.85, -0.49, 0.61, 0.7, -0.51, 2.23,
            0.89, 1.63, -0.46, -0.6, -0.15, 0.13, 0.98, 0.54, -0.26, -0.85, -0.35, 1.65, -0.68,
            0.53, 0.74, -1.46, 0.31, 1.75, -2.07, -0.12, 0.13, -0.69, 0.82, 0.18, -1.43, 1.2, 1.02,
            1.34, 1.91, 0.67, 0.39, -1.24,
        ];
        let (d, p) = ks_test_standard_normal(&values).unwrap();
        assert!((d - 0.168_610_701_271_790_2).abs() < 1e-9);
        assert!((p - 0.058_386_850_677_335).abs() < 1e-7);
    }

    #[test]
    fn test_kolmogorov_cdf_small_n_closed_form() {
        // For n = 1, P(D < d) = 2d - 1 on [1/2, 1]
        assert!((kolmogorov_cdf(1, 0.75).unwrap() - 0.5).abs() < 1e-12);
        // D_n is never below 1/(2n)
        assert!(kolmogorov_cdf(10, 0.04).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_ks_large_sample_uses_asymptotic_form() {
        let values: Vec<f64> = (1..=2000)
            .map(|i| normal_ppf((i as f64 - 0.5) / 2000.0))
            .collect();
        let (d, p) = ks_test_standard_normal(&values).unwrap();
        assert!(d < 1e-3);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_check_normality_picks_test_by_size() {
        let small: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let large: Vec<f64> = (0..60).map(|i| i as f64).collect();
        assert_eq!(
            check_normality(&small).unwrap().test,
            NormalityTest::ShapiroWilk
        );
        assert_eq!(
            check_normality(&large).unwrap().test,
            NormalityTest::KolmogorovSmirnov
        );
    }
}
