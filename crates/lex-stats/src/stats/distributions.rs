//! Standard normal helpers, backed by `statrs`.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    Normal::standard().cdf(z)
}

/// Standard normal density.
pub fn normal_pdf(z: f64) -> f64 {
    Normal::standard().pdf(z)
}

/// Standard normal quantile function.
pub fn normal_ppf(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    Normal::standard().inverse_cdf(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-6);
        assert!((normal_pdf(0.0) - 0.398_942_280_401_432_7).abs() < 1e-12);
    }

    #[test]
    fn test_normal_ppf_inverts_cdf() {
        for p in [0.01, 0.25, 0.5, 0.9] {
            assert!((normal_cdf(normal_ppf(p)) - p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normal_ppf_edges_do_not_panic() {
        assert_eq!(normal_ppf(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_ppf(1.0), f64::INFINITY);
        assert!(normal_ppf(1.5).is_infinite());
        assert!(normal_ppf(f64::NAN).is_nan());
    }
}
