//! Studentized range distribution for Tukey's HSD.
//!
//! Both integrals are evaluated with composite Simpson's rule. The outer
//! integral runs over the scaled chi distribution of the error estimate and is
//! skipped for very large error degrees of freedom.

use super::distributions::{normal_cdf, normal_pdf};
use statrs::function::gamma::ln_gamma;

/// Above this many error degrees of freedom the range of `k` normals is used
/// directly.
const LARGE_DF: f64 = 5000.0;

const INNER_STEPS: usize = 240;
const OUTER_STEPS: usize = 200;

fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, steps: usize) -> f64 {
    let steps = if steps % 2 == 1 { steps + 1 } else { steps };
    let h = (b - a) / steps as f64;
    let mut sum = f(a) + f(b);
    for i in 1..steps {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

/// P(range of `k` independent standard normals <= `w`).
fn range_cdf(w: f64, k: usize) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    let kf = k as f64;
    let integrand = |z: f64| {
        let inside = (normal_cdf(z) - normal_cdf(z - w)).max(0.0);
        normal_pdf(z) * inside.powi(k as i32 - 1)
    };
    (kf * simpson(integrand, -8.0, 8.0, INNER_STEPS)).clamp(0.0, 1.0)
}

/// CDF of the studentized range for `k` means and `df` error degrees of freedom.
pub fn ptukey(q: f64, k: usize, df: f64) -> f64 {
    if q <= 0.0 || k < 2 {
        return 0.0;
    }
    if q.is_infinite() {
        return 1.0;
    }
    if df > LARGE_DF {
        return range_cdf(q, k);
    }

    // Density of s = sqrt(chi2_df / df), in log space
    let half = df / 2.0;
    let log_norm = half * df.ln() - ln_gamma(half) - (half - 1.0) * 2f64.ln();
    let density = |s: f64| {
        if s <= 0.0 {
            return 0.0;
        }
        (log_norm + (df - 1.0) * s.ln() - half * s * s).exp()
    };

    let spread = 10.0 / (2.0 * df).sqrt();
    let lower = (1.0 - spread).max(0.0);
    let upper = 1.0 + spread;

    simpson(|s| density(s) * range_cdf(q * s, k), lower, upper, OUTER_STEPS).clamp(0.0, 1.0)
}

/// Upper-tail probability of the studentized range.
pub fn ptukey_upper(q: f64, k: usize, df: f64) -> f64 {
    (1.0 - ptukey(q, k, df)).clamp(0.0, 1.0)
}

/// Critical value `q` with `ptukey(q) = 1 - alpha`, found by bisection.
pub fn qtukey(alpha: f64, k: usize, df: f64) -> f64 {
    let target = 1.0 - alpha;
    let mut lo = 0.0;
    let mut hi = 10.0;
    while ptukey(hi, k, df) < target && hi < 1000.0 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..45 {
        let mid = 0.5 * (lo + hi);
        if ptukey(mid, k, df) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
