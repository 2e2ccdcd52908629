//! Numeric kernels shared by the analysis engines.
//!
//! Everything here works on plain `f64` slices; column selection and null
//! handling happen in the engines before these are called. The tests
//! themselves come from `u_analytics`. The KS test on raw values and the
//! studentized range are computed here, since `u_analytics` has neither.

pub mod distributions;
pub mod normality;
pub mod oneway;
pub mod summary;
pub mod tukey;

pub use distributions::{normal_cdf, normal_pdf, normal_ppf};
pub use normality::{NormalityResult, NormalityTest, check_normality};
pub use oneway::{OneWayAnova, levene, one_way_anova};
pub use summary::{mean, median, population_std, sample_std};
pub use tukey::{ptukey, ptukey_upper, qtukey};
