//! Data Sanitization
//!
//! Numerical stability utilities shared by the ability model and the
//! selection engine.
//!
//! NaN never escapes these helpers: it maps to a fallback or a bound.

use crate::types::{MAX_PROBABILITY, MAX_VARIANCE, MIN_PROBABILITY, MIN_VARIANCE};

/// 将无效值替换为 fallback
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamps into `[lo, hi]`; NaN maps to `lo`, infinities to the nearer bound.
pub fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

pub fn clamp_probability(p: f64) -> f64 {
    clamp_finite(p, MIN_PROBABILITY, MAX_PROBABILITY)
}

/// NaN variance is treated as maximally uncertain.
pub fn clamp_variance(variance: f64) -> f64 {
    if variance.is_nan() {
        return MAX_VARIANCE;
    }
    variance.clamp(MIN_VARIANCE, MAX_VARIANCE)
}

/// 采样权重：NaN、Inf、负值一律视为 0
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
