//! Parameter metadata for tunable thresholds
//!
//! Every configuration struct in the crate ([`DetectorThresholds`],
//! [`IndicatorSettings`], [`ScoringPolicy`]) describes its numeric fields
//! through [`ParamMeta`], enabling:
//! - Validation of hand-written or deserialized configs
//! - Threshold sweeps via [`ParamMeta::generate_grid`]
//! - Construction from a flat name → value map
//!
//! # Example
//!
//! ```rust
//! use candlescope::prelude::*;
//!
//! for param in DetectorThresholds::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```
//!
//! [`DetectorThresholds`]: crate::detectors::DetectorThresholds
//! [`IndicatorSettings`]: crate::indicators::IndicatorSettings
//! [`ScoringPolicy`]: crate::scoring::ScoringPolicy

use std::collections::HashMap;

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Ratio value in 0.0..=1.0
    Ratio,
    /// Multiplier or threshold, any finite value inside its range
    Factor,
    /// Period value (positive integer)
    Period,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name (e.g., "significance_floor")
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Accepted range and sweep step: (min, max, step)
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn ratio(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Ratio, default, range, description }
    }

    pub const fn factor(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Factor, default, range, description }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Period, default, range, description }
    }

    /// Generate all values for a grid sweep
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        let mut values = Vec::new();
        let mut v = min;
        while v <= max + f64::EPSILON {
            values.push(v);
            v += step;
        }
        values
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidValue("parameter must be finite"));
        }
        let (min, max, _) = self.range;
        if value < min || value > max {
            return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
        }
        match self.param_type {
            ParamType::Ratio | ParamType::Factor => Ok(()),
            ParamType::Period => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
                }
                Ok(())
            },
        }
    }
}

// ============================================================
// TUNABLE TRAIT
// ============================================================

/// Configuration whose numeric fields are described by [`ParamMeta`]
pub trait Tunable: Sized {
    /// Metadata for all configurable parameters
    fn param_meta() -> &'static [ParamMeta];

    /// Current values, in the same order as [`Tunable::param_meta`]
    fn param_values(&self) -> Vec<f64>;

    /// Creates a config from a name → value map. Missing parameters use their
    /// default values.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

    /// Checks every value against its metadata range
    fn validate(&self) -> Result<()> {
        Self::param_meta()
            .iter()
            .zip(self.param_values())
            .try_for_each(|(meta, value)| meta.validate(value))
    }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
    let value = params.get(key).copied().unwrap_or(default);
    Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    if value < 1.0 || value.fract() != 0.0 {
        return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
    }
    Period::new(value as usize)
}

/// Helper to get a plain factor from params with default fallback
pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
    let value = params.get(key).copied().unwrap_or(default);
    if !value.is_finite() {
        return Err(AnalysisError::InvalidValue("parameter must be finite"));
    }
    Ok(value)
}

// ============================================================
// TESTS
// ============================================================
