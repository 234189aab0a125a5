//! Point-in-time normalization of a realized value against its target.
//!
//! Capped results stay within `[0, 1]`; only an uncapped MAX may exceed 1.

use super::domain::Polarity;

/// Share of `normal` within which a STABLE metric still earns partial credit.
pub const DEFAULT_STABLE_TOLERANCE: f64 = 0.2;

/// Inputs to a single point-in-time normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub target: f64,
    pub normal: Option<f64>,
    pub cap: bool,
    pub tolerance: f64,
}

impl Normalization {
    pub fn new(target: f64, normal: Option<f64>) -> Self {
        Self {
            target,
            normal,
            cap: true,
            tolerance: DEFAULT_STABLE_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn uncapped(mut self) -> Self {
        self.cap = false;
        self
    }
}

/// Map a realized value onto `[0, 1]` according to `polarity`.
///
/// Returns `None` when nothing was realized or the polarity is not one the engine knows.
pub fn normalize(realized: Option<f64>, polarity: &Polarity, params: Normalization) -> Option<f64> {
    let realized = realized.filter(|value| value.is_finite())?;
    let target = params.target;

    match polarity {
        Polarity::Max => {
            if target <= 0.0 {
                return Some(if realized > 0.0 { 1.0 } else { 0.0 });
            }
            let ratio = realized / target;
            Some(if params.cap {
                ratio.clamp(0.0, 1.0)
            } else {
                ratio.max(0.0)
            })
        }
        Polarity::Min => {
            if realized == 0.0 {
                return Some(1.0);
            }
            if target <= 0.0 {
                return Some(0.0);
            }
            Some((target / realized).clamp(0.0, 1.0))
        }
        Polarity::Stable => {
            let Some(normal) = params.normal else {
                return Some(0.0);
            };
            let band = normal * params.tolerance;
            if band == 0.0 {
                return Some(if (realized - normal).abs() < 1e-9 { 1.0 } else { 0.0 });
            }
            let score = 1.0 - (realized - normal).abs() / band;
            Some(score.clamp(0.0, 1.0))
        }
        Polarity::Unrecognized(_) => None,
    }
}
