use crate::traits::{Scalar, ScalarFunction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BabylonianSettings {
    /// Total number of estimates, counting the initial guess.
    pub iterations: usize,
}

impl Default for BabylonianSettings {
    fn default() -> Self {
        Self { iterations: 10 }
    }
}

/// Babylonian (Newton) square root with a fixed iteration count.
///
/// Only `+`, `/` and scaling by real constants are used, so a dual seed
/// returns `sqrt(x)` in its value and `0.5 / sqrt(x)` in its tangent.
/// No convergence check is made.
pub fn babylonian<T: Scalar>(x: T, settings: BabylonianSettings) -> T {
    let mut t = (x + 1.0) / 2.0;
    for step in 1..settings.iterations {
        t = (t + x / t) / 2.0;
        log::trace!("babylonian step {step}: {t:?}");
    }
    t
}

/// Same recurrence as [`babylonian`] on plain reals, carrying the
/// hand-derived derivative `dt` next to `t`. Returns `(sqrt(x), d/dx sqrt(x))`.
pub fn babylonian_with_derivative(x: f64, settings: BabylonianSettings) -> (f64, f64) {
    let mut t = (1.0 + x) / 2.0;
    let mut dt = 0.5;
    for step in 1..settings.iterations {
        // dt uses the estimate from before this step.
        dt = (dt + (t - x * dt) / (t * t)) / 2.0;
        t = (t + x / t) / 2.0;
        log::trace!("babylonian step {step}: t = {t}, dt = {dt}");
    }
    (t, dt)
}

/// Derivative of the square root by the manual recurrence.
pub fn d_babylonian(x: f64, settings: BabylonianSettings) -> f64 {
    babylonian_with_derivative(x, settings).1
}

/// [`babylonian`] as a [`ScalarFunction`], usable with the derivative operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Babylonian {
    pub settings: BabylonianSettings,
}

impl Babylonian {
    pub fn new(settings: BabylonianSettings) -> Self {
        Self { settings }
    }
}

impl<T: Scalar> ScalarFunction<T> for Babylonian {
    fn apply(&self, x: T) -> T {
        babylonian(x, self.settings)
    }
}
