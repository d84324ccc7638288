use crate::autodiff::Dual;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub damping: f64,
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 25,
            damping: 1.0,
            tolerance: 1e-12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RootResult {
    pub root: f64,
    pub residual: f64,
    pub derivative: f64,
    pub iterations: usize,
}

/// Finds a root of `f` with Newton's method, taking each slope from the
/// dual evaluation of `f` at the current iterate.
pub fn solve_root<F>(f: F, initial_guess: f64, settings: NewtonSettings) -> Result<RootResult>
where
    F: Fn(Dual) -> Dual,
{
    try_solve_root(|x| Ok::<_, Infallible>(f(x)), initial_guess, settings)
}

/// [`solve_root`] for functions that can fail, such as compiled expressions.
pub fn try_solve_root<F, E>(
    f: F,
    initial_guess: f64,
    settings: NewtonSettings,
) -> Result<RootResult>
where
    F: Fn(Dual) -> std::result::Result<Dual, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let eval_at = |x: f64| -> Result<Dual> {
        f(Dual::variable(x)).with_context(|| format!("Evaluation failed at x = {}", x))
    };

    if !initial_guess.is_finite() {
        bail!("Initial guess must be finite, got {}.", initial_guess);
    }
    if settings.max_steps == 0 {
        bail!("max_steps must be greater than zero.");
    }
    if !(settings.damping.is_finite() && settings.damping > 0.0) {
        bail!("damping must be finite and positive, got {}.", settings.damping);
    }
    if !(settings.tolerance.is_finite() && settings.tolerance > 0.0) {
        bail!("tolerance must be finite and positive, got {}.", settings.tolerance);
    }

    let mut x = initial_guess;
    let mut eval = eval_at(x)?;
    let mut iterations = 0usize;

    loop {
        let residual = eval.value();
        if !residual.is_finite() {
            bail!("Residual is not finite at x = {} (f(x) = {}).", x, residual);
        }
        if residual.abs() <= settings.tolerance {
            break;
        }

        if iterations >= settings.max_steps {
            bail!(
                "Newton solver failed to converge in {} steps (|f(x)| = {}).",
                settings.max_steps,
                residual.abs()
            );
        }

        let slope = eval.epsilon();
        if slope == 0.0 || !slope.is_finite() {
            log::warn!("Newton step at x = {x} has slope {slope}");
            bail!("Derivative is zero or not finite at x = {} (f'(x) = {}).", x, slope);
        }

        x -= settings.damping * residual / slope;
        iterations += 1;
        eval = eval_at(x)?;
    }

    log::debug!("Newton converged to {x} after {iterations} steps");

    Ok(RootResult {
        root: x,
        residual: eval.value(),
        derivative: eval.epsilon(),
        iterations,
    })
}
