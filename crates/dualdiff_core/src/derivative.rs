//! The derivative operator: seed `(x, 1)`, evaluate, read the tangent.
//!
//! The chain rule is never applied explicitly. It falls out of the dual
//! arithmetic as the seeded value flows through `f`.

use crate::autodiff::Dual;
use crate::traits::ScalarFunction;

/// Evaluates `f` on the seed `(x, 1)` and returns `f(x)` and `f'(x)`.
pub fn value_and_derivative<F>(f: F, x: f64) -> (f64, f64)
where
    F: Fn(Dual) -> Dual,
{
    let seed = Dual::variable(x);
    let result = f(seed);
    log::trace!("derivative at {x}: seed {seed}, result {result}");
    (result.value(), result.epsilon())
}

/// First derivative of `f` at `x`.
///
/// Non-differentiable points are not detected; the result is whatever the
/// dual arithmetic propagates.
pub fn derivative<F>(f: F, x: f64) -> f64
where
    F: Fn(Dual) -> Dual,
{
    value_and_derivative(f, x).1
}

/// Derivative of a fallible function, e.g. a compiled expression.
pub fn try_derivative<F, E>(f: F, x: f64) -> Result<f64, E>
where
    F: Fn(Dual) -> Result<Dual, E>,
{
    let result = f(Dual::variable(x))?;
    Ok(result.epsilon())
}

/// Derivative of a [`ScalarFunction`] evaluated in dual space.
pub fn derivative_of<S>(function: &S, x: f64) -> f64
where
    S: ScalarFunction<Dual> + ?Sized,
{
    derivative(|seed| function.apply(seed), x)
}

// --- Tangent wrapper ---

/// Wraps a function so that evaluating the wrapper on `f64` yields the
/// derivative of the inner function.
pub struct Tangent<S> {
    pub inner: S,
}

impl<S> Tangent<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> ScalarFunction<f64> for Tangent<S>
where
    S: ScalarFunction<Dual>,
{
    fn apply(&self, x: f64) -> f64 {
        derivative_of(&self.inner, x)
    }
}

/// Evaluates a function generic over [`Scalar`](crate::traits::Scalar) on plain reals.
pub fn evaluate<S>(function: &S, x: f64) -> f64
where
    S: ScalarFunction<f64> + ?Sized,
{
    function.apply(x)
}
