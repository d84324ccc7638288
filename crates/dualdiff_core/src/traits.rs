use crate::error::AdError;
use num_traits::Num;
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A trait for types that can be used as scalars in differentiable code.
///
/// Functions written against `Scalar` run unchanged on `f64` (plain
/// evaluation) and on [`Dual`](crate::autodiff::Dual) (value plus derivative).
/// Mixing with an `f64` constant goes through the operator impls, which
/// promote the constant internally.
pub trait Scalar:
    Num
    + Copy
    + Debug
    + PartialOrd
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + 'static
{
    /// Promotes a real constant (zero tangent for duals).
    fn from_real(value: f64) -> Self;

    /// Primal part. Only for control flow; it is never differentiated.
    fn real(&self) -> f64;

    /// Integer power.
    fn powi(self, n: i32) -> Self {
        crate::power::powi(self, n)
    }

    /// Power with a runtime exponent, used by the expression VM.
    fn try_powf(self, exponent: Self) -> Result<Self, AdError>;
}

impl Scalar for f64 {
    #[inline]
    fn from_real(value: f64) -> Self {
        value
    }

    #[inline]
    fn real(&self) -> f64 {
        *self
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn try_powf(self, exponent: Self) -> Result<Self, AdError> {
        Ok(self.powf(exponent))
    }
}

/// A univariate function that can be evaluated on a scalar type `T`.
///
/// Implement it for both `f64` and `Dual` (usually with one generic impl)
/// to evaluate and differentiate through the same code path.
pub trait ScalarFunction<T: Scalar> {
    fn apply(&self, x: T) -> T;
}

#[cfg(test)]
mod tests {
    use super::{Scalar, ScalarFunction};
    use crate::autodiff::Dual;
    use approx::assert_relative_eq;

    fn quadratic<T: Scalar>(x: T) -> T {
        x * x + x * 3.0 + T::from_real(2.0)
    }

    struct Cubic;

    impl<T: Scalar> ScalarFunction<T> for Cubic {
        fn apply(&self, x: T) -> T {
            x.powi(3) - x
        }
    }

    #[test]
    fn generic_code_runs_on_both_scalars() {
        assert_relative_eq!(quadratic(3.0_f64), 20.0, epsilon = 1e-12);

        let dual = quadratic(Dual::variable(3.0));
        assert_relative_eq!(dual.value(), 20.0, epsilon = 1e-12);
        assert_relative_eq!(dual.epsilon(), 9.0, epsilon = 1e-12);
    }

    #[test]
    fn scalar_function_evaluates_on_both_scalars() {
        let value: f64 = Cubic.apply(2.0);
        let dual: Dual = Cubic.apply(Dual::variable(2.0));
        assert_relative_eq!(value, 6.0, epsilon = 1e-12);
        assert_relative_eq!(dual.value(), value, epsilon = 1e-12);
        assert_relative_eq!(dual.epsilon(), 11.0, epsilon = 1e-12);
    }

    #[test]
    fn f64_try_powf_accepts_fractional_exponent() {
        let root = 9.0_f64.try_powf(0.5).expect("f64 supports real powers");
        assert_relative_eq!(root, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn real_part_ignores_tangent() {
        assert_eq!(Dual::new(1.5, -4.0).real(), 1.5);
        assert_eq!(2.5_f64.real(), 2.5);
    }
}
