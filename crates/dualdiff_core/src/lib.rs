//! `dualdiff_core` computes exact first derivatives of scalar functions by
//! forward-mode automatic differentiation over dual numbers.
//!
//! Functions are written once against the `Scalar` trait and run on `f64`
//! for values or on `Dual` for values plus derivatives.
//!
//! Key components:
//! - **Autodiff**: the `Dual` number type and its arithmetic, including promotion of plain reals.
//! - **Traits**: `Scalar` (numeric type abstraction) and `ScalarFunction` (univariate functions).
//! - **Derivative**: seeding, evaluation and tangent extraction.
//! - **Babylonian**: fixed-iteration square root, with a hand-derived derivative for cross-checks.
//! - **Newton**: root finding driven by the derivative operator.
//! - **Expression**: a small bytecode VM for user-supplied expressions, generic over `Scalar`.

pub mod autodiff;
pub mod babylonian;
pub mod derivative;
pub mod error;
pub mod expression;
pub mod newton;
pub mod power;
pub mod traits;

pub use autodiff::Dual;
pub use derivative::{derivative, value_and_derivative};
pub use error::AdError;
pub use traits::{Scalar, ScalarFunction};
