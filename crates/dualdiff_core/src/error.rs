use thiserror::Error;

/// Failures raised while evaluating arithmetic on a [`Scalar`](crate::traits::Scalar).
///
/// Division by zero is not represented here: it follows IEEE-754 and yields
/// an infinite or NaN component instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdError {
    /// A dual operand was raised to a power that cannot be reduced to
    /// repeated multiplication, so its tangent would be wrong.
    #[error(
        "unsupported power on a dual number: exponent {exponent} (tangent {tangent}) \
         is not a constant integer"
    )]
    UnsupportedPower { exponent: f64, tangent: f64 },

    #[error("malformed bytecode: {0}")]
    MalformedBytecode(&'static str),
}
