use num_traits::One;
use std::ops::{Div, Mul};

/// Integer power by repeated squaring.
///
/// Works for any type closed under `*`, so a dual number picks up the power
/// rule `n * a^(n-1) * b` from its multiplication alone. Negative exponents
/// take the reciprocal of the positive power.
pub fn powi<T>(base: T, n: i32) -> T
where
    T: Clone + One + Mul<Output = T> + Div<Output = T>,
{
    let magnitude = n.unsigned_abs() as usize;
    let positive = num_traits::pow::pow(base, magnitude);
    if n < 0 {
        T::one() / positive
    } else {
        positive
    }
}
