use crate::error::AdError;
use crate::traits::Scalar;
use num_traits::{FromPrimitive, Num, NumCast, One, Pow, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

/// Dual number `val + eps·ε` with `ε² = 0`, for forward-mode AD.
///
/// `val` carries the function value and `eps` the derivative with respect to
/// whichever input was seeded with a unit tangent. Values are immutable:
/// every operation returns a new `Dual`.
///
/// `Dual` deliberately does not implement `num_traits::Float`. A real-valued
/// exponent has no rule in the algebra, so it does not compile:
///
/// ```compile_fail
/// use dualdiff_core::autodiff::Dual;
/// use num_traits::Float;
/// let _ = Dual::variable(2.0).powf(Dual::constant(0.5));
/// ```
///
/// Equality and ordering look at the value only. Comparisons are real-number
/// decisions, so generic code branches the same way on `Dual` as on `f64`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Dual {
    #[serde(rename = "value")]
    val: f64,
    #[serde(rename = "epsilon")]
    eps: f64,
}

impl Dual {
    pub fn new(value: f64, epsilon: f64) -> Self {
        Self {
            val: value,
            eps: epsilon,
        }
    }

    /// A real promoted into the algebra: `(r, 0)`.
    pub fn constant(value: f64) -> Self {
        Self::new(value, 0.0)
    }

    /// The seed `(x, 1)`: the input differentiated against.
    pub fn variable(value: f64) -> Self {
        Self::new(value, 1.0)
    }

    pub fn value(&self) -> f64 {
        self.val
    }

    pub fn epsilon(&self) -> f64 {
        self.eps
    }

    pub fn powi(self, n: i32) -> Self {
        crate::power::powi(self, n)
    }

    pub fn recip(self) -> Self {
        Self::one() / self
    }
}

impl From<f64> for Dual {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl PartialEq for Dual {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.val.partial_cmp(&other.val)
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.eps.is_sign_negative() {
            write!(f, "{} - {}ε", self.val, -self.eps)
        } else {
            write!(f, "{} + {}ε", self.val, self.eps)
        }
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
    fn is_zero(&self) -> bool {
        self.val == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        // (a + bε)(c + dε) = ac + (ad + bc)ε, the ε² term vanishes.
        Self::new(self.val * rhs.val, self.val * rhs.eps + self.eps * rhs.val)
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        // Multiply through by the conjugate (c - dε); c² is the real denominator.
        let denom = rhs.val * rhs.val;
        Self::new(
            self.val / rhs.val,
            (self.eps * rhs.val - self.val * rhs.eps) / denom,
        )
    }
}

impl Rem for Dual {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        // a % c = a - c·trunc(a/c); trunc is locally constant.
        let quotient = (self.val / rhs.val).trunc();
        Self::new(self.val % rhs.val, self.eps - rhs.eps * quotient)
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, -self.eps)
    }
}

// Mixed operands: the real side is promoted with `Dual::constant` before the
// dual rule is applied, in both operand orders.
macro_rules! impl_real_ops {
    ($($trait:ident::$method:ident, $assign_trait:ident::$assign_method:ident;)*) => {
        $(
            impl $trait<f64> for Dual {
                type Output = Dual;
                fn $method(self, rhs: f64) -> Dual {
                    $trait::$method(self, Dual::constant(rhs))
                }
            }

            impl $trait<Dual> for f64 {
                type Output = Dual;
                fn $method(self, rhs: Dual) -> Dual {
                    $trait::$method(Dual::constant(self), rhs)
                }
            }

            impl $assign_trait for Dual {
                fn $assign_method(&mut self, rhs: Dual) {
                    *self = $trait::$method(*self, rhs);
                }
            }

            impl $assign_trait<f64> for Dual {
                fn $assign_method(&mut self, rhs: f64) {
                    *self = $trait::$method(*self, Dual::constant(rhs));
                }
            }
        )*
    };
}

impl_real_ops! {
    Add::add, AddAssign::add_assign;
    Sub::sub, SubAssign::sub_assign;
    Mul::mul, MulAssign::mul_assign;
    Div::div, DivAssign::div_assign;
    Rem::rem, RemAssign::rem_assign;
}

impl Sum for Dual {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl Product for Dual {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::one(), |acc, x| acc * x)
    }
}

impl Pow<i32> for Dual {
    type Output = Self;
    fn pow(self, n: i32) -> Self {
        self.powi(n)
    }
}

impl Pow<u32> for Dual {
    type Output = Self;
    fn pow(self, n: u32) -> Self {
        num_traits::pow::pow(self, n as usize)
    }
}

impl Num for Dual {
    type FromStrRadixErr = <f64 as Num>::FromStrRadixErr;
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        f64::from_str_radix(str, radix).map(Self::constant)
    }
}

impl ToPrimitive for Dual {
    fn to_i64(&self) -> Option<i64> {
        self.val.to_i64()
    }
    fn to_u64(&self) -> Option<u64> {
        self.val.to_u64()
    }
    fn to_f64(&self) -> Option<f64> {
        Some(self.val)
    }
}

impl FromPrimitive for Dual {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::constant(n))
    }
}

impl NumCast for Dual {
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        n.to_f64().map(Self::constant)
    }
}

impl Scalar for Dual {
    #[inline]
    fn from_real(value: f64) -> Self {
        Self::constant(value)
    }

    #[inline]
    fn real(&self) -> f64 {
        self.val
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        Dual::powi(self, n)
    }

    fn try_powf(self, exponent: Self) -> Result<Self, AdError> {
        let unsupported = AdError::UnsupportedPower {
            exponent: exponent.val,
            tangent: exponent.eps,
        };
        if exponent.eps != 0.0 || exponent.val.fract() != 0.0 {
            return Err(unsupported);
        }
        // fract() is NaN for infinities, so only finite integers reach here.
        match exponent.val.to_i32() {
            Some(n) => Ok(self.powi(n)),
            None => Err(unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Dual;
    use crate::error::AdError;
    use crate::traits::Scalar;
    use approx::assert_relative_eq;
    use num_traits::{Num, One, Pow, Zero};

    fn assert_dual(z: Dual, value: f64, epsilon: f64) {
        assert_eq!(z.value(), value, "value of {z}");
        assert_eq!(z.epsilon(), epsilon, "epsilon of {z}");
    }

    fn assert_same(z: Dual, w: Dual) {
        assert_dual(z, w.value(), w.epsilon());
    }

    #[test]
    fn accessors_expose_both_components() {
        let z = Dual::new(2.5, -1.0);
        assert_eq!(z.value(), 2.5);
        assert_eq!(z.epsilon(), -1.0);
        assert_dual(Dual::variable(4.0), 4.0, 1.0);
        assert_dual(Dual::constant(4.0), 4.0, 0.0);
    }

    #[test]
    fn componentwise_add_and_sub() {
        let z = Dual::new(1.0, 2.0);
        let w = Dual::new(3.0, -5.0);
        assert_dual(z + w, 4.0, -3.0);
        assert_dual(z - w, -2.0, 7.0);
        assert_dual(-z, -1.0, -2.0);
    }

    #[test]
    fn multiplication_drops_epsilon_squared() {
        let z = Dual::new(2.0, 3.0);
        let w = Dual::new(5.0, 7.0);
        assert_dual(z * w, 10.0, 2.0 * 7.0 + 3.0 * 5.0);
    }

    #[test]
    fn division_rationalizes_denominator() {
        let z = Dual::new(6.0, 1.0);
        let w = Dual::new(3.0, 2.0);
        let q = z / w;
        assert_relative_eq!(q.value(), 2.0, epsilon = 1e-15);
        assert_relative_eq!(q.epsilon(), (1.0 * 3.0 - 6.0 * 2.0) / 9.0, epsilon = 1e-15);
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        let q = Dual::new(1.0, 1.0) / Dual::new(0.0, 0.0);
        assert!(q.value().is_infinite());
        assert!(!q.epsilon().is_finite());

        let nan = Dual::new(0.0, 0.0) / Dual::new(0.0, 0.0);
        assert!(nan.value().is_nan());
    }

    #[test]
    fn reals_are_promoted_in_both_operand_orders() {
        let z = Dual::new(2.0, 3.0);
        assert_same(z + 1.0, z + Dual::constant(1.0));
        assert_same(1.0 + z, Dual::constant(1.0) + z);
        assert_dual(z - 1.0, 1.0, 3.0);
        assert_dual(1.0 - z, -1.0, -3.0);
        assert_dual(z * 4.0, 8.0, 12.0);
        assert_dual(4.0 * z, 8.0, 12.0);
        assert_dual(z / 2.0, 1.0, 1.5);
        assert_same(6.0 / z, Dual::constant(6.0) / z);
    }

    #[test]
    fn promoting_a_dual_is_a_no_op() {
        let z = Dual::new(2.0, 3.0);
        assert_dual(Dual::from_real(z.value()) + z, 4.0, 3.0);
        assert_same(Dual::from(7.0), Dual::constant(7.0));
        // Scalar ops on a dual never re-wrap the dual operand.
        assert_same(z * 1.0, z);
        assert_same(z + 0.0, z);
    }

    #[test]
    fn compound_assignment_matches_binary_ops() {
        let mut z = Dual::new(2.0, 1.0);
        z += 1.0;
        z *= Dual::new(2.0, 1.0);
        z -= Dual::new(1.0, 0.0);
        z /= 5.0;
        let expected = ((Dual::new(2.0, 1.0) + 1.0) * Dual::new(2.0, 1.0) - 1.0) / 5.0;
        assert_same(z, expected);
    }

    #[test]
    fn comparisons_ignore_the_tangent() {
        assert_eq!(Dual::variable(2.0), Dual::constant(2.0));
        assert_ne!(Dual::variable(2.0), Dual::variable(3.0));
        assert!(Dual::new(1.0, 100.0) < Dual::new(2.0, -100.0));
        assert!(Dual::variable(0.0) <= Dual::zero());
        assert!(Dual::variable(0.0) >= Dual::zero());
        assert!(Dual::constant(f64::NAN).partial_cmp(&Dual::zero()).is_none());
    }

    fn step<T: Scalar>(x: T) -> T {
        if x > T::zero() {
            x * 10.0
        } else {
            x * -10.0 + 1.0
        }
    }

    fn pinned_at_zero<T: Scalar>(x: T) -> T {
        if x == T::from_real(0.0) {
            T::one()
        } else {
            x
        }
    }

    #[test]
    fn branches_agree_between_reals_and_duals() {
        for &x in &[-1.0, 0.0, 2.0] {
            let dual = step(Dual::variable(x));
            assert_eq!(dual.value(), step(x));
            assert_eq!(dual.epsilon(), if x > 0.0 { 10.0 } else { -10.0 });
        }

        let pinned = pinned_at_zero(Dual::variable(0.0));
        assert_dual(pinned, pinned_at_zero(0.0), 0.0);
        assert_dual(pinned_at_zero(Dual::variable(3.0)), 3.0, 1.0);
    }

    #[test]
    fn remainder_tracks_tangent() {
        // d/dx (x % 2) = 1 away from the jumps
        let r = Dual::variable(5.5) % 2.0;
        assert_relative_eq!(r.value(), 1.5, epsilon = 1e-15);
        assert_relative_eq!(r.epsilon(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn zero_one_and_parsing() {
        assert!(Dual::zero().is_zero());
        assert!(Dual::variable(0.0).is_zero());
        assert!(!Dual::constant(1e-300).is_zero());
        assert_same(Dual::one(), Dual::constant(1.0));
        assert_same(
            Dual::from_str_radix("2.5", 10).expect("parse"),
            Dual::constant(2.5),
        );
        assert!(Dual::from_str_radix("abc", 10).is_err());
    }

    #[test]
    fn integer_pow_matches_power_rule() {
        let a = 1.5;
        let z = Dual::variable(a);
        let cubed = z.pow(3_i32);
        assert_relative_eq!(cubed.value(), a.powi(3), epsilon = 1e-12);
        assert_relative_eq!(cubed.epsilon(), 3.0 * a * a, epsilon = 1e-12);
        assert_same(z.pow(3_u32), cubed);
    }

    #[test]
    fn try_powf_accepts_integer_constant_exponents() {
        let z = Dual::variable(2.0);
        let squared = z.try_powf(Dual::constant(2.0)).expect("integer exponent");
        assert_same(squared, z * z);
        let inverse = z.try_powf(Dual::constant(-1.0)).expect("integer exponent");
        assert_same(inverse, z.recip());
    }

    #[test]
    fn try_powf_rejects_fractional_or_varying_exponents() {
        let z = Dual::variable(2.0);
        assert_eq!(
            z.try_powf(Dual::constant(0.5)),
            Err(AdError::UnsupportedPower {
                exponent: 0.5,
                tangent: 0.0
            })
        );
        assert!(matches!(
            z.try_powf(Dual::variable(2.0)),
            Err(AdError::UnsupportedPower { .. })
        ));
        assert!(z.try_powf(Dual::constant(f64::INFINITY)).is_err());
        assert!(z.try_powf(Dual::constant(1e12)).is_err());
    }

    #[test]
    fn sum_and_product() {
        let values = [Dual::variable(2.0), Dual::constant(3.0), Dual::variable(4.0)];
        assert_dual(values.iter().copied().sum::<Dual>(), 9.0, 2.0);
        let product: Dual = values.iter().copied().product();
        assert_same(product, values[0] * values[1] * values[2]);
    }

    #[test]
    fn display_and_serde() {
        assert_eq!(Dual::new(1.0, 2.0).to_string(), "1 + 2ε");
        assert_eq!(Dual::new(1.0, -2.0).to_string(), "1 - 2ε");

        let json = serde_json::to_string(&Dual::new(1.5, 0.25)).expect("serialize");
        assert_eq!(json, r#"{"value":1.5,"epsilon":0.25}"#);
        let back: Dual = serde_json::from_str(&json).expect("deserialize");
        assert_dual(back, 1.5, 0.25);
    }
}
