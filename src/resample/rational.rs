//! Exact rational arithmetic for comparison-grid cell sizes.
//!
//! Only what the resampler needs: parsing decimal and `a/b` input, GCD,
//! division, floor and conversion to `f64`. All operations are checked and
//! return `None` on `i128` overflow.

use std::cmp::Ordering;
use std::fmt;

#[inline]
fn gcd_i128(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// A reduced fraction with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd_i128(num, den).max(1);
        let (mut num, mut den) = (num / g, den / g);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        Some(Self { num, den })
    }

    #[inline]
    pub const fn from_integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    #[inline]
    pub fn numer(self) -> i128 {
        self.num
    }

    #[inline]
    pub fn denom(self) -> i128 {
        self.den
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.num > 0
    }

    /// Parse `"3"`, `"-0.125"`, `"2.5e-1"` or `"1/3"` (each side of the slash
    /// may itself be a decimal).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some((n, d)) = s.split_once('/') {
            let n = Self::parse_decimal(n.trim())?;
            let d = Self::parse_decimal(d.trim())?;
            return n.checked_div(d);
        }
        Self::parse_decimal(s)
    }

    fn parse_decimal(s: &str) -> Option<Self> {
        let (mantissa, exp) = match s.find(['e', 'E']) {
            Some(pos) => (&s[..pos], s[pos + 1..].parse::<i32>().ok()?),
            None => (s, 0),
        };
        let (negative, digits) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut num: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            num = num.checked_mul(10)?.checked_add((b - b'0') as i128)?;
        }
        if negative {
            num = -num;
        }
        let scale = exp.checked_sub(frac_part.len() as i32)?;
        let pow = 10i128.checked_pow(scale.unsigned_abs())?;
        if scale >= 0 {
            Self::new(num.checked_mul(pow)?, 1)
        } else {
            Self::new(num, pow)
        }
    }

    /// Exact value of the shortest decimal that round-trips to `x`.
    ///
    /// This recovers `0.1` from the double nearest to 0.1 instead of the
    /// binary expansion, which is what a user typing `0.1` meant.
    pub fn from_f64(x: f64) -> Option<Self> {
        if !x.is_finite() {
            return None;
        }
        Self::parse_decimal(&format!("{}", x))
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let g1 = gcd_i128(self.num, other.den).max(1);
        let g2 = gcd_i128(other.num, self.den).max(1);
        let num = (self.num / g1).checked_mul(other.num / g2)?;
        let den = (self.den / g2).checked_mul(other.den / g1)?;
        Self::new(num, den)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.num == 0 {
            return None;
        }
        self.checked_mul(Self::new(other.den, other.num)?)
    }

    /// Greatest common divisor: the largest rational `g` such that both
    /// values are integer multiples of `g`.
    pub fn gcd(self, other: Self) -> Option<Self> {
        let a = self.num.checked_mul(other.den)?;
        let b = other.num.checked_mul(self.den)?;
        let den = self.den.checked_mul(other.den)?;
        Self::new(gcd_i128(a, b), den)
    }

    /// Largest integer not greater than the value.
    #[inline]
    pub fn floor(self) -> i128 {
        self.num.div_euclid(self.den)
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Fall back to f64 if cross-multiplication overflows.
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}
