//! Fixed-point arithmetic for deterministic neuron and synapse updates
//!
//! Every state variable of the neuron processor (membrane potentials,
//! synaptic traces, weights, decay factors) is a [`Q15_16`]. All arithmetic
//! saturates at the representable range instead of wrapping, so an overflow
//! can never flip the sign of a current or potential.

use core::{fmt, ops};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Q15.16 fixed-point number (1 sign bit, 15 integer bits, 16 fractional bits)
///
/// Range: [-32768.0, 32767.99998] with ~0.000015 precision, enough for
/// membrane potentials in mV and synaptic currents in nA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[repr(transparent)]
pub struct Q15_16(i32);

impl Q15_16 {
    /// Number of fractional bits
    pub const FRAC_BITS: u32 = 16;
    /// Scale factor (2^16 = 65536)
    pub const SCALE: i32 = 1 << Self::FRAC_BITS;
    /// Maximum representable value
    pub const MAX: Self = Self(i32::MAX);
    /// Minimum representable value
    pub const MIN: Self = Self(i32::MIN);
    /// Zero value
    pub const ZERO: Self = Self(0);
    /// One value
    pub const ONE: Self = Self(Self::SCALE);
    /// Smallest positive value
    pub const EPSILON: Self = Self(1);

    /// Create from the raw two's complement representation
    #[inline(always)]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw two's complement representation
    #[inline(always)]
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Create from an integer value, saturating outside the range
    #[inline(always)]
    pub const fn from_int(value: i32) -> Self {
        if value > i32::MAX >> Self::FRAC_BITS {
            Self::MAX
        } else if value < i32::MIN >> Self::FRAC_BITS {
            Self::MIN
        } else {
            Self(value << Self::FRAC_BITS)
        }
    }

    /// Create from a float, rounding to nearest and saturating.
    ///
    /// Only used at configuration time; the tick loop never touches floats.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled >= i32::MAX as f64 {
            Self::MAX
        } else if scaled <= i32::MIN as f64 {
            Self::MIN
        } else {
            Self(scaled as i32)
        }
    }

    /// Convert to float (for reporting and tests)
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// True if the value sits on either saturation bound
    #[inline(always)]
    pub const fn is_saturated(self) -> bool {
        self.0 == i32::MAX || self.0 == i32::MIN
    }

    #[inline(always)]
    const fn clamp_wide(value: i64) -> Self {
        if value > i32::MAX as i64 {
            Self::MAX
        } else if value < i32::MIN as i64 {
            Self::MIN
        } else {
            Self(value as i32)
        }
    }

    /// Saturating addition
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self::clamp_wide(self.0 as i64 + other.0 as i64)
    }

    /// Saturating subtraction
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self::clamp_wide(self.0 as i64 - other.0 as i64)
    }

    /// Saturating multiplication, rounding the product to nearest
    #[inline(always)]
    pub const fn saturating_mul(self, other: Self) -> Self {
        let product = self.0 as i64 * other.0 as i64;
        Self::clamp_wide((product + (1 << (Self::FRAC_BITS - 1))) >> Self::FRAC_BITS)
    }

    /// Addition that reports overflow instead of clamping
    #[inline(always)]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtraction that reports overflow instead of clamping
    #[inline(always)]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Rounded multiplication that reports overflow instead of clamping
    #[inline(always)]
    pub const fn checked_mul(self, other: Self) -> Option<Self> {
        let product = self.0 as i64 * other.0 as i64;
        let result = (product + (1 << (Self::FRAC_BITS - 1))) >> Self::FRAC_BITS;
        if result > i32::MAX as i64 || result < i32::MIN as i64 {
            None
        } else {
            Some(Self(result as i32))
        }
    }

    /// Absolute value
    #[inline(always)]
    pub const fn abs(self) -> Self {
        if self.0 >= 0 {
            self
        } else if self.0 == i32::MIN {
            Self::MAX
        } else {
            Self(-self.0)
        }
    }

    /// Negate value
    #[inline(always)]
    pub const fn neg(self) -> Self {
        if self.0 == i32::MIN {
            Self::MAX
        } else {
            Self(-self.0)
        }
    }

    /// Maximum of two values
    #[inline(always)]
    pub const fn max(self, other: Self) -> Self {
        if self.0 > other.0 { self } else { other }
    }

    /// Minimum of two values
    #[inline(always)]
    pub const fn min(self, other: Self) -> Self {
        if self.0 < other.0 { self } else { other }
    }
}

impl fmt::Display for Q15_16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

impl ops::Add for Q15_16 {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl ops::Sub for Q15_16 {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

impl ops::Mul for Q15_16 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, other: Self) -> Self {
        self.saturating_mul(other)
    }
}

impl ops::Neg for Q15_16 {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        Q15_16::neg(self)
    }
}

impl ops::AddAssign for Q15_16 {
    #[inline(always)]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl ops::SubAssign for Q15_16 {
    #[inline(always)]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl From<i32> for Q15_16 {
    #[inline(always)]
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

/// Type alias for easier use
pub type FixedPoint = Q15_16;
