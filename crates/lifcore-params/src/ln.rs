//! Natural logarithm by table lookup
//!
//! The argument is split into a power of two and a mantissa in `[1, 2)`.
//! The table covers the mantissa; the exponent contributes whole multiples
//! of ln 2.

use crate::{
    error::{ConfigError, Result},
    fixed_point::Q15_16,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ln 2 in Q15.16
pub const LN_2: Q15_16 = Q15_16::from_raw(45426);

/// Mantissa bits dropped before indexing the table (128 entries)
pub const LN_LUT_INPUT_SHIFT: u32 = 9;

/// Table of ln(x) for x in `[1, 2)`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LnLut {
    input_shift: u32,
    entries: Vec<Q15_16>,
}

impl LnLut {
    /// Table indexed by the top `16 - input_shift` mantissa bits
    pub fn new(input_shift: u32) -> Result<Self> {
        let size = Self::size_for(input_shift)?;
        let entries = (0..size)
            .map(|k| Q15_16::from_f64((1.0 + k as f64 / size as f64).ln()))
            .collect();
        Ok(Self {
            input_shift,
            entries,
        })
    }

    /// Table read back from a parameter region
    pub fn from_entries(input_shift: u32, entries: Vec<Q15_16>) -> Result<Self> {
        let size = Self::size_for(input_shift)?;
        if entries.len() != size {
            return Err(ConfigError::length_mismatch("ln_lut", size, entries.len()));
        }
        let ordered = entries.windows(2).all(|w| w[0] <= w[1]);
        if !ordered || entries[0] < Q15_16::ZERO || entries[size - 1] > LN_2 {
            return Err(ConfigError::invalid_value(
                "ln_lut",
                "entries must rise from 0 towards ln 2",
            ));
        }
        Ok(Self {
            input_shift,
            entries,
        })
    }

    fn size_for(input_shift: u32) -> Result<usize> {
        if input_shift >= Q15_16::FRAC_BITS {
            return Err(ConfigError::invalid_value(
                "ln_lut.input_shift",
                format!("{} (expected < {})", input_shift, Q15_16::FRAC_BITS),
            ));
        }
        Ok((1usize << Q15_16::FRAC_BITS) >> input_shift)
    }

    /// ln(x), or `None` unless `x > 0`
    pub fn ln(&self, x: Q15_16) -> Option<Q15_16> {
        let raw = x.to_raw();
        if raw <= 0 {
            return None;
        }
        let msb = 31 - raw.leading_zeros() as i32;
        let exponent = msb - Q15_16::FRAC_BITS as i32;
        let mantissa = if exponent >= 0 {
            (raw as u32) >> exponent
        } else {
            (raw as u32) << (-exponent) as u32
        };
        let index = ((mantissa & (Q15_16::SCALE as u32 - 1)) >> self.input_shift) as usize;
        let value = exponent as i64 * LN_2.to_raw() as i64 + self.entries[index].to_raw() as i64;
        Some(Q15_16::from_raw(value as i32))
    }

    /// Mantissa bits dropped before indexing
    pub fn input_shift(&self) -> u32 {
        self.input_shift
    }

    /// Table entries
    pub fn entries(&self) -> &[Q15_16] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lut() -> LnLut {
        LnLut::new(LN_LUT_INPUT_SHIFT).unwrap()
    }

    #[test]
    fn test_table_size() {
        assert_eq!(lut().entries().len(), 128);
        assert_eq!(LnLut::new(6).unwrap().entries().len(), 1024);
        assert!(LnLut::new(16).is_err());
    }

    #[test]
    fn test_powers_of_two_are_exact() {
        let lut = lut();
        assert_eq!(lut.ln(Q15_16::ONE), Some(Q15_16::ZERO));
        assert_eq!(lut.ln(Q15_16::from_int(2)), Some(LN_2));
        assert_eq!(lut.ln(Q15_16::from_f64(0.25)).unwrap().to_raw(), -2 * LN_2.to_raw());
    }

    #[test]
    fn test_matches_closed_form() {
        let lut = lut();
        for x in [0.0025, 0.05, 0.3, 1.7, std::f64::consts::E, 100.0, 20000.0] {
            let got = lut.ln(Q15_16::from_f64(x)).unwrap().to_f64();
            assert!((got - x.ln()).abs() < 0.01, "ln({}) = {}", x, got);
        }
    }

    #[test]
    fn test_non_positive_has_no_log() {
        let lut = lut();
        assert_eq!(lut.ln(Q15_16::ZERO), None);
        assert_eq!(lut.ln(Q15_16::from_int(-3)), None);
        assert!(lut.ln(Q15_16::EPSILON).is_some());
    }

    #[test]
    fn test_from_entries_checks_shape() {
        let table = lut();
        assert_eq!(
            LnLut::from_entries(LN_LUT_INPUT_SHIFT, table.entries().to_vec()).unwrap(),
            table
        );
        assert!(LnLut::from_entries(LN_LUT_INPUT_SHIFT, vec![Q15_16::ZERO; 4]).is_err());
        let mut reversed = table.entries().to_vec();
        reversed.reverse();
        assert!(LnLut::from_entries(LN_LUT_INPUT_SHIFT, reversed).is_err());
    }
}
