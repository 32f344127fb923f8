//! Exponential decay factors precomputed at configuration time

use crate::{
    error::{ConfigError, Result},
    fixed_point::Q15_16,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-tick decay factor exp(-dt/tau) in Q15.16.
///
/// An infinite `tau_ms` means no decay and yields exactly one.
pub fn decay_factor(dt_ms: f64, tau_ms: f64) -> Result<Q15_16> {
    check_time_constants(dt_ms, tau_ms)?;
    if tau_ms.is_infinite() {
        return Ok(Q15_16::ONE);
    }
    Ok(Q15_16::from_f64((-dt_ms / tau_ms).exp()))
}

fn check_time_constants(dt_ms: f64, tau_ms: f64) -> Result<()> {
    if !dt_ms.is_finite() || dt_ms <= 0.0 {
        return Err(ConfigError::invalid_value("timestep", format!("{} (expected > 0)", dt_ms)));
    }
    if tau_ms.is_nan() || tau_ms <= 0.0 {
        return Err(ConfigError::invalid_value("tau", format!("{} (expected > 0)", tau_ms)));
    }
    Ok(())
}

/// Lookup table of exp(-t/tau) sampled every `2^time_shift` ticks
///
/// Entry `k` holds the decay over `k << time_shift` ticks; lookups past the
/// end of the table are treated as fully decayed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExpDecayLut {
    time_shift: u32,
    entries: Vec<Q15_16>,
}

impl ExpDecayLut {
    /// Build a table with `num_entries` samples
    pub fn new(dt_ms: f64, tau_ms: f64, num_entries: usize, time_shift: u32) -> Result<Self> {
        check_time_constants(dt_ms, tau_ms)?;
        if num_entries == 0 {
            return Err(ConfigError::invalid_value("num_entries", "0 (expected > 0)"));
        }
        if time_shift > 16 {
            return Err(ConfigError::invalid_value(
                "time_shift",
                format!("{} (expected <= 16)", time_shift),
            ));
        }

        let step_ms = dt_ms * (1u32 << time_shift) as f64;
        let entries = (0..num_entries)
            .map(|k| {
                if tau_ms.is_infinite() {
                    Q15_16::ONE
                } else {
                    Q15_16::from_f64((-(k as f64) * step_ms / tau_ms).exp())
                }
            })
            .collect();

        Ok(Self {
            time_shift,
            entries,
        })
    }

    /// Table read back from a parameter region
    pub fn from_entries(time_shift: u32, entries: Vec<Q15_16>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ConfigError::invalid_value("num_entries", "0 (expected > 0)"));
        }
        if time_shift > 16 {
            return Err(ConfigError::invalid_value(
                "time_shift",
                format!("{} (expected <= 16)", time_shift),
            ));
        }
        if let Some(bad) = entries.iter().find(|e| **e < Q15_16::ZERO || **e > Q15_16::ONE) {
            return Err(ConfigError::invalid_value(
                "decay entry",
                format!("{} (expected within [0, 1])", bad),
            ));
        }
        Ok(Self {
            time_shift,
            entries,
        })
    }

    /// Decay accumulated over `ticks` ticks
    pub fn get(&self, ticks: u32) -> Q15_16 {
        let index = (ticks >> self.time_shift) as usize;
        self.entries.get(index).copied().unwrap_or(Q15_16::ZERO)
    }

    /// Largest multiple of the sampling step not exceeding `ticks`
    ///
    /// A trace advanced by this many ticks decays exactly by
    /// [`get`](Self::get); the remainder carries over to the next update.
    pub fn span(&self, ticks: u32) -> u32 {
        (ticks >> self.time_shift) << self.time_shift
    }

    /// Table entries
    pub fn entries(&self) -> &[Q15_16] {
        &self.entries
    }

    /// Sampling shift
    pub fn time_shift(&self) -> u32 {
        self.time_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_factor_values() {
        let d = decay_factor(1.0, 5.0).unwrap();
        assert!((d.to_f64() - (-0.2f64).exp()).abs() < 1e-4);

        assert_eq!(decay_factor(1.0, f64::INFINITY).unwrap(), Q15_16::ONE);
        assert!(decay_factor(0.0, 5.0).is_err());
        assert!(decay_factor(1.0, 0.0).is_err());
        assert!(decay_factor(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_lut_matches_closed_form() {
        let lut = ExpDecayLut::new(1.0, 20.0, 128, 0).unwrap();
        assert_eq!(lut.get(0), Q15_16::ONE);
        for ticks in [1u32, 5, 20, 100] {
            let expected = (-(ticks as f64) / 20.0).exp();
            assert!((lut.get(ticks).to_f64() - expected).abs() < 1e-4);
        }
        assert_eq!(lut.get(128), Q15_16::ZERO);
    }

    #[test]
    fn test_lut_time_shift() {
        let lut = ExpDecayLut::new(1.0, 1000.0, 16, 3).unwrap();
        // ticks 8..15 share entry 1
        assert_eq!(lut.get(8), lut.get(15));
        assert_eq!(lut.span(15), 8);
        assert_eq!(lut.span(7), 0);
        assert!((lut.get(8).to_f64() - (-8.0f64 / 1000.0).exp()).abs() < 1e-4);
        assert!(ExpDecayLut::new(1.0, 10.0, 0, 0).is_err());
    }

    #[test]
    fn test_lut_from_entries() {
        let lut = ExpDecayLut::new(1.0, 5.0, 128, 0).unwrap();
        let copy = ExpDecayLut::from_entries(0, lut.entries().to_vec()).unwrap();
        assert_eq!(copy, lut);
        assert!(ExpDecayLut::from_entries(0, vec![Q15_16::from_int(2)]).is_err());
        assert!(ExpDecayLut::from_entries(17, vec![Q15_16::ONE]).is_err());
    }
}
