//! BCPNN plasticity region: a learning projection onto the population
//!
//! A Bayesian Confidence Propagation Neural Network synapse learns the
//! co-activation probability of a presynaptic source and a postsynaptic
//! neuron. Each side keeps a fast primary trace `Z` and a slow probability
//! trace `P`; each synapse keeps a joint trace `Pij`. The weight passed to the
//! input ring is `w_max * ln(Pij / (Pi * Pj))` and the intrinsic bias of a
//! postsynaptic neuron is `phi * ln(Pj)`, both with an `epsilon` prior.
//!
//! The region is written by the host next to the parameter block:
//!
//! ```text
//! header     magic "BCPN" | version | num_pre | num_post | receptor | delay
//!            | mode | timestep_us
//! constants  a_i | a_j | a_ij | epsilon | epsilon_squared | phi | w_max
//! tables     zi, zj, p: time_shift, len, len x i32
//!            ln:        input_shift, len, len x i32
//! weights    len, len x i32 (pre-major)
//! trailer    crc32 over every preceding byte
//! ```

use std::path::Path;

use crate::{
    block::ByteReader,
    decay::ExpDecayLut,
    error::{ConfigError, Result},
    fixed_point::Q15_16,
    ln::{LnLut, LN_LUT_INPUT_SHIFT},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Magic number: "BCPN"
pub const BCPNN_MAGIC: [u8; 4] = [0x42, 0x43, 0x50, 0x4E];

/// Current region version
pub const BCPNN_VERSION: u32 = 1;

/// Largest postsynaptic population one core learns for
pub const BCPNN_MAX_POST_NEURONS: usize = 256;

/// Largest number of presynaptic sources
pub const BCPNN_MAX_PRE_SOURCES: usize = 4096;

/// Largest delay of the learnt weights (ticks)
pub const BCPNN_MAX_DELAY: u32 = 7;

/// Entries in each primary trace decay table
pub const Z_LUT_ENTRIES: usize = 128;

/// Entries in the probability trace decay table
pub const P_LUT_ENTRIES: usize = 1136;

/// Sampling shift of the probability trace decay table
pub const P_LUT_TIME_SHIFT: u32 = 3;

const MAX_LUT_ENTRIES: usize = 4096;

/// Mode word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BcpnnMode(pub u32);

impl BcpnnMode {
    /// Weights are passed to the input ring
    pub const WEIGHTS: u32 = 1 << 0;
    /// Traces learn from pre and post spikes
    pub const PLASTICITY: u32 = 1 << 1;
    /// Learnt intrinsic bias is passed to the neurons
    pub const BIAS: u32 = 1 << 2;
    const KNOWN: u32 = Self::WEIGHTS | Self::PLASTICITY | Self::BIAS;

    /// Check whether a mode bit is set
    pub const fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

/// Physical description of the learning rule
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BcpnnSpec {
    /// Presynaptic primary trace time constant (ms)
    pub tau_zi_ms: f64,
    /// Postsynaptic primary trace time constant (ms)
    pub tau_zj_ms: f64,
    /// Probability trace time constant (ms)
    pub tau_p_ms: f64,
    /// Firing rate that represents certainty (Hz)
    pub f_max_hz: f64,
    /// Scaling of the intrinsic bias into current (nA)
    pub phi_na: f64,
    /// Scaling of the weights into current (nA)
    pub w_max: f64,
    /// Initial weight of every synapse, used while plasticity is off (nA)
    pub weight: f64,
    /// Receptor the weights are delivered to
    pub receptor: u8,
    /// Delivery delay of the weights (ticks)
    pub delay: u8,
    /// Pass weights to the input ring
    pub weights_enabled: bool,
    /// Learn from spikes
    pub plasticity_enabled: bool,
    /// Pass the learnt intrinsic bias to the neurons
    pub bias_enabled: bool,
}

impl Default for BcpnnSpec {
    fn default() -> Self {
        Self {
            tau_zi_ms: 5.0,
            tau_zj_ms: 5.0,
            tau_p_ms: 1000.0,
            f_max_hz: 20.0,
            phi_na: 0.05,
            w_max: 2.0,
            weight: 0.0,
            receptor: 0,
            delay: 0,
            weights_enabled: true,
            plasticity_enabled: true,
            bias_enabled: true,
        }
    }
}

impl BcpnnSpec {
    fn check(&self, dt_ms: f64) -> Result<()> {
        if !dt_ms.is_finite() || dt_ms <= 0.0 {
            return Err(ConfigError::invalid_value("timestep", format!("{} (expected > 0)", dt_ms)));
        }
        for (field, value) in [
            ("tau_zi_ms", self.tau_zi_ms),
            ("tau_zj_ms", self.tau_zj_ms),
            ("tau_p_ms", self.tau_p_ms),
            ("f_max_hz", self.f_max_hz),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_value(field, format!("{} (expected > 0)", value)));
            }
        }
        if self.tau_zi_ms >= self.tau_p_ms || self.tau_zj_ms >= self.tau_p_ms {
            return Err(ConfigError::invalid_value(
                "tau_p_ms",
                format!(
                    "{} (expected > tau_zi_ms {} and tau_zj_ms {})",
                    self.tau_p_ms, self.tau_zi_ms, self.tau_zj_ms
                ),
            ));
        }
        if self.delay as u32 > BCPNN_MAX_DELAY {
            return Err(ConfigError::invalid_value(
                "delay",
                format!("{} (expected <= {})", self.delay, BCPNN_MAX_DELAY),
            ));
        }
        Ok(())
    }

    /// Mode word for the enabled stages
    pub fn mode(&self) -> BcpnnMode {
        let mut mode = 0;
        if self.weights_enabled {
            mode |= BcpnnMode::WEIGHTS;
        }
        if self.plasticity_enabled {
            mode |= BcpnnMode::PLASTICITY;
        }
        if self.bias_enabled {
            mode |= BcpnnMode::BIAS;
        }
        BcpnnMode(mode)
    }
}

/// Validated, immutable plasticity region
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BcpnnRegion {
    /// Tick length in microseconds, must match the parameter block
    pub timestep_us: u32,
    /// Number of presynaptic sources
    pub num_pre: usize,
    /// Number of postsynaptic neurons, must match the population
    pub num_post: usize,
    /// Receptor the weights are delivered to
    pub receptor: u8,
    /// Delivery delay of the weights (ticks)
    pub delay: u8,
    /// Enabled stages
    pub mode: BcpnnMode,
    /// Presynaptic probability per unit trace difference
    pub a_i: Q15_16,
    /// Postsynaptic probability per unit trace difference
    pub a_j: Q15_16,
    /// Joint probability per unit trace difference
    pub a_ij: Q15_16,
    /// Probability prior
    pub epsilon: Q15_16,
    /// Joint probability prior
    pub epsilon_squared: Q15_16,
    /// Intrinsic bias scale (nA)
    pub phi: Q15_16,
    /// Weight scale (nA)
    pub w_max: Q15_16,
    /// Presynaptic primary trace decay
    pub zi_lut: ExpDecayLut,
    /// Postsynaptic primary trace decay
    pub zj_lut: ExpDecayLut,
    /// Probability trace decay
    pub p_lut: ExpDecayLut,
    /// Natural logarithm table
    pub ln_lut: LnLut,
    /// Fixed weights, `num_pre x num_post`, pre-major
    pub weights: Vec<Q15_16>,
}

impl BcpnnRegion {
    /// Derive a region for `num_pre` sources onto `num_post` neurons
    pub fn from_spec(spec: &BcpnnSpec, num_pre: usize, num_post: usize, dt_ms: f64) -> Result<Self> {
        spec.check(dt_ms)?;

        let f_max = spec.f_max_hz;
        let tau_zij = 1.0 / (1.0 / spec.tau_zi_ms + 1.0 / spec.tau_zj_ms);
        let epsilon = 1000.0 / (f_max * spec.tau_p_ms);

        let region = Self {
            timestep_us: (dt_ms * 1000.0).round() as u32,
            num_pre,
            num_post,
            receptor: spec.receptor,
            delay: spec.delay,
            mode: spec.mode(),
            a_i: Q15_16::from_f64(1000.0 / (f_max * (spec.tau_zi_ms - spec.tau_p_ms))),
            a_j: Q15_16::from_f64(1000.0 / (f_max * (spec.tau_zj_ms - spec.tau_p_ms))),
            a_ij: Q15_16::from_f64(
                (1.0e6 / (spec.tau_zi_ms + spec.tau_zj_ms))
                    / (f_max * f_max * (tau_zij - spec.tau_p_ms)),
            ),
            epsilon: Q15_16::from_f64(epsilon),
            epsilon_squared: Q15_16::from_f64(epsilon * epsilon),
            phi: Q15_16::from_f64(spec.phi_na),
            w_max: Q15_16::from_f64(spec.w_max),
            zi_lut: ExpDecayLut::new(dt_ms, spec.tau_zi_ms, Z_LUT_ENTRIES, 0)?,
            zj_lut: ExpDecayLut::new(dt_ms, spec.tau_zj_ms, Z_LUT_ENTRIES, 0)?,
            p_lut: ExpDecayLut::new(dt_ms, spec.tau_p_ms, P_LUT_ENTRIES, P_LUT_TIME_SHIFT)?,
            ln_lut: LnLut::new(LN_LUT_INPUT_SHIFT)?,
            weights: vec![Q15_16::from_f64(spec.weight); num_pre * num_post],
        };
        region.validate()?;
        Ok(region)
    }

    /// Weight of the synapse from `pre` onto `post`
    pub fn weight(&self, pre: usize, post: usize) -> Q15_16 {
        self.weights[pre * self.num_post + post]
    }

    /// Check semantic constraints on an assembled region
    pub fn validate(&self) -> Result<()> {
        if self.num_post == 0 || self.num_post > BCPNN_MAX_POST_NEURONS {
            return Err(ConfigError::invalid_value(
                "num_post",
                format!("{} (expected 1..={})", self.num_post, BCPNN_MAX_POST_NEURONS),
            ));
        }
        if self.num_pre == 0 || self.num_pre > BCPNN_MAX_PRE_SOURCES {
            return Err(ConfigError::invalid_value(
                "num_pre",
                format!("{} (expected 1..={})", self.num_pre, BCPNN_MAX_PRE_SOURCES),
            ));
        }
        if self.timestep_us == 0 {
            return Err(ConfigError::invalid_value("timestep_us", "0 (expected > 0)"));
        }
        if self.delay as u32 > BCPNN_MAX_DELAY {
            return Err(ConfigError::invalid_value(
                "delay",
                format!("{} (expected <= {})", self.delay, BCPNN_MAX_DELAY),
            ));
        }
        if self.mode.0 & !BcpnnMode::KNOWN != 0 {
            return Err(ConfigError::invalid_value(
                "mode",
                format!("unknown bits {:#x}", self.mode.0 & !BcpnnMode::KNOWN),
            ));
        }
        if self.epsilon <= Q15_16::ZERO || self.epsilon_squared <= Q15_16::ZERO {
            return Err(ConfigError::invalid_value(
                "epsilon",
                format!("{} / {} (expected > 0)", self.epsilon, self.epsilon_squared),
            ));
        }
        if self.weights.len() != self.num_pre * self.num_post {
            return Err(ConfigError::length_mismatch(
                "weights",
                self.num_pre * self.num_post,
                self.weights.len(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a raw region
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let payload_len = bytes.len().checked_sub(4).ok_or(ConfigError::Truncated {
            section: "trailer",
            needed: 4,
            available: bytes.len(),
        })?;
        let mut reader = ByteReader::new(bytes);

        let found = reader.magic()?;
        if found != BCPNN_MAGIC {
            return Err(ConfigError::InvalidMagic {
                expected: BCPNN_MAGIC,
                found,
            });
        }
        let version = reader.u32("header")?;
        if version != BCPNN_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                version,
                supported: BCPNN_VERSION,
            });
        }
        let num_pre = reader.u32("header")? as usize;
        let num_post = reader.u32("header")? as usize;
        let receptor = reader.u32("header")?;
        let delay = reader.u32("header")?;
        let mode = BcpnnMode(reader.u32("header")?);
        let timestep_us = reader.u32("header")?;

        if num_post == 0 || num_post > BCPNN_MAX_POST_NEURONS {
            return Err(ConfigError::invalid_value(
                "num_post",
                format!("{} (expected 1..={})", num_post, BCPNN_MAX_POST_NEURONS),
            ));
        }
        if num_pre == 0 || num_pre > BCPNN_MAX_PRE_SOURCES {
            return Err(ConfigError::invalid_value(
                "num_pre",
                format!("{} (expected 1..={})", num_pre, BCPNN_MAX_PRE_SOURCES),
            ));
        }
        let receptor = u8::try_from(receptor)
            .map_err(|_| ConfigError::invalid_value("receptor", receptor.to_string()))?;
        let delay = u8::try_from(delay)
            .map_err(|_| ConfigError::invalid_value("delay", delay.to_string()))?;

        let mut constant = || reader.i32("constants").map(Q15_16::from_raw);
        let a_i = constant()?;
        let a_j = constant()?;
        let a_ij = constant()?;
        let epsilon = constant()?;
        let epsilon_squared = constant()?;
        let phi = constant()?;
        let w_max = constant()?;

        let zi_lut = read_decay_lut(&mut reader, "zi_lut")?;
        let zj_lut = read_decay_lut(&mut reader, "zj_lut")?;
        let p_lut = read_decay_lut(&mut reader, "p_lut")?;
        let input_shift = reader.u32("ln_lut")?;
        let ln_entries = read_table(&mut reader, "ln_lut")?;
        let ln_lut = LnLut::from_entries(input_shift, ln_entries)?;

        let weights = reader.array("weights", num_pre * num_post, |r| {
            r.i32("weights").map(Q15_16::from_raw)
        })?;

        if reader.position() > payload_len {
            return Err(ConfigError::Truncated {
                section: "trailer",
                needed: 4,
                available: bytes.len() - reader.position(),
            });
        }
        if reader.position() < payload_len {
            return Err(ConfigError::TrailingBytes {
                count: payload_len - reader.position(),
            });
        }
        let expected = reader.u32("trailer")?;
        let computed = crc32fast::hash(&bytes[..payload_len]);
        if expected != computed {
            return Err(ConfigError::ChecksumMismatch { expected, computed });
        }

        let region = Self {
            timestep_us,
            num_pre,
            num_post,
            receptor,
            delay,
            mode,
            a_i,
            a_j,
            a_ij,
            epsilon,
            epsilon_squared,
            phi,
            w_max,
            zi_lut,
            zj_lut,
            p_lut,
            ln_lut,
            weights,
        };
        region.validate()?;

        log::info!(
            "Loaded plasticity region: {} sources onto {} neurons, receptor {}, mode {:#x}",
            region.num_pre,
            region.num_post,
            region.receptor,
            region.mode.0
        );
        Ok(region)
    }

    /// Read and parse a region from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Serialise into the binary layout, including the checksum trailer
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&BCPNN_MAGIC);
        for word in [
            BCPNN_VERSION,
            self.num_pre as u32,
            self.num_post as u32,
            self.receptor as u32,
            self.delay as u32,
            self.mode.0,
            self.timestep_us,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for value in [
            self.a_i,
            self.a_j,
            self.a_ij,
            self.epsilon,
            self.epsilon_squared,
            self.phi,
            self.w_max,
        ] {
            out.extend_from_slice(&value.to_raw().to_le_bytes());
        }
        for lut in [&self.zi_lut, &self.zj_lut, &self.p_lut] {
            out.extend_from_slice(&lut.time_shift().to_le_bytes());
            write_table(&mut out, lut.entries());
        }
        out.extend_from_slice(&self.ln_lut.input_shift().to_le_bytes());
        write_table(&mut out, self.ln_lut.entries());
        write_table(&mut out, &self.weights);

        let checksum = crc32fast::hash(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }
}

fn write_table(out: &mut Vec<u8>, values: &[Q15_16]) {
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for value in values {
        out.extend_from_slice(&value.to_raw().to_le_bytes());
    }
}

fn read_table(reader: &mut ByteReader<'_>, field: &'static str) -> Result<Vec<Q15_16>> {
    let len = reader.u32(field)? as usize;
    if len == 0 || len > MAX_LUT_ENTRIES {
        return Err(ConfigError::invalid_value(
            field,
            format!("{} entries (expected 1..={})", len, MAX_LUT_ENTRIES),
        ));
    }
    reader.require(field, 4 * len)?;
    (0..len)
        .map(|_| reader.i32(field).map(Q15_16::from_raw))
        .collect()
}

fn read_decay_lut(reader: &mut ByteReader<'_>, field: &'static str) -> Result<ExpDecayLut> {
    let time_shift = reader.u32(field)?;
    let entries = read_table(reader, field)?;
    ExpDecayLut::from_entries(time_shift, entries)
}
