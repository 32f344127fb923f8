//! Binary parameter block: layout, parsing and validation
//!
//! The block is written by the host tool-chain and deposited next to the
//! neuron processor. All fields are little-endian 32-bit words:
//!
//! ```text
//! header    magic "LIFC" | version | model | num_neurons | num_receptors
//!           | num_neuron_types | timestep_us | flags
//! receptors num_receptors x { decay_raw | sign | weight_frac_bits }
//! types     num_neuron_types x { v_rest | v_reset | v_thresh
//!           | membrane_decay | input_scale | refractory_ticks }
//! arrays    type_index: len, len x u32
//!           bias:       len, len x i32 (Q15.16)
//!           record:     len, len x u32 bit-field words
//! trailer   crc32 over every preceding byte
//! ```

use std::path::Path;

use crate::{
    error::{ConfigError, Result},
    fixed_point::Q15_16,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Magic number: "LIFC"
pub const MAGIC: [u8; 4] = [0x4C, 0x49, 0x46, 0x43];

/// Current block version
pub const BLOCK_VERSION: u32 = 1;

/// Largest population a single core accepts
pub const MAX_NEURONS_PER_CORE: usize = 4096;

/// Largest number of receptor types per neuron
pub const MAX_RECEPTORS: usize = 4;

/// Bytes in the fixed header
pub const HEADER_BYTES: usize = 32;

const RECEPTOR_BYTES: usize = 12;
const NEURON_TYPE_BYTES: usize = 24;

/// Number of 32-bit words a bit-field of `bits` bits occupies
pub const fn words_for_bits(bits: usize) -> usize {
    (bits + 31) / 32
}

/// Neuron model selected by the block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeuronModelId {
    /// Current-based leaky integrate-and-fire with exponential synapses
    LifCurrExp,
}

impl NeuronModelId {
    /// Wire value
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::LifCurrExp => 0,
        }
    }

    /// Parse the wire value
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::LifCurrExp),
            model => Err(ConfigError::UnknownModel { model }),
        }
    }
}

/// Header flag word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockFlags(pub u32);

impl BlockFlags {
    /// Record synaptic trace values alongside membrane potential
    pub const RECORD_TRACES: u32 = 1 << 0;
    /// Record spikes of neurons flagged for recording
    pub const RECORD_SPIKES: u32 = 1 << 1;
    const KNOWN: u32 = Self::RECORD_TRACES | Self::RECORD_SPIKES;

    /// Check whether a flag bit is set
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Set a flag bit
    pub fn insert(&mut self, flag: u32) {
        self.0 |= flag;
    }
}

/// Sign applied to a receptor's trace when summing synaptic current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ReceptorSign {
    /// Trace adds to the input current
    Excitatory,
    /// Trace subtracts from the input current
    Inhibitory,
}

impl ReceptorSign {
    /// Wire value (+1 / -1)
    pub const fn to_i32(self) -> i32 {
        match self {
            Self::Excitatory => 1,
            Self::Inhibitory => -1,
        }
    }

    fn from_i32(value: i32, receptor: usize) -> Result<Self> {
        match value {
            1 => Ok(Self::Excitatory),
            -1 => Ok(Self::Inhibitory),
            other => Err(ConfigError::invalid_value(
                format!("receptors[{}].sign", receptor),
                format!("{} (expected +1 or -1)", other),
            )),
        }
    }
}

/// Static parameters of one receptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceptorParams {
    /// Per-tick trace decay factor, exp(-dt/tau)
    pub decay: Q15_16,
    /// Contribution sign
    pub sign: ReceptorSign,
    /// Fractional bits of raw integer weights delivered to this receptor
    pub weight_frac_bits: u32,
}

impl ReceptorParams {
    /// Convert a raw integer weight into Q15.16
    pub fn scale_weight(&self, raw: i32) -> Q15_16 {
        let frac = self.weight_frac_bits;
        let wide = if frac <= Q15_16::FRAC_BITS {
            (raw as i64) << (Q15_16::FRAC_BITS - frac)
        } else {
            (raw as i64) >> (frac - Q15_16::FRAC_BITS)
        };
        Q15_16::from_raw(wide.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

/// Static parameters shared by every neuron of one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronTypeParams {
    /// Resting potential (mV)
    pub v_rest: Q15_16,
    /// Reset potential after a spike (mV)
    pub v_reset: Q15_16,
    /// Spike threshold (mV)
    pub v_thresh: Q15_16,
    /// Per-tick membrane decay factor, exp(-dt/tau_m)
    pub membrane_decay: Q15_16,
    /// Potential change per unit input current per tick
    pub input_scale: Q15_16,
    /// Ticks spent refractory after a spike
    pub refractory_ticks: u32,
}

/// Validated, immutable parameter block
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParamBlock {
    /// Neuron model
    pub model: NeuronModelId,
    /// Tick length in microseconds
    pub timestep_us: u32,
    /// Header flags
    pub flags: BlockFlags,
    /// Receptor table, indexed by receptor type
    pub receptors: Vec<ReceptorParams>,
    /// Neuron type table
    pub neuron_types: Vec<NeuronTypeParams>,
    /// Neuron type of every neuron
    pub type_index: Vec<u32>,
    /// Constant bias current of every neuron
    pub bias: Vec<Q15_16>,
    /// Record flags as packed bit-field words
    pub record_words: Vec<u32>,
}

impl ParamBlock {
    /// Population size
    pub fn num_neurons(&self) -> usize {
        self.type_index.len()
    }

    /// Number of receptor types
    pub fn num_receptors(&self) -> usize {
        self.receptors.len()
    }

    /// Parameters of the type neuron `index` belongs to
    pub fn params_for(&self, index: usize) -> &NeuronTypeParams {
        &self.neuron_types[self.type_index[index] as usize]
    }

    /// Whether neuron `index` is flagged for recording
    pub fn is_recorded(&self, index: usize) -> bool {
        self.record_words[index / 32] & (1 << (index % 32)) != 0
    }

    /// Parse and validate a raw block
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let payload_len = bytes.len().checked_sub(4).ok_or(ConfigError::Truncated {
            section: "trailer",
            needed: 4,
            available: bytes.len(),
        })?;

        let mut reader = ByteReader::new(bytes);

        let found = reader.magic()?;
        if found != MAGIC {
            return Err(ConfigError::InvalidMagic {
                expected: MAGIC,
                found,
            });
        }
        let version = reader.u32("header")?;
        if version != BLOCK_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                version,
                supported: BLOCK_VERSION,
            });
        }
        let model = NeuronModelId::from_u32(reader.u32("header")?)?;
        let num_neurons = reader.u32("header")? as usize;
        let num_receptors = reader.u32("header")? as usize;
        let num_neuron_types = reader.u32("header")? as usize;
        let timestep_us = reader.u32("header")?;
        let flags = BlockFlags(reader.u32("header")?);

        // Size checks come before any table is allocated
        if num_neurons == 0 || num_neurons > MAX_NEURONS_PER_CORE {
            return Err(ConfigError::invalid_value(
                "num_neurons",
                format!("{} (expected 1..={})", num_neurons, MAX_NEURONS_PER_CORE),
            ));
        }
        if num_receptors == 0 || num_receptors > MAX_RECEPTORS {
            return Err(ConfigError::invalid_value(
                "num_receptors",
                format!("{} (expected 1..={})", num_receptors, MAX_RECEPTORS),
            ));
        }
        if num_neuron_types == 0 || num_neuron_types > num_neurons {
            return Err(ConfigError::invalid_value(
                "num_neuron_types",
                format!("{} (expected 1..={})", num_neuron_types, num_neurons),
            ));
        }

        reader.require("receptors", num_receptors * RECEPTOR_BYTES)?;
        let mut receptors = Vec::with_capacity(num_receptors);
        for r in 0..num_receptors {
            let decay = Q15_16::from_raw(reader.i32("receptors")?);
            let sign = ReceptorSign::from_i32(reader.i32("receptors")?, r)?;
            let weight_frac_bits = reader.u32("receptors")?;
            receptors.push(ReceptorParams {
                decay,
                sign,
                weight_frac_bits,
            });
        }

        reader.require("neuron_types", num_neuron_types * NEURON_TYPE_BYTES)?;
        let mut neuron_types = Vec::with_capacity(num_neuron_types);
        for _ in 0..num_neuron_types {
            neuron_types.push(NeuronTypeParams {
                v_rest: Q15_16::from_raw(reader.i32("neuron_types")?),
                v_reset: Q15_16::from_raw(reader.i32("neuron_types")?),
                v_thresh: Q15_16::from_raw(reader.i32("neuron_types")?),
                membrane_decay: Q15_16::from_raw(reader.i32("neuron_types")?),
                input_scale: Q15_16::from_raw(reader.i32("neuron_types")?),
                refractory_ticks: reader.u32("neuron_types")?,
            });
        }

        let type_index = reader.array("type_index", num_neurons, |r| r.u32("type_index"))?;
        let bias = reader.array("bias", num_neurons, |r| {
            r.i32("bias").map(Q15_16::from_raw)
        })?;
        let record_words =
            reader.array("record", words_for_bits(num_neurons), |r| r.u32("record"))?;

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

        let block = Self {
            model,
            timestep_us,
            flags,
            receptors,
            neuron_types,
            type_index,
            bias,
            record_words,
        };
        block.validate()?;

        log::info!(
            "Loaded parameter block: {} neurons, {} receptor types, {} neuron types, dt={}us",
            block.num_neurons(),
            block.num_receptors(),
            block.neuron_types.len(),
            block.timestep_us
        );
        Ok(block)
    }

    /// Parse a block that must describe exactly `num_neurons` neurons
    pub fn parse_for_population(bytes: &[u8], num_neurons: usize) -> Result<Self> {
        let block = Self::parse(bytes)?;
        if block.num_neurons() != num_neurons {
            return Err(ConfigError::PopulationSizeMismatch {
                expected: num_neurons,
                found: block.num_neurons(),
            });
        }
        Ok(block)
    }

    /// Read and parse a block from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Check semantic constraints on an assembled block
    pub fn validate(&self) -> Result<()> {
        let n = self.num_neurons();
        if n == 0 || n > MAX_NEURONS_PER_CORE {
            return Err(ConfigError::invalid_value(
                "num_neurons",
                format!("{} (expected 1..={})", n, MAX_NEURONS_PER_CORE),
            ));
        }
        if self.bias.len() != n {
            return Err(ConfigError::length_mismatch("bias", n, self.bias.len()));
        }
        if self.record_words.len() != words_for_bits(n) {
            return Err(ConfigError::length_mismatch(
                "record",
                words_for_bits(n),
                self.record_words.len(),
            ));
        }
        if self.receptors.is_empty() || self.receptors.len() > MAX_RECEPTORS {
            return Err(ConfigError::invalid_value(
                "num_receptors",
                format!("{} (expected 1..={})", self.receptors.len(), MAX_RECEPTORS),
            ));
        }
        if self.neuron_types.is_empty() {
            return Err(ConfigError::invalid_value("num_neuron_types", "0 (expected >= 1)"));
        }
        if self.timestep_us == 0 {
            return Err(ConfigError::invalid_value("timestep_us", "0 (expected > 0)"));
        }
        if self.flags.0 & !BlockFlags::KNOWN != 0 {
            return Err(ConfigError::invalid_value(
                "flags",
                format!("unknown bits {:#x}", self.flags.0 & !BlockFlags::KNOWN),
            ));
        }

        for (r, receptor) in self.receptors.iter().enumerate() {
            check_decay(format!("receptors[{}].decay", r), receptor.decay)?;
            if receptor.weight_frac_bits > 31 {
                return Err(ConfigError::invalid_value(
                    format!("receptors[{}].weight_frac_bits", r),
                    format!("{} (expected <= 31)", receptor.weight_frac_bits),
                ));
            }
        }

        for (t, params) in self.neuron_types.iter().enumerate() {
            check_decay(format!("neuron_types[{}].membrane_decay", t), params.membrane_decay)?;
            if params.v_reset >= params.v_thresh {
                return Err(ConfigError::invalid_value(
                    format!("neuron_types[{}].v_reset", t),
                    format!("{} (expected < v_thresh {})", params.v_reset, params.v_thresh),
                ));
            }
            if params.input_scale < Q15_16::ZERO {
                return Err(ConfigError::invalid_value(
                    format!("neuron_types[{}].input_scale", t),
                    format!("{} (expected >= 0)", params.input_scale),
                ));
            }
        }

        for (i, &t) in self.type_index.iter().enumerate() {
            if t as usize >= self.neuron_types.len() {
                return Err(ConfigError::invalid_value(
                    format!("type_index[{}]", i),
                    format!("{} (expected < {})", t, self.neuron_types.len()),
                ));
            }
        }

        let tail_bits = n % 32;
        if tail_bits != 0 {
            let last = self.record_words[self.record_words.len() - 1];
            if last >> tail_bits != 0 {
                return Err(ConfigError::invalid_value(
                    "record",
                    format!("flags set beyond neuron {}", n - 1),
                ));
            }
        }

        Ok(())
    }

    /// Serialise into the binary layout, including the checksum trailer
    pub fn encode(&self) -> Vec<u8> {
        let n = self.num_neurons();
        let mut out = Vec::with_capacity(
            HEADER_BYTES
                + self.receptors.len() * RECEPTOR_BYTES
                + self.neuron_types.len() * NEURON_TYPE_BYTES
                + 12
                + 8 * n
                + 4 * self.record_words.len()
                + 4,
        );

        out.extend_from_slice(&MAGIC);
        for word in [
            BLOCK_VERSION,
            self.model.to_u32(),
            n as u32,
            self.receptors.len() as u32,
            self.neuron_types.len() as u32,
            self.timestep_us,
            self.flags.0,
        ] {
            out.extend_from_slice(&word.to_le_bytes());
        }

        for receptor in &self.receptors {
            out.extend_from_slice(&receptor.decay.to_raw().to_le_bytes());
            out.extend_from_slice(&receptor.sign.to_i32().to_le_bytes());
            out.extend_from_slice(&receptor.weight_frac_bits.to_le_bytes());
        }

        for params in &self.neuron_types {
            for value in [
                params.v_rest,
                params.v_reset,
                params.v_thresh,
                params.membrane_decay,
                params.input_scale,
            ] {
                out.extend_from_slice(&value.to_raw().to_le_bytes());
            }
            out.extend_from_slice(&params.refractory_ticks.to_le_bytes());
        }

        out.extend_from_slice(&(self.type_index.len() as u32).to_le_bytes());
        for &t in &self.type_index {
            out.extend_from_slice(&t.to_le_bytes());
        }
        out.extend_from_slice(&(self.bias.len() as u32).to_le_bytes());
        for b in &self.bias {
            out.extend_from_slice(&b.to_raw().to_le_bytes());
        }
        out.extend_from_slice(&(self.record_words.len() as u32).to_le_bytes());
        for &w in &self.record_words {
            out.extend_from_slice(&w.to_le_bytes());
        }

        let checksum = crc32fast::hash(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }
}

fn check_decay(field: String, decay: Q15_16) -> Result<()> {
    if decay < Q15_16::ZERO || decay > Q15_16::ONE {
        return Err(ConfigError::invalid_value(
            field,
            format!("{} (expected within [0, 1])", decay),
        ));
    }
    Ok(())
}

/// Little-endian cursor over a block
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn require(&self, section: &'static str, needed: usize) -> Result<()> {
        let available = self.data.len() - self.pos;
        if available < needed {
            return Err(ConfigError::Truncated {
                section,
                needed,
                available,
            });
        }
        Ok(())
    }

    fn take4(&mut self, section: &'static str) -> Result<[u8; 4]> {
        self.require(section, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(word)
    }

    pub(crate) fn magic(&mut self) -> Result<[u8; 4]> {
        self.take4("header")
    }

    pub(crate) fn u32(&mut self, section: &'static str) -> Result<u32> {
        self.take4(section).map(u32::from_le_bytes)
    }

    pub(crate) fn i32(&mut self, section: &'static str) -> Result<i32> {
        self.take4(section).map(i32::from_le_bytes)
    }

    /// Length-prefixed array whose length must equal `expected`
    pub(crate) fn array<T>(
        &mut self,
        field: &'static str,
        expected: usize,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let found = self.u32(field)? as usize;
        if found != expected {
            return Err(ConfigError::length_mismatch(field, expected, found));
        }
        self.require(field, 4 * expected)?;
        let mut values = Vec::with_capacity(expected);
        for _ in 0..expected {
            values.push(read(self)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> ParamBlock {
        ParamBlock {
            model: NeuronModelId::LifCurrExp,
            timestep_us: 1000,
            flags: BlockFlags(BlockFlags::RECORD_TRACES),
            receptors: vec![
                ReceptorParams {
                    decay: Q15_16::from_f64(0.8187),
                    sign: ReceptorSign::Excitatory,
                    weight_frac_bits: 16,
                },
                ReceptorParams {
                    decay: Q15_16::from_f64(0.9048),
                    sign: ReceptorSign::Inhibitory,
                    weight_frac_bits: 16,
                },
            ],
            neuron_types: vec![NeuronTypeParams {
                v_rest: Q15_16::from_int(-65),
                v_reset: Q15_16::from_int(-70),
                v_thresh: Q15_16::from_int(-50),
                membrane_decay: Q15_16::from_f64(0.9512),
                input_scale: Q15_16::from_f64(0.9754),
                refractory_ticks: 2,
            }],
            type_index: vec![0; 3],
            bias: vec![Q15_16::ZERO; 3],
            record_words: vec![0b101],
        }
    }

    fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
        bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn reseal(bytes: &mut Vec<u8>) {
        let len = bytes.len() - 4;
        let crc = crc32fast::hash(&bytes[..len]);
        put_u32(bytes, len, crc);
    }

    #[test]
    fn test_parse_encoded_block() {
        let block = sample_block();
        let parsed = ParamBlock::parse(&block.encode()).unwrap();
        assert_eq!(parsed, block);
        assert!(parsed.is_recorded(0));
        assert!(!parsed.is_recorded(1));
        assert!(parsed.is_recorded(2));
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = sample_block().encode();
        bytes[0] = b'X';
        reseal(&mut bytes);
        assert!(matches!(
            ParamBlock::parse(&bytes),
            Err(ConfigError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_unknown_model() {
        let mut bytes = sample_block().encode();
        put_u32(&mut bytes, 8, 7);
        reseal(&mut bytes);
        assert!(matches!(
            ParamBlock::parse(&bytes),
            Err(ConfigError::UnknownModel { model: 7 })
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = sample_block().encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            ParamBlock::parse(&bytes),
            Err(ConfigError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_array_length_mismatch() {
        let block = sample_block();
        let mut bytes = block.encode();
        let type_index_len_offset =
            HEADER_BYTES + 2 * RECEPTOR_BYTES + NEURON_TYPE_BYTES;
        put_u32(&mut bytes, type_index_len_offset, 2);
        reseal(&mut bytes);
        match ParamBlock::parse(&bytes) {
            Err(ConfigError::LengthMismatch { field, expected, found }) => {
                assert_eq!(field, "type_index");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_block() {
        let bytes = sample_block().encode();
        assert!(matches!(
            ParamBlock::parse(&bytes[..HEADER_BYTES + 6]),
            Err(ConfigError::Truncated { .. })
        ));
        assert!(matches!(
            ParamBlock::parse(&bytes[..2]),
            Err(ConfigError::Truncated { .. })
        ));
    }

    #[test]
    fn test_block_cut_inside_record_array() {
        let bytes = sample_block().encode();
        // Drop the last record word, so the array runs into the trailer
        let mut cut = bytes[..bytes.len() - 8].to_vec();
        cut.extend_from_slice(&bytes[bytes.len() - 4..]);
        match ParamBlock::parse(&cut) {
            Err(ConfigError::Truncated { section, .. }) => assert_eq!(section, "trailer"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample_block().encode();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        reseal(&mut bytes);
        assert!(matches!(
            ParamBlock::parse(&bytes),
            Err(ConfigError::TrailingBytes { count: 4 })
        ));
    }

    #[test]
    fn test_population_size_mismatch() {
        let bytes = sample_block().encode();
        assert!(ParamBlock::parse_for_population(&bytes, 3).is_ok());
        assert!(matches!(
            ParamBlock::parse_for_population(&bytes, 4),
            Err(ConfigError::PopulationSizeMismatch { expected: 4, found: 3 })
        ));
    }

    #[test]
    fn test_semantic_validation() {
        let mut block = sample_block();
        block.type_index[1] = 5;
        assert!(matches!(
            ParamBlock::parse(&block.encode()),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut block = sample_block();
        block.receptors[0].decay = Q15_16::from_f64(1.5);
        assert!(block.validate().is_err());

        let mut block = sample_block();
        block.neuron_types[0].v_reset = block.neuron_types[0].v_thresh;
        assert!(block.validate().is_err());

        let mut block = sample_block();
        block.record_words[0] |= 1 << 3;
        assert!(block.validate().is_err());
    }

    #[test]
    fn test_scale_weight() {
        let receptor = ReceptorParams {
            decay: Q15_16::ONE,
            sign: ReceptorSign::Excitatory,
            weight_frac_bits: 8,
        };
        // 384 with 8 fractional bits is 1.5
        assert_eq!(receptor.scale_weight(384), Q15_16::from_f64(1.5));

        let wide = ReceptorParams { weight_frac_bits: 20, ..receptor };
        assert_eq!(wide.scale_weight(1 << 20), Q15_16::ONE);
    }
}
