//! Host-side construction of parameter blocks from physical units
//!
//! Time constants are in ms, potentials in mV, currents in nA and
//! capacitance in nF. All transcendental work happens here, once; the block
//! only carries the resulting per-tick factors.

use core::ops::Range;

use crate::{
    block::{
        words_for_bits, BlockFlags, NeuronModelId, NeuronTypeParams, ParamBlock, ReceptorParams,
        ReceptorSign,
    },
    decay::decay_factor,
    error::{ConfigError, Result},
    fixed_point::Q15_16,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical description of one receptor type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceptorSpec {
    /// Synaptic time constant (ms)
    pub tau_ms: f64,
    /// Contribution sign
    pub sign: ReceptorSign,
    /// Fractional bits of raw integer weights
    #[cfg_attr(feature = "serde", serde(default = "default_weight_frac_bits"))]
    pub weight_frac_bits: u32,
}

#[cfg(feature = "serde")]
fn default_weight_frac_bits() -> u32 {
    Q15_16::FRAC_BITS
}

impl ReceptorSpec {
    /// Excitatory receptor with the given time constant
    pub fn excitatory(tau_ms: f64) -> Self {
        Self {
            tau_ms,
            sign: ReceptorSign::Excitatory,
            weight_frac_bits: Q15_16::FRAC_BITS,
        }
    }

    /// Inhibitory receptor with the given time constant
    pub fn inhibitory(tau_ms: f64) -> Self {
        Self {
            tau_ms,
            sign: ReceptorSign::Inhibitory,
            weight_frac_bits: Q15_16::FRAC_BITS,
        }
    }

    /// Per-tick receptor parameters
    pub fn to_params(&self, dt_ms: f64) -> Result<ReceptorParams> {
        Ok(ReceptorParams {
            decay: decay_factor(dt_ms, self.tau_ms)?,
            sign: self.sign,
            weight_frac_bits: self.weight_frac_bits,
        })
    }
}

/// Physical description of a current-based LIF neuron type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LifSpec {
    /// Membrane time constant (ms); `None` disables the leak
    pub tau_m_ms: Option<f64>,
    /// Membrane capacitance (nF)
    pub c_m_nf: f64,
    /// Resting potential (mV)
    pub v_rest_mv: f64,
    /// Reset potential (mV)
    pub v_reset_mv: f64,
    /// Threshold (mV)
    pub v_thresh_mv: f64,
    /// Refractory period (ms)
    pub tau_refrac_ms: f64,
}

impl Default for LifSpec {
    fn default() -> Self {
        Self {
            tau_m_ms: Some(20.0),
            c_m_nf: 1.0,
            v_rest_mv: -65.0,
            v_reset_mv: -65.0,
            v_thresh_mv: -50.0,
            tau_refrac_ms: 0.1,
        }
    }
}

impl LifSpec {
    /// Per-tick parameters for timestep `dt_ms`
    ///
    /// The membrane factors solve dV/dt = -(V - V_rest)/tau_m + I/C_m exactly
    /// over one tick for constant I.
    pub fn to_params(&self, dt_ms: f64) -> Result<NeuronTypeParams> {
        if self.c_m_nf.is_nan() || self.c_m_nf <= 0.0 {
            return Err(ConfigError::invalid_value(
                "c_m_nf",
                format!("{} (expected > 0)", self.c_m_nf),
            ));
        }
        if self.tau_refrac_ms.is_nan() || self.tau_refrac_ms < 0.0 {
            return Err(ConfigError::invalid_value(
                "tau_refrac_ms",
                format!("{} (expected >= 0)", self.tau_refrac_ms),
            ));
        }

        let tau_m = self.tau_m_ms.unwrap_or(f64::INFINITY);
        let membrane_decay = decay_factor(dt_ms, tau_m)?;
        let input_scale = if tau_m.is_infinite() {
            dt_ms / self.c_m_nf
        } else {
            (tau_m / self.c_m_nf) * (1.0 - (-dt_ms / tau_m).exp())
        };

        Ok(NeuronTypeParams {
            v_rest: Q15_16::from_f64(self.v_rest_mv),
            v_reset: Q15_16::from_f64(self.v_reset_mv),
            v_thresh: Q15_16::from_f64(self.v_thresh_mv),
            membrane_decay,
            input_scale: Q15_16::from_f64(input_scale),
            refractory_ticks: (self.tau_refrac_ms / dt_ms).round() as u32,
        })
    }
}

/// Builder for [`ParamBlock`]s
#[derive(Debug, Clone)]
pub struct ParamBlockBuilder {
    num_neurons: usize,
    timestep_ms: f64,
    receptors: Vec<ReceptorSpec>,
    neuron_types: Vec<LifSpec>,
    assignments: Vec<(Range<usize>, u32)>,
    bias: Vec<(usize, f64)>,
    record: Vec<usize>,
    flags: BlockFlags,
}

impl ParamBlockBuilder {
    /// Start a block for `num_neurons` neurons ticking every `timestep_ms`
    pub fn new(num_neurons: usize, timestep_ms: f64) -> Self {
        Self {
            num_neurons,
            timestep_ms,
            receptors: Vec::new(),
            neuron_types: Vec::new(),
            assignments: Vec::new(),
            bias: Vec::new(),
            record: Vec::new(),
            flags: BlockFlags::default(),
        }
    }

    /// Append a receptor type; its index is the insertion order
    pub fn receptor(mut self, spec: ReceptorSpec) -> Self {
        self.receptors.push(spec);
        self
    }

    /// Append a neuron type; neurons default to type 0
    pub fn neuron_type(mut self, spec: LifSpec) -> Self {
        self.neuron_types.push(spec);
        self
    }

    /// Assign neurons in `range` to neuron type `type_index`
    pub fn assign_type(mut self, range: Range<usize>, type_index: u32) -> Self {
        self.assignments.push((range, type_index));
        self
    }

    /// Constant bias current (nA) for one neuron
    pub fn bias(mut self, neuron: usize, current_na: f64) -> Self {
        self.bias.push((neuron, current_na));
        self
    }

    /// Constant bias current (nA) for every neuron
    pub fn bias_all(mut self, current_na: f64) -> Self {
        for neuron in 0..self.num_neurons {
            self.bias.push((neuron, current_na));
        }
        self
    }

    /// Flag one neuron for recording
    pub fn record(mut self, neuron: usize) -> Self {
        self.record.push(neuron);
        self
    }

    /// Flag every neuron for recording
    pub fn record_all(mut self) -> Self {
        self.record.extend(0..self.num_neurons);
        self
    }

    /// Include synaptic traces in recordings
    pub fn record_traces(mut self, enabled: bool) -> Self {
        self.set_flag(BlockFlags::RECORD_TRACES, enabled);
        self
    }

    /// Record spikes of flagged neurons
    pub fn record_spikes(mut self, enabled: bool) -> Self {
        self.set_flag(BlockFlags::RECORD_SPIKES, enabled);
        self
    }

    fn set_flag(&mut self, flag: u32, enabled: bool) {
        if enabled {
            self.flags.insert(flag);
        } else {
            self.flags.0 &= !flag;
        }
    }

    /// Assemble and validate the block
    pub fn build(self) -> Result<ParamBlock> {
        let n = self.num_neurons;
        let dt_ms = self.timestep_ms;
        let timestep_us = (dt_ms * 1000.0).round();
        if !(1.0..=u32::MAX as f64).contains(&timestep_us) {
            return Err(ConfigError::invalid_value(
                "timestep_ms",
                format!("{} (expected at least 1us)", dt_ms),
            ));
        }

        let receptors = if self.receptors.is_empty() {
            vec![ReceptorSpec::excitatory(5.0), ReceptorSpec::inhibitory(5.0)]
        } else {
            self.receptors
        };
        let receptors = receptors
            .iter()
            .map(|spec| spec.to_params(dt_ms))
            .collect::<Result<Vec<_>>>()?;

        let neuron_types = if self.neuron_types.is_empty() {
            vec![LifSpec::default()]
        } else {
            self.neuron_types
        };
        let neuron_types = neuron_types
            .iter()
            .map(|spec| spec.to_params(dt_ms))
            .collect::<Result<Vec<_>>>()?;

        let mut type_index = vec![0u32; n];
        for (range, t) in self.assignments {
            if range.start > range.end || range.end > n {
                return Err(ConfigError::invalid_value(
                    "assign_type",
                    format!("range {:?} outside population of {}", range, n),
                ));
            }
            type_index[range].iter_mut().for_each(|slot| *slot = t);
        }

        let mut bias = vec![Q15_16::ZERO; n];
        for (neuron, current) in self.bias {
            let slot = bias.get_mut(neuron).ok_or_else(|| {
                ConfigError::invalid_value("bias", format!("neuron {} >= {}", neuron, n))
            })?;
            *slot = Q15_16::from_f64(current);
        }

        let mut record_words = vec![0u32; words_for_bits(n)];
        for neuron in self.record {
            if neuron >= n {
                return Err(ConfigError::invalid_value(
                    "record",
                    format!("neuron {} >= {}", neuron, n),
                ));
            }
            record_words[neuron / 32] |= 1 << (neuron % 32);
        }

        let block = ParamBlock {
            model: NeuronModelId::LifCurrExp,
            timestep_us: timestep_us as u32,
            flags: self.flags,
            receptors,
            neuron_types,
            type_index,
            bias,
            record_words,
        };
        block.validate()?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_block() {
        let block = ParamBlockBuilder::new(4, 1.0).build().unwrap();
        assert_eq!(block.num_neurons(), 4);
        assert_eq!(block.num_receptors(), 2);
        assert_eq!(block.timestep_us, 1000);
        assert_eq!(block.receptors[1].sign, ReceptorSign::Inhibitory);
        assert_eq!(block.neuron_types[0].refractory_ticks, 0);
    }

    #[test]
    fn test_no_leak_membrane() {
        let spec = LifSpec {
            tau_m_ms: None,
            c_m_nf: 1.0,
            v_rest_mv: 0.0,
            v_reset_mv: 0.0,
            v_thresh_mv: 10.0,
            tau_refrac_ms: 0.0,
        };
        let params = spec.to_params(1.0).unwrap();
        assert_eq!(params.membrane_decay, Q15_16::ONE);
        assert_eq!(params.input_scale, Q15_16::ONE);
        assert_eq!(params.v_thresh, Q15_16::from_int(10));
    }

    #[test]
    fn test_leaky_membrane_factors() {
        let spec = LifSpec {
            tau_m_ms: Some(20.0),
            c_m_nf: 0.5,
            tau_refrac_ms: 2.0,
            ..LifSpec::default()
        };
        let params = spec.to_params(1.0).unwrap();
        let decay = (-1.0f64 / 20.0).exp();
        assert!((params.membrane_decay.to_f64() - decay).abs() < 1e-4);
        assert!((params.input_scale.to_f64() - 40.0 * (1.0 - decay)).abs() < 1e-4);
        assert_eq!(params.refractory_ticks, 2);
    }

    #[test]
    fn test_assignments_bias_and_recording() {
        let block = ParamBlockBuilder::new(40, 0.1)
            .neuron_type(LifSpec::default())
            .neuron_type(LifSpec {
                v_thresh_mv: -55.0,
                ..LifSpec::default()
            })
            .assign_type(10..20, 1)
            .bias(3, 0.5)
            .record(0)
            .record(33)
            .record_traces(true)
            .build()
            .unwrap();

        assert_eq!(block.timestep_us, 100);
        assert_eq!(block.type_index[9], 0);
        assert_eq!(block.type_index[10], 1);
        assert_eq!(block.type_index[19], 1);
        assert_eq!(block.bias[3], Q15_16::from_f64(0.5));
        assert!(block.is_recorded(33));
        assert!(!block.is_recorded(32));
        assert!(block.flags.contains(BlockFlags::RECORD_TRACES));
        assert!(!block.flags.contains(BlockFlags::RECORD_SPIKES));
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(ParamBlockBuilder::new(0, 1.0).build().is_err());
        assert!(ParamBlockBuilder::new(4, 0.0).build().is_err());
        assert!(ParamBlockBuilder::new(4, 1.0).bias(4, 1.0).build().is_err());
        assert!(ParamBlockBuilder::new(4, 1.0).record(9).build().is_err());
        assert!(ParamBlockBuilder::new(4, 1.0).assign_type(0..4, 3).build().is_err());
        assert!(ParamBlockBuilder::new(4, 1.0)
            .neuron_type(LifSpec {
                c_m_nf: 0.0,
                ..LifSpec::default()
            })
            .build()
            .is_err());
    }
}
