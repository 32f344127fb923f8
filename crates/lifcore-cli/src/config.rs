//! TOML inputs of the CLI: network descriptions and run configuration

use std::path::Path;

use anyhow::Context;
use lifcore_params::{LifSpec, ParamBlock, ParamBlockBuilder, ReceptorSpec};
use lifcore_runtime::RunConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Population description in physical units
///
/// ```toml
/// num_neurons = 100
/// timestep_ms = 1.0
/// bias_na = 0.5
///
/// [[receptors]]
/// tau_ms = 5.0
/// sign = "excitatory"
///
/// [[neuron_types]]
/// tau_m_ms = 20.0
/// v_thresh_mv = -50.0
///
/// [record]
/// neurons = [0, 1, 2]
/// spikes = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Population size
    pub num_neurons: usize,
    /// Tick length (ms)
    #[serde(default = "default_timestep_ms")]
    pub timestep_ms: f64,
    /// Receptor types (default: excitatory and inhibitory, tau 5 ms)
    #[serde(default)]
    pub receptors: Vec<ReceptorSpec>,
    /// Neuron types (default: one standard LIF type)
    #[serde(default)]
    pub neuron_types: Vec<LifSpec>,
    /// Neuron ranges assigned to non-default types
    #[serde(default)]
    pub assignments: Vec<TypeAssignment>,
    /// Bias current applied to every neuron (nA)
    #[serde(default)]
    pub bias_na: f64,
    /// Per-neuron bias overrides
    #[serde(default)]
    pub bias: Vec<NeuronBias>,
    /// Recording selection
    #[serde(default)]
    pub record: RecordSpec,
}

fn default_timestep_ms() -> f64 {
    1.0
}

/// Neurons `start..end` use neuron type `neuron_type`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAssignment {
    /// First neuron
    pub start: usize,
    /// One past the last neuron
    pub end: usize,
    /// Neuron type index
    pub neuron_type: u32,
}

/// Bias current of a single neuron
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronBias {
    /// Neuron index
    pub neuron: usize,
    /// Bias current (nA)
    pub current_na: f64,
}

/// Which neurons and quantities to record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSpec {
    /// Record every neuron
    pub all: bool,
    /// Neurons to record
    pub neurons: Vec<usize>,
    /// Include synaptic traces
    pub traces: bool,
    /// Include spikes
    pub spikes: bool,
}

impl NetworkSpec {
    /// Read a network description from a TOML file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading network description {}", path.display()))?;
        let spec: Self = toml::from_str(&content)?;
        if spec.num_neurons == 0 {
            return Err(CliError::config("num_neurons must be at least 1"));
        }
        Ok(spec)
    }

    /// Assemble and validate the parameter block
    pub fn build(&self) -> CliResult<ParamBlock> {
        let mut builder = ParamBlockBuilder::new(self.num_neurons, self.timestep_ms)
            .bias_all(self.bias_na)
            .record_traces(self.record.traces)
            .record_spikes(self.record.spikes);

        for receptor in &self.receptors {
            builder = builder.receptor(receptor.clone());
        }
        for neuron_type in &self.neuron_types {
            builder = builder.neuron_type(neuron_type.clone());
        }
        for assignment in &self.assignments {
            builder = builder.assign_type(assignment.start..assignment.end, assignment.neuron_type);
        }
        for bias in &self.bias {
            builder = builder.bias(bias.neuron, bias.current_na);
        }
        if self.record.all {
            builder = builder.record_all();
        }
        for &neuron in &self.record.neurons {
            builder = builder.record(neuron);
        }

        Ok(builder.build()?)
    }
}

/// Run configuration from an optional TOML file, defaults otherwise
pub fn load_run_config(path: Option<&Path>) -> CliResult<RunConfig> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading run configuration {}", path.display()))?;
    let config: RunConfig = toml::from_str(&content)?;
    config
        .validate()
        .map_err(|e| CliError::config(format!("invalid run configuration: {}", e)))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifcore_params::ReceptorSign;
    use lifcore_runtime::SaturationPolicy;

    #[test]
    fn test_network_spec_defaults() {
        let spec: NetworkSpec = toml::from_str("num_neurons = 8").unwrap();
        let block = spec.build().unwrap();
        assert_eq!(block.num_neurons(), 8);
        assert_eq!(block.num_receptors(), 2);
        assert_eq!(block.timestep_us, 1000);
    }

    #[test]
    fn test_network_spec_full() {
        let text = r#"
            num_neurons = 40
            timestep_ms = 0.5
            bias_na = 0.25

            [[receptors]]
            tau_ms = 5.0
            sign = "excitatory"

            [[receptors]]
            tau_ms = 10.0
            sign = "inhibitory"
            weight_frac_bits = 8

            [[neuron_types]]

            [[neuron_types]]
            tau_m_ms = 10.0
            tau_refrac_ms = 2.0

            [[assignments]]
            start = 20
            end = 40
            neuron_type = 1

            [[bias]]
            neuron = 3
            current_na = 1.5

            [record]
            neurons = [3, 39]
            traces = true
        "#;
        let spec: NetworkSpec = toml::from_str(text).unwrap();
        let block = spec.build().unwrap();
        assert_eq!(block.timestep_us, 500);
        assert_eq!(block.receptors[1].sign, ReceptorSign::Inhibitory);
        assert_eq!(block.receptors[1].weight_frac_bits, 8);
        assert_eq!(block.params_for(25).refractory_ticks, 4);
        assert_eq!(block.bias[3].to_f64(), 1.5);
        assert_eq!(block.bias[4].to_f64(), 0.25);
        assert!(block.is_recorded(39));
        assert!(!block.is_recorded(38));
    }

    #[test]
    fn test_run_config_toml() {
        let config: RunConfig = toml::from_str(
            r#"
            tick_budget_us = 800
            saturation_policy = "clamp"
        "#,
        )
        .unwrap();
        assert_eq!(config.tick_budget_us, Some(800));
        assert_eq!(config.saturation_policy, SaturationPolicy::Clamp);
        assert_eq!(config.profiler_capacity, RunConfig::default().profiler_capacity);
    }

    #[test]
    fn test_missing_run_config_uses_defaults() {
        assert_eq!(load_run_config(None).unwrap(), RunConfig::default());
    }
}
