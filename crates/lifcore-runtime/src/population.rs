//! Population state owned by the processor, and checkpoints of it

use lifcore_params::ParamBlock;

use crate::{
    input::InputRingBuffer,
    neuron::{NeuronModel, NeuronState},
    plasticity::BcpnnState,
    synapse::SynapseTraces,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Membrane and trace state of every neuron
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PopulationState {
    /// Per-neuron membrane state
    pub neurons: Vec<NeuronState>,
    /// Per-neuron, per-receptor synaptic traces
    pub traces: SynapseTraces,
}

impl PopulationState {
    /// Every neuron at its initial state with empty traces
    pub fn new(block: &ParamBlock, model: &impl NeuronModel) -> Self {
        Self {
            neurons: (0..block.num_neurons())
                .map(|i| model.initial_state(i))
                .collect(),
            traces: SynapseTraces::new(block),
        }
    }

    /// Population size
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    /// True for an empty population
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }
}

/// Snapshot a processor can be restored to
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Checkpoint {
    /// Last completed tick when the snapshot was taken
    pub tick: u32,
    /// Population state after that tick
    pub population: PopulationState,
    /// Pending delayed input
    pub input: InputRingBuffer,
    /// Learnt state of the plastic projection, if one is attached
    #[cfg_attr(feature = "serde", serde(default))]
    pub plasticity: Option<BcpnnState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::NeuronDynamics;
    use lifcore_params::{LifSpec, ParamBlockBuilder, Q15_16};
    use std::sync::Arc;

    #[test]
    fn test_initial_state_per_type() {
        let block = ParamBlockBuilder::new(4, 1.0)
            .neuron_type(LifSpec::default())
            .neuron_type(LifSpec {
                v_rest_mv: -70.0,
                ..LifSpec::default()
            })
            .assign_type(2..4, 1)
            .build()
            .unwrap();
        let block = Arc::new(block);
        let dynamics = NeuronDynamics::from_block(block.clone());
        let state = PopulationState::new(&block, &dynamics);

        assert_eq!(state.len(), 4);
        assert_eq!(state.neurons[0].v, Q15_16::from_int(-65));
        assert_eq!(state.neurons[3].v, Q15_16::from_int(-70));
        assert!(state.neurons.iter().all(|n| n.refractory == 0));
        assert_eq!(state.traces.trace(3, 1), Q15_16::ZERO);
    }
}
