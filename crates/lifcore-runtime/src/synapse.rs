//! Per-receptor exponentially decaying synaptic current traces
//!
//! Every neuron carries one trace per receptor type. Each tick a trace is
//! first multiplied by its receptor's decay factor and then incremented by
//! the weight that arrived for it, so a spike delivered in tick `t` shows its
//! full weight at `t` and starts decaying at `t + 1`.

use lifcore_params::{ParamBlock, ReceptorSign, Q15_16};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trace values of a whole population, laid out neuron-major
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseTraces {
    num_receptors: usize,
    decays: Vec<Q15_16>,
    signs: Vec<ReceptorSign>,
    values: Vec<Q15_16>,
}

impl SynapseTraces {
    /// All-zero traces for the population described by `block`
    pub fn new(block: &ParamBlock) -> Self {
        let num_receptors = block.num_receptors();
        Self {
            num_receptors,
            decays: block.receptors.iter().map(|r| r.decay).collect(),
            signs: block.receptors.iter().map(|r| r.sign).collect(),
            values: vec![Q15_16::ZERO; block.num_neurons() * num_receptors],
        }
    }

    /// Receptor types per neuron
    pub fn num_receptors(&self) -> usize {
        self.num_receptors
    }

    /// Decay every trace, then add this tick's input
    ///
    /// `input` uses the same neuron-major layout as the traces. Returns the
    /// number of additions that saturated.
    pub fn update(&mut self, input: &[Q15_16]) -> u32 {
        debug_assert_eq!(input.len(), self.values.len());
        let mut saturated = 0u32;

        for (neuron_traces, neuron_input) in self
            .values
            .chunks_exact_mut(self.num_receptors)
            .zip(input.chunks_exact(self.num_receptors))
        {
            for ((trace, &weight), &decay) in neuron_traces
                .iter_mut()
                .zip(neuron_input)
                .zip(&self.decays)
            {
                // |trace * decay| <= |trace| for decay in [0, 1]
                let decayed = trace.saturating_mul(decay);
                *trace = match decayed.checked_add(weight) {
                    Some(sum) => sum,
                    None => {
                        saturated += 1;
                        decayed.saturating_add(weight)
                    }
                };
            }
        }
        saturated
    }

    /// Trace of receptor `receptor` on neuron `neuron`
    #[inline]
    pub fn trace(&self, neuron: usize, receptor: usize) -> Q15_16 {
        self.values[neuron * self.num_receptors + receptor]
    }

    /// All traces of one neuron, indexed by receptor
    #[inline]
    pub fn neuron_traces(&self, neuron: usize) -> &[Q15_16] {
        let start = neuron * self.num_receptors;
        &self.values[start..start + self.num_receptors]
    }

    /// Signed sum of a neuron's traces and whether the sum saturated
    #[inline]
    pub fn synaptic_current(&self, neuron: usize) -> (Q15_16, bool) {
        let mut current = Q15_16::ZERO;
        let mut saturated = false;
        for (&trace, sign) in self.neuron_traces(neuron).iter().zip(&self.signs) {
            let next = match sign {
                ReceptorSign::Excitatory => current.checked_add(trace),
                ReceptorSign::Inhibitory => current.checked_sub(trace),
            };
            current = match next {
                Some(value) => value,
                None => {
                    saturated = true;
                    match sign {
                        ReceptorSign::Excitatory => current.saturating_add(trace),
                        ReceptorSign::Inhibitory => current.saturating_sub(trace),
                    }
                }
            };
        }
        (current, saturated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifcore_params::{ParamBlockBuilder, ReceptorSpec};

    fn traces(tau_exc: f64, tau_inh: f64, n: usize) -> SynapseTraces {
        let block = ParamBlockBuilder::new(n, 1.0)
            .receptor(ReceptorSpec::excitatory(tau_exc))
            .receptor(ReceptorSpec::inhibitory(tau_inh))
            .build()
            .unwrap();
        SynapseTraces::new(&block)
    }

    fn input_for(n: usize, neuron: usize, receptor: usize, weight: Q15_16) -> Vec<Q15_16> {
        let mut input = vec![Q15_16::ZERO; n * 2];
        input[neuron * 2 + receptor] = weight;
        input
    }

    #[test]
    fn test_weight_appears_then_decays() {
        let mut traces = traces(5.0, 10.0, 3);
        let w = Q15_16::from_int(2);
        traces.update(&input_for(3, 1, 0, w));
        assert_eq!(traces.trace(1, 0), w);
        assert_eq!(traces.trace(1, 1), Q15_16::ZERO);
        assert_eq!(traces.trace(0, 0), Q15_16::ZERO);

        let decay = traces.decays[0];
        traces.update(&vec![Q15_16::ZERO; 6]);
        assert_eq!(traces.trace(1, 0), w.saturating_mul(decay));
    }

    #[test]
    fn test_synaptic_current_applies_signs() {
        let mut traces = traces(5.0, 5.0, 1);
        let mut input = vec![Q15_16::from_int(3), Q15_16::from_int(1)];
        traces.update(&input);
        let (current, saturated) = traces.synaptic_current(0);
        assert_eq!(current, Q15_16::from_int(2));
        assert!(!saturated);

        input.iter_mut().for_each(|w| *w = Q15_16::ZERO);
        traces.update(&input);
        let (current, _) = traces.synaptic_current(0);
        assert!(current > Q15_16::ZERO && current < Q15_16::from_int(2));
    }

    #[test]
    fn test_trace_saturation_is_counted() {
        let mut traces = traces(5.0, 5.0, 1);
        let big = vec![Q15_16::from_int(30000), Q15_16::ZERO];
        assert_eq!(traces.update(&big), 0);
        assert_eq!(traces.update(&big), 1);
        assert_eq!(traces.trace(0, 0), Q15_16::MAX);
    }

    #[test]
    fn test_current_saturation_is_flagged() {
        let mut traces = traces(5.0, 5.0, 1);
        traces.update(&[Q15_16::from_int(-30000), Q15_16::from_int(30000)]);
        let (current, saturated) = traces.synaptic_current(0);
        assert!(saturated);
        assert_eq!(current, Q15_16::MIN);
    }
}
