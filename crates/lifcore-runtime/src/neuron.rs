//! Neuron models for the processor
//!
//! A model is chosen once, from the parameter block header, and wrapped in
//! [`NeuronDynamics`]. The tick loop calls it through [`NeuronModel`] with
//! the neuron's summed synaptic current.

use std::sync::Arc;

use lifcore_params::{NeuronModelId, ParamBlock, Q15_16};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mutable state of one neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronState {
    /// Membrane potential (mV)
    pub v: Q15_16,
    /// Remaining refractory ticks (0 = integrating)
    pub refractory: u32,
}

impl NeuronState {
    /// Check if the neuron is holding after a spike
    #[inline(always)]
    pub fn is_refractory(&self) -> bool {
        self.refractory > 0
    }
}

/// Outcome of one neuron update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepResult {
    /// Threshold was crossed this tick
    pub spiked: bool,
    /// Some arithmetic clamped at the Q15.16 range
    pub saturated: bool,
}

/// Neuron dynamics over one tick
pub trait NeuronModel {
    /// State of neuron `index` at startup
    fn initial_state(&self, index: usize) -> NeuronState;

    /// Advance neuron `index` by one tick given its synaptic current
    fn update(&self, index: usize, state: &mut NeuronState, synaptic_current: Q15_16) -> StepResult;
}

/// Current-based leaky integrate-and-fire neuron
///
/// Integrating neurons follow
/// `V' = V_rest + (V - V_rest) * decay_m + (I_syn + I_bias) * input_scale`
/// and spike when `V' >= V_thresh`. A spike resets `V` to `V_reset` and
/// holds it there while the countdown runs, during which input is not
/// integrated. Each tick decrements the countdown first; the tick that
/// brings it to 0 integrates and tests the threshold as usual, so with `R`
/// refractory ticks the earliest next spike is `R` ticks later.
#[derive(Debug, Clone)]
pub struct LifCurr {
    block: Arc<ParamBlock>,
}

impl LifCurr {
    /// Model over the neuron types of `block`
    pub fn new(block: Arc<ParamBlock>) -> Self {
        Self { block }
    }
}

#[inline(always)]
fn track(checked: Option<Q15_16>, clamped: Q15_16, saturated: &mut bool) -> Q15_16 {
    checked.unwrap_or_else(|| {
        *saturated = true;
        clamped
    })
}

impl NeuronModel for LifCurr {
    fn initial_state(&self, index: usize) -> NeuronState {
        NeuronState {
            v: self.block.params_for(index).v_rest,
            refractory: 0,
        }
    }

    #[inline]
    fn update(&self, index: usize, state: &mut NeuronState, synaptic_current: Q15_16) -> StepResult {
        let params = self.block.params_for(index);

        if state.refractory > 0 {
            state.refractory -= 1;
            state.v = params.v_reset;
            if state.refractory > 0 {
                return StepResult::default();
            }
        }

        let mut saturated = false;
        let bias = self.block.bias[index];

        let offset = track(
            state.v.checked_sub(params.v_rest),
            state.v.saturating_sub(params.v_rest),
            &mut saturated,
        );
        let leak = offset.saturating_mul(params.membrane_decay);
        let input = track(
            synaptic_current.checked_add(bias),
            synaptic_current.saturating_add(bias),
            &mut saturated,
        );
        let drive = track(
            input.checked_mul(params.input_scale),
            input.saturating_mul(params.input_scale),
            &mut saturated,
        );
        let relative = track(leak.checked_add(drive), leak.saturating_add(drive), &mut saturated);
        state.v = track(
            params.v_rest.checked_add(relative),
            params.v_rest.saturating_add(relative),
            &mut saturated,
        );

        let spiked = state.v >= params.v_thresh;
        if spiked {
            state.v = params.v_reset;
            state.refractory = params.refractory_ticks;
        }

        StepResult { spiked, saturated }
    }
}

/// Neuron model selected by the parameter block
#[derive(Debug, Clone)]
pub enum NeuronDynamics {
    /// Current-based LIF with exponential synapses
    LifCurrExp(LifCurr),
}

impl NeuronDynamics {
    /// Model named in the block header
    pub fn from_block(block: Arc<ParamBlock>) -> Self {
        match block.model {
            NeuronModelId::LifCurrExp => Self::LifCurrExp(LifCurr::new(block)),
        }
    }

    /// Model identifier
    pub fn model_id(&self) -> NeuronModelId {
        match self {
            Self::LifCurrExp(_) => NeuronModelId::LifCurrExp,
        }
    }
}

impl NeuronModel for NeuronDynamics {
    #[inline(always)]
    fn initial_state(&self, index: usize) -> NeuronState {
        match self {
            Self::LifCurrExp(model) => model.initial_state(index),
        }
    }

    #[inline(always)]
    fn update(&self, index: usize, state: &mut NeuronState, synaptic_current: Q15_16) -> StepResult {
        match self {
            Self::LifCurrExp(model) => model.update(index, state, synaptic_current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifcore_params::{LifSpec, ParamBlockBuilder};

    fn model(spec: LifSpec, bias_na: f64) -> LifCurr {
        let block = ParamBlockBuilder::new(1, 1.0)
            .neuron_type(spec)
            .bias_all(bias_na)
            .build()
            .unwrap();
        LifCurr::new(Arc::new(block))
    }

    #[test]
    fn test_rest_is_fixed_point() {
        let lif = model(LifSpec::default(), 0.0);
        let mut state = lif.initial_state(0);
        assert_eq!(state.v, Q15_16::from_int(-65));
        for _ in 0..1000 {
            let step = lif.update(0, &mut state, Q15_16::ZERO);
            assert!(!step.spiked);
        }
        assert_eq!(state.v, Q15_16::from_int(-65));
    }

    #[test]
    fn test_spike_resets_and_starts_countdown() {
        let spec = LifSpec {
            tau_refrac_ms: 3.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 0.0);
        let mut state = lif.initial_state(0);
        let step = lif.update(0, &mut state, Q15_16::from_int(100));
        assert!(step.spiked);
        assert_eq!(state.v, Q15_16::from_int(-65));
        assert_eq!(state.refractory, 3);
        assert!(state.is_refractory());
    }

    #[test]
    fn test_refractory_holds_and_ignores_input() {
        let spec = LifSpec {
            tau_refrac_ms: 3.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 0.0);
        let mut state = lif.initial_state(0);
        let strong = Q15_16::from_int(100);

        assert!(lif.update(0, &mut state, strong).spiked);
        for expected in [2, 1] {
            let step = lif.update(0, &mut state, strong);
            assert!(!step.spiked);
            assert_eq!(state.refractory, expected);
            assert_eq!(state.v, Q15_16::from_int(-65));
        }
    }

    #[test]
    fn test_countdown_decrements_before_threshold_test() {
        let spec = LifSpec {
            tau_refrac_ms: 3.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 0.0);
        let mut state = lif.initial_state(0);
        let strong = Q15_16::from_int(100);

        let mut trace = Vec::new();
        for _ in 0..6 {
            let step = lif.update(0, &mut state, strong);
            trace.push((step.spiked, state.refractory));
        }
        // The tick that takes the countdown from 1 to 0 integrates and fires
        assert_eq!(
            trace,
            vec![(true, 3), (false, 2), (false, 1), (true, 3), (false, 2), (false, 1)]
        );
    }

    #[test]
    fn test_leaving_refractory_integrates_from_reset() {
        let spec = LifSpec {
            tau_refrac_ms: 2.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 0.0);
        let mut state = lif.initial_state(0);

        assert!(lif.update(0, &mut state, Q15_16::from_int(100)).spiked);
        assert!(!lif.update(0, &mut state, Q15_16::ZERO).spiked);
        assert!(!lif.update(0, &mut state, Q15_16::ZERO).spiked);
        assert_eq!(state.refractory, 0);
        assert_eq!(state.v, Q15_16::from_int(-65));
    }

    #[test]
    fn test_non_leaky_integration() {
        let spec = LifSpec {
            tau_m_ms: None,
            v_rest_mv: 0.0,
            v_reset_mv: 0.0,
            v_thresh_mv: 10.0,
            tau_refrac_ms: 0.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 1.0);
        let mut state = lif.initial_state(0);
        for tick in 1..=9 {
            assert!(!lif.update(0, &mut state, Q15_16::ZERO).spiked);
            assert_eq!(state.v, Q15_16::from_int(tick));
        }
        assert!(lif.update(0, &mut state, Q15_16::ZERO).spiked);
        assert_eq!(state.v, Q15_16::ZERO);
    }

    #[test]
    fn test_saturation_reported() {
        let spec = LifSpec {
            tau_m_ms: None,
            v_rest_mv: 100.0,
            v_reset_mv: 100.0,
            v_thresh_mv: 32000.0,
            tau_refrac_ms: 0.0,
            ..LifSpec::default()
        };
        let lif = model(spec, 0.0);
        let mut state = lif.initial_state(0);
        let step = lif.update(0, &mut state, Q15_16::MAX);
        assert!(step.saturated);
        assert!(step.spiked);
    }

    #[test]
    fn test_dynamics_dispatch() {
        let block = Arc::new(ParamBlockBuilder::new(2, 1.0).build().unwrap());
        let dynamics = NeuronDynamics::from_block(block);
        assert_eq!(dynamics.model_id(), NeuronModelId::LifCurrExp);
        let mut state = dynamics.initial_state(1);
        assert!(!dynamics.update(1, &mut state, Q15_16::ZERO).spiked);
    }
}
