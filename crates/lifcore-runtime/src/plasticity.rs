//! BCPNN learning projection onto the population
//!
//! Traces are event driven: each one stores its value and the tick it was
//! last brought up to date, and decays by table lookup when touched. Every
//! spike adds one to the fast `z` and slow `e` traces of its side. The
//! probabilities follow from the trace differences:
//!
//! ```text
//! Pi  = a_i  * (zi - ei)
//! Pj  = a_j  * (zj - ej)
//! Pij = a_ij * (zi * zj - eij)
//! ```
//!
//! where `eij` jumps by the change of `zi * zj` at every pre or post spike
//! and otherwise decays with the probability time constant.

use std::sync::Arc;

use lifcore_params::{BcpnnMode, BcpnnRegion, ExpDecayLut, Q15_16};

use crate::{
    error::{Result, RuntimeError},
    input::{IncomingSpikeEvent, InputRingBuffer},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trace value as of a tick
///
/// Slow tables are sampled every few ticks, so a trace only advances by
/// whole table steps and keeps the remainder for its next update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecayingTrace {
    /// Value at `since`
    pub value: Q15_16,
    /// Tick the value refers to
    pub since: u32,
}

impl DecayingTrace {
    /// Value decayed to `tick`
    #[inline]
    pub fn at(&self, tick: u32, lut: &ExpDecayLut) -> Q15_16 {
        let span = lut.span(tick.saturating_sub(self.since));
        self.value.saturating_mul(lut.get(span))
    }

    #[inline]
    fn advance(&mut self, tick: u32, lut: &ExpDecayLut) {
        if self.value == Q15_16::ZERO {
            self.since = tick;
            return;
        }
        let span = lut.span(tick.saturating_sub(self.since));
        if span > 0 {
            self.value = self.value.saturating_mul(lut.get(span));
            self.since += span;
        }
    }
}

/// Fast and slow trace of one presynaptic source or postsynaptic neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitTraces {
    /// Primary trace
    pub z: DecayingTrace,
    /// Probability trace component
    pub e: DecayingTrace,
}

impl UnitTraces {
    fn spike(&mut self, tick: u32, z_lut: &ExpDecayLut, p_lut: &ExpDecayLut) {
        self.z.advance(tick, z_lut);
        self.e.advance(tick, p_lut);
        self.z.value = self.z.value.saturating_add(Q15_16::ONE);
        self.e.value = self.e.value.saturating_add(Q15_16::ONE);
    }
}

/// Learnt state of a projection, as stored in a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BcpnnState {
    /// Per-source traces
    pub pre: Vec<UnitTraces>,
    /// Per-neuron traces
    pub post: Vec<UnitTraces>,
    /// Joint trace component of every synapse, pre-major
    pub synapses: Vec<DecayingTrace>,
}

impl BcpnnState {
    fn new(num_pre: usize, num_post: usize) -> Self {
        Self {
            pre: vec![UnitTraces::default(); num_pre],
            post: vec![UnitTraces::default(); num_post],
            synapses: vec![DecayingTrace::default(); num_pre * num_post],
        }
    }
}

/// Plastic projection from presynaptic sources onto every neuron
#[derive(Debug, Clone)]
pub struct BcpnnProjection {
    region: Arc<BcpnnRegion>,
    state: BcpnnState,
    intrinsic_bias: Vec<Q15_16>,
}

impl BcpnnProjection {
    /// Projection with empty traces, its bias evaluated at `tick`
    pub fn new(region: Arc<BcpnnRegion>, tick: u32) -> Self {
        let state = BcpnnState::new(region.num_pre, region.num_post);
        let mut projection = Self {
            intrinsic_bias: vec![Q15_16::ZERO; region.num_post],
            region,
            state,
        };
        projection.refresh_bias(tick);
        projection
    }

    /// Region the projection was built from
    pub fn region(&self) -> &Arc<BcpnnRegion> {
        &self.region
    }

    /// Number of presynaptic sources
    pub fn num_pre(&self) -> usize {
        self.region.num_pre
    }

    /// Number of postsynaptic neurons
    pub fn num_post(&self) -> usize {
        self.region.num_post
    }

    /// Learnt state
    pub fn state(&self) -> &BcpnnState {
        &self.state
    }

    /// Replace the learnt state, then re-evaluate the bias at `tick`
    pub fn restore(&mut self, state: &BcpnnState, tick: u32) -> Result<()> {
        if state.pre.len() != self.num_pre()
            || state.post.len() != self.num_post()
            || state.synapses.len() != self.num_pre() * self.num_post()
        {
            return Err(RuntimeError::CheckpointMismatch {
                reason: format!(
                    "checkpoint projection is {}x{}, processor has {}x{}",
                    state.pre.len(),
                    state.post.len(),
                    self.num_pre(),
                    self.num_post()
                ),
            });
        }
        self.state = state.clone();
        self.refresh_bias(tick);
        Ok(())
    }

    /// Check a tick's presynaptic spikes before anything is applied
    pub fn validate(&self, tick: u32, pre_spikes: &[u32]) -> Result<()> {
        if let Some(&source) = pre_spikes.iter().find(|&&s| s as usize >= self.num_pre()) {
            return Err(RuntimeError::invalid_spike_event(
                tick,
                format!(
                    "presynaptic source {} out of range ({} sources)",
                    source,
                    self.num_pre()
                ),
            ));
        }
        Ok(())
    }

    fn enabled(&self, bit: u32) -> bool {
        self.region.mode.contains(bit)
    }

    /// Apply presynaptic spikes and deposit their weights into `input`
    ///
    /// Returns the number of saturated deposits.
    pub fn process_pre(
        &mut self,
        tick: u32,
        pre_spikes: &[u32],
        input: &mut InputRingBuffer,
    ) -> u32 {
        let num_post = self.num_post();
        let plastic = self.enabled(BcpnnMode::PLASTICITY);
        let mut saturations = 0;

        for &source in pre_spikes {
            let i = source as usize;
            if plastic {
                let region = &self.region;
                let row = &mut self.state.synapses[i * num_post..(i + 1) * num_post];
                for (eij, post) in row.iter_mut().zip(&self.state.post) {
                    let zj = post.z.at(tick, &region.zj_lut);
                    eij.advance(tick, &region.p_lut);
                    eij.value = eij.value.saturating_add(zj);
                }
                self.state.pre[i].spike(tick, &region.zi_lut, &region.p_lut);
            }

            if self.enabled(BcpnnMode::WEIGHTS) {
                for j in 0..num_post {
                    let weight = if plastic {
                        self.weight(i, j, tick)
                    } else {
                        self.region.weight(i, j)
                    };
                    let event = IncomingSpikeEvent::new(self.region.receptor, j as u32, weight)
                        .with_delay(self.region.delay);
                    saturations += input.deposit(tick, &event) as u32;
                }
            }
        }
        saturations
    }

    /// Apply the population's own spikes, back-propagated to the synapses
    pub fn process_post(&mut self, tick: u32, spikes: &[u32]) {
        if !self.enabled(BcpnnMode::PLASTICITY) {
            return;
        }
        let num_post = self.num_post();
        let region = &self.region;
        for &neuron in spikes {
            let j = neuron as usize;
            for (i, pre) in self.state.pre.iter().enumerate() {
                let zi = pre.z.at(tick, &region.zi_lut);
                let eij = &mut self.state.synapses[i * num_post + j];
                eij.advance(tick, &region.p_lut);
                eij.value = eij.value.saturating_add(zi);
            }
            self.state.post[j].spike(tick, &region.zj_lut, &region.p_lut);
        }
    }

    /// Re-evaluate every neuron's intrinsic bias at `tick`
    pub fn refresh_bias(&mut self, tick: u32) {
        if !self.enabled(BcpnnMode::BIAS) {
            self.intrinsic_bias.fill(Q15_16::ZERO);
            return;
        }
        for j in 0..self.num_post() {
            let pj = self.post_probability(j, tick);
            let ln_pj = self.ln(pj.saturating_add(self.region.epsilon));
            self.intrinsic_bias[j] = self.region.phi.saturating_mul(ln_pj);
        }
    }

    /// Bias current of every neuron, as of the last refresh
    pub fn intrinsic_bias(&self) -> &[Q15_16] {
        &self.intrinsic_bias
    }

    fn ln(&self, x: Q15_16) -> Q15_16 {
        self.region
            .ln_lut
            .ln(x.max(Q15_16::EPSILON))
            .unwrap_or(Q15_16::MIN)
    }

    /// Pi of source `pre` at `tick`
    pub fn pre_probability(&self, pre: usize, tick: u32) -> Q15_16 {
        let traces = &self.state.pre[pre];
        let zi = traces.z.at(tick, &self.region.zi_lut);
        let ei = traces.e.at(tick, &self.region.p_lut);
        self.region.a_i.saturating_mul(zi.saturating_sub(ei))
    }

    /// Pj of neuron `post` at `tick`
    pub fn post_probability(&self, post: usize, tick: u32) -> Q15_16 {
        let traces = &self.state.post[post];
        let zj = traces.z.at(tick, &self.region.zj_lut);
        let ej = traces.e.at(tick, &self.region.p_lut);
        self.region.a_j.saturating_mul(zj.saturating_sub(ej))
    }

    /// Pij of the synapse from `pre` onto `post` at `tick`
    pub fn joint_probability(&self, pre: usize, post: usize, tick: u32) -> Q15_16 {
        let zi = self.state.pre[pre].z.at(tick, &self.region.zi_lut);
        let zj = self.state.post[post].z.at(tick, &self.region.zj_lut);
        let eij = self.state.synapses[pre * self.num_post() + post].at(tick, &self.region.p_lut);
        self.region
            .a_ij
            .saturating_mul(zi.saturating_mul(zj).saturating_sub(eij))
    }

    /// Learnt weight of the synapse from `pre` onto `post` at `tick`
    pub fn weight(&self, pre: usize, post: usize, tick: u32) -> Q15_16 {
        let region = &self.region;
        let pi = self.pre_probability(pre, tick).saturating_add(region.epsilon);
        let pj = self.post_probability(post, tick).saturating_add(region.epsilon);
        let pij = self
            .joint_probability(pre, post, tick)
            .saturating_add(region.epsilon_squared);
        let log_odds = self
            .ln(pij)
            .saturating_sub(self.ln(pi))
            .saturating_sub(self.ln(pj));
        region.w_max.saturating_mul(log_odds)
    }

    /// Every weight at `tick`, pre-major
    ///
    /// Fixed weights when plasticity is off.
    pub fn weights(&self, tick: u32) -> Vec<Q15_16> {
        if !self.enabled(BcpnnMode::PLASTICITY) {
            return self.region.weights.clone();
        }
        let num_post = self.num_post();
        (0..self.num_pre() * num_post)
            .map(|k| self.weight(k / num_post, k % num_post, tick))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifcore_params::BcpnnSpec;

    fn projection(spec: BcpnnSpec, num_pre: usize, num_post: usize) -> BcpnnProjection {
        let region = BcpnnRegion::from_spec(&spec, num_pre, num_post, 1.0).unwrap();
        BcpnnProjection::new(Arc::new(region), 0)
    }

    #[test]
    fn test_silent_projection_has_zero_weight() {
        let p = projection(BcpnnSpec::default(), 2, 2);
        // ln(eps^2) - 2 ln(eps) within table resolution
        assert!(p.weight(0, 1, 10).to_f64().abs() < 0.05);
        assert_eq!(p.pre_probability(0, 10), Q15_16::ZERO);
    }

    #[test]
    fn test_silent_bias_is_phi_ln_epsilon() {
        let p = projection(BcpnnSpec::default(), 1, 3);
        let expected = 0.05 * 0.05f64.ln();
        for &bias in p.intrinsic_bias() {
            assert!((bias.to_f64() - expected).abs() < 1e-3, "{}", bias);
        }

        let off = projection(
            BcpnnSpec {
                bias_enabled: false,
                ..BcpnnSpec::default()
            },
            1,
            3,
        );
        assert!(off.intrinsic_bias().iter().all(|b| *b == Q15_16::ZERO));
    }

    #[test]
    fn test_single_pre_spike_probability() {
        let mut p = projection(BcpnnSpec::default(), 1, 1);
        let mut input = InputRingBuffer::new(1, 1);
        p.process_pre(1, &[0], &mut input);

        // Pi(t) = a_i * (exp(-t/5) - exp(-t/1000)), t ticks after the spike
        for t in [0u32, 5, 20] {
            let expected =
                (1000.0 / (20.0 * (5.0 - 1000.0))) * ((-(t as f64) / 5.0).exp() - (-(t as f64) / 1000.0).exp());
            let got = p.pre_probability(0, 1 + t).to_f64();
            assert!((got - expected).abs() < 2e-3, "t={} got {} expected {}", t, got, expected);
        }
        assert_eq!(p.post_probability(0, 10), Q15_16::ZERO);
    }

    #[test]
    fn test_correlated_spikes_strengthen_weight() {
        let mut p = projection(BcpnnSpec::default(), 2, 1);
        let mut input = InputRingBuffer::new(1, 1);
        // source 0 fires with the neuron, source 1 fires alone
        for tick in (1..400).step_by(10) {
            p.process_pre(tick, &[0], &mut input);
            p.process_post(tick, &[0]);
            p.process_pre(tick + 5, &[1], &mut input);
            input.clear_slot(tick);
            input.clear_slot(tick + 5);
        }
        let correlated = p.weight(0, 0, 400);
        let independent = p.weight(1, 0, 400);
        assert!(correlated > Q15_16::ZERO, "{}", correlated);
        assert!(correlated > independent, "{} <= {}", correlated, independent);
        assert!(p.joint_probability(0, 0, 400) > p.joint_probability(1, 0, 400));
    }

    #[test]
    fn test_weights_deposited_on_pre_spike() {
        let spec = BcpnnSpec {
            plasticity_enabled: false,
            weight: 1.5,
            delay: 2,
            ..BcpnnSpec::default()
        };
        let mut p = projection(spec, 1, 3);
        let mut input = InputRingBuffer::new(3, 1);
        assert_eq!(p.process_pre(4, &[0], &mut input), 0);
        assert!(input.slot(4).iter().all(|w| *w == Q15_16::ZERO));
        assert!(input.slot(6).iter().all(|w| *w == Q15_16::from_f64(1.5)));
        // fixed weights leave the traces untouched
        assert_eq!(p.state().pre[0], UnitTraces::default());
        assert_eq!(p.weights(10), vec![Q15_16::from_f64(1.5); 3]);
    }

    #[test]
    fn test_weights_disabled_deposits_nothing() {
        let spec = BcpnnSpec {
            weights_enabled: false,
            ..BcpnnSpec::default()
        };
        let mut p = projection(spec, 1, 2);
        let mut input = InputRingBuffer::new(2, 1);
        p.process_pre(1, &[0], &mut input);
        assert!(input.is_idle());
        assert!(p.state().pre[0].z.value > Q15_16::ZERO);
    }

    #[test]
    fn test_slow_trace_keeps_remainder() {
        let mut p = projection(BcpnnSpec::default(), 1, 1);
        let mut input = InputRingBuffer::new(1, 1);
        p.process_pre(1, &[0], &mut input);
        p.process_pre(5, &[0], &mut input);
        // four ticks is less than one p-table step
        assert_eq!(p.state().pre[0].e.since, 1);
        p.process_pre(12, &[0], &mut input);
        assert_eq!(p.state().pre[0].e.since, 9);
    }

    #[test]
    fn test_out_of_range_source_rejected() {
        let p = projection(BcpnnSpec::default(), 2, 1);
        assert!(p.validate(3, &[0, 1]).is_ok());
        assert!(matches!(
            p.validate(3, &[2]),
            Err(RuntimeError::InvalidSpikeEvent { tick: 3, .. })
        ));
    }
}
