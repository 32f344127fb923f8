//! Incoming spike events and the delayed-input ring buffer

use lifcore_params::{ReceptorParams, Q15_16};

use crate::error::{Result, RuntimeError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of ring buffer slots
pub const DELAY_SLOTS: usize = 8;

/// Largest delay (in ticks) an incoming event may carry
pub const MAX_DELAY: u8 = (DELAY_SLOTS - 1) as u8;

/// Weighted spike delivered to one receptor of one neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IncomingSpikeEvent {
    /// Receptor type index
    pub receptor: u8,
    /// Target neuron index
    pub neuron: u32,
    /// Trace increment
    pub weight: Q15_16,
    /// Ticks until the weight reaches the trace (0 = this tick)
    #[cfg_attr(feature = "serde", serde(default))]
    pub delay: u8,
}

impl IncomingSpikeEvent {
    /// Event applied in the tick it is delivered
    pub const fn new(receptor: u8, neuron: u32, weight: Q15_16) -> Self {
        Self {
            receptor,
            neuron,
            weight,
            delay: 0,
        }
    }

    /// Same event, applied `delay` ticks later
    pub const fn with_delay(mut self, delay: u8) -> Self {
        self.delay = delay;
        self
    }

    /// Event with a raw integer weight scaled by the receptor's fixed-point shift
    pub fn from_raw(receptor: u8, neuron: u32, raw_weight: i32, params: &ReceptorParams) -> Self {
        Self::new(receptor, neuron, params.scale_weight(raw_weight))
    }
}

/// Per-(neuron, receptor) weight accumulators for the next [`DELAY_SLOTS`] ticks
///
/// Slot `t % DELAY_SLOTS` holds the input that reaches the traces at tick
/// `t`. The synapse stage consumes a slot and clears it, so it is free again
/// for tick `t + DELAY_SLOTS`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputRingBuffer {
    num_neurons: usize,
    num_receptors: usize,
    slots: Vec<Q15_16>,
}

impl InputRingBuffer {
    /// Empty buffer for a population
    pub fn new(num_neurons: usize, num_receptors: usize) -> Self {
        Self {
            num_neurons,
            num_receptors,
            slots: vec![Q15_16::ZERO; DELAY_SLOTS * num_neurons * num_receptors],
        }
    }

    #[inline]
    fn slot_range(&self, tick: u32) -> core::ops::Range<usize> {
        let width = self.num_neurons * self.num_receptors;
        let start = (tick as usize % DELAY_SLOTS) * width;
        start..start + width
    }

    /// Check that an event delivered at `tick` addresses this population
    pub fn validate(&self, tick: u32, event: &IncomingSpikeEvent) -> Result<()> {
        if event.neuron as usize >= self.num_neurons {
            return Err(RuntimeError::invalid_spike_event(
                tick,
                format!(
                    "neuron {} out of range (population of {})",
                    event.neuron, self.num_neurons
                ),
            ));
        }
        if event.receptor as usize >= self.num_receptors {
            return Err(RuntimeError::invalid_spike_event(
                tick,
                format!(
                    "receptor {} out of range ({} receptor types)",
                    event.receptor, self.num_receptors
                ),
            ));
        }
        if event.delay > MAX_DELAY {
            return Err(RuntimeError::invalid_spike_event(
                tick,
                format!("delay {} exceeds maximum {}", event.delay, MAX_DELAY),
            ));
        }
        Ok(())
    }

    /// Accumulate a validated event delivered at `tick`
    ///
    /// Returns true if the accumulator saturated.
    #[inline]
    pub fn deposit(&mut self, tick: u32, event: &IncomingSpikeEvent) -> bool {
        let target = tick.wrapping_add(event.delay as u32);
        let range = self.slot_range(target);
        let index =
            range.start + event.neuron as usize * self.num_receptors + event.receptor as usize;
        let current = self.slots[index];
        match current.checked_add(event.weight) {
            Some(sum) => {
                self.slots[index] = sum;
                false
            }
            None => {
                self.slots[index] = current.saturating_add(event.weight);
                true
            }
        }
    }

    /// Input reaching the traces at `tick`, laid out neuron-major
    #[inline]
    pub fn slot(&self, tick: u32) -> &[Q15_16] {
        &self.slots[self.slot_range(tick)]
    }

    /// Zero the slot for `tick`
    #[inline]
    pub fn clear_slot(&mut self, tick: u32) {
        let range = self.slot_range(tick);
        self.slots[range].iter_mut().for_each(|w| *w = Q15_16::ZERO);
    }

    /// True if no weight is pending in any slot
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(|w| *w == Q15_16::ZERO)
    }

    /// Population size
    pub fn num_neurons(&self) -> usize {
        self.num_neurons
    }

    /// Receptor types per neuron
    pub fn num_receptors(&self) -> usize {
        self.num_receptors
    }
}
