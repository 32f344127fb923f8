//! Recording region for neurons flagged in the parameter block
//!
//! Every tick, each flagged neuron contributes one membrane sample (plus its
//! receptor traces when the block asks for them). Spikes of flagged neurons
//! are kept when the block's spike flag is set. The region has a fixed
//! capacity: once full, later samples are dropped and counted.

use lifcore_params::{BlockFlags, ParamBlock, Q15_16};

use crate::{bitfield::BitField, population::PopulationState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Membrane potential (and traces) of one neuron after one tick
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MembraneSample {
    /// Tick number
    pub tick: u32,
    /// Neuron index
    pub neuron: u32,
    /// Membrane potential (mV)
    pub v: f64,
    /// Receptor traces, empty unless trace recording is enabled
    pub traces: Vec<f64>,
}

/// Spike of a recorded neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpikeRecord {
    /// Tick the neuron crossed threshold
    pub tick: u32,
    /// Neuron index
    pub neuron: u32,
}

/// Contents of the recording region
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Recording {
    /// Membrane samples in tick, then neuron order
    pub samples: Vec<MembraneSample>,
    /// Spikes in tick, then neuron order
    pub spikes: Vec<SpikeRecord>,
    /// Entries lost to the capacity limit
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy)]
struct RawSample {
    tick: u32,
    neuron: u32,
    v: Q15_16,
}

fn note_overflow(dropped: &mut u64, warned: &mut bool, capacity: usize) {
    *dropped += 1;
    if !*warned {
        log::warn!(
            "Recording region full ({} entries), dropping further samples",
            capacity
        );
        *warned = true;
    }
}

/// Bounded store of recorded state
#[derive(Debug)]
pub struct Recorder {
    flagged: BitField,
    record_traces: bool,
    record_spikes: bool,
    num_receptors: usize,
    capacity: usize,
    samples: Vec<RawSample>,
    traces: Vec<Q15_16>,
    spikes: Vec<SpikeRecord>,
    dropped: u64,
    warned: bool,
}

impl Recorder {
    /// Recorder for the neurons flagged in `block`, holding up to `capacity`
    /// samples and `capacity` spikes
    pub fn new(block: &ParamBlock, capacity: usize) -> Self {
        let flagged = BitField::from_words(block.num_neurons(), block.record_words.clone());
        let record_traces = block.flags.contains(BlockFlags::RECORD_TRACES);
        let record_spikes = block.flags.contains(BlockFlags::RECORD_SPIKES);
        let num_receptors = block.num_receptors();

        // Only reserve what the flagged neurons can use
        let reserve = if flagged.any() { capacity } else { 0 };
        Self {
            record_traces,
            record_spikes,
            num_receptors,
            capacity,
            samples: Vec::with_capacity(reserve),
            traces: Vec::with_capacity(if record_traces { reserve * num_receptors } else { 0 }),
            spikes: Vec::with_capacity(if record_spikes { reserve } else { 0 }),
            flagged,
            dropped: 0,
            warned: false,
        }
    }

    /// Number of neurons flagged for recording
    pub fn flagged_count(&self) -> usize {
        self.flagged.count_ones()
    }

    /// Store the state of flagged neurons after `tick`
    pub fn record_tick(&mut self, tick: u32, population: &PopulationState, spiked: &BitField) {
        for neuron in self.flagged.iter_ones() {
            if self.samples.len() < self.capacity {
                self.samples.push(RawSample {
                    tick,
                    neuron: neuron as u32,
                    v: population.neurons[neuron].v,
                });
                if self.record_traces {
                    self.traces
                        .extend_from_slice(population.traces.neuron_traces(neuron));
                }
            } else {
                note_overflow(&mut self.dropped, &mut self.warned, self.capacity);
            }

            if self.record_spikes && spiked.test(neuron) {
                if self.spikes.len() < self.capacity {
                    self.spikes.push(SpikeRecord {
                        tick,
                        neuron: neuron as u32,
                    });
                } else {
                    note_overflow(&mut self.dropped, &mut self.warned, self.capacity);
                }
            }
        }
    }

    /// Discard everything recorded after `tick`
    pub fn truncate_after(&mut self, tick: u32) {
        let keep = self.samples.partition_point(|s| s.tick <= tick);
        self.samples.truncate(keep);
        if self.record_traces {
            self.traces.truncate(keep * self.num_receptors);
        }
        let keep = self.spikes.partition_point(|s| s.tick <= tick);
        self.spikes.truncate(keep);
    }

    /// Samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.spikes.is_empty()
    }

    /// Entries lost to the capacity limit
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Copy out the recorded data in physical units
    pub fn snapshot(&self) -> Recording {
        let samples = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| MembraneSample {
                tick: s.tick,
                neuron: s.neuron,
                v: s.v.to_f64(),
                traces: if self.record_traces {
                    self.traces[i * self.num_receptors..(i + 1) * self.num_receptors]
                        .iter()
                        .map(|t| t.to_f64())
                        .collect()
                } else {
                    Vec::new()
                },
            })
            .collect();
        Recording {
            samples,
            spikes: self.spikes.clone(),
            dropped: self.dropped,
        }
    }

    /// Copy out the recorded data and empty the region
    pub fn drain(&mut self) -> Recording {
        let recording = self.snapshot();
        self.samples.clear();
        self.traces.clear();
        self.spikes.clear();
        self.dropped = 0;
        self.warned = false;
        recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::NeuronDynamics;
    use lifcore_params::ParamBlockBuilder;
    use std::sync::Arc;

    fn setup(builder: ParamBlockBuilder, capacity: usize) -> (Recorder, PopulationState, usize) {
        let block = Arc::new(builder.build().unwrap());
        let dynamics = NeuronDynamics::from_block(block.clone());
        let population = PopulationState::new(&block, &dynamics);
        (
            Recorder::new(&block, capacity),
            population,
            block.num_neurons(),
        )
    }

    #[test]
    fn test_only_flagged_neurons_recorded() {
        let builder = ParamBlockBuilder::new(40, 1.0).record(3).record(35);
        let (mut recorder, population, n) = setup(builder, 100);
        let spiked = BitField::new(n);
        recorder.record_tick(1, &population, &spiked);
        recorder.record_tick(2, &population, &spiked);

        let recording = recorder.snapshot();
        let neurons: Vec<u32> = recording.samples.iter().map(|s| s.neuron).collect();
        assert_eq!(neurons, vec![3, 35, 3, 35]);
        assert_eq!(recording.samples[0].v, -65.0);
        assert!(recording.samples[0].traces.is_empty());
        assert!(recording.spikes.is_empty());
    }

    #[test]
    fn test_traces_and_spikes() {
        let builder = ParamBlockBuilder::new(4, 1.0)
            .record(2)
            .record_traces(true)
            .record_spikes(true);
        let (mut recorder, population, n) = setup(builder, 100);
        let mut spiked = BitField::new(n);
        spiked.set(1);
        spiked.set(2);
        recorder.record_tick(7, &population, &spiked);

        let recording = recorder.drain();
        assert_eq!(recording.samples[0].traces, vec![0.0, 0.0]);
        assert_eq!(recording.spikes, vec![SpikeRecord { tick: 7, neuron: 2 }]);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_capacity_drops_newest() {
        let builder = ParamBlockBuilder::new(2, 1.0).record_all();
        let (mut recorder, population, n) = setup(builder, 3);
        let spiked = BitField::new(n);
        for tick in 1..=3 {
            recorder.record_tick(tick, &population, &spiked);
        }
        assert_eq!(recorder.len(), 3);
        assert_eq!(recorder.dropped(), 3);
        let recording = recorder.snapshot();
        assert_eq!(recording.samples[2].tick, 2);
    }

    #[test]
    fn test_spike_overflow_counted_while_samples_fit() {
        let builder = ParamBlockBuilder::new(3, 1.0)
            .record_all()
            .record_spikes(true);
        let (mut recorder, population, n) = setup(builder, 4);
        let mut spiked = BitField::new(n);
        spiked.set(0);
        spiked.set(2);

        recorder.record_tick(1, &population, &spiked);
        assert_eq!(recorder.dropped(), 0);
        recorder.record_tick(2, &population, &spiked);
        // 6 samples and 4 spikes offered against a capacity of 4 each
        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.dropped(), 2);

        let recording = recorder.drain();
        assert_eq!(recording.spikes.len(), 4);
        assert_eq!(recording.dropped, 2);
        assert_eq!(recorder.dropped(), 0);
    }

    #[test]
    fn test_truncate_after() {
        let builder = ParamBlockBuilder::new(1, 1.0).record(0).record_traces(true);
        let (mut recorder, population, n) = setup(builder, 100);
        let spiked = BitField::new(n);
        for tick in 1..=5 {
            recorder.record_tick(tick, &population, &spiked);
        }
        recorder.truncate_after(2);
        let recording = recorder.snapshot();
        assert_eq!(recording.samples.len(), 2);
        assert_eq!(recording.samples[1].tick, 2);
        assert_eq!(recording.samples[1].traces.len(), 2);
    }
}
