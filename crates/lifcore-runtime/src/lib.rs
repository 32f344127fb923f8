//! Tick-driven neuron processor for one core of a spiking-network fabric
//!
//! A [`NeuronProcessor`] owns a population of current-based leaky
//! integrate-and-fire neurons with one exponentially decaying synaptic trace
//! per receptor type. All state is Q15.16 fixed point, so the same parameter
//! block and input stream always produce bit-identical spike trains.
//! A BCPNN projection can be attached to let the population learn from
//! presynaptic and its own spikes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use lifcore_params::ParamBlockBuilder;
//! use lifcore_runtime::{NeuronProcessor, RunConfig, SpikeSchedule};
//!
//! let block = ParamBlockBuilder::new(100, 1.0).bias_all(1.0).build()?;
//! let mut processor = NeuronProcessor::new(Arc::new(block), RunConfig::default())?;
//! let summary = processor.run(1000, &SpikeSchedule::new())?;
//! println!("{} spikes", summary.spikes.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitfield;
pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod neuron;
pub mod plasticity;
pub mod population;
pub mod processor;
pub mod profiler;
pub mod recording;
pub mod synapse;

pub use bitfield::BitField;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{RunConfig, SaturationPolicy};
pub use error::{Result, RuntimeError};
pub use input::{IncomingSpikeEvent, InputRingBuffer, DELAY_SLOTS, MAX_DELAY};
pub use neuron::{LifCurr, NeuronDynamics, NeuronModel, NeuronState, StepResult};
pub use plasticity::{BcpnnProjection, BcpnnState, DecayingTrace, UnitTraces};
pub use population::{Checkpoint, PopulationState};
pub use processor::{
    NeuronProcessor, PresynapticSchedule, ProcessorStats, RunSummary, SpikeSchedule, TickOutput,
};
pub use profiler::{Profiler, ProfilerEvent, ProfilerEventKind, ProfilerTag, TagSummary};
pub use recording::{MembraneSample, Recorder, Recording, SpikeRecord};
pub use synapse::SynapseTraces;

// Re-export the parameter types callers need alongside the processor
pub use lifcore_params::{BcpnnRegion, ParamBlock, Q15_16};
