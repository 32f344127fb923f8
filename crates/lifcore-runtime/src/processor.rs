//! The neuron processor: one population driven one tick at a time
//!
//! Each tick runs the same fixed pipeline:
//!
//! 1. validate the tick's incoming events (a bad event rejects the tick
//!    before any state changes)
//! 2. clear the spike bit-field and deposit events into the input ring
//! 3. decay every synaptic trace and add the input due this tick
//! 4. integrate every neuron and set the bit of each one that spikes
//! 5. collect the set bits into the outgoing spike list
//! 6. record flagged neurons
//!
//! With a [`BcpnnProjection`] attached, presynaptic spikes are applied in
//! stage 2 (their weights join the input ring), the learnt intrinsic bias
//! adds to every neuron's input in stage 4, and the tick's outgoing spikes
//! are back-propagated to the projection in a final plasticity stage.
//!
//! Every stage is bracketed by profiler enter/exit events. A tick that
//! overruns its budget, or saturates under [`SaturationPolicy::Abort`], still
//! completes but leaves the processor faulted: further ticks are refused
//! until a checkpoint is restored.

use std::{collections::BTreeMap, sync::Arc};

use lifcore_params::{BcpnnRegion, ParamBlock};

use crate::{
    bitfield::BitField,
    clock::{Clock, MonotonicClock},
    config::{RunConfig, SaturationPolicy},
    error::{Result, RuntimeError},
    input::{IncomingSpikeEvent, InputRingBuffer, MAX_DELAY},
    neuron::{NeuronDynamics, NeuronModel, NeuronState},
    plasticity::BcpnnProjection,
    population::{Checkpoint, PopulationState},
    profiler::{Profiler, ProfilerEvent, ProfilerTag, TagSummary},
    recording::{Recorder, Recording},
    synapse::SynapseTraces,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Incoming events keyed by the tick they are delivered in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SpikeSchedule {
    events: BTreeMap<u32, Vec<IncomingSpikeEvent>>,
}

impl SpikeSchedule {
    /// Empty schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` at `tick`
    pub fn add(&mut self, tick: u32, event: IncomingSpikeEvent) {
        self.events.entry(tick).or_default().push(event);
    }

    /// Events delivered at `tick`
    pub fn events_for(&self, tick: u32) -> &[IncomingSpikeEvent] {
        self.events.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of events
    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// True if no event is scheduled
    pub fn is_empty(&self) -> bool {
        self.events.values().all(Vec::is_empty)
    }

    /// Latest tick with an event
    pub fn last_tick(&self) -> Option<u32> {
        self.events.keys().next_back().copied()
    }
}

impl FromIterator<(u32, IncomingSpikeEvent)> for SpikeSchedule {
    fn from_iter<I: IntoIterator<Item = (u32, IncomingSpikeEvent)>>(iter: I) -> Self {
        let mut schedule = Self::new();
        for (tick, event) in iter {
            schedule.add(tick, event);
        }
        schedule
    }
}

/// Presynaptic source spikes keyed by the tick they arrive in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PresynapticSchedule {
    spikes: BTreeMap<u32, Vec<u32>>,
}

impl PresynapticSchedule {
    /// Empty schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Source `source` spikes at `tick`
    pub fn add(&mut self, tick: u32, source: u32) {
        self.spikes.entry(tick).or_default().push(source);
    }

    /// Sources spiking at `tick`
    pub fn spikes_for(&self, tick: u32) -> &[u32] {
        self.spikes.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of spikes
    pub fn len(&self) -> usize {
        self.spikes.values().map(Vec::len).sum()
    }

    /// True if no spike is scheduled
    pub fn is_empty(&self) -> bool {
        self.spikes.values().all(Vec::is_empty)
    }
}

impl FromIterator<(u32, u32)> for PresynapticSchedule {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut schedule = Self::new();
        for (tick, source) in iter {
            schedule.add(tick, source);
        }
        schedule
    }
}

/// Result of one completed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutput<'a> {
    /// Tick number (the first tick is 1)
    pub tick: u32,
    /// Indices of neurons that spiked, ascending
    pub spikes: &'a [u32],
    /// Time the tick took (us)
    pub elapsed_us: u64,
}

/// Counters accumulated over the processor's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessorStats {
    /// Ticks completed
    pub ticks: u64,
    /// Outgoing spikes emitted
    pub spikes: u64,
    /// Incoming events accepted
    pub events: u64,
    /// Presynaptic spikes applied to the plastic projection
    pub presynaptic_spikes: u64,
    /// Ticks that overran their budget
    pub deadline_misses: u64,
    /// Saturated fixed-point operations
    pub saturations: u64,
    /// Sum of tick durations (us)
    pub total_tick_us: u64,
    /// Longest tick (us)
    pub max_tick_us: u64,
}

/// Outcome of [`NeuronProcessor::run`]
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// First tick of the run
    pub first_tick: u32,
    /// Ticks completed during the run
    pub ticks_executed: u32,
    /// Outgoing spikes as (tick, neuron)
    pub spikes: Vec<(u32, u32)>,
    /// Per-stage timing from the profiler
    pub profile: BTreeMap<ProfilerTag, TagSummary>,
    /// Profiler events lost to the capacity limit
    pub profiler_dropped: u64,
    /// Processor counters at the end of the run
    pub stats: ProcessorStats,
    /// Fault that stopped the run early
    pub fault: Option<String>,
}

impl RunSummary {
    /// Mean firing rate per neuron (Hz) for a population of `num_neurons`
    pub fn mean_rate_hz(&self, num_neurons: usize, timestep_us: u32) -> f64 {
        let seconds = self.ticks_executed as f64 * timestep_us as f64 / 1e6;
        if seconds == 0.0 || num_neurons == 0 {
            return 0.0;
        }
        self.spikes.len() as f64 / (seconds * num_neurons as f64)
    }
}

/// Tick-driven processor for one neuron population
#[derive(Debug)]
pub struct NeuronProcessor<C: Clock = MonotonicClock> {
    block: Arc<ParamBlock>,
    config: RunConfig,
    dynamics: NeuronDynamics,
    population: PopulationState,
    input: InputRingBuffer,
    spiked: BitField,
    outgoing: Vec<u32>,
    recorder: Recorder,
    plasticity: Option<BcpnnProjection>,
    profiler: Profiler<C>,
    tick: u32,
    fault: Option<String>,
    stats: ProcessorStats,
}

impl NeuronProcessor<MonotonicClock> {
    /// Processor timed by the wall clock
    pub fn new(block: Arc<ParamBlock>, config: RunConfig) -> Result<Self> {
        Self::with_clock(block, config, MonotonicClock::new())
    }

    /// Parse a raw parameter block and build a processor from it
    pub fn from_bytes(bytes: &[u8], config: RunConfig) -> Result<Self> {
        let block = ParamBlock::parse(bytes)?;
        Self::new(Arc::new(block), config)
    }

    /// Like [`from_bytes`](Self::from_bytes), requiring exactly `num_neurons` neurons
    pub fn from_bytes_for_population(
        bytes: &[u8],
        num_neurons: usize,
        config: RunConfig,
    ) -> Result<Self> {
        let block = ParamBlock::parse_for_population(bytes, num_neurons)?;
        Self::new(Arc::new(block), config)
    }
}

impl<C: Clock> NeuronProcessor<C> {
    /// Processor timed by `clock`
    pub fn with_clock(block: Arc<ParamBlock>, config: RunConfig, clock: C) -> Result<Self> {
        config.validate()?;
        block.validate()?;

        let n = block.num_neurons();
        let dynamics = NeuronDynamics::from_block(block.clone());
        let population = PopulationState::new(&block, &dynamics);
        let recorder = Recorder::new(&block, config.recording_capacity);

        log::info!(
            "Neuron processor ready: {} neurons ({:?}), {} receptor types, {} recorded",
            n,
            dynamics.model_id(),
            block.num_receptors(),
            recorder.flagged_count()
        );

        Ok(Self {
            input: InputRingBuffer::new(n, block.num_receptors()),
            spiked: BitField::new(n),
            outgoing: Vec::with_capacity(n),
            profiler: Profiler::new(clock, config.profiler_capacity),
            recorder,
            plasticity: None,
            population,
            dynamics,
            config,
            block,
            tick: 0,
            fault: None,
            stats: ProcessorStats::default(),
        })
    }

    /// Attach a plastic projection onto the population
    ///
    /// The region must target this population, one of its receptors and
    /// the same timestep. Its traces start empty at the current tick.
    pub fn attach_plasticity(&mut self, region: Arc<BcpnnRegion>) -> Result<()> {
        region.validate()?;
        if region.num_post != self.num_neurons() {
            return Err(RuntimeError::invalid_parameter(
                "num_post",
                region.num_post.to_string(),
                format!("population size {}", self.num_neurons()),
            ));
        }
        if region.receptor as usize >= self.block.num_receptors() {
            return Err(RuntimeError::invalid_parameter(
                "receptor",
                region.receptor.to_string(),
                format!("< {}", self.block.num_receptors()),
            ));
        }
        if region.timestep_us != self.block.timestep_us {
            return Err(RuntimeError::invalid_parameter(
                "timestep_us",
                region.timestep_us.to_string(),
                format!("block timestep {}", self.block.timestep_us),
            ));
        }
        if region.delay > MAX_DELAY {
            return Err(RuntimeError::invalid_parameter(
                "delay",
                region.delay.to_string(),
                format!("<= {}", MAX_DELAY),
            ));
        }

        log::info!(
            "Plastic projection attached: {} sources onto receptor {}, mode {:#x}",
            region.num_pre,
            region.receptor,
            region.mode.0
        );
        self.plasticity = Some(BcpnnProjection::new(region, self.tick));
        Ok(())
    }

    /// Run one tick with the events delivered in it
    pub fn tick(&mut self, events: &[IncomingSpikeEvent]) -> Result<TickOutput<'_>> {
        self.tick_with_presynaptic(events, &[])
    }

    /// Run one tick with incoming events and presynaptic source spikes
    pub fn tick_with_presynaptic(
        &mut self,
        events: &[IncomingSpikeEvent],
        pre_spikes: &[u32],
    ) -> Result<TickOutput<'_>> {
        if let Some(reason) = &self.fault {
            return Err(RuntimeError::Halted {
                tick: self.tick,
                reason: reason.clone(),
            });
        }
        let tick = self.tick.checked_add(1).ok_or_else(|| RuntimeError::Halted {
            tick: self.tick,
            reason: "tick counter exhausted".to_string(),
        })?;
        for event in events {
            self.input.validate(tick, event)?;
        }
        match &self.plasticity {
            Some(projection) => projection.validate(tick, pre_spikes)?,
            None if !pre_spikes.is_empty() => {
                return Err(RuntimeError::invalid_spike_event(
                    tick,
                    "presynaptic spikes without a plastic projection",
                ));
            }
            None => {}
        }

        let start = self.profiler.now();
        self.profiler.enter(ProfilerTag::Tick);
        let mut saturations = 0u32;

        self.profiler.enter(ProfilerTag::ProcessInput);
        self.spiked.clear_all();
        self.outgoing.clear();
        for event in events {
            saturations += self.input.deposit(tick, event) as u32;
        }
        if let Some(projection) = self.plasticity.as_mut() {
            saturations += projection.process_pre(tick, pre_spikes, &mut self.input);
        }
        self.profiler.exit(ProfilerTag::ProcessInput);

        self.profiler.enter(ProfilerTag::SynapseUpdate);
        saturations += self.population.traces.update(self.input.slot(tick));
        self.input.clear_slot(tick);
        self.profiler.exit(ProfilerTag::SynapseUpdate);

        self.profiler.enter(ProfilerTag::NeuronUpdate);
        let traces = &self.population.traces;
        let intrinsic_bias = self
            .plasticity
            .as_ref()
            .map(BcpnnProjection::intrinsic_bias)
            .unwrap_or(&[]);
        for (index, state) in self.population.neurons.iter_mut().enumerate() {
            let (mut current, mut current_saturated) = traces.synaptic_current(index);
            if let Some(&bias) = intrinsic_bias.get(index) {
                match current.checked_add(bias) {
                    Some(sum) => current = sum,
                    None => {
                        current = current.saturating_add(bias);
                        current_saturated = true;
                    }
                }
            }
            let step = self.dynamics.update(index, state, current);
            if step.spiked {
                self.spiked.set(index);
            }
            saturations += current_saturated as u32 + step.saturated as u32;
        }
        self.profiler.exit(ProfilerTag::NeuronUpdate);

        self.profiler.enter(ProfilerTag::EmitSpikes);
        self.outgoing
            .extend(self.spiked.iter_ones().map(|index| index as u32));
        self.profiler.exit(ProfilerTag::EmitSpikes);

        self.profiler.enter(ProfilerTag::Record);
        self.recorder
            .record_tick(tick, &self.population, &self.spiked);
        self.profiler.exit(ProfilerTag::Record);

        if let Some(projection) = self.plasticity.as_mut() {
            self.profiler.enter(ProfilerTag::Plasticity);
            projection.process_post(tick, &self.outgoing);
            projection.refresh_bias(tick);
            self.profiler.exit(ProfilerTag::Plasticity);
        }

        self.profiler.exit(ProfilerTag::Tick);
        let elapsed_us = self.profiler.now().saturating_sub(start);

        self.tick = tick;
        self.stats.ticks += 1;
        self.stats.spikes += self.outgoing.len() as u64;
        self.stats.events += events.len() as u64;
        self.stats.presynaptic_spikes += pre_spikes.len() as u64;
        self.stats.saturations += saturations as u64;
        self.stats.total_tick_us += elapsed_us;
        self.stats.max_tick_us = self.stats.max_tick_us.max(elapsed_us);

        if let Some(budget_us) = self.config.tick_budget_us {
            if elapsed_us > budget_us {
                self.profiler.enter(ProfilerTag::DeadlineMiss);
                self.profiler.exit(ProfilerTag::DeadlineMiss);
                self.stats.deadline_misses += 1;
                let err = RuntimeError::DeadlineMiss {
                    tick,
                    elapsed_us,
                    budget_us,
                };
                log::error!("{}", err);
                self.fault = Some(err.to_string());
                return Err(err);
            }
        }

        if saturations > 0 {
            match self.config.saturation_policy {
                SaturationPolicy::Abort => {
                    let err = RuntimeError::Saturation {
                        tick,
                        count: saturations,
                    };
                    log::error!("{}", err);
                    self.fault = Some(err.to_string());
                    return Err(err);
                }
                SaturationPolicy::Clamp => {
                    log::warn!("Tick {}: {} values clamped", tick, saturations);
                }
            }
        }

        Ok(TickOutput {
            tick,
            spikes: &self.outgoing,
            elapsed_us,
        })
    }

    /// Run `ticks` consecutive ticks fed from `schedule`
    ///
    /// Schedule keys are absolute tick numbers. A fault stops the run and is
    /// reported in [`RunSummary::fault`]; an invalid event or an already
    /// halted processor is returned as an error.
    pub fn run(&mut self, ticks: u32, schedule: &SpikeSchedule) -> Result<RunSummary> {
        self.run_with_presynaptic(ticks, schedule, &PresynapticSchedule::new())
    }

    /// Like [`run`](Self::run), also feeding presynaptic spikes to the
    /// plastic projection
    pub fn run_with_presynaptic(
        &mut self,
        ticks: u32,
        schedule: &SpikeSchedule,
        presynaptic: &PresynapticSchedule,
    ) -> Result<RunSummary> {
        let first_tick = self.tick.saturating_add(1);
        let stats_before = self.stats;
        let mut summary = RunSummary {
            first_tick,
            ..RunSummary::default()
        };

        log::info!(
            "Starting run: {} ticks from tick {}, {} scheduled events, {} presynaptic spikes",
            ticks,
            first_tick,
            schedule.len(),
            presynaptic.len()
        );

        for _ in 0..ticks {
            let next = self.tick.saturating_add(1);
            match self.tick_with_presynaptic(schedule.events_for(next), presynaptic.spikes_for(next)) {
                Ok(output) => {
                    summary
                        .spikes
                        .extend(output.spikes.iter().map(|&neuron| (output.tick, neuron)));
                    summary.ticks_executed += 1;
                }
                // the faulting tick ran to completion but its output is withheld
                Err(err @ (RuntimeError::DeadlineMiss { .. } | RuntimeError::Saturation { .. })) => {
                    summary.ticks_executed += 1;
                    summary.fault = Some(err.to_string());
                    break;
                }
                Err(err) => return Err(err),
            }

            let interval = self.config.progress_interval;
            if interval > 0 && summary.ticks_executed % interval == 0 {
                log::debug!(
                    "Tick {}: {} spikes so far",
                    self.tick,
                    summary.spikes.len()
                );
            }
        }

        summary.profile = self.profiler.summary();
        summary.profiler_dropped = self.profiler.dropped();
        summary.stats = self.stats;

        log::info!(
            "Run finished: {} ticks, {} spikes, {} deadline misses, {} saturations",
            summary.ticks_executed,
            summary.spikes.len(),
            self.stats.deadline_misses - stats_before.deadline_misses,
            self.stats.saturations - stats_before.saturations
        );
        Ok(summary)
    }

    /// Snapshot of everything a restore needs
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tick: self.tick,
            population: self.population.clone(),
            input: self.input.clone(),
            plasticity: self.plasticity.as_ref().map(|p| p.state().clone()),
        }
    }

    /// Return to a checkpoint, clearing any fault
    ///
    /// Recordings made after the checkpoint's tick are discarded.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if checkpoint.population.len() != self.population.len() {
            return Err(RuntimeError::CheckpointMismatch {
                reason: format!(
                    "checkpoint has {} neurons, processor has {}",
                    checkpoint.population.len(),
                    self.population.len()
                ),
            });
        }
        if checkpoint.input.num_receptors() != self.input.num_receptors()
            || checkpoint.population.traces.num_receptors() != self.input.num_receptors()
        {
            return Err(RuntimeError::CheckpointMismatch {
                reason: format!(
                    "checkpoint has {} receptor types, processor has {}",
                    checkpoint.input.num_receptors(),
                    self.input.num_receptors()
                ),
            });
        }

        match (self.plasticity.as_mut(), &checkpoint.plasticity) {
            (Some(projection), Some(state)) => projection.restore(state, checkpoint.tick)?,
            (None, None) => {}
            (attached, _) => {
                return Err(RuntimeError::CheckpointMismatch {
                    reason: format!(
                        "checkpoint {} a plastic projection, processor {}",
                        if checkpoint.plasticity.is_some() { "has" } else { "lacks" },
                        if attached.is_some() { "has one" } else { "does not" }
                    ),
                });
            }
        }

        self.population = checkpoint.population.clone();
        self.input = checkpoint.input.clone();
        self.tick = checkpoint.tick;
        self.spiked.clear_all();
        self.outgoing.clear();
        self.recorder.truncate_after(checkpoint.tick);
        if let Some(reason) = self.fault.take() {
            log::info!("Restored to tick {}, cleared fault: {}", self.tick, reason);
        } else {
            log::info!("Restored to tick {}", self.tick);
        }
        Ok(())
    }

    /// Last completed tick (0 before the first tick)
    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// True once a fault has halted the processor
    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }

    /// Fault that halted the processor
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Parameter block the processor was built from
    pub fn block(&self) -> &Arc<ParamBlock> {
        &self.block
    }

    /// Run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Population size
    pub fn num_neurons(&self) -> usize {
        self.population.len()
    }

    /// Membrane state of every neuron
    pub fn neurons(&self) -> &[NeuronState] {
        &self.population.neurons
    }

    /// Synaptic traces of every neuron
    pub fn traces(&self) -> &SynapseTraces {
        &self.population.traces
    }

    /// Attached plastic projection
    pub fn plasticity(&self) -> Option<&BcpnnProjection> {
        self.plasticity.as_ref()
    }

    /// Spike bit-field of the last completed tick
    pub fn spike_bits(&self) -> &BitField {
        &self.spiked
    }

    /// Lifetime counters
    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    /// Profiler (events, summary, clock)
    pub fn profiler(&self) -> &Profiler<C> {
        &self.profiler
    }

    /// Drain the profiler's events in order
    pub fn dump_profile(&mut self) -> Vec<ProfilerEvent> {
        self.profiler.dump()
    }

    /// Copy of the recording region
    pub fn recording(&self) -> Recording {
        self.recorder.snapshot()
    }

    /// Drain the recording region
    pub fn take_recording(&mut self) -> Recording {
        self.recorder.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use lifcore_params::{LifSpec, ParamBlockBuilder, Q15_16};

    fn integrator(n: usize) -> Arc<ParamBlock> {
        let block = ParamBlockBuilder::new(n, 1.0)
            .neuron_type(LifSpec {
                tau_m_ms: None,
                v_rest_mv: 0.0,
                v_reset_mv: 0.0,
                v_thresh_mv: 10.0,
                tau_refrac_ms: 0.0,
                ..LifSpec::default()
            })
            .bias_all(1.0)
            .build()
            .unwrap();
        Arc::new(block)
    }

    #[test]
    fn test_first_tick_is_one() {
        let mut processor = NeuronProcessor::new(integrator(2), RunConfig::default()).unwrap();
        assert_eq!(processor.current_tick(), 0);
        let out = processor.tick(&[]).unwrap();
        assert_eq!(out.tick, 1);
        assert!(out.spikes.is_empty());
    }

    #[test]
    fn test_invalid_event_leaves_state_untouched() {
        let mut processor = NeuronProcessor::new(integrator(2), RunConfig::default()).unwrap();
        processor.tick(&[]).unwrap();
        let before = processor.checkpoint();

        let bad = IncomingSpikeEvent::new(0, 2, Q15_16::ONE);
        let err = processor.tick(&[bad]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidSpikeEvent { tick: 2, .. }));
        assert!(!processor.is_halted());
        assert_eq!(processor.checkpoint(), before);
    }

    #[test]
    fn test_profiler_brackets_stages() {
        let clock = ManualClock::stepping(1);
        let mut processor =
            NeuronProcessor::with_clock(integrator(1), RunConfig::default(), clock).unwrap();
        processor.tick(&[]).unwrap();

        let events = processor.dump_profile();
        let tags: Vec<ProfilerTag> = events.iter().map(|e| e.tag).collect();
        assert_eq!(tags.first(), Some(&ProfilerTag::Tick));
        assert_eq!(tags.last(), Some(&ProfilerTag::Tick));
        assert_eq!(events.len(), 12);
        assert!(events.windows(2).all(|w| w[0].timestamp_us < w[1].timestamp_us));
    }

    #[test]
    fn test_schedule_lookup() {
        let ev = IncomingSpikeEvent::new(0, 0, Q15_16::ONE);
        let schedule: SpikeSchedule = [(3, ev), (3, ev), (9, ev)].into_iter().collect();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.events_for(3).len(), 2);
        assert!(schedule.events_for(4).is_empty());
        assert_eq!(schedule.last_tick(), Some(9));
    }

    #[test]
    fn test_run_collects_spikes() {
        let mut processor = NeuronProcessor::new(integrator(1), RunConfig::default()).unwrap();
        let summary = processor.run(35, &SpikeSchedule::new()).unwrap();
        assert_eq!(summary.ticks_executed, 35);
        assert_eq!(summary.spikes, vec![(10, 0), (20, 0), (30, 0)]);
        assert!(summary.fault.is_none());
        assert_eq!(summary.stats.spikes, 3);
    }
}
