//! Running a parameter block through the neuron processor

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::Args;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::load_run_config,
    error::{CliError, CliResult},
};
use lifcore_params::{ParamBlock, Q15_16};
use lifcore_runtime::{
    IncomingSpikeEvent, NeuronProcessor, ProcessorStats, ProfilerEvent, ProfilerTag,
    SpikeRecord, SpikeSchedule, TagSummary,
};

/// Run a parameter block through the neuron processor
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Parameter block file
    pub block: PathBuf,

    /// Number of ticks to run
    #[arg(long, default_value = "1000")]
    pub ticks: u32,

    /// Require the block to describe exactly this many neurons
    #[arg(long)]
    pub expect_neurons: Option<usize>,

    /// Stimulus file (JSON list of timed spike events)
    #[arg(long, conflicts_with = "poisson_rate")]
    pub stimulus: Option<PathBuf>,

    /// Poisson input rate per neuron (Hz)
    #[arg(long)]
    pub poisson_rate: Option<f64>,

    /// Weight of each Poisson input spike
    #[arg(long, default_value = "0.5")]
    pub poisson_weight: f64,

    /// Receptor Poisson input is delivered to
    #[arg(long, default_value = "0")]
    pub poisson_receptor: u8,

    /// Random seed for Poisson input
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Run configuration (TOML)
    #[arg(long)]
    pub run_config: Option<PathBuf>,

    /// Override the per-tick budget (us)
    #[arg(long)]
    pub tick_budget_us: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = "lifcore-out")]
    pub out: PathBuf,
}

/// One entry of a stimulus file
///
/// Exactly one of `weight` (Q15.16 value) and `raw_weight` (integer scaled
/// by the receptor's `weight_frac_bits`) must be given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusEntry {
    /// Tick the event is delivered in
    pub tick: u32,
    /// Receptor type
    pub receptor: u8,
    /// Target neuron
    pub neuron: u32,
    /// Weight in physical units
    #[serde(default)]
    pub weight: Option<f64>,
    /// Raw integer weight
    #[serde(default)]
    pub raw_weight: Option<i32>,
    /// Delivery delay in ticks
    #[serde(default)]
    pub delay: u8,
}

#[derive(Debug, Serialize)]
struct ProfileReport {
    events: Vec<ProfilerEvent>,
    summary: BTreeMap<ProfilerTag, TagSummary>,
    dropped: u64,
}

#[derive(Debug, Serialize)]
struct RunReport {
    block: String,
    num_neurons: usize,
    timestep_us: u32,
    first_tick: u32,
    ticks_requested: u32,
    ticks_executed: u32,
    spike_count: usize,
    mean_rate_hz: f64,
    scheduled_events: usize,
    stats: ProcessorStats,
    profiler_dropped: u64,
    recording_dropped: u64,
    fault: Option<String>,
}

impl RunCommand {
    pub fn execute(self) -> CliResult<()> {
        let bytes = std::fs::read(&self.block)
            .with_context(|| format!("reading parameter block {}", self.block.display()))?;
        let block = match self.expect_neurons {
            Some(n) => ParamBlock::parse_for_population(&bytes, n)?,
            None => ParamBlock::parse(&bytes)?,
        };
        let block = Arc::new(block);

        let mut config = load_run_config(self.run_config.as_deref())?;
        if let Some(budget) = self.tick_budget_us {
            config = config.with_tick_budget_us(budget);
        }

        let schedule = self.build_schedule(&block)?;
        info!(
            "Running {} for {} ticks ({} neurons, {} input events)",
            self.block.display(),
            self.ticks,
            block.num_neurons(),
            schedule.len()
        );

        let mut processor = NeuronProcessor::new(block.clone(), config)?;
        let summary = processor.run(self.ticks, &schedule)?;

        std::fs::create_dir_all(&self.out)?;

        let spikes: Vec<SpikeRecord> = summary
            .spikes
            .iter()
            .map(|&(tick, neuron)| SpikeRecord { tick, neuron })
            .collect();
        write_json(&self.out.join("spikes.json"), &spikes)?;

        let recording = processor.take_recording();
        write_json(&self.out.join("recording.json"), &recording)?;

        let profile = ProfileReport {
            events: processor.dump_profile(),
            summary: summary.profile.clone(),
            dropped: summary.profiler_dropped,
        };
        write_json(&self.out.join("profile.json"), &profile)?;

        let report = RunReport {
            block: self.block.display().to_string(),
            num_neurons: block.num_neurons(),
            timestep_us: block.timestep_us,
            first_tick: summary.first_tick,
            ticks_requested: self.ticks,
            ticks_executed: summary.ticks_executed,
            spike_count: summary.spikes.len(),
            mean_rate_hz: summary.mean_rate_hz(block.num_neurons(), block.timestep_us),
            scheduled_events: schedule.len(),
            stats: summary.stats,
            profiler_dropped: summary.profiler_dropped,
            recording_dropped: recording.dropped,
            fault: summary.fault.clone(),
        };
        write_json(&self.out.join("summary.json"), &report)?;

        if recording.dropped > 0 {
            warn!("{} recording entries dropped", recording.dropped);
        }
        info!(
            "{} ticks, {} spikes ({:.2} Hz mean), output in {}",
            report.ticks_executed,
            report.spike_count,
            report.mean_rate_hz,
            self.out.display()
        );

        match summary.fault {
            Some(fault) => Err(CliError::Halted(fault)),
            None => Ok(()),
        }
    }

    fn build_schedule(&self, block: &ParamBlock) -> CliResult<SpikeSchedule> {
        if let Some(path) = &self.stimulus {
            return load_stimulus(path, block);
        }
        match self.poisson_rate {
            Some(rate) => poisson_schedule(
                block,
                self.ticks,
                rate,
                self.poisson_receptor,
                Q15_16::from_f64(self.poisson_weight),
                self.seed,
            ),
            None => Ok(SpikeSchedule::new()),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

fn load_stimulus(path: &Path, block: &ParamBlock) -> CliResult<SpikeSchedule> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading stimulus {}", path.display()))?;
    let entries: Vec<StimulusEntry> = serde_json::from_str(&text)?;

    let mut schedule = SpikeSchedule::new();
    for (i, entry) in entries.into_iter().enumerate() {
        let event = match (entry.weight, entry.raw_weight) {
            (Some(weight), None) => {
                IncomingSpikeEvent::new(entry.receptor, entry.neuron, Q15_16::from_f64(weight))
            }
            (None, Some(raw)) => {
                let params = block.receptors.get(entry.receptor as usize).ok_or_else(|| {
                    CliError::invalid_args(format!(
                        "stimulus[{}]: receptor {} out of range",
                        i, entry.receptor
                    ))
                })?;
                IncomingSpikeEvent::from_raw(entry.receptor, entry.neuron, raw, params)
            }
            _ => {
                return Err(CliError::invalid_args(format!(
                    "stimulus[{}]: give exactly one of weight and raw_weight",
                    i
                )))
            }
        };
        if entry.tick == 0 {
            return Err(CliError::invalid_args(format!(
                "stimulus[{}]: ticks start at 1",
                i
            )));
        }
        schedule.add(entry.tick, event.with_delay(entry.delay));
    }
    Ok(schedule)
}

/// Independent Poisson input to every neuron, reproducible from `seed`
pub fn poisson_schedule(
    block: &ParamBlock,
    ticks: u32,
    rate_hz: f64,
    receptor: u8,
    weight: Q15_16,
    seed: u64,
) -> CliResult<SpikeSchedule> {
    if !rate_hz.is_finite() || rate_hz < 0.0 {
        return Err(CliError::invalid_args(format!(
            "poisson rate {} must be >= 0",
            rate_hz
        )));
    }
    if receptor as usize >= block.num_receptors() {
        return Err(CliError::invalid_args(format!(
            "poisson receptor {} out of range ({} receptor types)",
            receptor,
            block.num_receptors()
        )));
    }

    let p = (rate_hz * block.timestep_us as f64 / 1e6).min(1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut schedule = SpikeSchedule::new();
    for tick in 1..=ticks {
        for neuron in 0..block.num_neurons() as u32 {
            if rng.gen::<f64>() < p {
                schedule.add(tick, IncomingSpikeEvent::new(receptor, neuron, weight));
            }
        }
    }
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifcore_params::ParamBlockBuilder;

    #[test]
    fn test_poisson_is_reproducible() {
        let block = ParamBlockBuilder::new(10, 1.0).build().unwrap();
        let a = poisson_schedule(&block, 200, 50.0, 0, Q15_16::ONE, 7).unwrap();
        let b = poisson_schedule(&block, 200, 50.0, 0, Q15_16::ONE, 7).unwrap();
        let c = poisson_schedule(&block, 200, 50.0, 0, Q15_16::ONE, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 10 neurons * 200 ticks * 0.05
        assert!(a.len() > 50 && a.len() < 150, "{} events", a.len());
    }

    #[test]
    fn test_poisson_rejects_bad_receptor() {
        let block = ParamBlockBuilder::new(2, 1.0).build().unwrap();
        assert!(poisson_schedule(&block, 10, 10.0, 5, Q15_16::ONE, 1).is_err());
        assert!(poisson_schedule(&block, 10, -1.0, 0, Q15_16::ONE, 1).is_err());
    }
}
