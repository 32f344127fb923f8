//! Run configuration of the neuron processor

use crate::error::{Result, RuntimeError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a tick does when fixed-point state saturates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum SaturationPolicy {
    /// Complete the tick, then fault the processor
    #[default]
    Abort,
    /// Keep the clamped values, count them and carry on
    Clamp,
}

/// Run-time settings that are not part of the model
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RunConfig {
    /// Real-time budget per tick (us); `None` disables deadline checks
    pub tick_budget_us: Option<u64>,
    /// Reaction to fixed-point saturation
    pub saturation_policy: SaturationPolicy,
    /// Profiler events kept before dropping (0 disables profiling)
    pub profiler_capacity: usize,
    /// Recorded samples kept before dropping
    pub recording_capacity: usize,
    /// Ticks between progress log lines during a run (0 disables)
    pub progress_interval: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_budget_us: None,
            saturation_policy: SaturationPolicy::Abort,
            profiler_capacity: 4096,
            recording_capacity: 100_000,
            progress_interval: 1000,
        }
    }
}

impl RunConfig {
    /// Set the per-tick budget
    pub fn with_tick_budget_us(mut self, budget_us: u64) -> Self {
        self.tick_budget_us = Some(budget_us);
        self
    }

    /// Set the saturation policy
    pub fn with_saturation_policy(mut self, policy: SaturationPolicy) -> Self {
        self.saturation_policy = policy;
        self
    }

    /// Set the profiler capacity
    pub fn with_profiler_capacity(mut self, capacity: usize) -> Self {
        self.profiler_capacity = capacity;
        self
    }

    /// Set the recording capacity
    pub fn with_recording_capacity(mut self, capacity: usize) -> Self {
        self.recording_capacity = capacity;
        self
    }

    /// Set the progress log interval
    pub fn with_progress_interval(mut self, interval: u32) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.tick_budget_us == Some(0) {
            return Err(RuntimeError::invalid_parameter("tick_budget_us", "0", "> 0"));
        }
        Ok(())
    }
}
