//! Error types for the neuron processor

use lifcore_params::ConfigError;
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced by the neuron processor
///
/// `MalformedConfig` and `InvalidParameter` are startup failures: no
/// processor is created. `DeadlineMiss` and `Saturation` are run-time
/// faults: the tick that raised them completed, but the processor refuses
/// further ticks until restored from a checkpoint.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Parameter block rejected by the loader
    #[error("Malformed configuration: {source}")]
    MalformedConfig {
        #[from]
        /// Source loader error
        source: ConfigError,
    },

    /// Invalid run configuration value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Incoming spike event refers to a neuron, receptor or delay that does not exist
    #[error("Invalid spike event for tick {tick}: {reason}")]
    InvalidSpikeEvent {
        /// Tick the event was delivered for
        tick: u32,
        /// What is wrong with the event
        reason: String,
    },

    /// Tick did not complete within its real-time budget
    #[error("Deadline miss at tick {tick}: {elapsed_us}us elapsed, budget {budget_us}us")]
    DeadlineMiss {
        /// Tick that overran
        tick: u32,
        /// Time the tick took
        elapsed_us: u64,
        /// Allowed time per tick
        budget_us: u64,
    },

    /// Fixed-point state hit its representable range
    #[error("Fixed-point saturation at tick {tick}: {count} values clamped")]
    Saturation {
        /// Tick in which saturation occurred
        tick: u32,
        /// Number of clamped operations
        count: u32,
    },

    /// Processor is faulted and refuses to tick
    #[error("Processor halted after tick {tick}: {reason}")]
    Halted {
        /// Last completed tick
        tick: u32,
        /// Fault that halted the processor
        reason: String,
    },

    /// Checkpoint does not belong to this processor
    #[error("Checkpoint mismatch: {reason}")]
    CheckpointMismatch {
        /// Reason the checkpoint was rejected
        reason: String,
    },
}

impl RuntimeError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid spike event error
    pub fn invalid_spike_event(tick: u32, reason: impl Into<String>) -> Self {
        Self::InvalidSpikeEvent {
            tick,
            reason: reason.into(),
        }
    }

    /// Whether this error leaves the processor faulted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeadlineMiss { .. } | Self::Saturation { .. } | Self::Halted { .. }
        )
    }
}
