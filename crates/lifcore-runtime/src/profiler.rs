//! Bounded in-memory profiler of tagged enter/exit timestamps
//!
//! Events go into a buffer preallocated to a fixed capacity. When the
//! buffer is full, further events are dropped (drop-newest): the recorded
//! prefix stays intact and ordered, the tick loop never blocks or
//! allocates, and the number of dropped events is kept for the report.

use std::collections::BTreeMap;

use crate::clock::Clock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Profiled stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ProfilerTag {
    /// Whole tick
    Tick,
    /// Validating and depositing incoming spike events
    ProcessInput,
    /// Synaptic trace decay and input
    SynapseUpdate,
    /// Membrane integration and threshold test
    NeuronUpdate,
    /// Collecting spikes from the bit-field
    EmitSpikes,
    /// Writing recorded state
    Record,
    /// Back-propagating spikes to a plastic projection and refreshing its bias
    Plasticity,
    /// Marker written when a tick overruns its budget
    DeadlineMiss,
}

/// Whether an event opens or closes a tagged section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ProfilerEventKind {
    /// Section entered
    Enter,
    /// Section left
    Exit,
}

/// One profiler record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfilerEvent {
    /// Stage
    pub tag: ProfilerTag,
    /// Clock reading in microseconds
    pub timestamp_us: u64,
    /// Enter or exit
    pub kind: ProfilerEventKind,
}

/// Aggregate timing of one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TagSummary {
    /// Completed enter/exit pairs
    pub count: u64,
    /// Sum of section durations (us)
    pub total_us: u64,
    /// Longest section (us)
    pub max_us: u64,
}

/// Fixed-capacity profiler owning its time source
#[derive(Debug)]
pub struct Profiler<C: Clock> {
    clock: C,
    events: Vec<ProfilerEvent>,
    capacity: usize,
    dropped: u64,
    warned: bool,
}

impl<C: Clock> Profiler<C> {
    /// Profiler holding at most `capacity` events; zero disables recording
    pub fn new(clock: C, capacity: usize) -> Self {
        Self {
            clock,
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
            warned: false,
        }
    }

    /// Current clock reading
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now_us()
    }

    /// The time source
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    fn push(&mut self, tag: ProfilerTag, kind: ProfilerEventKind) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.dropped += 1;
            if !self.warned {
                log::warn!(
                    "Profiler buffer full ({} events), dropping further events",
                    self.capacity
                );
                self.warned = true;
            }
            return;
        }
        self.events.push(ProfilerEvent {
            tag,
            timestamp_us: self.clock.now_us(),
            kind,
        });
    }

    /// Record entry into a tagged section
    #[inline]
    pub fn enter(&mut self, tag: ProfilerTag) {
        self.push(tag, ProfilerEventKind::Enter);
    }

    /// Record exit from a tagged section
    #[inline]
    pub fn exit(&mut self, tag: ProfilerTag) {
        self.push(tag, ProfilerEventKind::Exit);
    }

    /// Discard all events and the dropped count
    pub fn reset(&mut self) {
        self.events.clear();
        self.dropped = 0;
        self.warned = false;
    }

    /// Take the recorded events in order, leaving the buffer empty
    pub fn dump(&mut self) -> Vec<ProfilerEvent> {
        let events = self.events.drain(..).collect();
        self.dropped = 0;
        self.warned = false;
        events
    }

    /// Recorded events in order
    pub fn events(&self) -> &[ProfilerEvent] {
        &self.events
    }

    /// Events discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Maximum number of events held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Per-tag timing of matched enter/exit pairs
    ///
    /// Sections nest per tag; an exit without an open entry is ignored.
    pub fn summary(&self) -> BTreeMap<ProfilerTag, TagSummary> {
        let mut open: BTreeMap<ProfilerTag, Vec<u64>> = BTreeMap::new();
        let mut summary: BTreeMap<ProfilerTag, TagSummary> = BTreeMap::new();

        for event in &self.events {
            match event.kind {
                ProfilerEventKind::Enter => {
                    open.entry(event.tag).or_default().push(event.timestamp_us);
                }
                ProfilerEventKind::Exit => {
                    if let Some(start) = open.get_mut(&event.tag).and_then(|s| s.pop()) {
                        let duration = event.timestamp_us.saturating_sub(start);
                        let entry = summary.entry(event.tag).or_default();
                        entry.count += 1;
                        entry.total_us += duration;
                        entry.max_us = entry.max_us.max(duration);
                    }
                }
            }
        }
        summary
    }
}
