//! Progress reporting for the long-running fetch loops.

use std::cell::Cell;

use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting the answer-unit ids each document references.
    DocumentAnswerIds,
    /// Fetching answer-unit content.
    AnswerUnits,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::DocumentAnswerIds => "Get PAU ids from document",
            Phase::AnswerUnits => "Get PAU",
        }
    }
}

/// Position within a phase. `index` and `total` include work finished by
/// earlier runs (`recovered`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub index: usize,
    pub total: usize,
    pub recovered: usize,
}

impl ProgressEvent {
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.index as f64 / self.total as f64
        }
    }
}

pub trait ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F: Fn(&ProgressEvent)> ProgressObserver for F {
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Logs the first item of a run, every `every`-th item, and the last item.
/// The ETA clock restarts whenever the phase changes.
pub struct LogProgress {
    every: usize,
    phase: Cell<Option<Phase>>,
    started: Cell<DateTime<Utc>>,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            phase: Cell::new(None),
            started: Cell::new(Utc::now()),
        }
    }

    fn enter(&self, phase: Phase) {
        if self.phase.get() != Some(phase) {
            self.phase.set(Some(phase));
            self.started.set(Utc::now());
        }
    }

    fn should_log(&self, event: &ProgressEvent) -> bool {
        event.index == event.recovered + 1
            || event.index == event.total
            || event.index % self.every == 0
    }

    /// Remaining time extrapolated from the items fetched by this run.
    fn eta_secs(&self, event: &ProgressEvent) -> Option<i64> {
        let done = event.index.checked_sub(event.recovered)?;
        if done == 0 {
            return None;
        }
        let elapsed_ms = (Utc::now() - self.started.get()).num_milliseconds().max(0);
        let remaining = event.total.saturating_sub(event.index) as i64;
        Some(elapsed_ms * remaining / done as i64 / 1000)
    }
}

impl ProgressObserver for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.enter(event.phase);
        if !self.should_log(event) {
            return;
        }
        info!(
            eta_secs = self.eta_secs(event),
            "{} {} of {} ({:.3}%)",
            event.phase.label(),
            event.index,
            event.total,
            event.percent_complete()
        );
    }
}
