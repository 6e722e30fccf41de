//! Load progress notifications
//!
//! A load reports the start of each named step followed by percentages. The
//! reporter enforces the ordering rules so sinks never have to: percentages are
//! clamped to `0..=100` and never decrease within a step, and exactly one
//! `Finished` event is delivered.

use log::trace;

/// One notification from a running load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A new loading phase began
    StepStarted(String),
    /// Percentage of the current step completed
    Progress(u8),
    /// The load terminated; `true` on success
    Finished(bool),
}

type Sink = Box<dyn FnMut(LoadEvent) + Send>;

/// Sender side of the progress channel, owned by a load while it runs
pub struct ProgressReporter {
    sink: Option<Sink>,
    last_percent: Option<u8>,
    min_step: u8,
    finished: bool,
}

impl ProgressReporter {
    /// Deliver events to a closure
    pub fn new<F>(sink: F) -> Self
    where
        F: FnMut(LoadEvent) + Send + 'static,
    {
        Self {
            sink: Some(Box::new(sink)),
            last_percent: None,
            min_step: 1,
            finished: false,
        }
    }

    /// Deliver events over a channel, e.g. to a UI thread
    pub fn channel() -> (Self, flume::Receiver<LoadEvent>) {
        let (tx, rx) = flume::unbounded();
        let reporter = Self::new(move |event| {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        });
        (reporter, rx)
    }

    /// Discard all events
    pub fn silent() -> Self {
        Self {
            sink: None,
            last_percent: None,
            min_step: 1,
            finished: false,
        }
    }

    /// Only forward progress once it has advanced by at least `percent`
    pub fn with_min_step(mut self, percent: u8) -> Self {
        self.min_step = percent.max(1);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn emit(&mut self, event: LoadEvent) {
        trace!(target: "pointscope", "load event {:?}", event);
        if let Some(sink) = self.sink.as_mut() {
            sink(event);
        }
    }

    /// Announce the start of a loading step
    pub fn step(&mut self, description: impl Into<String>) {
        if self.finished {
            return;
        }
        self.last_percent = None;
        self.emit(LoadEvent::StepStarted(description.into()));
    }

    /// Report a percentage for the current step
    pub fn percent(&mut self, percent: f64) {
        if self.finished {
            return;
        }
        let value = percent.clamp(0.0, 100.0) as u8;
        let forward = match self.last_percent {
            None => true,
            Some(last) => value >= last.saturating_add(self.min_step) || (value == 100 && last < 100),
        };
        if forward {
            self.last_percent = Some(value);
            self.emit(LoadEvent::Progress(value));
        }
    }

    /// Report progress as `done` out of `total` items
    pub fn fraction(&mut self, done: usize, total: usize) {
        if total == 0 {
            self.percent(100.0);
        } else {
            self.percent(100.0 * done as f64 / total as f64);
        }
    }

    /// Terminate the load; later calls are ignored
    pub fn finish(&mut self, success: bool) {
        if self.finished {
            return;
        }
        if success && self.last_percent != Some(100) {
            self.percent(100.0);
        }
        self.finished = true;
        self.emit(LoadEvent::Finished(success));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last_percent", &self.last_percent)
            .field("finished", &self.finished)
            .finish()
    }
}
