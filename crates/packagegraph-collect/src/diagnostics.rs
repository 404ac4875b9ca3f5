//! Step timing for `--profile` runs.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Records wall-clock time per named pipeline step.
///
/// A disabled instance never takes the lock or reads the clock.
#[derive(Debug, Default)]
pub struct Diagnostics {
    enabled: bool,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    started: Option<Instant>,
    depth: usize,
    timings: Vec<StepTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub total: Duration,
    pub count: usize,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: Mutex::new(State::default()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts a step; the timing is recorded when the guard drops.
    pub fn step(&self, name: &'static str) -> StepGuard<'_> {
        if !self.enabled {
            return StepGuard {
                diagnostics: None,
                name,
                started: None,
                _span: None,
            };
        }
        let depth = {
            let mut state = self.state.lock();
            state.started.get_or_insert_with(Instant::now);
            state.depth += 1;
            state.depth
        };
        let pad = "  ".repeat(depth - 1);
        tracing::info!("{pad}> {name}");
        StepGuard {
            diagnostics: Some(self),
            name,
            started: Some(Instant::now()),
            _span: Some(tracing::info_span!("step", step = name).entered()),
        }
    }

    /// Logs a progress line inside the current step.
    pub fn log(&self, message: impl fmt::Display) {
        if !self.enabled {
            return;
        }
        let (depth, elapsed) = {
            let state = self.state.lock();
            (state.depth, state.started.map(|s| s.elapsed()))
        };
        let pad = "  ".repeat(depth.saturating_sub(1));
        let elapsed = elapsed.unwrap_or_default().as_secs_f64();
        tracing::info!("{pad}  {message} (+{elapsed:.2}s)");
    }

    /// Per-step totals in first-seen order.
    pub fn summary(&self) -> Vec<StepTiming> {
        if !self.enabled {
            return Vec::new();
        }
        self.state.lock().timings.clone()
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        if summary.is_empty() {
            return;
        }
        let width = summary.iter().map(|t| t.name.len()).max().unwrap_or(0);
        tracing::info!("{:<width$}  {:>10}  {:>5}", "step", "seconds", "calls");
        for timing in &summary {
            tracing::info!(
                "{:<width$}  {:>10.3}  {:>5}",
                timing.name,
                timing.total.as_secs_f64(),
                timing.count
            );
        }
    }

    fn record(&self, name: &str, elapsed: Duration) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        match state.timings.iter_mut().find(|t| t.name == name) {
            Some(timing) => {
                timing.total += elapsed;
                timing.count += 1;
            }
            None => state.timings.push(StepTiming {
                name: name.to_string(),
                total: elapsed,
                count: 1,
            }),
        }
    }
}

#[must_use = "the step ends when the guard is dropped"]
pub struct StepGuard<'a> {
    diagnostics: Option<&'a Diagnostics>,
    name: &'static str,
    started: Option<Instant>,
    _span: Option<tracing::span::EnteredSpan>,
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        let (Some(diagnostics), Some(started)) = (self.diagnostics, self.started) else {
            return;
        };
        let elapsed = started.elapsed();
        diagnostics.record(self.name, elapsed);
        tracing::info!("< {} ({:.2}s)", self.name, elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_records_nothing() {
        let diagnostics = Diagnostics::disabled();
        {
            let _step = diagnostics.step("fetch");
            diagnostics.log("ignored");
        }
        assert!(diagnostics.summary().is_empty());
    }

    #[test]
    fn repeated_steps_accumulate() {
        let diagnostics = Diagnostics::new(true);
        for _ in 0..3 {
            let _step = diagnostics.step("emit");
        }
        {
            let _outer = diagnostics.step("link");
            let _inner = diagnostics.step("emit");
        }
        let summary = diagnostics.summary();
        let names: Vec<_> = summary.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["emit", "link"]);
        assert_eq!(summary[0].count, 4);
        assert_eq!(summary[1].count, 1);
    }
}
