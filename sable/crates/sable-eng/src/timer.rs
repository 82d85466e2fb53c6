//! Scoped step timing.
//!
//! A [`StepTimer`] brackets one DATA or PROC execution and reports the
//! elapsed wall time when it goes out of scope - on success, error and
//! unwind alike, since the work happens in `Drop`.

use std::time::Instant;

use sable_util::Handler;

/// RAII guard that notes elapsed time for a step on drop.
pub struct StepTimer<'a> {
    label: String,
    start: Instant,
    handler: &'a Handler,
}

impl<'a> StepTimer<'a> {
    /// Start timing a step. `label` reads like "DATA statement" or
    /// "PROCEDURE SORT".
    pub fn new(label: impl Into<String>, handler: &'a Handler) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
            handler,
        }
    }
}

impl Drop for StepTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.handler.note(format!(
            "{} used (Total process time): real time {:.3} seconds",
            self.label,
            elapsed.as_secs_f64()
        ));
        log::debug!("{} finished in {:?}", self.label, elapsed);
    }
}
