//! Stage timing
//!
//! Logs elapsed time when the guard goes out of scope, including on early
//! return through `?`.

use std::time::Instant;

pub struct StageTimer {
    name: &'static str,
    what: String,
    started: Instant,
}

impl StageTimer {
    pub fn start(name: &'static str, what: impl Into<String>) -> Self {
        Self {
            name,
            what: what.into(),
            started: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        tracing::debug!(
            stage = self.name,
            "{} in {:.2}s",
            self.what,
            self.started.elapsed().as_secs_f64()
        );
    }
}
