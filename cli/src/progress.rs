/// Progress reporting hook the driver calls into at coarse granularity
/// (every N samples). Kept trait-object-dispatched and terminal-agnostic so
/// the driver never depends on `indicatif` directly; only `main` wires a
/// rendering implementation.
pub trait ProgressSink {
    fn started(&self, total_samples: u64) {
        let _ = total_samples;
    }
    fn advance(&self, samples_done: u64, total_samples: u64) {
        let _ = (samples_done, total_samples);
    }
    fn finished(&self) {}
}

/// Default sink for programmatic callers (tests, library embedders) that
/// don't want any terminal output.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {}
