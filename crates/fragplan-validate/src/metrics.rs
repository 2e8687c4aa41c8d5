//! Tracing hooks for validation phases.
//!
//! Nothing is recorded without the `tracing` feature. The CLI enables it and
//! installs a subscriber.

#[cfg(feature = "tracing")]
pub fn emit_phase(phase: &str, counts: &[(&str, usize)]) {
    let span = tracing::span!(tracing::Level::DEBUG, "fragplan", phase);
    let _guard = span.enter();
    for &(k, v) in counts {
        tracing::debug!(%phase, key = k, value = v, "phase");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_phase(_phase: &str, _counts: &[(&str, usize)]) {}
