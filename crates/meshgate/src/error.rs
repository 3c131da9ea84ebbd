//! Error taxonomy for the transport.
//!
//! Nothing here is fatal by design: the transport is a best-effort geometry
//! feed, and every failure degrades to "no mesh update this tick" on the
//! consumer side or "frame dropped" on the producer side.

use std::io;

/// Errors surfaced by the shared-memory transport.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Segment or semaphore creation failed, even after bounded retry.
    ///
    /// Callers should treat the transport as unavailable and operate in a
    /// degraded no-op mode rather than terminate.
    #[error("{resource} allocation failed after {retries} retries")]
    Allocation {
        /// Which OS object failed ("segment" or "semaphore").
        resource: &'static str,
        /// Retries performed before giving up.
        retries: u32,
        #[source]
        source: io::Error,
    },

    /// The OS-level attach call failed; the transport is unusable.
    #[error("failed to attach shared memory segment")]
    Attach(#[source] io::Error),

    /// Semaphore acquisition failed at the OS level (not ordinary
    /// contention). Shared state must be treated as not-safely-read.
    #[error("failed to lock semaphore")]
    Lock(#[source] io::Error),

    /// Bounded-wait acquisition gave up. The other side may be wedged or
    /// dead while holding the gate.
    #[error("semaphore lock timed out after {waited_ms} ms")]
    LockTimeout { waited_ms: u64 },

    /// Semaphore release failed at the OS level.
    #[error("failed to unlock semaphore")]
    Unlock(#[source] io::Error),

    /// Decoded header declares counts that exceed the configured maxima or
    /// a payload that would not fit the segment. The frame is discarded
    /// without copying.
    #[error(
        "malformed frame header: vertex_count={vertex_count}, triangle_count={triangle_count}, \
         capacity={capacity}"
    )]
    MalformedFrame {
        vertex_count: i64,
        triangle_count: i64,
        capacity: usize,
    },

    /// Removing the segment or semaphore during teardown failed. The OS
    /// object may outlive the process; harmless beyond resource leakage.
    #[error("failed to remove {resource} during teardown")]
    Teardown {
        resource: &'static str,
        #[source]
        source: io::Error,
    },

    /// Producer-side count validation failed; nothing was written.
    #[error("frame exceeds configured limits: {count} {kind} > {max}")]
    CapacityExceeded {
        kind: &'static str,
        count: usize,
        max: usize,
    },
}
