//! Consumer side: drain the slot once per host tick.

use std::time::Duration;

use parking_lot::Mutex;

use crate::error::IpcError;
use crate::frame::MeshFrame;
use crate::gate::MutexGate;
use crate::layout::{self, FrameLimits};
use crate::segment::ShmSegment;
use crate::unix_now;

/// How long a poll waits for the gate before giving up for this tick.
///
/// A bounded wait keeps a crashed producer from wedging the host's update
/// loop forever; the poll simply reports a timeout and runs again next
/// tick.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// One successfully drained frame plus its end-to-end latency.
#[derive(Clone, Debug)]
pub struct PolledFrame {
    pub frame: MeshFrame,
    /// `now - capture_time` at the moment of the poll, in seconds.
    /// Diagnostic only; correctness never gates on it.
    pub latency: f64,
}

struct ReaderInner {
    segment: ShmSegment,
    gate: MutexGate,
    /// Sequence of the last frame handed out. The zero-fill after each
    /// decode is what marks the slot consumed; this only detects sequence
    /// regressions (producer restarts) for diagnostics.
    last_seq: u64,
}

/// Consumer endpoint.
///
/// [`poll`](Self::poll) takes `&self` so it can be called from a host tick
/// callback without threading a mutable borrow through the scheduler; the
/// handle itself still assumes a single in-process consumer.
pub struct MeshReader {
    inner: Mutex<ReaderInner>,
    limits: FrameLimits,
    lock_timeout: Duration,
}

impl MeshReader {
    /// Attach (or create) the transport for `key`.
    pub fn open(key: libc::key_t, limits: FrameLimits) -> Result<Self, IpcError> {
        let (segment, gate) = crate::channel::open_channel(key, limits.required_capacity())?;
        Ok(Self {
            inner: Mutex::new(ReaderInner {
                segment,
                gate,
                last_seq: 0,
            }),
            limits,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Override the per-poll gate wait.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Drain the slot.
    ///
    /// Acquires the gate (bounded wait), decodes the current contents,
    /// zero-fills the segment, releases the gate. Returns `Ok(None)` when
    /// the slot is empty or stale; `Ok(Some(_))` hands out the frame with
    /// its capture-to-consume latency.
    ///
    /// A malformed header is discarded (the slot is zeroed so the garbage
    /// is not re-read next tick) and surfaced as an error; the tick simply
    /// has no mesh update.
    pub fn poll(&self) -> Result<Option<PolledFrame>, IpcError> {
        let mut inner = self.inner.lock();
        let ReaderInner {
            segment,
            gate,
            last_seq,
        } = &mut *inner;

        let guard = gate.lock_timeout(self.lock_timeout)?;
        let decoded = layout::decode_frame(segment.as_slice(), &self.limits);
        segment.zero();
        guard.unlock()?;

        let frame = match decoded {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "discarded malformed frame");
                return Err(e);
            }
        };

        if frame.seq == 0 || frame.is_empty() {
            return Ok(None);
        }
        if frame.seq <= *last_seq {
            tracing::warn!(
                seq = frame.seq,
                last_seq = *last_seq,
                "sequence went backwards; producer likely restarted"
            );
        }
        *last_seq = frame.seq;

        let latency = unix_now() - frame.capture_time;
        tracing::debug!(
            seq = frame.seq,
            vertex_count = frame.vertices.len(),
            triangle_count = frame.triangles.len(),
            latency_s = latency,
            "drained mesh frame"
        );

        Ok(Some(PolledFrame { frame, latency }))
    }

    /// Tear the transport down: remove the semaphore and the backing
    /// region. The consumer owns teardown; call exactly once, at shutdown.
    pub fn close(self) -> Result<(), IpcError> {
        let inner = self.inner.into_inner();
        let gate_result = inner.gate.destroy();
        let seg_result = inner.segment.remove();
        gate_result.and(seg_result)
    }
}
