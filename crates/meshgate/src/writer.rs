//! Producer side: serialize one frame into the segment under the gate.

use crate::error::IpcError;
use crate::frame::{Triangle, Vertex};
use crate::gate::MutexGate;
use crate::layout::{self, FrameLimits};
use crate::segment::ShmSegment;
use crate::unix_now;

/// Producer endpoint.
///
/// Publishing overwrites whatever is in the slot; if the consumer has not
/// drained the previous frame yet, it is silently replaced (no
/// backpressure). Each publish carries a sequence number one greater than
/// the last.
pub struct MeshWriter {
    segment: ShmSegment,
    gate: MutexGate,
    limits: FrameLimits,
    next_seq: u64,
}

impl MeshWriter {
    /// Attach (or create) the transport for `key`.
    ///
    /// The segment is sized from `limits`, so the worst-case frame always
    /// fits. Both sides must pass the same limits.
    pub fn open(key: libc::key_t, limits: FrameLimits) -> Result<Self, IpcError> {
        let (segment, gate) = crate::channel::open_channel(key, limits.required_capacity())?;
        Ok(Self {
            segment,
            gate,
            limits,
            next_seq: 1,
        })
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Publish one frame stamped with `capture_time`, returning its
    /// sequence number.
    ///
    /// Counts are validated against the limits before the gate is taken;
    /// an oversized mesh is rejected without touching shared state.
    pub fn publish(
        &mut self,
        capture_time: f64,
        vertices: &[Vertex],
        triangles: &[Triangle],
    ) -> Result<u64, IpcError> {
        if vertices.len() > self.limits.max_vertices {
            return Err(IpcError::CapacityExceeded {
                kind: "vertices",
                count: vertices.len(),
                max: self.limits.max_vertices,
            });
        }
        if triangles.len() > self.limits.max_triangles {
            return Err(IpcError::CapacityExceeded {
                kind: "triangles",
                count: triangles.len(),
                max: self.limits.max_triangles,
            });
        }

        let seq = self.next_seq;

        let guard = self.gate.lock()?;
        let written = layout::encode_frame(
            self.segment.as_mut_slice(),
            seq,
            capture_time,
            vertices,
            triangles,
            &self.limits,
        )?;
        guard.unlock()?;

        self.next_seq += 1;
        tracing::debug!(
            seq,
            vertex_count = vertices.len(),
            triangle_count = triangles.len(),
            written,
            "published mesh frame"
        );
        Ok(seq)
    }

    /// Publish one frame stamped with the current time.
    pub fn publish_now(
        &mut self,
        vertices: &[Vertex],
        triangles: &[Triangle],
    ) -> Result<u64, IpcError> {
        self.publish(unix_now(), vertices, triangles)
    }
}
