//! meshgate: single-slot shared-memory transport for time-stamped triangle meshes.
//!
//! One process (the producer, typically a capture pipeline) publishes mesh
//! frames into a fixed-capacity System V shared memory segment; a second
//! process (the consumer, typically a per-tick hook inside a host
//! application) drains the segment and measures capture-to-consume latency.
//! Mutual exclusion is a single binary semaphore bound to the same key as
//! the segment.
//!
//! # Characteristics
//!
//! - Single-slot mailbox: the segment holds at most one frame; a new publish
//!   overwrites an unconsumed one (no backpressure, no queueing)
//! - Fixed little-endian layout with a monotonically increasing sequence
//!   field so the consumer can tell a fresh frame from a stale one
//! - The consumer zero-fills the segment after every decode, so an empty
//!   slot always reads back as an empty frame
//! - Capacity is derived from the configured element maxima, never a fixed
//!   round number
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Frame header (24 bytes: seq, capture_time, counts)          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Vertex records (vertex_count × 12 bytes, f32 x,y,z)         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Triangle records (triangle_count × 12 bytes, i32 a,b,c)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! // Producer process
//! let mut writer = MeshWriter::open(1000, FrameLimits::default())?;
//! writer.publish_now(&vertices, &triangles)?;
//!
//! // Consumer process (per-tick hook)
//! let reader = MeshReader::open(1000, FrameLimits::default())?;
//! if let Some(polled) = reader.poll()? {
//!     mesh_updater.apply(polled.frame.vertices(), polled.frame.face_counts(), polled.frame.indices());
//! }
//! ```
//!
//! Both sides may start in either order: whichever attaches first creates
//! the segment and the semaphore; the other attaches the existing objects.
//! The consumer owns teardown via [`MeshReader::close`].

#![forbid(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod frame;
pub mod layout;

mod channel;
mod gate;
mod reader;
mod segment;
mod writer;

pub use error::IpcError;
pub use frame::{MeshFrame, Triangle, Vertex};
pub use gate::{GateGuard, MutexGate};
pub use layout::{FrameLimits, HEADER_BYTES, RECORD_BYTES};
pub use reader::{MeshReader, PolledFrame};
pub use segment::ShmSegment;
pub use writer::MeshWriter;

/// Current time as fractional Unix seconds.
///
/// Producers stamp frames with this at capture; consumers subtract the
/// stamped value from it to compute end-to-end latency.
pub fn unix_now() -> f64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        // Clock before the epoch; report zero rather than panic.
        Err(_) => 0.0,
    }
}
