//! Fixed binary layout for one mesh frame.
//!
//! The segment holds at most one frame at a time, written and read in a
//! fixed field order with no padding and no checksum. All scalars are
//! little-endian:
//!
//! ```text
//! offset  0 : seq            u64   publish counter, 0 = empty slot
//! offset  8 : capture_time   f64   Unix seconds, fractional
//! offset 16 : vertex_count   i32
//! offset 20 : triangle_count i32
//! offset 24 : vertex records    vertex_count × 12 bytes (f32 x,y,z)
//! offset 24 + vertex_count×12 : triangle records
//!                               triangle_count × 12 bytes (i32 a,b,c)
//! ```
//!
//! The decoder trusts nothing: header-declared counts are validated against
//! the configured maxima and the buffer length *before* any payload copy.
//! A header that fails validation yields [`IpcError::MalformedFrame`] and
//! no bytes are copied.

use crate::error::IpcError;
use crate::frame::{MeshFrame, Triangle, Vertex};

/// Byte offsets of the header fields.
pub const SEQ_OFFSET: usize = 0;
pub const CAPTURE_TIME_OFFSET: usize = 8;
pub const VERTEX_COUNT_OFFSET: usize = 16;
pub const TRIANGLE_COUNT_OFFSET: usize = 20;

/// Total header size preceding the payload arrays.
pub const HEADER_BYTES: usize = 24;

/// Size of one vertex or triangle record.
pub const RECORD_BYTES: usize = 12;

/// Configured element maxima for one transport.
///
/// The segment capacity is derived from these at construction
/// ([`FrameLimits::required_capacity`]), so the worst-case frame always
/// fits. Both processes must agree on the limits out-of-band, like the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_vertices: usize,
    pub max_triangles: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_vertices: 500_000,
            max_triangles: 500_000,
        }
    }
}

impl FrameLimits {
    /// Smallest segment capacity that can hold the worst-case frame.
    pub fn required_capacity(&self) -> usize {
        HEADER_BYTES + (self.max_vertices + self.max_triangles) * RECORD_BYTES
    }

    /// Encoded size of a frame with the given counts.
    pub fn encoded_len(vertex_count: usize, triangle_count: usize) -> usize {
        HEADER_BYTES + (vertex_count + triangle_count) * RECORD_BYTES
    }
}

/// Encode one frame into `buf`, returning the number of bytes written.
///
/// Counts are checked against `limits` and the encoded length against
/// `buf.len()` before anything is written. Must be called only while the
/// gate protecting `buf` is held.
pub fn encode_frame(
    buf: &mut [u8],
    seq: u64,
    capture_time: f64,
    vertices: &[Vertex],
    triangles: &[Triangle],
    limits: &FrameLimits,
) -> Result<usize, IpcError> {
    if vertices.len() > limits.max_vertices {
        return Err(IpcError::CapacityExceeded {
            kind: "vertices",
            count: vertices.len(),
            max: limits.max_vertices,
        });
    }
    if triangles.len() > limits.max_triangles {
        return Err(IpcError::CapacityExceeded {
            kind: "triangles",
            count: triangles.len(),
            max: limits.max_triangles,
        });
    }

    let total = FrameLimits::encoded_len(vertices.len(), triangles.len());
    if total > buf.len() {
        return Err(IpcError::CapacityExceeded {
            kind: "bytes",
            count: total,
            max: buf.len(),
        });
    }

    buf[SEQ_OFFSET..SEQ_OFFSET + 8].copy_from_slice(&seq.to_le_bytes());
    buf[CAPTURE_TIME_OFFSET..CAPTURE_TIME_OFFSET + 8]
        .copy_from_slice(&capture_time.to_le_bytes());
    buf[VERTEX_COUNT_OFFSET..VERTEX_COUNT_OFFSET + 4]
        .copy_from_slice(&(vertices.len() as i32).to_le_bytes());
    buf[TRIANGLE_COUNT_OFFSET..TRIANGLE_COUNT_OFFSET + 4]
        .copy_from_slice(&(triangles.len() as i32).to_le_bytes());

    let vert_end = HEADER_BYTES + vertices.len() * RECORD_BYTES;
    buf[HEADER_BYTES..vert_end].copy_from_slice(bytemuck::cast_slice(vertices));
    buf[vert_end..total].copy_from_slice(bytemuck::cast_slice(triangles));

    Ok(total)
}

/// Decode the frame currently in `buf`.
///
/// Must be called only while the gate protecting `buf` is held. A zeroed
/// buffer decodes to an empty frame with `seq == 0`; the caller decides
/// whether that means "no new frame" or "never written".
pub fn decode_frame(buf: &[u8], limits: &FrameLimits) -> Result<MeshFrame, IpcError> {
    if buf.len() < HEADER_BYTES {
        return Err(IpcError::MalformedFrame {
            vertex_count: 0,
            triangle_count: 0,
            capacity: buf.len(),
        });
    }

    let seq = u64::from_le_bytes(buf[SEQ_OFFSET..SEQ_OFFSET + 8].try_into().unwrap());
    let capture_time = f64::from_le_bytes(
        buf[CAPTURE_TIME_OFFSET..CAPTURE_TIME_OFFSET + 8]
            .try_into()
            .unwrap(),
    );
    let vertex_count = i32::from_le_bytes(
        buf[VERTEX_COUNT_OFFSET..VERTEX_COUNT_OFFSET + 4]
            .try_into()
            .unwrap(),
    );
    let triangle_count = i32::from_le_bytes(
        buf[TRIANGLE_COUNT_OFFSET..TRIANGLE_COUNT_OFFSET + 4]
            .try_into()
            .unwrap(),
    );

    let malformed = || IpcError::MalformedFrame {
        vertex_count: vertex_count as i64,
        triangle_count: triangle_count as i64,
        capacity: buf.len(),
    };

    if vertex_count < 0 || triangle_count < 0 {
        return Err(malformed());
    }
    let vertex_count = vertex_count as usize;
    let triangle_count = triangle_count as usize;
    if vertex_count > limits.max_vertices || triangle_count > limits.max_triangles {
        return Err(malformed());
    }
    let total = FrameLimits::encoded_len(vertex_count, triangle_count);
    if total > buf.len() {
        return Err(malformed());
    }

    // Copy out via byte views; the shared mapping has no alignment
    // guarantee at the record offsets.
    let mut vertices = vec![Vertex::default(); vertex_count];
    let mut triangles = vec![Triangle::default(); triangle_count];

    let vert_end = HEADER_BYTES + vertex_count * RECORD_BYTES;
    bytemuck::cast_slice_mut::<Vertex, u8>(&mut vertices)
        .copy_from_slice(&buf[HEADER_BYTES..vert_end]);
    bytemuck::cast_slice_mut::<Triangle, u8>(&mut triangles)
        .copy_from_slice(&buf[vert_end..total]);

    Ok(MeshFrame {
        seq,
        capture_time,
        vertices,
        triangles,
    })
}
