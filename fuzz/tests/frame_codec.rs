//! Bolero fuzzer for the real frame codec.
//!
//! Unlike the gate and mailbox fuzzers this one drives the production
//! decoder directly: arbitrary bytes must never panic, over-read, or yield
//! a frame whose counts escape the configured limits.

use bolero::check;
use meshgate::layout::{decode_frame, FrameLimits};

const LIMITS: FrameLimits = FrameLimits {
    max_vertices: 64,
    max_triangles: 64,
};

fn main() {
    check!().with_type::<Vec<u8>>().for_each(|bytes| {
        match decode_frame(bytes, &LIMITS) {
            Ok(frame) => {
                // Whatever the header claimed, the decoded frame must fit
                // the limits it was validated against.
                assert!(frame.vertices.len() <= LIMITS.max_vertices);
                assert!(frame.triangles.len() <= LIMITS.max_triangles);
            }
            Err(_) => {
                // Rejection is always acceptable; panicking is not.
            }
        }
    });
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]
    use meshgate::layout::{decode_frame, encode_frame, FrameLimits, HEADER_BYTES};
    use meshgate::{Triangle, Vertex};

    const LIMITS: FrameLimits = FrameLimits {
        max_vertices: 64,
        max_triangles: 64,
    };

    #[test]
    fn fuzz_codec_round_trip_spot_checks() {
        let mut buf = vec![0u8; LIMITS.required_capacity()];
        for n in [0usize, 1, 7, 64] {
            let verts = vec![Vertex::new(n as f32, -1.0, 0.5); n];
            let tris = vec![Triangle::new(0, n as i32, -3); n.min(LIMITS.max_triangles)];
            encode_frame(&mut buf, n as u64 + 1, n as f64, &verts, &tris, &LIMITS).unwrap();

            let frame = decode_frame(&buf, &LIMITS).unwrap();
            assert_eq!(frame.vertices, verts);
            assert_eq!(frame.triangles, tris);
        }
    }

    #[test]
    fn fuzz_codec_garbage_headers_rejected() {
        // All-ones header: counts decode as -1.
        let buf = vec![0xFFu8; LIMITS.required_capacity()];
        assert!(decode_frame(&buf, &LIMITS).is_err());
    }

    #[test]
    fn fuzz_codec_short_buffers_never_panic() {
        for len in 0..HEADER_BYTES + 16 {
            let buf = vec![0x5Au8; len];
            let _ = decode_frame(&buf, &LIMITS);
        }
    }
}
