//! End-to-end tests across two independently opened handles.
//!
//! Producer and consumer live in separate processes in production; here
//! each side opens its own handles on a shared key, which exercises the
//! same get-or-create, locking, and codec paths.

use std::time::Duration;

use meshgate::{unix_now, FrameLimits, IpcError, MeshReader, MeshWriter, Triangle, Vertex};

const SMALL: FrameLimits = FrameLimits {
    max_vertices: 1024,
    max_triangles: 1024,
};

fn test_key(salt: i32) -> libc::key_t {
    // Pid-derived so parallel test runs don't collide on the global SysV
    // namespace.
    ((std::process::id() as i32 & 0x7FFF) << 8) | (salt & 0xFF)
}

fn unit_triangle() -> (Vec<Vertex>, Vec<Triangle>) {
    (
        vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ],
        vec![Triangle::new(0, 1, 2)],
    )
}

#[test]
fn capture_to_consume_scenario() {
    let key = test_key(0x30);
    let reader = MeshReader::open(key, SMALL).unwrap();
    let mut writer = MeshWriter::open(key, SMALL).unwrap();

    let (verts, tris) = unit_triangle();
    writer.publish(1000.0, &verts, &tris).unwrap();

    let polled = reader.poll().unwrap().expect("first poll sees the frame");
    assert_eq!(polled.frame.vertices.len(), 3);
    assert_eq!(polled.frame.triangles.len(), 1);
    assert_eq!(polled.frame.capture_time, 1000.0);
    assert_eq!(polled.frame.vertices, verts);
    assert_eq!(polled.frame.triangles, tris);
    // Latency is measured against the stamped capture time.
    assert!((polled.latency - (unix_now() - 1000.0)).abs() < 1.0);

    // Post-read clearing: nothing new on the second poll.
    assert!(reader.poll().unwrap().is_none());

    drop(writer);
    reader.close().unwrap();
}

#[test]
fn overwrite_keeps_only_the_latest_frame() {
    let key = test_key(0x31);
    let reader = MeshReader::open(key, SMALL).unwrap();
    let mut writer = MeshWriter::open(key, SMALL).unwrap();

    let (verts, tris) = unit_triangle();
    writer.publish(1.0, &verts, &tris).unwrap();
    writer.publish(2.0, &verts, &tris).unwrap();

    // Single slot, no queueing: the first frame is gone.
    let polled = reader.poll().unwrap().unwrap();
    assert_eq!(polled.frame.capture_time, 2.0);
    assert_eq!(polled.frame.seq, 2);
    assert!(reader.poll().unwrap().is_none());

    drop(writer);
    reader.close().unwrap();
}

#[test]
fn empty_frame_is_skipped() {
    let key = test_key(0x32);
    let reader = MeshReader::open(key, SMALL).unwrap();
    let mut writer = MeshWriter::open(key, SMALL).unwrap();

    // A publish with zero geometry is a no-op for the consumer.
    writer.publish(5.0, &[], &[]).unwrap();
    assert!(reader.poll().unwrap().is_none());

    drop(writer);
    reader.close().unwrap();
}

#[test]
fn oversized_mesh_is_rejected_without_writing() {
    let key = test_key(0x33);
    let reader = MeshReader::open(key, SMALL).unwrap();
    let mut writer = MeshWriter::open(key, SMALL).unwrap();

    let verts = vec![Vertex::default(); SMALL.max_vertices + 1];
    let err = writer.publish(1.0, &verts, &[]).unwrap_err();
    assert!(matches!(err, IpcError::CapacityExceeded { kind: "vertices", .. }));

    // Nothing reached the slot.
    assert!(reader.poll().unwrap().is_none());

    drop(writer);
    reader.close().unwrap();
}

#[test]
fn boundary_counts_round_trip() {
    let key = test_key(0x34);
    let reader = MeshReader::open(key, SMALL).unwrap();
    let mut writer = MeshWriter::open(key, SMALL).unwrap();

    let verts = vec![Vertex::new(1.5, -2.5, 3.5); SMALL.max_vertices];
    let tris = vec![Triangle::new(7, 8, 9); SMALL.max_triangles];
    writer.publish(42.0, &verts, &tris).unwrap();

    let polled = reader.poll().unwrap().unwrap();
    assert_eq!(polled.frame.vertices.len(), SMALL.max_vertices);
    assert_eq!(polled.frame.triangles.len(), SMALL.max_triangles);
    assert_eq!(polled.frame.vertices[SMALL.max_vertices - 1], verts[0]);
    assert_eq!(polled.frame.triangles[SMALL.max_triangles - 1], tris[0]);

    drop(writer);
    reader.close().unwrap();
}

#[test]
fn concurrent_producer_and_consumer() {
    let key = test_key(0x35);
    let reader = MeshReader::open(key, SMALL).unwrap();

    let producer = std::thread::spawn(move || {
        let mut writer = MeshWriter::open(key, SMALL).unwrap();
        let (verts, tris) = unit_triangle();
        for _ in 0..50 {
            writer.publish_now(&verts, &tris).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
    });

    let mut drained = 0u32;
    let mut last_seq = 0u64;
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while drained < 10 && std::time::Instant::now() < deadline {
        if let Some(polled) = reader.poll().unwrap() {
            // Sequences move forward even when overwrites skip some.
            assert!(polled.frame.seq > last_seq);
            last_seq = polled.frame.seq;
            assert_eq!(polled.frame.vertices.len(), 3);
            // A sane latency: stamped no later than now.
            assert!(polled.latency >= 0.0);
            drained += 1;
        }
    }
    producer.join().unwrap();
    assert!(drained >= 10, "consumer drained only {drained} frames");

    reader.close().unwrap();
}
