//! Minimal producer/consumer demo on one key.
//!
//! A background thread publishes a deforming triangle at ~60 Hz; the main
//! thread polls like a host tick hook and prints each drained frame with
//! its capture-to-consume latency.
//!
//! Run with: `cargo run --example bounce -p meshgate`

use std::time::Duration;

use meshgate::{FrameLimits, MeshReader, MeshWriter, Triangle, Vertex};

const KEY: libc::key_t = 1000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshgate=info".into()),
        )
        .init();

    let limits = FrameLimits {
        max_vertices: 1024,
        max_triangles: 1024,
    };

    let reader = MeshReader::open(KEY, limits)?;

    let producer = std::thread::spawn(move || {
        let mut writer = MeshWriter::open(KEY, limits).expect("producer attach");
        let triangles = [Triangle::new(0, 1, 2)];
        for i in 0..120u32 {
            let t = i as f32 / 120.0;
            let vertices = [
                Vertex::new(0.0, 0.0, 0.0),
                Vertex::new(1.0, 0.0, 0.0),
                Vertex::new(0.0, 1.0 + t.sin(), 0.0),
            ];
            if let Err(e) = writer.publish_now(&vertices, &triangles) {
                eprintln!("publish failed: {e}");
            }
            std::thread::sleep(Duration::from_millis(16));
        }
    });

    // Poll like a per-frame update hook.
    for _tick in 0..150 {
        match reader.poll() {
            Ok(Some(polled)) => {
                println!(
                    "seq {:>3}  {} verts / {} tris  latency {:.3} ms",
                    polled.frame.seq,
                    polled.frame.vertices.len(),
                    polled.frame.triangles.len(),
                    polled.latency * 1e3,
                );
            }
            Ok(None) => {}
            Err(e) => eprintln!("poll failed: {e}"),
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    producer.join().unwrap();
    reader.close()?;
    Ok(())
}
