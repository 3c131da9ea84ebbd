//! In-memory model of the single-slot mailbox.
//!
//! Replicates the transport's slot semantics without shared memory:
//! a publish overwrites the slot, a poll drains and zero-fills it. The
//! model tracks what a correct consumer must observe:
//!
//! - A poll returns the most recent publish since the previous poll, or
//!   nothing
//! - A second poll with no intervening publish returns nothing
//!   (post-read clearing)
//! - Sequence numbers handed out are strictly increasing
//! - Overwritten frames are never observed

/// What the producer puts in the slot (payload reduced to its counts; the
/// byte-level codec is fuzzed separately against the real implementation).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotFrame {
    pub seq: u64,
    pub capture_time: f64,
    pub vertex_count: u32,
    pub triangle_count: u32,
}

pub struct MailboxModel {
    slot: Option<SlotFrame>,
    next_seq: u64,
    /// Sequence of the last frame the consumer saw.
    last_polled_seq: u64,
    /// Sequence of the most recent publish, drained or not.
    last_published_seq: u64,
}

impl Default for MailboxModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxModel {
    pub fn new() -> Self {
        Self {
            slot: None,
            next_seq: 1,
            last_polled_seq: 0,
            last_published_seq: 0,
        }
    }

    /// Producer writes the slot, silently replacing an unconsumed frame.
    pub fn publish(&mut self, capture_time: f64, vertex_count: u32, triangle_count: u32) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slot = Some(SlotFrame {
            seq,
            capture_time,
            vertex_count,
            triangle_count,
        });
        self.last_published_seq = seq;
        seq
    }

    /// Consumer drains the slot; empty frames are skipped like the real
    /// reader skips zero-geometry frames.
    pub fn poll(&mut self) -> Option<SlotFrame> {
        let frame = self.slot.take()?;
        if frame.vertex_count == 0 || frame.triangle_count == 0 {
            return None;
        }
        self.last_polled_seq = frame.seq;
        Some(frame)
    }

    pub fn last_polled_seq(&self) -> u64 {
        self.last_polled_seq
    }

    pub fn last_published_seq(&self) -> u64 {
        self.last_published_seq
    }

    pub fn slot_occupied(&self) -> bool {
        self.slot.is_some()
    }
}

/// Operations the fuzzer drives.
#[derive(Clone, Copy, Debug)]
pub enum MailboxOp {
    Publish {
        vertex_count: u16,
        triangle_count: u16,
    },
    Poll,
}

/// Execute a sequence of operations and verify the mailbox invariants.
pub fn execute_and_verify(ops: &[MailboxOp]) -> Result<(), String> {
    let mut model = MailboxModel::new();
    let mut last_seen_seq = 0u64;
    let mut published_since_poll: Option<SlotFrame> = None;

    for (i, op) in ops.iter().enumerate() {
        match *op {
            MailboxOp::Publish {
                vertex_count,
                triangle_count,
            } => {
                let seq = model.publish(i as f64, vertex_count as u32, triangle_count as u32);
                if seq <= last_seen_seq {
                    return Err(format!(
                        "op {}: published seq {} not above last drained {}",
                        i, seq, last_seen_seq
                    ));
                }
                published_since_poll = Some(SlotFrame {
                    seq,
                    capture_time: i as f64,
                    vertex_count: vertex_count as u32,
                    triangle_count: triangle_count as u32,
                });
            }
            MailboxOp::Poll => {
                let polled = model.poll();
                match (&polled, &published_since_poll) {
                    (Some(got), Some(expected)) => {
                        // Latest-wins: the poll must see exactly the most
                        // recent publish, never an overwritten one.
                        if got != expected {
                            return Err(format!(
                                "op {}: polled {:?} but latest publish was {:?}",
                                i, got, expected
                            ));
                        }
                        last_seen_seq = got.seq;
                    }
                    (Some(got), None) => {
                        return Err(format!(
                            "op {}: polled {:?} with nothing published since last poll",
                            i, got
                        ));
                    }
                    (None, Some(expected)) => {
                        // Legal only when the pending frame was empty.
                        if expected.vertex_count != 0 && expected.triangle_count != 0 {
                            return Err(format!(
                                "op {}: lost non-empty frame {:?}",
                                i, expected
                            ));
                        }
                    }
                    (None, None) => {}
                }
                // Post-read clearing: the slot is empty afterwards.
                if model.slot_occupied() {
                    return Err(format!("op {}: slot still occupied after poll", i));
                }
                published_since_poll = None;
            }
        }
    }

    Ok(())
}
