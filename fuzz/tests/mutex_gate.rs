//! Bolero fuzzer for the binary semaphore gate model.
//!
//! Properties tested:
//! - At most one actor in the critical section under any interleaving
//! - Semaphore value stays binary
//! - Available implies no holder and no waiters
//! - Unlock hands off to exactly one waiter

use bolero::check;
use meshgate_fuzz::gate_model::{execute_and_verify, GateOp, MAX_ACTORS};

fn main() {
    check!()
        .with_type::<(u8, Vec<(bool, u8)>)>()
        .for_each(|(actor_byte, ops_data)| {
            let actor_count = (*actor_byte as usize % MAX_ACTORS) + 1;

            let ops: Vec<GateOp> = ops_data
                .iter()
                .map(|(is_lock, actor)| {
                    if *is_lock {
                        GateOp::Lock(*actor)
                    } else {
                        GateOp::Unlock(*actor)
                    }
                })
                .collect();

            // Run and verify - panics are caught by bolero
            if let Err(e) = execute_and_verify(actor_count, &ops) {
                panic!("Invariant violated: {}", e);
            }
        });
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]
    use meshgate_fuzz::gate_model::{execute_and_verify, GateOp};

    #[test]
    fn fuzz_gate_basic() {
        let ops = vec![
            GateOp::Lock(0),
            GateOp::Lock(1),
            GateOp::Unlock(0),
            GateOp::Unlock(1),
            GateOp::Lock(1),
            GateOp::Unlock(1),
        ];
        execute_and_verify(2, &ops).unwrap();
    }

    #[test]
    fn fuzz_gate_pathological_unlocks() {
        // Unlocks from actors that never locked must not free the gate.
        let ops = vec![
            GateOp::Lock(0),
            GateOp::Unlock(1),
            GateOp::Unlock(2),
            GateOp::Lock(1),
            GateOp::Unlock(0),
            GateOp::Unlock(1),
        ];
        execute_and_verify(3, &ops).unwrap();
    }

    #[test]
    fn fuzz_gate_long_contention() {
        let mut ops = Vec::new();
        for i in 0..500u8 {
            ops.push(GateOp::Lock(i % 4));
            if i % 5 != 0 {
                ops.push(GateOp::Unlock(i % 4));
            }
        }
        execute_and_verify(4, &ops).unwrap();
    }
}
