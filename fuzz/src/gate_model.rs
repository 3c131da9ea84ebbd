//! In-memory model of the binary semaphore gate.
//!
//! Models the MutexGate protocol for property-based testing: a semaphore
//! with exactly two states and a set of actors that lock and unlock it in
//! arbitrary order. Invariants checked after every step:
//!
//! - At most one actor is ever inside the critical section
//! - The semaphore value is 0 or 1, never anything else
//! - Value 1 implies no holder and no waiters
//! - Unlock with waiters hands the gate directly to exactly one of them

use std::collections::VecDeque;

/// Number of simulated actors (two processes is the production shape, but
/// the protocol must hold for any count).
pub const MAX_ACTORS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorState {
    Idle,
    Waiting,
    InCritical,
}

/// A model of the gate plus every actor that can touch it.
pub struct GateModel {
    /// Semaphore value: 1 = available, 0 = held.
    value: u8,
    actors: Vec<ActorState>,
    /// FIFO of actors blocked in lock(). The OS makes no ordering promise,
    /// but FIFO is one legal schedule and keeps the model deterministic.
    waiters: VecDeque<usize>,
}

impl GateModel {
    pub fn new(actor_count: usize) -> Self {
        let actor_count = actor_count.clamp(1, MAX_ACTORS);
        Self {
            value: 1,
            actors: vec![ActorState::Idle; actor_count],
            waiters: VecDeque::new(),
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn state(&self, actor: usize) -> ActorState {
        self.actors[actor]
    }

    pub fn holder(&self) -> Option<usize> {
        self.actors
            .iter()
            .position(|&s| s == ActorState::InCritical)
    }

    /// Actor attempts to lock. Takes the gate if available, otherwise
    /// blocks (joins the wait queue). A no-op for an actor that already
    /// holds or waits (re-entry is a caller bug the OS would deadlock on;
    /// the model just ignores it).
    pub fn lock(&mut self, actor: usize) {
        if self.actors[actor] != ActorState::Idle {
            return;
        }
        if self.value == 1 {
            self.value = 0;
            self.actors[actor] = ActorState::InCritical;
        } else {
            self.actors[actor] = ActorState::Waiting;
            self.waiters.push_back(actor);
        }
    }

    /// Actor releases the gate. If anyone is blocked, the gate transfers
    /// to exactly one waiter without ever becoming observable as
    /// available. A no-op for an actor that is not the holder.
    pub fn unlock(&mut self, actor: usize) {
        if self.actors[actor] != ActorState::InCritical {
            return;
        }
        self.actors[actor] = ActorState::Idle;
        if let Some(next) = self.waiters.pop_front() {
            self.actors[next] = ActorState::InCritical;
        } else {
            self.value = 1;
        }
    }
}

/// Operations the fuzzer drives.
#[derive(Clone, Copy, Debug)]
pub enum GateOp {
    Lock(u8),
    Unlock(u8),
}

/// Execute a sequence of operations and verify the gate invariants after
/// every step.
pub fn execute_and_verify(actor_count: usize, ops: &[GateOp]) -> Result<(), String> {
    let mut model = GateModel::new(actor_count);

    for (i, op) in ops.iter().enumerate() {
        match *op {
            GateOp::Lock(a) => model.lock(a as usize % model.actor_count()),
            GateOp::Unlock(a) => model.unlock(a as usize % model.actor_count()),
        }
        verify_gate_invariants(&model, i)?;
    }

    Ok(())
}

fn verify_gate_invariants(model: &GateModel, op_idx: usize) -> Result<(), String> {
    // INVARIANT: the semaphore is strictly binary.
    if model.value > 1 {
        return Err(format!("after op {}: semaphore value {} > 1", op_idx, model.value));
    }

    // INVARIANT: at most one actor in the critical section.
    let holders = (0..model.actor_count())
        .filter(|&a| model.state(a) == ActorState::InCritical)
        .count();
    if holders > 1 {
        return Err(format!("after op {}: {} actors in critical section", op_idx, holders));
    }

    // INVARIANT: available implies nobody holds and nobody waits.
    if model.value == 1 {
        if holders != 0 {
            return Err(format!("after op {}: available but {} holders", op_idx, holders));
        }
        let waiting = (0..model.actor_count())
            .filter(|&a| model.state(a) == ActorState::Waiting)
            .count();
        if waiting != 0 {
            return Err(format!("after op {}: available but {} waiters", op_idx, waiting));
        }
    }

    // INVARIANT: held implies somebody holds (no lost gate).
    if model.value == 0 && holders == 0 {
        return Err(format!("after op {}: held with no holder", op_idx));
    }

    Ok(())
}
