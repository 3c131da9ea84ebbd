//! Fuzzing harnesses for the meshgate transport.
//!
//! The gate and mailbox fuzzers operate on in-memory replicas of the
//! semaphore and single-slot semantics, without touching real System V
//! objects, to test invariants under arbitrary interleavings. The codec
//! fuzzer drives the real frame decoder with arbitrary bytes.

pub mod gate_model;
pub mod mailbox_model;
