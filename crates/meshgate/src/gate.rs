//! Binary semaphore guarding the segment.
//!
//! This is a mutual-exclusion lock, not a producer/consumer signal: holding
//! the gate means "safe to touch the segment bytes now", it does not mean
//! "new data is available". Freshness comes from the sequence field in the
//! frame header.
//!
//! The semaphore has exactly two states, available (1) and held (0), and at
//! most one unit outstanding. Every successful [`MutexGate::lock`] is paired
//! with exactly one release; [`GateGuard`] enforces that on all exit paths,
//! including decode errors.

use std::io;
use std::time::{Duration, Instant};

use crate::error::IpcError;

const ALLOC_RETRIES: u32 = 1;
const ALLOC_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Poll interval for the bounded-wait lock. System V semaphores have no
/// portable timed wait, so `lock_timeout` spins on IPC_NOWAIT.
const TIMED_LOCK_POLL: Duration = Duration::from_millis(1);

/// A binary semaphore bound to the same key as the segment it guards.
#[derive(Debug)]
pub struct MutexGate {
    key: libc::key_t,
    semid: libc::c_int,
    created: bool,
}

impl MutexGate {
    /// Get-or-create the semaphore for `key`.
    ///
    /// The creator initializes it to available; a second caller attaches
    /// the existing semaphore without touching its value, so an in-flight
    /// critical section on the other side is never stomped.
    pub fn open(key: libc::key_t) -> Result<Self, IpcError> {
        let (semid, created) = get_or_create(key)?;

        if created {
            // SAFETY: semid is valid; SETVAL takes an int value argument.
            let rc = unsafe { libc::semctl(semid, 0, libc::SETVAL, 1) };
            if rc == -1 {
                let source = io::Error::last_os_error();
                // SAFETY: semid is valid; IPC_RMID takes no extra argument.
                unsafe { libc::semctl(semid, 0, libc::IPC_RMID) };
                return Err(IpcError::Allocation {
                    resource: "semaphore",
                    retries: 0,
                    source,
                });
            }
        }

        tracing::info!(key, semid, created, "semaphore attached");

        Ok(Self { key, semid, created })
    }

    pub fn key(&self) -> libc::key_t {
        self.key
    }

    /// Whether this handle created (and initialized) the semaphore.
    pub fn is_creator(&self) -> bool {
        self.created
    }

    /// Block until the gate is acquired.
    ///
    /// Blocks indefinitely if the other side died while holding the gate;
    /// prefer [`lock_timeout`](Self::lock_timeout) in polling loops.
    pub fn lock(&self) -> Result<GateGuard<'_>, IpcError> {
        loop {
            match self.sem_op(-1, 0) {
                Ok(()) => return Ok(GateGuard { gate: self }),
                Err(e) if e.raw_os_error() == Some(libc::EINTR) => continue,
                Err(e) => return Err(IpcError::Lock(e)),
            }
        }
    }

    /// Acquire the gate, giving up after `timeout`.
    ///
    /// A timeout is a recoverable condition: the caller skips this tick and
    /// may try again, or invoke [`force_reset`](Self::force_reset) once it
    /// knows the peer is dead.
    pub fn lock_timeout(&self, timeout: Duration) -> Result<GateGuard<'_>, IpcError> {
        let start = Instant::now();
        loop {
            match self.sem_op(-1, libc::IPC_NOWAIT as libc::c_short) {
                Ok(()) => return Ok(GateGuard { gate: self }),
                Err(e)
                    if e.raw_os_error() == Some(libc::EAGAIN)
                        || e.raw_os_error() == Some(libc::EINTR) =>
                {
                    if start.elapsed() >= timeout {
                        return Err(IpcError::LockTimeout {
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    std::thread::sleep(TIMED_LOCK_POLL);
                }
                Err(e) => return Err(IpcError::Lock(e)),
            }
        }
    }

    /// Forcibly reset the gate to available.
    ///
    /// Only sound when the caller knows the holder has exited; under a live
    /// holder this breaks mutual exclusion.
    pub fn force_reset(&self) -> Result<(), IpcError> {
        // SAFETY: semid is valid; SETVAL takes an int value argument.
        let rc = unsafe { libc::semctl(self.semid, 0, libc::SETVAL, 1) };
        if rc == -1 {
            return Err(IpcError::Unlock(io::Error::last_os_error()));
        }
        tracing::warn!(key = self.key, "semaphore forcibly reset to available");
        Ok(())
    }

    /// Remove the OS semaphore object. Called exactly once during teardown,
    /// by the owning side.
    pub fn destroy(self) -> Result<(), IpcError> {
        // SAFETY: semid is valid; IPC_RMID takes no extra argument.
        let rc = unsafe { libc::semctl(self.semid, 0, libc::IPC_RMID) };
        if rc == -1 {
            return Err(IpcError::Teardown {
                resource: "semaphore",
                source: io::Error::last_os_error(),
            });
        }
        tracing::info!(key = self.key, "semaphore removed");
        Ok(())
    }

    /// Current semaphore value (1 = available, 0 = held).
    #[cfg(test)]
    fn value(&self) -> i32 {
        // SAFETY: semid is valid; GETVAL takes no extra argument.
        unsafe { libc::semctl(self.semid, 0, libc::GETVAL) }
    }

    fn sem_op(&self, op: i16, flags: libc::c_short) -> io::Result<()> {
        let mut buf = libc::sembuf {
            sem_num: 0,
            sem_op: op,
            sem_flg: flags,
        };
        // SAFETY: semid is valid and buf points to one initialized sembuf.
        let rc = unsafe { libc::semop(self.semid, &mut buf, 1) };
        if rc == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn release(&self) -> Result<(), IpcError> {
        self.sem_op(1, 0).map_err(IpcError::Unlock)
    }
}

/// RAII guard for a held gate; releases on drop.
///
/// Exactly one release happens per successful lock, whatever path the
/// critical section exits through.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a MutexGate,
}

impl GateGuard<'_> {
    /// Release explicitly, surfacing any OS error.
    ///
    /// Dropping the guard releases too, but swallows the error into a log
    /// line; call this where the caller wants to observe `UnlockError`.
    pub fn unlock(self) -> Result<(), IpcError> {
        let result = self.gate.release();
        std::mem::forget(self);
        result
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.gate.release() {
            // Abandoning the critical section without a release wedges the
            // other side; all we can do from a destructor is say so.
            tracing::warn!(key = self.gate.key, error = %e, "failed to release gate");
        }
    }
}

/// semget with creator detection and bounded retry.
fn get_or_create(key: libc::key_t) -> Result<(libc::c_int, bool), IpcError> {
    let mut attempt = 0;
    loop {
        // SAFETY: plain syscall, no pointers involved.
        let semid = unsafe { libc::semget(key, 1, libc::IPC_CREAT | libc::IPC_EXCL | 0o666) };
        if semid != -1 {
            return Ok((semid, true));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EEXIST) {
            // SAFETY: as above.
            let semid = unsafe { libc::semget(key, 1, 0o666) };
            if semid != -1 {
                return Ok((semid, false));
            }
        }

        if attempt >= ALLOC_RETRIES {
            return Err(IpcError::Allocation {
                resource: "semaphore",
                retries: attempt,
                source: io::Error::last_os_error(),
            });
        }
        attempt += 1;
        tracing::warn!(key, attempt, "semaphore allocation failed, retrying");
        std::thread::sleep(ALLOC_RETRY_DELAY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_key(salt: i32) -> libc::key_t {
        ((std::process::id() as i32 & 0x7FFF) << 8) | (salt & 0xFF)
    }

    #[test]
    fn lock_unlock_lock_does_not_deadlock() {
        let gate = MutexGate::open(test_key(0x10)).unwrap();
        assert_eq!(gate.value(), 1);

        let guard = gate.lock().unwrap();
        assert_eq!(gate.value(), 0);
        drop(guard);
        assert_eq!(gate.value(), 1);

        let guard = gate.lock().unwrap();
        guard.unlock().unwrap();
        assert_eq!(gate.value(), 1);

        gate.destroy().unwrap();
    }

    #[test]
    fn lock_timeout_while_held() {
        let gate = MutexGate::open(test_key(0x11)).unwrap();

        let _guard = gate.lock().unwrap();
        let err = gate.lock_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, IpcError::LockTimeout { waited_ms } if waited_ms >= 20));

        drop(_guard);
        gate.destroy().unwrap();
    }

    #[test]
    fn contention_admits_one_holder_at_a_time() {
        let key = test_key(0x12);
        let gate = Arc::new(MutexGate::open(key).unwrap());
        let in_critical = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            let in_critical = Arc::clone(&in_critical);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    let _guard = gate.lock().unwrap();
                    let now_inside = in_critical.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(now_inside, 0, "two holders inside the critical section");
                    std::thread::yield_now();
                    in_critical.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(gate.value(), 1);
        Arc::try_unwrap(gate).ok().unwrap().destroy().unwrap();
    }

    #[test]
    fn second_open_does_not_reinitialize() {
        let key = test_key(0x13);
        let gate_a = MutexGate::open(key).unwrap();
        let guard = gate_a.lock().unwrap();

        // A second attach while the gate is held must observe it held.
        let gate_b = MutexGate::open(key).unwrap();
        assert!(!gate_b.is_creator());
        assert!(matches!(
            gate_b.lock_timeout(Duration::from_millis(10)),
            Err(IpcError::LockTimeout { .. })
        ));

        drop(guard);
        let _relock = gate_b.lock().unwrap();
        drop(_relock);

        drop(gate_b);
        gate_a.destroy().unwrap();
    }

    #[test]
    fn force_reset_recovers_a_wedged_gate() {
        let key = test_key(0x14);
        let gate = MutexGate::open(key).unwrap();

        // Simulate a peer that died holding the gate: acquire and leak.
        let guard = gate.lock().unwrap();
        std::mem::forget(guard);
        assert_eq!(gate.value(), 0);

        gate.force_reset().unwrap();
        let guard = gate.lock().unwrap();
        drop(guard);

        gate.destroy().unwrap();
    }
}
