//! System V shared memory segment lifecycle.
//!
//! Whichever process calls [`ShmSegment::open`] first creates the region;
//! the second caller attaches the existing one (idempotent get-or-create on
//! the same key). Detach happens on drop; removal of the backing region is
//! an explicit, once-only operation owned by the consumer side.

use std::io;
use std::time::Duration;

use crate::error::IpcError;

/// Retries after a transient allocation failure, with a short back-off
/// between attempts.
const ALLOC_RETRIES: u32 = 1;
const ALLOC_RETRY_DELAY: Duration = Duration::from_secs(1);

/// An attached System V shared memory segment.
///
/// The bytes behind this handle are shared with another process. They may
/// be touched only while the [`MutexGate`](crate::MutexGate) bound to the
/// same key is held; the `&mut self` on [`as_mut_slice`](Self::as_mut_slice)
/// only rules out aliasing within this process.
#[derive(Debug)]
pub struct ShmSegment {
    key: libc::key_t,
    shmid: libc::c_int,
    ptr: *mut u8,
    capacity: usize,
    created: bool,
}

// The raw pointer is a process-local mapping; the handle itself can move
// between threads.
unsafe impl Send for ShmSegment {}

impl ShmSegment {
    /// Get-or-create a segment of `capacity` bytes bound to `key` and
    /// attach it.
    ///
    /// Transient allocation failures are retried once after a short delay
    /// before surfacing [`IpcError::Allocation`]; callers should then run
    /// in a degraded no-op mode rather than terminate.
    pub fn open(key: libc::key_t, capacity: usize) -> Result<Self, IpcError> {
        let (shmid, created) = get_or_create(key, capacity)?;

        // SAFETY: shmid is a valid segment id returned by shmget; a null
        // address lets the kernel pick the mapping address.
        let ptr = unsafe { libc::shmat(shmid, std::ptr::null(), 0) };
        if ptr == usize::MAX as *mut libc::c_void {
            let err = io::Error::last_os_error();
            if created {
                // Nobody else can see a region we just created and failed
                // to attach; remove it instead of leaking.
                // SAFETY: shmid is valid; IPC_RMID takes no buffer.
                unsafe { libc::shmctl(shmid, libc::IPC_RMID, std::ptr::null_mut()) };
            }
            return Err(IpcError::Attach(err));
        }

        tracing::info!(key, shmid, capacity, created, "shared memory segment attached");

        Ok(Self {
            key,
            shmid,
            ptr: ptr.cast(),
            capacity,
            created,
        })
    }

    /// The key both processes agreed on out-of-band.
    pub fn key(&self) -> libc::key_t {
        self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether this handle created the region (as opposed to attaching an
    /// existing one).
    pub fn is_creator(&self) -> bool {
        self.created
    }

    /// View the segment bytes.
    ///
    /// Must be called only while the gate is held.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is a live mapping of at least `capacity` bytes for
        // the lifetime of self; cross-process writers are excluded by the
        // gate contract.
        unsafe { std::slice::from_raw_parts(self.ptr, self.capacity) }
    }

    /// View the segment bytes mutably.
    ///
    /// Must be called only while the gate is held.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` excludes in-process aliasing.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.capacity) }
    }

    /// Zero-fill the whole segment.
    ///
    /// The consumer calls this after every decode so an unwritten slot
    /// always reads back as an empty frame.
    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }

    /// Remove the backing region.
    ///
    /// Called exactly once, by the owning side, during teardown. The
    /// mapping itself is detached when the handle drops; the region is gone
    /// once every attached process has detached.
    pub fn remove(self) -> Result<(), IpcError> {
        // SAFETY: shmid is valid until IPC_RMID; no buffer argument.
        let rc = unsafe { libc::shmctl(self.shmid, libc::IPC_RMID, std::ptr::null_mut()) };
        if rc == -1 {
            return Err(IpcError::Teardown {
                resource: "segment",
                source: io::Error::last_os_error(),
            });
        }
        tracing::info!(key = self.key, shmid = self.shmid, "shared memory segment removed");
        Ok(())
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        // SAFETY: ptr came from a successful shmat and is detached once.
        let rc = unsafe { libc::shmdt(self.ptr.cast()) };
        if rc == -1 {
            tracing::warn!(
                key = self.key,
                error = %io::Error::last_os_error(),
                "failed to detach shared memory segment"
            );
        }
    }
}

/// shmget with creator detection and bounded retry.
fn get_or_create(key: libc::key_t, capacity: usize) -> Result<(libc::c_int, bool), IpcError> {
    let mut attempt = 0;
    loop {
        // IPC_EXCL first so we learn whether we created the region.
        // SAFETY: plain syscall, no pointers involved.
        let shmid = unsafe {
            libc::shmget(key, capacity, libc::IPC_CREAT | libc::IPC_EXCL | 0o666)
        };
        if shmid != -1 {
            return Ok((shmid, true));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EEXIST) {
            // SAFETY: as above.
            let shmid = unsafe { libc::shmget(key, capacity, 0o666) };
            if shmid != -1 {
                return Ok((shmid, false));
            }
            // The region vanished between the two calls, or its capacity
            // is smaller than ours; fall through to retry.
        }

        if attempt >= ALLOC_RETRIES {
            return Err(IpcError::Allocation {
                resource: "segment",
                retries: attempt,
                source: io::Error::last_os_error(),
            });
        }
        attempt += 1;
        tracing::warn!(key, attempt, "shared memory allocation failed, retrying");
        std::thread::sleep(ALLOC_RETRY_DELAY);
    }
}
