//! Shared open path for both endpoints: segment first, then gate.

use crate::error::IpcError;
use crate::gate::MutexGate;
use crate::segment::ShmSegment;

/// Open the segment/gate pair bound to `key`.
///
/// If the gate cannot be opened and this handle just created the region,
/// the region is removed again before the error surfaces. A segment with
/// no gate is unusable, and a SysV region outlives its process; without
/// the removal it would sit in the kernel until reboot.
pub(crate) fn open_channel(
    key: libc::key_t,
    capacity: usize,
) -> Result<(ShmSegment, MutexGate), IpcError> {
    open_channel_with(key, capacity, MutexGate::open)
}

/// [`open_channel`] with the gate constructor injected, so the cleanup
/// path is reachable from tests.
fn open_channel_with(
    key: libc::key_t,
    capacity: usize,
    open_gate: impl FnOnce(libc::key_t) -> Result<MutexGate, IpcError>,
) -> Result<(ShmSegment, MutexGate), IpcError> {
    let segment = ShmSegment::open(key, capacity)?;
    match open_gate(key) {
        Ok(gate) => Ok((segment, gate)),
        Err(e) => {
            if segment.is_creator() {
                if let Err(te) = segment.remove() {
                    tracing::warn!(
                        key,
                        error = %te,
                        "could not remove segment after gate open failure"
                    );
                }
            }
            Err(e)
        }
    }
}
