//! Remote memory reader: bounded, fault-tolerant reads of another process's
//! memory. Every call site treats a fault as "this field is invalid", never
//! as "this field happens to still hold its old value"; callers must not
//! rely on `bpf_probe_read_user`'s zero-on-failure detail.

use aya_ebpf::helpers::{
    bpf_probe_read_kernel, bpf_probe_read_user, bpf_probe_read_user_buf, bpf_probe_read_user_str_bytes,
};

use rbperf_common::RbperfError;

/// Reads a `u64` at `remote_addr` in the current task's address space.
#[inline(always)]
pub fn read_u64(remote_addr: u64) -> Result<u64, RbperfError> {
    unsafe { bpf_probe_read_user(remote_addr as *const u64) }.map_err(|_| RbperfError::RemoteReadFault)
}

/// Reads a `u32` at `remote_addr`.
#[inline(always)]
pub fn read_u32(remote_addr: u64) -> Result<u32, RbperfError> {
    unsafe { bpf_probe_read_user(remote_addr as *const u32) }.map_err(|_| RbperfError::RemoteReadFault)
}

/// Reads `dst.len()` bytes from `remote_addr`, bounded to `dst`'s capacity.
#[inline(always)]
pub fn read_bytes(dst: &mut [u8], remote_addr: u64) -> Result<(), RbperfError> {
    unsafe { bpf_probe_read_user_buf(remote_addr as *const u8, dst) }
        .map_err(|_| RbperfError::RemoteReadFault)
}

/// Reads a `u64` field out of the current task's own kernel memory (not the
/// target's userspace address space), used for the PID-reuse guard's
/// `task->start_time` read, which is kernel, not user, state.
#[inline(always)]
pub fn read_kernel_u64(kernel_addr: u64) -> Result<u64, RbperfError> {
    unsafe { bpf_probe_read_kernel(kernel_addr as *const u64) }.map_err(|_| RbperfError::RemoteReadFault)
}

/// Reads a bounded, NUL-terminated string from `remote_addr` into `dst`,
/// truncating and terminating on overflow rather than faulting.
#[inline(always)]
pub fn read_user_str<'a>(dst: &'a mut [u8], remote_addr: u64) -> Result<&'a [u8], RbperfError> {
    match unsafe { bpf_probe_read_user_str_bytes(remote_addr as *const u8, dst) } {
        Ok(s) => Ok(s),
        Err(_) => Err(RbperfError::RemoteReadFault),
    }
}
