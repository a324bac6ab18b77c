//! Wires the pure decoder math in `rbperf_common::decoder` to real remote
//! reads of another process's address space.

use rbperf_common::decoder::RemoteMemory;
use rbperf_common::RbperfError;

use crate::remote;

pub struct RemoteProcess;

impl RemoteMemory for RemoteProcess {
    #[inline(always)]
    fn read_u64(&self, addr: u64) -> Result<u64, RbperfError> {
        remote::read_u64(addr)
    }

    #[inline(always)]
    fn read_u32(&self, addr: u64) -> Result<u32, RbperfError> {
        remote::read_u32(addr)
    }

    #[inline(always)]
    fn read_c_str(&self, dst: &mut [u8], addr: u64) -> Result<usize, RbperfError> {
        remote::read_user_str(dst, addr).map(|s| s.len())
    }
}
