use crate::constants::{MAX_STACK, TASK_COMM_LEN};
use crate::frame::FrameId;

/// `status ∈ {COMPLETE, INCOMPLETE}`
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackStatus {
    #[default]
    Incomplete = 0,
    Complete = 1,
}

/// Fixed-size record emitted to the `events` channel. Byte layout is part
/// of the kernel/userspace ABI and must not change shape on
/// one side without the other.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRecord {
    /// Nanoseconds since boot.
    pub timestamp_ns: u64,
    pub pid: u32,
    pub cpu: u32,
    /// 0 when the sampled event was not a syscall tracepoint.
    pub syscall_nr: u64,
    pub comm: [u8; TASK_COMM_LEN],
    pub status: StackStatus,
    pub _pad: [u8; 3],
    pub count: u32,
    pub expected_count: u32,
    pub frame_ids: [FrameId; MAX_STACK],
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for StackRecord {}

impl Default for StackRecord {
    fn default() -> Self {
        StackRecord {
            timestamp_ns: 0,
            pid: 0,
            cpu: 0,
            syscall_nr: 0,
            comm: [0u8; TASK_COMM_LEN],
            status: StackStatus::Incomplete,
            _pad: [0u8; 3],
            count: 0,
            expected_count: 0,
            frame_ids: [0u32; MAX_STACK],
        }
    }
}

impl StackRecord {
    /// Invariant: `0 ≤ count ≤ MAX_STACK`. Appends `id` if there is room;
    /// returns whether it was appended. Callers still count the frame as
    /// decoded even when it is dropped by this cap.
    pub fn push_frame(&mut self, id: FrameId) -> bool {
        if (self.count as usize) < MAX_STACK {
            self.frame_ids[self.count as usize] = id;
            self.count += 1;
            true
        } else {
            false
        }
    }

    pub fn comm_str(&self) -> &str {
        let end = self.comm.iter().position(|&b| b == 0).unwrap_or(self.comm.len());
        core::str::from_utf8(&self.comm[..end]).unwrap_or("")
    }
}

/// Per-CPU scratch state, single slot, carried across tail calls within one
/// sampled-event chain. Owned exclusively by the currently
/// executing handler chain on its CPU, no locking needed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleState {
    pub stack: StackRecord,
    /// Current control-frame pointer, advanced by `control_frame_size` per
    /// decoded frame.
    pub cfp: u64,
    /// `base_stack = vm + value_size * vm_size - 2 * control_frame_size`.
    pub base_stack: u64,
    /// Tail-call depth so far; capped at `BPF_PROGRAMS_COUNT`.
    pub tail_call_depth: u32,
    pub version_tag: u32,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for SampleState {}

impl Default for SampleState {
    fn default() -> Self {
        SampleState {
            stack: StackRecord::default(),
            cfp: 0,
            base_stack: 0,
            tail_call_depth: 0,
            version_tag: 0,
        }
    }
}

impl SampleState {
    /// `status = COMPLETE` iff the walker observed `cfp > base_stack`
    /// before budget exhaustion.
    pub fn is_fully_walked(&self) -> bool {
        self.cfp > self.base_stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_STACK;

    #[test]
    fn push_frame_stops_at_max_stack() {
        let mut s = StackRecord::default();
        for i in 0..MAX_STACK {
            assert!(s.push_frame(i as u32));
        }
        assert_eq!(s.count as usize, MAX_STACK);
        assert!(!s.push_frame(999));
        assert_eq!(s.count as usize, MAX_STACK);
    }

    #[test]
    fn default_stack_record_has_no_syscall() {
        let s = StackRecord::default();
        assert_eq!(s.syscall_nr, 0);
        assert_eq!(s.status, StackStatus::Incomplete);
    }

    #[test]
    fn fully_walked_iff_cfp_past_base() {
        let mut state = SampleState::default();
        state.base_stack = 1000;
        state.cfp = 999;
        assert!(!state.is_fully_walked());
        state.cfp = 1001;
        assert!(state.is_fully_walked());
        state.cfp = 1000;
        assert!(!state.is_fully_walked());
    }
}
