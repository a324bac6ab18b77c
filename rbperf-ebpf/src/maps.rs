//! Shared tables. Names are contractual with userspace, do not rename
//! without updating the loader.

use aya_ebpf::macros::map;
use aya_ebpf::maps::{Array, HashMap, PerCpuArray, PerfEventArray, ProgramArray, RingBuf};

use rbperf_common::{
    FrameId, FrameRecord, ProcessRecord, RbperfStats, SampleState, StackRecord, VersionOffsets,
    BPF_PROGRAMS_COUNT, FRAME_TABLE_CAPACITY, PROCESS_TABLE_CAPACITY, VERSION_OFFSETS_COUNT,
};

#[map(name = "pid_to_rb_thread")]
pub static PID_TO_RB_THREAD: HashMap<u32, ProcessRecord> =
    HashMap::with_max_entries(PROCESS_TABLE_CAPACITY, 0);

/// `FrameId -> FrameRecord`, one direction of the intern table.
#[map(name = "id_to_stack")]
pub static ID_TO_STACK: HashMap<FrameId, FrameRecord> =
    HashMap::with_max_entries(FRAME_TABLE_CAPACITY, 0);

/// `FrameRecord -> FrameId`, the other direction.
#[map(name = "stack_to_id")]
pub static STACK_TO_ID: HashMap<FrameRecord, FrameId> =
    HashMap::with_max_entries(FRAME_TABLE_CAPACITY, 0);

#[map(name = "version_specific_offsets")]
pub static VERSION_SPECIFIC_OFFSETS: Array<VersionOffsets> =
    Array::with_max_entries(VERSION_OFFSETS_COUNT, 0);

/// Per-CPU scratch slot, single entry, carried across tail calls.
#[map(name = "global_state")]
pub static GLOBAL_STATE: PerCpuArray<SampleState> = PerCpuArray::with_max_entries(1, 0);

#[map(name = "rbperf_stats")]
pub static RBPERF_STATS: PerCpuArray<RbperfStats> = PerCpuArray::with_max_entries(1, 0);

/// Ring-buffer output channel, used when `use_ringbuf` is set at load time.
#[map(name = "events_ringbuf")]
pub static EVENTS_RINGBUF: RingBuf = RingBuf::with_byte_size(
    (core::mem::size_of::<StackRecord>() as u32) * 256,
    0,
);

/// Per-CPU perf-buffer output channel, used when `use_ringbuf` is unset.
#[map(name = "events_perf")]
pub static EVENTS_PERF: PerfEventArray<StackRecord> = PerfEventArray::new(0);

/// Tail-call table; slot `RBPERF_STACK_READING_PROGRAM_IDX` holds the
/// stack-walking continuation.
#[map(name = "programs")]
pub static PROGRAMS: ProgramArray = ProgramArray::with_max_entries(BPF_PROGRAMS_COUNT, 0);
