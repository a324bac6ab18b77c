//! The stack walker: `on_event`, the sampled-event entry point, and
//! `walk_ruby_stack`, its tail-called continuation. Both share the per-CPU
//! `SampleState` slot in `global_state`.

use aya_ebpf::helpers::{bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_current_task, bpf_get_smp_processor_id, bpf_ktime_get_ns};
use aya_ebpf::programs::PerfEventContext;
use aya_ebpf::EbpfContext as _;

use rbperf_common::{
    decode_frame, expected_frame_count, final_status, should_tail_call, FrameRecord, ProcessRecord,
    RbperfError, StackRecord, BPF_PROGRAMS_COUNT, BOTTOM_SENTINEL_FRAMES, MAX_STACKS_PER_PROGRAM,
    TOP_SENTINEL_FRAMES, VALUE_SIZE,
};

use crate::config;
use crate::decoder::RemoteProcess;
use crate::emitter;
use crate::interner;
use crate::maps::{GLOBAL_STATE, PID_TO_RB_THREAD, PROGRAMS, VERSION_SPECIFIC_OFFSETS};
use crate::remote;

/// Entry point: invoked on every sampled event.
pub fn on_event(ctx: &PerfEventContext) -> Result<(), RbperfError> {
    emitter::record_attempt();
    let result = try_on_event(ctx);
    if let Err(e) = result {
        emitter::record_error(e);
    }
    result
}

fn try_on_event(ctx: &PerfEventContext) -> Result<(), RbperfError> {
    let pid_tgid = unsafe { bpf_get_current_pid_tgid() };
    let pid = (pid_tgid >> 32) as u32;

    let process = unsafe { PID_TO_RB_THREAD.get(&pid) }
        .copied()
        .filter(ProcessRecord::is_registered)
        .ok_or(RbperfError::NotRegistered)?;

    if config::pid_race_detector_enabled() {
        pid_reuse_guard(pid, &process)?;
    }

    let offsets = unsafe { VERSION_SPECIFIC_OFFSETS.get(process.version_tag) }
        .copied()
        .ok_or(RbperfError::VersionMissing)?;

    let current_thread_addr = remote::read_u64(process.current_thread_addr)?;
    let main_thread_addr = remote::read_u64(current_thread_addr.wrapping_add(offsets.main_thread))?;
    let ec_addr = remote::read_u64(main_thread_addr.wrapping_add(offsets.ec))?;
    let vm = remote::read_u64(ec_addr.wrapping_add(offsets.vm))?;
    let vm_size = remote::read_u64(ec_addr.wrapping_add(offsets.vm_size))?;
    let cfp = remote::read_u64(ec_addr.wrapping_add(offsets.cfp))?;

    let base_stack = vm
        .wrapping_add(VALUE_SIZE.wrapping_mul(vm_size))
        .wrapping_sub(TOP_SENTINEL_FRAMES.wrapping_mul(offsets.control_frame_size));
    let cfp = cfp.wrapping_add(BOTTOM_SENTINEL_FRAMES.wrapping_mul(offsets.control_frame_size));

    let state = GLOBAL_STATE.get_ptr_mut(0).ok_or(RbperfError::RemoteReadFault)?;
    let state = unsafe { &mut *state };

    state.stack = StackRecord::default();
    state.stack.timestamp_ns = unsafe { bpf_ktime_get_ns() };
    state.stack.pid = pid;
    state.stack.cpu = unsafe { bpf_get_smp_processor_id() };
    state.stack.syscall_nr = if config::event_type().captures_syscall_nr() {
        read_syscall_nr(ctx)
    } else {
        0
    };
    if let Ok(comm) = unsafe { bpf_get_current_comm() } {
        state.stack.comm = comm;
    }
    state.stack.expected_count = expected_frame_count(base_stack, cfp, offsets.control_frame_size);

    state.base_stack = base_stack;
    state.cfp = cfp;
    state.tail_call_depth = 0;
    state.version_tag = process.version_tag;

    // Never returns on success; the continuation publishes the sample.
    let _ = unsafe { PROGRAMS.tail_call(ctx, rbperf_common::RBPERF_STACK_READING_PROGRAM_IDX) };
    Ok(())
}

fn pid_reuse_guard(pid: u32, process: &ProcessRecord) -> Result<(), RbperfError> {
    let task = unsafe { bpf_get_current_task() };
    let observed_start_time = remote::read_kernel_u64(task.wrapping_add(config::task_struct_start_time_offset()))?;

    match unsafe { PID_TO_RB_THREAD.get_ptr_mut(&pid) } {
        Some(record_ptr) => {
            let record = unsafe { &mut *record_ptr };
            if record.start_time == 0 {
                record.start_time = observed_start_time;
                Ok(())
            } else if record.start_time != observed_start_time {
                Err(RbperfError::PidRaced)
            } else {
                Ok(())
            }
        }
        None => {
            if process.start_time == 0 || process.start_time == observed_start_time {
                Ok(())
            } else {
                Err(RbperfError::PidRaced)
            }
        }
    }
}

fn read_syscall_nr(ctx: &PerfEventContext) -> u64 {
    // Offset of the syscall number within the tracepoint's context, read
    // only when `event_type == Syscall`. `bpf_probe_read_kernel` rather than
    // `_user`: the tracepoint context lives in kernel memory.
    const SYSCALL_NR_OFFSET: u64 = 8;
    remote::read_kernel_u64(ctx.as_ptr() as u64 + SYSCALL_NR_OFFSET).unwrap_or(0)
}

/// Continuation: processes up to `MAX_STACKS_PER_PROGRAM` frames, then
/// either tail-calls itself or finalizes and emits.
pub fn walk_ruby_stack(ctx: &PerfEventContext) -> Result<(), RbperfError> {
    let result = try_walk_ruby_stack(ctx);
    if let Err(e) = result {
        emitter::record_error(e);
    }
    result
}

fn try_walk_ruby_stack(ctx: &PerfEventContext) -> Result<(), RbperfError> {
    let offsets_slot;
    let control_frame_size;
    let mut cfp;
    let base_stack;

    {
        let state = GLOBAL_STATE.get_ptr_mut(0).ok_or(RbperfError::RemoteReadFault)?;
        let state = unsafe { &mut *state };
        offsets_slot = unsafe { VERSION_SPECIFIC_OFFSETS.get(state.version_tag) }
            .copied()
            .ok_or(RbperfError::VersionMissing)?;
        control_frame_size = offsets_slot.control_frame_size;
        cfp = state.cfp;
        base_stack = state.base_stack;
        state.tail_call_depth += 1;
    }

    #[allow(clippy::needless_range_loop)]
    for _ in 0..MAX_STACKS_PER_PROGRAM {
        // Deliberately reads the frame pointer before checking termination:
        // this can decode one frame past top-of-stack, later discarded by
        // the MAX_STACK size cap.
        let iseq_addr = remote::read_u64(cfp.wrapping_add(offsets_slot.cfp_iseq_offset)).unwrap_or(0);
        let pc_addr = remote::read_u64(cfp).unwrap_or(0);
        let pc = if pc_addr != 0 {
            remote::read_u64(pc_addr).unwrap_or(0)
        } else {
            0
        };

        if rbperf_common::is_complete(cfp, base_stack) {
            break;
        }

        let frame = if iseq_addr == 0 {
            FrameRecord::native()
        } else {
            let body = remote::read_u64(iseq_addr.wrapping_add(offsets_slot.iseq_body_offset)).unwrap_or(0);
            let (frame, err) = decode_frame(&RemoteProcess, pc, body, &offsets_slot);
            if let Some(e) = err {
                emitter::record_error(e);
            }
            frame
        };

        let id = interner::intern(frame);
        push_frame_id(id);

        cfp = cfp.wrapping_add(control_frame_size);
    }

    let tail_call_depth = {
        let state = GLOBAL_STATE.get_ptr_mut(0).ok_or(RbperfError::RemoteReadFault)?;
        let state = unsafe { &mut *state };
        state.cfp = cfp;
        state.tail_call_depth
    };

    if should_tail_call(cfp, base_stack, tail_call_depth, BPF_PROGRAMS_COUNT) {
        let _ = unsafe { PROGRAMS.tail_call(ctx, rbperf_common::RBPERF_STACK_READING_PROGRAM_IDX) };
        // If the tail call itself fails (e.g. verifier/runtime issue) fall
        // through and publish what we have rather than dropping silently.
    }

    let state = GLOBAL_STATE.get_ptr_mut(0).ok_or(RbperfError::RemoteReadFault)?;
    let state = unsafe { &mut *state };
    state.stack.status = final_status(cfp, base_stack);
    emitter::publish(ctx, &state.stack);
    Ok(())
}

fn push_frame_id(id: rbperf_common::FrameId) {
    if let Some(state) = GLOBAL_STATE.get_ptr_mut(0) {
        let state = unsafe { &mut *state };
        let _ = state.stack.push_frame(id);
    }
}
