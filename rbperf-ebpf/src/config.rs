//! Load-time configuration variables. Each is a `#[no_mangle]` global rather
//! than a map entry, following the config-global idiom used by several
//! aya-ebpf programs (e.g. `TELEMETRY_CONFIG`-style globals): the userspace
//! loader rewrites these via `EbpfLoader::set_global` before `load()`, after
//! which the program treats them as immutable rodata. Defaults here only
//! matter for `cargo check`; the loader always overwrites them.

#[no_mangle]
static VERBOSE: bool = false;

#[no_mangle]
static USE_RINGBUF: bool = true;

#[no_mangle]
static ENABLE_PID_RACE_DETECTOR: bool = true;

#[no_mangle]
static EVENT_TYPE: u32 = 0;

/// Offset of `task_struct::start_time`, resolved from BTF by the userspace
/// loader the same way it resolves `version_specific_offsets`; this is
/// kernel-version offset detection, not a Ruby-runtime offset, and belongs
/// to a separate out-of-scope collaborator (symbol/version detection).
#[no_mangle]
static TASK_STRUCT_START_TIME_OFFSET: u64 = 0;

#[inline(always)]
pub fn verbose() -> bool {
    unsafe { core::ptr::read_volatile(&VERBOSE) }
}

#[inline(always)]
pub fn use_ringbuf() -> bool {
    unsafe { core::ptr::read_volatile(&USE_RINGBUF) }
}

#[inline(always)]
pub fn pid_race_detector_enabled() -> bool {
    unsafe { core::ptr::read_volatile(&ENABLE_PID_RACE_DETECTOR) }
}

#[inline(always)]
pub fn event_type() -> rbperf_common::EventType {
    rbperf_common::EventType::from_u32(unsafe { core::ptr::read_volatile(&EVENT_TYPE) })
}

#[inline(always)]
pub fn task_struct_start_time_offset() -> u64 {
    unsafe { core::ptr::read_volatile(&TASK_STRUCT_START_TIME_OFFSET) }
}
