//! Size and capacity bounds used throughout the walker. These are
//! compile-time constants rather than load-time config because they size
//! fixed arrays in the ABI structs shared with userspace.

/// Capacity of each direction of the frame intern table (`id_to_stack`,
/// `stack_to_id`)
pub const FRAME_TABLE_CAPACITY: u32 = 10_240;

/// Capacity of `pid_to_rb_thread`
pub const PROCESS_TABLE_CAPACITY: u32 = 10_240;

/// Number of version-offset slots in `version_specific_offsets` (tag 0..9).
pub const VERSION_OFFSETS_COUNT: u32 = 10;

/// Upper bound on frame ids carried in one `StackRecord`.
pub const MAX_STACK: usize = 127;

/// Frames decoded per `walk_ruby_stack` invocation before a tail call.
pub const MAX_STACKS_PER_PROGRAM: usize = 30;

/// Number of eBPF programs available for tail-calling (`programs` array
/// size), and therefore the hard cap on tail calls per sample.
pub const BPF_PROGRAMS_COUNT: u32 = 3;

/// Slot in the `programs` table holding the stack-reading continuation.
pub const RBPERF_STACK_READING_PROGRAM_IDX: u32 = 0;

/// Bound on `FrameRecord::method_name`.
pub const MAX_METHOD_NAME_LEN: usize = 64;

/// Bound on `FrameRecord::path`.
pub const MAX_PATH_LEN: usize = 128;

/// Bound on `StackRecord::comm`, matching `TASK_COMM_LEN` on Linux.
pub const TASK_COMM_LEN: usize = 16;

/// Sentinel method name for native (non-interpreter) frames
pub const NATIVE_FRAME_NAME: &[u8] = b"<native code>";

/// Size in bytes of a Ruby `VALUE` on a 64-bit target.
pub const VALUE_SIZE: u64 = 8;

/// Number of sentinel control frames skipped at the top of the VM stack.
pub const TOP_SENTINEL_FRAMES: u64 = 2;

/// Number of sentinel control frames skipped at the bottom of the VM stack.
pub const BOTTOM_SENTINEL_FRAMES: u64 = 1;
