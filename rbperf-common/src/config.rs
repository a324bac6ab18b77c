/// Whether the sampled event is a syscall tracepoint (in which case the
/// syscall number is captured) or something else.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventType {
    #[default]
    Unknown = 0,
    Syscall = 1,
    Uprobe = 2,
    CpuClock = 3,
}

impl EventType {
    pub const fn from_u32(v: u32) -> Self {
        match v {
            1 => EventType::Syscall,
            2 => EventType::Uprobe,
            3 => EventType::CpuClock,
            _ => EventType::Unknown,
        }
    }

    pub const fn captures_syscall_nr(self) -> bool {
        matches!(self, EventType::Syscall)
    }
}

/// The four load-time configuration variables controlling the walker. Set
/// once by the userspace controller before program attachment and treated
/// as immutable thereafter, mirrored here as a plain `Copy` struct so both
/// the loader and the in-kernel program agree on its shape, even though in
/// `rbperf-ebpf` each field is actually realized as its own `#[no_mangle]
/// static` global (the per-field idiom several `aya_ebpf` config globals
/// use) rather than one struct global.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    pub verbose: bool,
    pub use_ringbuf: bool,
    pub enable_pid_race_detector: bool,
    pub event_type: EventType,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            verbose: false,
            use_ringbuf: true,
            enable_pid_race_detector: true,
            event_type: EventType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_syscall_events_capture_syscall_nr() {
        assert!(EventType::Syscall.captures_syscall_nr());
        assert!(!EventType::Uprobe.captures_syscall_nr());
        assert!(!EventType::CpuClock.captures_syscall_nr());
        assert!(!EventType::Unknown.captures_syscall_nr());
    }

    #[test]
    fn unknown_u32_maps_to_unknown_event_type() {
        assert_eq!(EventType::from_u32(42), EventType::Unknown);
        assert_eq!(EventType::from_u32(1), EventType::Syscall);
    }
}
