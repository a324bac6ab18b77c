use core::fmt;

/// Every failure kind the in-kernel walker and its userspace loader need to
/// distinguish. `rbperf-ebpf` is `#![no_std]` so this cannot derive
/// `thiserror::Error` (its derive requires `std::error::Error`); the
/// userspace crate wraps this in a `thiserror`-derived error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbperfError {
    /// The sampled PID has no entry in `pid_to_rb_thread`. Silent drop.
    NotRegistered,
    /// The process's version tag has no entry in `version_specific_offsets`.
    /// Logged and dropped.
    VersionMissing,
    /// The task's observed start time disagrees with the registered one.
    /// Silent drop.
    PidRaced,
    /// A remote read faulted. The current frame degrades to zero-content;
    /// the walk does not necessarily abort.
    RemoteReadFault,
    /// The path object's type tag was neither string nor array. Logged; the
    /// frame is left zero-initialized.
    UnknownObjectType,
    /// The tail-call budget ran out before `cfp > base_stack`. The sample
    /// is still published, with `status = Incomplete`.
    BudgetExhausted,
    /// The output channel rejected the publish (queue full). Counted, not
    /// retried.
    OutputFull,
}

impl RbperfError {
    /// Whether this error aborts the sample before any per-CPU state is
    /// dirtied: true for the first three variants above, which can only
    /// fire before the per-CPU scratch slot is touched.
    pub const fn aborts_before_state(self) -> bool {
        matches!(
            self,
            RbperfError::NotRegistered | RbperfError::VersionMissing | RbperfError::PidRaced
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RbperfError::NotRegistered => "process not registered",
            RbperfError::VersionMissing => "unknown runtime version tag",
            RbperfError::PidRaced => "pid reuse detected",
            RbperfError::RemoteReadFault => "remote memory read faulted",
            RbperfError::UnknownObjectType => "unrecognized path object type",
            RbperfError::BudgetExhausted => "tail-call budget exhausted",
            RbperfError::OutputFull => "output channel full",
        }
    }
}

impl fmt::Display for RbperfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The "user" feature pulls in `aya`, which is itself std-only, so the
// userspace build is never actually no_std regardless of the crate-level
// `no_std` attribute; `extern crate std` opts this impl back in so the
// loader's `thiserror`-derived `LoaderError` can wrap this with `#[from]`.
#[cfg(feature = "user")]
extern crate std;

#[cfg(feature = "user")]
impl std::error::Error for RbperfError {}
