use crate::error::RbperfError;

/// Per-CPU diagnostic counters for the "counted, not retried" failure
/// policy (e.g. an output channel full bumps a counter instead of retrying).
/// Bundled into one struct, the way several other eBPF programs' own
/// per-counter diagnostic maps are shaped, so a single per-CPU array slot
/// holds all of them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RbperfStats {
    pub samples_attempted: u64,
    pub samples_published: u64,
    pub not_registered: u64,
    pub version_missing: u64,
    pub pid_raced: u64,
    pub remote_read_fault: u64,
    pub unknown_object_type: u64,
    pub budget_exhausted: u64,
    pub output_full: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for RbperfStats {}

impl RbperfStats {
    pub fn record_error(&mut self, err: RbperfError) {
        let counter = match err {
            RbperfError::NotRegistered => &mut self.not_registered,
            RbperfError::VersionMissing => &mut self.version_missing,
            RbperfError::PidRaced => &mut self.pid_raced,
            RbperfError::RemoteReadFault => &mut self.remote_read_fault,
            RbperfError::UnknownObjectType => &mut self.unknown_object_type,
            RbperfError::BudgetExhausted => &mut self.budget_exhausted,
            RbperfError::OutputFull => &mut self.output_full,
        };
        *counter = counter.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_increments_the_right_counter() {
        let mut stats = RbperfStats::default();
        stats.record_error(RbperfError::OutputFull);
        stats.record_error(RbperfError::OutputFull);
        stats.record_error(RbperfError::PidRaced);
        assert_eq!(stats.output_full, 2);
        assert_eq!(stats.pid_raced, 1);
        assert_eq!(stats.not_registered, 0);
    }
}
