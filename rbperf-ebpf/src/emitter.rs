//! Output emitter: publishes a finished [`StackRecord`] to whichever channel
//! was selected at load time. Failures are counted, never retried.

use aya_ebpf::programs::PerfEventContext;

use rbperf_common::{RbperfError, StackRecord, StackStatus};

use crate::config;
use crate::maps::{EVENTS_PERF, EVENTS_RINGBUF, RBPERF_STATS};

pub fn publish(ctx: &PerfEventContext, record: &StackRecord) {
    if record.status == StackStatus::Incomplete {
        record_incomplete();
    }

    let ok = if config::use_ringbuf() {
        publish_ringbuf(record)
    } else {
        publish_perf(ctx, record)
    };

    if !ok {
        record_error(RbperfError::OutputFull);
    } else {
        record_published();
    }
}

fn publish_ringbuf(record: &StackRecord) -> bool {
    match EVENTS_RINGBUF.output(record, 0) {
        Ok(()) => true,
        Err(_) => false,
    }
}

fn publish_perf(ctx: &PerfEventContext, record: &StackRecord) -> bool {
    EVENTS_PERF.output(ctx, record, 0).is_ok()
}

/// Bumps the per-CPU counter for `err`. Shared with `walker`, which calls
/// this for the other six error kinds spec.md §4.6 enumerates.
pub(crate) fn record_error(err: RbperfError) {
    if let Some(stats) = RBPERF_STATS.get_ptr_mut(0) {
        unsafe { (*stats).record_error(err) };
    }
}

fn record_published() {
    if let Some(stats) = RBPERF_STATS.get_ptr_mut(0) {
        unsafe { (*stats).samples_published = (*stats).samples_published.wrapping_add(1) };
    }
}

/// Bumps `samples_attempted`, once per sampled event observed at `on_event`.
pub(crate) fn record_attempt() {
    if let Some(stats) = RBPERF_STATS.get_ptr_mut(0) {
        unsafe { (*stats).samples_attempted = (*stats).samples_attempted.wrapping_add(1) };
    }
}

/// Bumps `budget_exhausted` when a sample publishes with `status = Incomplete`.
pub(crate) fn record_incomplete() {
    if let Some(stats) = RBPERF_STATS.get_ptr_mut(0) {
        unsafe { (*stats).budget_exhausted = (*stats).budget_exhausted.wrapping_add(1) };
    }
}
