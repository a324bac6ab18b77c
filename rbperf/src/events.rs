use std::collections::HashMap;

use aya::maps::{HashMap as AyaHashMap, MapData};
use log::warn;
use rbperf_common::{FrameId, FrameRecord, StackRecord, StackStatus};

use crate::error::LoaderError;

/// Resolves `FrameId`s against `id_to_stack` and prints one line per frame,
/// innermost first. Frame resolution happens on the userspace reader side,
/// not in the kernel program, since only the reader needs human-readable
/// method names and paths.
pub struct StackPrinter {
    cache: HashMap<FrameId, FrameRecord>,
}

impl StackPrinter {
    pub fn new() -> Self {
        StackPrinter { cache: HashMap::new() }
    }

    pub fn print(&mut self, id_to_stack: &AyaHashMap<&MapData, FrameId, FrameRecord>, record: &StackRecord) -> Result<(), LoaderError> {
        let status = if record.status == StackStatus::Complete { "complete" } else { "incomplete" };
        println!(
            "pid={} cpu={} comm={} frames={}/{} [{}]",
            record.pid,
            record.cpu,
            record.comm_str(),
            record.count,
            record.expected_count,
            status,
        );

        for idx in 0..record.count as usize {
            let id = record.frame_ids[idx];
            let frame = self.resolve(id_to_stack, id)?;
            if frame.method_name_str() == "<native code>" {
                println!("  #{idx} <native code>");
            } else {
                println!("  #{idx} {}:{} ({})", frame.path_str(), frame.lineno, frame.method_name_str());
            }
        }
        Ok(())
    }

    fn resolve(&mut self, id_to_stack: &AyaHashMap<&MapData, FrameId, FrameRecord>, id: FrameId) -> Result<FrameRecord, LoaderError> {
        if let Some(frame) = self.cache.get(&id) {
            return Ok(*frame);
        }
        let frame = id_to_stack.get(&id, 0).map_err(LoaderError::Map)?;
        self.cache.insert(id, frame);
        Ok(frame)
    }
}

/// Registers a sampled process: the one write userspace must make before any
/// samples for that pid can resolve.
pub fn register_process(
    pid_to_rb_thread: &mut AyaHashMap<&mut MapData, u32, rbperf_common::ProcessRecord>,
    pid: u32,
    process: rbperf_common::ProcessRecord,
) -> Result<(), LoaderError> {
    pid_to_rb_thread.insert(pid, process, 0).map_err(LoaderError::Map)?;
    Ok(())
}

pub fn log_dropped(stats: &rbperf_common::RbperfStats) {
    let dropped = stats.not_registered
        + stats.version_missing
        + stats.pid_raced
        + stats.remote_read_fault
        + stats.unknown_object_type
        + stats.budget_exhausted
        + stats.output_full;
    if dropped > 0 {
        warn!(
            "{dropped} samples dropped since start (not_registered={}, version_missing={}, pid_raced={}, remote_read_fault={}, unknown_object_type={}, budget_exhausted={}, output_full={})",
            stats.not_registered,
            stats.version_missing,
            stats.pid_raced,
            stats.remote_read_fault,
            stats.unknown_object_type,
            stats.budget_exhausted,
            stats.output_full,
        );
    }
}
