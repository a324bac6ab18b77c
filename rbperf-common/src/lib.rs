//! Types shared between `rbperf-ebpf` (the in-kernel stack walker) and
//! `rbperf` (the userspace loader/controller). Every struct here is the ABI:
//! byte layout must match on both sides, so nothing here may change shape
//! without changing it identically in both crates.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod interner;
pub mod process;
pub mod sample;
pub mod stats;
pub mod walker;

pub use config::{EventType, LoadConfig};
pub use constants::*;
pub use decoder::{compute_lineno, decode_frame, RemoteMemory};
pub use error::RbperfError;
pub use frame::{FrameId, FrameRecord};
pub use interner::{intern_into, FrameTables, RandomSource};
pub use process::{PathFlavour, ProcessRecord, VersionOffsets};
pub use sample::{SampleState, StackRecord, StackStatus};
pub use stats::RbperfStats;
pub use walker::{expected_frame_count, final_status, is_complete, should_tail_call};
