//! Wires the pure interning logic in `rbperf_common::interner` to the real
//! `stack_to_id`/`id_to_stack` maps and the in-kernel PRNG.

use aya_ebpf::helpers::bpf_get_prandom_u32;

use rbperf_common::{intern_into, FrameId, FrameRecord, FrameTables, RandomSource};

use crate::maps::{ID_TO_STACK, STACK_TO_ID};

struct MapTables;

impl FrameTables for MapTables {
    fn lookup(&self, frame: &FrameRecord) -> Option<FrameId> {
        unsafe { STACK_TO_ID.get(frame) }.copied()
    }

    fn insert(&mut self, frame: FrameRecord, id: FrameId) {
        // Best-effort: a capacity-eviction failure still leaves the caller
        // with a usable id.
        let _ = STACK_TO_ID.insert(&frame, &id, 0);
        let _ = ID_TO_STACK.insert(&id, &frame, 0);
    }
}

struct Prandom;

impl RandomSource for Prandom {
    fn next_u32(&mut self) -> u32 {
        unsafe { bpf_get_prandom_u32() }
    }
}

/// Interns `frame`, returning its stable id (drawing a fresh one on first
/// sight).
#[inline(always)]
pub fn intern(frame: FrameRecord) -> FrameId {
    intern_into(&mut MapTables, &mut Prandom, frame)
}
