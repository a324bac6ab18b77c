//! The pure logic of frame interning, factored out of the
//! actual eBPF map accesses so it can be unit-tested on the host. The real
//! `rbperf-ebpf` crate implements [`FrameTables`] and [`RandomSource`] over
//! `aya_ebpf::maps::HashMap` and `bpf_get_prandom_u32`; tests implement them
//! over a plain `std::collections::HashMap` and a seeded counter.

use crate::frame::{FrameId, FrameRecord};

/// Seam over the bidirectional intern table (`stack_to_id`/`id_to_stack`).
/// Insertion failure is swallowed by the implementation: either map may
/// evict on capacity, and there is no `Result` here because a failed insert
/// still yields a usable id.
pub trait FrameTables {
    fn lookup(&self, frame: &FrameRecord) -> Option<FrameId>;
    fn insert(&mut self, frame: FrameRecord, id: FrameId);
}

/// Seam over the pseudo-random id source (`bpf_get_prandom_u32` in-kernel).
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;
}

/// `intern(frame) -> id`:
/// 1. probe `stack_to_id`; return the stored id if present.
/// 2. otherwise draw a fresh id from `rng`.
/// 3. insert both directions (best-effort).
/// 4. return the id.
pub fn intern_into<T: FrameTables, R: RandomSource>(
    tables: &mut T,
    rng: &mut R,
    frame: FrameRecord,
) -> FrameId {
    if let Some(id) = tables.lookup(&frame) {
        return id;
    }
    let id = rng.next_u32();
    tables.insert(frame, id);
    id
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeFrameTables {
        pub stack_to_id: HashMap<FrameRecord, FrameId>,
        pub id_to_stack: HashMap<FrameId, FrameRecord>,
    }

    impl FrameTables for FakeFrameTables {
        fn lookup(&self, frame: &FrameRecord) -> Option<FrameId> {
            self.stack_to_id.get(frame).copied()
        }

        fn insert(&mut self, frame: FrameRecord, id: FrameId) {
            self.stack_to_id.insert(frame, id);
            self.id_to_stack.insert(id, frame);
        }
    }

    /// Deterministic, non-repeating source for tests that need distinct
    /// ids; real collisions are exercised separately with
    /// [`ConstantRandom`].
    #[derive(Default)]
    pub struct CountingRandom(pub u32);

    impl RandomSource for CountingRandom {
        fn next_u32(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
    }

    /// Always returns the same id, to exercise the id-collision path: the
    /// interner never handles a collision probability, only survives it.
    pub struct ConstantRandom(pub u32);

    impl RandomSource for ConstantRandom {
        fn next_u32(&mut self) -> u32 {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn interning_the_same_bytes_twice_returns_the_same_id() {
        let mut tables = FakeFrameTables::default();
        let mut rng = CountingRandom::default();

        let mut frame = FrameRecord::zeroed();
        frame.set_method_name(b"foo");
        frame.lineno = 10;

        let id1 = intern_into(&mut tables, &mut rng, frame);
        let id2 = intern_into(&mut tables, &mut rng, frame);
        assert_eq!(id1, id2);
    }

    #[test]
    fn distinct_frames_get_distinct_ids_absent_collision() {
        let mut tables = FakeFrameTables::default();
        let mut rng = CountingRandom::default();

        let mut a = FrameRecord::zeroed();
        a.set_method_name(b"foo");
        let mut b = FrameRecord::zeroed();
        b.set_method_name(b"bar");

        let id_a = intern_into(&mut tables, &mut rng, a);
        let id_b = intern_into(&mut tables, &mut rng, b);
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn round_trip_through_id_to_stack() {
        let mut tables = FakeFrameTables::default();
        let mut rng = CountingRandom::default();

        let mut frame = FrameRecord::zeroed();
        frame.set_method_name(b"round_trip");
        let id = intern_into(&mut tables, &mut rng, frame);

        assert_eq!(tables.id_to_stack.get(&id), Some(&frame));
    }

    #[test]
    fn a_forced_id_collision_between_distinct_frames_is_survivable() {
        // Collisions are accepted, not prevented. With a `ConstantRandom`
        // source, two distinct never-before-seen frames draw the *same*
        // fresh id; the second insert overwrites the first under
        // last-writer-wins, so `id_to_stack` ends up resolving to whichever
        // frame was interned last: still a valid frame, just not frame
        // `a`'s.
        let mut tables = FakeFrameTables::default();
        let mut rng = ConstantRandom(7);

        let mut a = FrameRecord::zeroed();
        a.set_method_name(b"a");
        let mut b = FrameRecord::zeroed();
        b.set_method_name(b"b");

        let id_a = intern_into(&mut tables, &mut rng, a);
        let id_b = intern_into(&mut tables, &mut rng, b);
        assert_eq!(id_a, id_b);
        assert_eq!(tables.id_to_stack.get(&id_b), Some(&b));
    }
}
