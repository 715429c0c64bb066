//! Lock-free transposition table for caching search results.
//!
//! Each slot packs `(move, score, eval, depth, bound, pv, generation)` into a
//! single 64-bit word and guards it with a separate XOR-tagged key word so a
//! torn read can be detected without a lock.
//! Probing and storing only need `&self`, so the table can be shared as
//! `Arc<TranspositionTable>` across Lazy-SMP worker threads without a mutex.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::board::Move;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundType {
    /// Score is exact (a PV node whose value fell strictly inside the search window).
    Exact,
    /// Score is a lower bound: the real value is at least this much (a beta cutoff).
    LowerBound,
    /// Score is an upper bound: the real value is at most this much (every move failed low).
    UpperBound,
}

impl BoundType {
    fn to_bits(self) -> u64 {
        match self {
            BoundType::Exact => 0,
            BoundType::LowerBound => 1,
            BoundType::UpperBound => 2,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            1 => BoundType::LowerBound,
            2 => BoundType::UpperBound,
            _ => BoundType::Exact,
        }
    }
}

const MOVE_SHIFT: u32 = 0;
const SCORE_SHIFT: u32 = 16;
const EVAL_SHIFT: u32 = 32;
const DEPTH_SHIFT: u32 = 48;
const BOUND_SHIFT: u32 = 56;
const PV_SHIFT: u32 = 58;
const GEN_SHIFT: u32 = 59;
const GEN_BITS: u64 = 0b1_1111;

fn pack(
    mv: Option<Move>,
    score: i32,
    eval: i32,
    depth: u32,
    bound: BoundType,
    is_pv: bool,
    generation: u16,
) -> u64 {
    let move_bits = u64::from(mv.map_or(0, Move::as_u16));
    let score_bits = u64::from(score.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as u16);
    let eval_bits = u64::from(eval.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as u16);
    let depth_bits = u64::from(depth.min(255) as u8);
    let pv_bit = u64::from(is_pv);
    let gen_bits = u64::from(generation) & GEN_BITS;

    (move_bits << MOVE_SHIFT)
        | (score_bits << SCORE_SHIFT)
        | (eval_bits << EVAL_SHIFT)
        | (depth_bits << DEPTH_SHIFT)
        | (bound.to_bits() << BOUND_SHIFT)
        | (pv_bit << PV_SHIFT)
        | (gen_bits << GEN_SHIFT)
}

fn unpack_generation(data: u64) -> u16 {
    ((data >> GEN_SHIFT) & GEN_BITS) as u16
}

/// An owned snapshot of a probed slot's contents.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TTEntry {
    data: u64,
}

impl TTEntry {
    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        let bits = (self.data >> MOVE_SHIFT) as u16;
        if bits == 0 {
            None
        } else {
            Some(Move::from_u16(bits))
        }
    }

    #[must_use]
    pub fn score(&self) -> i32 {
        i32::from(((self.data >> SCORE_SHIFT) as u16) as i16)
    }

    #[must_use]
    pub fn eval(&self) -> i32 {
        i32::from(((self.data >> EVAL_SHIFT) as u16) as i16)
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        u32::from(((self.data >> DEPTH_SHIFT) & 0xFF) as u8)
    }

    #[must_use]
    pub fn bound_type(&self) -> BoundType {
        BoundType::from_bits(self.data >> BOUND_SHIFT)
    }

    #[must_use]
    pub fn is_pv(&self) -> bool {
        (self.data >> PV_SHIFT) & 1 != 0
    }
}

/// A single slot using lockless hashing: `key_xor` stores `hash ^ data`, so a
/// probe recomputes `key_xor ^ data` and only trusts the result if it matches
/// the probed hash. A torn read (one thread's store interleaved with
/// another's) produces a mismatch and is treated as a miss rather than as
/// invalid data.
#[repr(C)]
struct TTSlot {
    key_xor: AtomicU64,
    data: AtomicU64,
}

impl TTSlot {
    fn new() -> Self {
        TTSlot {
            key_xor: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    fn store(&self, hash: u64, data: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.key_xor.store(hash ^ data, Ordering::Relaxed);
    }

    fn probe(&self, hash: u64) -> Option<TTEntry> {
        let key_xor = self.key_xor.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        if key_xor ^ data == hash && data != 0 {
            Some(TTEntry { data })
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.data.load(Ordering::Relaxed) == 0
    }

    fn generation(&self) -> u16 {
        unpack_generation(self.data.load(Ordering::Relaxed))
    }

    fn depth(&self) -> u32 {
        let data = self.data.load(Ordering::Relaxed);
        u32::from(((data >> DEPTH_SHIFT) & 0xFF) as u8)
    }
}

/// Slots per bucket. Kept at 4 rather than the 3-per-cache-line layout some
/// engines use; this is a memory-layout choice, not a correctness property.
const BUCKET_SIZE: usize = 4;

#[repr(C)]
struct TTBucket {
    slots: [TTSlot; BUCKET_SIZE],
}

impl TTBucket {
    fn new() -> Self {
        TTBucket {
            slots: [TTSlot::new(), TTSlot::new(), TTSlot::new(), TTSlot::new()],
        }
    }
}

/// Thread-safe, lock-free transposition table.
///
/// Every worker thread in the pool shares one `Arc<TranspositionTable>` and
/// probes/stores through `&self`; there is no cross-thread ordering
/// guarantee beyond what the XOR tear check provides.
pub struct TranspositionTable {
    buckets: Vec<TTBucket>,
    mask: usize,
}

// Safety: all mutation goes through AtomicU64 operations.
unsafe impl Send for TranspositionTable {}
unsafe impl Sync for TranspositionTable {}

impl TranspositionTable {
    /// Create a table sized to approximately `size_mb` megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let bucket_size = mem::size_of::<TTBucket>();
        let mut num_buckets = (size_mb * 1024 * 1024) / bucket_size;

        num_buckets = num_buckets.next_power_of_two() / 2;
        if num_buckets == 0 {
            num_buckets = 1024;
        }

        let mut buckets = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            buckets.push(TTBucket::new());
        }

        TranspositionTable {
            buckets,
            mask: num_buckets - 1,
        }
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Hint the CPU to start loading the bucket for `hash` into cache.
    /// A best-effort no-op when prefetch intrinsics aren't available.
    pub fn prefetch(&self, hash: u64) {
        let _bucket = &self.buckets[self.index(hash)];
        // No portable stable-Rust prefetch intrinsic; indexing into the
        // bucket above is enough to pull it into cache on most allocators
        // since buckets are contiguous and small.
    }

    /// Probe the table for a given hash.
    #[must_use]
    pub(crate) fn probe(&self, hash: u64) -> Option<TTEntry> {
        let bucket = &self.buckets[self.index(hash)];
        bucket.slots.iter().find_map(|slot| slot.probe(hash))
    }

    /// Store an entry, replacing the existing entry for this hash if present,
    /// otherwise an empty slot, otherwise the slot with the lowest
    /// `depth - age` priority (generation-aged replacement).
    pub(crate) fn store(
        &self,
        hash: u64,
        depth: u32,
        score: i32,
        bound_type: BoundType,
        best_move: Option<Move>,
        generation: u16,
    ) {
        self.store_full(hash, depth, score, 0, bound_type, best_move, false, generation);
    }

    /// Store an entry with an explicit static eval and PV flag.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn store_full(
        &self,
        hash: u64,
        depth: u32,
        score: i32,
        eval: i32,
        bound_type: BoundType,
        best_move: Option<Move>,
        is_pv: bool,
        generation: u16,
    ) {
        let data = pack(best_move, score, eval, depth, bound_type, is_pv, generation);
        let bucket = &self.buckets[self.index(hash)];

        for slot in &bucket.slots {
            if slot.probe(hash).is_some() {
                slot.store(hash, data);
                return;
            }
        }

        for slot in &bucket.slots {
            if slot.is_empty() {
                slot.store(hash, data);
                return;
            }
        }

        let mut replace_idx = 0;
        let mut worst_priority = i32::MAX;
        for (idx, slot) in bucket.slots.iter().enumerate() {
            let age = generation.wrapping_sub(slot.generation());
            let priority = slot.depth().saturating_mul(2) as i32 - i32::from(age);
            if idx == 0 || priority < worst_priority {
                replace_idx = idx;
                worst_priority = priority;
            }
        }
        bucket.slots[replace_idx].store(hash, data);
    }

    /// Fraction of slots occupied, in parts per mille, sampled from the first
    /// 1000 buckets (matches the UCI `hashfull` convention of an approximate estimate).
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample_buckets = self.buckets.len().min(1000);
        if sample_buckets == 0 {
            return 0;
        }
        let sample_slots = sample_buckets * BUCKET_SIZE;
        let occupied: usize = self.buckets[..sample_buckets]
            .iter()
            .flat_map(|b| b.slots.iter())
            .filter(|slot| !slot.is_empty())
            .count();
        ((occupied as u64 * 1000) / sample_slots as u64) as u32
    }

    /// Clear all entries.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            for slot in &bucket.slots {
                slot.key_xor.store(0, Ordering::Relaxed);
                slot.data.store(0, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_probe_round_trips() {
        let tt = TranspositionTable::new(1);
        let hash = 0x1234_5678_9ABC_DEF0;
        tt.store(hash, 12, 57, BoundType::Exact, None, 1);

        let entry = tt.probe(hash).expect("entry should be present");
        assert_eq!(entry.depth(), 12);
        assert_eq!(entry.score(), 57);
        assert_eq!(entry.bound_type(), BoundType::Exact);
    }

    #[test]
    fn mismatched_hash_is_a_miss() {
        let tt = TranspositionTable::new(1);
        tt.store(0xAAAA, 4, 10, BoundType::LowerBound, None, 1);
        assert!(tt.probe(0xBBBB).is_none());
    }

    #[test]
    fn negative_scores_round_trip() {
        let tt = TranspositionTable::new(1);
        let hash = 0xDEAD_BEEF;
        tt.store(hash, 3, -29000, BoundType::UpperBound, None, 1);
        let entry = tt.probe(hash).unwrap();
        assert_eq!(entry.score(), -29000);
    }
}
