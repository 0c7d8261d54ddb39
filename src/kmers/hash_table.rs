use std::hint::spin_loop;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::header::reprobe_offset;
use crate::kmers::kmer_codec::KmerSpec;

// Slot states. A writer claims an EMPTY slot by moving it to BUSY, writes the
// key, then publishes it as FULL. Readers never look at a BUSY key.
const EMPTY: u8 = 0;
const BUSY: u8 = 1;
const FULL: u8 = 2;

/// Fixed-capacity open-addressing table from encoded k-mer to counter.
///
/// Safe for concurrent `insert_or_increment` from many threads: slots are
/// claimed with a compare-and-swap on their state byte and counters are
/// atomic. The capacity never changes after construction.
pub struct KmerHashTable {
    states: Vec<AtomicU8>,
    keys: Vec<AtomicU64>,
    counts: Vec<AtomicU64>,
    mask: usize,
    /// log2 of the capacity
    bits: u32,
    spec: KmerSpec,
    val_len_bits: u32,
    max_reprobe: u32,
    finalized: AtomicBool,
}

impl KmerHashTable {
    /// Allocate a zeroed table with the next power of two ≥ `capacity_hint`
    /// slots.
    pub fn new(
        capacity_hint: usize,
        key_len_bits: u32,
        val_len_bits: u32,
        max_reprobe: u32,
    ) -> KmerBinResult<Self> {
        let spec = KmerSpec::from_key_len_bits(key_len_bits)?;
        let capacity = capacity_hint.max(1).checked_next_power_of_two().ok_or_else(|| {
            KmerBinError::Config(format!("hash size {capacity_hint} is too large"))
        })?;

        Ok(KmerHashTable {
            states: (0..capacity).map(|_| AtomicU8::new(EMPTY)).collect(),
            keys: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            counts: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            mask: capacity - 1,
            bits: capacity.trailing_zeros(),
            spec,
            val_len_bits,
            max_reprobe,
            finalized: AtomicBool::new(false),
        })
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn spec(&self) -> &KmerSpec {
        &self.spec
    }

    pub fn key_len_bits(&self) -> u32 {
        self.spec.key_len_bits()
    }

    pub fn val_len_bits(&self) -> u32 {
        self.val_len_bits
    }

    pub fn max_reprobe(&self) -> u32 {
        self.max_reprobe
    }

    /// Primary slot: multiplicative hash, top `bits` bits.
    #[inline]
    fn home_slot(&self, key: u64) -> usize {
        fxhash::hash64(&key).checked_shr(64 - self.bits).unwrap_or(0) as usize
    }

    /// Number of slots tried before giving up.
    #[inline]
    fn probe_limit(&self) -> usize {
        (self.max_reprobe as usize + 1).min(self.capacity())
    }

    /// Wait out a concurrent writer and return the settled state.
    #[inline]
    fn settled_state(&self, slot: usize) -> u8 {
        loop {
            let state = self.states[slot].load(Ordering::Acquire);
            if state != BUSY {
                return state;
            }
            spin_loop();
        }
    }

    /// Add `delta` to the counter for `key`, inserting it if absent.
    ///
    /// Returns `true` when the key was newly inserted. Fails with
    /// `KmerBinError::Capacity` when every reprobe lands on another key.
    pub fn insert_or_increment(&self, key: u64, delta: u64) -> KmerBinResult<bool> {
        if self.finalized.load(Ordering::Acquire) {
            return Err(KmerBinError::Finalized);
        }
        debug_assert_eq!(key & !self.spec.mask(), 0, "key wider than k-mer");

        let home = self.home_slot(key);
        let limit = self.probe_limit();
        for i in 0..limit {
            let slot = (home + reprobe_offset(i)) & self.mask;
            loop {
                match self.settled_state(slot) {
                    FULL => {
                        if self.keys[slot].load(Ordering::Relaxed) == key {
                            self.counts[slot].fetch_add(delta, Ordering::Relaxed);
                            return Ok(false);
                        }
                        break;
                    }
                    _ => {
                        if self.states[slot]
                            .compare_exchange(EMPTY, BUSY, Ordering::Acquire, Ordering::Acquire)
                            .is_ok()
                        {
                            self.keys[slot].store(key, Ordering::Relaxed);
                            self.counts[slot].fetch_add(delta, Ordering::Relaxed);
                            self.states[slot].store(FULL, Ordering::Release);
                            return Ok(true);
                        }
                        // Lost the race for this slot; look again.
                    }
                }
            }
        }

        Err(KmerBinError::Capacity {
            key,
            capacity: self.capacity(),
            probes: limit,
        })
    }

    /// Counter for `key`, if present. Canonical reduction is up to the caller.
    pub fn get(&self, key: u64) -> Option<u64> {
        let home = self.home_slot(key);
        for i in 0..self.probe_limit() {
            let slot = (home + reprobe_offset(i)) & self.mask;
            match self.settled_state(slot) {
                EMPTY => return None,
                _ => {
                    if self.keys[slot].load(Ordering::Relaxed) == key {
                        return Some(self.counts[slot].load(Ordering::Relaxed));
                    }
                }
            }
        }
        None
    }

    /// Close the table for writes. Call once every counting thread has joined.
    pub fn finalize(&self) {
        self.finalized.store(true, Ordering::Release);
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    pub fn ensure_finalized(&self) -> KmerBinResult<()> {
        if self.is_finalized() {
            Ok(())
        } else {
            Err(KmerBinError::NotFinalized)
        }
    }

    /// Occupied `(key, count)` pairs within a slot range.
    pub fn entries_in(&self, range: Range<usize>) -> impl Iterator<Item = (u64, u64)> + '_ {
        let end = range.end.min(self.capacity());
        (range.start.min(end)..end).filter_map(move |slot| {
            if self.states[slot].load(Ordering::Acquire) == FULL {
                Some((
                    self.keys[slot].load(Ordering::Relaxed),
                    self.counts[slot].load(Ordering::Relaxed),
                ))
            } else {
                None
            }
        })
    }

    /// All occupied `(key, count)` pairs in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.entries_in(0..self.capacity())
    }

    /// Number of distinct keys stored.
    pub fn distinct(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.load(Ordering::Acquire) == FULL)
            .count()
    }

    /// Split the slot space into at most `n` contiguous shards of near-equal size.
    pub fn shards(&self, n: usize) -> Vec<Range<usize>> {
        let n = n.max(1);
        let capacity = self.capacity();
        let step = (capacity + n - 1) / n;
        (0..n)
            .map(|i| (i * step).min(capacity)..((i + 1) * step).min(capacity))
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Approximate memory needed to hold a table of `size` entries, following
/// the packed layout of the counting tool that writes these hashes: each
/// entry stores the key bits not implied by its position, the reprobe index
/// and the value, rounded up to whole 64-bit words.
pub fn estimated_memory_bytes(key_len_bits: u32, val_len_bits: u32, max_reprobe: u32, size: u64) -> u64 {
    let size = size.max(1).next_power_of_two();
    let lsize = 63 - size.leading_zeros();
    let reprobe_bits = 64 - (max_reprobe as u64 + 1).leading_zeros();
    let key_bits = key_len_bits.saturating_sub(lsize) + reprobe_bits;
    let entry_bits = (key_bits + val_len_bits) as u64;
    let words = (size * entry_bits + 63) / 64;
    words * 8
}
