//! Memoization of single emulator steps.
//!
//! The search replays the same (state, input) pairs constantly while rolling
//! out futures; the cache answers those replays without running the core.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    fmt,
    hash::Hasher,
};

/// Occupancy and traffic counters for a [StateCache].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Live entries.
    pub count: u64,
    /// Target occupancy after garbage collection.
    pub limit: u64,
    /// Next sequence number to be handed out.
    pub next_seq: u64,
    /// Lookups answered from the table.
    pub hits: u64,
    /// Lookups that fell through to the emulator.
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {}/{}, seq {}, {} hits, {} misses",
            self.count, self.limit, self.next_seq, self.hits, self.misses
        )
    }
}

struct Entry {
    input: u8,
    pre: Vec<u8>,
    seq: u64,
    post: Vec<u8>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("input", &self.input)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Bounded memo table from (input byte, pre-step state) to the post-step
/// state.
///
/// Entries are bucketed by a 64-bit hash of the pre-step state keyed with the
/// input byte; within a bucket they are told apart by byte equality, so a
/// lookup never copies the caller's state. The table owns copies of both
/// states of every entry.
///
/// Occupancy may drift up to `limit + slop`; crossing that triggers a sweep
/// back down to `limit`, evicting the entries with the smallest sequence
/// numbers. Sequence numbers are bumped on insert and on every hit, so the
/// sweep drops the least recently useful entries.
#[derive(Debug)]
pub struct StateCache {
    table: HashMap<u64, Vec<Entry>>,
    limit: u64,
    slop: u64,
    count: u64,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

fn keyed_hash(input: u8, state: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u8(input);
    hasher.write(state);
    hasher.finish()
}

impl StateCache {
    /// An empty cache that will hold about `limit` entries.
    pub fn new(limit: u64, slop: u64) -> Self {
        Self {
            table: HashMap::new(),
            limit,
            slop,
            count: 0,
            next_seq: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Drop every entry and reset all counters, keeping the new bounds.
    pub fn resize(&mut self, limit: u64, slop: u64) {
        self.table.clear();
        self.limit = limit;
        self.slop = slop;
        self.count = 0;
        self.next_seq = 0;
        self.hits = 0;
        self.misses = 0;
    }

    /// Record that stepping `pre` with `input` produced `post`.
    ///
    /// Both states are copied into the table. Never fails; over-full tables
    /// are swept down by the garbage collector afterwards.
    pub fn remember(&mut self, input: u8, pre: &[u8], post: &[u8]) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.table.entry(keyed_hash(input, pre)).or_default().push(Entry {
            input,
            pre: pre.to_vec(),
            seq,
            post: post.to_vec(),
        });
        self.count += 1;
        self.maybe_gc();
    }

    /// Look up the post-step state for `(input, pre)`.
    ///
    /// A hit refreshes the entry's sequence number. The returned slice
    /// borrows from the table and must be copied out before the next
    /// [remember](Self::remember).
    pub fn get_known(&mut self, input: u8, pre: &[u8]) -> Option<&[u8]> {
        let bucket = self.table.get_mut(&keyed_hash(input, pre));
        let entry = bucket.and_then(|entries| {
            entries
                .iter_mut()
                .find(|entry| entry.input == input && entry.pre == *pre)
        });
        match entry {
            Some(entry) => {
                entry.seq = self.next_seq;
                self.next_seq += 1;
                self.hits += 1;
                Some(&entry.post)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            count: self.count,
            limit: self.limit,
            next_seq: self.next_seq,
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Sweep back down to `limit` entries once occupancy passes
    /// `limit + slop`, evicting smallest sequence numbers first.
    fn maybe_gc(&mut self) {
        if self.count <= self.limit + self.slop {
            return;
        }

        let num_remove = (self.count - self.limit) as usize;
        let mut seqs: Vec<u64> = self
            .table
            .values()
            .flat_map(|entries| entries.iter().map(|entry| entry.seq))
            .collect();
        // Sequence numbers are distinct, so the partial sort gives an exact
        // cutoff: everything below it goes.
        let cutoff = if num_remove >= seqs.len() {
            u64::MAX
        } else {
            let (_, &mut cutoff, _) = seqs.select_nth_unstable(num_remove);
            cutoff
        };

        let mut removed = 0u64;
        self.table.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.seq >= cutoff);
            removed += (before - entries.len()) as u64;
            !entries.is_empty()
        });
        self.count -= removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tag: u8) -> Vec<u8> {
        vec![tag; 16]
    }

    #[test]
    fn remembers_and_replays_a_step() {
        let mut cache = StateCache::new(100, 10);
        cache.remember(0x80, &state(1), &state(2));

        assert_eq!(cache.get_known(0x80, &state(1)), Some(&state(2)[..]));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn distinguishes_input_and_state() {
        let mut cache = StateCache::new(100, 10);
        cache.remember(0x80, &state(1), &state(2));

        assert_eq!(cache.get_known(0x40, &state(1)), None);
        assert_eq!(cache.get_known(0x80, &state(3)), None);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn sweeps_down_to_limit_keeping_largest_sequence_numbers() {
        let mut cache = StateCache::new(4, 2);
        for tag in 0..7 {
            cache.remember(0, &state(tag), &state(tag + 100));
        }
        // 7 entries > limit + slop, so the sweep ran and kept the newest 4.
        assert_eq!(cache.stats().count, 4);
        for tag in 0..3 {
            assert_eq!(cache.get_known(0, &state(tag)), None);
        }
        for tag in 3..7 {
            assert!(cache.get_known(0, &state(tag)).is_some());
        }
    }

    #[test]
    fn hits_refresh_recency() {
        let mut cache = StateCache::new(4, 2);
        for tag in 0..6 {
            cache.remember(0, &state(tag), &state(tag + 100));
        }
        // Touch the oldest entry, then overflow. The touched entry must
        // survive the sweep at the expense of the next-oldest.
        assert!(cache.get_known(0, &state(0)).is_some());
        cache.remember(0, &state(6), &state(106));

        assert_eq!(cache.stats().count, 4);
        assert!(cache.get_known(0, &state(0)).is_some());
        assert_eq!(cache.get_known(0, &state(1)), None);
    }

    #[test]
    fn occupancy_never_exceeds_limit_plus_slop() {
        let mut cache = StateCache::new(8, 3);
        for tag in 0..100u16 {
            cache.remember(0, &tag.to_le_bytes(), &state(9));
            assert!(cache.stats().count <= 8 + 3);
        }
    }

    #[test]
    fn resize_drops_entries_and_counters() {
        let mut cache = StateCache::new(4, 2);
        cache.remember(0, &state(1), &state(2));
        assert!(cache.get_known(0, &state(1)).is_some());

        cache.resize(16, 4);
        let stats = cache.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.next_seq, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(cache.get_known(0, &state(1)), None);
    }
}
