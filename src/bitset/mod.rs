//! # Compressed Node-ID Bitset
//!
//! A dense bitmap of 32-bit node IDs, stored as a sparse map of 64-bit
//! words keyed by chunk index. Runs of unset chunks cost nothing, so the
//! representation stays compact over the sparse identifier ranges a
//! supply-chain graph produces (a handful of hot nodes reaching into the
//! tens of thousands of IDs, most of the ID space untouched) without
//! depending on an external roaring-bitmap crate.
//!
//! Set-algebra operations (`union`, `intersect`, `difference`) are pure and
//! return a new bitset; mutation goes through `add`/`remove`, matching the
//! "immutable under set-algebra, explicit mutation" contract the engine
//! relies on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const CHUNK_BITS: u32 = 64;

/// A compressed set of node IDs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBitSet {
    // chunk index -> bitmap of (id % 64) within that chunk
    chunks: BTreeMap<u32, u64>,
}

impl fmt::Debug for NodeBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl NodeBitSet {
    /// An empty bitset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bitset from an iterator of IDs.
    pub fn from_ids<I: IntoIterator<Item = u32>>(ids: I) -> Self {
        let mut set = Self::new();
        for id in ids {
            set.add(id);
        }
        set
    }

    fn split(id: u32) -> (u32, u32) {
        (id / CHUNK_BITS, id % CHUNK_BITS)
    }

    /// Insert `id` into the set, mutating in place.
    pub fn add(&mut self, id: u32) {
        let (chunk, bit) = Self::split(id);
        *self.chunks.entry(chunk).or_insert(0) |= 1u64 << bit;
    }

    /// Remove `id` from the set, mutating in place. No-op if absent.
    pub fn remove(&mut self, id: u32) {
        let (chunk, bit) = Self::split(id);
        if let Some(word) = self.chunks.get_mut(&chunk) {
            *word &= !(1u64 << bit);
            if *word == 0 {
                self.chunks.remove(&chunk);
            }
        }
    }

    /// Whether `id` is a member of the set.
    pub fn contains(&self, id: u32) -> bool {
        let (chunk, bit) = Self::split(id);
        self.chunks
            .get(&chunk)
            .map(|word| word & (1u64 << bit) != 0)
            .unwrap_or(false)
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.chunks.values().all(|word| *word == 0)
    }

    /// Number of members.
    pub fn cardinality(&self) -> usize {
        self.chunks.values().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in ascending order.
    pub fn to_array(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Iterate members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.chunks.iter().flat_map(|(&chunk, &word)| {
            (0..CHUNK_BITS).filter_map(move |bit| {
                if word & (1u64 << bit) != 0 {
                    Some(chunk * CHUNK_BITS + bit)
                } else {
                    None
                }
            })
        })
    }

    /// The union of `self` and `other` as a new bitset.
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    /// Union `other` into `self` in place.
    pub fn union_with(&mut self, other: &Self) {
        for (&chunk, &word) in &other.chunks {
            *self.chunks.entry(chunk).or_insert(0) |= word;
        }
    }

    /// The intersection of `self` and `other` as a new bitset.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut chunks = BTreeMap::new();
        for (chunk, word) in &self.chunks {
            if let Some(other_word) = other.chunks.get(chunk) {
                let merged = word & other_word;
                if merged != 0 {
                    chunks.insert(*chunk, merged);
                }
            }
        }
        Self { chunks }
    }

    /// Intersect `self` with `other` in place.
    pub fn intersect_with(&mut self, other: &Self) {
        *self = self.intersect(other);
    }

    /// The set difference `self - other` as a new bitset.
    pub fn difference(&self, other: &Self) -> Self {
        let mut chunks = BTreeMap::new();
        for (chunk, word) in &self.chunks {
            let remaining = match other.chunks.get(chunk) {
                Some(other_word) => word & !other_word,
                None => *word,
            };
            if remaining != 0 {
                chunks.insert(*chunk, remaining);
            }
        }
        Self { chunks }
    }

    /// Subtract `other` from `self` in place.
    pub fn difference_with(&mut self, other: &Self) {
        *self = self.difference(other);
    }

    /// The symmetric difference of `self` and `other` as a new bitset.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let mut chunks = BTreeMap::new();
        let keys = self.chunks.keys().chain(other.chunks.keys()).copied();
        for chunk in keys {
            let a = self.chunks.get(&chunk).copied().unwrap_or(0);
            let b = other.chunks.get(&chunk).copied().unwrap_or(0);
            let merged = a ^ b;
            if merged != 0 {
                chunks.insert(chunk, merged);
            }
        }
        Self { chunks }
    }

    /// Serialize to a stable, round-trippable byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("NodeBitSet serialization is infallible")
    }

    /// Deserialize from the form produced by [`NodeBitSet::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| crate::error::EngineError::Internal(format!("corrupt bitset: {e}")))
    }
}

impl FromIterator<u32> for NodeBitSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}
