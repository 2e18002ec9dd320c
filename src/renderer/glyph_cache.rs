use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::font_store::FontStore;
use crate::glyph_key::GlyphKey;

/// Recency links of one slot, indices into the pool's slot arrays.
#[derive(Default, Clone, Copy)]
struct SlotLinks {
    newer: Option<usize>,
    older: Option<usize>,
}

/// Fixed-block coverage pool. Every slot holds `block_size` bytes in one
/// contiguous allocation; a lookup refreshes the slot's recency and an
/// insert recycles the stalest slot once the pool is full.
struct BlockPool {
    capacity: usize,
    block_size: usize,
    bytes: Vec<u8>,

    links: Vec<SlotLinks>,
    newest: Option<usize>,
    oldest: Option<usize>,
    slot_of: HashMap<GlyphKey, usize, fxhash::FxBuildHasher>,
    free: Vec<usize>,
    key_of: Vec<Option<GlyphKey>>,
}

impl BlockPool {
    fn new(capacity: NonZeroUsize, block_size: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        let block_size = block_size.get();

        Self {
            capacity,
            block_size,
            bytes: vec![0; capacity * block_size],
            links: vec![SlotLinks::default(); capacity],
            newest: None,
            oldest: None,
            slot_of: HashMap::with_capacity_and_hasher(capacity, fxhash::FxBuildHasher::default()),
            free: (0..capacity).collect(),
            key_of: vec![None; capacity],
        }
    }

    fn clear(&mut self) {
        self.slot_of.clear();
        self.free = (0..self.capacity).collect();
        self.key_of.fill(None);
        self.newest = None;
        self.oldest = None;
    }

    /// Returns the cached block for `key`, filling a slot via `fill` on a
    /// miss. A miss returns only the bytes actually written; a hit returns
    /// the whole block.
    fn get_or_insert_with(&mut self, key: &GlyphKey, fill: impl FnOnce() -> Vec<u8>) -> &[u8] {
        if let Some(&slot) = self.slot_of.get(key) {
            self.refresh(slot);
            let from = slot * self.block_size;
            &self.bytes[from..from + self.block_size]
        } else {
            let slot = self.take_slot();
            self.link_newest(slot, *key);

            let data = fill();
            let len = data.len().min(self.block_size);
            let from = slot * self.block_size;
            self.bytes[from..from + len].copy_from_slice(&data[..len]);
            &self.bytes[from..from + len]
        }
    }

    /// Pops a free slot, or unlinks and reclaims the oldest one.
    fn take_slot(&mut self) -> usize {
        if let Some(slot) = self.free.pop() {
            return slot;
        }

        let slot = self.oldest.expect("a full pool has an oldest slot");
        match self.links[slot].newer {
            Some(next) => {
                self.links[next].older = None;
                self.oldest = Some(next);
            }
            None => {
                // Single-slot pool: the list empties entirely.
                self.newest = None;
                self.oldest = None;
            }
        }
        if let Some(evicted) = self.key_of[slot].take() {
            self.slot_of.remove(&evicted);
        }
        slot
    }

    /// Attaches an unlinked slot at the newest end of the recency list.
    fn link_newest(&mut self, slot: usize, key: GlyphKey) {
        self.links[slot] = SlotLinks {
            newer: None,
            older: self.newest,
        };
        if let Some(prev) = self.newest {
            self.links[prev].newer = Some(slot);
        }
        self.newest = Some(slot);
        if self.oldest.is_none() {
            self.oldest = Some(slot);
        }
        self.slot_of.insert(key, slot);
        self.key_of[slot] = Some(key);
    }

    /// Moves an occupied slot to the newest end.
    fn refresh(&mut self, slot: usize) {
        let SlotLinks { newer, older } = self.links[slot];
        let Some(next) = newer else {
            // Already the most recent.
            return;
        };

        // Unlink from the middle or the oldest end.
        self.links[next].older = older;
        match older {
            Some(prev) => self.links[prev].newer = Some(next),
            None => self.oldest = Some(next),
        }

        // Relink as newest. The slot was not newest, so one exists.
        let prev_newest = self.newest.expect("occupied pool has a newest slot");
        self.links[prev_newest].newer = Some(slot);
        self.links[slot] = SlotLinks {
            newer: None,
            older: Some(prev_newest),
        };
        self.newest = Some(slot);
    }
}

/// One glyph's coverage mask as returned by the cache. `data` borrows the
/// pool slot for cached glyphs; glyphs too large for every pool are handed
/// back owned instead of being dropped.
pub struct GlyphCacheItem<'a> {
    pub width: usize,
    pub height: usize,
    pub data: Cow<'a, [u8]>,
}

pub struct GlyphCache {
    /// must be sorted by block size
    pools: Vec<BlockPool>,
}

impl Default for GlyphCache {
    /// Pools sized for the label use case: most glyphs are drawn at
    /// 24px-ish sizes, with headroom for up-scaled rendering.
    fn default() -> Self {
        fn nz(v: usize) -> NonZeroUsize {
            NonZeroUsize::new(v).unwrap_or(NonZeroUsize::MIN)
        }
        Self::new(&[
            (nz(16 * 16), nz(512)),
            (nz(32 * 32), nz(256)),
            (nz(64 * 64), nz(128)),
            (nz(128 * 128), nz(32)),
        ])
    }
}

impl GlyphCache {
    pub fn new(blocksize_capacity: &[(NonZeroUsize, NonZeroUsize)]) -> Self {
        let sorted_by_blocksize = {
            let mut v = blocksize_capacity.to_vec();
            v.sort_by_key(|(block_size, _)| *block_size);
            v
        };

        let pools = sorted_by_blocksize
            .into_iter()
            .map(|(block_size, capacity)| BlockPool::new(capacity, block_size))
            .collect();

        Self { pools }
    }

    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
    }

    pub fn get(
        &'_ mut self,
        key: &GlyphKey,
        font_store: &mut FontStore,
    ) -> Option<GlyphCacheItem<'_>> {
        let glyph_index = key.glyph_index();
        let font_size = key.font_size();
        let font_id = key.font_id();

        let font = font_store.font(font_id)?;
        let glyph_metrics = font.metrics_indexed(glyph_index, font_size);
        let glyph_bitmap_size = glyph_metrics.width * glyph_metrics.height;

        let pool = self
            .pools
            .iter_mut()
            .find(|pool| pool.block_size >= glyph_bitmap_size);

        let data = match pool {
            Some(pool) => Cow::Borrowed(pool.get_or_insert_with(key, || {
                let bitmap = font.rasterize_indexed(glyph_index, font_size);
                bitmap.1
            })),
            // Too big for every pool: rasterize without caching.
            None => Cow::Owned(font.rasterize_indexed(glyph_index, font_size).1),
        };

        Some(GlyphCacheItem {
            width: glyph_metrics.width,
            height: glyph_metrics.height,
            data,
        })
    }
}
