//! Word-keyed sparse topic counts, packed and count-sorted.
//!
//! Each entry packs one `(count, topic)` pair into a single `u32`: the
//! low `rotate_len` bits hold the topic id, the high bits hold the
//! count. Because the count occupies the high bits, comparing raw
//! packed words orders entries by count (topic id breaking ties), so a
//! per-word slice kept sorted descending on the raw words is sorted
//! descending by count. Increment and decrement restore the order with
//! a single insertion-sort bubble.

use fnv::FnvHashMap;

/// Sparse word-topic count table sorted by count within each word.
///
/// Only nonzero counts are stored; a word's hottest topics sit at the
/// front of its slice, so partial scans that accumulate probability
/// mass terminate early.
#[derive(Debug, Clone)]
pub struct SortedTopicMap {
    /// Packed `(count << rotate_len) | topic` words per word id,
    /// descending.
    data: FnvHashMap<u32, Vec<u32>>,
    rotate_len: u32,
    topic_mask: u32,
    max_word_id: u32,
    max_topic_id: u32,
}

impl SortedTopicMap {
    /// Create an empty map sized for topic ids drawn from
    /// `0..topic_num`.
    ///
    /// `rotate_len` is the bit length of `topic_num`, the minimum
    /// width that can hold every admissible topic id.
    pub fn new(topic_num: u32) -> Self {
        let rotate_len = u32::BITS - topic_num.leading_zeros();
        SortedTopicMap {
            data: FnvHashMap::default(),
            rotate_len,
            topic_mask: (1u32 << rotate_len) - 1,
            max_word_id: 0,
            max_topic_id: 0,
        }
    }

    /// Number of bits the count is shifted by in a packed word.
    #[inline]
    pub fn rotate_len(&self) -> u32 {
        self.rotate_len
    }

    /// Largest word id ever inserted.
    #[inline]
    pub fn max_word_id(&self) -> u32 {
        self.max_word_id
    }

    /// Largest topic id ever inserted.
    #[inline]
    pub fn max_topic_id(&self) -> u32 {
        self.max_topic_id
    }

    /// True when no entry has ever been inserted.
    pub fn is_empty(&self) -> bool {
        self.data.values().all(|v| v.is_empty())
    }

    /// Number of stored (nonzero) topics for `word_id`.
    pub fn num_topics(&self, word_id: u32) -> usize {
        self.data.get(&word_id).map_or(0, |v| v.len())
    }

    #[inline]
    fn unpack(&self, packed: u32) -> (u32, u32) {
        (packed & self.topic_mask, packed >> self.rotate_len)
    }

    /// The `idx`-th entry of `word_id` as `(topic_id, count)`.
    ///
    /// Panics when `idx` is out of range for the word's entries.
    pub fn get(&self, word_id: u32, idx: usize) -> (u32, u32) {
        let entries = self.data.get(&word_id).map_or(&[][..], |v| &v[..]);
        assert!(
            idx < entries.len(),
            "sorted map: index {} out of range for word {}",
            idx,
            word_id
        );
        self.unpack(entries[idx])
    }

    /// Iterate `(topic_id, count)` entries of `word_id` in descending
    /// count order.
    pub fn iter_word(&self, word_id: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data
            .get(&word_id)
            .into_iter()
            .flatten()
            .map(move |&packed| self.unpack(packed))
    }

    /// Add `delta` to the count of `(word_id, topic_id)`, inserting the
    /// entry if absent and bubbling it toward the front to restore the
    /// descending order. A zero `delta` is a no-op.
    pub fn incr(&mut self, word_id: u32, topic_id: u32, delta: u32) {
        if delta == 0 {
            return;
        }
        debug_assert!(topic_id <= self.topic_mask, "topic id wider than mask");

        let rotate_len = self.rotate_len;
        let mask = self.topic_mask;
        let entries = self.data.entry(word_id).or_default();

        match entries.iter().position(|&p| p & mask == topic_id) {
            None => {
                if word_id > self.max_word_id {
                    self.max_word_id = word_id;
                }
                if topic_id > self.max_topic_id {
                    self.max_topic_id = topic_id;
                }
                entries.push((delta << rotate_len) | topic_id);
                let mut k = entries.len() - 1;
                while k > 0 && entries[k] > entries[k - 1] {
                    entries.swap(k, k - 1);
                    k -= 1;
                }
            }
            Some(idx) => {
                let old_count = entries[idx] >> rotate_len;
                entries[idx] = ((old_count + delta) << rotate_len) | topic_id;
                let mut k = idx;
                while k > 0 && entries[k] > entries[k - 1] {
                    entries.swap(k, k - 1);
                    k -= 1;
                }
            }
        }
    }

    /// Subtract `delta` from the count of `(word_id, topic_id)`,
    /// clamping at zero. A zero result removes the entry; otherwise the
    /// entry bubbles toward the back to restore the descending order.
    /// Absent words or topics and a zero `delta` are no-ops.
    pub fn decr(&mut self, word_id: u32, topic_id: u32, delta: u32) {
        if delta == 0 {
            return;
        }
        let rotate_len = self.rotate_len;
        let mask = self.topic_mask;
        let Some(entries) = self.data.get_mut(&word_id) else {
            return;
        };
        let Some(idx) = entries.iter().position(|&p| p & mask == topic_id) else {
            return;
        };

        let old_count = entries[idx] >> rotate_len;
        let delta = delta.min(old_count);
        if old_count - delta == 0 {
            entries.remove(idx);
        } else {
            entries[idx] = ((old_count - delta) << rotate_len) | topic_id;
            let mut k = idx;
            while k + 1 < entries.len() && entries[k] < entries[k + 1] {
                entries.swap(k, k + 1);
                k += 1;
            }
        }
    }
}
