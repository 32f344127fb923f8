//! Packed bit-field over a fixed universe of neuron indices

use lifcore_params::words_for_bits;

/// Fixed-size bitset backed by 32-bit words
///
/// Indices must be below [`BitField::len`]; an out-of-range index is a
/// programming error and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitField {
    len: usize,
    words: Vec<u32>,
}

impl BitField {
    /// Create an all-clear bit-field of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0u32; words_for_bits(len)],
        }
    }

    /// Wrap existing words; bits at or beyond `len` are cleared
    pub fn from_words(len: usize, mut words: Vec<u32>) -> Self {
        assert_eq!(
            words.len(),
            words_for_bits(len),
            "bit-field of {} bits needs {} words",
            len,
            words_for_bits(len)
        );
        let tail = len % 32;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u32 << tail) - 1;
            }
        }
        Self { len, words }
    }

    /// Number of bits in the universe
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for an empty universe
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn locate(&self, index: usize) -> (usize, u32) {
        assert!(
            index < self.len,
            "bit index {} out of range for bit-field of {} bits",
            index,
            self.len
        );
        (index / 32, 1u32 << (index % 32))
    }

    /// Set bit `index`
    #[inline(always)]
    pub fn set(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.words[word] |= mask;
    }

    /// Clear bit `index`
    #[inline(always)]
    pub fn clear(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.words[word] &= !mask;
    }

    /// Test bit `index`
    #[inline(always)]
    pub fn test(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word] & mask != 0
    }

    /// Clear every bit
    #[inline]
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if any bit is set
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Set bit indices in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut remaining = word;
            core::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(word_idx * 32 + bit)
            })
        })
    }

    /// Backing words
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_test_clear_all() {
        let mut bits = BitField::new(6);
        bits.set(5);
        assert!(bits.test(5));
        bits.clear_all();
        assert!(!bits.test(5));
    }

    #[test]
    fn test_clear_single_bit() {
        let mut bits = BitField::new(70);
        bits.set(0);
        bits.set(33);
        bits.set(69);
        bits.clear(33);
        assert!(bits.test(0));
        assert!(!bits.test(33));
        assert!(bits.test(69));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_iter_ones_ascending() {
        let mut bits = BitField::new(100);
        for i in [97, 3, 31, 32, 64] {
            bits.set(i);
        }
        let ones: Vec<usize> = bits.iter_ones().collect();
        assert_eq!(ones, vec![3, 31, 32, 64, 97]);
        assert!(bits.any());
    }

    #[test]
    fn test_from_words_masks_tail() {
        let bits = BitField::from_words(4, vec![0xFF]);
        assert_eq!(bits.count_ones(), 4);
        assert_eq!(bits.words(), &[0x0F]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let mut bits = BitField::new(6);
        bits.set(6);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_within_last_word_panics() {
        let bits = BitField::new(40);
        bits.test(50);
    }
}
