//! Word-aligned bit-packed index storage.
//!
//! Values are packed into 32-bit words, `floor(32 / bits)` values per word,
//! lowest bits first. Values never straddle a word boundary; the leftover high
//! bits of each word are padding and are ignored when reading.

/// Widths a packed array may use.
pub const VALID_BITS: [u8; 9] = [0, 1, 2, 3, 4, 5, 6, 8, 16];

/// Returns `true` if `bits` is a supported width.
pub fn is_valid_bits(bits: u8) -> bool {
    VALID_BITS.contains(&bits)
}

/// Number of values stored in one 32-bit word at the given width.
pub fn values_per_word(bits: u8) -> usize {
    if bits == 0 { 0 } else { 32 / usize::from(bits) }
}

/// Number of words needed to hold `len` values at the given width.
pub fn word_count(bits: u8, len: usize) -> usize {
    match values_per_word(bits) {
        0 => 0,
        per_word => len.div_ceil(per_word),
    }
}

/// The narrowest supported width able to index `palette_len` entries.
pub fn bits_for_palette_len(palette_len: usize) -> u8 {
    if palette_len <= 1 {
        return 0;
    }
    VALID_BITS
        .iter()
        .copied()
        .find(|&bits| bits > 0 && (1usize << bits) >= palette_len)
        .unwrap_or(16)
}

/// Fixed-length array of `bits`-wide unsigned values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitPackedArray {
    words: Vec<u32>,
    bits: u8,
    len: usize,
}

impl BitPackedArray {
    /// `len` zeroed values at the given width. `bits` must satisfy [`is_valid_bits`].
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(is_valid_bits(bits), "unsupported width {bits}");
        Self {
            words: vec![0u32; word_count(bits, len)],
            bits,
            len,
        }
    }

    /// Wraps existing words. Returns `None` when the word count does not match
    /// `bits` and `len`.
    pub fn from_words(bits: u8, len: usize, words: Vec<u32>) -> Option<Self> {
        if !is_valid_bits(bits) || words.len() != word_count(bits, len) {
            return None;
        }
        Some(Self { words, bits, len })
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        let per_word = values_per_word(self.bits);
        let word = index / per_word;
        let shift = ((index % per_word) * usize::from(self.bits)) as u32;
        (word, shift)
    }

    #[inline]
    fn mask(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        }
    }

    pub fn get(&self, index: usize) -> u16 {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return 0;
        }
        let (word, shift) = self.locate(index);
        ((self.words[word] >> shift) & self.mask()) as u16
    }

    pub fn set(&mut self, index: usize, value: u16) {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return;
        }
        let mask = self.mask();
        debug_assert!(
            u32::from(value) <= mask,
            "value {value} exceeds {}-bit capacity",
            self.bits
        );
        let (word, shift) = self.locate(index);
        self.words[word] = (self.words[word] & !(mask << shift)) | ((u32::from(value) & mask) << shift);
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Words as little-endian bytes, the on-wire form.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
