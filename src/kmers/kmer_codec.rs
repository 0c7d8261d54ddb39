use crate::kmers::errors::{KmerBinError, KmerBinResult};

pub const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Longest k-mer that still fits a single `u64` key (2 bits per base).
pub const MAX_K: usize = 32;

/// One fully-specified 2-bit encoder/decoder for a particular k.
///
/// The k-mer length is carried explicitly by every caller; there is no
/// process-wide "current k", so passes with different k can run side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KmerSpec {
    /// Window length
    k: usize,
    /// Mask covering the `2k` low bits of a key
    mask: u64,
}

impl KmerSpec {
    pub fn new(k: usize) -> KmerBinResult<Self> {
        if k < 1 || k > MAX_K {
            return Err(KmerBinError::Config(format!(
                "k-mer size {k} is out of range. Must be within 1..={MAX_K}"
            )));
        }
        let mask = if k == MAX_K {
            u64::MAX
        } else {
            (1u64 << (2 * k)) - 1
        };
        Ok(KmerSpec { k, mask })
    }

    /// Build the spec from a hash header key width (two bits per base).
    pub fn from_key_len_bits(key_len_bits: u32) -> KmerBinResult<Self> {
        if key_len_bits == 0 || key_len_bits % 2 != 0 {
            return Err(KmerBinError::Format(format!(
                "key length of {key_len_bits} bits is not a positive even number"
            )));
        }
        Self::new((key_len_bits / 2) as usize)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn key_len_bits(&self) -> u32 {
        (2 * self.k) as u32
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Encode exactly `k` bases. Returns `None` when the slice has the wrong
    /// length or contains anything other than A/C/G/T.
    pub fn encode(&self, seq: &[u8]) -> Option<u64> {
        if seq.len() != self.k {
            return None;
        }
        let mut code = 0u64;
        for &b in seq {
            let v = encode_base(b);
            if v == INVALID {
                return None;
            }
            code = (code << 2) | v;
        }
        Some(code)
    }

    /// Decode a code back to its k-mer string.
    pub fn decode(&self, code: u64) -> String {
        let mut buf = vec!['A'; self.k];
        let mut tmp = code & self.mask;
        for pos in (0..self.k).rev() {
            buf[pos] = BASES[(tmp & 0b11) as usize];
            tmp >>= 2;
        }
        buf.into_iter().collect()
    }

    /// Reverse complement of an encoded k-mer.
    #[inline]
    pub fn reverse_complement(&self, code: u64) -> u64 {
        // Complement every base (A<->T, C<->G is `3 - b`, i.e. bitwise not),
        // then reverse the order of the 2-bit groups.
        let mut x = !code;
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        x = x.swap_bytes();
        x >> (64 - 2 * self.k)
    }

    /// The numerically smaller of a k-mer and its reverse complement.
    #[inline]
    pub fn canonical(&self, code: u64) -> u64 {
        code.min(self.reverse_complement(code))
    }

    /// Number of G/C bases in an encoded k-mer.
    #[inline]
    pub fn gc_count(&self, code: u64) -> u32 {
        // C = 01 and G = 10 are exactly the bases whose two bits differ
        ((code ^ (code >> 1)) & 0x5555_5555_5555_5555 & self.mask).count_ones()
    }

    /// Iterate every valid k-mer of `seq` as `(position, code)`.
    /// Windows containing a non-ACGT base are skipped.
    pub fn kmers<'a>(&self, seq: &'a [u8]) -> KmerIter<'a> {
        KmerIter {
            seq,
            pos: 0,
            code: 0,
            valid: 0,
            spec: *self,
        }
    }
}

/// Rolling 2-bit k-mer iterator over a raw sequence.
pub struct KmerIter<'a> {
    seq: &'a [u8],
    pos: usize,
    code: u64,
    valid: usize,
    spec: KmerSpec,
}

impl Iterator for KmerIter<'_> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.seq.len() {
            let v = encode_base(self.seq[self.pos]);
            self.pos += 1;
            if v == INVALID {
                self.valid = 0;
                self.code = 0;
                continue;
            }
            self.code = ((self.code << 2) | v) & self.spec.mask;
            self.valid += 1;
            if self.valid >= self.spec.k {
                return Some((self.pos - self.spec.k, self.code));
            }
        }
        None
    }
}

const INVALID: u64 = 4;

/// Static ASCII→2-bit lookup table.
/// 0 = A, 1 = C, 2 = G, 3 = T, 4 = N/other
static LUT: [u8; 256] = {
    const N: u8 = 4;
    let mut t = [N; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t
};

/// Encode a single nucleotide into its 2-bit value.
///
/// - A or a → 0
/// - C or c → 1
/// - G or g → 2
/// - T or t → 3
/// - anything else → 4
#[inline(always)]
pub fn encode_base(b: u8) -> u64 {
    LUT[b as usize] as u64
}
