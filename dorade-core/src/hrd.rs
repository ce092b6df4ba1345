//! HRD run-length compression of 16-bit sample arrays.
//!
//! The encoded stream is a sequence of runs, each introduced by a code
//! word. When the high bit (`SIGN16`) is set, the low 15 bits count
//! verbatim samples that follow. Otherwise they count repetitions of the
//! missing-data flag and no payload follows. The code word `1` ends the
//! stream.

use crate::crackers::ByteOrder;

/// High bit of a code word: a data run follows
pub const SIGN16: u16 = 0x8000;

/// Terminating code word
pub const END_OF_COMPRESSION: u16 = 1;

/// Compress `src`, treating `flag` as the missing-data value.
///
/// Runs of two or more flags become flag runs. Everything else is kept
/// in data runs, including isolated single flags. Sample arrays are
/// limited to `0x7fff` elements by the code word format.
pub fn compress(src: &[u16], flag: u16) -> Vec<u16> {
    let n = src.len();
    let mut dst = Vec::with_capacity(n + n / 2 + 4);

    if n < 2 {
        // A one-sample flag run would collide with the end marker
        if let Some(&v) = src.first() {
            dst.push(SIGN16 | 1);
            dst.push(v);
        }
        dst.push(END_OF_COMPRESSION);
        return dst;
    }

    let end = n - 1;
    let mut ss = 0usize;
    let mut kount = 0usize;
    let mut data_run = false;
    let mut rlcode = 0usize;

    while ss < end {
        // Each run is classified by its first two values
        kount = 2;
        rlcode = dst.len();
        dst.push(0);
        if src[ss + 1] != flag || src[ss] != flag {
            data_run = true;
            dst.push(src[ss]);
            dst.push(src[ss + 1]);
        } else {
            data_run = false;
        }
        ss += 2;

        while ss < end {
            if data_run {
                if src[ss - 1] == flag && src[ss] == flag && kount > 2 {
                    // Two flags in a row end the data run; the first of
                    // them starts the next flag run
                    kount -= 1;
                    dst[rlcode] = SIGN16 | kount as u16;
                    dst.pop();
                    ss -= 1;
                    break;
                }
                kount += 1;
                dst.push(src[ss]);
                ss += 1;
            } else {
                if src[ss] != flag {
                    dst[rlcode] = kount as u16;
                    break;
                }
                ss += 1;
                kount += 1;
            }
        }
    }

    // The last element, if the final run has not consumed it already
    if data_run {
        if ss == end {
            dst.push(src[ss]);
            kount += 1;
        }
        dst[rlcode] = SIGN16 | kount as u16;
    } else if ss > end {
        dst[rlcode] = kount as u16;
    } else if src[ss] == flag {
        dst[rlcode] = (kount + 1) as u16;
    } else if kount == 2 {
        dst[rlcode] = SIGN16 | 3;
        dst.extend_from_slice(&[flag, flag, src[ss]]);
    } else {
        dst[rlcode] = (kount - 1) as u16;
        dst.extend_from_slice(&[SIGN16 | 2, flag, src[ss]]);
    }
    dst.push(END_OF_COMPRESSION);
    dst
}

/// Result of expanding an HRD stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Decoded samples, in host order
    pub samples: Vec<u16>,
    /// Length of the final run if it was a flag run, otherwise 0
    pub empty_run: usize,
    /// Set when a run would have exceeded `wmax` or the input ended
    /// before the terminating code word
    pub overflow: bool,
}

impl Expansion {
    /// Number of 16-bit words produced
    pub fn words(&self) -> usize {
        self.samples.len()
    }
}

/// Expand an HRD stream stored as raw bytes in `order`.
///
/// Decoding stops at the end marker. A run that would push the output
/// past `wmax` words marks the stream corrupt. Decoding then stops and the
/// prefix decoded so far is kept.
pub fn decompress(bytes: &[u8], order: ByteOrder, flag: u16, wmax: usize) -> Expansion {
    let mut samples = Vec::with_capacity(wmax);
    let mut empty_run = 0;
    let mut overflow = false;
    let mut words = bytes.chunks_exact(2).map(|w| order.read_u16([w[0], w[1]]));

    loop {
        let Some(code) = words.next() else {
            overflow = true;
            break;
        };
        if code == END_OF_COMPRESSION {
            break;
        }
        let n = (code & 0x7fff) as usize;
        if samples.len() + n > wmax {
            overflow = true;
            break;
        }

        if code & SIGN16 != 0 {
            empty_run = 0;
            let before = samples.len();
            samples.extend(words.by_ref().take(n));
            if samples.len() - before < n {
                overflow = true;
                break;
            }
        } else {
            empty_run = n;
            samples.resize(samples.len() + n, flag);
        }
    }

    Expansion {
        samples,
        empty_run,
        overflow,
    }
}

/// Encode compressed words as bytes in `order`
pub fn words_to_bytes(words: &[u16], order: ByteOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 2);
    for w in words {
        let v = if order.is_swapped() { w.swap_bytes() } else { *w };
        out.extend_from_slice(&v.to_ne_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAG: u16 = 0x8000;

    fn round_trip(x: &[u16]) -> Vec<u16> {
        let packed = compress(x, FLAG);
        let bytes = words_to_bytes(&packed, ByteOrder::Native);
        let out = decompress(&bytes, ByteOrder::Native, FLAG, x.len());
        assert!(!out.overflow, "overflow decoding {:?}", x);
        out.samples
    }

    #[test]
    fn test_all_flag_array() {
        let x = vec![FLAG; 100];
        let packed = compress(&x, FLAG);
        assert_eq!(packed, vec![100, END_OF_COMPRESSION]);
        assert_eq!(round_trip(&x), x);
    }

    #[test]
    fn test_flag_free_array() {
        let x: Vec<u16> = (0..50).collect();
        let packed = compress(&x, FLAG);
        assert_eq!(packed[0], SIGN16 | 50);
        assert_eq!(packed.len(), 52);
        assert_eq!(round_trip(&x), x);
    }

    #[test]
    fn test_flag_run_then_single_value() {
        let x = vec![FLAG, FLAG, FLAG, FLAG, 7];
        let packed = compress(&x, FLAG);
        assert_eq!(packed, vec![3, SIGN16 | 2, FLAG, 7, END_OF_COMPRESSION]);
        assert_eq!(round_trip(&x), x);
    }

    #[test]
    fn test_two_flags_then_single_value() {
        let x = vec![FLAG, FLAG, 9];
        let packed = compress(&x, FLAG);
        assert_eq!(packed, vec![SIGN16 | 3, FLAG, FLAG, 9, END_OF_COMPRESSION]);
        assert_eq!(round_trip(&x), x);
    }

    #[test]
    fn test_flag_run_ending_on_last_element() {
        let x = vec![5, 6, FLAG, FLAG];
        assert_eq!(round_trip(&x), x);
        let x = vec![5, 6, 7, FLAG, FLAG, FLAG];
        assert_eq!(round_trip(&x), x);
    }

    #[test]
    fn test_short_arrays() {
        assert_eq!(round_trip(&[]), Vec::<u16>::new());
        assert_eq!(round_trip(&[FLAG]), vec![FLAG]);
        assert_eq!(round_trip(&[3]), vec![3]);
        assert_eq!(round_trip(&[FLAG, FLAG]), vec![FLAG, FLAG]);
        assert_eq!(round_trip(&[FLAG, 1]), vec![FLAG, 1]);
    }

    #[test]
    fn test_mixed_patterns() {
        // Exhaustive over all 4096 arrays of length 12 drawn from {FLAG, 1}
        for bits in 0u32..(1 << 12) {
            let x: Vec<u16> = (0..12)
                .map(|i| if bits & (1 << i) != 0 { FLAG } else { 1 })
                .collect();
            assert_eq!(round_trip(&x), x);
        }
    }

    #[test]
    fn test_swapped_stream() {
        let x = vec![10, 20, FLAG, FLAG, FLAG, 30, 40];
        let packed = compress(&x, FLAG);
        let bytes = words_to_bytes(&packed, ByteOrder::Swapped);
        let out = decompress(&bytes, ByteOrder::Swapped, FLAG, x.len());
        assert_eq!(out.samples, x);
        assert_eq!(out.empty_run, 0);
    }

    #[test]
    fn test_trailing_empty_run_reported() {
        let x = vec![1, 2, 3, FLAG, FLAG, FLAG, FLAG];
        let bytes = words_to_bytes(&compress(&x, FLAG), ByteOrder::Native);
        let out = decompress(&bytes, ByteOrder::Native, FLAG, 100);
        assert_eq!(out.samples, x);
        assert_eq!(out.empty_run, 4);
    }

    #[test]
    fn test_overflow_keeps_prefix() {
        let x = vec![1, 2, 3, FLAG, FLAG, FLAG, FLAG];
        let bytes = words_to_bytes(&compress(&x, FLAG), ByteOrder::Native);
        let out = decompress(&bytes, ByteOrder::Native, FLAG, 5);
        assert!(out.overflow);
        assert_eq!(out.samples, vec![1, 2, 3]);
        assert_eq!(out.words(), 3);
    }

    #[test]
    fn test_missing_terminator_is_corrupt() {
        let bytes = words_to_bytes(&[SIGN16 | 2, 4, 5], ByteOrder::Native);
        let out = decompress(&bytes, ByteOrder::Native, FLAG, 10);
        assert!(out.overflow);
        assert_eq!(out.samples, vec![4, 5]);
    }
}
