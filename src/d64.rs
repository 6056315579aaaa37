//! Adaptive Huffman codec for Doom 64 lumps
//!
//! This is the scheme applied to most compressed lumps in the N64 archive.
//! It pairs an adaptive Huffman code over 629 symbols (a terminator, 256
//! literals, and 372 match codes) with a 21903 byte history window.  A match
//! code fixes the copy length and one of six offset ranges; the offset
//! itself follows as a plain field of 4 to 14 bits, so the inner decode
//! loop never entropy-decodes a distance.  Since the tree adapts as symbols
//! arrive there is no code table in the stream, which matters at the small
//! per-lump sizes involved.
//!
//! Wire format notes: code bits are packed most significant bit first
//! within each byte, offset fields least significant bit first, and the
//! final byte is padded with zero bits after the terminator.  Both
//! directions run the identical tree update on every symbol, including the
//! terminator, so a decoder tracks the coder exactly.

use bit_vec::BitVec;
use crate::tools::ring_buffer::*;
use crate::tools::adaptive_huff::*;
use crate::Error;

// window and match coding constants

const WIN_SIZE: usize = 0x558f; // sliding window, also the largest back distance
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 64;
const SEARCH_DEPTH: usize = 1024; // how far behind the cursor the match search reaches
const PRELUDE: usize = 14; // bytes sent raw before any match is attempted

// symbol space, as numbered by `AdaptiveHuffman`

const END_OF_STREAM: usize = 0;
const FIRST_LITERAL: usize = 1;
const FIRST_MATCH: usize = 257;
const CODES_PER_RANGE: usize = 62; // one code per length 3..=64

/// width of the offset field for each length range
const SHIFT_TABLE: [usize;6] = [4,6,8,10,12,14];
/// smallest offset (less the match length) served by each length range
const BASE_TABLE: [usize;6] = [0,16,80,336,1360,5456];

/// Expand one lump.  `expected` is the expanded size recorded in the
/// archive directory; producing more than that is an error, as is running
/// out of input before the terminator.
pub fn expand(ibuf: &[u8],expected: usize) -> Result<Vec<u8>,Error> {
    let mut huff = AdaptiveHuffman::create(ibuf.to_vec());
    huff.start_huff();
    let mut window: RingBuffer<u8> = RingBuffer::create(WIN_SIZE);
    let mut ans: Vec<u8> = Vec::with_capacity(expected);
    loop {
        if huff.exhausted() {
            return Err(Error::InputExhausted);
        }
        let symb = huff.decode_symbol();
        if symb == END_OF_STREAM {
            break;
        }
        if symb < FIRST_MATCH {
            if ans.len() == expected {
                return Err(Error::OutputOverflow);
            }
            let c = (symb - FIRST_LITERAL) as u8;
            ans.push(c);
            window.push(c);
        } else if symb < NUM_SYMB {
            let m = symb - FIRST_MATCH;
            let len = m % CODES_PER_RANGE + MIN_MATCH;
            let range = m / CODES_PER_RANGE;
            let extra = huff.get_bits(SHIFT_TABLE[range]);
            let dist = BASE_TABLE[range] + extra + len;
            // a distance of the full window size lands the source on the
            // cursor itself, re-reading slots as the copy fills them
            let src = window.pos() + WIN_SIZE - dist;
            for i in 0..len {
                if ans.len() == expected {
                    return Err(Error::OutputOverflow);
                }
                let c = window.get_abs(src + i);
                ans.push(c);
                window.push(c);
            }
        } else {
            return Err(Error::InvalidSymbol);
        }
    }
    Ok(ans)
}

/// Compress one lump.  This cannot fail, although the result can be
/// larger than the input when the input is incompressible.
pub fn compress(ibuf: &[u8]) -> Vec<u8> {
    let mut obuf = BitVec::new();
    let mut huff = AdaptiveHuffman::create(Vec::new());
    huff.start_huff();
    let mut window: RingBuffer<u8> = RingBuffer::create(WIN_SIZE);
    let mut ptr: usize = 0;
    // the first bytes always go out raw to prime the window
    while ptr < ibuf.len() && ptr < PRELUDE {
        huff.encode_symbol(FIRST_LITERAL + ibuf[ptr] as usize,&mut obuf);
        window.push(ibuf[ptr]);
        ptr += 1;
    }
    while ptr < ibuf.len() {
        let coded = match find_match(&window,ibuf,ptr) {
            Some((len,dist)) => match emit_match(&mut huff,&window,&ibuf[ptr..ptr+len],dist,&mut obuf) {
                true => len,
                false => 0
            },
            None => 0
        };
        if coded > 0 {
            for i in 0..coded {
                window.push(ibuf[ptr+i]);
            }
            ptr += coded;
        } else {
            huff.encode_symbol(FIRST_LITERAL + ibuf[ptr] as usize,&mut obuf);
            window.push(ibuf[ptr]);
            ptr += 1;
        }
    }
    huff.encode_symbol(END_OF_STREAM,&mut obuf);
    obuf.to_bytes()
}

/// the length range whose offset field can carry this distance code
fn range_for(code: usize) -> Option<usize> {
    for r in 0..SHIFT_TABLE.len() {
        if code < BASE_TABLE[r] + (1 << SHIFT_TABLE[r]) {
            return Some(r);
        }
    }
    None
}

/// Greedy search for the longest match to `ibuf[ptr..]` in the window,
/// taking the most recent among equals.  Returns (length, back distance
/// to the start of the match).  The search reaches no deeper than
/// SEARCH_DEPTH bytes behind the cursor and never behind the start of
/// the stream.
fn find_match(window: &RingBuffer<u8>,ibuf: &[u8],ptr: usize) -> Option<(usize,usize)> {
    let max_len = MAX_MATCH.min(ibuf.len() - ptr);
    if max_len < MIN_MATCH {
        return None;
    }
    let head = window.pos() + WIN_SIZE; // keep the subtractions positive
    let mut best: Option<(usize,usize)> = None;
    let deepest = ptr.min(MAX_MATCH + SEARCH_DEPTH);
    for dist in MIN_MATCH..=deepest {
        // the source must lie entirely behind the cursor
        let cap = max_len.min(dist);
        let mut len = 0;
        while len < cap && window.get_abs(head - dist + len) == ibuf[ptr + len] {
            len += 1;
        }
        if len >= MIN_MATCH && dist - len <= SEARCH_DEPTH {
            if best.map_or(true,|(b,_)| len > b) {
                best = Some((len,dist));
                if len == max_len {
                    break;
                }
            }
        }
    }
    best
}

/// Encode one match: pick the length range, check that the offset field
/// can carry the distance, and replay the copy against the window to be
/// sure a decoder would reproduce `src` exactly.  Returns false if the
/// match had to be abandoned, in which case nothing was written and the
/// caller falls back to a literal.
fn emit_match(huff: &mut AdaptiveHuffman,window: &RingBuffer<u8>,src: &[u8],dist: usize,obuf: &mut BitVec) -> bool {
    let len = src.len();
    let code = dist - len;
    let range = match range_for(code) {
        Some(r) => r,
        None => return false
    };
    let extra = code - BASE_TABLE[range];
    if extra >= 1 << SHIFT_TABLE[range] {
        return false;
    }
    let from = window.pos() + WIN_SIZE - dist;
    for i in 0..len {
        if window.get_abs(from + i) != src[i] {
            return false;
        }
    }
    huff.encode_symbol(FIRST_MATCH + range*CODES_PER_RANGE + (len - MIN_MATCH),obuf);
    huff.put_bits(extra,SHIFT_TABLE[range],obuf);
    true
}

#[cfg(test)]
fn prng(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

#[test]
fn empty_stream() {
    // nothing but the terminator code out of the starting tree
    let compressed = compress(&[]);
    assert_eq!(compressed,hex::decode("3a80").unwrap());
    assert_eq!(expand(&compressed,0).unwrap(),Vec::<u8>::new());
}

#[test]
fn tiny_inputs() {
    for dat in [b"A".to_vec(),b"wad".to_vec(),b"12345678901234".to_vec()] {
        let compressed = compress(&dat);
        assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
    }
}

#[test]
fn run_of_identical_bytes() {
    // matches here copy a source that ends at the cursor
    let dat = vec![b'Z';300];
    let compressed = compress(&dat);
    assert!(compressed.len() < 60);
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn text_roundtrip() {
    let dat = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress(dat);
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat.to_vec());
}

#[test]
fn repetitive_text_roundtrip() {
    // long enough to halve the counts several times, varied enough to
    // use the deeper offset ranges
    let mut dat = Vec::new();
    let mut i: usize = 0;
    while dat.len() < 20000 {
        dat.extend(format!("sector {} has a secret exit; ",i*31 % 1000).bytes());
        i += 1;
    }
    let compressed = compress(&dat);
    assert!(compressed.len() < dat.len());
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn pseudorandom_8k() {
    let mut state: u32 = 1;
    let dat: Vec<u8> = (0..8192).map(|_| prng(&mut state) as u8).collect();
    let compressed = compress(&dat);
    // uniform bytes cannot shrink under a 9-bit-average literal code
    assert!(compressed.len() > dat.len());
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn incompressible_30k() {
    let mut state: u32 = 99;
    let dat: Vec<u8> = (0..30000).map(|_| prng(&mut state) as u8).collect();
    let compressed = compress(&dat);
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn truncation_is_detected() {
    let dat = "The chaunt of the priests of Mung.".as_bytes();
    let compressed = compress(dat);
    assert_eq!(expand(&compressed[0..1],dat.len()),Err(Error::InputExhausted));
}

#[test]
fn oversized_stream_is_detected() {
    let dat = "abcdef".as_bytes();
    let compressed = compress(dat);
    assert_eq!(expand(&compressed,3),Err(Error::OutputOverflow));
}
