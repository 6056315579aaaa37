//! Flag-byte codec for Jaguar lineage lumps
//!
//! The simpler of the two lump codecs, carried over from the Jaguar family
//! of ports.  Eight commands share one flag byte, consumed least
//! significant bit first: a clear bit introduces a raw byte, a set bit a
//! two byte back reference holding a 12 bit distance field and a 4 bit
//! length nibble.  Copies run byte by byte out of the expanded output
//! itself, so a reference may overlap the write cursor and repeat a short
//! run.  A zero length nibble terminates the stream.

use crate::Error;

const WIN_SIZE: usize = 4096;
const MIN_MATCH: usize = 2;
const MAX_MATCH: usize = 16;

fn fetch(ibuf: &[u8],ptr: &mut usize) -> Result<u8,Error> {
    match ibuf.get(*ptr) {
        Some(c) => {
            *ptr += 1;
            Ok(*c)
        },
        None => Err(Error::InputExhausted)
    }
}

/// Expand one lump.  `expected` is the expanded size recorded in the
/// archive directory; producing more than that is an error.
pub fn expand(ibuf: &[u8],expected: usize) -> Result<Vec<u8>,Error> {
    let mut ans: Vec<u8> = Vec::with_capacity(expected);
    let mut ptr: usize = 0;
    let mut flags: u8 = 0;
    let mut live_bits = 0;
    loop {
        if live_bits == 0 {
            flags = fetch(ibuf,&mut ptr)?;
            live_bits = 8;
        }
        if flags & 1 > 0 {
            let hi = fetch(ibuf,&mut ptr)? as usize;
            let lo = fetch(ibuf,&mut ptr)? as usize;
            let len = (lo & 0x0f) + 1;
            if len == 1 {
                break;
            }
            let dist = (hi << 4 | lo >> 4) + 1;
            if dist > ans.len() {
                return Err(Error::BadBackReference);
            }
            let src = ans.len() - dist;
            for i in 0..len {
                if ans.len() == expected {
                    return Err(Error::OutputOverflow);
                }
                let c = ans[src + i];
                ans.push(c);
            }
        } else {
            if ans.len() == expected {
                return Err(Error::OutputOverflow);
            }
            ans.push(fetch(ibuf,&mut ptr)?);
        }
        flags >>= 1;
        live_bits -= 1;
    }
    Ok(ans)
}

/// Compress one lump.  This cannot fail, although the result can be
/// larger than the input when the input is incompressible.
pub fn compress(ibuf: &[u8]) -> Vec<u8> {
    let mut ans: Vec<u8> = Vec::new();
    let mut group: Vec<u8> = Vec::new();
    let mut flags: u8 = 0;
    let mut count: usize = 0;
    let mut ptr: usize = 0;
    while ptr < ibuf.len() {
        match find_match(ibuf,ptr) {
            Some((len,dist)) => {
                let field = dist - 1;
                flags |= 1 << count;
                group.push((field >> 4) as u8);
                group.push(((field & 0x0f) << 4 | (len - 1)) as u8);
                ptr += len;
            },
            None => {
                group.push(ibuf[ptr]);
                ptr += 1;
            }
        };
        count += 1;
        if count == 8 {
            ans.push(flags);
            ans.append(&mut group);
            flags = 0;
            count = 0;
        }
    }
    // terminator: a flagged reference with a zero length nibble
    flags |= 1 << count;
    group.push(0);
    group.push(0);
    ans.push(flags);
    ans.append(&mut group);
    ans
}

/// longest, then nearest, match to `ibuf[ptr..]` within the last WIN_SIZE
/// bytes of output; the source may overlap the bytes being produced
fn find_match(ibuf: &[u8],ptr: usize) -> Option<(usize,usize)> {
    let max_len = MAX_MATCH.min(ibuf.len() - ptr);
    if max_len < MIN_MATCH {
        return None;
    }
    let mut best: Option<(usize,usize)> = None;
    for dist in 1..=WIN_SIZE.min(ptr) {
        let mut len = 0;
        while len < max_len && ibuf[ptr - dist + len] == ibuf[ptr + len] {
            len += 1;
        }
        if len >= MIN_MATCH && best.map_or(true,|(b,_)| len > b) {
            best = Some((len,dist));
            if len == max_len {
                break;
            }
        }
    }
    best
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
    let compressed = compress(&[]);
    assert_eq!(compressed,vec![0x01,0x00,0x00]);
    assert_eq!(expand(&compressed,0).unwrap(),Vec::<u8>::new());
}

#[test]
fn text_roundtrip() {
    let dat = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress(dat);
    assert!(compressed.len() < dat.len());
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat.to_vec());
}

#[test]
fn overlapping_run() {
    // a distance of 1 repeats the byte just written
    let dat = vec![b'Q';300];
    let compressed = compress(&dat);
    assert!(compressed.len() < 60);
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn pseudorandom_4k() {
    let mut state: u32 = 7;
    let dat: Vec<u8> = (0..4096).map(|_| prng(&mut state) as u8).collect();
    let compressed = compress(&dat);
    assert_eq!(expand(&compressed,dat.len()).unwrap(),dat);
}

#[test]
fn truncation_is_detected() {
    let dat = "a stream with no terminator".as_bytes();
    let compressed = compress(dat);
    assert_eq!(expand(&compressed[0..compressed.len()-3],dat.len()),Err(Error::InputExhausted));
}

#[test]
fn bad_reference_is_detected() {
    // a reference into output that does not exist yet
    assert_eq!(expand(&[0x01,0xff,0x1f],100),Err(Error::BadBackReference));
}

#[test]
fn oversized_stream_is_detected() {
    let dat = "abcdef".as_bytes();
    let compressed = compress(dat);
    assert_eq!(expand(&compressed,3),Err(Error::OutputOverflow));
}
