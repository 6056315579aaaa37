//! WAD archive reading and writing
//!
//! The N64 archive keeps the usual IWAD/PWAD layout: a 12 byte header,
//! lump data, and a 16 byte directory entry per lump.  A set high bit on
//! the first character of a lump name marks the lump as compressed; the
//! directory records the expanded size, so the stored extent of a
//! compressed lump runs to the next file position (or to the directory).
//! The codec's own terminator governs within that extent.
//!
//! The transforms here rebuild the archive from scratch: header, lump
//! data in directory order, directory last.  `pad` rebuilds with every
//! lump and the directory starting on a four byte boundary, which is how
//! the ROM expects to map the archive.

use crate::{d64,jaguar,Error};

const HEADER_SIZE: usize = 12;
const ENTRY_SIZE: usize = 16;
const NAME_SIZE: usize = 8;
const COMPRESSED_FLAG: u8 = 0x80;

/// which codec the driver applies to flagged lumps
#[derive(Clone,Copy,PartialEq)]
pub enum Codec {
    D64,
    Jaguar
}

impl Codec {
    pub fn expand(&self,ibuf: &[u8],expected: usize) -> Result<Vec<u8>,Error> {
        match self {
            Codec::D64 => d64::expand(ibuf,expected),
            Codec::Jaguar => jaguar::expand(ibuf,expected)
        }
    }
    pub fn compress(&self,ibuf: &[u8]) -> Vec<u8> {
        match self {
            Codec::D64 => d64::compress(ibuf),
            Codec::Jaguar => jaguar::compress(ibuf)
        }
    }
}

/// One directory entry together with its stored bytes
pub struct Lump {
    pub name: [u8;NAME_SIZE],
    /// expanded size as recorded in the directory
    pub size: u32,
    pub compressed: bool,
    /// bytes as stored in the archive, compressed or not
    pub data: Vec<u8>
}

impl Lump {
    pub fn new(name: &str,dat: Vec<u8>) -> Self {
        let mut padded = [0u8;NAME_SIZE];
        for (i,c) in name.bytes().take(NAME_SIZE).enumerate() {
            padded[i] = c;
        }
        Self {
            name: padded,
            size: dat.len() as u32,
            compressed: false,
            data: dat
        }
    }
    /// printable name, trailing NULs removed
    pub fn title(&self) -> String {
        let end = self.name.iter().position(|c| *c==0).unwrap_or(NAME_SIZE);
        String::from_utf8_lossy(&self.name[0..end]).to_string()
    }
}

pub struct Wad {
    pub magic: [u8;4],
    pub lumps: Vec<Lump>
}

fn get_u32(dat: &[u8],off: usize) -> Result<u32,Error> {
    match dat.get(off..off+4) {
        Some(s) => Ok(u32::from_le_bytes([s[0],s[1],s[2],s[3]])),
        None => Err(Error::BadDirectory)
    }
}

impl Wad {
    pub fn parse(dat: &[u8]) -> Result<Self,Error> {
        if dat.len() < HEADER_SIZE {
            return Err(Error::FileFormatMismatch);
        }
        let magic = [dat[0],dat[1],dat[2],dat[3]];
        if &magic != b"IWAD" && &magic != b"PWAD" {
            return Err(Error::FileFormatMismatch);
        }
        let count = get_u32(dat,4)? as usize;
        let dir_off = get_u32(dat,8)? as usize;
        if count > dat.len()/ENTRY_SIZE || dir_off < HEADER_SIZE || dir_off + count*ENTRY_SIZE > dat.len() {
            return Err(Error::BadDirectory);
        }
        // every file position in the archive, used to bound the stored
        // extent of a compressed lump
        let mut marks: Vec<usize> = Vec::new();
        for i in 0..count {
            marks.push(get_u32(dat,dir_off + i*ENTRY_SIZE)? as usize);
        }
        marks.push(dir_off);
        marks.push(dat.len());
        marks.sort();
        let mut lumps = Vec::new();
        for i in 0..count {
            let entry = dir_off + i*ENTRY_SIZE;
            let pos = get_u32(dat,entry)? as usize;
            let size = get_u32(dat,entry+4)?;
            let mut name: [u8;NAME_SIZE] = [0;NAME_SIZE];
            name.copy_from_slice(&dat[entry+8..entry+ENTRY_SIZE]);
            let compressed = name[0] & COMPRESSED_FLAG > 0;
            name[0] &= !COMPRESSED_FLAG;
            let end = match compressed && size > 0 {
                true => marks.iter().cloned().find(|m| *m > pos).unwrap_or(dat.len()),
                false => pos + size as usize
            };
            if pos > end || end > dat.len() {
                return Err(Error::BadDirectory);
            }
            lumps.push(Lump {
                name,
                size,
                compressed,
                data: dat[pos..end].to_vec()
            });
        }
        Ok(Self { magic, lumps })
    }
    /// Serialize the archive.  `align` is 1 for the tight layout, or 4 to
    /// start every lump and the directory on a four byte boundary.
    pub fn build(&self,align: usize) -> Vec<u8> {
        let mut ans: Vec<u8> = Vec::new();
        ans.extend(self.magic);
        ans.extend(u32::to_le_bytes(self.lumps.len() as u32));
        ans.extend([0;4]); // directory offset, patched once known
        let mut positions: Vec<u32> = Vec::new();
        for lump in &self.lumps {
            while ans.len() % align > 0 {
                ans.push(0);
            }
            positions.push(ans.len() as u32);
            ans.extend(&lump.data);
        }
        while ans.len() % align > 0 {
            ans.push(0);
        }
        let dir_off = ans.len() as u32;
        for (i,lump) in self.lumps.iter().enumerate() {
            ans.extend(u32::to_le_bytes(positions[i]));
            ans.extend(u32::to_le_bytes(lump.size));
            let mut name = lump.name;
            if lump.compressed {
                name[0] |= COMPRESSED_FLAG;
            }
            ans.extend(name);
        }
        ans[8..12].copy_from_slice(&u32::to_le_bytes(dir_off));
        ans
    }
}

/// Expand every flagged lump with the given codec and repack the archive
pub fn decompress(dat: &[u8],codec: Codec) -> Result<Vec<u8>,Error> {
    let mut wad = Wad::parse(dat)?;
    let mut touched = 0;
    for lump in &mut wad.lumps {
        if !lump.compressed {
            continue;
        }
        let expanded = match lump.size {
            0 => Vec::new(),
            _ => codec.expand(&lump.data,lump.size as usize)?
        };
        log::debug!("{}: {} -> {} bytes",lump.title(),lump.data.len(),expanded.len());
        if expanded.len() != lump.size as usize {
            log::warn!("{}: expanded to {} bytes, directory says {}",lump.title(),expanded.len(),lump.size);
            lump.size = expanded.len() as u32;
        }
        lump.data = expanded;
        lump.compressed = false;
        touched += 1;
    }
    log::info!("expanded {} of {} lumps",touched,wad.lumps.len());
    Ok(wad.build(1))
}

/// Compress every lump that shrinks under the given codec and repack the archive
pub fn compress(dat: &[u8],codec: Codec) -> Result<Vec<u8>,Error> {
    let mut wad = Wad::parse(dat)?;
    let mut touched = 0;
    for lump in &mut wad.lumps {
        if lump.compressed || lump.data.is_empty() {
            continue;
        }
        let packed = codec.compress(&lump.data);
        if packed.len() < lump.data.len() {
            log::debug!("{}: {} -> {} bytes",lump.title(),lump.data.len(),packed.len());
            lump.size = lump.data.len() as u32;
            lump.data = packed;
            lump.compressed = true;
            touched += 1;
        } else {
            log::debug!("{}: left alone, no gain",lump.title());
        }
    }
    log::info!("compressed {} of {} lumps",touched,wad.lumps.len());
    Ok(wad.build(1))
}

/// Re-serialize so every lump and the directory start on a four byte boundary
pub fn pad(dat: &[u8]) -> Result<Vec<u8>,Error> {
    let wad = Wad::parse(dat)?;
    Ok(wad.build(4))
}

/// one printable row per lump
pub fn catalog(dat: &[u8]) -> Result<Vec<String>,Error> {
    let wad = Wad::parse(dat)?;
    Ok(wad.lumps.iter().map(|lump| {
        format!("{:<8} {:>9} {}",lump.title(),lump.size,match lump.compressed {
            true => "packed",
            false => ""
        })
    }).collect())
}

#[cfg(test)]
fn sample() -> Wad {
    let mut texture = Vec::new();
    for i in 0..2000 {
        texture.push((i % 251) as u8);
    }
    Wad {
        magic: *b"IWAD",
        lumps: vec![
            Lump::new("MAP01",Vec::new()),
            Lump::new("THINGS",b"short".to_vec()),
            Lump::new("TEXTURE1",texture)
        ]
    }
}

#[test]
fn parse_and_build() {
    let wad = sample();
    let dat = wad.build(1);
    let parsed = Wad::parse(&dat).unwrap();
    assert_eq!(parsed.lumps.len(),3);
    assert_eq!(parsed.lumps[0].title(),"MAP01");
    assert_eq!(parsed.lumps[2].data.len(),2000);
    assert_eq!(parsed.build(1),dat);
}

#[test]
fn archive_roundtrip() {
    let dat = sample().build(1);
    for codec in [Codec::D64,Codec::Jaguar] {
        let packed = compress(&dat,codec).unwrap();
        assert!(packed.len() < dat.len());
        assert_eq!(decompress(&packed,codec).unwrap(),dat);
    }
}

#[test]
fn pad_aligns_lumps() {
    let dat = sample().build(1);
    let padded = pad(&dat).unwrap();
    let dir_off = u32::from_le_bytes([padded[8],padded[9],padded[10],padded[11]]) as usize;
    assert_eq!(dir_off % 4,0);
    for i in 0..3 {
        let entry = dir_off + i*ENTRY_SIZE;
        let pos = u32::from_le_bytes([padded[entry],padded[entry+1],padded[entry+2],padded[entry+3]]);
        assert_eq!(pos % 4,0);
    }
    let a = Wad::parse(&dat).unwrap();
    let b = Wad::parse(&padded).unwrap();
    for i in 0..3 {
        assert_eq!(a.lumps[i].data,b.lumps[i].data);
    }
}

#[test]
fn empty_flagged_lump_bypasses_codec() {
    let mut wad = sample();
    wad.lumps[0].compressed = true; // a marker lump with no data
    let dat = wad.build(1);
    let expanded = decompress(&dat,Codec::D64).unwrap();
    let parsed = Wad::parse(&expanded).unwrap();
    assert_eq!(parsed.lumps[0].data.len(),0);
    assert!(!parsed.lumps[0].compressed);
}

#[test]
fn rejects_foreign_files() {
    assert_eq!(Wad::parse(b"WAD2AAAABBBB").err(),Some(Error::FileFormatMismatch));
    assert_eq!(Wad::parse(&[]).err(),Some(Error::FileFormatMismatch));
    let mut dat = sample().build(1);
    dat[4] = 200; // directory runs off the end
    assert_eq!(Wad::parse(&dat).err(),Some(Error::BadDirectory));
}
