//! # WAD64 Library
//!
//! Compress or expand the WAD archives used by the Nintendo 64 port of Doom
//! * `d64` is the adaptive Huffman codec applied to most compressed lumps in the N64 archive
//! * `jaguar` is the simpler flag-byte codec inherited from the Jaguar lineage of ports
//! * `wad` reads and writes the archive itself and routes each lump through a codec
//!
//! The codec functions transform buffers, not files (lumps are easily buffered).
//! The archive functions transform a whole WAD image at once.
//!
//! ## Archive Example
//!
//! ```rs
//! use wad64::wad;
//! let rom_wad = std::fs::read("some_input_path").expect("read failed");
//! let expanded = wad::decompress(&rom_wad,wad::Codec::D64).expect("expansion failed");
//! std::fs::write("some_output_path",expanded).expect("write failed");
//! ```
//!
//! ## Lump Example
//!
//! ```rs
//! use wad64::d64;
//! let test_data = "This is the chaunt of the priests.  The chaunt of the priests of Mung.".as_bytes();
//! let compressed = d64::compress(test_data);
//! let expanded = d64::expand(&compressed,test_data.len()).expect("expansion failed");
//! ```

mod tools;
pub mod d64;
pub mod jaguar;
pub mod wad;

/// Codec and archive errors
#[derive(thiserror::Error,Debug,PartialEq)]
pub enum Error {
    #[error("output would exceed the declared size")]
    OutputOverflow,
    #[error("input ended before the end-of-stream code")]
    InputExhausted,
    #[error("symbol out of range")]
    InvalidSymbol,
    #[error("back reference outside written output")]
    BadBackReference,
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("archive directory is corrupt")]
    BadDirectory
}
