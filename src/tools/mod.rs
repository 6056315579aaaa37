//! Internal components shared by the codecs

pub mod adaptive_huff;
pub mod ring_buffer;
