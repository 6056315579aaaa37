//! Ring buffer for LZ type compression windows
use num_traits::PrimInt;

pub struct RingBuffer<T: PrimInt> {
    buf: Vec<T>,
    pos: usize,
    n: usize
}

impl <T: PrimInt> RingBuffer<T> {
    pub fn create(n: usize) -> Self {
        Self {
            buf: vec![T::zero();n],
            pos: 0,
            n
        }
    }
    /// absolute position of the insertion cursor
    pub fn pos(&self) -> usize {
        self.pos
    }
    /// number of slots in the buffer
    pub fn size(&self) -> usize {
        self.n
    }
    /// get value at absolute position, wrapping as needed, cursor does not move
    pub fn get_abs(&self,abs: usize) -> T {
        self.buf[abs % self.n]
    }
    /// write at the cursor and advance it by 1, wrapping as needed
    pub fn push(&mut self,val: T) {
        self.buf[self.pos] = val;
        self.pos = (self.pos + 1) % self.n;
    }
}

#[test]
fn cursor_wraps() {
    let mut ring: RingBuffer<u8> = RingBuffer::create(4);
    for v in 1..=5 {
        ring.push(v);
    }
    assert_eq!(ring.pos(),1);
    assert_eq!(ring.get_abs(0),5);
    assert_eq!(ring.get_abs(1),2);
    assert_eq!(ring.get_abs(5),2);
}

#[test]
fn absolute_reads_wrap() {
    let mut ring: RingBuffer<u8> = RingBuffer::create(3);
    ring.push(7);
    assert_eq!(ring.get_abs(3),7);
    assert_eq!(ring.get_abs(6),7);
    assert_eq!(ring.get_abs(1),0);
}
