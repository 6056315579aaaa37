//! Module to perform the adaptive Huffman coding.
//! This is used by the `d64` module.
//! The tree covers 629 symbols: one stream terminator, 256 literal bytes,
//! and 372 match codes.  There is no stored code table; the tree is
//! reshaped as symbols arrive, the same way on the coding and decoding
//! sides, so the decoder always mirrors the coder.
//!
//! The update step is in the lineage of `LZHUF.C` by Okumura et al.,
//! except that node identity and sort order are kept in separate arrays,
//! so a node can be exchanged without copying its subtree.

use bit_vec::BitVec;

/// symbols coded by the tree: terminator, literals, then match codes
pub const NUM_SYMB: usize = 629;
/// node ids are 1-based, 1 is the root, slot 0 is unused
pub const NODE_COUNT: usize = 2*NUM_SYMB - 1;
/// ids below this are internal nodes, the rest are leaves
const FIRST_LEAF: usize = NUM_SYMB;
const ROOT: usize = 1;
/// root weight that triggers halving of all the counts
const MAX_FREQ: u16 = 0x07d0;

/// Components for the Huffman stage of compression.
/// The tree is constantly updated as new data is coded.
pub struct AdaptiveHuffman {
    bits: BitVec,
    ptr: usize,
    /// node weight and sorting key, an internal node holds the sum of its children
    weight: Vec<u16>,
    /// id of the left son, 0 for leaves
    left: Vec<usize>,
    /// id of the right son, 0 for leaves
    right: Vec<usize>,
    /// id of the parent, 0 for the root
    parent: Vec<usize>,
    /// rank -> node id; weights never increase as the rank grows
    order: Vec<usize>,
    /// node id -> rank, inverse of `order`
    rank: Vec<usize>
}

impl AdaptiveHuffman {
    /// The `dat` argument is the compressed input when expanding.
    /// Pass an empty buffer when compressing.
    pub fn create(dat: Vec<u8>) -> Self {
        Self {
            bits: BitVec::from_bytes(&dat),
            ptr: 0,
            weight: vec![0;NODE_COUNT+1],
            left: vec![0;NODE_COUNT+1],
            right: vec![0;NODE_COUNT+1],
            parent: vec![0;NODE_COUNT+1],
            order: (0..NODE_COUNT+1).collect(),
            rank: (0..NODE_COUNT+1).collect()
        }
    }
    /// initialize the Huffman tree
    pub fn start_huff(&mut self) {
        // A complete binary tree: sons of internal node i are 2i and 2i+1,
        // so ids 629..=1257 come out as the leaves.  The identity mapping
        // between id and rank already lists the nodes heaviest first.
        for i in ROOT..FIRST_LEAF {
            self.left[i] = 2*i;
            self.right[i] = 2*i + 1;
            self.parent[2*i] = i;
            self.parent[2*i+1] = i;
        }
        for n in FIRST_LEAF..=NODE_COUNT {
            self.weight[n] = 1;
        }
        for i in (ROOT..FIRST_LEAF).rev() {
            self.weight[i] = self.weight[2*i] + self.weight[2*i+1];
        }
    }
    /// get the next bit based on the internal bit pointer.
    /// Reads past the end of input yield 1-bits; a well formed stream
    /// terminates before any of those reach the output.
    fn get_bit(&mut self) -> u8 {
        match self.bits.get(self.ptr) {
            Some(bit) => {
                self.ptr += 1;
                bit as u8
            },
            None => 1
        }
    }
    /// read `num_bits` into an accumulator, least significant bit first,
    /// used exclusively for the offset field of a match
    pub fn get_bits(&mut self,num_bits: usize) -> usize {
        let mut ans: usize = 0;
        for i in 0..num_bits {
            ans |= (self.get_bit() as usize) << i;
        }
        ans
    }
    /// write `num_bits` of `val`, least significant bit first, mirroring `get_bits`
    pub fn put_bits(&self,val: usize,num_bits: usize,obuf: &mut BitVec) {
        for i in 0..num_bits {
            obuf.push(val >> i & 1 > 0);
        }
    }
    /// true when every input bit has been consumed
    pub fn exhausted(&self) -> bool {
        self.ptr >= self.bits.len()
    }
    /// walk from the root to a leaf and update the tree.
    /// Returns 0 for end of stream, 1..=256 for a literal, 257..=628 for a match code.
    pub fn decode_symbol(&mut self) -> usize {
        let mut n = ROOT;
        while n < FIRST_LEAF {
            n = match self.get_bit() {
                0 => self.left[n],
                _ => self.right[n]
            };
        }
        self.update(n);
        n - FIRST_LEAF
    }
    /// emit the code for a symbol (numbered as `decode_symbol` returns it)
    /// and update the tree.  The path is gathered leaf to root, then
    /// written out reversed, most significant bit first.
    pub fn encode_symbol(&mut self,symb: usize,obuf: &mut BitVec) {
        let leaf = FIRST_LEAF + symb;
        let mut path = [0u8;NUM_SYMB];
        let mut depth = 0;
        let mut n = leaf;
        while n != ROOT {
            let p = self.parent[n];
            path[depth] = match self.left[p] == n {
                true => 0,
                false => 1
            };
            depth += 1;
            n = p;
        }
        for i in (0..depth).rev() {
            obuf.push(path[i] > 0);
        }
        self.update(leaf);
    }
    /// increment the weight of the given leaf and of every node on the way
    /// to the root, exchanging nodes wherever the ordering is disturbed
    fn update(&mut self,leaf: usize) {
        let mut n = leaf;
        loop {
            self.weight[n] += 1;
            if n == ROOT {
                break;
            }
            // n may now outweigh nodes of smaller rank; move it ahead of
            // every node left behind by the increment.  Rank 1 is the
            // root and is never taken.
            let w = self.weight[n];
            let mut r = self.rank[n];
            while r > 2 && self.weight[self.order[r-1]] < w {
                r -= 1;
            }
            // exchange only with a node holding the old weight, and never
            // with one on the same root path; once halving has produced
            // zero weights an ancestor or descendant can share the block
            while r < self.rank[n] && (self.weight[self.order[r]] != w - 1 || self.related(n,self.order[r])) {
                r += 1;
            }
            let other = self.order[r];
            if other != n {
                self.swap(n,other);
            }
            n = self.parent[n];
        }
        if self.weight[ROOT] == MAX_FREQ {
            self.rescale();
        }
    }
    /// true when one node is an ancestor of the other
    fn related(&self,a: usize,b: usize) -> bool {
        self.descends(a,b) || self.descends(b,a)
    }
    /// true if `n` is somewhere below `above` in the tree
    fn descends(&self,n: usize,above: usize) -> bool {
        let mut p = self.parent[n];
        while p != 0 {
            if p == above {
                return true;
            }
            p = self.parent[p];
        }
        false
    }
    /// exchange two nodes, both their spots in the tree and their ranks.
    /// The sons of each node travel with it.  Neither node may be the
    /// root, nor on the root path of the other.
    fn swap(&mut self,a: usize,b: usize) {
        let pa = self.parent[a];
        let pb = self.parent[b];
        let a_on_left = self.left[pa] == a;
        let b_on_left = self.left[pb] == b;
        match a_on_left {
            true => self.left[pa] = b,
            false => self.right[pa] = b
        };
        match b_on_left {
            true => self.left[pb] = a,
            false => self.right[pb] = a
        };
        self.parent[a] = pb;
        self.parent[b] = pa;
        let ra = self.rank[a];
        let rb = self.rank[b];
        self.order[ra] = b;
        self.order[rb] = a;
        self.rank[a] = rb;
        self.rank[b] = ra;
    }
    /// halve every count once the root weight reaches the cap; a leaf
    /// that was at 1 drops to 0 and remains a coded symbol.  The internal
    /// sums are then rebuilt so that each parent again holds the sum of
    /// its sons.  Halving can reorder subtrees of unequal shape, so the
    /// ranks are re-sorted; ties keep their old relative order.
    fn rescale(&mut self) {
        for n in FIRST_LEAF..=NODE_COUNT {
            self.weight[n] >>= 1;
        }
        self.refresh(ROOT);
        let Self { weight, order, rank, .. } = self;
        order[1..].sort_by(|a,b| weight[*b].cmp(&weight[*a]));
        for r in 1..order.len() {
            rank[order[r]] = r;
        }
    }
    fn refresh(&mut self,n: usize) -> u16 {
        if self.left[n] == 0 {
            return self.weight[n];
        }
        let sum = self.refresh(self.left[n]) + self.refresh(self.right[n]);
        self.weight[n] = sum;
        sum
    }
}

#[cfg(test)]
fn prng(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

#[cfg(test)]
fn assert_sums(huff: &AdaptiveHuffman) {
    for i in ROOT..FIRST_LEAF {
        assert_eq!(huff.weight[i],huff.weight[huff.left[i]] + huff.weight[huff.right[i]]);
    }
}

#[cfg(test)]
fn assert_rank_inverse(huff: &AdaptiveHuffman) {
    for n in 1..=NODE_COUNT {
        assert_eq!(huff.order[huff.rank[n]],n);
    }
}

#[cfg(test)]
fn assert_ordering(huff: &AdaptiveHuffman) {
    assert_eq!(huff.order[1],ROOT);
    for r in 1..NODE_COUNT {
        assert!(huff.weight[huff.order[r]] >= huff.weight[huff.order[r+1]]);
    }
    assert_rank_inverse(huff);
}

#[test]
fn initial_tree() {
    let mut huff = AdaptiveHuffman::create(Vec::new());
    huff.start_huff();
    assert_eq!(huff.weight[ROOT],NUM_SYMB as u16);
    let leaves = (1..=NODE_COUNT).filter(|n| huff.left[*n]==0).count();
    assert_eq!(leaves,NUM_SYMB);
    assert_sums(&huff);
    assert_ordering(&huff);
}

#[test]
fn invariants_under_update() {
    // 1300 updates stay below the first halving of the counts
    let mut huff = AdaptiveHuffman::create(Vec::new());
    huff.start_huff();
    let mut state: u32 = 1;
    for _i in 0..1300 {
        let leaf = FIRST_LEAF + (prng(&mut state) as usize) % NUM_SYMB;
        huff.update(leaf);
        assert_sums(&huff);
        assert_ordering(&huff);
    }
}

#[test]
fn invariants_across_rescale() {
    // 10000 updates halve the counts several times over; rarely used
    // leaves go to weight 0 along the way
    let mut huff = AdaptiveHuffman::create(Vec::new());
    huff.start_huff();
    let mut state: u32 = 0xdeadbeef;
    for _i in 0..10000 {
        let leaf = FIRST_LEAF + (prng(&mut state) as usize) % NUM_SYMB;
        huff.update(leaf);
        assert!(huff.weight[ROOT] < MAX_FREQ);
        assert_sums(&huff);
    }
    assert_rank_inverse(&huff);
}

#[test]
fn cold_symbol_after_rescale() {
    // drive two symbols past several halvings, leaving every other leaf
    // (and whole subtrees above them) at weight zero, then code one of
    // the cold symbols
    let mut symbols: Vec<usize> = Vec::new();
    for i in 0..3000 {
        symbols.push(match i % 2 {
            0 => 5,
            _ => 600
        });
    }
    symbols.push(628);
    symbols.push(0);
    let mut obuf = BitVec::new();
    let mut coder = AdaptiveHuffman::create(Vec::new());
    coder.start_huff();
    for s in &symbols {
        coder.encode_symbol(*s,&mut obuf);
    }
    let mut decoder = AdaptiveHuffman::create(obuf.to_bytes());
    decoder.start_huff();
    for s in &symbols {
        assert_eq!(decoder.decode_symbol(),*s);
    }
    assert_sums(&coder);
    assert_eq!(coder.weight,decoder.weight);
    assert_eq!(coder.order,decoder.order);
}

#[test]
fn code_roundtrip() {
    let symbols: Vec<usize> = vec![0,1,256,257,628,300,300,300,42,42,1,628,0,0,77];
    let mut obuf = BitVec::new();
    let mut coder = AdaptiveHuffman::create(Vec::new());
    coder.start_huff();
    for s in &symbols {
        coder.encode_symbol(*s,&mut obuf);
    }
    let mut decoder = AdaptiveHuffman::create(obuf.to_bytes());
    decoder.start_huff();
    for s in &symbols {
        assert_eq!(decoder.decode_symbol(),*s);
    }
    // both sides must arrive at the identical tree
    assert_eq!(coder.weight,decoder.weight);
    assert_eq!(coder.order,decoder.order);
}
