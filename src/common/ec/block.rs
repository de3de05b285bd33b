use super::encoder::ecc_into;

pub const MAX_BLOCK_SIZE: usize = 256;

// Data codewords of one Reed-Solomon block followed by their ecc codewords
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Block {
    data: [u8; MAX_BLOCK_SIZE],
    // Block length
    len: usize,
    // Data length
    dlen: usize,
}

impl Block {
    pub fn new(raw: &[u8], len: usize) -> Self {
        let dlen = raw.len();
        debug_assert!(dlen < len && len <= MAX_BLOCK_SIZE, "Invalid block size: {dlen} {len}");

        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..dlen].copy_from_slice(raw);
        let mut block = Self { data, len, dlen };
        block.compute_ecc();
        block
    }

    pub fn with_encoded(encoded: &[u8], dlen: usize) -> Self {
        let len = encoded.len();
        debug_assert!(dlen <= len && len <= MAX_BLOCK_SIZE, "Invalid block size: {dlen} {len}");

        let mut data = [0u8; MAX_BLOCK_SIZE];
        data[..len].copy_from_slice(encoded);
        Self { data, len, dlen }
    }

    fn compute_ecc(&mut self) {
        let (data, ecc) = self.data[..self.len].split_at_mut(self.dlen);
        ecc_into(data, ecc);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn ec_len(&self) -> usize {
        self.len - self.dlen
    }

    pub fn data_len(&self) -> usize {
        self.dlen
    }

    pub fn full(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlen]
    }

    pub fn ecc(&self) -> &[u8] {
        &self.data[self.dlen..self.len]
    }

    // True when the stored ecc matches the one recomputed from the data
    pub fn is_consistent(&self) -> bool {
        let mut fresh = *self;
        fresh.compute_ecc();
        fresh.ecc() == self.ecc()
    }
}

#[cfg(test)]
mod block_tests {
    use super::Block;

    #[test]
    fn test_new() {
        let msg = b" [\x0bx\xd1r\xdcMC@\xec\x11\xec\x11\xec\x11";
        let block = Block::new(msg, 26);
        assert_eq!(block.len(), 26);
        assert_eq!(block.data_len(), 16);
        assert_eq!(block.ec_len(), 10);
        assert_eq!(block.data(), msg);
        assert_eq!(block.ecc(), b"\xc4#'w\xeb\xd7\xe7\xe2]\x17");
        assert_eq!(&block.full()[..16], msg);
        assert!(block.is_consistent());
    }

    #[test]
    fn test_with_encoded() {
        let msg = b" [\x0bx\xd1r\xdcMC@\xec\x11\xec\x11\xec\x11";
        let block = Block::new(msg, 26);
        let mut encoded = block.full().to_vec();
        assert_eq!(Block::with_encoded(&encoded, 16), block);
        encoded[3] ^= 0x40;
        assert!(!Block::with_encoded(&encoded, 16).is_consistent());
    }
}
