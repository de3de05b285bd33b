use std::ops::{BitXor, BitXorAssign};

pub const MAX_VECTOR_BITS: usize = 256;

// Bit vector over GF(2). Bit i lives in word i / 64 at position i % 64.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Bits256([u64; 4]);

impl Bits256 {
    pub fn unit(i: usize) -> Self {
        let mut res = Self::default();
        res.set(i, true);
        res
    }

    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < MAX_VECTOR_BITS, "Bit index out of range: {i}");
        (self.0[i >> 6] >> (i & 63)) & 1 == 1
    }

    pub fn set(&mut self, i: usize, v: bool) {
        debug_assert!(i < MAX_VECTOR_BITS, "Bit index out of range: {i}");
        let word = &mut self.0[i >> 6];
        *word = (*word & !(1 << (i & 63))) | ((v as u64) << (i & 63));
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    // Index of the lowest set bit
    pub fn first_set(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, &w)| w != 0)
            .map(|(i, w)| (i << 6) + w.trailing_zeros() as usize)
    }
}

impl BitXorAssign for Bits256 {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0.iter_mut().zip(rhs.0).for_each(|(a, b)| *a ^= b);
    }
}

impl BitXor for Bits256 {
    type Output = Self;
    fn bitxor(mut self, rhs: Self) -> Self {
        self ^= rhs;
        self
    }
}

#[cfg(test)]
mod bits_tests {
    use super::Bits256;

    #[test]
    fn test_set_get() {
        let mut v = Bits256::default();
        for i in [0, 63, 64, 130, 255] {
            v.set(i, true);
            assert!(v.get(i));
        }
        assert_eq!(v.count_ones(), 5);
        v.set(64, false);
        assert!(!v.get(64));
        assert_eq!(v.count_ones(), 4);
    }

    #[test]
    fn test_first_set() {
        assert_eq!(Bits256::default().first_set(), None);
        assert_eq!(Bits256::unit(0).first_set(), Some(0));
        assert_eq!((Bits256::unit(200) ^ Bits256::unit(70)).first_set(), Some(70));
    }

    #[test]
    fn test_xor() {
        let a = Bits256::unit(3) ^ Bits256::unit(100);
        let b = Bits256::unit(100) ^ Bits256::unit(255);
        assert_eq!(a ^ b, Bits256::unit(3) ^ Bits256::unit(255));
        assert!((a ^ a).is_zero());
    }
}

// Elimination target
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Row {
    pivot: usize,
    // Reduced vector
    right: Bits256,
    // Inserted vectors whose XOR gives `right`, by insertion index
    left: Bits256,
}

// Incrementally reduced basis of inserted vectors. Rows are kept sorted by pivot and every
// pivot is clear in all other rows.
#[derive(Debug, Clone)]
pub struct EliminationTarget {
    capacity: usize,
    rows: Vec<Row>,
}

impl EliminationTarget {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= MAX_VECTOR_BITS, "Capacity too large: {capacity}");
        Self { capacity, rows: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    // Adds the vector if it is independent of the rows so far. Accepted vectors are
    // numbered in insertion order.
    pub fn insert(&mut self, vector: Bits256) -> bool {
        if self.is_full() {
            return false;
        }

        let mut right = vector;
        let mut left = Bits256::unit(self.rows.len());
        for row in &self.rows {
            if right.get(row.pivot) {
                right ^= row.right;
                left ^= row.left;
            }
        }

        let Some(pivot) = right.first_set() else {
            return false;
        };

        for row in self.rows.iter_mut() {
            if row.right.get(pivot) {
                row.right ^= right;
                row.left ^= left;
            }
        }
        let pos = self.rows.partition_point(|r| r.pivot < pivot);
        self.rows.insert(pos, Row { pivot, right, left });
        true
    }

    // Returns the inserted vectors to combine for the target, and the target bits that
    // combination misses
    pub fn solve(&self, target: &Bits256) -> (Bits256, Bits256) {
        let mut rem = *target;
        let mut coeffs = Bits256::default();
        for row in &self.rows {
            if rem.get(row.pivot) {
                rem ^= row.right;
                coeffs ^= row.left;
            }
        }
        (coeffs, rem)
    }
}
