use std::sync::OnceLock;

use log::debug;

use super::galois::{gf256, MAX_EC_SIZE};
use crate::common::metadata::{ECLevel, Version};

// Superposition tables
//------------------------------------------------------------------------------

// Precomputed ecc contribution of every (byte exponent, byte value) pair for one
// redundancy length. The ecc of a message is the XOR of the contributions of its bytes.
struct EccTable {
    ecc_len: usize,
    max_msg_len: usize,
    // Row (exponent << 8 | byte) starts at that index times ecc_len
    entries: Vec<u8>,
}

impl EccTable {
    fn new(ecc_len: usize, max_msg_len: usize) -> Self {
        debug!("Building ecc table: Ecc len {ecc_len}, Max msg len {max_msg_len}");

        let gf = gf256();
        let gen = gf.generator(ecc_len);
        let stride = ecc_len << 8;
        let mut entries = vec![0u8; max_msg_len * stride];

        // Exponent 0, byte 1 is the remainder of x^ecc_len, i.e. the generator itself
        let mut unit = gen.to_vec();
        for exp in 0..max_msg_len {
            if exp > 0 {
                // Multiply the previous remainder by x and reduce
                let head = gf.multiplier(unit[0]);
                for i in 0..ecc_len - 1 {
                    unit[i] = unit[i + 1] ^ head[gen[i] as usize];
                }
                unit[ecc_len - 1] = head[gen[ecc_len - 1] as usize];
            }

            let row = &mut entries[exp * stride..(exp + 1) * stride];
            for (byte, ecc) in row.chunks_exact_mut(ecc_len).enumerate().skip(1) {
                let mul = gf.multiplier(byte as u8);
                ecc.iter_mut().zip(&unit).for_each(|(e, &u)| *e = mul[u as usize]);
            }
        }

        Self { ecc_len, max_msg_len, entries }
    }

    fn contribution(&self, exponent: usize, byte: u8) -> &[u8] {
        let start = ((exponent << 8) | byte as usize) * self.ecc_len;
        &self.entries[start..start + self.ecc_len]
    }
}

// Longest data block that uses the given redundancy length, zero if no version does
fn max_msg_len(ecc_len: usize) -> usize {
    Version::all()
        .flat_map(|v| ECLevel::ALL.into_iter().map(move |ecl| (v, ecl)))
        .filter(|&(v, ecl)| v.ecc_per_block(ecl) == ecc_len)
        .map(|(v, ecl)| {
            let (block1_size, _, block2_size, _) = v.data_codewords_per_block(ecl);
            block1_size.max(block2_size)
        })
        .max()
        .unwrap_or(0)
}

fn ecc_table(ecc_len: usize) -> &'static EccTable {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: OnceLock<Option<EccTable>> = OnceLock::new();
    static ECC_TABLES: [OnceLock<Option<EccTable>>; MAX_EC_SIZE + 1] = [INIT; MAX_EC_SIZE + 1];

    assert!(ecc_len <= MAX_EC_SIZE, "Unsupported ecc length: {ecc_len}");
    let table = ECC_TABLES[ecc_len].get_or_init(|| match max_msg_len(ecc_len) {
        0 => None,
        max => Some(EccTable::new(ecc_len, max)),
    });
    match table {
        Some(t) => t,
        None => panic!("Unsupported ecc length: {ecc_len}"),
    }
}

// Longest message accepted for the redundancy length, zero if it is unsupported
pub fn supported_msg_len(ecc_len: usize) -> usize {
    if ecc_len > MAX_EC_SIZE {
        return 0;
    }
    max_msg_len(ecc_len)
}

// Reed-Solomon encoding
//------------------------------------------------------------------------------

pub fn ecc(data: &[u8], ecc_len: usize) -> Vec<u8> {
    let mut res = vec![0; ecc_len];
    ecc_into(data, &mut res);
    res
}

pub fn ecc_into(data: &[u8], out: &mut [u8]) {
    let table = ecc_table(out.len());
    let len = data.len();
    assert!(
        0 < len && len <= table.max_msg_len,
        "Unsupported message length: Len {len}, Ecc len {}, Max len {}",
        out.len(),
        table.max_msg_len
    );

    let mut acc = [0u8; MAX_EC_SIZE];
    let acc = &mut acc[..table.ecc_len];
    for (i, &b) in data.iter().enumerate() {
        if b != 0 {
            let contrib = table.contribution(len - 1 - i, b);
            acc.iter_mut().zip(contrib).for_each(|(a, c)| *a ^= c);
        }
    }
    out.copy_from_slice(acc);
}

// Ecc of a message whose only set bit is `bit` (0 = msb) of the byte `exponent`
// positions before the last byte
pub fn single_bit_contribution(bit: usize, exponent: usize, ecc_len: usize) -> &'static [u8] {
    debug_assert!(bit < 8, "Bit index out of range: {bit}");

    let table = ecc_table(ecc_len);
    assert!(
        exponent < table.max_msg_len,
        "Unsupported byte exponent: Exponent {exponent}, Ecc len {ecc_len}"
    );
    table.contribution(exponent, 0x80 >> bit)
}
