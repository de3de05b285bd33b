use std::sync::OnceLock;

// Galois field GF(2^8) over x^8 + x^4 + x^3 + x^2 + 1
//------------------------------------------------------------------------------

pub const PRIMITIVE_POLY: u16 = 0x11D;

// Highest supported Reed-Solomon redundancy length
pub const MAX_EC_SIZE: usize = 30;

pub struct GaloisField256 {
    exp: [u8; 510],
    // log[0] is never read
    log: [u8; 256],
    mul: Box<[[u8; 256]; 256]>,
    // generators[d] holds the d non-leading coefficients of the degree d generator
    generators: Vec<Vec<u8>>,
}

impl GaloisField256 {
    fn new() -> Self {
        let mut exp = [0u8; 510];
        let mut log = [0u8; 256];
        let mut x = 1u16;
        for i in 0..255 {
            exp[i] = x as u8;
            exp[i + 255] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLY;
            }
        }

        let mut mul = Box::new([[0u8; 256]; 256]);
        for a in 1..256 {
            for b in 1..256 {
                mul[a][b] = exp[log[a] as usize + log[b] as usize];
            }
        }

        let mut gf = Self { exp, log, mul, generators: Vec::with_capacity(MAX_EC_SIZE + 1) };
        gf.build_generators();
        gf
    }

    // G(1) = [1] and G(k + 1) = G(k) * (x + a^k), leading coefficient omitted
    fn build_generators(&mut self) {
        self.generators.push(vec![]);
        self.generators.push(vec![1]);
        for k in 1..MAX_EC_SIZE {
            let prev = &self.generators[k];
            let a = self.exp(k);
            let mut next = Vec::with_capacity(k + 1);
            next.push(self.add(prev[0], a));
            for i in 1..k {
                next.push(self.add(self.mul(a, prev[i - 1]), prev[i]));
            }
            next.push(self.mul(a, prev[k - 1]));
            self.generators.push(next);
        }
    }

    pub fn add(&self, a: u8, b: u8) -> u8 {
        a ^ b
    }

    pub fn mul(&self, a: u8, b: u8) -> u8 {
        self.mul[a as usize][b as usize]
    }

    pub fn exp(&self, power: usize) -> u8 {
        self.exp[power % 255]
    }

    // None stands for the logarithm of zero
    #[cfg(test)]
    pub fn log(&self, a: u8) -> Option<u8> {
        if a == 0 {
            None
        } else {
            Some(self.log[a as usize])
        }
    }

    // Multiply-by-c row of the multiplication table
    pub fn multiplier(&self, c: u8) -> &[u8; 256] {
        &self.mul[c as usize]
    }

    pub fn generator(&self, degree: usize) -> &[u8] {
        assert!(
            (1..=MAX_EC_SIZE).contains(&degree),
            "Unsupported generator polynomial degree: {degree}"
        );
        &self.generators[degree]
    }
}

pub fn gf256() -> &'static GaloisField256 {
    static GF256: OnceLock<GaloisField256> = OnceLock::new();
    GF256.get_or_init(GaloisField256::new)
}
