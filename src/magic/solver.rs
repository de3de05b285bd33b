use log::trace;
use rand::{seq::SliceRandom, Rng};

use super::elimination::{Bits256, EliminationTarget, MAX_VECTOR_BITS};
use crate::builder::QR;
use crate::common::{
    bit_utils::{pack_bits, BitStream},
    ec::{ecc, single_bit_contribution, supported_msg_len, Block},
    error::{QRError, QRResult},
    layout::{Codeword, SymbolLayout},
    mask::MaskPattern,
};

// Template bit. Fixed bits must keep their value, free bits fall back to theirs only
// when the solver has no use for them. On ecc bits Fixed marks a target.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum MagicBit {
    Fixed(bool),
    Free(bool),
}

impl MagicBit {
    pub fn value(self) -> bool {
        match self {
            Self::Fixed(v) | Self::Free(v) => v,
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    // Same kind with the value flipped when `flip` is set
    pub fn xor(self, flip: bool) -> Self {
        match self {
            Self::Fixed(v) => Self::Fixed(v ^ flip),
            Self::Free(v) => Self::Free(v ^ flip),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct MatchReport {
    pub free: usize,
    pub solved: usize,
    pub overflow: usize,
    pub targets: usize,
    // Targets the final ecc misses
    pub unmet: usize,
}

// Block solver
//------------------------------------------------------------------------------

fn validate_block(data_len: usize, ecc_len: usize, out_len: usize) -> QRResult<()> {
    let ecc_cw = ecc_len >> 3;
    let max_len = supported_msg_len(ecc_cw);
    if ecc_len == 0 || ecc_len & 7 != 0 || max_len == 0 {
        let expected = (ecc_len + 7) & !7;
        return Err(QRError::TemplateMismatch { expected: expected.max(8), actual: ecc_len });
    }
    if data_len == 0 || data_len & 7 != 0 || data_len > max_len << 3 {
        let expected = ((data_len + 7) & !7).clamp(8, max_len << 3);
        return Err(QRError::TemplateMismatch { expected, actual: data_len });
    }
    if out_len != data_len {
        return Err(QRError::TemplateMismatch { expected: data_len, actual: out_len });
    }
    Ok(())
}

fn ecc_bit(ecc: &[u8], i: usize) -> bool {
    (ecc[i >> 3] << (i & 7)) & 0x80 != 0
}

// Projects an ecc block onto the target bits
fn project(ecc: &[u8], targets: &[(usize, bool)]) -> Bits256 {
    let mut res = Bits256::default();
    for (j, &(i, _)) in targets.iter().enumerate() {
        res.set(j, ecc_bit(ecc, i));
    }
    res
}

// Resolves the data bits of one Reed-Solomon block. Fixed data bits are copied, free
// data bits are solved so that the ecc hits every Fixed ecc bit, as far as the free bits
// span the targets. Free bits left over keep their seed. Everything is in unmasked space.
pub fn match_block<R: Rng + ?Sized>(
    template_data: &[MagicBit],
    template_ecc: &[MagicBit],
    out: &mut [bool],
    rng: &mut R,
) -> QRResult<MatchReport> {
    validate_block(template_data.len(), template_ecc.len(), out.len())?;
    let dlen = template_data.len() >> 3;
    let ecc_len = template_ecc.len() >> 3;

    let targets = template_ecc
        .iter()
        .enumerate()
        .filter_map(|(i, b)| match b {
            MagicBit::Fixed(v) => Some((i, *v)),
            MagicBit::Free(_) => None,
        })
        .collect::<Vec<_>>();
    debug_assert!(targets.len() <= MAX_VECTOR_BITS, "Too many targets: {}", targets.len());

    let mut free = Vec::new();
    for (i, (o, b)) in out.iter_mut().zip(template_data).enumerate() {
        *o = b.value();
        if !b.is_fixed() {
            free.push(i);
        }
    }

    let mut report =
        MatchReport { free: free.len(), targets: targets.len(), ..Default::default() };
    if targets.is_empty() {
        report.overflow = free.len();
        return Ok(report);
    }

    free.shuffle(rng);
    let mut elim = EliminationTarget::new(free.len().min(targets.len()));
    let mut solved = Vec::with_capacity(free.len().min(targets.len()));
    for &i in &free {
        if elim.is_full() {
            break;
        }
        let contrib = single_bit_contribution(i & 7, dlen - 1 - (i >> 3), ecc_len);
        if elim.insert(project(contrib, &targets)) {
            solved.push(i);
        }
    }

    // Solved bits are zero in the residual, so its ecc is what they have to correct
    for &i in &solved {
        out[i] = false;
    }
    let residual = ecc(&pack_bits(out), ecc_len);
    let mut correction = Bits256::default();
    for (j, &(i, v)) in targets.iter().enumerate() {
        correction.set(j, v ^ ecc_bit(&residual, i));
    }

    let (coeffs, unmet) = elim.solve(&correction);
    for (k, &i) in solved.iter().enumerate() {
        out[i] = coeffs.get(k);
    }

    report.solved = solved.len();
    report.overflow = free.len() - solved.len();
    report.unmet = unmet.count_ones();
    trace!(
        "Matched block: Free {}, Solved {}, Overflow {}, Targets {}, Unmet {}",
        report.free,
        report.solved,
        report.overflow,
        report.targets,
        report.unmet
    );
    Ok(report)
}

#[cfg(test)]
mod match_block_tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{match_block, MagicBit};
    use crate::common::bit_utils::{pack_bits, unpack_bits};
    use crate::common::ec::{ecc, single_bit_contribution};
    use crate::common::error::QRError;

    // V1-L carries a single block of 19 data and 7 ecc codewords
    const DATA_BITS: usize = 19 * 8;
    const ECC_BITS: usize = 7 * 8;

    fn ecc_bits(out: &[bool]) -> Vec<bool> {
        unpack_bits(&ecc(&pack_bits(out), 7))
    }

    #[test]
    fn test_all_targets_met() {
        let mut rng = StdRng::seed_from_u64(7);
        // Last 8 data codewords free, everything else fixed
        let data = (0..DATA_BITS)
            .map(|i| {
                let v = rng.random::<bool>();
                if i >= 11 * 8 {
                    MagicBit::Free(v)
                } else {
                    MagicBit::Fixed(v)
                }
            })
            .collect::<Vec<_>>();
        let ecc_tpl = (0..ECC_BITS).map(|_| MagicBit::Fixed(rng.random())).collect::<Vec<_>>();

        let mut out = vec![false; DATA_BITS];
        let report = match_block(&data, &ecc_tpl, &mut out, &mut rng).unwrap();
        assert_eq!(report.free, 64);
        assert_eq!(report.targets, 56);
        assert_eq!(report.solved, 56);
        assert_eq!(report.overflow, 8);
        assert_eq!(report.unmet, 0);

        for (o, t) in out.iter().zip(&data) {
            if t.is_fixed() {
                assert_eq!(*o, t.value());
            }
        }
        let got = ecc_bits(&out);
        for (g, t) in got.iter().zip(&ecc_tpl) {
            assert_eq!(*g, t.value());
        }
    }

    #[test]
    fn test_partial_targets() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = (0..DATA_BITS)
            .map(|i| if i >= 10 * 8 { MagicBit::Free(true) } else { MagicBit::Fixed(false) })
            .collect::<Vec<_>>();
        // Every third ecc bit is a target
        let ecc_tpl = (0..ECC_BITS)
            .map(|i| if i % 3 == 0 { MagicBit::Fixed(i % 2 == 0) } else { MagicBit::Free(false) })
            .collect::<Vec<_>>();

        let mut out = vec![false; DATA_BITS];
        let report = match_block(&data, &ecc_tpl, &mut out, &mut rng).unwrap();
        assert_eq!(report.targets, 19);
        assert_eq!(report.solved, 19);
        assert_eq!(report.unmet, 0);
        let got = ecc_bits(&out);
        for (i, t) in ecc_tpl.iter().enumerate() {
            if t.is_fixed() {
                assert_eq!(got[i], t.value(), "ecc bit {i}");
            }
        }
    }

    #[test]
    fn test_no_targets_keeps_seeds() {
        let mut rng = StdRng::seed_from_u64(3);
        let data = (0..DATA_BITS)
            .map(|i| if i % 2 == 0 { MagicBit::Free(i % 4 == 0) } else { MagicBit::Fixed(true) })
            .collect::<Vec<_>>();
        let ecc_tpl = vec![MagicBit::Free(true); ECC_BITS];

        let mut out = vec![false; DATA_BITS];
        let report = match_block(&data, &ecc_tpl, &mut out, &mut rng).unwrap();
        assert_eq!(report.solved, 0);
        assert_eq!(report.overflow, DATA_BITS / 2);
        assert!(out.iter().zip(&data).all(|(o, t)| *o == t.value()));
    }

    #[test]
    fn test_more_targets_than_free_bits() {
        let mut rng = StdRng::seed_from_u64(5);
        let free_idx = 100;
        let data = (0..DATA_BITS)
            .map(|i| if i == free_idx { MagicBit::Free(false) } else { MagicBit::Fixed(false) })
            .collect::<Vec<_>>();
        // Neither zero nor the lone free bit's contribution
        let contrib = single_bit_contribution(free_idx & 7, 18 - (free_idx >> 3), 7);
        let mut target = unpack_bits(contrib);
        target[0] = !target[0];
        let ecc_tpl = target.iter().map(|&v| MagicBit::Fixed(v)).collect::<Vec<_>>();

        let mut out = vec![false; DATA_BITS];
        let report = match_block(&data, &ecc_tpl, &mut out, &mut rng).unwrap();
        assert_eq!(report.free, 1);
        assert_eq!(report.solved, 1);
        assert!(report.unmet >= 1);
        assert_ne!(ecc_bits(&out), target);
    }

    #[test]
    fn test_template_mismatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let data = vec![MagicBit::Free(false); DATA_BITS];
        let ecc_tpl = vec![MagicBit::Free(false); ECC_BITS];

        let mut short = vec![false; DATA_BITS - 8];
        assert_eq!(
            match_block(&data, &ecc_tpl, &mut short, &mut rng),
            Err(QRError::TemplateMismatch { expected: DATA_BITS, actual: DATA_BITS - 8 })
        );

        let mut out = vec![false; DATA_BITS];
        assert_eq!(
            match_block(&data, &ecc_tpl[..50], &mut out, &mut rng),
            Err(QRError::TemplateMismatch { expected: 56, actual: 50 })
        );

        // No version pairs 8 ecc codewords with a block
        let ecc8 = vec![MagicBit::Free(false); 64];
        assert!(match_block(&data, &ecc8, &mut out, &mut rng).is_err());

        // Longer than any 7 ecc codeword block
        let long = vec![MagicBit::Free(false); DATA_BITS + 8];
        let mut out = vec![false; DATA_BITS + 8];
        assert_eq!(
            match_block(&long, &ecc_tpl, &mut out, &mut rng),
            Err(QRError::TemplateMismatch { expected: DATA_BITS, actual: DATA_BITS + 8 })
        );
    }
}

// Symbol solver
//------------------------------------------------------------------------------

// Block templates in rendered space, i.e. after masking
pub type BlockTemplate = (Vec<MagicBit>, Vec<MagicBit>);

// Solves every block of the layout and draws the masked symbol. Templates hold one
// (data, ecc) pair per block in rendered space.
pub fn solve_constrained<R: Rng + ?Sized>(
    layout: &'static SymbolLayout,
    templates: &[BlockTemplate],
    mask: MaskPattern,
    rng: &mut R,
) -> QRResult<(QR, Vec<MatchReport>)> {
    if templates.len() != layout.block_count() {
        return Err(QRError::TemplateMismatch {
            expected: layout.block_count(),
            actual: templates.len(),
        });
    }

    let mask_bits = layout.mask(mask);
    let unmask = |cws: &[Codeword], tpl: &[MagicBit]| {
        cws.iter()
            .flat_map(|cw| cw.modules.iter())
            .zip(tpl)
            .map(|(&idx, b)| b.xor(mask_bits[idx]))
            .collect::<Vec<_>>()
    };

    let mut blocks = Vec::with_capacity(templates.len());
    let mut reports = Vec::with_capacity(templates.len());
    for (b, (data_tpl, ecc_tpl)) in templates.iter().enumerate() {
        layout.validate_block_len(b, data_tpl.len(), ecc_tpl.len())?;
        let data_tpl = unmask(&layout.data_blocks()[b], data_tpl);
        let ecc_tpl = unmask(&layout.ecc_blocks()[b], ecc_tpl);

        let mut out = vec![false; data_tpl.len()];
        reports.push(match_block(&data_tpl, &ecc_tpl, &mut out, rng)?);

        let data = pack_bits(&out);
        let len = data.len() + (ecc_tpl.len() >> 3);
        blocks.push(Block::new(&data, len));
    }

    let mut qr = QR::new(layout);
    qr.draw_blocks(&blocks);
    qr.apply_mask(mask);
    Ok((qr, reports))
}

// Full grid template
//------------------------------------------------------------------------------

// One template bit per module of a layout, in rendered space. Only data and ecc cells
// take part in solving.
#[derive(Debug, Clone)]
pub struct MagicTemplate {
    layout: &'static SymbolLayout,
    bits: Vec<MagicBit>,
}

impl MagicTemplate {
    pub fn new(layout: &'static SymbolLayout) -> Self {
        let w = layout.width();
        Self { layout, bits: vec![MagicBit::Free(false); w * w] }
    }

    pub fn layout(&self) -> &'static SymbolLayout {
        self.layout
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    fn coord_to_index(&self, x: usize, y: usize) -> usize {
        let w = self.width();
        debug_assert!(x < w, "x out of bounds: {x}");
        debug_assert!(y < w, "y out of bounds: {y}");
        y * w + x
    }

    pub fn get(&self, x: usize, y: usize) -> MagicBit {
        self.bits[self.coord_to_index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, bit: MagicBit) {
        let idx = self.coord_to_index(x, y);
        self.bits[idx] = bit;
    }

    // Pins the encoded stream into the data cells in stream order, as it renders under
    // the mask. Cells past the stream are left as they are.
    pub fn write_payload(&mut self, payload: &BitStream, mask: MaskPattern) -> QRResult<()> {
        let layout = self.layout;
        if payload.len() > layout.data_capacity() << 3 {
            return Err(QRError::DataTooLong);
        }

        let mask_bits = layout.mask(mask);
        let cells = layout.data_codewords().flat_map(|cw| cw.modules.iter().copied());
        for (idx, bit) in cells.zip(payload.bits()) {
            self.bits[idx] = MagicBit::Fixed(bit ^ mask_bits[idx]);
        }
        Ok(())
    }

    pub fn block_templates(&self) -> Vec<BlockTemplate> {
        let pick = |cws: &[Codeword]| -> Vec<MagicBit> {
            cws.iter().flat_map(|cw| cw.modules.iter().map(|&idx| self.bits[idx])).collect()
        };
        self.layout
            .data_blocks()
            .iter()
            .zip(self.layout.ecc_blocks())
            .map(|(data, ecc)| (pick(data), pick(ecc)))
            .collect()
    }

    pub fn render<R: Rng + ?Sized>(
        &self,
        mask: MaskPattern,
        rng: &mut R,
    ) -> QRResult<(QR, Vec<MatchReport>)> {
        solve_constrained(self.layout, &self.block_templates(), mask, rng)
    }
}
