use std::ops::{Deref, Range};

use super::error::{QRError, QRResult};
use crate::builder::QR;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        assert!(pattern < 8, "Invalid masking pattern: {pattern}");
        Self(pattern)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..8).map(Self)
    }
}

impl TryFrom<u8> for MaskPattern {
    type Error = QRError;
    fn try_from(pattern: u8) -> QRResult<Self> {
        if pattern < 8 {
            Ok(Self(pattern))
        } else {
            Err(QRError::InvalidMaskingPattern)
        }
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Predicates take x as the column and y as the row
mod mask_functions {
    pub fn checkerboard(x: usize, y: usize) -> bool {
        (x + y) & 1 == 0
    }

    pub fn horizontal_lines(_: usize, y: usize) -> bool {
        y & 1 == 0
    }

    pub fn vertical_lines(x: usize, _: usize) -> bool {
        x % 3 == 0
    }

    pub fn diagonal_lines(x: usize, y: usize) -> bool {
        (x + y) % 3 == 0
    }

    pub fn large_checkerboard(x: usize, y: usize) -> bool {
        ((y >> 1) + (x / 3)) & 1 == 0
    }

    pub fn fields(x: usize, y: usize) -> bool {
        ((x * y) & 1) + ((x * y) % 3) == 0
    }

    pub fn diamonds(x: usize, y: usize) -> bool {
        (((x * y) & 1) + ((x * y) % 3)) & 1 == 0
    }

    pub fn meadow(x: usize, y: usize) -> bool {
        (((x + y) & 1) + ((x * y) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    pub fn mask_functions(self) -> fn(usize, usize) -> bool {
        match *self {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            0b111 => mask_functions::meadow,
            _ => unreachable!("Invalid pattern"),
        }
    }
}


// Best mask selection
//------------------------------------------------------------------------------

// Lowest penalty wins, ties go to the lower pattern
pub fn apply_best_mask(qr: &mut QR) -> MaskPattern {
    let mut best = (MaskPattern(0), u32::MAX);
    for m in MaskPattern::all() {
        let mut masked = qr.clone();
        masked.apply_mask(m);
        let pen = compute_total_penalty(&masked);
        if pen < best.1 {
            best = (m, pen);
        }
    }
    qr.apply_mask(best.0);
    best.0
}

pub fn compute_total_penalty(qr: &QR) -> u32 {
    let adj_pen = compute_adjacent_penalty(qr);
    let blk_pen = compute_block_penalty(qr);
    let fp_pen_h = compute_finder_pattern_penalty(qr, true);
    let fp_pen_v = compute_finder_pattern_penalty(qr, false);
    let bal_pen = compute_balance_penalty(qr);
    adj_pen + blk_pen + fp_pen_h + fp_pen_v + bal_pen
}

fn compute_adjacent_penalty(qr: &QR) -> u32 {
    let mut pen = 0;
    let w = qr.width();
    let mut cols = vec![(true, 0); w];
    for y in 0..w {
        let mut last = true;
        let mut consec_row_len = 0;
        for (x, col) in cols.iter_mut().enumerate() {
            let clr = qr.get(x as i32, y as i32);
            if last != clr {
                last = clr;
                consec_row_len = 0;
            }
            consec_row_len += 1;
            if consec_row_len == 5 {
                pen += 3;
            } else if consec_row_len > 5 {
                pen += 1;
            }
            if col.0 != clr {
                col.0 = clr;
                col.1 = 0;
            }
            col.1 += 1;
            if col.1 == 5 {
                pen += 3;
            } else if col.1 > 5 {
                pen += 1;
            }
        }
    }
    pen
}

fn compute_block_penalty(qr: &QR) -> u32 {
    let mut pen = 0;
    let w = qr.width() as i32;
    for y in 0..w - 1 {
        for x in 0..w - 1 {
            let clr = qr.get(x, y);
            if clr == qr.get(x + 1, y) && clr == qr.get(x, y + 1) && clr == qr.get(x + 1, y + 1) {
                pen += 3;
            }
        }
    }
    pen
}

fn compute_finder_pattern_penalty(qr: &QR, is_hor: bool) -> u32 {
    static PATTERN: [bool; 7] = [true, false, true, true, true, false, true];

    let mut pen = 0;
    let w = qr.width() as i32;
    for i in 0..w {
        let get = |j: i32| if is_hor { qr.get(j, i) } else { qr.get(i, j) };
        for j in 0..w - 6 {
            if (j..j + 7).map(get).eq(PATTERN.iter().copied()) {
                let is_light_qz = |mut r: Range<i32>| r.all(|k| k < 0 || k >= w || !get(k));
                if is_light_qz(j - 4..j) || is_light_qz(j + 7..j + 11) {
                    pen += 40;
                }
            }
        }
    }
    pen
}

fn compute_balance_penalty(qr: &QR) -> u32 {
    let w = qr.width();
    balance_penalty(qr.count_dark_modules(), w * w)
}

// 10 points per full 5% step the floored dark percentage lies away from 50%. This is the
// stepwise N4 reading, not the ISO 18004:2015 ceil(|20 * dark - 10 * total| / total) - 1
// form, so automatic mask choice can differ from encoders using the latter.
fn balance_penalty(dark: usize, total: usize) -> u32 {
    let percent = dark * 100 / total;
    let deviation = percent.abs_diff(50);
    (deviation / 5 * 10) as u32
}

#[cfg(test)]
mod penalty_tests {
    use test_case::test_case;

    use super::{
        balance_penalty, compute_balance_penalty, compute_block_penalty,
        compute_finder_pattern_penalty,
    };
    use crate::builder::QRBuilder;
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_function_pattern_penalties() {
        let qr = QRBuilder::new(b"HELLO")
            .version(Version::new(1).unwrap())
            .ec_level(ECLevel::L)
            .mask(MaskPattern::new(2))
            .build()
            .unwrap();
        // Rows 2..=4 of every finder pattern see a light quiet zone on at least one side
        assert!(compute_finder_pattern_penalty(&qr, true) >= 9 * 40);
        assert!(compute_finder_pattern_penalty(&qr, false) >= 9 * 40);
        assert_eq!(compute_block_penalty(&qr) % 3, 0);
        assert_eq!(compute_balance_penalty(&qr) % 10, 0);
    }

    #[test_case(50, 100, 0)]
    #[test_case(54, 100, 0)]
    #[test_case(55, 100, 10)]
    #[test_case(45, 100, 10)]
    #[test_case(46, 100, 0)]
    #[test_case(39, 100, 20)]
    #[test_case(0, 441, 100)]
    #[test_case(441, 441, 100)]
    #[test_case(242, 441, 0)]
    fn test_balance_penalty(dark: usize, total: usize, exp: u32) {
        assert_eq!(balance_penalty(dark, total), exp);
    }

    #[test]
    fn test_best_mask_has_lowest_penalty() {
        let data = b"Best mask selection";
        let ver = Version::new(2).unwrap();
        let best = QRBuilder::new(data).version(ver).ec_level(ECLevel::M).build().unwrap();
        let best_pen = super::compute_total_penalty(&best);
        for m in MaskPattern::all() {
            let qr =
                QRBuilder::new(data).version(ver).ec_level(ECLevel::M).mask(m).build().unwrap();
            assert!(best_pen <= super::compute_total_penalty(&qr), "mask {m:?}");
        }
    }
}
