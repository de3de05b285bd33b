use std::sync::OnceLock;

use log::debug;

use super::error::{QRError, QRResult};
use super::iter::EncRegionIter;
use super::mask::MaskPattern;
use super::metadata::{ECLevel, Version, FORMAT_INFO_BIT_LEN, VERSION_INFO_BIT_LEN};

// Module type
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ModuleType {
    Unassigned,
    FinderPattern,
    Separator,
    TimingPattern,
    AlignmentPattern,
    OtherFixed,
    FormatInfo,
    VersionInfo,
    Data,
    Ecc,
    Padding,
}

impl ModuleType {
    // Cells touched by masking
    pub fn is_encoding_region(self) -> bool {
        matches!(self, Self::Data | Self::Ecc | Self::Padding)
    }

    // Cells whose value is fixed by the layout itself
    pub fn is_function_pattern(self) -> bool {
        matches!(
            self,
            Self::FinderPattern
                | Self::Separator
                | Self::TimingPattern
                | Self::AlignmentPattern
                | Self::OtherFixed
        )
    }
}

// Address of a single data or ecc bit within its block. Bit 0 is the msb of the codeword.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct BitAddr {
    pub block: usize,
    pub index: usize,
    pub bit: usize,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
    pub kind: ModuleType,
    // Dark or light for function patterns, false elsewhere
    pub value: bool,
    // Set for Data and Ecc cells only
    pub addr: Option<BitAddr>,
}

// One data or ecc byte and the cells holding its bits, msb first. Cells are indexed
// as y * width + x.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Codeword {
    pub kind: ModuleType,
    pub block: usize,
    pub index: usize,
    pub modules: [usize; 8],
}

// Symbol layout
//------------------------------------------------------------------------------

#[derive(Debug)]
pub struct SymbolLayout {
    version: Version,
    ec_level: ECLevel,
    width: usize,
    cells: Vec<Cell>,
    data_blocks: Vec<Vec<Codeword>>,
    ecc_blocks: Vec<Vec<Codeword>>,
    // (block, index) of each data codeword in bit stream order
    data_order: Vec<(usize, usize)>,
    format_info: [[usize; FORMAT_INFO_BIT_LEN]; 2],
    version_info: Option<[[usize; VERSION_INFO_BIT_LEN]; 2]>,
    masks: [OnceLock<Vec<bool>>; 8],
}

const LAYOUT_COUNT: usize = 40 * 4;

impl SymbolLayout {
    // Layouts are built on first use and shared afterwards
    pub fn get(version: Version, ec_level: ECLevel) -> &'static Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const INIT: OnceLock<SymbolLayout> = OnceLock::new();
        static LAYOUTS: [OnceLock<SymbolLayout>; LAYOUT_COUNT] = [INIT; LAYOUT_COUNT];

        let idx = (*version - 1) * 4 + ec_level as usize;
        LAYOUTS[idx].get_or_init(|| LayoutBuilder::new(version, ec_level).build())
    }

    pub fn lookup(version: usize, ec_level: u8) -> QRResult<&'static Self> {
        let version = Version::new(version)?;
        let ec_level = ECLevel::try_from(ec_level)?;
        Ok(Self::get(version, ec_level))
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ec_level
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cells[y * self.width + x]
    }

    pub fn block_count(&self) -> usize {
        self.data_blocks.len()
    }

    pub fn data_capacity(&self) -> usize {
        self.data_order.len()
    }

    pub fn ecc_per_block(&self) -> usize {
        self.version.ecc_per_block(self.ec_level)
    }

    pub fn data_blocks(&self) -> &[Vec<Codeword>] {
        &self.data_blocks
    }

    pub fn ecc_blocks(&self) -> &[Vec<Codeword>] {
        &self.ecc_blocks
    }

    // Data codewords in the order the encoded bit stream fills them
    pub fn data_codewords(&self) -> impl Iterator<Item = &Codeword> + '_ {
        self.data_order.iter().map(|&(b, i)| &self.data_blocks[b][i])
    }

    pub fn format_info_cells(&self) -> &[[usize; FORMAT_INFO_BIT_LEN]; 2] {
        &self.format_info
    }

    pub fn version_info_cells(&self) -> Option<&[[usize; VERSION_INFO_BIT_LEN]; 2]> {
        self.version_info.as_ref()
    }

    // Flags the encoding region cells the pattern inverts
    pub fn mask(&self, pattern: MaskPattern) -> &[bool] {
        self.masks[*pattern as usize].get_or_init(|| {
            let f = pattern.mask_functions();
            self.cells.iter().map(|c| c.kind.is_encoding_region() && f(c.x, c.y)).collect()
        })
    }

    // Checks bit counts of a block template against the block structure
    pub fn validate_block_len(
        &self,
        block: usize,
        data_len: usize,
        ecc_len: usize,
    ) -> QRResult<()> {
        let exp = self.data_blocks[block].len() * 8;
        if data_len != exp {
            return Err(QRError::TemplateMismatch { expected: exp, actual: data_len });
        }
        let exp = self.ecc_blocks[block].len() * 8;
        if ecc_len != exp {
            return Err(QRError::TemplateMismatch { expected: exp, actual: ecc_len });
        }
        Ok(())
    }
}

#[cfg(test)]
impl SymbolLayout {
    pub fn to_debug_str(&self) -> String {
        let w = self.width;
        let mut res = String::with_capacity(w * (w + 1));
        for (i, c) in self.cells.iter().enumerate() {
            if i > 0 && i % w == 0 {
                res.push('\n');
            }
            let ch = match (c.kind, c.value) {
                (ModuleType::Unassigned, _) => '.',
                (ModuleType::FinderPattern, true) => 'f',
                (ModuleType::FinderPattern, false) => 'F',
                (ModuleType::Separator, _) => 'S',
                (ModuleType::TimingPattern, true) => 't',
                (ModuleType::TimingPattern, false) => 'T',
                (ModuleType::AlignmentPattern, true) => 'a',
                (ModuleType::AlignmentPattern, false) => 'A',
                (ModuleType::OtherFixed, _) => 'o',
                (ModuleType::FormatInfo, _) => 'm',
                (ModuleType::VersionInfo, _) => 'v',
                (ModuleType::Data, _) => 'd',
                (ModuleType::Ecc, _) => 'e',
                (ModuleType::Padding, _) => 'p',
            };
            res.push(ch);
        }
        res
    }
}

// Layout construction
//------------------------------------------------------------------------------

struct LayoutBuilder {
    version: Version,
    ec_level: ECLevel,
    width: usize,
    cells: Vec<Cell>,
}

impl LayoutBuilder {
    fn new(version: Version, ec_level: ECLevel) -> Self {
        let width = version.width();
        let cells = (0..width * width)
            .map(|i| Cell {
                x: i % width,
                y: i / width,
                kind: ModuleType::Unassigned,
                value: false,
                addr: None,
            })
            .collect();
        Self { version, ec_level, width, cells }
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn is_unassigned(&self, x: usize, y: usize) -> bool {
        self.cells[self.idx(x, y)].kind == ModuleType::Unassigned
    }

    fn set(&mut self, x: usize, y: usize, kind: ModuleType, value: bool) {
        let idx = self.idx(x, y);
        self.cells[idx].kind = kind;
        self.cells[idx].value = value;
    }

    fn build(mut self) -> SymbolLayout {
        debug!("Building layout: Version {}, EC level {:?}", *self.version, self.ec_level);

        self.draw_finder_patterns();
        self.draw_separators();
        self.draw_alignment_patterns();
        self.draw_timing_patterns();
        self.draw_dark_module();
        let format_info = self.reserve_format_info();
        let version_info = self.reserve_version_info();
        let (data_blocks, ecc_blocks, data_order) = self.assign_codewords();

        assert!(
            self.cells.iter().all(|c| c.kind != ModuleType::Unassigned),
            "Unassigned cell in layout: Version {}, EC level {:?}",
            *self.version,
            self.ec_level
        );

        let masks = [(); 8].map(|_| OnceLock::new());
        SymbolLayout {
            version: self.version,
            ec_level: self.ec_level,
            width: self.width,
            cells: self.cells,
            data_blocks,
            ecc_blocks,
            data_order,
            format_info,
            version_info,
            masks,
        }
    }
}

// Function patterns
//------------------------------------------------------------------------------

impl LayoutBuilder {
    fn draw_finder_patterns(&mut self) {
        let w = self.width;
        for (x0, y0) in [(0, 0), (w - 7, 0), (0, w - 7)] {
            for dy in 0..7usize {
                for dx in 0..7usize {
                    let ring = dx.abs_diff(3).max(dy.abs_diff(3));
                    self.set(x0 + dx, y0 + dy, ModuleType::FinderPattern, ring != 2);
                }
            }
        }
    }

    // Light border on the inner sides of each finder pattern
    fn draw_separators(&mut self) {
        let w = self.width;
        for y in 0..8 {
            self.set(7, y, ModuleType::Separator, false);
            self.set(w - 8, y, ModuleType::Separator, false);
            self.set(7, w - 1 - y, ModuleType::Separator, false);
        }
        for x in 0..8 {
            self.set(x, 7, ModuleType::Separator, false);
            self.set(w - 1 - x, 7, ModuleType::Separator, false);
            self.set(x, w - 8, ModuleType::Separator, false);
        }
    }

    fn draw_alignment_patterns(&mut self) {
        let positions = self.version.alignment_pattern();
        let Some(last) = positions.len().checked_sub(1) else {
            return;
        };
        for (i, &cy) in positions.iter().enumerate() {
            for (j, &cx) in positions.iter().enumerate() {
                // Overlaps a finder pattern
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                for y in cy - 2..=cy + 2 {
                    for x in cx - 2..=cx + 2 {
                        let ring = x.abs_diff(cx).max(y.abs_diff(cy));
                        self.set(x, y, ModuleType::AlignmentPattern, ring != 1);
                    }
                }
            }
        }
    }

    fn draw_timing_patterns(&mut self) {
        let w = self.width;
        for i in 8..w - 8 {
            if self.is_unassigned(i, 6) {
                self.set(i, 6, ModuleType::TimingPattern, i & 1 == 0);
            }
            if self.is_unassigned(6, i) {
                self.set(6, i, ModuleType::TimingPattern, i & 1 == 0);
            }
        }
    }

    fn draw_dark_module(&mut self) {
        let w = self.width;
        self.set(8, w - 8, ModuleType::OtherFixed, true);
    }

    // Cell indices of both format info copies, least significant bit first
    fn reserve_format_info(&mut self) -> [[usize; FORMAT_INFO_BIT_LEN]; 2] {
        let w = self.width;
        let mut main = [(0, 0); FORMAT_INFO_BIT_LEN];
        let mut copy = [(0, 0); FORMAT_INFO_BIT_LEN];
        for i in 0..FORMAT_INFO_BIT_LEN {
            main[i] = match i {
                0..=5 => (8, i),
                6 => (8, 7),
                7 => (8, 8),
                8 => (7, 8),
                _ => (14 - i, 8),
            };
            copy[i] = match i {
                0..=7 => (w - 1 - i, 8),
                _ => (8, w - 15 + i),
            };
        }

        let mut res = [[0; FORMAT_INFO_BIT_LEN]; 2];
        for (k, points) in [main, copy].into_iter().enumerate() {
            for (i, (x, y)) in points.into_iter().enumerate() {
                self.set(x, y, ModuleType::FormatInfo, false);
                res[k][i] = self.idx(x, y);
            }
        }
        res
    }

    // Two 6x3 blocks next to the top right and bottom left finder patterns
    fn reserve_version_info(&mut self) -> Option<[[usize; VERSION_INFO_BIT_LEN]; 2]> {
        if *self.version < 7 {
            return None;
        }
        let w = self.width;
        let mut res = [[0; VERSION_INFO_BIT_LEN]; 2];
        for i in 0..VERSION_INFO_BIT_LEN {
            let (a, b) = (w - 11 + i % 3, i / 3);
            self.set(a, b, ModuleType::VersionInfo, false);
            self.set(b, a, ModuleType::VersionInfo, false);
            res[0][i] = self.idx(a, b);
            res[1][i] = self.idx(b, a);
        }
        Some(res)
    }
}

// Codeword placement
//------------------------------------------------------------------------------

type Blocks = Vec<Vec<Codeword>>;

impl LayoutBuilder {
    // Interleaved codeword order: byte i of every data block for increasing i, long
    // blocks contributing their extra byte last, followed by the ecc blocks likewise
    fn interleaved_order(
        data_blocks: &Blocks,
        ecc_blocks: &Blocks,
    ) -> Vec<(ModuleType, usize, usize)> {
        let mut res = Vec::new();
        for (kind, blocks) in [(ModuleType::Data, data_blocks), (ModuleType::Ecc, ecc_blocks)] {
            let max_len = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
            for i in 0..max_len {
                for (b, block) in blocks.iter().enumerate() {
                    if i < block.len() {
                        res.push((kind, b, i));
                    }
                }
            }
        }
        res
    }

    fn assign_codewords(&mut self) -> (Blocks, Blocks, Vec<(usize, usize)>) {
        let (b1_size, b1_count, b2_size, b2_count) =
            self.version.data_codewords_per_block(self.ec_level);
        let ecc_len = self.version.ecc_per_block(self.ec_level);

        let new_block = |kind: ModuleType, block: usize, len: usize| -> Vec<Codeword> {
            (0..len).map(|index| Codeword { kind, block, index, modules: [0; 8] }).collect()
        };
        let block_sizes = std::iter::repeat(b1_size)
            .take(b1_count)
            .chain(std::iter::repeat(b2_size).take(b2_count))
            .collect::<Vec<_>>();
        let mut data_blocks: Blocks = block_sizes
            .iter()
            .enumerate()
            .map(|(b, &len)| new_block(ModuleType::Data, b, len))
            .collect();
        let mut ecc_blocks: Blocks =
            (0..block_sizes.len()).map(|b| new_block(ModuleType::Ecc, b, ecc_len)).collect();

        let data_order = block_sizes
            .iter()
            .enumerate()
            .flat_map(|(b, &len)| (0..len).map(move |i| (b, i)))
            .collect::<Vec<_>>();

        let order = Self::interleaved_order(&data_blocks, &ecc_blocks);
        let total_bits = order.len() * 8;
        let mut offset = 0;
        for (x, y) in EncRegionIter::new(self.version) {
            if !self.is_unassigned(x, y) {
                continue;
            }
            let idx = self.idx(x, y);
            if offset < total_bits {
                let (kind, block, index) = order[offset >> 3];
                let bit = offset & 7;
                let codeword = match kind {
                    ModuleType::Data => &mut data_blocks[block][index],
                    _ => &mut ecc_blocks[block][index],
                };
                codeword.modules[bit] = idx;
                self.cells[idx].kind = kind;
                self.cells[idx].addr = Some(BitAddr { block, index, bit });
            } else {
                self.cells[idx].kind = ModuleType::Padding;
            }
            offset += 1;
        }
        debug_assert!(offset >= total_bits, "Codewords exceed encoding region: {offset}");

        (data_blocks, ecc_blocks, data_order)
    }
}

#[cfg(test)]
mod layout_tests {
    use test_case::test_case;

    use super::{ModuleType, SymbolLayout};
    use crate::common::error::QRError;
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_layout_completeness() {
        for ver in Version::all() {
            for ecl in ECLevel::ALL {
                let layout = SymbolLayout::get(ver, ecl);
                let w = ver.width();
                let cells = layout.cells();
                assert_eq!(cells.len(), w * w);
                assert!(cells.iter().all(|c| c.kind != ModuleType::Unassigned));

                let count = |k: ModuleType| cells.iter().filter(|c| c.kind == k).count();
                let codewords = ver.data_capacity(ecl) + ver.total_ecc_codewords(ecl);
                assert_eq!(count(ModuleType::Data) + count(ModuleType::Ecc), 8 * codewords);
                assert_eq!(count(ModuleType::Ecc), 8 * ver.total_ecc_codewords(ecl));
                assert_eq!(count(ModuleType::Padding), ver.remainder_bits(), "{ver:?} {ecl:?}");
                assert_eq!(count(ModuleType::FormatInfo), 30);
                let vi = if *ver >= 7 { 36 } else { 0 };
                assert_eq!(count(ModuleType::VersionInfo), vi);
            }
        }
    }

    #[test]
    fn test_codeword_back_references() {
        for (v, ecl) in [(1, ECLevel::L), (5, ECLevel::Q), (7, ECLevel::M), (40, ECLevel::H)] {
            let layout = SymbolLayout::get(Version::new(v).unwrap(), ecl);
            let blocks = layout.data_blocks().iter().chain(layout.ecc_blocks());
            for cw in blocks.flatten() {
                for (bit, &m) in cw.modules.iter().enumerate() {
                    let cell = &layout.cells()[m];
                    assert_eq!(cell.kind, cw.kind);
                    let addr = cell.addr.unwrap();
                    assert_eq!((addr.block, addr.index, addr.bit), (cw.block, cw.index, bit));
                }
            }
        }
    }

    #[test]
    fn test_layout_v1() {
        let layout = SymbolLayout::get(Version::new(1).unwrap(), ECLevel::L);
        let exp = "\
fffffffSmddddSfffffff
fFFFFFfSmddddSfFFFFFf
fFfffFfSmddddSfFfffFf
fFfffFfSmddddSfFfffFf
fFfffFfSmddddSfFfffFf
fFFFFFfSmddddSfFFFFFf
fffffffStTtTtSfffffff
SSSSSSSSmddddSSSSSSSS
mmmmmmtmmddddmmmmmmmm
eeeeeeTeeeedddddddddd
eeeeeeteeeedddddddddd
eeeeeeTeeeedddddddddd
eeeeeeteeeedddddddddd
SSSSSSSSoeedddddddddd
fffffffSmeedddddddddd
fFFFFFfSmeedddddddddd
fFfffFfSmeedddddddddd
fFfffFfSmeedddddddddd
fFfffFfSmeedddddddddd
fFFFFFfSmeedddddddddd
fffffffSmeedddddddddd";
        assert_eq!(layout.to_debug_str(), exp);
    }

    #[test]
    fn test_first_codeword_placement() {
        let layout = SymbolLayout::get(Version::new(1).unwrap(), ECLevel::L);
        let first = &layout.data_blocks()[0][0];
        let w = layout.width();
        let exp = [(20, 20), (19, 20), (20, 19), (19, 19), (20, 18), (19, 18), (20, 17), (19, 17)];
        let exp = exp.map(|(x, y)| y * w + x);
        assert_eq!(first.modules, exp);
    }

    #[test]
    fn test_interleaved_blocks() {
        // Version 5-Q has two blocks of 15 and two of 16 data codewords
        let layout = SymbolLayout::get(Version::new(5).unwrap(), ECLevel::Q);
        let lens = layout.data_blocks().iter().map(|b| b.len()).collect::<Vec<_>>();
        assert_eq!(lens, [15, 15, 16, 16]);
        let first = layout.cell(w_minus_1(layout), w_minus_1(layout)).addr.unwrap();
        assert_eq!((first.block, first.index, first.bit), (0, 0, 0));
        // Stream order is block by block
        let order = layout.data_codewords().map(|c| (c.block, c.index)).take(17).last();
        assert_eq!(order, Some((1, 1)));
    }

    fn w_minus_1(layout: &SymbolLayout) -> usize {
        layout.width() - 1
    }

    #[test]
    fn test_function_patterns() {
        let layout = SymbolLayout::get(Version::new(7).unwrap(), ECLevel::M);
        let w = layout.width();
        let dark = layout.cell(8, w - 8);
        assert_eq!((dark.kind, dark.value), (ModuleType::OtherFixed, true));
        // Alignment centers skip the three finder corners
        let center = layout.cell(22, 22);
        assert_eq!((center.kind, center.value), (ModuleType::AlignmentPattern, true));
        assert!(!layout.cell(23, 22).value);
        assert_eq!(layout.cell(22, 6).kind, ModuleType::AlignmentPattern);
        assert_eq!(layout.cell(6, 22).kind, ModuleType::AlignmentPattern);
        assert_eq!(layout.cell(38, 38).kind, ModuleType::AlignmentPattern);
        assert_eq!(layout.cell(38, 6).kind, ModuleType::FinderPattern);
        assert_eq!(layout.cell(6, 38).kind, ModuleType::FinderPattern);
        // Timing pattern runs between the separators
        for i in 8..w - 8 {
            let cell = layout.cell(i, 6);
            if cell.kind == ModuleType::TimingPattern {
                assert_eq!(cell.value, i % 2 == 0);
            }
        }
        assert_eq!(layout.cell(w - 11, 0).kind, ModuleType::VersionInfo);
        assert_eq!(layout.cell(5, w - 9).kind, ModuleType::VersionInfo);
    }

    #[test_case(1)]
    #[test_case(14)]
    #[test_case(40)]
    fn test_finder_rings(v: usize) {
        let layout = SymbolLayout::get(Version::new(v).unwrap(), ECLevel::Q);
        let w = layout.width();
        for (x0, y0) in [(0, 0), (w - 7, 0), (0, w - 7)] {
            for dy in 0..7 {
                for dx in 0..7 {
                    let cell = layout.cell(x0 + dx, y0 + dy);
                    let light_ring = (dx == 1 || dx == 5) && (1..=5).contains(&dy)
                        || (dy == 1 || dy == 5) && (1..=5).contains(&dx);
                    assert_eq!(cell.kind, ModuleType::FinderPattern);
                    assert_eq!(cell.value, !light_ring, "({dx}, {dy})");
                }
            }
        }
        // Bottom right corner carries no finder
        assert_ne!(layout.cell(w - 1, w - 1).kind, ModuleType::FinderPattern);
    }

    #[test_case(0)]
    #[test_case(3)]
    #[test_case(7)]
    fn test_mask_covers_encoding_region(pattern: u8) {
        let layout = SymbolLayout::get(Version::new(3).unwrap(), ECLevel::H);
        let pattern = MaskPattern::new(pattern);
        let mask = layout.mask(pattern);
        let f = pattern.mask_functions();
        for (c, &m) in layout.cells().iter().zip(mask) {
            assert_eq!(m, c.kind.is_encoding_region() && f(c.x, c.y));
        }
        assert!(std::ptr::eq(mask, layout.mask(pattern)));
    }

    #[test]
    fn test_lookup() {
        assert!(SymbolLayout::lookup(40, 3).is_ok());
        assert_eq!(SymbolLayout::lookup(0, 1).unwrap_err(), QRError::InvalidVersion);
        assert_eq!(SymbolLayout::lookup(41, 1).unwrap_err(), QRError::InvalidVersion);
        assert_eq!(SymbolLayout::lookup(1, 4).unwrap_err(), QRError::InvalidECLevel);
        let a = SymbolLayout::lookup(2, 0).unwrap();
        let b = SymbolLayout::get(Version::new(2).unwrap(), ECLevel::L);
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_validate_block_len() {
        let layout = SymbolLayout::get(Version::new(1).unwrap(), ECLevel::M);
        assert!(layout.validate_block_len(0, 16 * 8, 10 * 8).is_ok());
        let res = layout.validate_block_len(0, 15 * 8, 10 * 8);
        assert_eq!(res.unwrap_err(), QRError::TemplateMismatch { expected: 128, actual: 120 });
        let res = layout.validate_block_len(0, 16 * 8, 8);
        assert_eq!(res.unwrap_err(), QRError::TemplateMismatch { expected: 80, actual: 8 });
    }
}
