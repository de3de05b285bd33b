use image::{GrayImage, Luma};

use crate::common::ec::Block;
use crate::common::layout::{ModuleType, SymbolLayout};
use crate::common::mask::MaskPattern;
use crate::common::metadata::{format_info, ECLevel, Version};

// Module matrix. True is a dark module.
#[derive(Debug, Clone)]
pub struct QR {
    layout: &'static SymbolLayout,
    grid: Vec<bool>,
    mask: Option<MaskPattern>,
}

// QR type for builder
//------------------------------------------------------------------------------

impl QR {
    // Function patterns are drawn from the layout, everything else starts light
    pub fn new(layout: &'static SymbolLayout) -> Self {
        let grid = layout.cells().iter().map(|c| c.kind.is_function_pattern() && c.value).collect();
        let mut qr = Self { layout, grid, mask: None };
        qr.draw_version_info();
        qr
    }

    pub fn layout(&self) -> &'static SymbolLayout {
        self.layout
    }

    pub fn grid(&self) -> &[bool] {
        &self.grid
    }

    pub fn version(&self) -> Version {
        self.layout.version()
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn ec_level(&self) -> ECLevel {
        self.layout.ec_level()
    }

    pub fn mask(&self) -> Option<MaskPattern> {
        self.mask
    }

    pub fn metadata(&self) -> String {
        format!(
            "{{ Version: {}, Ec level: {:?}, Mask: {:?} }}",
            *self.version(),
            self.ec_level(),
            self.mask.map(|m| *m)
        )
    }

    pub fn count_dark_modules(&self) -> usize {
        self.grid.iter().filter(|&&m| m).count()
    }

    pub fn module_type(&self, x: i32, y: i32) -> ModuleType {
        self.layout.cells()[self.coord_to_index(x, y)].kind
    }

    #[cfg(test)]
    pub fn to_debug_str(&self) -> String {
        let w = self.width() as i32;
        let mut res = String::with_capacity((w * (w + 1)) as usize);
        res.push('\n');
        for y in 0..w {
            for x in 0..w {
                let dark = self.get(x, y);
                let c = match self.module_type(x, y) {
                    ModuleType::Unassigned => '.',
                    ModuleType::FormatInfo => ['M', 'm'][dark as usize],
                    ModuleType::VersionInfo => ['V', 'v'][dark as usize],
                    ModuleType::Data | ModuleType::Ecc | ModuleType::Padding => {
                        ['D', 'd'][dark as usize]
                    }
                    _ => ['F', 'f'][dark as usize],
                };
                res.push(c);
            }
            res.push('\n');
        }
        res
    }

    // Negative coordinates wrap around from the far edge
    fn coord_to_index(&self, x: i32, y: i32) -> usize {
        let w = self.width() as i32;
        debug_assert!(-w <= x && x < w, "x out of bounds: {x}");
        debug_assert!(-w <= y && y < w, "y out of bounds: {y}");

        let x = if x < 0 { x + w } else { x };
        let y = if y < 0 { y + w } else { y };
        (y * w + x) as _
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.grid[self.coord_to_index(x, y)]
    }

    pub fn set(&mut self, x: i32, y: i32, dark: bool) {
        let idx = self.coord_to_index(x, y);
        self.grid[idx] = dark;
    }
}


// Format & version info
//------------------------------------------------------------------------------

impl QR {
    // Both copies, least significant bit first
    pub fn draw_format_info(&mut self, pattern: MaskPattern) {
        let info = format_info(self.ec_level(), pattern);
        for copy in self.layout.format_info_cells() {
            for (i, &idx) in copy.iter().enumerate() {
                self.grid[idx] = (info >> i) & 1 == 1;
            }
        }
    }

    fn draw_version_info(&mut self) {
        let (Some(cells), Some(info)) = (self.layout.version_info_cells(), self.version().info())
        else {
            return;
        };
        for copy in cells {
            for (i, &idx) in copy.iter().enumerate() {
                self.grid[idx] = (info >> i) & 1 == 1;
            }
        }
    }

    pub fn read_format_info(&self) -> [u32; 2] {
        self.layout.format_info_cells().map(|copy| {
            copy.iter().enumerate().fold(0, |acc, (i, &idx)| acc | (self.grid[idx] as u32) << i)
        })
    }
}


// Encoding region
//------------------------------------------------------------------------------

impl QR {
    // Writes every data and ecc bit through the layout's codeword map. Padding cells
    // stay light.
    pub fn draw_blocks(&mut self, blocks: &[Block]) {
        debug_assert!(
            blocks.len() == self.layout.block_count(),
            "Block count mismatch: Expected {}, Found {}",
            self.layout.block_count(),
            blocks.len()
        );

        let layout = self.layout;
        for (b, block) in blocks.iter().enumerate() {
            let codewords = layout.data_blocks()[b].iter().chain(&layout.ecc_blocks()[b]);
            for (cw, &byte) in codewords.zip(block.full()) {
                for (bit, &idx) in cw.modules.iter().enumerate() {
                    self.grid[idx] = (byte << bit) & 0x80 != 0;
                }
            }
        }
    }

    // Inverts the encoding region cells selected by the pattern
    pub fn xor_mask(&mut self, pattern: MaskPattern) {
        let mask = self.layout.mask(pattern);
        self.grid.iter_mut().zip(mask).for_each(|(m, &k)| *m ^= k);
    }

    pub fn apply_mask(&mut self, pattern: MaskPattern) {
        self.xor_mask(pattern);
        self.mask = Some(pattern);
        self.draw_format_info(pattern);
    }

    // Reads the data and ecc codewords of every block back from the unmasked grid
    pub fn read_codewords(&self) -> Vec<Block> {
        let mask = self.mask.map(|m| self.layout.mask(m));
        let bit = |idx: usize| self.grid[idx] ^ mask.is_some_and(|m| m[idx]);
        let layout = self.layout;
        layout
            .data_blocks()
            .iter()
            .zip(layout.ecc_blocks())
            .map(|(data, ecc)| {
                let full = data
                    .iter()
                    .chain(ecc)
                    .map(|cw| cw.modules.iter().fold(0u8, |b, &idx| b << 1 | bit(idx) as u8))
                    .collect::<Vec<_>>();
                Block::with_encoded(&full, data.len())
            })
            .collect()
    }
}


// Render
//------------------------------------------------------------------------------

const QUIET_ZONE: usize = 4;

impl QR {
    pub fn to_image(&self, module_sz: u32) -> GrayImage {
        let qz_sz = QUIET_ZONE as u32 * module_sz;
        let qr_sz = self.width() as u32 * module_sz;
        let total_sz = qz_sz + qr_sz + qz_sz;

        let mut canvas = GrayImage::new(total_sz, total_sz);
        for y in 0..total_sz {
            for x in 0..total_sz {
                if y < qz_sz || y >= qz_sz + qr_sz || x < qz_sz || x >= qz_sz + qr_sz {
                    canvas.put_pixel(x, y, Luma([255]));
                    continue;
                }
                let c = (x - qz_sz) / module_sz;
                let r = (y - qz_sz) / module_sz;
                let pixel = if self.get(c as i32, r as i32) { Luma([0]) } else { Luma([255]) };
                canvas.put_pixel(x, y, pixel);
            }
        }

        canvas
    }

    pub fn to_str(&self, module_sz: usize) -> String {
        let qz_sz = QUIET_ZONE * module_sz;
        let qr_sz = self.width() * module_sz;
        let total_sz = qz_sz + qr_sz + qz_sz;

        let mut canvas = String::new();
        for y in 0..total_sz {
            for x in 0..total_sz {
                if y < qz_sz || y >= qz_sz + qr_sz || x < qz_sz || x >= qz_sz + qr_sz {
                    canvas.push('█');
                    continue;
                }
                let c = ((x - qz_sz) / module_sz) as i32;
                let r = ((y - qz_sz) / module_sz) as i32;
                canvas.push(if self.get(c, r) { ' ' } else { '█' });
            }
            canvas.push('\n');
        }

        canvas
    }
}
