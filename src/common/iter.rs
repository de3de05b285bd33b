use super::metadata::Version;

// Iterator over the encoding region of a symbol
//------------------------------------------------------------------------------

// Yields (x, y) in placement order: two column wide strips from the right edge,
// alternating between upward and downward sweeps, skipping the vertical timing column.
// Function pattern cells are yielded as well and are filtered by the caller.
pub struct EncRegionIter {
    x: i16,
    y: i16,
    width: i16,
}

const VERT_TIMING_COL: i16 = 6;

impl EncRegionIter {
    pub const fn new(version: Version) -> Self {
        let w = version.width() as i16;
        Self { x: w - 1, y: w - 1, width: w }
    }
}

impl Iterator for EncRegionIter {
    type Item = (usize, usize);
    fn next(&mut self) -> Option<Self::Item> {
        if self.x < 0 {
            return None;
        }
        let adjusted_col = if self.x <= VERT_TIMING_COL { self.x + 1 } else { self.x };
        let res = (self.x as usize, self.y as usize);
        let col_type = (self.width - adjusted_col) % 4;
        match col_type {
            2 if self.y > 0 => {
                self.y -= 1;
                self.x += 1;
            }
            0 if self.y < self.width - 1 => {
                self.y += 1;
                self.x += 1;
            }
            0 | 2 if self.x == VERT_TIMING_COL + 1 => {
                self.x -= 2;
            }
            _ => {
                self.x -= 1;
            }
        }
        Some(res)
    }
}
