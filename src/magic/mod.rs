//! Constrained symbols. Callers pin module colors with a template and the solver picks the
//! free data bits so the error correction codewords land on the pinned ecc modules.

mod elimination;
mod solver;

pub use elimination::{Bits256, EliminationTarget};
pub use solver::{
    match_block, solve_constrained, BlockTemplate, MagicBit, MagicTemplate, MatchReport,
};
