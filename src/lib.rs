//! # qartism
//!
//! A Rust library for generating QR codes, including "magic" QR codes whose modules follow a
//! picture. Part of the symbol is pinned by the caller and the remaining data bits are solved
//! over GF(2) so that the Reed-Solomon error correction still checks out.
//!
//! ## Features
//!
//! - **QR Code Generation**: Versions 1-40 with all four error correction levels
//! - **Optimal Segmentation**: Numeric, alphanumeric and byte segments picked to minimise bits
//! - **Reed-Solomon Error Correction**: Table driven encoding with cached per length tables
//! - **Magic QR Codes**: Pin module colors and let the solver fill in the free data bits
//!
//! ## Quick Start
//!
//! ### Simple QR Code Generation
//!
//! ```rust
//! use qartism::QRBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Simplest usage - provide only data, all other settings are automatically chosen
//! let qr = QRBuilder::new(b"Hello, World!").build()?;
//!
//! let img = qr.to_image(4); // 4x scale factor
//! assert_eq!(img.width(), (qr.width() as u32 + 8) * 4);
//! # Ok(())
//! # }
//! ```
//!
//! ### Full Configuration
//!
//! ```rust
//! use qartism::{ECLevel, MaskPattern, Mode, QRBuilder, Version};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new(b"HELLO WORLD")
//!     .version(Version::new(2)?)   // QR version (size) - if not provided, finds smallest version to fit data
//!     .ec_level(ECLevel::Q)        // Error correction level - if not provided, defaults to ECLevel::M
//!     .mode(Mode::Alphanumeric)    // Single segment mode - if not provided, segments are optimised
//!     .mask(MaskPattern::new(3))   // Mask pattern - if not provided, finds best mask based on penalty score
//!     .build()?;
//!
//! println!("{}", qr.to_str(1));
//! # Ok(())
//! # }
//! ```
//!
//! ### Magic QR Codes
//!
//! ```rust
//! use qartism::magic::{MagicBit, MagicTemplate};
//! use qartism::{encode, ECLevel, MaskPattern, ModuleType, SymbolLayout};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (version, payload) = encode(b"https://example.com", ECLevel::L, None)?;
//! let layout = SymbolLayout::get(version, ECLevel::L);
//! let mask = MaskPattern::new(0);
//!
//! // Free everywhere with a diagonal picture as the preferred look, then pin the payload
//! let mut template = MagicTemplate::new(layout);
//! let w = layout.width();
//! for y in 0..w {
//!     for x in 0..w {
//!         let dark = (x + y) % 4 < 2;
//!         match layout.cell(x, y).kind {
//!             ModuleType::Ecc => template.set(x, y, MagicBit::Fixed(dark)),
//!             _ => template.set(x, y, MagicBit::Free(dark)),
//!         }
//!     }
//! }
//! template.write_payload(&payload, mask)?;
//!
//! let (qr, reports) = template.render(mask, &mut rand::rng())?;
//! assert_eq!(qr.mask(), Some(mask));
//! println!("Unmet ecc targets: {}", reports.iter().map(|r| r.unmet).sum::<usize>());
//! # Ok(())
//! # }
//! ```
//!
//! ## QR Code Components
//!
//! ### Versions
//! - Versions 1-40, with sizes from 21x21 to 177x177 modules
//!
//! ### Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction
//!
//! ## Magic QR Codes
//!
//! Reed-Solomon encoding is linear over GF(2): flipping one data bit flips a fixed set of ecc
//! bits, no matter what the rest of the block holds. The solver collects these contribution
//! vectors for the free data bits, keeps an independent subset of them in a reduced basis,
//! and combines them to move the ecc onto the pinned values. Free bits the basis has no room
//! for keep their preferred value. When there are more pinned ecc bits than free data bits,
//! some pins are missed and reported as unmet.

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub(crate) mod common;
pub mod magic;

pub use builder::{build_symbol, QRBuilder, QR};
pub use common::bit_utils::BitStream;
pub use common::codec::{encode, encode_with_version, Mode};
pub use common::ec::Block;
pub use common::error::{QRError, QRResult};
pub use common::layout::{BitAddr, Cell, Codeword, ModuleType, SymbolLayout};
pub use common::mask::MaskPattern;
pub use common::metadata::{ECLevel, Version};
