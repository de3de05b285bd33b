mod qr;

pub use qr::QR;

use log::{debug, info};

use crate::common::{
    bit_utils::BitStream,
    codec::{encode, encode_with_version, writer::pad_remaining_capacity, Mode},
    ec::Block,
    error::{QRError, QRResult},
    layout::SymbolLayout,
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<Version>,
    ec_level: ECLevel,
    mode: Option<Mode>,
    mask: Option<MaskPattern>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, ec_level: ECLevel::M, mode: None, mask: None }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = Some(mode);
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn metadata(&self) -> String {
        match self.version {
            Some(v) => format!(
                "{{ Version: {}, Ec level: {:?}, Mode: {:?} }}",
                *v, self.ec_level, self.mode
            ),
            None => {
                format!("{{ Version: None, Ec level: {:?}, Mode: {:?} }}", self.ec_level, self.mode)
            }
        }
    }
}


impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QR> {
        debug!("Generating QR {}", self.metadata());
        if self.data.is_empty() {
            return Err(QRError::EmptyData);
        }

        let (version, encoded) = match self.version {
            Some(v) => (v, encode_with_version(self.data, v, self.ec_level, self.mode)?),
            None => encode(self.data, self.ec_level, self.mode)?,
        };
        let encoded_len = encoded.len();

        let qr = build_symbol(&encoded, version, self.ec_level, self.mask)?;

        let total_modules = qr.width() * qr.width();
        let dark_modules = qr.count_dark_modules();
        info!(
            "QR generated {}: Data size {}, Encoded bits {}, Capacity bits {}, Balance {}%",
            qr.metadata(),
            self.data.len(),
            encoded_len,
            version.data_bit_capacity(self.ec_level),
            dark_modules * 100 / total_modules
        );

        Ok(qr)
    }
}

// Symbol assembly
//------------------------------------------------------------------------------

// Pads the payload to capacity, computes ecc per block and draws the masked symbol.
// Without an explicit mask the pattern with the lowest penalty is picked.
pub fn build_symbol(
    payload: &BitStream,
    version: Version,
    ec_level: ECLevel,
    mask: Option<MaskPattern>,
) -> QRResult<QR> {
    let bit_capacity = version.data_bit_capacity(ec_level);
    if payload.len() > bit_capacity {
        return Err(QRError::DataTooLong);
    }

    let mut padded = BitStream::new(bit_capacity);
    payload.bits().for_each(|b| padded.push(b));
    pad_remaining_capacity(&mut padded);

    debug!("Computing ecc for {} codewords", padded.data().len());
    let blocks = compute_blocks(padded.data(), version, ec_level);

    let mut qr = QR::new(SymbolLayout::get(version, ec_level));
    qr.draw_blocks(&blocks);

    let mask = match mask {
        Some(m) => {
            qr.apply_mask(m);
            m
        }
        None => apply_best_mask(&mut qr),
    };
    debug!("Applied mask {}", *mask);

    Ok(qr)
}

pub(crate) fn compute_blocks(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<Block> {
    let ecc_len = version.ecc_per_block(ec_level);
    blockify(data, version, ec_level)
        .into_iter()
        .map(|chunk| Block::new(chunk, chunk.len() + ecc_len))
        .collect()
}

pub(crate) fn blockify(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<&[u8]> {
    let (block1_size, block1_count, block2_size, block2_count) =
        version.data_codewords_per_block(ec_level);

    let total_blocks = block1_count + block2_count;
    let total_block1_size = block1_size * block1_count;
    let total_size = total_block1_size + block2_size * block2_count;

    debug_assert!(
        total_size == data.len(),
        "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
        data.len(),
        total_size
    );

    let mut data_blocks = Vec::with_capacity(total_blocks);
    data_blocks.extend(data[..total_block1_size].chunks(block1_size));
    if block2_size > 0 {
        data_blocks.extend(data[total_block1_size..].chunks(block2_size));
    }
    data_blocks
}
