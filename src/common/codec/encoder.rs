pub use encode::*;

// Encoder
//------------------------------------------------------------------------------

pub mod encode {
    use log::debug;

    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{Mode, Segment};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::{ECLevel, Version};

    use super::writer::{push_segment, push_terminator};

    // Versions at which the char count field widens
    const VERSION_TIERS: [usize; 3] = [1, 10, 27];

    // Encodes data into the smallest version that holds it. The stream carries the
    // terminator but no padding, its capacity is the data bit capacity of the version.
    pub fn encode(
        data: &[u8],
        ecl: ECLevel,
        mode: Option<Mode>,
    ) -> QRResult<(Version, BitStream)> {
        if data.is_empty() {
            return Err(QRError::EmptyData);
        }
        if let Some(m) = mode {
            validate_mode(data, m)?;
        }

        let (ver, segs) = find_optimal_version_and_segments(data, ecl, mode)?;
        debug!("Encoding {} bytes: Version {}, Segments {}", data.len(), *ver, segs.len());
        Ok((ver, write_segments(segs, ver.data_bit_capacity(ecl))))
    }

    pub fn encode_with_version(
        data: &[u8],
        ver: Version,
        ecl: ECLevel,
        mode: Option<Mode>,
    ) -> QRResult<BitStream> {
        if data.is_empty() {
            return Err(QRError::EmptyData);
        }
        let segs = match mode {
            Some(m) => {
                validate_mode(data, m)?;
                vec![Segment::with_version(m, ver, data)]
            }
            None => compute_optimal_segments(data, ver),
        };
        let bcap = ver.data_bit_capacity(ecl);
        if !fits(&segs, bcap) {
            return Err(QRError::DataTooLong);
        }
        Ok(write_segments(segs, bcap))
    }

    fn validate_mode(data: &[u8], mode: Mode) -> QRResult<()> {
        match data.iter().all(|&b| mode.contains(b)) {
            true => Ok(()),
            false => Err(QRError::InvalidChar),
        }
    }

    fn write_segments(segs: Vec<Segment>, bcap: usize) -> BitStream {
        let mut bs = BitStream::new(bcap);
        for seg in segs {
            push_segment(seg, &mut bs);
        }
        push_terminator(&mut bs);
        bs
    }

    // Total size within capacity, and every char count representable in its length field
    fn fits(segs: &[Segment], bcap: usize) -> bool {
        let sz: usize = segs.iter().map(|s| s.bit_len()).sum();
        sz <= bcap && segs.iter().all(|s| s.data.len() < 1 << s.len_bits)
    }

    fn find_optimal_version_and_segments(
        data: &[u8],
        ecl: ECLevel,
        mode: Option<Mode>,
    ) -> QRResult<(Version, Vec<Segment>)> {
        let mut segs = vec![];
        for ver in Version::all() {
            // Header widths are constant within a tier
            if VERSION_TIERS.contains(&*ver) {
                segs = match mode {
                    Some(m) => vec![Segment::with_version(m, ver, data)],
                    None => compute_optimal_segments(data, ver),
                };
            }
            if fits(&segs, ver.data_bit_capacity(ecl)) {
                return Ok((ver, segs));
            }
        }
        Err(QRError::CapacityOverflow)
    }

    // Optimal segmentation
    //--------------------------------------------------------------------------

    // Tail of a candidate segmentation. Nodes form a forest in a flat list, parent
    // indices point at the preceding segment.
    #[derive(Debug, Clone, Copy)]
    struct Node {
        mode: Mode,
        len: usize,
        bits: usize,
        total: usize,
        parent: Option<usize>,
    }

    // Predecessor trees are tried in this order, ties keep the earlier one
    const TREE_ORDER: [Mode; 3] = [Mode::Byte, Mode::Alphanumeric, Mode::Numeric];

    fn tree_index(mode: Mode) -> usize {
        match mode {
            Mode::Numeric => 0,
            Mode::Alphanumeric => 1,
            Mode::Byte => 2,
        }
    }

    // Runs of bytes sharing the same narrowest mode
    fn spans(data: &[u8]) -> Vec<(Mode, usize)> {
        let mut res: Vec<(Mode, usize)> = Vec::new();
        for &b in data {
            let m = Mode::of(b);
            match res.last_mut() {
                Some((last, len)) if *last == m => *len += 1,
                _ => res.push((m, 1)),
            }
        }
        res
    }

    // Keeps, per mode, the cheapest segmentation whose last segment is in that mode.
    // A span either extends a same mode tail or starts a new segment after any tail.
    pub fn compute_optimal_segments(data: &[u8], ver: Version) -> Vec<Segment> {
        debug_assert!(!data.is_empty(), "Empty data");

        let seg_bits = |mode: Mode, len: usize| {
            ver.mode_bits() + ver.char_cnt_bits(mode) + mode.encoded_len(len)
        };

        let mut nodes: Vec<Node> = Vec::new();
        let mut best: [Option<usize>; 3] = [None; 3];
        for (span_mode, span_len) in spans(data) {
            let is_first = best.iter().all(Option::is_none);
            let mut next = [None; 3];
            for mode in Mode::ALL.into_iter().filter(|&m| m >= span_mode) {
                let mut cand: Option<Node> = None;
                if is_first {
                    let bits = seg_bits(mode, span_len);
                    cand = Some(Node { mode, len: span_len, bits, total: bits, parent: None });
                }
                for prev in TREE_ORDER.iter().filter_map(|&m| best[tree_index(m)]) {
                    let root = nodes[prev];
                    let node = if root.mode == mode {
                        let len = root.len + span_len;
                        let bits = seg_bits(mode, len);
                        let total = root.total - root.bits + bits;
                        Node { mode, len, bits, total, parent: root.parent }
                    } else {
                        let bits = seg_bits(mode, span_len);
                        let total = root.total + bits;
                        Node { mode, len: span_len, bits, total, parent: Some(prev) }
                    };
                    if cand.map_or(true, |c| node.total < c.total) {
                        cand = Some(node);
                    }
                }
                if let Some(node) = cand {
                    nodes.push(node);
                    next[tree_index(mode)] = Some(nodes.len() - 1);
                }
            }
            best = next;
        }

        let mut tail = None;
        for i in TREE_ORDER.iter().filter_map(|&m| best[tree_index(m)]) {
            if tail.map_or(true, |t: usize| nodes[i].total < nodes[t].total) {
                tail = Some(i);
            }
        }

        let mut chain = Vec::new();
        while let Some(i) = tail {
            chain.push(nodes[i]);
            tail = nodes[i].parent;
        }
        build_segments(ver, chain.iter().rev().map(|n| (n.mode, n.len)), data)
    }

    fn build_segments(
        ver: Version,
        runs: impl Iterator<Item = (Mode, usize)>,
        data: &[u8],
    ) -> Vec<Segment> {
        let mut segs = Vec::new();
        let mut start = 0;
        for (mode, len) in runs {
            segs.push(Segment::with_version(mode, ver, &data[start..start + len]));
            start += len;
        }
        debug_assert!(start == data.len(), "Segments don't cover data: {start}");
        segs
    }

}

// Writer for encoded data
//------------------------------------------------------------------------------

pub(crate) mod writer {
    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{Mode, Segment, PADDING_CODEWORDS};

    pub fn push_segment(seg: Segment, out: &mut BitStream) {
        push_header(&seg, out);
        match seg.mode {
            Mode::Numeric => push_numeric_data(seg.data, out),
            Mode::Alphanumeric => push_alphanumeric_data(seg.data, out),
            Mode::Byte => push_byte_data(seg.data, out),
        }
    }

    fn push_header(seg: &Segment, out: &mut BitStream) {
        out.push_bits(seg.mode as u8, seg.mode_bits);
        let char_cnt = seg.data.len();
        debug_assert!(
            char_cnt < (1 << seg.len_bits),
            "Char count exceeds bit length: Char count {char_cnt}, Char count bits {}",
            seg.len_bits
        );
        out.push_bits(char_cnt as u16, seg.len_bits);
    }

    fn push_numeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(Mode::Numeric.chunk_size()) {
            let len = Mode::Numeric.encoded_len(chunk.len());
            let data = Mode::Numeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_alphanumeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(Mode::Alphanumeric.chunk_size()) {
            let len = Mode::Alphanumeric.encoded_len(chunk.len());
            let data = Mode::Alphanumeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_byte_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(1) {
            let data = Mode::Byte.encode_chunk(chunk);
            out.push_bits(data, 8);
        }
    }

    pub fn push_terminator(out: &mut BitStream) {
        let bit_len = out.len();
        let bit_capacity = out.capacity();
        if bit_len < bit_capacity {
            let term_len = std::cmp::min(4, bit_capacity - bit_len);
            out.push_bits(0, term_len);
        }
    }

    pub fn pad_remaining_capacity(out: &mut BitStream) {
        push_padding_bits(out);
        push_padding_codewords(out);
    }

    fn push_padding_bits(out: &mut BitStream) {
        let offset = out.len() & 7;
        if offset > 0 {
            let padding_bits_len = 8 - offset;
            out.push_bits(0, padding_bits_len);
        }
    }

    fn push_padding_codewords(out: &mut BitStream) {
        let offset = out.len() & 7;
        debug_assert!(
            offset == 0,
            "Bit offset should be zero before padding codewords: {}",
            offset
        );

        let remain_byte_capacity = (out.capacity() - out.len()) >> 3;
        PADDING_CODEWORDS.iter().copied().cycle().take(remain_byte_capacity).for_each(|pc| {
            out.push_bits(pc, 8);
        });
    }

    #[cfg(test)]
    mod writer_tests {
        use super::{
            pad_remaining_capacity, push_alphanumeric_data, push_byte_data, push_header,
            push_numeric_data, push_padding_bits, push_padding_codewords, push_terminator,
        };
        use super::{Mode, Segment, PADDING_CODEWORDS};
        use crate::common::bit_utils::BitStream;
        use crate::common::metadata::{ECLevel, Version};

        fn v1_l_capacity() -> usize {
            Version::new(1).unwrap().data_bit_capacity(ECLevel::L)
        }

        #[test]
        fn test_push_header_v1() {
            let ver = Version::new(1).unwrap();
            let bit_capacity = ver.data_bit_capacity(ECLevel::L);
            let mode_bits = ver.mode_bits();
            let exp_vecs: Vec<Vec<u8>> = vec![
                vec![0b00011111, 0b11111100],
                vec![0b00101111, 0b11111000],
                vec![0b01001111, 0b11110000],
            ];
            let dummy_vec = vec![0; 1023];
            let dummy_idx = [1023, 511, 255];
            for ((mode, di), exp_vec) in Mode::ALL.iter().zip(dummy_idx.iter()).zip(exp_vecs.iter())
            {
                let mut bs = BitStream::new(bit_capacity);
                let len_bits = ver.char_cnt_bits(*mode);
                let seg = Segment::new(*mode, mode_bits, len_bits, &dummy_vec[..*di]);
                push_header(&seg, &mut bs);
                assert_eq!(bs.data(), exp_vec);
            }
        }

        #[test]
        fn test_push_header_v10() {
            let ver = Version::new(10).unwrap();
            let bit_capacity = ver.data_bit_capacity(ECLevel::L);
            let mode_bits = ver.mode_bits();
            let exp_vecs: Vec<Vec<u8>> = vec![
                vec![0b00011111, 0b11111111],
                vec![0b00101111, 0b11111110],
                vec![0b01001111, 0b11111111, 0b11110000],
            ];
            let dummy_vec = vec![0; 65535];
            let dummy_idx = [4095, 2047, 65535];
            for ((mode, di), exp_vec) in Mode::ALL.iter().zip(dummy_idx.iter()).zip(exp_vecs.iter())
            {
                let mut bs = BitStream::new(bit_capacity);
                let len_bits = ver.char_cnt_bits(*mode);
                let seg = Segment::new(*mode, mode_bits, len_bits, &dummy_vec[..*di]);
                push_header(&seg, &mut bs);
                assert_eq!(bs.data(), exp_vec);
            }
        }

        #[test]
        fn test_push_header_v27() {
            let ver = Version::new(27).unwrap();
            let bit_capacity = ver.data_bit_capacity(ECLevel::L);
            let mode_bits = ver.mode_bits();
            let exp_vecs: Vec<Vec<u8>> = vec![
                vec![0b00011111, 0b11111111, 0b11000000],
                vec![0b00101111, 0b11111111, 0b10000000],
                vec![0b01001111, 0b11111111, 0b11110000],
            ];
            let dummy_vec = vec![0; 65535];
            let dummy_idx = [16383, 8191, 65535];
            for ((mode, di), exp_vec) in Mode::ALL.iter().zip(dummy_idx.iter()).zip(exp_vecs.iter())
            {
                let mut bs = BitStream::new(bit_capacity);
                let len_bits = ver.char_cnt_bits(*mode);
                let seg = Segment::new(*mode, mode_bits, len_bits, &dummy_vec[..*di]);
                push_header(&seg, &mut bs);
                assert_eq!(bs.data(), exp_vec);
            }
        }

        #[test]
        fn test_push_numeric_data() {
            let mut bs = BitStream::new(v1_l_capacity());
            push_numeric_data(b"01234567", &mut bs);
            assert_eq!(bs.data(), vec![0b00000011, 0b00010101, 0b10011000, 0b01100000]);
            let mut bs = BitStream::new(v1_l_capacity());
            push_numeric_data(b"8", &mut bs);
            assert_eq!(bs.data(), vec![0b10000000]);
        }

        #[test]
        fn test_push_alphanumeric_data() {
            let mut bs = BitStream::new(v1_l_capacity());
            push_alphanumeric_data(b"AC-42", &mut bs);
            assert_eq!(bs.data(), vec![0b00111001, 0b11011100, 0b11100100, 0b00100000])
        }

        #[test]
        fn test_push_byte_data() {
            let mut bs = BitStream::new(v1_l_capacity());
            push_byte_data(b"a", &mut bs);
            assert_eq!(bs.data(), vec![0b01100001])
        }

        #[test]
        fn test_push_terminator() {
            let bit_capacity = v1_l_capacity();
            let capacity = (bit_capacity + 7) >> 3;
            let mut bs = BitStream::new(bit_capacity);
            bs.push_bits(0b1, 1);
            push_terminator(&mut bs);
            assert_eq!(bs.data(), vec![0b10000000]);
            assert_eq!(bs.len() & 7, 5);
            for _ in 0..capacity - 1 {
                bs.push_bits(0b11111111, 8);
            }
            push_terminator(&mut bs);
            assert_eq!(bs.len() & 7, 0);
        }

        #[test]
        fn test_push_padding_bits() {
            let mut bs = BitStream::new(v1_l_capacity());
            bs.push_bits(1, 0b1);
            push_padding_bits(&mut bs);
            assert_eq!(bs.data(), vec![0b10000000]);
            assert_eq!(bs.len() & 7, 0);
        }

        #[test]
        fn test_push_padding_codewords() {
            let mut bs = BitStream::new(v1_l_capacity());
            bs.push_bits(1, 0b1);
            push_padding_bits(&mut bs);
            push_padding_codewords(&mut bs);
            let mut output = vec![0b10000000];
            output.extend(PADDING_CODEWORDS.iter().cycle().take(18));
            assert_eq!(bs.data(), output);
        }

        #[test]
        fn test_pad_remaining_capacity() {
            let mut bs = BitStream::new(v1_l_capacity());
            bs.push_bits(0b101u8, 3);
            pad_remaining_capacity(&mut bs);
            assert_eq!(bs.len(), bs.capacity());
            assert_eq!(bs.data()[..3], [0b10100000, 0b11101100, 0b00010001]);
        }
    }
}
