//! Annex-B NAL unit framing and header decode.

use crate::bitreader::BitReader;
use crate::{in_range, require, Result};

/// `nal_unit_type` as specified in _Table 7-1_ in the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NaluType(pub u8);

impl NaluType {
    pub const TRAIL_N: Self = Self(0);
    pub const TRAIL_R: Self = Self(1);
    pub const TSA_N: Self = Self(2);
    pub const TSA_R: Self = Self(3);
    pub const STSA_N: Self = Self(4);
    pub const STSA_R: Self = Self(5);
    pub const RADL_N: Self = Self(6);
    pub const RADL_R: Self = Self(7);
    pub const RASL_N: Self = Self(8);
    pub const RASL_R: Self = Self(9);
    pub const BLA_W_LP: Self = Self(16);
    pub const BLA_W_RADL: Self = Self(17);
    pub const BLA_N_LP: Self = Self(18);
    pub const IDR_W_RADL: Self = Self(19);
    pub const IDR_N_LP: Self = Self(20);
    pub const CRA_NUT: Self = Self(21);
    pub const RSV_IRAP_VCL22: Self = Self(22);
    pub const RSV_IRAP_VCL23: Self = Self(23);
    pub const VPS_NUT: Self = Self(32);
    pub const SPS_NUT: Self = Self(33);
    pub const PPS_NUT: Self = Self(34);
    pub const AUD_NUT: Self = Self(35);
    pub const EOS_NUT: Self = Self(36);
    pub const EOB_NUT: Self = Self(37);
    pub const FD_NUT: Self = Self(38);
    pub const PREFIX_SEI_NUT: Self = Self(39);
    pub const SUFFIX_SEI_NUT: Self = Self(40);

    /// IRAP (Intra Random Access Point) picture type?
    pub fn is_irap(self) -> bool {
        (16..=23).contains(&self.0)
    }

    /// IDR (Instantaneous Decoding Refresh) picture type?
    pub fn is_idr(self) -> bool {
        matches!(self, Self::IDR_W_RADL | Self::IDR_N_LP)
    }

    /// BLA (Broken Link Access) picture type?
    pub fn is_bla(self) -> bool {
        matches!(self, Self::BLA_W_LP | Self::BLA_W_RADL | Self::BLA_N_LP)
    }

    /// RADL (Random Access Decodable Leading) picture type?
    pub fn is_radl(self) -> bool {
        matches!(self, Self::RADL_N | Self::RADL_R)
    }

    /// RASL (Random Access Skipped Leading) picture type?
    pub fn is_rasl(self) -> bool {
        matches!(self, Self::RASL_N | Self::RASL_R)
    }

    pub fn is_coded_slice_segment(self) -> bool {
        self.0 <= 9 || self.is_irap()
    }
}

/// Two-byte NAL unit header, per _7.4.2.2_ in the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NaluHeader {
    pub nal_unit_type: NaluType,
    pub nuh_layer_id: u8,
    pub nuh_temporal_id_plus1: u8,
}

impl NaluHeader {
    /// Reads exactly 2 bytes.
    pub fn parse(r: &mut BitReader) -> Result<Self> {
        let forbidden_zero_bit = r.read_bool()?;
        require("forbidden_zero_bit", !forbidden_zero_bit)?;
        let nal_unit_type = NaluType(r.read_bits(6)? as u8);
        let nuh_layer_id = r.read_bits(6)? as u8;
        in_range("nuh_layer_id", nuh_layer_id, 0, 62)?;
        let nuh_temporal_id_plus1 = r.read_bits(3)? as u8;
        require("nuh_temporal_id_plus1", nuh_temporal_id_plus1 != 0)?;
        Ok(Self {
            nal_unit_type,
            nuh_layer_id,
            nuh_temporal_id_plus1,
        })
    }

    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1 - 1
    }
}

/// One NAL unit located in an Annex-B chunk. `data` spans the two header
/// bytes and the EBSP payload; the start code is not included.
#[derive(Debug, Clone, Copy)]
pub struct NaluSpan<'a> {
    pub start_code_len: usize,
    pub data: &'a [u8],
}

/// Splits an Annex-B chunk into NAL units. A NAL starts after
/// `00 00 01` or `00 00 00 01` and ends at the next start code, or at
/// buffer end so the final unit is flushed. The scan carries no state
/// across chunks.
pub fn split_nal_units(bytes: &[u8]) -> NaluIter<'_> {
    NaluIter { bytes, pos: 0 }
}

pub struct NaluIter<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for NaluIter<'a> {
    type Item = NaluSpan<'a>;

    fn next(&mut self) -> Option<NaluSpan<'a>> {
        loop {
            let (_, start_code_len, payload_start) = find_start_code(self.bytes, self.pos)?;
            let end = match find_start_code(self.bytes, payload_start) {
                Some((sc_pos, _, _)) => sc_pos,
                None => self.bytes.len(),
            };
            self.pos = end;
            let data = &self.bytes[payload_start..end];
            if data.len() >= 2 {
                return Some(NaluSpan {
                    start_code_len,
                    data,
                });
            }
            // Too short to hold a NAL header; keep scanning.
        }
    }
}

/// Returns `(start_code_first_byte, start_code_len, payload_start)` for
/// the next start code at or after `from`.
fn find_start_code(bytes: &[u8], from: usize) -> Option<(usize, usize, usize)> {
    let mut i = from;
    while i + 2 < bytes.len() {
        if bytes[i] == 0 && bytes[i + 1] == 0 && bytes[i + 2] == 1 {
            if i > from && bytes[i - 1] == 0 {
                return Some((i - 1, 4, i + 3));
            }
            return Some((i, 3, i + 3));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_three_and_four_byte_start_codes() {
        let bytes = [
            0x00, 0x00, 0x01, 0x40, 0x01, 0xaa, //
            0x00, 0x00, 0x00, 0x01, 0x42, 0x01, 0xbb, 0xcc,
        ];
        let nalus: Vec<_> = split_nal_units(&bytes).collect();
        assert_eq!(nalus.len(), 2);
        assert_eq!(nalus[0].start_code_len, 3);
        assert_eq!(nalus[0].data, &[0x40, 0x01, 0xaa]);
        assert_eq!(nalus[1].start_code_len, 4);
        assert_eq!(nalus[1].data, &[0x42, 0x01, 0xbb, 0xcc]);
    }

    #[test]
    fn last_nalu_is_flushed_at_buffer_end() {
        let bytes = [0x00, 0x00, 0x00, 0x01, 0x40, 0x01, 0x0c, 0x01];
        let nalus: Vec<_> = split_nal_units(&bytes).collect();
        assert_eq!(nalus.len(), 1);
        assert_eq!(nalus[0].data, &[0x40, 0x01, 0x0c, 0x01]);

        let mut r = BitReader::new(nalus[0].data);
        let header = NaluHeader::parse(&mut r).unwrap();
        assert_eq!(header.nal_unit_type, NaluType::VPS_NUT);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.nuh_temporal_id_plus1, 1);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let bytes = [0x17, 0x2a, 0x00, 0x00, 0x01, 0x40, 0x01, 0x0c];
        let nalus: Vec<_> = split_nal_units(&bytes).collect();
        assert_eq!(nalus.len(), 1);
        assert_eq!(nalus[0].data, &[0x40, 0x01, 0x0c]);
    }

    #[test]
    fn forbidden_zero_bit_rejected() {
        let mut r = BitReader::new(&[0x80, 0x01]);
        assert_eq!(
            NaluHeader::parse(&mut r),
            Err(crate::Error::InvalidStream("forbidden_zero_bit"))
        );
    }

    #[test]
    fn zero_temporal_id_plus1_rejected() {
        // type 32, layer 0, temporal_id_plus1 == 0.
        let mut r = BitReader::new(&[0x40, 0x00]);
        assert_eq!(
            NaluHeader::parse(&mut r),
            Err(crate::Error::InvalidStream("nuh_temporal_id_plus1"))
        );
    }

    #[test]
    fn nalu_type_predicates() {
        assert!(NaluType::IDR_W_RADL.is_irap());
        assert!(NaluType::IDR_N_LP.is_idr());
        assert!(NaluType::BLA_W_RADL.is_bla());
        assert!(NaluType::CRA_NUT.is_irap());
        assert!(!NaluType::TRAIL_R.is_irap());
        assert!(NaluType::TRAIL_N.is_coded_slice_segment());
        assert!(NaluType::RASL_R.is_rasl());
        assert!(NaluType::RADL_N.is_radl());
        assert!(!NaluType::VPS_NUT.is_coded_slice_segment());
    }
}
