//! Bit-level RBSP writer and Annex-B NAL unit assembly.

use std::io;

use bitstream_io::{BigEndian, BitWrite as _, BitWriter};

use crate::nal::NaluType;

/// Growable MSB-first bit sink for one RBSP. Values wider than the field
/// are masked to the field width.
pub struct RbspWriter {
    inner: BitWriter<Vec<u8>, BigEndian>,
    bits_written: u64,
}

impl Default for RbspWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RbspWriter {
    pub fn new() -> Self {
        Self {
            inner: BitWriter::endian(Vec::new(), BigEndian),
            bits_written: 0,
        }
    }

    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    pub fn put_u(&mut self, value: u32, bits: u32) -> io::Result<()> {
        if bits == 0 {
            return Ok(());
        }
        let masked = if bits >= 32 {
            value
        } else {
            value & ((1u32 << bits) - 1)
        };
        self.inner.write(bits, masked)?;
        self.bits_written += u64::from(bits);
        Ok(())
    }

    pub fn put_flag(&mut self, flag: bool) -> io::Result<()> {
        self.inner.write_bit(flag)?;
        self.bits_written += 1;
        Ok(())
    }

    /// Unsigned 0-th order Exp-Golomb code.
    pub fn put_ue(&mut self, value: u32) -> io::Result<()> {
        let code = u64::from(value) + 1;
        let bits = 64 - code.leading_zeros();
        self.put_u(0, bits - 1)?;
        self.inner.write(bits, code)?;
        self.bits_written += u64::from(bits);
        Ok(())
    }

    /// Signed 0-th order Exp-Golomb code.
    pub fn put_se(&mut self, value: i32) -> io::Result<()> {
        let v = i64::from(value);
        let mapped = if v <= 0 { -2 * v } else { 2 * v - 1 };
        self.put_ue(mapped as u32)
    }

    /// Replicates `fill` across the remaining bits of the current byte.
    pub fn byte_align(&mut self, fill: bool) -> io::Result<()> {
        while self.bits_written % 8 != 0 {
            self.put_flag(fill)?;
        }
        Ok(())
    }

    /// A single 1 bit, then zeros until byte-aligned.
    pub fn rbsp_trailing_bits(&mut self) -> io::Result<()> {
        self.put_flag(true)?;
        self.byte_align(false)
    }

    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        self.byte_align(false)?;
        Ok(self.inner.into_writer())
    }
}

/// `00 00 00 01` for parameter sets and access unit delimiters, `00 00 01`
/// otherwise.
pub fn start_code(nal_unit_type: NaluType) -> &'static [u8] {
    match nal_unit_type {
        NaluType::VPS_NUT | NaluType::SPS_NUT | NaluType::PPS_NUT | NaluType::AUD_NUT => {
            &[0x00, 0x00, 0x00, 0x01]
        }
        _ => &[0x00, 0x00, 0x01],
    }
}

/// Two-byte NAL header: forbidden zero, 6 bits type, layer id 0,
/// temporal id plus1 = 1.
pub fn nal_header(nal_unit_type: NaluType) -> [u8; 2] {
    [(nal_unit_type.0 & 0x3f) << 1, 0x01]
}

/// Escapes the RBSP: a `0x03` is inserted wherever two zero bytes would
/// otherwise be followed by a byte ≤ 0x03.
pub fn rbsp_to_ebsp(rbsp: &[u8]) -> Vec<u8> {
    let mut ebsp = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 4);
    let mut zeros = 0usize;
    for &b in rbsp {
        if zeros >= 2 && b <= 0x03 {
            ebsp.push(0x03);
            zeros = 0;
        }
        ebsp.push(b);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    ebsp
}

/// Assembles start code, NAL header, and escaped payload.
pub fn build_nal(nal_unit_type: NaluType, rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + 8);
    out.extend_from_slice(start_code(nal_unit_type));
    out.extend_from_slice(&nal_header(nal_unit_type));
    out.extend_from_slice(&rbsp_to_ebsp(rbsp));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitReader;

    #[test]
    fn exp_golomb_codes() {
        let cases: [(u32, u64, u32); 6] = [
            (0, 0b1, 1),
            (1, 0b010, 3),
            (2, 0b011, 3),
            (3, 0b00100, 5),
            (67, 0b0000001000100, 13),
            (106, 0b0000001101011, 13),
        ];
        for (value, code, bits) in cases {
            let mut w = RbspWriter::new();
            w.put_ue(value).unwrap();
            assert_eq!(w.bits_written(), u64::from(bits));
            let bytes = w.into_bytes().unwrap();
            let shift = bytes.len() as u64 * 8 - u64::from(bits);
            let got = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            assert_eq!(got >> shift, code, "value {}", value);
        }
    }

    #[test]
    fn signed_exp_golomb_round_trip() {
        for v in [-6, -3, -1, 0, 1, 2, 5, 1000, -1000] {
            let mut w = RbspWriter::new();
            w.put_se(v).unwrap();
            w.rbsp_trailing_bits().unwrap();
            let bytes = w.into_bytes().unwrap();
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.read_se().unwrap(), v);
        }
    }

    #[test]
    fn put_u_masks_to_field_width() {
        let mut w = RbspWriter::new();
        w.put_u(0x1ff, 4).unwrap();
        w.put_u(0, 4).unwrap();
        assert_eq!(w.into_bytes().unwrap(), vec![0xf0]);
    }

    #[test]
    fn byte_align_fill_bit() {
        let mut w = RbspWriter::new();
        w.put_u(0, 3).unwrap();
        w.byte_align(true).unwrap();
        assert_eq!(w.into_bytes().unwrap(), vec![0x1f]);
    }

    #[test]
    fn rbsp_trailing() {
        let mut w = RbspWriter::new();
        w.put_u(0b101, 3).unwrap();
        w.rbsp_trailing_bits().unwrap();
        assert_eq!(w.into_bytes().unwrap(), vec![0b1011_0000]);
    }

    #[test]
    fn emulation_prevention_insertion() {
        assert_eq!(rbsp_to_ebsp(&[0, 0, 0]), vec![0, 0, 3, 0]);
        assert_eq!(rbsp_to_ebsp(&[0, 0, 1]), vec![0, 0, 3, 1]);
        assert_eq!(rbsp_to_ebsp(&[0, 0, 2]), vec![0, 0, 3, 2]);
        assert_eq!(rbsp_to_ebsp(&[0, 0, 3]), vec![0, 0, 3, 3]);
        assert_eq!(rbsp_to_ebsp(&[0, 0, 4]), vec![0, 0, 4]);
        assert_eq!(rbsp_to_ebsp(&[1, 0, 0]), vec![1, 0, 0]);
        // Escaping resets the zero run.
        assert_eq!(rbsp_to_ebsp(&[0, 0, 0, 0, 1]), vec![0, 0, 3, 0, 0, 3, 1]);
    }

    #[test]
    fn start_codes_by_type() {
        assert_eq!(start_code(NaluType::VPS_NUT).len(), 4);
        assert_eq!(start_code(NaluType::SPS_NUT).len(), 4);
        assert_eq!(start_code(NaluType::AUD_NUT).len(), 4);
        assert_eq!(start_code(NaluType::TRAIL_R).len(), 3);
        assert_eq!(start_code(NaluType::IDR_W_RADL).len(), 3);
    }

    #[test]
    fn nal_header_bytes() {
        assert_eq!(nal_header(NaluType::VPS_NUT), [0x40, 0x01]);
        assert_eq!(nal_header(NaluType::SPS_NUT), [0x42, 0x01]);
        assert_eq!(nal_header(NaluType::PPS_NUT), [0x44, 0x01]);
        assert_eq!(nal_header(NaluType::IDR_W_RADL), [0x26, 0x01]);
    }
}
