//! Scaling list data, per _7.3.4_ / _7.4.5_ in the spec.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::{in_range, Result};

pub const SCALING_LIST_SIZE_ID_0_COUNT: usize = 16;
pub const SCALING_LIST_SIZE_ID_1_TO_3_COUNT: usize = 64;
const DEFAULT_SCALING_LIST_SIZE_0_VALUE: u8 = 16;

// From Table 7-6.
const DEFAULT_SCALING_LIST_SIZE_1_TO_3_MATRIX_0_TO_2: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 16, 17, 16, 17, 18, //
    17, 18, 18, 17, 18, 21, 19, 20, 21, 20, 19, 21, 24, 22, 22, 24, //
    24, 22, 22, 24, 25, 25, 27, 30, 27, 25, 25, 29, 31, 35, 35, 31, //
    29, 36, 41, 44, 41, 36, 47, 54, 54, 47, 65, 70, 65, 88, 88, 115,
];

const DEFAULT_SCALING_LIST_SIZE_1_TO_3_MATRIX_3_TO_5: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 17, 18, //
    18, 18, 18, 18, 18, 20, 20, 20, 20, 20, 20, 20, 24, 24, 24, 24, //
    24, 24, 24, 24, 25, 25, 25, 25, 25, 25, 25, 28, 28, 28, 28, 28, //
    28, 33, 33, 33, 33, 33, 41, 41, 41, 41, 54, 54, 54, 71, 71, 91,
];

/// Per-coefficient quantization scaling factors for the four transform
/// sizes. At size 32×32 only matrix ids 0 and 3 are coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingListData {
    pub scaling_list_4x4: [[u8; 16]; 6],
    pub scaling_list_8x8: [[u8; 64]; 6],
    pub scaling_list_16x16: [[u8; 64]; 6],
    pub scaling_list_32x32: [[u8; 64]; 6],
    pub scaling_list_dc_coef_16x16: [u8; 6],
    pub scaling_list_dc_coef_32x32: [u8; 6],
}

impl Default for ScalingListData {
    fn default() -> Self {
        let mut data = Self {
            scaling_list_4x4: [[0; 16]; 6],
            scaling_list_8x8: [[0; 64]; 6],
            scaling_list_16x16: [[0; 64]; 6],
            scaling_list_32x32: [[0; 64]; 6],
            scaling_list_dc_coef_16x16: [0; 6],
            scaling_list_dc_coef_32x32: [0; 6],
        };
        for size_id in 0..4 {
            let mut matrix_id = 0;
            while matrix_id < 6 {
                data.fill_default(size_id, matrix_id);
                matrix_id += if size_id == 3 { 3 } else { 1 };
            }
        }
        data
    }
}

impl ScalingListData {
    pub fn fill_default(&mut self, size_id: usize, matrix_id: usize) {
        if size_id == 0 {
            self.scaling_list_4x4[matrix_id] = [DEFAULT_SCALING_LIST_SIZE_0_VALUE; 16];
            return;
        }
        let src = if matrix_id < 3 {
            &DEFAULT_SCALING_LIST_SIZE_1_TO_3_MATRIX_0_TO_2
        } else {
            &DEFAULT_SCALING_LIST_SIZE_1_TO_3_MATRIX_3_TO_5
        };
        match size_id {
            1 => self.scaling_list_8x8[matrix_id] = *src,
            2 => self.scaling_list_16x16[matrix_id] = *src,
            _ => self.scaling_list_32x32[matrix_id] = *src,
        }
        // Sixteen because the default for the minus8 values is 8.
        if size_id == 2 {
            self.scaling_list_dc_coef_16x16[matrix_id] = 16;
        } else if size_id == 3 {
            self.scaling_list_dc_coef_32x32[matrix_id] = 16;
        }
    }

    pub fn parse(r: &mut BitReader) -> Result<ScalingListData> {
        let mut data = ScalingListData::default();
        for size_id in 0..4usize {
            let mut matrix_id = 0usize;
            while matrix_id < 6 {
                let scaling_list_pred_mode_flag = r.read_bool()?;
                if !scaling_list_pred_mode_flag {
                    let scaling_list_pred_matrix_id_delta = r.read_ue()?;
                    if size_id <= 2 {
                        in_range(
                            "scaling_list_pred_matrix_id_delta",
                            scaling_list_pred_matrix_id_delta,
                            0,
                            matrix_id as u32,
                        )?;
                    } else {
                        in_range(
                            "scaling_list_pred_matrix_id_delta",
                            scaling_list_pred_matrix_id_delta,
                            0,
                            matrix_id as u32 / 3,
                        )?;
                    }
                    if scaling_list_pred_matrix_id_delta == 0 {
                        data.fill_default(size_id, matrix_id);
                    } else {
                        let step = if size_id == 3 { 3 } else { 1 };
                        let ref_matrix_id =
                            matrix_id - scaling_list_pred_matrix_id_delta as usize * step;
                        match size_id {
                            0 => {
                                data.scaling_list_4x4[matrix_id] =
                                    data.scaling_list_4x4[ref_matrix_id]
                            }
                            1 => {
                                data.scaling_list_8x8[matrix_id] =
                                    data.scaling_list_8x8[ref_matrix_id]
                            }
                            2 => {
                                data.scaling_list_16x16[matrix_id] =
                                    data.scaling_list_16x16[ref_matrix_id];
                                data.scaling_list_dc_coef_16x16[matrix_id] =
                                    data.scaling_list_dc_coef_16x16[ref_matrix_id];
                            }
                            _ => {
                                data.scaling_list_32x32[matrix_id] =
                                    data.scaling_list_32x32[ref_matrix_id];
                                data.scaling_list_dc_coef_32x32[matrix_id] =
                                    data.scaling_list_dc_coef_32x32[ref_matrix_id];
                            }
                        }
                    }
                } else {
                    let mut next_coef = 8i32;
                    let coef_num = 64.min(1usize << (4 + (size_id << 1)));
                    if size_id == 2 {
                        let scaling_list_dc_coef_minus8 = r.read_se()?;
                        in_range(
                            "scaling_list_dc_coef_16x16_minus8",
                            scaling_list_dc_coef_minus8,
                            -7,
                            247,
                        )?;
                        data.scaling_list_dc_coef_16x16[matrix_id] =
                            (scaling_list_dc_coef_minus8 + 8) as u8;
                        next_coef = scaling_list_dc_coef_minus8 + 8;
                    } else if size_id == 3 {
                        let scaling_list_dc_coef_minus8 = r.read_se()?;
                        in_range(
                            "scaling_list_dc_coef_32x32_minus8",
                            scaling_list_dc_coef_minus8,
                            -7,
                            247,
                        )?;
                        data.scaling_list_dc_coef_32x32[matrix_id] =
                            (scaling_list_dc_coef_minus8 + 8) as u8;
                        next_coef = scaling_list_dc_coef_minus8 + 8;
                    }
                    for i in 0..coef_num {
                        let scaling_list_delta_coef = r.read_se()?;
                        in_range("scaling_list_delta_coef", scaling_list_delta_coef, -128, 127)?;
                        next_coef = (next_coef + scaling_list_delta_coef + 256) % 256;
                        match size_id {
                            0 => data.scaling_list_4x4[matrix_id][i] = next_coef as u8,
                            1 => data.scaling_list_8x8[matrix_id][i] = next_coef as u8,
                            2 => data.scaling_list_16x16[matrix_id][i] = next_coef as u8,
                            _ => data.scaling_list_32x32[matrix_id][i] = next_coef as u8,
                        }
                    }
                }
                matrix_id += if size_id == 3 { 3 } else { 1 };
            }
        }
        Ok(data)
    }

    /// Emits every list as explicitly-coded coefficients.
    pub fn write(&self, w: &mut RbspWriter) -> io::Result<()> {
        for size_id in 0..4usize {
            let mut matrix_id = 0usize;
            while matrix_id < 6 {
                w.put_flag(true)?; // scaling_list_pred_mode_flag
                let coef_num = 64.min(1usize << (4 + (size_id << 1)));
                let mut next_coef = 8i32;
                if size_id == 2 {
                    let dc = i32::from(self.scaling_list_dc_coef_16x16[matrix_id]);
                    w.put_se(dc - 8)?;
                    next_coef = dc;
                } else if size_id == 3 {
                    let dc = i32::from(self.scaling_list_dc_coef_32x32[matrix_id]);
                    w.put_se(dc - 8)?;
                    next_coef = dc;
                }
                for i in 0..coef_num {
                    let coef = i32::from(match size_id {
                        0 => self.scaling_list_4x4[matrix_id][i],
                        1 => self.scaling_list_8x8[matrix_id][i],
                        2 => self.scaling_list_16x16[matrix_id][i],
                        _ => self.scaling_list_32x32[matrix_id][i],
                    });
                    let mut delta = coef - next_coef;
                    if delta > 127 {
                        delta -= 256;
                    } else if delta < -128 {
                        delta += 256;
                    }
                    w.put_se(delta)?;
                    next_coef = coef;
                }
                matrix_id += if size_id == 3 { 3 } else { 1 };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables() {
        let data = ScalingListData::default();
        assert!(data.scaling_list_4x4.iter().all(|m| m == &[16u8; 16]));
        assert_eq!(data.scaling_list_8x8[0][0], 16);
        assert_eq!(data.scaling_list_8x8[0][63], 115);
        assert_eq!(data.scaling_list_8x8[3][63], 91);
        assert_eq!(data.scaling_list_16x16[2][21], 21);
        assert_eq!(data.scaling_list_32x32[0][28], 24);
        assert_eq!(data.scaling_list_32x32[3][21], 20);
        assert_eq!(data.scaling_list_dc_coef_16x16, [16; 6]);
        // Only matrix ids 0 and 3 exist at size 3.
        assert_eq!(data.scaling_list_dc_coef_32x32[0], 16);
        assert_eq!(data.scaling_list_dc_coef_32x32[3], 16);
        assert_eq!(data.scaling_list_dc_coef_32x32[1], 0);
    }

    #[test]
    fn explicit_round_trip() {
        let mut data = ScalingListData::default();
        data.scaling_list_4x4[1][3] = 40;
        data.scaling_list_8x8[4][10] = 7;
        data.scaling_list_16x16[5][63] = 250;
        data.scaling_list_32x32[3][1] = 99;
        data.scaling_list_dc_coef_16x16[2] = 100;
        data.scaling_list_dc_coef_32x32[0] = 9;
        let mut w = RbspWriter::new();
        data.write(&mut w).unwrap();
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let parsed = ScalingListData::parse(&mut r).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn predicted_default_fill() {
        // Every list predicted with delta 0: identical to the defaults.
        let mut w = RbspWriter::new();
        for size_id in 0..4 {
            let mut matrix_id = 0;
            while matrix_id < 6 {
                w.put_flag(false).unwrap(); // scaling_list_pred_mode_flag
                w.put_ue(0).unwrap(); // scaling_list_pred_matrix_id_delta
                matrix_id += if size_id == 3 { 3 } else { 1 };
            }
        }
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let parsed = ScalingListData::parse(&mut r).unwrap();
        assert_eq!(parsed, ScalingListData::default());
    }

    #[test]
    fn predicted_from_reference_matrix() {
        // 4x4: matrix 0 coded explicitly as all-23, matrix 1 predicted
        // from it with delta 1, the rest defaulted.
        let mut w = RbspWriter::new();
        w.put_flag(true).unwrap();
        let mut next = 8i32;
        for _ in 0..16 {
            w.put_se(23 - next).unwrap();
            next = 23;
        }
        w.put_flag(false).unwrap();
        w.put_ue(1).unwrap();
        for _ in 2..6 {
            w.put_flag(false).unwrap();
            w.put_ue(0).unwrap();
        }
        for size_id in 1..4 {
            let mut matrix_id = 0;
            while matrix_id < 6 {
                w.put_flag(false).unwrap();
                w.put_ue(0).unwrap();
                matrix_id += if size_id == 3 { 3 } else { 1 };
            }
        }
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let parsed = ScalingListData::parse(&mut r).unwrap();
        assert_eq!(parsed.scaling_list_4x4[0], [23; 16]);
        assert_eq!(parsed.scaling_list_4x4[1], [23; 16]);
        assert_eq!(parsed.scaling_list_4x4[2], [16; 16]);
    }
}
