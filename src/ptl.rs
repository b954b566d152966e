//! Profile, tier and level, per _7.3.3_ in the spec.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::{in_range, require, Error, Result};

pub const PROFILE_IDC_MAIN: u8 = 1;
pub const PROFILE_IDC_MAIN10: u8 = 2;
pub const PROFILE_IDC_MAIN_STILL_PICTURE: u8 = 3;
pub const PROFILE_IDC_RANGE_EXTENSIONS: u8 = 4;
pub const PROFILE_IDC_HIGH_THROUGHPUT: u8 = 5;
pub const PROFILE_IDC_SCREEN_CONTENT: u8 = 9;

/// The general tier of `profile_tier_level()`. Sub-layer records are
/// skipped bit-accurately during parse and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileTierLevel {
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flags: u32,
    pub general_progressive_source_flag: bool,
    pub general_interlaced_source_flag: bool,
    pub general_non_packed_constraint_flag: bool,
    pub general_frame_only_constraint_flag: bool,
    pub general_one_picture_only_constraint_flag: bool,
    /// 30x the actual level number.
    pub general_level_idc: u8,
}

impl ProfileTierLevel {
    pub fn parse(
        r: &mut BitReader,
        profile_present: bool,
        max_num_sub_layers_minus1: u8,
    ) -> Result<Self> {
        let mut ptl = ProfileTierLevel::default();
        if profile_present {
            let general_profile_space = r.read_bits(2)?;
            require("general_profile_space", general_profile_space == 0)?;
            ptl.general_tier_flag = r.read_bool()?;
            ptl.general_profile_idc = r.read_bits(5)? as u8;
            in_range("general_profile_idc", ptl.general_profile_idc, 0, 11)?;
            ptl.general_profile_compatibility_flags = r.read_bits(32)?;
            ptl.general_progressive_source_flag = r.read_bool()?;
            ptl.general_interlaced_source_flag = r.read_bool()?;
            if !ptl.general_progressive_source_flag && ptl.general_interlaced_source_flag {
                tracing::debug!("interlaced streams not supported");
                return Err(Error::UnsupportedStream("general_interlaced_source_flag"));
            }
            ptl.general_non_packed_constraint_flag = r.read_bool()?;
            ptl.general_frame_only_constraint_flag = r.read_bool()?;
            r.skip_bits(7)?; // general_reserved_zero_7bits
            ptl.general_one_picture_only_constraint_flag = r.read_bool()?;
            r.skip_bits(35)?; // general_reserved_zero_35bits
            r.skip_bits(1)?; // general_inbld_flag
        }
        ptl.general_level_idc = r.read_bits(8)? as u8;

        let mut sub_layer_profile_present_flag = [false; 8];
        let mut sub_layer_level_present_flag = [false; 8];
        for i in 0..max_num_sub_layers_minus1 as usize {
            sub_layer_profile_present_flag[i] = r.read_bool()?;
            sub_layer_level_present_flag[i] = r.read_bool()?;
        }
        if max_num_sub_layers_minus1 > 0 {
            for _ in max_num_sub_layers_minus1..8 {
                r.skip_bits(2)?; // reserved_zero_2bits
            }
        }
        for i in 0..max_num_sub_layers_minus1 as usize {
            if sub_layer_profile_present_flag[i] {
                r.skip_bits(2)?; // sub_layer_profile_space
                r.skip_bits(1)?; // sub_layer_tier_flag
                r.skip_bits(5)?; // sub_layer_profile_idc
                r.skip_bits(32)?; // sub_layer_profile_compatibility_flag
                r.skip_bits(2)?; // sub_layer_{progressive,interlaced}_source_flag
                r.skip_bits(2)?; // non_packed + frame_only constraint flags
                r.skip_bits(43)?; // constraint flags, always 43 bits
                r.skip_bits(1)?; // sub_layer_inbld_flag
            }
            if sub_layer_level_present_flag[i] {
                r.skip_bits(8)?; // sub_layer_level_idc
            }
        }
        Ok(ptl)
    }

    /// Mirrors the parse order. Sub-layer profile/level records are
    /// emitted as absent.
    pub fn write(&self, w: &mut RbspWriter, max_num_sub_layers_minus1: u8) -> io::Result<()> {
        w.put_u(0, 2)?; // general_profile_space
        w.put_flag(self.general_tier_flag)?;
        w.put_u(u32::from(self.general_profile_idc), 5)?;
        w.put_u(self.general_profile_compatibility_flags, 32)?;
        w.put_flag(self.general_progressive_source_flag)?;
        w.put_flag(self.general_interlaced_source_flag)?;
        w.put_flag(self.general_non_packed_constraint_flag)?;
        w.put_flag(self.general_frame_only_constraint_flag)?;
        w.put_u(0, 7)?;
        w.put_flag(self.general_one_picture_only_constraint_flag)?;
        w.put_u(0, 32)?;
        w.put_u(0, 3)?;
        w.put_u(0, 1)?;
        w.put_u(u32::from(self.general_level_idc), 8)?;
        for _ in 0..max_num_sub_layers_minus1 {
            w.put_flag(false)?; // sub_layer_profile_present_flag
            w.put_flag(false)?; // sub_layer_level_present_flag
        }
        if max_num_sub_layers_minus1 > 0 {
            for _ in max_num_sub_layers_minus1..8 {
                w.put_u(0, 2)?;
            }
        }
        Ok(())
    }

    /// `MaxLumaPs` per _Table A.8_.
    pub fn max_luma_ps(&self) -> u32 {
        if self.general_level_idc <= 30 {
            36_864
        } else if self.general_level_idc <= 60 {
            122_880
        } else if self.general_level_idc <= 63 {
            245_760
        } else if self.general_level_idc <= 90 {
            552_960
        } else if self.general_level_idc <= 93 {
            983_040
        } else if self.general_level_idc <= 123 {
            2_228_224
        } else if self.general_level_idc <= 156 {
            8_912_896
        } else {
            35_651_584
        }
    }

    /// `MaxDpbPicBuf` per _A.4.2_: 6 for the profiles that require
    /// `sps_curr_pic_ref_enabled_flag` to be zero, 7 otherwise.
    pub fn dpb_max_pic_buf(&self) -> u32 {
        if (PROFILE_IDC_MAIN..=PROFILE_IDC_HIGH_THROUGHPUT).contains(&self.general_profile_idc) {
            6
        } else {
            7
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_then_parse(ptl: &ProfileTierLevel, max_sub_layers_minus1: u8) -> ProfileTierLevel {
        let mut w = RbspWriter::new();
        ptl.write(&mut w, max_sub_layers_minus1).unwrap();
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        ProfileTierLevel::parse(&mut r, true, max_sub_layers_minus1).unwrap()
    }

    #[test]
    fn round_trip() {
        let ptl = ProfileTierLevel {
            general_tier_flag: false,
            general_profile_idc: PROFILE_IDC_MAIN,
            general_profile_compatibility_flags: 1 << PROFILE_IDC_MAIN,
            general_progressive_source_flag: true,
            general_interlaced_source_flag: false,
            general_non_packed_constraint_flag: true,
            general_frame_only_constraint_flag: true,
            general_one_picture_only_constraint_flag: false,
            general_level_idc: 120,
        };
        assert_eq!(write_then_parse(&ptl, 0), ptl);
        assert_eq!(write_then_parse(&ptl, 2), ptl);
    }

    #[test]
    fn interlaced_source_rejected() {
        let ptl = ProfileTierLevel {
            general_profile_idc: PROFILE_IDC_MAIN,
            general_progressive_source_flag: false,
            general_interlaced_source_flag: true,
            general_level_idc: 93,
            ..Default::default()
        };
        let mut w = RbspWriter::new();
        ptl.write(&mut w, 0).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(
            ProfileTierLevel::parse(&mut r, true, 0),
            Err(Error::UnsupportedStream("general_interlaced_source_flag"))
        );
    }

    #[test]
    fn max_luma_ps_levels() {
        let mut ptl = ProfileTierLevel::default();
        ptl.general_level_idc = 30;
        assert_eq!(ptl.max_luma_ps(), 36_864);
        ptl.general_level_idc = 63;
        assert_eq!(ptl.max_luma_ps(), 245_760);
        ptl.general_level_idc = 123;
        assert_eq!(ptl.max_luma_ps(), 2_228_224);
        ptl.general_level_idc = 156;
        assert_eq!(ptl.max_luma_ps(), 8_912_896);
        ptl.general_level_idc = 180;
        assert_eq!(ptl.max_luma_ps(), 35_651_584);
    }

    #[test]
    fn dpb_pic_buf_by_profile() {
        let mut ptl = ProfileTierLevel::default();
        for idc in PROFILE_IDC_MAIN..=PROFILE_IDC_HIGH_THROUGHPUT {
            ptl.general_profile_idc = idc;
            assert_eq!(ptl.dpb_max_pic_buf(), 6);
        }
        ptl.general_profile_idc = 0;
        assert_eq!(ptl.dpb_max_pic_buf(), 7);
        ptl.general_profile_idc = PROFILE_IDC_SCREEN_CONTENT;
        assert_eq!(ptl.dpb_max_pic_buf(), 7);
    }
}
