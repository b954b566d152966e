//! VPS (Video Parameter Set), per _7.3.2.1_ in the spec.
//!
//! Parsing stops after `vps_num_layer_sets_minus1`; the layer-set,
//! timing, and extension payload that follows carries nothing this
//! decoder consumes.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::ptl::ProfileTierLevel;
use crate::{in_range, require, Result};

pub const MAX_SUB_LAYERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vps {
    pub vps_video_parameter_set_id: u8,
    pub vps_base_layer_internal_flag: bool,
    pub vps_base_layer_available_flag: bool,
    pub vps_max_layers_minus1: u8,
    pub vps_max_sub_layers_minus1: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub vps_sub_layer_ordering_info_present_flag: bool,
    pub vps_max_dec_pic_buffering_minus1: [u32; MAX_SUB_LAYERS],
    pub vps_max_num_reorder_pics: [u32; MAX_SUB_LAYERS],
    pub vps_max_latency_increase_plus1: [u32; MAX_SUB_LAYERS],
    pub vps_max_layer_id: u8,
    pub vps_num_layer_sets_minus1: u32,
}

impl Vps {
    pub fn parse(r: &mut BitReader) -> Result<Vps> {
        let mut vps = Vps::default();

        vps.vps_video_parameter_set_id = r.read_bits(4)? as u8;
        in_range("vps_video_parameter_set_id", vps.vps_video_parameter_set_id, 0, 15)?;
        vps.vps_base_layer_internal_flag = r.read_bool()?;
        vps.vps_base_layer_available_flag = r.read_bool()?;
        vps.vps_max_layers_minus1 = r.read_bits(6)? as u8;
        in_range("vps_max_layers_minus1", vps.vps_max_layers_minus1, 0, 62)?;
        vps.vps_max_sub_layers_minus1 = r.read_bits(3)? as u8;
        in_range("vps_max_sub_layers_minus1", vps.vps_max_sub_layers_minus1, 0, 7)?;
        vps.vps_temporal_id_nesting_flag = r.read_bool()?;
        r.skip_bits(16)?; // vps_reserved_0xffff_16bits

        vps.profile_tier_level =
            ProfileTierLevel::parse(r, true, vps.vps_max_sub_layers_minus1)?;

        vps.vps_sub_layer_ordering_info_present_flag = r.read_bool()?;
        let top = vps.vps_max_sub_layers_minus1 as usize;
        let lowest = if vps.vps_sub_layer_ordering_info_present_flag {
            0
        } else {
            top
        };
        for i in lowest..=top {
            vps.vps_max_dec_pic_buffering_minus1[i] = r.read_ue()?;
            in_range(
                "vps_max_dec_pic_buffering_minus1",
                vps.vps_max_dec_pic_buffering_minus1[i],
                0,
                15,
            )?;
            vps.vps_max_num_reorder_pics[i] = r.read_ue()?;
            in_range(
                "vps_max_num_reorder_pics",
                vps.vps_max_num_reorder_pics[i],
                0,
                vps.vps_max_dec_pic_buffering_minus1[i],
            )?;
            if i > 0 {
                require(
                    "vps_max_dec_pic_buffering_minus1",
                    vps.vps_max_dec_pic_buffering_minus1[i]
                        >= vps.vps_max_dec_pic_buffering_minus1[i - 1],
                )?;
                require(
                    "vps_max_num_reorder_pics",
                    vps.vps_max_num_reorder_pics[i] >= vps.vps_max_num_reorder_pics[i - 1],
                )?;
            }
            vps.vps_max_latency_increase_plus1[i] = r.read_ue()?;
        }
        if !vps.vps_sub_layer_ordering_info_present_flag {
            for i in 0..top {
                vps.vps_max_dec_pic_buffering_minus1[i] =
                    vps.vps_max_dec_pic_buffering_minus1[top];
                vps.vps_max_num_reorder_pics[i] = vps.vps_max_num_reorder_pics[top];
                vps.vps_max_latency_increase_plus1[i] = vps.vps_max_latency_increase_plus1[top];
            }
        }

        vps.vps_max_layer_id = r.read_bits(6)? as u8;
        in_range("vps_max_layer_id", vps.vps_max_layer_id, 0, 62)?;
        vps.vps_num_layer_sets_minus1 = r.read_ue()?;
        in_range("vps_num_layer_sets_minus1", vps.vps_num_layer_sets_minus1, 0, 1023)?;

        Ok(vps)
    }

    pub fn write_rbsp(&self, w: &mut RbspWriter) -> io::Result<()> {
        w.put_u(u32::from(self.vps_video_parameter_set_id), 4)?;
        w.put_flag(self.vps_base_layer_internal_flag)?;
        w.put_flag(self.vps_base_layer_available_flag)?;
        w.put_u(u32::from(self.vps_max_layers_minus1), 6)?;
        w.put_u(u32::from(self.vps_max_sub_layers_minus1), 3)?;
        w.put_flag(self.vps_temporal_id_nesting_flag)?;
        w.put_u(0xffff, 16)?; // vps_reserved_0xffff_16bits
        self.profile_tier_level.write(w, self.vps_max_sub_layers_minus1)?;

        w.put_flag(self.vps_sub_layer_ordering_info_present_flag)?;
        let top = self.vps_max_sub_layers_minus1 as usize;
        let lowest = if self.vps_sub_layer_ordering_info_present_flag {
            0
        } else {
            top
        };
        for i in lowest..=top {
            w.put_ue(self.vps_max_dec_pic_buffering_minus1[i])?;
            w.put_ue(self.vps_max_num_reorder_pics[i])?;
            w.put_ue(self.vps_max_latency_increase_plus1[i])?;
        }

        w.put_u(u32::from(self.vps_max_layer_id), 6)?;
        w.put_ue(self.vps_num_layer_sets_minus1)?;
        w.put_flag(false)?; // vps_timing_info_present_flag
        w.put_flag(false)?; // vps_extension_flag
        w.rbsp_trailing_bits()
    }

    /// Serializes the VPS as a complete Annex-B NAL unit.
    pub fn to_nal(&self) -> io::Result<Vec<u8>> {
        let mut w = RbspWriter::new();
        self.write_rbsp(&mut w)?;
        Ok(crate::bitwriter::build_nal(
            crate::nal::NaluType::VPS_NUT,
            &w.into_bytes()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptl::PROFILE_IDC_MAIN;

    fn test_vps() -> Vps {
        let mut vps = Vps::default();
        vps.vps_video_parameter_set_id = 0;
        vps.vps_base_layer_internal_flag = true;
        vps.vps_base_layer_available_flag = true;
        vps.vps_max_sub_layers_minus1 = 0;
        vps.vps_temporal_id_nesting_flag = true;
        vps.profile_tier_level.general_profile_idc = PROFILE_IDC_MAIN;
        vps.profile_tier_level.general_profile_compatibility_flags = 1 << PROFILE_IDC_MAIN;
        vps.profile_tier_level.general_progressive_source_flag = true;
        vps.profile_tier_level.general_frame_only_constraint_flag = true;
        vps.profile_tier_level.general_level_idc = 120;
        vps.vps_max_dec_pic_buffering_minus1[0] = 6;
        vps
    }

    #[test]
    fn round_trip() {
        let vps = test_vps();
        let mut w = RbspWriter::new();
        vps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(Vps::parse(&mut r).unwrap(), vps);
    }

    #[test]
    fn round_trip_with_sub_layers() {
        let mut vps = test_vps();
        vps.vps_max_sub_layers_minus1 = 2;
        vps.vps_sub_layer_ordering_info_present_flag = true;
        vps.vps_max_dec_pic_buffering_minus1 = [2, 4, 6, 0, 0, 0, 0, 0];
        vps.vps_max_num_reorder_pics = [1, 2, 3, 0, 0, 0, 0, 0];
        vps.vps_max_latency_increase_plus1 = [0, 5, 9, 0, 0, 0, 0, 0];
        let mut w = RbspWriter::new();
        vps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(Vps::parse(&mut r).unwrap(), vps);
    }

    #[test]
    fn ordering_info_propagates_from_top_slot() {
        let mut vps = test_vps();
        vps.vps_max_sub_layers_minus1 = 3;
        vps.vps_max_dec_pic_buffering_minus1[3] = 5;
        vps.vps_max_num_reorder_pics[3] = 2;
        vps.vps_max_latency_increase_plus1[3] = 7;
        let mut w = RbspWriter::new();
        vps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let parsed = Vps::parse(&mut r).unwrap();
        for i in 0..=3 {
            assert_eq!(parsed.vps_max_dec_pic_buffering_minus1[i], 5);
            assert_eq!(parsed.vps_max_num_reorder_pics[i], 2);
            assert_eq!(parsed.vps_max_latency_increase_plus1[i], 7);
        }
    }

    #[test]
    fn reorder_pics_monotonicity_enforced() {
        let mut vps = test_vps();
        vps.vps_max_sub_layers_minus1 = 1;
        vps.vps_sub_layer_ordering_info_present_flag = true;
        vps.vps_max_dec_pic_buffering_minus1 = [4, 2, 0, 0, 0, 0, 0, 0];
        let mut w = RbspWriter::new();
        vps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert!(Vps::parse(&mut r).is_err());
    }
}
