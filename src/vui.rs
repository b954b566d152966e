//! VUI parameters, per _Annex E.2.1_. HRD parameters are walked
//! bit-accurately but not retained.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::derive::sar_from_idc;
use crate::{in_range, Result};

const EXTENDED_SAR: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vui {
    pub sar_width: u16,
    pub sar_height: u16,
    pub video_full_range_flag: bool,
    pub colour_description_present_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coeffs: u8,
    pub def_disp_win_left_offset: u32,
    pub def_disp_win_right_offset: u32,
    pub def_disp_win_top_offset: u32,
    pub def_disp_win_bottom_offset: u32,
    pub bitstream_restriction_flag: bool,
    pub min_spatial_segmentation_idc: u32,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_min_cu_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
}

impl Vui {
    pub fn parse(r: &mut BitReader, sps_max_sub_layers_minus1: u8) -> Result<Vui> {
        let mut vui = Vui::default();

        let aspect_ratio_info_present_flag = r.read_bool()?;
        if aspect_ratio_info_present_flag {
            let aspect_ratio_idc = r.read_bits(8)? as u8;
            if aspect_ratio_idc == EXTENDED_SAR {
                vui.sar_width = r.read_bits(16)? as u16;
                vui.sar_height = r.read_bits(16)? as u16;
            } else {
                let (sar_width, sar_height) = sar_from_idc(aspect_ratio_idc)
                    .ok_or(crate::Error::InvalidStream("aspect_ratio_idc"))?;
                vui.sar_width = sar_width;
                vui.sar_height = sar_height;
            }
        }

        let overscan_info_present_flag = r.read_bool()?;
        if overscan_info_present_flag {
            r.skip_bits(1)?; // overscan_appropriate_flag
        }

        let video_signal_type_present_flag = r.read_bool()?;
        if video_signal_type_present_flag {
            r.skip_bits(3)?; // video_format
            vui.video_full_range_flag = r.read_bool()?;
            vui.colour_description_present_flag = r.read_bool()?;
            if vui.colour_description_present_flag {
                vui.colour_primaries = r.read_bits(8)? as u8;
                vui.transfer_characteristics = r.read_bits(8)? as u8;
                vui.matrix_coeffs = r.read_bits(8)? as u8;
            }
        }

        let chroma_loc_info_present_flag = r.read_bool()?;
        if chroma_loc_info_present_flag {
            r.read_ue()?; // chroma_sample_loc_type_top_field
            r.read_ue()?; // chroma_sample_loc_type_bottom_field
        }

        // neutral_chroma_indication_flag, field_seq_flag,
        // frame_field_info_present_flag.
        r.skip_bits(3)?;

        let default_display_window_flag = r.read_bool()?;
        if default_display_window_flag {
            vui.def_disp_win_left_offset = r.read_ue()?;
            vui.def_disp_win_right_offset = r.read_ue()?;
            vui.def_disp_win_top_offset = r.read_ue()?;
            vui.def_disp_win_bottom_offset = r.read_ue()?;
        }

        let vui_timing_info_present_flag = r.read_bool()?;
        if vui_timing_info_present_flag {
            r.skip_bits(32)?; // vui_num_units_in_tick
            r.skip_bits(32)?; // vui_time_scale
            let vui_poc_proportional_to_timing_flag = r.read_bool()?;
            if vui_poc_proportional_to_timing_flag {
                r.read_ue()?; // vui_num_ticks_poc_diff_one_minus1
            }
            skip_hrd_parameters(r, true, sps_max_sub_layers_minus1)?;
        }

        vui.bitstream_restriction_flag = r.read_bool()?;
        if vui.bitstream_restriction_flag {
            // tiles_fixed_structure_flag,
            // motion_vectors_over_pic_boundaries_flag,
            // restricted_ref_pic_lists_flag.
            r.skip_bits(3)?;
            vui.min_spatial_segmentation_idc = r.read_ue()?;
            vui.max_bytes_per_pic_denom = r.read_ue()?;
            vui.max_bits_per_min_cu_denom = r.read_ue()?;
            vui.log2_max_mv_length_horizontal = r.read_ue()?;
            vui.log2_max_mv_length_vertical = r.read_ue()?;
        }

        Ok(vui)
    }

    /// Mirrors the parse order; skipped-on-parse structures are emitted
    /// as absent and the SAR always uses the extended indicator.
    pub fn write(&self, w: &mut RbspWriter) -> io::Result<()> {
        let aspect_present = self.sar_width != 0 || self.sar_height != 0;
        w.put_flag(aspect_present)?;
        if aspect_present {
            w.put_u(u32::from(EXTENDED_SAR), 8)?;
            w.put_u(u32::from(self.sar_width), 16)?;
            w.put_u(u32::from(self.sar_height), 16)?;
        }

        w.put_flag(false)?; // overscan_info_present_flag

        let signal_type_present =
            self.video_full_range_flag || self.colour_description_present_flag;
        w.put_flag(signal_type_present)?;
        if signal_type_present {
            w.put_u(5, 3)?; // video_format: unspecified
            w.put_flag(self.video_full_range_flag)?;
            w.put_flag(self.colour_description_present_flag)?;
            if self.colour_description_present_flag {
                w.put_u(u32::from(self.colour_primaries), 8)?;
                w.put_u(u32::from(self.transfer_characteristics), 8)?;
                w.put_u(u32::from(self.matrix_coeffs), 8)?;
            }
        }

        w.put_flag(false)?; // chroma_loc_info_present_flag
        w.put_u(0, 3)?;

        let disp_win_present = self.def_disp_win_left_offset != 0
            || self.def_disp_win_right_offset != 0
            || self.def_disp_win_top_offset != 0
            || self.def_disp_win_bottom_offset != 0;
        w.put_flag(disp_win_present)?;
        if disp_win_present {
            w.put_ue(self.def_disp_win_left_offset)?;
            w.put_ue(self.def_disp_win_right_offset)?;
            w.put_ue(self.def_disp_win_top_offset)?;
            w.put_ue(self.def_disp_win_bottom_offset)?;
        }

        w.put_flag(false)?; // vui_timing_info_present_flag

        w.put_flag(self.bitstream_restriction_flag)?;
        if self.bitstream_restriction_flag {
            w.put_u(0, 3)?;
            w.put_ue(self.min_spatial_segmentation_idc)?;
            w.put_ue(self.max_bytes_per_pic_denom)?;
            w.put_ue(self.max_bits_per_min_cu_denom)?;
            w.put_ue(self.log2_max_mv_length_horizontal)?;
            w.put_ue(self.log2_max_mv_length_vertical)?;
        }
        Ok(())
    }
}

/// Walks `hrd_parameters()` without retaining anything.
pub fn skip_hrd_parameters(
    r: &mut BitReader,
    common_inf_present_flag: bool,
    max_num_sub_layers_minus1: u8,
) -> Result<()> {
    let present = r.read_bool()?;
    if !present {
        return Ok(());
    }

    let mut nal_hrd_parameters_present_flag = false;
    let mut vcl_hrd_parameters_present_flag = false;
    let mut sub_pic_hrd_params_present_flag = false;
    if common_inf_present_flag {
        nal_hrd_parameters_present_flag = r.read_bool()?;
        vcl_hrd_parameters_present_flag = r.read_bool()?;
        if nal_hrd_parameters_present_flag || vcl_hrd_parameters_present_flag {
            sub_pic_hrd_params_present_flag = r.read_bool()?;
            if sub_pic_hrd_params_present_flag {
                r.skip_bits(8)?; // tick_divisor_minus2
                r.skip_bits(5)?; // du_cpb_removal_delay_increment_length_minus1
                r.skip_bits(1)?; // sub_pic_cpb_params_in_pic_timing_sei_flag
                r.skip_bits(5)?; // dpb_output_delay_du_length_minus1
            }
            r.skip_bits(4)?; // bit_rate_scale
            r.skip_bits(4)?; // cpb_size_scale
            if sub_pic_hrd_params_present_flag {
                r.skip_bits(4)?; // cpb_size_du_scale
            }
            r.skip_bits(5)?; // initial_cpb_removal_delay_length_minus1
            r.skip_bits(5)?; // au_cpb_removal_delay_length_minus1
            r.skip_bits(5)?; // dpb_output_delay_length_minus1
        }
    }
    for _ in 0..=max_num_sub_layers_minus1 {
        let mut fixed_pic_rate_flag = r.read_bool()?; // general
        if !fixed_pic_rate_flag {
            fixed_pic_rate_flag = r.read_bool()?; // within_cvs
        }
        let mut low_delay_hrd_flag = false;
        if fixed_pic_rate_flag {
            r.read_ue()?; // elemental_duration_in_tc_minus1
        } else {
            low_delay_hrd_flag = r.read_bool()?;
        }
        let mut cpb_cnt = 1;
        if !low_delay_hrd_flag {
            let cpb_cnt_minus1 = r.read_ue()?;
            in_range("cpb_cnt_minus1", cpb_cnt_minus1, 0, 31)?;
            cpb_cnt = cpb_cnt_minus1 + 1;
        }
        if nal_hrd_parameters_present_flag {
            skip_sub_layer_hrd_parameters(r, cpb_cnt, sub_pic_hrd_params_present_flag)?;
        }
        if vcl_hrd_parameters_present_flag {
            skip_sub_layer_hrd_parameters(r, cpb_cnt, sub_pic_hrd_params_present_flag)?;
        }
    }
    Ok(())
}

fn skip_sub_layer_hrd_parameters(
    r: &mut BitReader,
    cpb_cnt: u32,
    sub_pic_hrd_params_present_flag: bool,
) -> Result<()> {
    for _ in 0..cpb_cnt {
        r.read_ue()?; // bit_rate_value_minus1
        r.read_ue()?; // cpb_size_value_minus1
        if sub_pic_hrd_params_present_flag {
            r.read_ue()?; // cpb_size_du_value_minus1
            r.read_ue()?; // bit_rate_du_value_minus1
        }
        r.skip_bits(1)?; // cbr_flag
    }
    Ok(())
}
