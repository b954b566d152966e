//! SPS (Sequence Parameter Set), per _7.3.2.2_ in the spec.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::derive;
use crate::ptl::ProfileTierLevel;
use crate::rps::{ShortTermRefPicSet, MAX_SHORT_TERM_REF_PIC_SETS};
use crate::scaling::ScalingListData;
use crate::vui::Vui;
use crate::{in_range, require, Error, Result};

pub const MAX_SUB_LAYERS: usize = 8;
pub const MAX_LONG_TERM_REF_PIC_SETS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    pub sps_video_parameter_set_id: u8,
    pub sps_max_sub_layers_minus1: u8,
    pub sps_temporal_id_nesting_flag: bool,
    pub profile_tier_level: ProfileTierLevel,
    pub sps_seq_parameter_set_id: u8,
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    pub conformance_window_flag: bool,
    pub conf_win_left_offset: u32,
    pub conf_win_right_offset: u32,
    pub conf_win_top_offset: u32,
    pub conf_win_bottom_offset: u32,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub sps_sub_layer_ordering_info_present_flag: bool,
    pub sps_max_dec_pic_buffering_minus1: [u32; MAX_SUB_LAYERS],
    pub sps_max_num_reorder_pics: [u32; MAX_SUB_LAYERS],
    pub sps_max_latency_increase_plus1: [u32; MAX_SUB_LAYERS],
    pub log2_min_luma_coding_block_size_minus3: u32,
    pub log2_diff_max_min_luma_coding_block_size: u32,
    pub log2_min_luma_transform_block_size_minus2: u32,
    pub log2_diff_max_min_luma_transform_block_size: u32,
    pub max_transform_hierarchy_depth_inter: u32,
    pub max_transform_hierarchy_depth_intra: u32,
    pub scaling_list_enabled_flag: bool,
    pub sps_scaling_list_data_present_flag: bool,
    pub scaling_list_data: ScalingListData,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u32,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u32,
    pub pcm_loop_filter_disabled_flag: bool,
    pub num_short_term_ref_pic_sets: u32,
    pub st_ref_pic_set: Vec<ShortTermRefPicSet>,
    pub long_term_ref_pics_present_flag: bool,
    pub num_long_term_ref_pics_sps: u32,
    pub lt_ref_pic_poc_lsb_sps: [u32; MAX_LONG_TERM_REF_PIC_SETS],
    pub used_by_curr_pic_lt_sps_flag: [bool; MAX_LONG_TERM_REF_PIC_SETS],
    pub sps_temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub vui_parameters_present_flag: bool,
    pub vui_parameters: Vui,
    pub sps_extension_present_flag: bool,
    pub sps_range_extension_flag: bool,
    pub sps_multilayer_extension_flag: bool,
    pub sps_3d_extension_flag: bool,
    pub sps_scc_extension_flag: bool,
    pub transform_skip_rotation_enabled_flag: bool,
    pub transform_skip_context_enabled_flag: bool,
    pub implicit_rdpcm_enabled_flag: bool,
    pub explicit_rdpcm_enabled_flag: bool,
    pub extended_precision_processing_flag: bool,
    pub intra_smoothing_disabled_flag: bool,
    pub high_precision_offsets_enabled_flag: bool,
    pub persistent_rice_adaptation_enabled_flag: bool,
    pub cabac_bypass_alignment_enabled_flag: bool,

    // Derived, not coded.
    pub chroma_array_type: u8,
    pub sub_width_c: u32,
    pub sub_height_c: u32,
    pub bit_depth_y: u8,
    pub bit_depth_c: u8,
    pub max_pic_order_cnt_lsb: i32,
    pub max_dpb_size: u32,
    pub ctb_log2_size_y: u32,
    pub pic_width_in_ctbs_y: u32,
    pub pic_height_in_ctbs_y: u32,
    pub pic_size_in_ctbs_y: u32,
    pub wp_offset_half_range_y: i32,
    pub wp_offset_half_range_c: i32,
}

impl Default for Sps {
    fn default() -> Self {
        Self {
            sps_video_parameter_set_id: 0,
            sps_max_sub_layers_minus1: 0,
            sps_temporal_id_nesting_flag: false,
            profile_tier_level: ProfileTierLevel::default(),
            sps_seq_parameter_set_id: 0,
            chroma_format_idc: 0,
            separate_colour_plane_flag: false,
            pic_width_in_luma_samples: 0,
            pic_height_in_luma_samples: 0,
            conformance_window_flag: false,
            conf_win_left_offset: 0,
            conf_win_right_offset: 0,
            conf_win_top_offset: 0,
            conf_win_bottom_offset: 0,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            log2_max_pic_order_cnt_lsb_minus4: 0,
            sps_sub_layer_ordering_info_present_flag: false,
            sps_max_dec_pic_buffering_minus1: [0; MAX_SUB_LAYERS],
            sps_max_num_reorder_pics: [0; MAX_SUB_LAYERS],
            sps_max_latency_increase_plus1: [0; MAX_SUB_LAYERS],
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 0,
            log2_min_luma_transform_block_size_minus2: 0,
            log2_diff_max_min_luma_transform_block_size: 0,
            max_transform_hierarchy_depth_inter: 0,
            max_transform_hierarchy_depth_intra: 0,
            scaling_list_enabled_flag: false,
            sps_scaling_list_data_present_flag: false,
            scaling_list_data: ScalingListData::default(),
            amp_enabled_flag: false,
            sample_adaptive_offset_enabled_flag: false,
            pcm_enabled_flag: false,
            pcm_sample_bit_depth_luma_minus1: 0,
            pcm_sample_bit_depth_chroma_minus1: 0,
            log2_min_pcm_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_pcm_luma_coding_block_size: 0,
            pcm_loop_filter_disabled_flag: false,
            num_short_term_ref_pic_sets: 0,
            st_ref_pic_set: Vec::new(),
            long_term_ref_pics_present_flag: false,
            num_long_term_ref_pics_sps: 0,
            lt_ref_pic_poc_lsb_sps: [0; MAX_LONG_TERM_REF_PIC_SETS],
            used_by_curr_pic_lt_sps_flag: [false; MAX_LONG_TERM_REF_PIC_SETS],
            sps_temporal_mvp_enabled_flag: false,
            strong_intra_smoothing_enabled_flag: false,
            vui_parameters_present_flag: false,
            vui_parameters: Vui::default(),
            sps_extension_present_flag: false,
            sps_range_extension_flag: false,
            sps_multilayer_extension_flag: false,
            sps_3d_extension_flag: false,
            sps_scc_extension_flag: false,
            transform_skip_rotation_enabled_flag: false,
            transform_skip_context_enabled_flag: false,
            implicit_rdpcm_enabled_flag: false,
            explicit_rdpcm_enabled_flag: false,
            extended_precision_processing_flag: false,
            intra_smoothing_disabled_flag: false,
            high_precision_offsets_enabled_flag: false,
            persistent_rice_adaptation_enabled_flag: false,
            cabac_bypass_alignment_enabled_flag: false,
            chroma_array_type: 0,
            sub_width_c: 1,
            sub_height_c: 1,
            bit_depth_y: 8,
            bit_depth_c: 8,
            max_pic_order_cnt_lsb: 16,
            max_dpb_size: 0,
            ctb_log2_size_y: 0,
            pic_width_in_ctbs_y: 0,
            pic_height_in_ctbs_y: 0,
            pic_size_in_ctbs_y: 0,
            wp_offset_half_range_y: 1 << 7,
            wp_offset_half_range_c: 1 << 7,
        }
    }
}

impl Sps {
    pub fn parse(r: &mut BitReader) -> Result<Sps> {
        let mut sps = Sps::default();

        sps.sps_video_parameter_set_id = r.read_bits(4)? as u8;
        in_range("sps_video_parameter_set_id", sps.sps_video_parameter_set_id, 0, 15)?;
        sps.sps_max_sub_layers_minus1 = r.read_bits(3)? as u8;
        in_range("sps_max_sub_layers_minus1", sps.sps_max_sub_layers_minus1, 0, 6)?;
        sps.sps_temporal_id_nesting_flag = r.read_bool()?;

        sps.profile_tier_level =
            ProfileTierLevel::parse(r, true, sps.sps_max_sub_layers_minus1)?;

        let sps_seq_parameter_set_id = r.read_ue()?;
        in_range("sps_seq_parameter_set_id", sps_seq_parameter_set_id, 0, 15)?;
        sps.sps_seq_parameter_set_id = sps_seq_parameter_set_id as u8;
        let chroma_format_idc = r.read_ue()?;
        in_range("chroma_format_idc", chroma_format_idc, 0, 3)?;
        sps.chroma_format_idc = chroma_format_idc as u8;
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = r.read_bool()?;
        }
        sps.chroma_array_type =
            derive::chroma_array_type(sps.separate_colour_plane_flag, sps.chroma_format_idc);
        let (sub_width_c, sub_height_c) = derive::sub_sampling(sps.chroma_format_idc);
        sps.sub_width_c = sub_width_c;
        sps.sub_height_c = sub_height_c;

        sps.pic_width_in_luma_samples = r.read_ue()?;
        sps.pic_height_in_luma_samples = r.read_ue()?;
        require("pic_width_in_luma_samples", sps.pic_width_in_luma_samples != 0)?;
        require("pic_height_in_luma_samples", sps.pic_height_in_luma_samples != 0)?;

        sps.max_dpb_size = derive::max_dpb_size(
            &sps.profile_tier_level,
            sps.pic_width_in_luma_samples,
            sps.pic_height_in_luma_samples,
        )?;

        sps.conformance_window_flag = r.read_bool()?;
        if sps.conformance_window_flag {
            sps.conf_win_left_offset = r.read_ue()?;
            sps.conf_win_right_offset = r.read_ue()?;
            sps.conf_win_top_offset = r.read_ue()?;
            sps.conf_win_bottom_offset = r.read_ue()?;
            sps.check_conformance_crop(None)?;
        }

        let bit_depth_luma_minus8 = r.read_ue()?;
        in_range("bit_depth_luma_minus8", bit_depth_luma_minus8, 0, 8)?;
        sps.bit_depth_luma_minus8 = bit_depth_luma_minus8 as u8;
        sps.bit_depth_y = sps.bit_depth_luma_minus8 + 8;
        let bit_depth_chroma_minus8 = r.read_ue()?;
        in_range("bit_depth_chroma_minus8", bit_depth_chroma_minus8, 0, 8)?;
        sps.bit_depth_chroma_minus8 = bit_depth_chroma_minus8 as u8;
        sps.bit_depth_c = sps.bit_depth_chroma_minus8 + 8;

        let log2_max_pic_order_cnt_lsb_minus4 = r.read_ue()?;
        in_range(
            "log2_max_pic_order_cnt_lsb_minus4",
            log2_max_pic_order_cnt_lsb_minus4,
            0,
            12,
        )?;
        sps.log2_max_pic_order_cnt_lsb_minus4 = log2_max_pic_order_cnt_lsb_minus4 as u8;
        sps.max_pic_order_cnt_lsb =
            derive::max_pic_order_cnt_lsb(sps.log2_max_pic_order_cnt_lsb_minus4);

        sps.sps_sub_layer_ordering_info_present_flag = r.read_bool()?;
        let top = sps.sps_max_sub_layers_minus1 as usize;
        let lowest = if sps.sps_sub_layer_ordering_info_present_flag {
            0
        } else {
            top
        };
        for i in lowest..=top {
            sps.sps_max_dec_pic_buffering_minus1[i] = r.read_ue()?;
            in_range(
                "sps_max_dec_pic_buffering_minus1",
                sps.sps_max_dec_pic_buffering_minus1[i],
                0,
                sps.max_dpb_size - 1,
            )?;
            sps.sps_max_num_reorder_pics[i] = r.read_ue()?;
            in_range(
                "sps_max_num_reorder_pics",
                sps.sps_max_num_reorder_pics[i],
                0,
                sps.sps_max_dec_pic_buffering_minus1[i],
            )?;
            if i > 0 {
                require(
                    "sps_max_dec_pic_buffering_minus1",
                    sps.sps_max_dec_pic_buffering_minus1[i]
                        >= sps.sps_max_dec_pic_buffering_minus1[i - 1],
                )?;
                require(
                    "sps_max_num_reorder_pics",
                    sps.sps_max_num_reorder_pics[i] >= sps.sps_max_num_reorder_pics[i - 1],
                )?;
            }
            sps.sps_max_latency_increase_plus1[i] = r.read_ue()?;
            in_range(
                "sps_max_latency_increase_plus1",
                sps.sps_max_latency_increase_plus1[i],
                0,
                0xffff_fffe,
            )?;
        }
        if !sps.sps_sub_layer_ordering_info_present_flag {
            for i in 0..top {
                sps.sps_max_dec_pic_buffering_minus1[i] =
                    sps.sps_max_dec_pic_buffering_minus1[top];
                sps.sps_max_num_reorder_pics[i] = sps.sps_max_num_reorder_pics[top];
                sps.sps_max_latency_increase_plus1[i] = sps.sps_max_latency_increase_plus1[top];
            }
        }

        sps.log2_min_luma_coding_block_size_minus3 = r.read_ue()?;
        // Keeps min_cb_log2_size_y <= 30 and the shifts below in range.
        require(
            "log2_min_luma_coding_block_size_minus3",
            sps.log2_min_luma_coding_block_size_minus3 <= 27,
        )?;
        sps.log2_diff_max_min_luma_coding_block_size = r.read_ue()?;

        let min_cb_log2_size_y = sps.log2_min_luma_coding_block_size_minus3 + 3;
        let ctb_log2_size_y = min_cb_log2_size_y
            .checked_add(sps.log2_diff_max_min_luma_coding_block_size)
            .ok_or(Error::InvalidStream("ctb_log2_size_y"))?;
        require("ctb_log2_size_y", ctb_log2_size_y <= 30)?;
        sps.ctb_log2_size_y = ctb_log2_size_y;
        let min_cb_size_y = 1u32 << min_cb_log2_size_y;
        let ctb_size_y = 1u32 << ctb_log2_size_y;
        sps.pic_width_in_ctbs_y = derive::ceil_div(sps.pic_width_in_luma_samples, ctb_size_y);
        sps.pic_height_in_ctbs_y = derive::ceil_div(sps.pic_height_in_luma_samples, ctb_size_y);
        sps.pic_size_in_ctbs_y = sps
            .pic_width_in_ctbs_y
            .checked_mul(sps.pic_height_in_ctbs_y)
            .ok_or(Error::InvalidStream("pic_size_in_ctbs_y"))?;

        require(
            "pic_width_in_luma_samples",
            sps.pic_width_in_luma_samples % min_cb_size_y == 0,
        )?;
        require(
            "pic_height_in_luma_samples",
            sps.pic_height_in_luma_samples % min_cb_size_y == 0,
        )?;

        sps.log2_min_luma_transform_block_size_minus2 = r.read_ue()?;
        require(
            "log2_min_luma_transform_block_size_minus2",
            sps.log2_min_luma_transform_block_size_minus2 < min_cb_log2_size_y - 2,
        )?;
        let min_tb_log2_size_y = sps.log2_min_luma_transform_block_size_minus2 + 2;
        sps.log2_diff_max_min_luma_transform_block_size = r.read_ue()?;
        require(
            "log2_diff_max_min_luma_transform_block_size",
            i64::from(sps.log2_diff_max_min_luma_transform_block_size)
                <= i64::from(sps.ctb_log2_size_y.min(5)) - i64::from(min_tb_log2_size_y),
        )?;
        sps.max_transform_hierarchy_depth_inter = r.read_ue()?;
        in_range(
            "max_transform_hierarchy_depth_inter",
            sps.max_transform_hierarchy_depth_inter,
            0,
            sps.ctb_log2_size_y - min_tb_log2_size_y,
        )?;
        sps.max_transform_hierarchy_depth_intra = r.read_ue()?;
        in_range(
            "max_transform_hierarchy_depth_intra",
            sps.max_transform_hierarchy_depth_intra,
            0,
            sps.ctb_log2_size_y - min_tb_log2_size_y,
        )?;

        sps.scaling_list_enabled_flag = r.read_bool()?;
        if sps.scaling_list_enabled_flag {
            sps.sps_scaling_list_data_present_flag = r.read_bool()?;
        }
        if sps.sps_scaling_list_data_present_flag {
            sps.scaling_list_data = ScalingListData::parse(r)?;
        }

        sps.amp_enabled_flag = r.read_bool()?;
        sps.sample_adaptive_offset_enabled_flag = r.read_bool()?;
        sps.pcm_enabled_flag = r.read_bool()?;
        if sps.pcm_enabled_flag {
            sps.pcm_sample_bit_depth_luma_minus1 = r.read_bits(4)? as u8;
            require(
                "pcm_sample_bit_depth_luma_minus1",
                sps.pcm_sample_bit_depth_luma_minus1 + 1 <= sps.bit_depth_y,
            )?;
            sps.pcm_sample_bit_depth_chroma_minus1 = r.read_bits(4)? as u8;
            require(
                "pcm_sample_bit_depth_chroma_minus1",
                sps.pcm_sample_bit_depth_chroma_minus1 + 1 <= sps.bit_depth_c,
            )?;
            sps.log2_min_pcm_luma_coding_block_size_minus3 = r.read_ue()?;
            in_range(
                "log2_min_pcm_luma_coding_block_size_minus3",
                sps.log2_min_pcm_luma_coding_block_size_minus3,
                0,
                2,
            )?;
            let log2_min_ipcm_cb_size_y = sps.log2_min_pcm_luma_coding_block_size_minus3 + 3;
            in_range(
                "log2_min_pcm_luma_coding_block_size_minus3",
                log2_min_ipcm_cb_size_y,
                min_cb_log2_size_y.min(5),
                sps.ctb_log2_size_y.min(5),
            )?;
            sps.log2_diff_max_min_pcm_luma_coding_block_size = r.read_ue()?;
            require(
                "log2_diff_max_min_pcm_luma_coding_block_size",
                sps.log2_diff_max_min_pcm_luma_coding_block_size
                    <= sps.ctb_log2_size_y.min(5) - log2_min_ipcm_cb_size_y,
            )?;
            sps.pcm_loop_filter_disabled_flag = r.read_bool()?;
        }

        sps.num_short_term_ref_pic_sets = r.read_ue()?;
        in_range(
            "num_short_term_ref_pic_sets",
            sps.num_short_term_ref_pic_sets,
            0,
            MAX_SHORT_TERM_REF_PIC_SETS,
        )?;
        for i in 0..sps.num_short_term_ref_pic_sets {
            let set = ShortTermRefPicSet::parse(
                r,
                i,
                sps.num_short_term_ref_pic_sets,
                &sps.st_ref_pic_set,
                sps.sps_max_dec_pic_buffering_minus1[top],
                false,
            )?;
            sps.st_ref_pic_set.push(set);
        }

        sps.long_term_ref_pics_present_flag = r.read_bool()?;
        if sps.long_term_ref_pics_present_flag {
            sps.num_long_term_ref_pics_sps = r.read_ue()?;
            in_range(
                "num_long_term_ref_pics_sps",
                sps.num_long_term_ref_pics_sps,
                0,
                MAX_LONG_TERM_REF_PIC_SETS as u32,
            )?;
            for i in 0..sps.num_long_term_ref_pics_sps as usize {
                sps.lt_ref_pic_poc_lsb_sps[i] =
                    r.read_bits(u32::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4)?;
                sps.used_by_curr_pic_lt_sps_flag[i] = r.read_bool()?;
            }
        }

        sps.sps_temporal_mvp_enabled_flag = r.read_bool()?;
        sps.strong_intra_smoothing_enabled_flag = r.read_bool()?;

        sps.vui_parameters_present_flag = r.read_bool()?;
        if sps.vui_parameters_present_flag {
            sps.vui_parameters = Vui::parse(r, sps.sps_max_sub_layers_minus1)?;
            // The conformance window alone was validated earlier; the
            // default display window adds to the crop.
            sps.check_conformance_crop(Some(&sps.vui_parameters))?;
        }

        sps.sps_extension_present_flag = r.read_bool()?;
        if sps.sps_extension_present_flag {
            sps.sps_range_extension_flag = r.read_bool()?;
            sps.sps_multilayer_extension_flag = r.read_bool()?;
            sps.sps_3d_extension_flag = r.read_bool()?;
            sps.sps_scc_extension_flag = r.read_bool()?;
            r.skip_bits(4)?; // sps_extension_4bits
        }
        if sps.sps_range_extension_flag {
            sps.transform_skip_rotation_enabled_flag = r.read_bool()?;
            sps.transform_skip_context_enabled_flag = r.read_bool()?;
            sps.implicit_rdpcm_enabled_flag = r.read_bool()?;
            sps.explicit_rdpcm_enabled_flag = r.read_bool()?;
            sps.extended_precision_processing_flag = r.read_bool()?;
            sps.intra_smoothing_disabled_flag = r.read_bool()?;
            sps.high_precision_offsets_enabled_flag = r.read_bool()?;
            sps.persistent_rice_adaptation_enabled_flag = r.read_bool()?;
            sps.cabac_bypass_alignment_enabled_flag = r.read_bool()?;
        }
        if sps.sps_multilayer_extension_flag {
            tracing::debug!("HEVC multilayer extension not supported");
            return Err(Error::UnsupportedStream("sps_multilayer_extension_flag"));
        }
        if sps.sps_3d_extension_flag {
            tracing::debug!("HEVC 3D extension not supported");
            return Err(Error::UnsupportedStream("sps_3d_extension_flag"));
        }
        if sps.sps_scc_extension_flag {
            tracing::debug!("HEVC SCC extension not supported");
            return Err(Error::UnsupportedStream("sps_scc_extension_flag"));
        }

        sps.wp_offset_half_range_y = 1
            << (if sps.high_precision_offsets_enabled_flag {
                sps.bit_depth_luma_minus8 + 7
            } else {
                7
            });
        sps.wp_offset_half_range_c = 1
            << (if sps.high_precision_offsets_enabled_flag {
                sps.bit_depth_chroma_minus8 + 7
            } else {
                7
            });

        Ok(sps)
    }

    /// The conformance-window crop, plus the default-display-window crop
    /// when VUI is present, must stay strictly inside the picture after
    /// chroma subsampling scaling.
    fn check_conformance_crop(&self, vui: Option<&Vui>) -> Result<()> {
        let (disp_left, disp_right, disp_top, disp_bottom) = match vui {
            Some(v) => (
                v.def_disp_win_left_offset,
                v.def_disp_win_right_offset,
                v.def_disp_win_top_offset,
                v.def_disp_win_bottom_offset,
            ),
            None => (0, 0, 0, 0),
        };
        let width_crop = self
            .conf_win_left_offset
            .checked_add(self.conf_win_right_offset)
            .and_then(|c| c.checked_add(disp_left))
            .and_then(|c| c.checked_add(disp_right))
            .and_then(|c| c.checked_mul(self.sub_width_c))
            .ok_or(Error::InvalidStream("conf_win_width_crop"))?;
        require(
            "conf_win_width_crop",
            width_crop < self.pic_width_in_luma_samples,
        )?;
        let height_crop = self
            .conf_win_top_offset
            .checked_add(self.conf_win_bottom_offset)
            .and_then(|c| c.checked_add(disp_top))
            .and_then(|c| c.checked_add(disp_bottom))
            .and_then(|c| c.checked_mul(self.sub_height_c))
            .ok_or(Error::InvalidStream("conf_win_height_crop"))?;
        require(
            "conf_win_height_crop",
            height_crop < self.pic_height_in_luma_samples,
        )?;
        Ok(())
    }

    /// Fills every derived field from the coded ones. The encode path
    /// builds a record by hand and calls this before serializing.
    pub fn finalize(&mut self) -> Result<()> {
        self.chroma_array_type =
            derive::chroma_array_type(self.separate_colour_plane_flag, self.chroma_format_idc);
        let (sub_width_c, sub_height_c) = derive::sub_sampling(self.chroma_format_idc);
        self.sub_width_c = sub_width_c;
        self.sub_height_c = sub_height_c;
        self.bit_depth_y = self.bit_depth_luma_minus8 + 8;
        self.bit_depth_c = self.bit_depth_chroma_minus8 + 8;
        self.max_pic_order_cnt_lsb =
            derive::max_pic_order_cnt_lsb(self.log2_max_pic_order_cnt_lsb_minus4);
        self.max_dpb_size = derive::max_dpb_size(
            &self.profile_tier_level,
            self.pic_width_in_luma_samples,
            self.pic_height_in_luma_samples,
        )?;
        let min_cb_log2_size_y = self.log2_min_luma_coding_block_size_minus3 + 3;
        self.ctb_log2_size_y = min_cb_log2_size_y
            .checked_add(self.log2_diff_max_min_luma_coding_block_size)
            .ok_or(Error::InvalidStream("ctb_log2_size_y"))?;
        require("ctb_log2_size_y", self.ctb_log2_size_y <= 30)?;
        let ctb_size_y = 1u32 << self.ctb_log2_size_y;
        self.pic_width_in_ctbs_y = derive::ceil_div(self.pic_width_in_luma_samples, ctb_size_y);
        self.pic_height_in_ctbs_y = derive::ceil_div(self.pic_height_in_luma_samples, ctb_size_y);
        self.pic_size_in_ctbs_y = self
            .pic_width_in_ctbs_y
            .checked_mul(self.pic_height_in_ctbs_y)
            .ok_or(Error::InvalidStream("pic_size_in_ctbs_y"))?;
        self.wp_offset_half_range_y = 1
            << (if self.high_precision_offsets_enabled_flag {
                self.bit_depth_luma_minus8 + 7
            } else {
                7
            });
        self.wp_offset_half_range_c = 1
            << (if self.high_precision_offsets_enabled_flag {
                self.bit_depth_chroma_minus8 + 7
            } else {
                7
            });
        Ok(())
    }

    pub fn write_rbsp(&self, w: &mut RbspWriter) -> io::Result<()> {
        w.put_u(u32::from(self.sps_video_parameter_set_id), 4)?;
        w.put_u(u32::from(self.sps_max_sub_layers_minus1), 3)?;
        w.put_flag(self.sps_temporal_id_nesting_flag)?;
        self.profile_tier_level.write(w, self.sps_max_sub_layers_minus1)?;

        w.put_ue(u32::from(self.sps_seq_parameter_set_id))?;
        w.put_ue(u32::from(self.chroma_format_idc))?;
        if self.chroma_format_idc == 3 {
            w.put_flag(self.separate_colour_plane_flag)?;
        }
        w.put_ue(self.pic_width_in_luma_samples)?;
        w.put_ue(self.pic_height_in_luma_samples)?;
        w.put_flag(self.conformance_window_flag)?;
        if self.conformance_window_flag {
            w.put_ue(self.conf_win_left_offset)?;
            w.put_ue(self.conf_win_right_offset)?;
            w.put_ue(self.conf_win_top_offset)?;
            w.put_ue(self.conf_win_bottom_offset)?;
        }
        w.put_ue(u32::from(self.bit_depth_luma_minus8))?;
        w.put_ue(u32::from(self.bit_depth_chroma_minus8))?;
        w.put_ue(u32::from(self.log2_max_pic_order_cnt_lsb_minus4))?;

        w.put_flag(self.sps_sub_layer_ordering_info_present_flag)?;
        let top = self.sps_max_sub_layers_minus1 as usize;
        let lowest = if self.sps_sub_layer_ordering_info_present_flag {
            0
        } else {
            top
        };
        for i in lowest..=top {
            w.put_ue(self.sps_max_dec_pic_buffering_minus1[i])?;
            w.put_ue(self.sps_max_num_reorder_pics[i])?;
            w.put_ue(self.sps_max_latency_increase_plus1[i])?;
        }

        w.put_ue(self.log2_min_luma_coding_block_size_minus3)?;
        w.put_ue(self.log2_diff_max_min_luma_coding_block_size)?;
        w.put_ue(self.log2_min_luma_transform_block_size_minus2)?;
        w.put_ue(self.log2_diff_max_min_luma_transform_block_size)?;
        w.put_ue(self.max_transform_hierarchy_depth_inter)?;
        w.put_ue(self.max_transform_hierarchy_depth_intra)?;

        w.put_flag(self.scaling_list_enabled_flag)?;
        if self.scaling_list_enabled_flag {
            w.put_flag(self.sps_scaling_list_data_present_flag)?;
            if self.sps_scaling_list_data_present_flag {
                self.scaling_list_data.write(w)?;
            }
        }

        w.put_flag(self.amp_enabled_flag)?;
        w.put_flag(self.sample_adaptive_offset_enabled_flag)?;
        w.put_flag(self.pcm_enabled_flag)?;
        if self.pcm_enabled_flag {
            w.put_u(u32::from(self.pcm_sample_bit_depth_luma_minus1), 4)?;
            w.put_u(u32::from(self.pcm_sample_bit_depth_chroma_minus1), 4)?;
            w.put_ue(self.log2_min_pcm_luma_coding_block_size_minus3)?;
            w.put_ue(self.log2_diff_max_min_pcm_luma_coding_block_size)?;
            w.put_flag(self.pcm_loop_filter_disabled_flag)?;
        }

        w.put_ue(self.num_short_term_ref_pic_sets)?;
        for (i, set) in self.st_ref_pic_set.iter().enumerate() {
            set.write(w, i as u32)?;
        }

        w.put_flag(self.long_term_ref_pics_present_flag)?;
        if self.long_term_ref_pics_present_flag {
            w.put_ue(self.num_long_term_ref_pics_sps)?;
            for i in 0..self.num_long_term_ref_pics_sps as usize {
                w.put_u(
                    self.lt_ref_pic_poc_lsb_sps[i],
                    u32::from(self.log2_max_pic_order_cnt_lsb_minus4) + 4,
                )?;
                w.put_flag(self.used_by_curr_pic_lt_sps_flag[i])?;
            }
        }

        w.put_flag(self.sps_temporal_mvp_enabled_flag)?;
        w.put_flag(self.strong_intra_smoothing_enabled_flag)?;

        w.put_flag(self.vui_parameters_present_flag)?;
        if self.vui_parameters_present_flag {
            self.vui_parameters.write(w)?;
        }

        w.put_flag(self.sps_extension_present_flag)?;
        if self.sps_extension_present_flag {
            w.put_flag(self.sps_range_extension_flag)?;
            w.put_flag(self.sps_multilayer_extension_flag)?;
            w.put_flag(self.sps_3d_extension_flag)?;
            w.put_flag(self.sps_scc_extension_flag)?;
            w.put_u(0, 4)?; // sps_extension_4bits
        }
        if self.sps_range_extension_flag {
            w.put_flag(self.transform_skip_rotation_enabled_flag)?;
            w.put_flag(self.transform_skip_context_enabled_flag)?;
            w.put_flag(self.implicit_rdpcm_enabled_flag)?;
            w.put_flag(self.explicit_rdpcm_enabled_flag)?;
            w.put_flag(self.extended_precision_processing_flag)?;
            w.put_flag(self.intra_smoothing_disabled_flag)?;
            w.put_flag(self.high_precision_offsets_enabled_flag)?;
            w.put_flag(self.persistent_rice_adaptation_enabled_flag)?;
            w.put_flag(self.cabac_bypass_alignment_enabled_flag)?;
        }
        w.rbsp_trailing_bits()
    }

    /// Serializes the SPS as a complete Annex-B NAL unit.
    pub fn to_nal(&self) -> io::Result<Vec<u8>> {
        let mut w = RbspWriter::new();
        self.write_rbsp(&mut w)?;
        Ok(crate::bitwriter::build_nal(
            crate::nal::NaluType::SPS_NUT,
            &w.into_bytes()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptl::PROFILE_IDC_MAIN;

    fn test_sps() -> Sps {
        let mut sps = Sps::default();
        sps.sps_temporal_id_nesting_flag = true;
        sps.profile_tier_level.general_profile_idc = PROFILE_IDC_MAIN;
        sps.profile_tier_level.general_profile_compatibility_flags = 1 << PROFILE_IDC_MAIN;
        sps.profile_tier_level.general_progressive_source_flag = true;
        sps.profile_tier_level.general_frame_only_constraint_flag = true;
        sps.profile_tier_level.general_level_idc = 120;
        sps.chroma_format_idc = 1;
        sps.pic_width_in_luma_samples = 1920;
        sps.pic_height_in_luma_samples = 1088;
        sps.conformance_window_flag = true;
        sps.conf_win_bottom_offset = 4;
        sps.log2_max_pic_order_cnt_lsb_minus4 = 4;
        sps.sps_max_dec_pic_buffering_minus1[0] = 5;
        sps.log2_diff_max_min_luma_coding_block_size = 3;
        sps.log2_diff_max_min_luma_transform_block_size = 3;
        sps.max_transform_hierarchy_depth_inter = 2;
        sps.max_transform_hierarchy_depth_intra = 2;
        sps.amp_enabled_flag = true;
        sps.sample_adaptive_offset_enabled_flag = true;
        sps.sps_temporal_mvp_enabled_flag = true;
        sps.strong_intra_smoothing_enabled_flag = true;
        sps.finalize().unwrap();
        sps
    }

    fn write_then_parse(sps: &Sps) -> Result<Sps> {
        let mut w = RbspWriter::new();
        sps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        Sps::parse(&mut r)
    }

    #[test]
    fn round_trip() {
        let sps = test_sps();
        assert_eq!(write_then_parse(&sps).unwrap(), sps);
    }

    #[test]
    fn round_trip_with_ref_pic_sets_and_scaling() {
        let mut sps = test_sps();
        sps.num_short_term_ref_pic_sets = 2;
        let mut set = ShortTermRefPicSet::default();
        set.num_negative_pics = 1;
        set.delta_poc_s0[0] = -1;
        set.used_by_curr_pic_s0[0] = true;
        set.num_delta_pocs = 1;
        sps.st_ref_pic_set.push(set);
        let mut set = ShortTermRefPicSet::default();
        set.num_negative_pics = 2;
        set.delta_poc_s0[0] = -2;
        set.used_by_curr_pic_s0[0] = true;
        set.delta_poc_s0[1] = -4;
        set.num_delta_pocs = 2;
        sps.st_ref_pic_set.push(set);
        sps.scaling_list_enabled_flag = true;
        sps.sps_scaling_list_data_present_flag = true;
        sps.scaling_list_data.scaling_list_4x4[0][5] = 77;
        assert_eq!(write_then_parse(&sps).unwrap(), sps);
    }

    #[test]
    fn derived_geometry() {
        let sps = test_sps();
        assert_eq!(sps.ctb_log2_size_y, 6);
        assert_eq!(sps.pic_width_in_ctbs_y, 30);
        assert_eq!(sps.pic_height_in_ctbs_y, 17);
        assert_eq!(sps.pic_size_in_ctbs_y, 510);
        assert_eq!(sps.sub_width_c, 2);
        assert_eq!(sps.sub_height_c, 2);
        assert_eq!(sps.chroma_array_type, 1);
        assert_eq!(sps.max_pic_order_cnt_lsb, 256);
        assert_eq!(sps.max_dpb_size, 6);
    }

    #[test]
    fn seq_parameter_set_id_out_of_range_rejected() {
        let mut sps = test_sps();
        sps.sps_seq_parameter_set_id = 16;
        assert_eq!(
            write_then_parse(&sps),
            Err(Error::InvalidStream("sps_seq_parameter_set_id"))
        );
    }

    #[test]
    fn oversized_crop_rejected() {
        let mut sps = test_sps();
        sps.conf_win_left_offset = 500;
        sps.conf_win_right_offset = 500;
        assert_eq!(
            write_then_parse(&sps),
            Err(Error::InvalidStream("conf_win_width_crop"))
        );
    }

    #[test]
    fn multilayer_extension_rejected() {
        let mut sps = test_sps();
        sps.sps_extension_present_flag = true;
        sps.sps_multilayer_extension_flag = true;
        assert_eq!(
            write_then_parse(&sps),
            Err(Error::UnsupportedStream("sps_multilayer_extension_flag"))
        );
    }

    #[test]
    fn scc_extension_rejected() {
        let mut sps = test_sps();
        sps.sps_extension_present_flag = true;
        sps.sps_scc_extension_flag = true;
        assert_eq!(
            write_then_parse(&sps),
            Err(Error::UnsupportedStream("sps_scc_extension_flag"))
        );
    }

    #[test]
    fn dec_pic_buffering_bounded_by_dpb_size() {
        let mut sps = test_sps();
        // max_dpb_size is 6 at 1920x1088 level 4: minus1 of 6 is out.
        sps.sps_max_dec_pic_buffering_minus1[0] = 6;
        assert_eq!(
            write_then_parse(&sps),
            Err(Error::InvalidStream("sps_max_dec_pic_buffering_minus1"))
        );
    }
}
