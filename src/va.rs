//! VA-API descriptor adapter: projects a [`LoweredView`] into
//! `VAPictureParameterBufferHEVC` / `VAIQMatrixBufferHEVC` shaped
//! records.

use crate::derive::uniform_tile_size_minus1;
use crate::lower::LoweredView;

pub const VA_INVALID_ID: u32 = 0xffff_ffff;
pub const VA_PICTURE_HEVC_INVALID: u32 = 0x0000_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaPictureHevc {
    pub picture_id: u32,
    pub pic_order_cnt: i32,
    pub flags: u32,
}

impl VaPictureHevc {
    pub fn invalid() -> Self {
        Self {
            picture_id: VA_INVALID_ID,
            pic_order_cnt: 0,
            flags: VA_PICTURE_HEVC_INVALID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaPicParamsHevc {
    pub curr_pic: VaPictureHevc,
    pub reference_frames: [VaPictureHevc; 15],
    pub pic_width_in_luma_samples: u32,
    pub pic_height_in_luma_samples: u32,
    // pic_fields
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub pcm_enabled_flag: bool,
    pub scaling_list_enabled_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub amp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub sign_data_hiding_enabled_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pcm_loop_filter_disabled_flag: bool,
    pub no_pic_reordering_flag: bool,
    pub sps_max_dec_pic_buffering_minus1: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_transform_block_size_minus2: u8,
    pub log2_diff_max_min_transform_block_size: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub init_qp_minus26: i8,
    pub diff_cu_qp_delta_depth: u8,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub log2_parallel_merge_level_minus2: u8,
    pub num_tile_columns_minus1: u8,
    pub num_tile_rows_minus1: u8,
    pub column_width_minus1: [u16; 19],
    pub row_height_minus1: [u16; 21],
    // slice_parsing_fields
    pub lists_modification_present_flag: bool,
    pub long_term_ref_pics_present_flag: bool,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub output_flag_present_flag: bool,
    pub dependent_slice_segments_enabled_flag: bool,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_disable_deblocking_filter_flag: bool,
    pub slice_segment_header_extension_present_flag: bool,
    pub rap_pic_flag: bool,
    pub idr_pic_flag: bool,
    pub intra_pic_flag: bool,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub num_short_term_ref_pic_sets: u8,
    pub num_long_term_ref_pic_sps: u8,
    pub num_ref_idx_l0_default_active_minus1: u8,
    pub num_ref_idx_l1_default_active_minus1: u8,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub num_extra_slice_header_bits: u8,
    pub st_rps_bits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaIqMatrixBufferHevc {
    pub scaling_list_4x4: [[u8; 16]; 6],
    pub scaling_list_8x8: [[u8; 64]; 6],
    pub scaling_list_16x16: [[u8; 64]; 6],
    pub scaling_list_32x32: [[u8; 64]; 2],
    pub scaling_list_dc_16x16: [u8; 6],
    pub scaling_list_dc_32x32: [u8; 2],
}

impl Default for VaIqMatrixBufferHevc {
    fn default() -> Self {
        Self {
            scaling_list_4x4: [[0; 16]; 6],
            scaling_list_8x8: [[0; 64]; 6],
            scaling_list_16x16: [[0; 64]; 6],
            scaling_list_32x32: [[0; 64]; 2],
            scaling_list_dc_16x16: [0; 6],
            scaling_list_dc_32x32: [0; 2],
        }
    }
}

/// Populates both VA records. Uniform tile geometry is derived per
/// _6.5.1_; explicit geometry is copied from the PPS.
pub fn fill(view: &LoweredView) -> (VaPicParamsHevc, VaIqMatrixBufferHevc) {
    let sps = view.sps;
    let pps = view.pps;
    let slice = view.slice;
    let highest_tid = view.highest_tid();
    let (_, st_rps_bits) = view.short_term_rps_hand_off();

    let mut pp = VaPicParamsHevc {
        curr_pic: VaPictureHevc::invalid(),
        reference_frames: [VaPictureHevc::invalid(); 15],
        pic_width_in_luma_samples: sps.pic_width_in_luma_samples,
        pic_height_in_luma_samples: sps.pic_height_in_luma_samples,
        chroma_format_idc: sps.chroma_format_idc,
        separate_colour_plane_flag: sps.separate_colour_plane_flag,
        pcm_enabled_flag: sps.pcm_enabled_flag,
        scaling_list_enabled_flag: sps.scaling_list_enabled_flag,
        transform_skip_enabled_flag: pps.transform_skip_enabled_flag,
        amp_enabled_flag: sps.amp_enabled_flag,
        strong_intra_smoothing_enabled_flag: sps.strong_intra_smoothing_enabled_flag,
        sign_data_hiding_enabled_flag: pps.sign_data_hiding_enabled_flag,
        constrained_intra_pred_flag: pps.constrained_intra_pred_flag,
        cu_qp_delta_enabled_flag: pps.cu_qp_delta_enabled_flag,
        weighted_pred_flag: pps.weighted_pred_flag,
        weighted_bipred_flag: pps.weighted_bipred_flag,
        transquant_bypass_enabled_flag: pps.transquant_bypass_enabled_flag,
        tiles_enabled_flag: pps.tiles_enabled_flag,
        entropy_coding_sync_enabled_flag: pps.entropy_coding_sync_enabled_flag,
        pps_loop_filter_across_slices_enabled_flag: pps
            .pps_loop_filter_across_slices_enabled_flag,
        loop_filter_across_tiles_enabled_flag: pps.loop_filter_across_tiles_enabled_flag,
        pcm_loop_filter_disabled_flag: sps.pcm_loop_filter_disabled_flag,
        no_pic_reordering_flag: view.no_pic_reordering(),
        sps_max_dec_pic_buffering_minus1: sps.sps_max_dec_pic_buffering_minus1[highest_tid] as u8,
        bit_depth_luma_minus8: sps.bit_depth_luma_minus8,
        bit_depth_chroma_minus8: sps.bit_depth_chroma_minus8,
        pcm_sample_bit_depth_luma_minus1: sps.pcm_sample_bit_depth_luma_minus1,
        pcm_sample_bit_depth_chroma_minus1: sps.pcm_sample_bit_depth_chroma_minus1,
        log2_min_luma_coding_block_size_minus3: sps.log2_min_luma_coding_block_size_minus3 as u8,
        log2_diff_max_min_luma_coding_block_size: sps.log2_diff_max_min_luma_coding_block_size
            as u8,
        log2_min_transform_block_size_minus2: sps.log2_min_luma_transform_block_size_minus2 as u8,
        log2_diff_max_min_transform_block_size: sps.log2_diff_max_min_luma_transform_block_size
            as u8,
        log2_min_pcm_luma_coding_block_size_minus3: sps.log2_min_pcm_luma_coding_block_size_minus3
            as u8,
        log2_diff_max_min_pcm_luma_coding_block_size: sps
            .log2_diff_max_min_pcm_luma_coding_block_size
            as u8,
        max_transform_hierarchy_depth_intra: sps.max_transform_hierarchy_depth_intra as u8,
        max_transform_hierarchy_depth_inter: sps.max_transform_hierarchy_depth_inter as u8,
        init_qp_minus26: pps.init_qp_minus26 as i8,
        diff_cu_qp_delta_depth: pps.diff_cu_qp_delta_depth as u8,
        pps_cb_qp_offset: pps.pps_cb_qp_offset as i8,
        pps_cr_qp_offset: pps.pps_cr_qp_offset as i8,
        log2_parallel_merge_level_minus2: pps.log2_parallel_merge_level_minus2 as u8,
        num_tile_columns_minus1: pps.num_tile_columns_minus1 as u8,
        num_tile_rows_minus1: pps.num_tile_rows_minus1 as u8,
        column_width_minus1: [0; 19],
        row_height_minus1: [0; 21],
        lists_modification_present_flag: pps.lists_modification_present_flag,
        long_term_ref_pics_present_flag: sps.long_term_ref_pics_present_flag,
        sps_temporal_mvp_enabled_flag: sps.sps_temporal_mvp_enabled_flag,
        cabac_init_present_flag: pps.cabac_init_present_flag,
        output_flag_present_flag: pps.output_flag_present_flag,
        dependent_slice_segments_enabled_flag: pps.dependent_slice_segments_enabled_flag,
        pps_slice_chroma_qp_offsets_present_flag: pps.pps_slice_chroma_qp_offsets_present_flag,
        sample_adaptive_offset_enabled_flag: sps.sample_adaptive_offset_enabled_flag,
        deblocking_filter_override_enabled_flag: pps.deblocking_filter_override_enabled_flag,
        pps_disable_deblocking_filter_flag: pps.pps_deblocking_filter_disabled_flag,
        slice_segment_header_extension_present_flag: pps
            .slice_segment_header_extension_present_flag,
        rap_pic_flag: slice.nal_unit_type.is_bla()
            || slice.nal_unit_type.is_idr()
            || slice.nal_unit_type == crate::nal::NaluType::CRA_NUT,
        idr_pic_flag: view.idr_pic(),
        intra_pic_flag: view.intra_pic(),
        log2_max_pic_order_cnt_lsb_minus4: sps.log2_max_pic_order_cnt_lsb_minus4,
        num_short_term_ref_pic_sets: sps.num_short_term_ref_pic_sets as u8,
        num_long_term_ref_pic_sps: sps.num_long_term_ref_pics_sps as u8,
        num_ref_idx_l0_default_active_minus1: pps.num_ref_idx_l0_default_active_minus1 as u8,
        num_ref_idx_l1_default_active_minus1: pps.num_ref_idx_l1_default_active_minus1 as u8,
        pps_beta_offset_div2: pps.pps_beta_offset_div2 as i8,
        pps_tc_offset_div2: pps.pps_tc_offset_div2 as i8,
        num_extra_slice_header_bits: pps.num_extra_slice_header_bits,
        st_rps_bits,
    };

    if pps.uniform_spacing_flag {
        for i in 0..=pps.num_tile_columns_minus1 {
            pp.column_width_minus1[i as usize] =
                uniform_tile_size_minus1(pps.num_tile_columns_minus1, sps.pic_width_in_ctbs_y, i)
                    as u16;
        }
        for i in 0..=pps.num_tile_rows_minus1 {
            pp.row_height_minus1[i as usize] =
                uniform_tile_size_minus1(pps.num_tile_rows_minus1, sps.pic_height_in_ctbs_y, i)
                    as u16;
        }
    } else {
        for i in 0..=pps.num_tile_columns_minus1 as usize {
            pp.column_width_minus1[i] = pps.column_width_minus1[i] as u16;
        }
        for i in 0..=pps.num_tile_rows_minus1 as usize {
            pp.row_height_minus1[i] = pps.row_height_minus1[i] as u16;
        }
    }

    let mut iq = VaIqMatrixBufferHevc::default();
    if sps.scaling_list_enabled_flag {
        let lists = view.scaling_lists();
        iq.scaling_list_4x4 = lists.scaling_list_4x4;
        iq.scaling_list_8x8 = lists.scaling_list_8x8;
        iq.scaling_list_16x16 = lists.scaling_list_16x16;
        iq.scaling_list_32x32[0] = lists.scaling_list_32x32[0];
        iq.scaling_list_32x32[1] = lists.scaling_list_32x32[3];
        iq.scaling_list_dc_16x16 = lists.scaling_list_dc_coef_16x16;
        iq.scaling_list_dc_32x32[0] = lists.scaling_list_dc_coef_32x32[0];
        iq.scaling_list_dc_32x32[1] = lists.scaling_list_dc_coef_32x32[3];
    }

    (pp, iq)
}
