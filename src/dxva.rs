//! DXVA descriptor adapter: projects a [`LoweredView`] into the
//! picture-parameter and quantization-matrix records the D3D video
//! decoder consumes. Field names track `DXVA_PicParams_HEVC` and
//! `DXVA_Qmatrix_HEVC`; the driver shim owns the bit-exact packing.

use crate::lower::LoweredView;

/// 7-bit picture index plus the associated flag. `0xff` means absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicEntry(pub u8);

impl PicEntry {
    pub const ABSENT: PicEntry = PicEntry(0xff);

    pub fn new(index: u8, associated_flag: bool) -> Self {
        PicEntry((index & 0x7f) | (u8::from(associated_flag) << 7))
    }

    pub fn index7(self) -> u8 {
        self.0 & 0x7f
    }

    pub fn associated_flag(self) -> bool {
        self.0 >> 7 != 0
    }
}

impl Default for PicEntry {
    fn default() -> Self {
        PicEntry::ABSENT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxvaPicParamsHevc {
    pub pic_width_in_min_cbs_y: u16,
    pub pic_height_in_min_cbs_y: u16,
    // wFormatAndSequenceInfoFlags
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub no_pic_reordering_flag: bool,
    pub no_bi_pred_flag: bool,
    pub curr_pic: PicEntry,
    pub sps_max_dec_pic_buffering_minus1: u8,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_transform_block_size_minus2: u8,
    pub log2_diff_max_min_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub num_short_term_ref_pic_sets: u8,
    pub num_long_term_ref_pics_sps: u8,
    pub num_ref_idx_l0_default_active_minus1: u8,
    pub num_ref_idx_l1_default_active_minus1: u8,
    pub init_qp_minus26: i8,
    pub num_delta_pocs_of_ref_rps_idx: u8,
    pub num_bits_for_short_term_rps_in_slice: u16,
    // dwCodingParamToolFlags
    pub scaling_list_enabled_flag: bool,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub pcm_loop_filter_disabled_flag: bool,
    pub long_term_ref_pics_present_flag: bool,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    // dwCodingSettingPicturePropertyFlags
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub uniform_spacing_flag: bool,
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub lists_modification_present_flag: bool,
    pub slice_segment_header_extension_present_flag: bool,
    pub irap_pic_flag: bool,
    pub idr_pic_flag: bool,
    pub intra_pic_flag: bool,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub num_tile_columns_minus1: u8,
    pub num_tile_rows_minus1: u8,
    pub column_width_minus1: [u16; 19],
    pub row_height_minus1: [u16; 21],
    pub diff_cu_qp_delta_depth: u8,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub log2_parallel_merge_level_minus2: u8,
    pub curr_pic_order_cnt_val: i32,
    pub ref_pic_list: [PicEntry; 15],
    pub pic_order_cnt_val_list: [i32; 15],
    pub ref_pic_set_st_curr_before: [u8; 8],
    pub ref_pic_set_st_curr_after: [u8; 8],
    pub ref_pic_set_lt_curr: [u8; 8],
    pub status_report_feedback_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxvaQmatrixHevc {
    pub scaling_lists0: [[u8; 16]; 6],
    pub scaling_lists1: [[u8; 64]; 6],
    pub scaling_lists2: [[u8; 64]; 6],
    pub scaling_lists3: [[u8; 64]; 2],
    pub scaling_list_dc_coef_size_id2: [u8; 6],
    pub scaling_list_dc_coef_size_id3: [u8; 2],
}

impl Default for DxvaQmatrixHevc {
    fn default() -> Self {
        Self {
            scaling_lists0: [[0; 16]; 6],
            scaling_lists1: [[0; 64]; 6],
            scaling_lists2: [[0; 64]; 6],
            scaling_lists3: [[0; 64]; 2],
            scaling_list_dc_coef_size_id2: [0; 6],
            scaling_list_dc_coef_size_id3: [0; 2],
        }
    }
}

/// DXVA short-format slice control. The NAL unit always sits at the
/// front of its bitstream buffer, start code included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceControl {
    pub bs_nal_unit_data_location: u32,
    pub slice_bytes_in_buffer: u32,
}

impl SliceControl {
    pub fn for_nalu(start_code_len: usize, nalu_len: usize) -> Self {
        Self {
            bs_nal_unit_data_location: 0,
            slice_bytes_in_buffer: (start_code_len + nalu_len) as u32,
        }
    }
}

/// Populates both DXVA records from the lowered view. Reference list
/// slots stay at the absent marker; the DPB manager fills them.
pub fn fill(view: &LoweredView) -> (DxvaPicParamsHevc, DxvaQmatrixHevc) {
    let sps = view.sps;
    let pps = view.pps;
    let highest_tid = view.highest_tid();
    let pic_order_cnt = view.curr_pic_order_cnt();
    let (num_delta_pocs_of_ref_rps_idx, st_rps_bits) = view.short_term_rps_hand_off();

    let mut pp = DxvaPicParamsHevc {
        pic_width_in_min_cbs_y: view.pic_width_in_min_cbs_y() as u16,
        pic_height_in_min_cbs_y: view.pic_height_in_min_cbs_y() as u16,
        chroma_format_idc: sps.chroma_format_idc,
        separate_colour_plane_flag: sps.separate_colour_plane_flag,
        bit_depth_luma_minus8: sps.bit_depth_luma_minus8,
        bit_depth_chroma_minus8: sps.bit_depth_chroma_minus8,
        log2_max_pic_order_cnt_lsb_minus4: sps.log2_max_pic_order_cnt_lsb_minus4,
        no_pic_reordering_flag: view.no_pic_reordering(),
        no_bi_pred_flag: false,
        curr_pic: PicEntry::new(pic_order_cnt as u8, false),
        sps_max_dec_pic_buffering_minus1: sps.sps_max_dec_pic_buffering_minus1[highest_tid] as u8,
        log2_min_luma_coding_block_size_minus3: sps.log2_min_luma_coding_block_size_minus3 as u8,
        log2_diff_max_min_luma_coding_block_size: sps.log2_diff_max_min_luma_coding_block_size
            as u8,
        log2_min_transform_block_size_minus2: sps.log2_min_luma_transform_block_size_minus2 as u8,
        log2_diff_max_min_transform_block_size: sps.log2_diff_max_min_luma_transform_block_size
            as u8,
        max_transform_hierarchy_depth_inter: sps.max_transform_hierarchy_depth_inter as u8,
        max_transform_hierarchy_depth_intra: sps.max_transform_hierarchy_depth_intra as u8,
        num_short_term_ref_pic_sets: sps.num_short_term_ref_pic_sets as u8,
        num_long_term_ref_pics_sps: sps.num_long_term_ref_pics_sps as u8,
        num_ref_idx_l0_default_active_minus1: pps.num_ref_idx_l0_default_active_minus1 as u8,
        num_ref_idx_l1_default_active_minus1: pps.num_ref_idx_l1_default_active_minus1 as u8,
        init_qp_minus26: pps.init_qp_minus26 as i8,
        num_delta_pocs_of_ref_rps_idx: num_delta_pocs_of_ref_rps_idx as u8,
        num_bits_for_short_term_rps_in_slice: st_rps_bits as u16,
        scaling_list_enabled_flag: sps.scaling_list_enabled_flag,
        amp_enabled_flag: sps.amp_enabled_flag,
        sample_adaptive_offset_enabled_flag: sps.sample_adaptive_offset_enabled_flag,
        pcm_enabled_flag: sps.pcm_enabled_flag,
        pcm_sample_bit_depth_luma_minus1: 0,
        pcm_sample_bit_depth_chroma_minus1: 0,
        log2_min_pcm_luma_coding_block_size_minus3: 0,
        log2_diff_max_min_pcm_luma_coding_block_size: 0,
        pcm_loop_filter_disabled_flag: false,
        long_term_ref_pics_present_flag: sps.long_term_ref_pics_present_flag,
        sps_temporal_mvp_enabled_flag: sps.sps_temporal_mvp_enabled_flag,
        strong_intra_smoothing_enabled_flag: sps.strong_intra_smoothing_enabled_flag,
        dependent_slice_segments_enabled_flag: pps.dependent_slice_segments_enabled_flag,
        output_flag_present_flag: pps.output_flag_present_flag,
        num_extra_slice_header_bits: pps.num_extra_slice_header_bits,
        sign_data_hiding_enabled_flag: pps.sign_data_hiding_enabled_flag,
        cabac_init_present_flag: pps.cabac_init_present_flag,
        constrained_intra_pred_flag: pps.constrained_intra_pred_flag,
        transform_skip_enabled_flag: pps.transform_skip_enabled_flag,
        cu_qp_delta_enabled_flag: pps.cu_qp_delta_enabled_flag,
        pps_slice_chroma_qp_offsets_present_flag: pps.pps_slice_chroma_qp_offsets_present_flag,
        weighted_pred_flag: pps.weighted_pred_flag,
        weighted_bipred_flag: pps.weighted_bipred_flag,
        transquant_bypass_enabled_flag: pps.transquant_bypass_enabled_flag,
        tiles_enabled_flag: pps.tiles_enabled_flag,
        entropy_coding_sync_enabled_flag: pps.entropy_coding_sync_enabled_flag,
        uniform_spacing_flag: pps.uniform_spacing_flag,
        loop_filter_across_tiles_enabled_flag: false,
        pps_loop_filter_across_slices_enabled_flag: pps
            .pps_loop_filter_across_slices_enabled_flag,
        deblocking_filter_override_enabled_flag: pps.deblocking_filter_override_enabled_flag,
        pps_deblocking_filter_disabled_flag: pps.pps_deblocking_filter_disabled_flag,
        lists_modification_present_flag: pps.lists_modification_present_flag,
        slice_segment_header_extension_present_flag: pps
            .slice_segment_header_extension_present_flag,
        irap_pic_flag: view.irap_pic(),
        idr_pic_flag: view.idr_pic(),
        intra_pic_flag: view.intra_pic(),
        pps_cb_qp_offset: pps.pps_cb_qp_offset as i8,
        pps_cr_qp_offset: pps.pps_cr_qp_offset as i8,
        num_tile_columns_minus1: pps.num_tile_columns_minus1 as u8,
        num_tile_rows_minus1: pps.num_tile_rows_minus1 as u8,
        column_width_minus1: [0; 19],
        row_height_minus1: [0; 21],
        diff_cu_qp_delta_depth: pps.diff_cu_qp_delta_depth as u8,
        pps_beta_offset_div2: pps.pps_beta_offset_div2 as i8,
        pps_tc_offset_div2: pps.pps_tc_offset_div2 as i8,
        log2_parallel_merge_level_minus2: pps.log2_parallel_merge_level_minus2 as u8,
        curr_pic_order_cnt_val: pic_order_cnt,
        ref_pic_list: [PicEntry::ABSENT; 15],
        pic_order_cnt_val_list: [0; 15],
        ref_pic_set_st_curr_before: [0xff; 8],
        ref_pic_set_st_curr_after: [0xff; 8],
        ref_pic_set_lt_curr: [0xff; 8],
        status_report_feedback_number: 1,
    };

    if sps.pcm_enabled_flag {
        pp.pcm_sample_bit_depth_luma_minus1 = sps.pcm_sample_bit_depth_luma_minus1;
        pp.pcm_sample_bit_depth_chroma_minus1 = sps.pcm_sample_bit_depth_chroma_minus1;
        pp.log2_min_pcm_luma_coding_block_size_minus3 =
            sps.log2_min_pcm_luma_coding_block_size_minus3 as u8;
        pp.log2_diff_max_min_pcm_luma_coding_block_size =
            sps.log2_diff_max_min_pcm_luma_coding_block_size as u8;
        pp.pcm_loop_filter_disabled_flag = sps.pcm_loop_filter_disabled_flag;
    }
    if pps.tiles_enabled_flag {
        pp.loop_filter_across_tiles_enabled_flag = pps.loop_filter_across_tiles_enabled_flag;
        if !pps.uniform_spacing_flag {
            for i in 0..=pps.num_tile_columns_minus1 as usize {
                pp.column_width_minus1[i] = pps.column_width_minus1[i] as u16;
            }
            for i in 0..=pps.num_tile_rows_minus1 as usize {
                pp.row_height_minus1[i] = pps.row_height_minus1[i] as u16;
            }
        }
    }
    pp.pic_order_cnt_val_list[0] = pic_order_cnt;

    let mut qm = DxvaQmatrixHevc::default();
    if sps.scaling_list_enabled_flag {
        let lists = view.scaling_lists();
        qm.scaling_lists0 = lists.scaling_list_4x4;
        qm.scaling_lists1 = lists.scaling_list_8x8;
        qm.scaling_lists2 = lists.scaling_list_16x16;
        qm.scaling_lists3[0] = lists.scaling_list_32x32[0];
        qm.scaling_lists3[1] = lists.scaling_list_32x32[3];
        qm.scaling_list_dc_coef_size_id2 = lists.scaling_list_dc_coef_16x16;
        qm.scaling_list_dc_coef_size_id3[0] = lists.scaling_list_dc_coef_32x32[0];
        qm.scaling_list_dc_coef_size_id3[1] = lists.scaling_list_dc_coef_32x32[3];
    }

    (pp, qm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pic_entry_packing() {
        let entry = PicEntry::new(0x55, true);
        assert_eq!(entry.index7(), 0x55);
        assert!(entry.associated_flag());
        assert_eq!(PicEntry::ABSENT.0, 0xff);
        assert_eq!(PicEntry::default(), PicEntry::ABSENT);
    }

    #[test]
    fn slice_control_lengths() {
        let sc = SliceControl::for_nalu(3, 120);
        assert_eq!(sc.bs_nal_unit_data_location, 0);
        assert_eq!(sc.slice_bytes_in_buffer, 123);
    }
}
