//! PPS (Picture Parameter Set), per _7.3.2.3_ in the spec.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::derive;
use crate::scaling::ScalingListData;
use crate::sps::Sps;
use crate::{in_range, require, Error, Result};

pub const MAX_REF_IDX_ACTIVE: u32 = 15;
pub const MAX_NUM_TILE_COLUMNS: usize = 19;
pub const MAX_NUM_TILE_ROWS: usize = 21;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pps {
    /// From the NAL unit header.
    pub temporal_id: u8,
    pub pps_pic_parameter_set_id: u32,
    pub pps_seq_parameter_set_id: u32,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub init_qp_minus26: i32,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u32,
    pub pps_cb_qp_offset: i32,
    pub pps_cr_qp_offset: i32,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub num_tile_columns_minus1: u32,
    pub num_tile_rows_minus1: u32,
    pub uniform_spacing_flag: bool,
    pub column_width_minus1: [u32; MAX_NUM_TILE_COLUMNS],
    pub row_height_minus1: [u32; MAX_NUM_TILE_ROWS],
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking_filter_control_present_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_deblocking_filter_disabled_flag: bool,
    pub pps_beta_offset_div2: i32,
    pub pps_tc_offset_div2: i32,
    pub pps_scaling_list_data_present_flag: bool,
    pub scaling_list_data: ScalingListData,
    pub lists_modification_present_flag: bool,
    pub log2_parallel_merge_level_minus2: u32,
    pub slice_segment_header_extension_present_flag: bool,
    pub pps_extension_present_flag: bool,
    pub pps_range_extension_flag: bool,
    pub pps_multilayer_extension_flag: bool,
    pub pps_3d_extension_flag: bool,
    pub pps_scc_extension_flag: bool,
    pub log2_max_transform_skip_block_size_minus2: u32,
    pub cross_component_prediction_enabled_flag: bool,
    pub chroma_qp_offset_list_enabled_flag: bool,
    pub diff_cu_chroma_qp_offset_depth: u32,
    pub chroma_qp_offset_list_len_minus1: u32,
    pub cb_qp_offset_list: [i32; 6],
    pub cr_qp_offset_list: [i32; 6],
    pub log2_sao_offset_scale_luma: u32,
    pub log2_sao_offset_scale_chroma: u32,

    /// `6 * bit_depth_luma_minus8`, derived.
    pub qp_bd_offset_y: i32,
}

impl Default for Pps {
    fn default() -> Self {
        Self {
            temporal_id: 0,
            pps_pic_parameter_set_id: 0,
            pps_seq_parameter_set_id: 0,
            dependent_slice_segments_enabled_flag: false,
            output_flag_present_flag: false,
            num_extra_slice_header_bits: 0,
            sign_data_hiding_enabled_flag: false,
            cabac_init_present_flag: false,
            num_ref_idx_l0_default_active_minus1: 0,
            num_ref_idx_l1_default_active_minus1: 0,
            init_qp_minus26: 0,
            constrained_intra_pred_flag: false,
            transform_skip_enabled_flag: false,
            cu_qp_delta_enabled_flag: false,
            diff_cu_qp_delta_depth: 0,
            pps_cb_qp_offset: 0,
            pps_cr_qp_offset: 0,
            pps_slice_chroma_qp_offsets_present_flag: false,
            weighted_pred_flag: false,
            weighted_bipred_flag: false,
            transquant_bypass_enabled_flag: false,
            tiles_enabled_flag: false,
            entropy_coding_sync_enabled_flag: false,
            num_tile_columns_minus1: 0,
            num_tile_rows_minus1: 0,
            uniform_spacing_flag: false,
            column_width_minus1: [0; MAX_NUM_TILE_COLUMNS],
            row_height_minus1: [0; MAX_NUM_TILE_ROWS],
            loop_filter_across_tiles_enabled_flag: true,
            pps_loop_filter_across_slices_enabled_flag: false,
            deblocking_filter_control_present_flag: false,
            deblocking_filter_override_enabled_flag: false,
            pps_deblocking_filter_disabled_flag: false,
            pps_beta_offset_div2: 0,
            pps_tc_offset_div2: 0,
            pps_scaling_list_data_present_flag: false,
            scaling_list_data: ScalingListData::default(),
            lists_modification_present_flag: false,
            log2_parallel_merge_level_minus2: 0,
            slice_segment_header_extension_present_flag: false,
            pps_extension_present_flag: false,
            pps_range_extension_flag: false,
            pps_multilayer_extension_flag: false,
            pps_3d_extension_flag: false,
            pps_scc_extension_flag: false,
            log2_max_transform_skip_block_size_minus2: 0,
            cross_component_prediction_enabled_flag: false,
            chroma_qp_offset_list_enabled_flag: false,
            diff_cu_chroma_qp_offset_depth: 0,
            chroma_qp_offset_list_len_minus1: 0,
            cb_qp_offset_list: [0; 6],
            cr_qp_offset_list: [0; 6],
            log2_sao_offset_scale_luma: 0,
            log2_sao_offset_scale_chroma: 0,
            qp_bd_offset_y: 0,
        }
    }
}

impl Pps {
    /// The SPS the PPS refers to is resolved mid-parse; a dangling
    /// `pps_seq_parameter_set_id` is `MissingParameterSet`.
    pub fn parse<'s>(
        r: &mut BitReader,
        nuh_temporal_id_plus1: u8,
        get_sps: impl FnOnce(u8) -> Option<&'s Sps>,
    ) -> Result<Pps> {
        let mut pps = Pps::default();
        pps.temporal_id = nuh_temporal_id_plus1.saturating_sub(1);

        pps.pps_pic_parameter_set_id = r.read_ue()?;
        in_range("pps_pic_parameter_set_id", pps.pps_pic_parameter_set_id, 0, 63)?;
        pps.pps_seq_parameter_set_id = r.read_ue()?;
        in_range("pps_seq_parameter_set_id", pps.pps_seq_parameter_set_id, 0, 15)?;
        let sps = get_sps(pps.pps_seq_parameter_set_id as u8).ok_or_else(|| {
            tracing::debug!("pps {} refers to unseen sps {}", pps.pps_pic_parameter_set_id, pps.pps_seq_parameter_set_id);
            Error::MissingParameterSet("pps_seq_parameter_set_id")
        })?;

        pps.dependent_slice_segments_enabled_flag = r.read_bool()?;
        pps.output_flag_present_flag = r.read_bool()?;
        pps.num_extra_slice_header_bits = r.read_bits(3)? as u8;
        pps.sign_data_hiding_enabled_flag = r.read_bool()?;
        pps.cabac_init_present_flag = r.read_bool()?;
        pps.num_ref_idx_l0_default_active_minus1 = r.read_ue()?;
        in_range(
            "num_ref_idx_l0_default_active_minus1",
            pps.num_ref_idx_l0_default_active_minus1,
            0,
            MAX_REF_IDX_ACTIVE - 1,
        )?;
        pps.num_ref_idx_l1_default_active_minus1 = r.read_ue()?;
        in_range(
            "num_ref_idx_l1_default_active_minus1",
            pps.num_ref_idx_l1_default_active_minus1,
            0,
            MAX_REF_IDX_ACTIVE - 1,
        )?;
        pps.init_qp_minus26 = r.read_se()?;
        pps.qp_bd_offset_y = derive::qp_bd_offset_y(sps.bit_depth_luma_minus8);
        in_range(
            "init_qp_minus26",
            pps.init_qp_minus26,
            -(26 + pps.qp_bd_offset_y),
            25,
        )?;
        pps.constrained_intra_pred_flag = r.read_bool()?;
        pps.transform_skip_enabled_flag = r.read_bool()?;
        pps.cu_qp_delta_enabled_flag = r.read_bool()?;
        if pps.cu_qp_delta_enabled_flag {
            pps.diff_cu_qp_delta_depth = r.read_ue()?;
            in_range(
                "diff_cu_qp_delta_depth",
                pps.diff_cu_qp_delta_depth,
                0,
                sps.log2_diff_max_min_luma_coding_block_size,
            )?;
        }
        pps.pps_cb_qp_offset = r.read_se()?;
        in_range("pps_cb_qp_offset", pps.pps_cb_qp_offset, -12, 12)?;
        pps.pps_cr_qp_offset = r.read_se()?;
        in_range("pps_cr_qp_offset", pps.pps_cr_qp_offset, -12, 12)?;
        pps.pps_slice_chroma_qp_offsets_present_flag = r.read_bool()?;
        pps.weighted_pred_flag = r.read_bool()?;
        pps.weighted_bipred_flag = r.read_bool()?;
        pps.transquant_bypass_enabled_flag = r.read_bool()?;
        pps.tiles_enabled_flag = r.read_bool()?;
        pps.entropy_coding_sync_enabled_flag = r.read_bool()?;
        if pps.tiles_enabled_flag {
            pps.num_tile_columns_minus1 = r.read_ue()?;
            in_range(
                "num_tile_columns_minus1",
                pps.num_tile_columns_minus1,
                0,
                sps.pic_width_in_ctbs_y - 1,
            )?;
            require(
                "num_tile_columns_minus1",
                pps.num_tile_columns_minus1 < MAX_NUM_TILE_COLUMNS as u32,
            )?;
            pps.num_tile_rows_minus1 = r.read_ue()?;
            in_range(
                "num_tile_rows_minus1",
                pps.num_tile_rows_minus1,
                0,
                sps.pic_height_in_ctbs_y - 1,
            )?;
            require(
                "num_tile_rows_minus1",
                pps.num_tile_columns_minus1 != 0 || pps.num_tile_rows_minus1 != 0,
            )?;
            require(
                "num_tile_rows_minus1",
                pps.num_tile_rows_minus1 < MAX_NUM_TILE_ROWS as u32,
            )?;
            pps.uniform_spacing_flag = r.read_bool()?;
            if !pps.uniform_spacing_flag {
                let cols = pps.num_tile_columns_minus1 as usize;
                pps.column_width_minus1[cols] = sps.pic_width_in_ctbs_y - 1;
                for i in 0..cols {
                    pps.column_width_minus1[i] = r.read_ue()?;
                    in_range(
                        "column_width_minus1",
                        i64::from(pps.column_width_minus1[i]),
                        0,
                        i64::from(pps.column_width_minus1[cols]) - 1,
                    )?;
                    pps.column_width_minus1[cols] -= pps.column_width_minus1[i] + 1;
                }
                let rows = pps.num_tile_rows_minus1 as usize;
                pps.row_height_minus1[rows] = sps.pic_height_in_ctbs_y - 1;
                for i in 0..rows {
                    pps.row_height_minus1[i] = r.read_ue()?;
                    in_range(
                        "row_height_minus1",
                        i64::from(pps.row_height_minus1[i]),
                        0,
                        i64::from(pps.row_height_minus1[rows]) - 1,
                    )?;
                    pps.row_height_minus1[rows] -= pps.row_height_minus1[i] + 1;
                }
            }
            pps.loop_filter_across_tiles_enabled_flag = r.read_bool()?;
        }
        pps.pps_loop_filter_across_slices_enabled_flag = r.read_bool()?;
        pps.deblocking_filter_control_present_flag = r.read_bool()?;
        if pps.deblocking_filter_control_present_flag {
            pps.deblocking_filter_override_enabled_flag = r.read_bool()?;
            pps.pps_deblocking_filter_disabled_flag = r.read_bool()?;
            if !pps.pps_deblocking_filter_disabled_flag {
                pps.pps_beta_offset_div2 = r.read_se()?;
                in_range("pps_beta_offset_div2", pps.pps_beta_offset_div2, -6, 6)?;
                pps.pps_tc_offset_div2 = r.read_se()?;
                in_range("pps_tc_offset_div2", pps.pps_tc_offset_div2, -6, 6)?;
            }
        }
        pps.pps_scaling_list_data_present_flag = r.read_bool()?;
        if pps.pps_scaling_list_data_present_flag {
            pps.scaling_list_data = ScalingListData::parse(r)?;
        }
        pps.lists_modification_present_flag = r.read_bool()?;
        pps.log2_parallel_merge_level_minus2 = r.read_ue()?;
        in_range(
            "log2_parallel_merge_level_minus2",
            pps.log2_parallel_merge_level_minus2,
            0,
            sps.ctb_log2_size_y - 2,
        )?;
        pps.slice_segment_header_extension_present_flag = r.read_bool()?;
        pps.pps_extension_present_flag = r.read_bool()?;
        if pps.pps_extension_present_flag {
            pps.pps_range_extension_flag = r.read_bool()?;
            pps.pps_multilayer_extension_flag = r.read_bool()?;
            pps.pps_3d_extension_flag = r.read_bool()?;
            pps.pps_scc_extension_flag = r.read_bool()?;
            r.skip_bits(4)?; // pps_extension_4bits
        }
        if pps.pps_range_extension_flag {
            if pps.transform_skip_enabled_flag {
                pps.log2_max_transform_skip_block_size_minus2 = r.read_ue()?;
                in_range(
                    "log2_max_transform_skip_block_size_minus2",
                    pps.log2_max_transform_skip_block_size_minus2,
                    0,
                    3,
                )?;
            }
            pps.cross_component_prediction_enabled_flag = r.read_bool()?;
            pps.chroma_qp_offset_list_enabled_flag = r.read_bool()?;
            if pps.chroma_qp_offset_list_enabled_flag {
                pps.diff_cu_chroma_qp_offset_depth = r.read_ue()?;
                in_range(
                    "diff_cu_chroma_qp_offset_depth",
                    pps.diff_cu_chroma_qp_offset_depth,
                    0,
                    sps.log2_diff_max_min_luma_coding_block_size,
                )?;
                pps.chroma_qp_offset_list_len_minus1 = r.read_ue()?;
                in_range(
                    "chroma_qp_offset_list_len_minus1",
                    pps.chroma_qp_offset_list_len_minus1,
                    0,
                    5,
                )?;
                for i in 0..=pps.chroma_qp_offset_list_len_minus1 as usize {
                    pps.cb_qp_offset_list[i] = r.read_se()?;
                    in_range("cb_qp_offset_list", pps.cb_qp_offset_list[i], -12, 12)?;
                    pps.cr_qp_offset_list[i] = r.read_se()?;
                    in_range("cr_qp_offset_list", pps.cr_qp_offset_list[i], -12, 12)?;
                }
            }
            pps.log2_sao_offset_scale_luma = r.read_ue()?;
            in_range(
                "log2_sao_offset_scale_luma",
                pps.log2_sao_offset_scale_luma,
                0,
                u32::from(sps.bit_depth_luma_minus8.saturating_sub(2)),
            )?;
            pps.log2_sao_offset_scale_chroma = r.read_ue()?;
            in_range(
                "log2_sao_offset_scale_chroma",
                pps.log2_sao_offset_scale_chroma,
                0,
                u32::from(sps.bit_depth_chroma_minus8.saturating_sub(2)),
            )?;
        }
        if pps.pps_multilayer_extension_flag {
            tracing::debug!("HEVC multilayer extension not supported");
            return Err(Error::UnsupportedStream("pps_multilayer_extension_flag"));
        }
        if pps.pps_3d_extension_flag {
            tracing::debug!("HEVC 3D extension not supported");
            return Err(Error::UnsupportedStream("pps_3d_extension_flag"));
        }
        if pps.pps_scc_extension_flag {
            tracing::debug!("HEVC SCC extension not supported");
            return Err(Error::UnsupportedStream("pps_scc_extension_flag"));
        }

        Ok(pps)
    }

    pub fn write_rbsp(&self, w: &mut RbspWriter) -> io::Result<()> {
        w.put_ue(self.pps_pic_parameter_set_id)?;
        w.put_ue(self.pps_seq_parameter_set_id)?;
        w.put_flag(self.dependent_slice_segments_enabled_flag)?;
        w.put_flag(self.output_flag_present_flag)?;
        w.put_u(u32::from(self.num_extra_slice_header_bits), 3)?;
        w.put_flag(self.sign_data_hiding_enabled_flag)?;
        w.put_flag(self.cabac_init_present_flag)?;
        w.put_ue(self.num_ref_idx_l0_default_active_minus1)?;
        w.put_ue(self.num_ref_idx_l1_default_active_minus1)?;
        w.put_se(self.init_qp_minus26)?;
        w.put_flag(self.constrained_intra_pred_flag)?;
        w.put_flag(self.transform_skip_enabled_flag)?;
        w.put_flag(self.cu_qp_delta_enabled_flag)?;
        if self.cu_qp_delta_enabled_flag {
            w.put_ue(self.diff_cu_qp_delta_depth)?;
        }
        w.put_se(self.pps_cb_qp_offset)?;
        w.put_se(self.pps_cr_qp_offset)?;
        w.put_flag(self.pps_slice_chroma_qp_offsets_present_flag)?;
        w.put_flag(self.weighted_pred_flag)?;
        w.put_flag(self.weighted_bipred_flag)?;
        w.put_flag(self.transquant_bypass_enabled_flag)?;
        w.put_flag(self.tiles_enabled_flag)?;
        w.put_flag(self.entropy_coding_sync_enabled_flag)?;
        if self.tiles_enabled_flag {
            w.put_ue(self.num_tile_columns_minus1)?;
            w.put_ue(self.num_tile_rows_minus1)?;
            w.put_flag(self.uniform_spacing_flag)?;
            if !self.uniform_spacing_flag {
                for i in 0..self.num_tile_columns_minus1 as usize {
                    w.put_ue(self.column_width_minus1[i])?;
                }
                for i in 0..self.num_tile_rows_minus1 as usize {
                    w.put_ue(self.row_height_minus1[i])?;
                }
            }
            w.put_flag(self.loop_filter_across_tiles_enabled_flag)?;
        }
        w.put_flag(self.pps_loop_filter_across_slices_enabled_flag)?;
        w.put_flag(self.deblocking_filter_control_present_flag)?;
        if self.deblocking_filter_control_present_flag {
            w.put_flag(self.deblocking_filter_override_enabled_flag)?;
            w.put_flag(self.pps_deblocking_filter_disabled_flag)?;
            if !self.pps_deblocking_filter_disabled_flag {
                w.put_se(self.pps_beta_offset_div2)?;
                w.put_se(self.pps_tc_offset_div2)?;
            }
        }
        w.put_flag(self.pps_scaling_list_data_present_flag)?;
        if self.pps_scaling_list_data_present_flag {
            self.scaling_list_data.write(w)?;
        }
        w.put_flag(self.lists_modification_present_flag)?;
        w.put_ue(self.log2_parallel_merge_level_minus2)?;
        w.put_flag(self.slice_segment_header_extension_present_flag)?;
        w.put_flag(self.pps_extension_present_flag)?;
        if self.pps_extension_present_flag {
            w.put_flag(self.pps_range_extension_flag)?;
            w.put_flag(self.pps_multilayer_extension_flag)?;
            w.put_flag(self.pps_3d_extension_flag)?;
            w.put_flag(self.pps_scc_extension_flag)?;
            w.put_u(0, 4)?; // pps_extension_4bits
        }
        if self.pps_range_extension_flag {
            if self.transform_skip_enabled_flag {
                w.put_ue(self.log2_max_transform_skip_block_size_minus2)?;
            }
            w.put_flag(self.cross_component_prediction_enabled_flag)?;
            w.put_flag(self.chroma_qp_offset_list_enabled_flag)?;
            if self.chroma_qp_offset_list_enabled_flag {
                w.put_ue(self.diff_cu_chroma_qp_offset_depth)?;
                w.put_ue(self.chroma_qp_offset_list_len_minus1)?;
                for i in 0..=self.chroma_qp_offset_list_len_minus1 as usize {
                    w.put_se(self.cb_qp_offset_list[i])?;
                    w.put_se(self.cr_qp_offset_list[i])?;
                }
            }
            w.put_ue(self.log2_sao_offset_scale_luma)?;
            w.put_ue(self.log2_sao_offset_scale_chroma)?;
        }
        w.rbsp_trailing_bits()
    }

    /// Serializes the PPS as a complete Annex-B NAL unit.
    pub fn to_nal(&self) -> io::Result<Vec<u8>> {
        let mut w = RbspWriter::new();
        self.write_rbsp(&mut w)?;
        Ok(crate::bitwriter::build_nal(
            crate::nal::NaluType::PPS_NUT,
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
        sps.profile_tier_level.general_profile_idc = PROFILE_IDC_MAIN;
        sps.profile_tier_level.general_level_idc = 120;
        sps.chroma_format_idc = 1;
        sps.pic_width_in_luma_samples = 1920;
        sps.pic_height_in_luma_samples = 1088;
        sps.log2_max_pic_order_cnt_lsb_minus4 = 4;
        sps.sps_max_dec_pic_buffering_minus1[0] = 5;
        sps.log2_diff_max_min_luma_coding_block_size = 3;
        sps.finalize().unwrap();
        sps
    }

    fn write_then_parse(pps: &Pps, sps: &Sps) -> Result<Pps> {
        let mut w = RbspWriter::new();
        pps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        Pps::parse(&mut r, 1, |_| Some(sps))
    }

    fn test_pps() -> Pps {
        let mut pps = Pps::default();
        pps.cabac_init_present_flag = true;
        pps.init_qp_minus26 = 0;
        pps.deblocking_filter_control_present_flag = true;
        pps.pps_beta_offset_div2 = 2;
        pps.pps_loop_filter_across_slices_enabled_flag = true;
        pps
    }

    #[test]
    fn round_trip() {
        let sps = test_sps();
        let pps = test_pps();
        assert_eq!(write_then_parse(&pps, &sps).unwrap(), pps);
    }

    #[test]
    fn round_trip_with_explicit_tiles() {
        let sps = test_sps();
        let mut pps = test_pps();
        pps.tiles_enabled_flag = true;
        pps.num_tile_columns_minus1 = 2;
        pps.num_tile_rows_minus1 = 1;
        // 30 CTB columns split 10 + 8 + 12, 17 rows split 9 + 8.
        pps.column_width_minus1[0] = 9;
        pps.column_width_minus1[1] = 7;
        pps.column_width_minus1[2] = 11;
        pps.row_height_minus1[0] = 8;
        pps.row_height_minus1[1] = 7;
        pps.loop_filter_across_tiles_enabled_flag = false;
        assert_eq!(write_then_parse(&pps, &sps).unwrap(), pps);
    }

    #[test]
    fn missing_sps_reported() {
        let pps = test_pps();
        let mut w = RbspWriter::new();
        pps.write_rbsp(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(
            Pps::parse(&mut r, 1, |_| None),
            Err(Error::MissingParameterSet("pps_seq_parameter_set_id"))
        );
    }

    #[test]
    fn qp_range_depends_on_bit_depth() {
        let sps = test_sps();
        let mut pps = test_pps();
        pps.init_qp_minus26 = -27;
        assert_eq!(
            write_then_parse(&pps, &sps),
            Err(Error::InvalidStream("init_qp_minus26"))
        );

        let mut sps10 = test_sps();
        sps10.bit_depth_luma_minus8 = 2;
        sps10.bit_depth_chroma_minus8 = 2;
        sps10.finalize().unwrap();
        let parsed = write_then_parse(&pps, &sps10).unwrap();
        assert_eq!(parsed.qp_bd_offset_y, 12);
    }

    #[test]
    fn multilayer_extension_rejected() {
        let sps = test_sps();
        let mut pps = test_pps();
        pps.pps_extension_present_flag = true;
        pps.pps_multilayer_extension_flag = true;
        assert_eq!(
            write_then_parse(&pps, &sps),
            Err(Error::UnsupportedStream("pps_multilayer_extension_flag"))
        );
    }
}
