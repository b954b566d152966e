//! Slice segment header, per _7.3.6_ / _7.4.7_ in the spec.
//!
//! The header is represented as leading fields plus a [`SliceSegmentBody`]
//! holding everything from `slice_type` onward. A dependent slice segment
//! copies the body of the prior slice of the same picture as one value
//! assignment, then only the fields a dependent slice legitimately
//! re-codes are parsed.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::derive::log2_ceiling;
use crate::nal::{NaluHeader, NaluType};
use crate::pps::{Pps, MAX_REF_IDX_ACTIVE};
use crate::rps::ShortTermRefPicSet;
use crate::sps::Sps;
use crate::{in_range, require, Error, Result};

pub const MAX_LONG_TERM_REF_PICS: usize = 32;
const MAX_REF_IDX: usize = MAX_REF_IDX_ACTIVE as usize;

/// `slice_type` values: B = 0, P = 1, I = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SliceType {
    B = 0,
    P = 1,
    I = 2,
}

impl Default for SliceType {
    fn default() -> Self {
        SliceType::I
    }
}

impl TryFrom<u32> for SliceType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(SliceType::B),
            1 => Ok(SliceType::P),
            2 => Ok(SliceType::I),
            _ => {
                tracing::debug!("slice_type out of range: {}", value);
                Err(Error::InvalidStream("slice_type"))
            }
        }
    }
}

impl SliceType {
    pub fn is_i(self) -> bool {
        self == SliceType::I
    }
    pub fn is_p(self) -> bool {
        self == SliceType::P
    }
    pub fn is_b(self) -> bool {
        self == SliceType::B
    }
}

/// Weighted prediction parameters, per _7.4.6.3_.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredWeightTable {
    pub luma_log2_weight_denom: u32,
    pub delta_chroma_log2_weight_denom: i32,
    pub chroma_log2_weight_denom: u32,
    pub luma_weight_flag_l0: [bool; MAX_REF_IDX],
    pub chroma_weight_flag_l0: [bool; MAX_REF_IDX],
    pub delta_luma_weight_l0: [i32; MAX_REF_IDX],
    pub luma_offset_l0: [i32; MAX_REF_IDX],
    pub delta_chroma_weight_l0: [[i32; 2]; MAX_REF_IDX],
    pub delta_chroma_offset_l0: [[i32; 2]; MAX_REF_IDX],
    pub luma_weight_flag_l1: [bool; MAX_REF_IDX],
    pub chroma_weight_flag_l1: [bool; MAX_REF_IDX],
    pub delta_luma_weight_l1: [i32; MAX_REF_IDX],
    pub luma_offset_l1: [i32; MAX_REF_IDX],
    pub delta_chroma_weight_l1: [[i32; 2]; MAX_REF_IDX],
    pub delta_chroma_offset_l1: [[i32; 2]; MAX_REF_IDX],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefPicListsModifications {
    pub ref_pic_list_modification_flag_l0: bool,
    pub list_entry_l0: [u32; MAX_REF_IDX],
    pub ref_pic_list_modification_flag_l1: bool,
    pub list_entry_l1: [u32; MAX_REF_IDX],
}

/// Everything from `slice_type` onward. Copied wholesale into a dependent
/// slice segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceSegmentBody {
    pub slice_type: SliceType,
    pub pic_output_flag: bool,
    pub colour_plane_id: u8,
    pub slice_pic_order_cnt_lsb: u32,
    pub short_term_ref_pic_set_sps_flag: bool,
    pub st_ref_pic_set: ShortTermRefPicSet,
    pub short_term_ref_pic_set_idx: u32,
    /// `CurrRpsIdx`.
    pub curr_rps_idx: u32,
    /// Bits spent on the inline short-term RPS, net of escape bytes.
    pub st_rps_bits: u32,
    pub num_long_term_sps: u32,
    pub num_long_term_pics: u32,
    pub lt_idx_sps: [u32; MAX_LONG_TERM_REF_PICS],
    pub poc_lsb_lt: [u32; MAX_LONG_TERM_REF_PICS],
    pub used_by_curr_pic_lt: [bool; MAX_LONG_TERM_REF_PICS],
    pub delta_poc_msb_present_flag: [bool; MAX_LONG_TERM_REF_PICS],
    pub delta_poc_msb_cycle_lt: [u32; MAX_LONG_TERM_REF_PICS],
    /// Bits spent on the long-term RPS, net of escape bytes.
    pub lt_rps_bits: u32,
    pub slice_temporal_mvp_enabled_flag: bool,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active_minus1: u32,
    pub num_ref_idx_l1_active_minus1: u32,
    pub num_pic_total_curr: u32,
    pub ref_pic_lists_modification: RefPicListsModifications,
    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub collocated_ref_idx: u32,
    pub pred_weight_table: PredWeightTable,
    pub five_minus_max_num_merge_cand: u32,
    pub slice_qp_delta: i32,
    pub slice_cb_qp_offset: i32,
    pub slice_cr_qp_offset: i32,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub slice_beta_offset_div2: i32,
    pub slice_tc_offset_div2: i32,
    pub slice_loop_filter_across_slices_enabled_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSegmentHeader {
    pub nal_unit_type: NaluType,
    /// NAL unit size in bytes, header included.
    pub nalu_size: usize,
    pub first_slice_segment_in_pic_flag: bool,
    pub no_output_of_prior_pics_flag: bool,
    pub irap_pic: bool,
    pub slice_pic_parameter_set_id: u32,
    pub dependent_slice_segment_flag: bool,
    pub slice_segment_address: u32,
    pub body: SliceSegmentBody,
    /// Header length in bytes, escape bytes excluded.
    pub header_size: usize,
    pub header_emulation_prevention_bytes: usize,
}

impl SliceSegmentHeader {
    /// The short-term RPS in effect: the SPS candidate selected by
    /// `CurrRpsIdx`, or the set coded inline in this header.
    pub fn curr_st_ref_pic_set<'a>(&'a self, sps: &'a Sps) -> &'a ShortTermRefPicSet {
        if self.body.short_term_ref_pic_set_sps_flag {
            &sps.st_ref_pic_set[self.body.curr_rps_idx as usize]
        } else {
            &self.body.st_ref_pic_set
        }
    }

    /// Parses a slice segment header. The reader must be positioned just
    /// past the two NAL header bytes; `nalu_size` is the size of the
    /// whole NAL unit. `prior` is the preceding slice segment of the same
    /// picture, required for dependent slice segments.
    pub fn parse(
        r: &mut BitReader,
        nalu_header: &NaluHeader,
        nalu_size: usize,
        sps: &Sps,
        pps: &Pps,
        prior: Option<&SliceSegmentHeader>,
    ) -> Result<SliceSegmentHeader> {
        let nal_unit_type = nalu_header.nal_unit_type;
        let mut shdr = SliceSegmentHeader {
            nal_unit_type,
            nalu_size,
            first_slice_segment_in_pic_flag: false,
            no_output_of_prior_pics_flag: false,
            irap_pic: nal_unit_type.is_irap(),
            slice_pic_parameter_set_id: 0,
            dependent_slice_segment_flag: false,
            slice_segment_address: 0,
            body: SliceSegmentBody::default(),
            header_size: 0,
            header_emulation_prevention_bytes: 0,
        };

        shdr.first_slice_segment_in_pic_flag = r.read_bool()?;
        if shdr.irap_pic {
            shdr.no_output_of_prior_pics_flag = r.read_bool()?;
        }
        shdr.slice_pic_parameter_set_id = r.read_ue()?;
        in_range("slice_pic_parameter_set_id", shdr.slice_pic_parameter_set_id, 0, 63)?;

        if !shdr.first_slice_segment_in_pic_flag {
            if pps.dependent_slice_segments_enabled_flag {
                shdr.dependent_slice_segment_flag = r.read_bool()?;
            }
            let address_bits = log2_ceiling(sps.pic_size_in_ctbs_y);
            if address_bits > 0 {
                shdr.slice_segment_address = r.read_bits(address_bits)?;
            }
            in_range(
                "slice_segment_address",
                shdr.slice_segment_address,
                0,
                sps.pic_size_in_ctbs_y - 1,
            )?;
        }

        let temporal_id = pps.temporal_id as usize;
        let i_slice_only = (shdr.irap_pic
            || sps.sps_max_dec_pic_buffering_minus1[temporal_id] == 0)
            && nalu_header.nuh_layer_id == 0;

        if shdr.dependent_slice_segment_flag {
            let prior = prior.ok_or_else(|| {
                tracing::debug!("dependent slice segment without prior slice data");
                Error::InvalidStream("dependent_slice_segment_flag")
            })?;
            shdr.body = prior.body.clone();
            if i_slice_only {
                require("slice_type", shdr.body.slice_type.is_i())?;
            }
        } else {
            let body = &mut shdr.body;
            body.pic_output_flag = true;
            body.num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1;
            body.num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1;
            body.collocated_from_l0_flag = true;
            body.slice_deblocking_filter_disabled_flag = pps.pps_deblocking_filter_disabled_flag;
            body.slice_beta_offset_div2 = pps.pps_beta_offset_div2;
            body.slice_tc_offset_div2 = pps.pps_tc_offset_div2;
            body.slice_loop_filter_across_slices_enabled_flag =
                pps.pps_loop_filter_across_slices_enabled_flag;
            body.curr_rps_idx = sps.num_short_term_ref_pic_sets;

            r.skip_bits(u32::from(pps.num_extra_slice_header_bits))?; // slice_reserved_flag
            body.slice_type = SliceType::try_from(r.read_ue()?)?;
            if i_slice_only {
                require("slice_type", body.slice_type.is_i())?;
            }
            if pps.output_flag_present_flag {
                body.pic_output_flag = r.read_bool()?;
            }
            if sps.separate_colour_plane_flag {
                body.colour_plane_id = r.read_bits(2)? as u8;
                in_range("colour_plane_id", body.colour_plane_id, 0, 2)?;
            }
            if !nal_unit_type.is_idr() {
                body.slice_pic_order_cnt_lsb =
                    r.read_bits(u32::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4)?;
                in_range(
                    "slice_pic_order_cnt_lsb",
                    body.slice_pic_order_cnt_lsb as i32,
                    0,
                    sps.max_pic_order_cnt_lsb - 1,
                )?;
                body.short_term_ref_pic_set_sps_flag = r.read_bool()?;
                if !body.short_term_ref_pic_set_sps_flag {
                    let bits_left_prior = r.num_bits_left();
                    let num_epb_prior = r.num_emulation_prevention_bytes_read();
                    body.st_ref_pic_set = ShortTermRefPicSet::parse(
                        r,
                        sps.num_short_term_ref_pic_sets,
                        sps.num_short_term_ref_pic_sets,
                        &sps.st_ref_pic_set,
                        sps.sps_max_dec_pic_buffering_minus1[sps.sps_max_sub_layers_minus1 as usize],
                        true,
                    )?;
                    body.st_rps_bits = ((bits_left_prior - r.num_bits_left())
                        - 8 * (r.num_emulation_prevention_bytes_read() - num_epb_prior))
                        as u32;
                } else if sps.num_short_term_ref_pic_sets > 1 {
                    body.short_term_ref_pic_set_idx =
                        r.read_bits(log2_ceiling(sps.num_short_term_ref_pic_sets))?;
                    in_range(
                        "short_term_ref_pic_set_idx",
                        body.short_term_ref_pic_set_idx,
                        0,
                        sps.num_short_term_ref_pic_sets - 1,
                    )?;
                }
                if body.short_term_ref_pic_set_sps_flag {
                    body.curr_rps_idx = body.short_term_ref_pic_set_idx;
                }

                if sps.long_term_ref_pics_present_flag {
                    let bits_left_prior = r.num_bits_left();
                    let num_epb_prior = r.num_emulation_prevention_bytes_read();
                    if sps.num_long_term_ref_pics_sps > 0 {
                        body.num_long_term_sps = r.read_ue()?;
                        in_range(
                            "num_long_term_sps",
                            body.num_long_term_sps,
                            0,
                            sps.num_long_term_ref_pics_sps,
                        )?;
                    }
                    body.num_long_term_pics = r.read_ue()?;
                    if nalu_header.nuh_layer_id == 0 {
                        let st = if body.short_term_ref_pic_set_sps_flag {
                            &sps.st_ref_pic_set[body.curr_rps_idx as usize]
                        } else {
                            &body.st_ref_pic_set
                        };
                        require(
                            "num_long_term_pics",
                            body.num_long_term_pics
                                <= sps.sps_max_dec_pic_buffering_minus1[temporal_id]
                                    .saturating_sub(st.num_negative_pics)
                                    .saturating_sub(st.num_positive_pics)
                                    .saturating_sub(body.num_long_term_sps),
                        )?;
                    }
                    in_range(
                        "num_long_term_pics",
                        body.num_long_term_pics,
                        0,
                        MAX_LONG_TERM_REF_PICS as u32 - body.num_long_term_sps,
                    )?;
                    for i in 0..(body.num_long_term_sps + body.num_long_term_pics) as usize {
                        if i < body.num_long_term_sps as usize {
                            let mut lt_idx_sps = 0;
                            if sps.num_long_term_ref_pics_sps > 1 {
                                lt_idx_sps =
                                    r.read_bits(log2_ceiling(sps.num_long_term_ref_pics_sps))?;
                                in_range(
                                    "lt_idx_sps",
                                    lt_idx_sps,
                                    0,
                                    sps.num_long_term_ref_pics_sps - 1,
                                )?;
                            }
                            body.lt_idx_sps[i] = lt_idx_sps;
                            body.poc_lsb_lt[i] = sps.lt_ref_pic_poc_lsb_sps[lt_idx_sps as usize];
                            body.used_by_curr_pic_lt[i] =
                                sps.used_by_curr_pic_lt_sps_flag[lt_idx_sps as usize];
                        } else {
                            body.poc_lsb_lt[i] = r
                                .read_bits(u32::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4)?;
                            body.used_by_curr_pic_lt[i] = r.read_bool()?;
                        }
                        body.delta_poc_msb_present_flag[i] = r.read_bool()?;
                        if body.delta_poc_msb_present_flag[i] {
                            body.delta_poc_msb_cycle_lt[i] = r.read_ue()?;
                            in_range(
                                "delta_poc_msb_cycle_lt",
                                u64::from(body.delta_poc_msb_cycle_lt[i]),
                                0,
                                1u64 << (32 - sps.log2_max_pic_order_cnt_lsb_minus4 - 4),
                            )?;
                            // Equation 7-52.
                            if i != 0 && i != body.num_long_term_sps as usize {
                                body.delta_poc_msb_cycle_lt[i] +=
                                    body.delta_poc_msb_cycle_lt[i - 1];
                            }
                        }
                    }
                    body.lt_rps_bits = ((bits_left_prior - r.num_bits_left())
                        - 8 * (r.num_emulation_prevention_bytes_read() - num_epb_prior))
                        as u32;
                }
                if sps.sps_temporal_mvp_enabled_flag {
                    body.slice_temporal_mvp_enabled_flag = r.read_bool()?;
                }
            }

            if sps.sample_adaptive_offset_enabled_flag {
                body.slice_sao_luma_flag = r.read_bool()?;
                if sps.chroma_array_type != 0 {
                    body.slice_sao_chroma_flag = r.read_bool()?;
                }
            }

            if body.slice_type.is_p() || body.slice_type.is_b() {
                body.num_ref_idx_active_override_flag = r.read_bool()?;
                if body.num_ref_idx_active_override_flag {
                    body.num_ref_idx_l0_active_minus1 = r.read_ue()?;
                    in_range(
                        "num_ref_idx_l0_active_minus1",
                        body.num_ref_idx_l0_active_minus1,
                        0,
                        MAX_REF_IDX_ACTIVE - 1,
                    )?;
                    if body.slice_type.is_b() {
                        body.num_ref_idx_l1_active_minus1 = r.read_ue()?;
                        in_range(
                            "num_ref_idx_l1_active_minus1",
                            body.num_ref_idx_l1_active_minus1,
                            0,
                            MAX_REF_IDX_ACTIVE - 1,
                        )?;
                    }
                }

                let st = if body.short_term_ref_pic_set_sps_flag {
                    &sps.st_ref_pic_set[body.curr_rps_idx as usize]
                } else {
                    &body.st_ref_pic_set
                };
                body.num_pic_total_curr = 0;
                for i in 0..st.num_negative_pics as usize {
                    if st.used_by_curr_pic_s0[i] {
                        body.num_pic_total_curr += 1;
                    }
                }
                for i in 0..st.num_positive_pics as usize {
                    if st.used_by_curr_pic_s1[i] {
                        body.num_pic_total_curr += 1;
                    }
                }
                for i in 0..(body.num_long_term_sps + body.num_long_term_pics) as usize {
                    if body.used_by_curr_pic_lt[i] {
                        body.num_pic_total_curr += 1;
                    }
                }
                require("num_pic_total_curr", body.num_pic_total_curr != 0)?;

                if pps.lists_modification_present_flag && body.num_pic_total_curr > 1 {
                    body.ref_pic_lists_modification = parse_ref_pic_lists_modifications(
                        r,
                        body.slice_type,
                        body.num_ref_idx_l0_active_minus1,
                        body.num_ref_idx_l1_active_minus1,
                        body.num_pic_total_curr,
                    )?;
                }
                if body.slice_type.is_b() {
                    body.mvd_l1_zero_flag = r.read_bool()?;
                }
                if pps.cabac_init_present_flag {
                    body.cabac_init_flag = r.read_bool()?;
                }
                if body.slice_temporal_mvp_enabled_flag {
                    if body.slice_type.is_b() {
                        body.collocated_from_l0_flag = r.read_bool()?;
                    }
                    if (body.collocated_from_l0_flag && body.num_ref_idx_l0_active_minus1 > 0)
                        || (!body.collocated_from_l0_flag
                            && body.num_ref_idx_l1_active_minus1 > 0)
                    {
                        body.collocated_ref_idx = r.read_ue()?;
                        if body.collocated_from_l0_flag {
                            in_range(
                                "collocated_ref_idx",
                                body.collocated_ref_idx,
                                0,
                                body.num_ref_idx_l0_active_minus1,
                            )?;
                        } else {
                            in_range(
                                "collocated_ref_idx",
                                body.collocated_ref_idx,
                                0,
                                body.num_ref_idx_l1_active_minus1,
                            )?;
                        }
                    }
                }
                if (pps.weighted_pred_flag && body.slice_type.is_p())
                    || (pps.weighted_bipred_flag && body.slice_type.is_b())
                {
                    body.pred_weight_table = parse_pred_weight_table(
                        r,
                        sps,
                        body.slice_type,
                        body.num_ref_idx_l0_active_minus1,
                        body.num_ref_idx_l1_active_minus1,
                    )?;
                }
                body.five_minus_max_num_merge_cand = r.read_ue()?;
                in_range(
                    "five_minus_max_num_merge_cand",
                    5i64 - i64::from(body.five_minus_max_num_merge_cand),
                    1,
                    5,
                )?;
            }

            body.slice_qp_delta = r.read_se()?;
            in_range(
                "slice_qp_delta",
                26 + i64::from(pps.init_qp_minus26) + i64::from(body.slice_qp_delta),
                i64::from(-pps.qp_bd_offset_y),
                51,
            )?;
            if pps.pps_slice_chroma_qp_offsets_present_flag {
                body.slice_cb_qp_offset = r.read_se()?;
                in_range("slice_cb_qp_offset", body.slice_cb_qp_offset, -12, 12)?;
                in_range(
                    "slice_cb_qp_offset",
                    pps.pps_cb_qp_offset + body.slice_cb_qp_offset,
                    -12,
                    12,
                )?;
                body.slice_cr_qp_offset = r.read_se()?;
                in_range("slice_cr_qp_offset", body.slice_cr_qp_offset, -12, 12)?;
                in_range(
                    "slice_cr_qp_offset",
                    pps.pps_cr_qp_offset + body.slice_cr_qp_offset,
                    -12,
                    12,
                )?;
            }
            if pps.chroma_qp_offset_list_enabled_flag {
                r.skip_bits(1)?; // cu_chroma_qp_offset_enabled_flag
            }
            let mut deblocking_filter_override_flag = false;
            if pps.deblocking_filter_override_enabled_flag {
                deblocking_filter_override_flag = r.read_bool()?;
            }
            if deblocking_filter_override_flag {
                body.slice_deblocking_filter_disabled_flag = r.read_bool()?;
                if !body.slice_deblocking_filter_disabled_flag {
                    body.slice_beta_offset_div2 = r.read_se()?;
                    in_range("slice_beta_offset_div2", body.slice_beta_offset_div2, -6, 6)?;
                    body.slice_tc_offset_div2 = r.read_se()?;
                    in_range("slice_tc_offset_div2", body.slice_tc_offset_div2, -6, 6)?;
                }
            }
            if pps.pps_loop_filter_across_slices_enabled_flag
                && (body.slice_sao_luma_flag
                    || body.slice_sao_chroma_flag
                    || !body.slice_deblocking_filter_disabled_flag)
            {
                body.slice_loop_filter_across_slices_enabled_flag = r.read_bool()?;
            }
        }

        if pps.tiles_enabled_flag || pps.entropy_coding_sync_enabled_flag {
            let num_entry_point_offsets = r.read_ue()?;
            if !pps.tiles_enabled_flag {
                in_range(
                    "num_entry_point_offsets",
                    num_entry_point_offsets,
                    0,
                    sps.pic_height_in_ctbs_y - 1,
                )?;
            } else if !pps.entropy_coding_sync_enabled_flag {
                in_range(
                    "num_entry_point_offsets",
                    num_entry_point_offsets,
                    0,
                    (pps.num_tile_columns_minus1 + 1) * (pps.num_tile_rows_minus1 + 1) - 1,
                )?;
            } else {
                in_range(
                    "num_entry_point_offsets",
                    u64::from(num_entry_point_offsets),
                    0,
                    u64::from(pps.num_tile_columns_minus1 + 1)
                        * u64::from(sps.pic_height_in_ctbs_y)
                        - 1,
                )?;
            }
            if num_entry_point_offsets > 0 {
                let offset_len_minus1 = r.read_ue()?;
                in_range("offset_len_minus1", offset_len_minus1, 0, 31)?;
                let offset_bits =
                    u64::from(num_entry_point_offsets) * u64::from(offset_len_minus1 + 1);
                if offset_bits > r.num_bits_left() as u64 {
                    return Err(Error::EndOfStream);
                }
                r.skip_bits(offset_bits as u32)?;
            }
        }

        if pps.slice_segment_header_extension_present_flag {
            let slice_segment_header_extension_length = r.read_ue()?;
            in_range(
                "slice_segment_header_extension_length",
                slice_segment_header_extension_length,
                0,
                256,
            )?;
            r.skip_bits(slice_segment_header_extension_length * 8)?;
        }

        if let Some(prior) = prior {
            if !shdr.first_slice_segment_in_pic_flag {
                shdr.check_consistency_with(prior)?;
            }
        }

        // byte_alignment()
        r.skip_bits(1)?;
        let bits_left_to_align = (r.num_bits_left() % 8) as u32;
        if bits_left_to_align > 0 {
            r.skip_bits(bits_left_to_align)?;
        }

        shdr.header_emulation_prevention_bytes = r.num_emulation_prevention_bytes_read();
        shdr.header_size =
            shdr.nalu_size - shdr.header_emulation_prevention_bytes - r.num_bits_left() / 8;
        Ok(shdr)
    }

    /// Fields that must be identical across the slice segments of one
    /// picture.
    fn check_consistency_with(&self, prior: &SliceSegmentHeader) -> Result<()> {
        require(
            "slice_pic_parameter_set_id",
            self.slice_pic_parameter_set_id == prior.slice_pic_parameter_set_id,
        )?;
        require(
            "pic_output_flag",
            self.body.pic_output_flag == prior.body.pic_output_flag,
        )?;
        require(
            "no_output_of_prior_pics_flag",
            self.no_output_of_prior_pics_flag == prior.no_output_of_prior_pics_flag,
        )?;
        require(
            "slice_pic_order_cnt_lsb",
            self.body.slice_pic_order_cnt_lsb == prior.body.slice_pic_order_cnt_lsb,
        )?;
        require(
            "short_term_ref_pic_set_sps_flag",
            self.body.short_term_ref_pic_set_sps_flag == prior.body.short_term_ref_pic_set_sps_flag,
        )?;
        require(
            "short_term_ref_pic_set_idx",
            self.body.short_term_ref_pic_set_idx == prior.body.short_term_ref_pic_set_idx,
        )?;
        require(
            "num_long_term_sps",
            self.body.num_long_term_sps == prior.body.num_long_term_sps,
        )?;
        require(
            "num_long_term_pics",
            self.body.num_long_term_pics == prior.body.num_long_term_pics,
        )?;
        require(
            "poc_lsb_lt",
            self.body.poc_lsb_lt == prior.body.poc_lsb_lt
                && self.body.used_by_curr_pic_lt == prior.body.used_by_curr_pic_lt
                && self.body.delta_poc_msb_present_flag == prior.body.delta_poc_msb_present_flag
                && self.body.delta_poc_msb_cycle_lt == prior.body.delta_poc_msb_cycle_lt,
        )?;
        require(
            "slice_temporal_mvp_enabled_flag",
            self.body.slice_temporal_mvp_enabled_flag == prior.body.slice_temporal_mvp_enabled_flag,
        )?;
        Ok(())
    }

    /// Mirrors the parse order. The reader side recomputes everything a
    /// dependent slice inherits, so only independent-slice fields are
    /// emitted for those.
    pub fn write(&self, w: &mut RbspWriter, sps: &Sps, pps: &Pps) -> io::Result<()> {
        let body = &self.body;
        w.put_flag(self.first_slice_segment_in_pic_flag)?;
        if self.nal_unit_type.is_irap() {
            w.put_flag(self.no_output_of_prior_pics_flag)?;
        }
        w.put_ue(self.slice_pic_parameter_set_id)?;

        if !self.first_slice_segment_in_pic_flag {
            if pps.dependent_slice_segments_enabled_flag {
                w.put_flag(self.dependent_slice_segment_flag)?;
            }
            let address_bits = log2_ceiling(sps.pic_size_in_ctbs_y);
            w.put_u(self.slice_segment_address, address_bits)?;
        }

        if !self.dependent_slice_segment_flag {
            w.put_u(0, u32::from(pps.num_extra_slice_header_bits))?; // slice_reserved_flag
            w.put_ue(body.slice_type as u32)?;
            if pps.output_flag_present_flag {
                w.put_flag(body.pic_output_flag)?;
            }
            if sps.separate_colour_plane_flag {
                w.put_u(u32::from(body.colour_plane_id), 2)?;
            }
            if !self.nal_unit_type.is_idr() {
                w.put_u(
                    body.slice_pic_order_cnt_lsb,
                    u32::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4,
                )?;
                w.put_flag(body.short_term_ref_pic_set_sps_flag)?;
                if !body.short_term_ref_pic_set_sps_flag {
                    body.st_ref_pic_set.write(w, sps.num_short_term_ref_pic_sets)?;
                } else if sps.num_short_term_ref_pic_sets > 1 {
                    w.put_u(
                        body.short_term_ref_pic_set_idx,
                        log2_ceiling(sps.num_short_term_ref_pic_sets),
                    )?;
                }
                if sps.long_term_ref_pics_present_flag {
                    if sps.num_long_term_ref_pics_sps > 0 {
                        w.put_ue(body.num_long_term_sps)?;
                    }
                    w.put_ue(body.num_long_term_pics)?;
                    let num_long_term_sps = body.num_long_term_sps as usize;
                    for i in 0..num_long_term_sps + body.num_long_term_pics as usize {
                        if i < num_long_term_sps {
                            if sps.num_long_term_ref_pics_sps > 1 {
                                w.put_u(
                                    body.lt_idx_sps[i],
                                    log2_ceiling(sps.num_long_term_ref_pics_sps),
                                )?;
                            }
                        } else {
                            w.put_u(
                                body.poc_lsb_lt[i],
                                u32::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4,
                            )?;
                            w.put_flag(body.used_by_curr_pic_lt[i])?;
                        }
                        w.put_flag(body.delta_poc_msb_present_flag[i])?;
                        if body.delta_poc_msb_present_flag[i] {
                            // The stored cycles are accumulated per
                            // Equation 7-52; the coded value is the delta.
                            let coded = if i != 0 && i != num_long_term_sps {
                                body.delta_poc_msb_cycle_lt[i] - body.delta_poc_msb_cycle_lt[i - 1]
                            } else {
                                body.delta_poc_msb_cycle_lt[i]
                            };
                            w.put_ue(coded)?;
                        }
                    }
                }
                if sps.sps_temporal_mvp_enabled_flag {
                    w.put_flag(body.slice_temporal_mvp_enabled_flag)?;
                }
            }

            if sps.sample_adaptive_offset_enabled_flag {
                w.put_flag(body.slice_sao_luma_flag)?;
                if sps.chroma_array_type != 0 {
                    w.put_flag(body.slice_sao_chroma_flag)?;
                }
            }

            if body.slice_type.is_p() || body.slice_type.is_b() {
                w.put_flag(body.num_ref_idx_active_override_flag)?;
                if body.num_ref_idx_active_override_flag {
                    w.put_ue(body.num_ref_idx_l0_active_minus1)?;
                    if body.slice_type.is_b() {
                        w.put_ue(body.num_ref_idx_l1_active_minus1)?;
                    }
                }
                if pps.lists_modification_present_flag && body.num_pic_total_curr > 1 {
                    let entry_bits = log2_ceiling(body.num_pic_total_curr);
                    let rpl = &body.ref_pic_lists_modification;
                    w.put_flag(rpl.ref_pic_list_modification_flag_l0)?;
                    if rpl.ref_pic_list_modification_flag_l0 {
                        for i in 0..=body.num_ref_idx_l0_active_minus1 as usize {
                            w.put_u(rpl.list_entry_l0[i], entry_bits)?;
                        }
                    }
                    if body.slice_type.is_b() {
                        w.put_flag(rpl.ref_pic_list_modification_flag_l1)?;
                        if rpl.ref_pic_list_modification_flag_l1 {
                            for i in 0..=body.num_ref_idx_l1_active_minus1 as usize {
                                w.put_u(rpl.list_entry_l1[i], entry_bits)?;
                            }
                        }
                    }
                }
                if body.slice_type.is_b() {
                    w.put_flag(body.mvd_l1_zero_flag)?;
                }
                if pps.cabac_init_present_flag {
                    w.put_flag(body.cabac_init_flag)?;
                }
                if body.slice_temporal_mvp_enabled_flag {
                    if body.slice_type.is_b() {
                        w.put_flag(body.collocated_from_l0_flag)?;
                    }
                    if (body.collocated_from_l0_flag && body.num_ref_idx_l0_active_minus1 > 0)
                        || (!body.collocated_from_l0_flag
                            && body.num_ref_idx_l1_active_minus1 > 0)
                    {
                        w.put_ue(body.collocated_ref_idx)?;
                    }
                }
                if (pps.weighted_pred_flag && body.slice_type.is_p())
                    || (pps.weighted_bipred_flag && body.slice_type.is_b())
                {
                    write_pred_weight_table(
                        w,
                        sps,
                        body.slice_type,
                        body.num_ref_idx_l0_active_minus1,
                        body.num_ref_idx_l1_active_minus1,
                        &body.pred_weight_table,
                    )?;
                }
                w.put_ue(body.five_minus_max_num_merge_cand)?;
            }

            w.put_se(body.slice_qp_delta)?;
            if pps.pps_slice_chroma_qp_offsets_present_flag {
                w.put_se(body.slice_cb_qp_offset)?;
                w.put_se(body.slice_cr_qp_offset)?;
            }
            if pps.chroma_qp_offset_list_enabled_flag {
                w.put_flag(false)?; // cu_chroma_qp_offset_enabled_flag
            }
            let override_needed = body.slice_deblocking_filter_disabled_flag
                != pps.pps_deblocking_filter_disabled_flag
                || body.slice_beta_offset_div2 != pps.pps_beta_offset_div2
                || body.slice_tc_offset_div2 != pps.pps_tc_offset_div2;
            if pps.deblocking_filter_override_enabled_flag {
                w.put_flag(override_needed)?;
                if override_needed {
                    w.put_flag(body.slice_deblocking_filter_disabled_flag)?;
                    if !body.slice_deblocking_filter_disabled_flag {
                        w.put_se(body.slice_beta_offset_div2)?;
                        w.put_se(body.slice_tc_offset_div2)?;
                    }
                }
            }
            if pps.pps_loop_filter_across_slices_enabled_flag
                && (body.slice_sao_luma_flag
                    || body.slice_sao_chroma_flag
                    || !body.slice_deblocking_filter_disabled_flag)
            {
                w.put_flag(body.slice_loop_filter_across_slices_enabled_flag)?;
            }
        }

        if pps.tiles_enabled_flag || pps.entropy_coding_sync_enabled_flag {
            w.put_ue(0)?; // num_entry_point_offsets
        }
        if pps.slice_segment_header_extension_present_flag {
            w.put_ue(0)?; // slice_segment_header_extension_length
        }

        // byte_alignment()
        w.put_flag(true)?;
        w.byte_align(false)
    }

    /// Serializes the header as a complete Annex-B NAL unit.
    pub fn to_nal(&self, sps: &Sps, pps: &Pps) -> io::Result<Vec<u8>> {
        let mut w = RbspWriter::new();
        self.write(&mut w, sps, pps)?;
        Ok(crate::bitwriter::build_nal(self.nal_unit_type, &w.into_bytes()?))
    }
}

/// Reads the leading fields of a slice header, far enough to learn which
/// PPS it refers to.
pub fn parse_pps_id(r: &mut BitReader, nal_unit_type: NaluType) -> Result<u32> {
    r.read_bool()?; // first_slice_segment_in_pic_flag
    if nal_unit_type.is_irap() {
        r.read_bool()?; // no_output_of_prior_pics_flag
    }
    let slice_pic_parameter_set_id = r.read_ue()?;
    in_range("slice_pic_parameter_set_id", slice_pic_parameter_set_id, 0, 63)?;
    Ok(slice_pic_parameter_set_id)
}

fn parse_ref_pic_lists_modifications(
    r: &mut BitReader,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: u32,
    num_pic_total_curr: u32,
) -> Result<RefPicListsModifications> {
    let mut rpl_mod = RefPicListsModifications::default();
    let entry_bits = log2_ceiling(num_pic_total_curr);
    rpl_mod.ref_pic_list_modification_flag_l0 = r.read_bool()?;
    if rpl_mod.ref_pic_list_modification_flag_l0 {
        for i in 0..=num_ref_idx_l0_active_minus1 as usize {
            rpl_mod.list_entry_l0[i] = r.read_bits(entry_bits)?;
            in_range("list_entry_l0", rpl_mod.list_entry_l0[i], 0, num_pic_total_curr - 1)?;
        }
    }
    if slice_type.is_b() {
        rpl_mod.ref_pic_list_modification_flag_l1 = r.read_bool()?;
        if rpl_mod.ref_pic_list_modification_flag_l1 {
            for i in 0..=num_ref_idx_l1_active_minus1 as usize {
                rpl_mod.list_entry_l1[i] = r.read_bits(entry_bits)?;
                in_range("list_entry_l1", rpl_mod.list_entry_l1[i], 0, num_pic_total_curr - 1)?;
            }
        }
    }
    Ok(rpl_mod)
}

fn parse_pred_weight_table(
    r: &mut BitReader,
    sps: &Sps,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: u32,
) -> Result<PredWeightTable> {
    let mut table = PredWeightTable::default();
    table.luma_log2_weight_denom = r.read_ue()?;
    in_range("luma_log2_weight_denom", table.luma_log2_weight_denom, 0, 7)?;
    if sps.chroma_array_type != 0 {
        table.delta_chroma_log2_weight_denom = r.read_se()?;
        let chroma_log2_weight_denom =
            table.delta_chroma_log2_weight_denom + table.luma_log2_weight_denom as i32;
        in_range("chroma_log2_weight_denom", chroma_log2_weight_denom, 0, 7)?;
        table.chroma_log2_weight_denom = chroma_log2_weight_denom as u32;
    }

    for i in 0..=num_ref_idx_l0_active_minus1 as usize {
        table.luma_weight_flag_l0[i] = r.read_bool()?;
    }
    if sps.chroma_array_type != 0 {
        for i in 0..=num_ref_idx_l0_active_minus1 as usize {
            table.chroma_weight_flag_l0[i] = r.read_bool()?;
        }
    }
    let mut sum_weight_l0_flags = 0;
    for i in 0..=num_ref_idx_l0_active_minus1 as usize {
        if table.luma_weight_flag_l0[i] {
            sum_weight_l0_flags += 1;
            table.delta_luma_weight_l0[i] = r.read_se()?;
            in_range("delta_luma_weight_l0", table.delta_luma_weight_l0[i], -128, 127)?;
            table.luma_offset_l0[i] = r.read_se()?;
            in_range(
                "luma_offset_l0",
                table.luma_offset_l0[i],
                -sps.wp_offset_half_range_y,
                sps.wp_offset_half_range_y - 1,
            )?;
        }
        if table.chroma_weight_flag_l0[i] {
            sum_weight_l0_flags += 2;
            for j in 0..2 {
                table.delta_chroma_weight_l0[i][j] = r.read_se()?;
                in_range(
                    "delta_chroma_weight_l0",
                    table.delta_chroma_weight_l0[i][j],
                    -128,
                    127,
                )?;
                table.delta_chroma_offset_l0[i][j] = r.read_se()?;
                in_range(
                    "delta_chroma_offset_l0",
                    table.delta_chroma_offset_l0[i][j],
                    -4 * sps.wp_offset_half_range_c,
                    4 * sps.wp_offset_half_range_c - 1,
                )?;
            }
        }
    }
    if slice_type.is_p() {
        require("sum_weight_l0_flags", sum_weight_l0_flags <= 24)?;
    }
    if slice_type.is_b() {
        let mut sum_weight_l1_flags = 0;
        for i in 0..=num_ref_idx_l1_active_minus1 as usize {
            table.luma_weight_flag_l1[i] = r.read_bool()?;
        }
        if sps.chroma_array_type != 0 {
            for i in 0..=num_ref_idx_l1_active_minus1 as usize {
                table.chroma_weight_flag_l1[i] = r.read_bool()?;
            }
        }
        for i in 0..=num_ref_idx_l1_active_minus1 as usize {
            if table.luma_weight_flag_l1[i] {
                sum_weight_l1_flags += 1;
                table.delta_luma_weight_l1[i] = r.read_se()?;
                in_range("delta_luma_weight_l1", table.delta_luma_weight_l1[i], -128, 127)?;
                table.luma_offset_l1[i] = r.read_se()?;
                in_range(
                    "luma_offset_l1",
                    table.luma_offset_l1[i],
                    -sps.wp_offset_half_range_y,
                    sps.wp_offset_half_range_y - 1,
                )?;
            }
            if table.chroma_weight_flag_l1[i] {
                sum_weight_l1_flags += 2;
                for j in 0..2 {
                    table.delta_chroma_weight_l1[i][j] = r.read_se()?;
                    in_range(
                        "delta_chroma_weight_l1",
                        table.delta_chroma_weight_l1[i][j],
                        -128,
                        127,
                    )?;
                    table.delta_chroma_offset_l1[i][j] = r.read_se()?;
                    in_range(
                        "delta_chroma_offset_l1",
                        table.delta_chroma_offset_l1[i][j],
                        -4 * sps.wp_offset_half_range_c,
                        4 * sps.wp_offset_half_range_c - 1,
                    )?;
                }
            }
        }
        require(
            "sum_weight_l1_flags",
            sum_weight_l0_flags + sum_weight_l1_flags <= 24,
        )?;
    }
    Ok(table)
}

fn write_pred_weight_table(
    w: &mut RbspWriter,
    sps: &Sps,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: u32,
    table: &PredWeightTable,
) -> io::Result<()> {
    w.put_ue(table.luma_log2_weight_denom)?;
    if sps.chroma_array_type != 0 {
        w.put_se(table.delta_chroma_log2_weight_denom)?;
    }
    for i in 0..=num_ref_idx_l0_active_minus1 as usize {
        w.put_flag(table.luma_weight_flag_l0[i])?;
    }
    if sps.chroma_array_type != 0 {
        for i in 0..=num_ref_idx_l0_active_minus1 as usize {
            w.put_flag(table.chroma_weight_flag_l0[i])?;
        }
    }
    for i in 0..=num_ref_idx_l0_active_minus1 as usize {
        if table.luma_weight_flag_l0[i] {
            w.put_se(table.delta_luma_weight_l0[i])?;
            w.put_se(table.luma_offset_l0[i])?;
        }
        if table.chroma_weight_flag_l0[i] {
            for j in 0..2 {
                w.put_se(table.delta_chroma_weight_l0[i][j])?;
                w.put_se(table.delta_chroma_offset_l0[i][j])?;
            }
        }
    }
    if slice_type.is_b() {
        for i in 0..=num_ref_idx_l1_active_minus1 as usize {
            w.put_flag(table.luma_weight_flag_l1[i])?;
        }
        if sps.chroma_array_type != 0 {
            for i in 0..=num_ref_idx_l1_active_minus1 as usize {
                w.put_flag(table.chroma_weight_flag_l1[i])?;
            }
        }
        for i in 0..=num_ref_idx_l1_active_minus1 as usize {
            if table.luma_weight_flag_l1[i] {
                w.put_se(table.delta_luma_weight_l1[i])?;
                w.put_se(table.luma_offset_l1[i])?;
            }
            if table.chroma_weight_flag_l1[i] {
                for j in 0..2 {
                    w.put_se(table.delta_chroma_weight_l1[i][j])?;
                    w.put_se(table.delta_chroma_offset_l1[i][j])?;
                }
            }
        }
    }
    Ok(())
}
