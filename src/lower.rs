//! Common projection of parsed state for descriptor lowering.
//!
//! Each hardware backend is an adapter over [`LoweredView`]; a new
//! backend adds one adapter module and nothing else.

use crate::pps::Pps;
use crate::scaling::ScalingListData;
use crate::slice::SliceSegmentHeader;
use crate::sps::Sps;

#[derive(Debug, Clone, Copy)]
pub struct LoweredView<'a> {
    pub sps: &'a Sps,
    pub pps: &'a Pps,
    pub slice: &'a SliceSegmentHeader,
}

impl<'a> LoweredView<'a> {
    pub fn new(sps: &'a Sps, pps: &'a Pps, slice: &'a SliceSegmentHeader) -> Self {
        Self { sps, pps, slice }
    }

    /// Highest temporal sub-layer: A.4.1 requires its slot for the
    /// maximum DPB size.
    pub fn highest_tid(&self) -> usize {
        self.sps.sps_max_sub_layers_minus1 as usize
    }

    pub fn min_cb_log2_size_y(&self) -> u32 {
        self.sps.log2_min_luma_coding_block_size_minus3 + 3
    }

    pub fn pic_width_in_min_cbs_y(&self) -> u32 {
        self.sps.pic_width_in_luma_samples >> self.min_cb_log2_size_y()
    }

    pub fn pic_height_in_min_cbs_y(&self) -> u32 {
        self.sps.pic_height_in_luma_samples >> self.min_cb_log2_size_y()
    }

    pub fn no_pic_reordering(&self) -> bool {
        self.sps.sps_max_num_reorder_pics[self.highest_tid()] == 0
    }

    pub fn irap_pic(&self) -> bool {
        self.slice.irap_pic
    }

    pub fn idr_pic(&self) -> bool {
        self.slice.nal_unit_type.is_idr()
    }

    pub fn intra_pic(&self) -> bool {
        self.slice.irap_pic
    }

    /// Short-term RPS hand-off: both values are zero when the slice
    /// selects an SPS candidate set, otherwise they describe the set
    /// coded inline in the slice header.
    pub fn short_term_rps_hand_off(&self) -> (u32, u32) {
        if self.slice.body.short_term_ref_pic_set_sps_flag {
            (0, 0)
        } else {
            (
                self.slice.body.st_ref_pic_set.rps_idx_num_delta_pocs,
                self.slice.body.st_rps_bits,
            )
        }
    }

    /// The scaling lists the picture decodes with: the PPS set when
    /// present, the SPS set otherwise.
    pub fn scaling_lists(&self) -> &'a ScalingListData {
        if self.pps.pps_scaling_list_data_present_flag {
            &self.pps.scaling_list_data
        } else {
            &self.sps.scaling_list_data
        }
    }

    pub fn curr_pic_order_cnt(&self) -> i32 {
        self.slice.body.slice_pic_order_cnt_lsb as i32
    }

    /// Picture dimensions with the conformance-window and
    /// default-display-window crops removed.
    pub fn unpadded_dimensions(&self) -> (u32, u32) {
        let sps = self.sps;
        let vui = &sps.vui_parameters;
        let width_crop = (sps.conf_win_left_offset
            + sps.conf_win_right_offset
            + vui.def_disp_win_left_offset
            + vui.def_disp_win_right_offset)
            * sps.sub_width_c;
        let height_crop = (sps.conf_win_top_offset
            + sps.conf_win_bottom_offset
            + vui.def_disp_win_top_offset
            + vui.def_disp_win_bottom_offset)
            * sps.sub_height_c;
        (
            sps.pic_width_in_luma_samples - width_crop,
            sps.pic_height_in_luma_samples - height_crop,
        )
    }
}
