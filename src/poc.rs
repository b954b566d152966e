//! Picture order count tracking, per _8.3.1_ in the spec.
//!
//! State is held per tracker instance; two parsers never share it.

use crate::nal::NaluType;
use crate::slice::SliceType;

#[derive(Debug, Clone, Default)]
pub struct PocTracker {
    ref_pic_order_cnt_msb: i32,
    ref_pic_order_cnt_lsb: i32,
}

impl PocTracker {
    pub fn reset(&mut self) {
        self.ref_pic_order_cnt_msb = 0;
        self.ref_pic_order_cnt_lsb = 0;
    }

    /// Computes `PicOrderCntVal` for the current picture and advances the
    /// reference state. An IDR resets the state unconditionally; B
    /// pictures never update it.
    pub fn compute(
        &mut self,
        max_pic_order_cnt_lsb: i32,
        nal_unit_type: NaluType,
        slice_type: SliceType,
        pic_order_cnt_lsb: i32,
    ) -> i32 {
        let (prev_msb, prev_lsb) = if nal_unit_type.is_idr() {
            self.reset();
            (0, 0)
        } else {
            (self.ref_pic_order_cnt_msb, self.ref_pic_order_cnt_lsb)
        };

        let msb = if pic_order_cnt_lsb < prev_lsb
            && prev_lsb - pic_order_cnt_lsb >= max_pic_order_cnt_lsb / 2
        {
            prev_msb + max_pic_order_cnt_lsb
        } else if pic_order_cnt_lsb > prev_lsb
            && pic_order_cnt_lsb - prev_lsb > max_pic_order_cnt_lsb / 2
        {
            prev_msb - max_pic_order_cnt_lsb
        } else {
            prev_msb
        };

        if slice_type != SliceType::B {
            self.ref_pic_order_cnt_msb = msb;
            self.ref_pic_order_cnt_lsb = pic_order_cnt_lsb;
        }

        msb + pic_order_cnt_lsb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idr_rooted_gop() {
        let mut tracker = PocTracker::default();
        assert_eq!(tracker.compute(256, NaluType::IDR_W_RADL, SliceType::I, 0), 0);
        assert_eq!(tracker.compute(256, NaluType::TRAIL_R, SliceType::P, 4), 4);
        assert_eq!(tracker.compute(256, NaluType::TRAIL_R, SliceType::P, 2), 2);
        assert_eq!(tracker.compute(256, NaluType::TRAIL_R, SliceType::P, 6), 6);
    }

    #[test]
    fn msb_wraps_forward() {
        let mut tracker = PocTracker::default();
        tracker.compute(16, NaluType::IDR_W_RADL, SliceType::I, 0);
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 6), 6);
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 10), 10);
        // lsb wrapped: 2 < 10 and the gap covers at least half the range.
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 2), 18);
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 6), 22);
    }

    #[test]
    fn msb_wraps_backward() {
        let mut tracker = PocTracker::default();
        tracker.compute(16, NaluType::IDR_W_RADL, SliceType::I, 0);
        tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 2);
        // A jump forward past half the range reads as a backward wrap.
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 14), -2);
    }

    #[test]
    fn b_pictures_do_not_advance_the_reference() {
        let mut tracker = PocTracker::default();
        tracker.compute(256, NaluType::IDR_W_RADL, SliceType::I, 0);
        tracker.compute(256, NaluType::TRAIL_R, SliceType::P, 8);
        assert_eq!(tracker.compute(256, NaluType::TRAIL_N, SliceType::B, 4), 4);
        // The reference is still the P picture at lsb 8.
        assert_eq!(tracker.compute(256, NaluType::TRAIL_R, SliceType::P, 16), 16);
    }

    #[test]
    fn idr_resets_state() {
        let mut tracker = PocTracker::default();
        tracker.compute(16, NaluType::IDR_W_RADL, SliceType::I, 0);
        tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 14);
        tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 2); // msb wrapped
        assert_eq!(tracker.compute(16, NaluType::IDR_N_LP, SliceType::I, 0), 0);
        assert_eq!(tracker.compute(16, NaluType::TRAIL_R, SliceType::P, 4), 4);
    }

    #[test]
    fn poc_monotone_across_idr_rooted_sequence() {
        let mut tracker = PocTracker::default();
        let mut last = tracker.compute(16, NaluType::IDR_W_RADL, SliceType::I, 0);
        for lsb in [4, 8, 12, 0, 4, 8] {
            let poc = tracker.compute(16, NaluType::TRAIL_R, SliceType::P, lsb);
            assert!(poc >= last);
            last = poc;
        }
    }
}
