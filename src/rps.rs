//! Short-term reference picture sets, per _7.3.7_ / _7.4.8_ in the spec.

use std::io;

use crate::bitreader::BitReader;
use crate::bitwriter::RbspWriter;
use crate::{in_range, require, Error, Result};

pub const MAX_SHORT_TERM_REF_PIC_SETS: u32 = 64;

/// Reconstructed candidate set: delta POCs are stored resolved, whether
/// the set was coded directly or predicted from another set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortTermRefPicSet {
    pub num_negative_pics: u32,
    pub num_positive_pics: u32,
    pub delta_poc_s0: [i32; 32],
    pub used_by_curr_pic_s0: [bool; 32],
    pub delta_poc_s1: [i32; 32],
    pub used_by_curr_pic_s1: [bool; 32],
    /// `NumDeltaPocs[stRpsIdx] = NumNegativePics + NumPositivePics`.
    pub num_delta_pocs: u32,
    /// `NumDeltaPocs[RefRpsIdx]` for a predicted set signalled in a slice
    /// header; zero otherwise.
    pub rps_idx_num_delta_pocs: u32,
}

impl ShortTermRefPicSet {
    /// * `st_rps_idx`: index of this set; a set signalled directly in a
    ///   slice header has an index equal to `num_short_term_ref_pic_sets`.
    /// * `prior_sets`: the candidate sets already decoded from the SPS.
    /// * `max_dec_pic_buffering_minus1`: the top sub-layer slot.
    pub fn parse(
        r: &mut BitReader,
        st_rps_idx: u32,
        num_short_term_ref_pic_sets: u32,
        prior_sets: &[ShortTermRefPicSet],
        max_dec_pic_buffering_minus1: u32,
        in_slice_header: bool,
    ) -> Result<ShortTermRefPicSet> {
        let mut set = ShortTermRefPicSet::default();
        let mut inter_ref_pic_set_prediction_flag = false;
        if st_rps_idx != 0 {
            inter_ref_pic_set_prediction_flag = r.read_bool()?;
        }
        if inter_ref_pic_set_prediction_flag {
            let mut delta_idx_minus1 = 0;
            if st_rps_idx == num_short_term_ref_pic_sets {
                delta_idx_minus1 = r.read_ue()?;
                in_range("delta_idx_minus1", delta_idx_minus1, 0, st_rps_idx - 1)?;
            }
            let ref_rps_idx = (st_rps_idx - (delta_idx_minus1 + 1)) as usize;
            let delta_rps_sign = r.read_bool()?;
            let abs_delta_rps_minus1 = r.read_ue()?;
            in_range("abs_delta_rps_minus1", abs_delta_rps_minus1, 0, 0x7fff)?;
            let delta_rps =
                (1 - 2 * i32::from(delta_rps_sign)) * (abs_delta_rps_minus1 as i32 + 1);
            let ref_set = prior_sets
                .get(ref_rps_idx)
                .ok_or(Error::InvalidStream("ref_rps_idx"))?;
            if in_slice_header {
                set.rps_idx_num_delta_pocs = ref_set.num_delta_pocs;
            }

            let mut used_by_curr_pic_flag = [false; 33];
            // use_delta_flag defaults to 1 when not present, per 7.4.8.
            let mut use_delta_flag = [true; 33];
            for j in 0..=ref_set.num_delta_pocs as usize {
                used_by_curr_pic_flag[j] = r.read_bool()?;
                if !used_by_curr_pic_flag[j] {
                    use_delta_flag[j] = r.read_bool()?;
                }
            }

            let ref_negative = ref_set.num_negative_pics as usize;
            let ref_positive = ref_set.num_positive_pics as usize;
            let ref_delta_pocs = ref_set.num_delta_pocs as usize;

            // Equation 7-61: negative-side reconstruction.
            let mut i = 0;
            for j in (0..ref_positive).rev() {
                let d_poc = ref_set.delta_poc_s1[j] + delta_rps;
                if d_poc < 0 && use_delta_flag[ref_negative + j] {
                    set.delta_poc_s0[i] = d_poc;
                    set.used_by_curr_pic_s0[i] = used_by_curr_pic_flag[ref_negative + j];
                    i += 1;
                }
            }
            if delta_rps < 0 && use_delta_flag[ref_delta_pocs] {
                set.delta_poc_s0[i] = delta_rps;
                set.used_by_curr_pic_s0[i] = used_by_curr_pic_flag[ref_delta_pocs];
                i += 1;
            }
            for j in 0..ref_negative {
                let d_poc = ref_set.delta_poc_s0[j] + delta_rps;
                if d_poc < 0 && use_delta_flag[j] {
                    set.delta_poc_s0[i] = d_poc;
                    set.used_by_curr_pic_s0[i] = used_by_curr_pic_flag[j];
                    i += 1;
                }
            }
            set.num_negative_pics = i as u32;

            // Equation 7-62: positive-side reconstruction.
            let mut i = 0;
            for j in (0..ref_negative).rev() {
                let d_poc = ref_set.delta_poc_s0[j] + delta_rps;
                if d_poc > 0 && use_delta_flag[j] {
                    set.delta_poc_s1[i] = d_poc;
                    set.used_by_curr_pic_s1[i] = used_by_curr_pic_flag[j];
                    i += 1;
                }
            }
            if delta_rps > 0 && use_delta_flag[ref_delta_pocs] {
                set.delta_poc_s1[i] = delta_rps;
                set.used_by_curr_pic_s1[i] = used_by_curr_pic_flag[ref_delta_pocs];
                i += 1;
            }
            for j in 0..ref_positive {
                let d_poc = ref_set.delta_poc_s1[j] + delta_rps;
                if d_poc > 0 && use_delta_flag[ref_negative + j] {
                    set.delta_poc_s1[i] = d_poc;
                    set.used_by_curr_pic_s1[i] = used_by_curr_pic_flag[ref_negative + j];
                    i += 1;
                }
            }
            set.num_positive_pics = i as u32;

            in_range(
                "num_negative_pics",
                set.num_negative_pics,
                0,
                max_dec_pic_buffering_minus1,
            )?;
            in_range(
                "num_positive_pics",
                set.num_positive_pics,
                0,
                max_dec_pic_buffering_minus1 - set.num_negative_pics,
            )?;
        } else {
            set.num_negative_pics = r.read_ue()?;
            set.num_positive_pics = r.read_ue()?;
            in_range(
                "num_negative_pics",
                set.num_negative_pics,
                0,
                max_dec_pic_buffering_minus1,
            )?;
            in_range(
                "num_positive_pics",
                set.num_positive_pics,
                0,
                max_dec_pic_buffering_minus1 - set.num_negative_pics,
            )?;
            for i in 0..set.num_negative_pics as usize {
                let delta_poc_s0_minus1 = r.read_ue()?;
                in_range("delta_poc_s0_minus1", delta_poc_s0_minus1, 0, 0x7fff)?;
                set.delta_poc_s0[i] = if i == 0 {
                    -(delta_poc_s0_minus1 as i32 + 1)
                } else {
                    set.delta_poc_s0[i - 1] - (delta_poc_s0_minus1 as i32 + 1)
                };
                set.used_by_curr_pic_s0[i] = r.read_bool()?;
            }
            for i in 0..set.num_positive_pics as usize {
                let delta_poc_s1_minus1 = r.read_ue()?;
                in_range("delta_poc_s1_minus1", delta_poc_s1_minus1, 0, 0x7fff)?;
                set.delta_poc_s1[i] = if i == 0 {
                    delta_poc_s1_minus1 as i32 + 1
                } else {
                    set.delta_poc_s1[i - 1] + delta_poc_s1_minus1 as i32 + 1
                };
                set.used_by_curr_pic_s1[i] = r.read_bool()?;
            }
        }
        set.num_delta_pocs = set.num_negative_pics + set.num_positive_pics;
        require("num_delta_pocs", set.num_delta_pocs <= 32)?;
        Ok(set)
    }

    /// Emits the set in the directly-coded form, reversing the delta-POC
    /// accumulation.
    pub fn write(&self, w: &mut RbspWriter, st_rps_idx: u32) -> io::Result<()> {
        if st_rps_idx != 0 {
            w.put_flag(false)?; // inter_ref_pic_set_prediction_flag
        }
        w.put_ue(self.num_negative_pics)?;
        w.put_ue(self.num_positive_pics)?;
        let mut prev = 0i32;
        for i in 0..self.num_negative_pics as usize {
            w.put_ue((prev - self.delta_poc_s0[i] - 1) as u32)?;
            w.put_flag(self.used_by_curr_pic_s0[i])?;
            prev = self.delta_poc_s0[i];
        }
        let mut prev = 0i32;
        for i in 0..self.num_positive_pics as usize {
            w.put_ue((self.delta_poc_s1[i] - prev - 1) as u32)?;
            w.put_flag(self.used_by_curr_pic_s1[i])?;
            prev = self.delta_poc_s1[i];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit_set(negatives: &[(i32, bool)], positives: &[(i32, bool)]) -> ShortTermRefPicSet {
        let mut set = ShortTermRefPicSet::default();
        set.num_negative_pics = negatives.len() as u32;
        set.num_positive_pics = positives.len() as u32;
        for (i, &(poc, used)) in negatives.iter().enumerate() {
            set.delta_poc_s0[i] = poc;
            set.used_by_curr_pic_s0[i] = used;
        }
        for (i, &(poc, used)) in positives.iter().enumerate() {
            set.delta_poc_s1[i] = poc;
            set.used_by_curr_pic_s1[i] = used;
        }
        set.num_delta_pocs = set.num_negative_pics + set.num_positive_pics;
        set
    }

    #[test]
    fn explicit_round_trip() {
        let set = explicit_set(&[(-1, true), (-3, true), (-7, false)], &[(2, true), (5, false)]);
        for st_rps_idx in [0, 3] {
            let mut w = RbspWriter::new();
            set.write(&mut w, st_rps_idx).unwrap();
            w.rbsp_trailing_bits().unwrap();
            let bytes = w.into_bytes().unwrap();
            let mut r = BitReader::new(&bytes);
            let parsed =
                ShortTermRefPicSet::parse(&mut r, st_rps_idx, 8, &[], 15, false).unwrap();
            assert_eq!(parsed, set);
        }
    }

    #[test]
    fn negative_accumulation() {
        // delta_poc_s0_minus1 = 0, 1 => delta_poc_s0 = -1, -3.
        let mut w = RbspWriter::new();
        w.put_ue(2).unwrap(); // num_negative_pics
        w.put_ue(0).unwrap(); // num_positive_pics
        w.put_ue(0).unwrap();
        w.put_flag(true).unwrap();
        w.put_ue(1).unwrap();
        w.put_flag(false).unwrap();
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let set = ShortTermRefPicSet::parse(&mut r, 0, 4, &[], 15, false).unwrap();
        assert_eq!(set.num_negative_pics, 2);
        assert_eq!(set.delta_poc_s0[0], -1);
        assert_eq!(set.delta_poc_s0[1], -3);
        assert_eq!(set.used_by_curr_pic_s0[0], true);
        assert_eq!(set.used_by_curr_pic_s0[1], false);
        assert_eq!(set.num_delta_pocs, 2);
    }

    #[test]
    fn bounds_rejected() {
        let mut w = RbspWriter::new();
        w.put_ue(5).unwrap(); // num_negative_pics over the DPB bound
        w.put_ue(0).unwrap();
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        assert_eq!(
            ShortTermRefPicSet::parse(&mut r, 0, 4, &[], 4, false),
            Err(Error::InvalidStream("num_negative_pics"))
        );
    }

    #[test]
    fn predicted_set_reconstruction() {
        // Reference set: negatives {-2, -4}, positive {3}; delta_rps = -1
        // with every entry used and kept. Equations 7-61/7-62 give
        // negatives {-1, -3, -5} (from s1 then delta then s0) and
        // positives {2}.
        let ref_set = explicit_set(&[(-2, true), (-4, true)], &[(3, true)]);
        let mut w = RbspWriter::new();
        w.put_flag(true).unwrap(); // inter_ref_pic_set_prediction_flag
        w.put_flag(true).unwrap(); // delta_rps_sign (negative)
        w.put_ue(0).unwrap(); // abs_delta_rps_minus1 => delta_rps = -1
        for _ in 0..=ref_set.num_delta_pocs {
            w.put_flag(true).unwrap(); // used_by_curr_pic_flag[j]
        }
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let set = ShortTermRefPicSet::parse(&mut r, 1, 4, &[ref_set], 15, false).unwrap();
        assert_eq!(set.num_negative_pics, 3);
        assert_eq!(&set.delta_poc_s0[..3], &[-1, -3, -5]);
        assert_eq!(set.num_positive_pics, 1);
        assert_eq!(set.delta_poc_s1[0], 2);
        assert_eq!(set.num_delta_pocs, 4);
    }

    #[test]
    fn slice_header_set_records_ref_delta_pocs() {
        let ref_a = explicit_set(&[(-2, true)], &[]);
        let ref_b = explicit_set(&[(-1, true), (-3, true)], &[]);
        let mut w = RbspWriter::new();
        w.put_flag(true).unwrap(); // inter_ref_pic_set_prediction_flag
        w.put_ue(0).unwrap(); // delta_idx_minus1 => refers to ref_b
        w.put_flag(true).unwrap(); // delta_rps_sign
        w.put_ue(0).unwrap(); // abs_delta_rps_minus1
        for _ in 0..=ref_b.num_delta_pocs {
            w.put_flag(true).unwrap();
        }
        w.rbsp_trailing_bits().unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let set =
            ShortTermRefPicSet::parse(&mut r, 2, 2, &[ref_a, ref_b], 15, true).unwrap();
        assert_eq!(set.rps_idx_num_delta_pocs, 2);
    }
}
