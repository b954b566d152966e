//! Annex-B parser driver: NAL dispatch, parameter-set bookkeeping, POC
//! tracking.

use std::collections::HashMap;

use crate::bitreader::BitReader;
use crate::lower::LoweredView;
use crate::nal::{split_nal_units, NaluHeader, NaluType};
use crate::poc::PocTracker;
use crate::pps::Pps;
use crate::slice::{self, SliceSegmentHeader};
use crate::sps::Sps;
use crate::vps::Vps;
use crate::{Error, Result};

/// One coded slice segment delivered by [`Parser::parse_chunk`].
#[derive(Debug)]
pub struct CodedSlice<'a> {
    pub header: SliceSegmentHeader,
    /// `PicOrderCntVal` of the containing picture.
    pub poc: i32,
    /// The whole NAL unit, header bytes included, start code excluded.
    pub nalu: &'a [u8],
    pub start_code_len: usize,
}

/// Owns the active parameter sets. Each parsed set replaces any earlier
/// record with the same id; consumers look sets up by id at use time.
/// Instances share no state, so two parsers may run on two threads.
#[derive(Debug, Default)]
pub struct Parser {
    vps_map: HashMap<u8, Vps>,
    sps_map: HashMap<u8, Sps>,
    pps_map: HashMap<u8, Pps>,
    prior_slice: Option<SliceSegmentHeader>,
    poc: PocTracker,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vps(&self, id: u8) -> Option<&Vps> {
        self.vps_map.get(&id)
    }

    pub fn sps(&self, id: u8) -> Option<&Sps> {
        self.sps_map.get(&id)
    }

    pub fn pps(&self, id: u8) -> Option<&Pps> {
        self.pps_map.get(&id)
    }

    /// Splits one Annex-B chunk into NAL units and parses each in turn.
    /// The chunk must contain whole NAL units; no framing state is kept
    /// across calls. Coded slices are handed to `sink` as they complete.
    pub fn parse_chunk<F>(&mut self, bytes: &[u8], mut sink: F) -> Result<()>
    where
        F: FnMut(CodedSlice<'_>),
    {
        for span in split_nal_units(bytes) {
            if let Some(coded_slice) = self.parse_nalu(span.data, span.start_code_len)? {
                sink(coded_slice);
            }
        }
        Ok(())
    }

    /// Parses a single NAL unit (header bytes plus EBSP payload).
    /// Returns the coded slice for VCL units; parameter sets are
    /// installed, SEI and the remaining non-VCL types are skipped.
    pub fn parse_nalu<'a>(
        &mut self,
        data: &'a [u8],
        start_code_len: usize,
    ) -> Result<Option<CodedSlice<'a>>> {
        let mut r = BitReader::new(data);
        let header = NaluHeader::parse(&mut r)?;
        tracing::trace!(
            "nal unit type {} layer {} tid {}",
            header.nal_unit_type.0,
            header.nuh_layer_id,
            header.temporal_id()
        );

        match header.nal_unit_type {
            NaluType::VPS_NUT => {
                let vps = Vps::parse(&mut r)?;
                tracing::trace!("installed vps {}", vps.vps_video_parameter_set_id);
                self.vps_map.insert(vps.vps_video_parameter_set_id, vps);
                Ok(None)
            }
            NaluType::SPS_NUT => {
                let sps = Sps::parse(&mut r)?;
                if !self.vps_map.contains_key(&sps.sps_video_parameter_set_id) {
                    tracing::debug!("sps refers to unseen vps {}", sps.sps_video_parameter_set_id);
                    return Err(Error::MissingParameterSet("sps_video_parameter_set_id"));
                }
                tracing::trace!("installed sps {}", sps.sps_seq_parameter_set_id);
                self.sps_map.insert(sps.sps_seq_parameter_set_id, sps);
                Ok(None)
            }
            NaluType::PPS_NUT => {
                let pps = Pps::parse(&mut r, header.nuh_temporal_id_plus1, |id| {
                    self.sps_map.get(&id)
                })?;
                tracing::trace!("installed pps {}", pps.pps_pic_parameter_set_id);
                self.pps_map.insert(pps.pps_pic_parameter_set_id as u8, pps);
                Ok(None)
            }
            NaluType::PREFIX_SEI_NUT | NaluType::SUFFIX_SEI_NUT => {
                tracing::trace!("skipping SEI");
                Ok(None)
            }
            t if t.is_coded_slice_segment() => {
                let pps_id = {
                    let mut pre = BitReader::new(&data[2..]);
                    slice::parse_pps_id(&mut pre, t)?
                };
                let pps = self
                    .pps_map
                    .get(&(pps_id as u8))
                    .ok_or(Error::MissingParameterSet("slice_pic_parameter_set_id"))?;
                let sps = self
                    .sps_map
                    .get(&(pps.pps_seq_parameter_set_id as u8))
                    .ok_or(Error::MissingParameterSet("pps_seq_parameter_set_id"))?;
                let shdr = SliceSegmentHeader::parse(
                    &mut r,
                    &header,
                    data.len(),
                    sps,
                    pps,
                    self.prior_slice.as_ref(),
                )?;
                let poc = self.poc.compute(
                    sps.max_pic_order_cnt_lsb,
                    t,
                    shdr.body.slice_type,
                    shdr.body.slice_pic_order_cnt_lsb as i32,
                );
                self.prior_slice = Some(shdr.clone());
                Ok(Some(CodedSlice {
                    header: shdr,
                    poc,
                    nalu: data,
                    start_code_len,
                }))
            }
            t => {
                tracing::trace!("ignoring nal unit type {}", t.0);
                Ok(None)
            }
        }
    }

    /// Grants read access to the parameter sets a slice refers to, for
    /// descriptor lowering.
    pub fn lowered_view<'a>(
        &'a self,
        header: &'a SliceSegmentHeader,
    ) -> Result<LoweredView<'a>> {
        let pps = self
            .pps_map
            .get(&(header.slice_pic_parameter_set_id as u8))
            .ok_or(Error::MissingParameterSet("slice_pic_parameter_set_id"))?;
        let sps = self
            .sps_map
            .get(&(pps.pps_seq_parameter_set_id as u8))
            .ok_or(Error::MissingParameterSet("pps_seq_parameter_set_id"))?;
        Ok(LoweredView { sps, pps, slice: header })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptl::PROFILE_IDC_MAIN;

    fn test_vps() -> Vps {
        let mut vps = Vps::default();
        vps.vps_base_layer_internal_flag = true;
        vps.vps_base_layer_available_flag = true;
        vps.vps_temporal_id_nesting_flag = true;
        vps.profile_tier_level.general_profile_idc = PROFILE_IDC_MAIN;
        vps.profile_tier_level.general_progressive_source_flag = true;
        vps.profile_tier_level.general_frame_only_constraint_flag = true;
        vps.profile_tier_level.general_level_idc = 120;
        vps.vps_max_dec_pic_buffering_minus1[0] = 6;
        vps
    }

    fn test_sps() -> Sps {
        let mut sps = Sps::default();
        sps.sps_temporal_id_nesting_flag = true;
        sps.profile_tier_level = test_vps().profile_tier_level;
        sps.chroma_format_idc = 1;
        sps.pic_width_in_luma_samples = 1280;
        sps.pic_height_in_luma_samples = 720;
        sps.log2_max_pic_order_cnt_lsb_minus4 = 4;
        sps.sps_max_dec_pic_buffering_minus1[0] = 5;
        sps.log2_diff_max_min_luma_coding_block_size = 3;
        sps.log2_diff_max_min_luma_transform_block_size = 3;
        sps.max_transform_hierarchy_depth_inter = 2;
        sps.max_transform_hierarchy_depth_intra = 2;
        sps.amp_enabled_flag = true;
        sps.sample_adaptive_offset_enabled_flag = true;
        sps.finalize().unwrap();
        sps
    }

    fn test_pps() -> Pps {
        let mut pps = Pps::default();
        pps.cabac_init_present_flag = true;
        pps.pps_loop_filter_across_slices_enabled_flag = true;
        pps
    }

    fn stream_with_parameter_sets() -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend_from_slice(&test_vps().to_nal().unwrap());
        stream.extend_from_slice(&test_sps().to_nal().unwrap());
        stream.extend_from_slice(&test_pps().to_nal().unwrap());
        stream
    }

    #[test]
    fn installs_parameter_sets() {
        let mut parser = Parser::new();
        parser.parse_chunk(&stream_with_parameter_sets(), |_| {}).unwrap();
        assert!(parser.vps(0).is_some());
        assert!(parser.sps(0).is_some());
        assert!(parser.pps(0).is_some());
        assert_eq!(parser.pps(0).unwrap().temporal_id, 0);
    }

    #[test]
    fn replaces_parameter_set_with_same_id() {
        let mut parser = Parser::new();
        parser.parse_chunk(&stream_with_parameter_sets(), |_| {}).unwrap();
        let mut sps = test_sps();
        sps.pic_width_in_luma_samples = 640;
        sps.pic_height_in_luma_samples = 480;
        sps.finalize().unwrap();
        parser.parse_chunk(&sps.to_nal().unwrap(), |_| {}).unwrap();
        assert_eq!(parser.sps(0).unwrap().pic_width_in_luma_samples, 640);
    }

    #[test]
    fn sps_requires_vps() {
        let mut parser = Parser::new();
        let err = parser.parse_chunk(&test_sps().to_nal().unwrap(), |_| {});
        assert_eq!(err, Err(Error::MissingParameterSet("sps_video_parameter_set_id")));
    }

    #[test]
    fn pps_requires_sps() {
        let mut parser = Parser::new();
        let mut pps = test_pps();
        pps.pps_seq_parameter_set_id = 3;
        let err = parser.parse_chunk(&pps.to_nal().unwrap(), |_| {});
        assert_eq!(err, Err(Error::MissingParameterSet("pps_seq_parameter_set_id")));
    }

    #[test]
    fn sei_units_are_skipped() {
        let mut parser = Parser::new();
        let sei = crate::bitwriter::build_nal(NaluType::PREFIX_SEI_NUT, &[0x01, 0x02, 0x80]);
        parser.parse_chunk(&sei, |_| {}).unwrap();
    }
}
