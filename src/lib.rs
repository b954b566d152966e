//! HEVC (H.265) Annex-B bitstream syntax codec.
//!
//! Segments a raw Annex-B byte stream into NAL units, decodes parameter
//! sets (VPS/SPS/PPS) and slice segment headers into typed records, and
//! serializes the same records back into compliant NAL units. Parsed state
//! can be lowered into the picture-parameter and quantization-matrix
//! descriptors consumed by hardware video-decode APIs.

pub mod bitreader;
pub mod bitwriter;
pub mod derive;
pub mod dxva;
pub mod lower;
pub mod nal;
pub mod parser;
pub mod poc;
pub mod pps;
pub mod ptl;
pub mod rps;
pub mod scaling;
pub mod slice;
pub mod sps;
pub mod va;
pub mod vps;
pub mod vui;

pub use bitreader::BitReader;
pub use bitwriter::RbspWriter;
pub use nal::{NaluHeader, NaluType};
pub use parser::{CodedSlice, Parser};
pub use pps::Pps;
pub use slice::{SliceSegmentHeader, SliceType};
pub use sps::Sps;
pub use vps::Vps;

/// Parse failure taxonomy. Every failed range check names the offending
/// syntax element to aid bitstream triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A syntax element fell outside its spec range, or a coded value
    /// contradicts an already-parsed one.
    #[error("invalid stream: {0}")]
    InvalidStream(&'static str),
    /// A legal but unimplemented feature (multilayer/3D/SCC extensions,
    /// interlaced source).
    #[error("unsupported stream: {0}")]
    UnsupportedStream(&'static str),
    /// The bit reader was exhausted mid-element.
    #[error("end of stream")]
    EndOfStream,
    /// A referenced VPS/SPS/PPS id had never been seen.
    #[error("missing parameter set: {0}")]
    MissingParameterSet(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn in_range<T>(name: &'static str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        tracing::debug!("{} out of range: {} not in [{}, {}]", name, value, min, max);
        return Err(Error::InvalidStream(name));
    }
    Ok(())
}

pub(crate) fn require(name: &'static str, cond: bool) -> Result<()> {
    if !cond {
        tracing::debug!("{}: constraint violated", name);
        return Err(Error::InvalidStream(name));
    }
    Ok(())
}
