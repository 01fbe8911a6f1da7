pub mod decode;
pub mod spectrum;

pub use decode::DecodedAudio;
pub use spectrum::{FrequencyFrame, SpectrumAnalyzer};
