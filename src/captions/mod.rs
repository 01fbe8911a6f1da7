pub mod index;
pub mod markup;
pub mod srt;

pub use index::CaptionIndex;
pub use srt::{parse_srt, Caption, CaptionError};
