pub mod captions;
pub mod song_info;
pub mod text;

pub use captions::CaptionRenderer;
pub use song_info::{SongInfo, SongMeta};
pub use text::TextPainter;
