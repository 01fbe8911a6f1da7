pub mod ffmpeg;

pub use ffmpeg::FfmpegEncoder;
