use clap::Parser;
use std::path::PathBuf;

use crate::generators::BackgroundKind;

#[derive(Parser, Debug)]
#[command(name = "viben", about = "Audio-reactive vertical video renderer")]
pub struct Cli {
    /// Input audio: a file path under the assets root, or an http(s) URL
    pub input: Option<String>,

    /// SRT caption file (path under the assets root, or URL)
    #[arg(short = 's', long)]
    pub captions: Option<String>,

    /// Output video file
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Background visual
    #[arg(short, long, value_enum, default_value_t = BackgroundKind::Aurora)]
    pub background: BackgroundKind,

    /// Video width in pixels
    #[arg(long, default_value_t = 1080)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 1920)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Limit the output to this many seconds of audio
    #[arg(long)]
    pub duration: Option<f32>,

    /// Directory local asset paths resolve against
    #[arg(long, default_value = ".")]
    pub assets_root: PathBuf,

    /// TTF/OTF font file for captions and song info
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Caption font size in pixels
    #[arg(long, default_value_t = 80.0)]
    pub font_size: f32,

    /// Cover art image shown between captions (path under the assets root,
    /// or URL)
    #[arg(long)]
    pub cover: Option<String>,

    /// Song title shown between captions
    #[arg(long)]
    pub title: Option<String>,

    /// Artist name shown between captions
    #[arg(long)]
    pub artist: Option<String>,

    /// One-line description shown between captions
    #[arg(long)]
    pub description: Option<String>,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Config file (defaults to viben.toml or the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
