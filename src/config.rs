use serde::Deserialize;
use std::path::PathBuf;

use crate::generators::BackgroundKind;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub captions: CaptionConfig,
    #[serde(default)]
    pub song: SongConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    pub background: Option<BackgroundKind>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionConfig {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    pub font: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SongConfig {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            background: None,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font: None,
        }
    }
}

fn default_width() -> u32 {
    1080
}
fn default_height() -> u32 {
    1920
}
fn default_fps() -> u32 {
    30
}
fn default_crf() -> u32 {
    18
}
fn default_codec() -> String {
    "libx264".into()
}
fn default_font_size() -> f32 {
    80.0
}

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.output.width, 1080);
        assert_eq!(cfg.output.height, 1920);
        assert_eq!(cfg.output.fps, 30);
        assert_eq!(cfg.captions.font_size, 80.0);
        assert!(cfg.song.title.is_none());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let cfg: Config = toml::from_str(
            r#"
            [output]
            fps = 60
            background = "star-field"

            [song]
            artist = "Someone"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output.fps, 60);
        assert_eq!(cfg.output.width, 1080);
        assert_eq!(cfg.output.background, Some(BackgroundKind::StarField));
        assert_eq!(cfg.song.artist.as_deref(), Some("Someone"));
    }
}
