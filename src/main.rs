mod anim;
mod assets;
mod audio;
mod captions;
mod cli;
mod config;
mod encode;
mod engine;
mod generators;
mod overlay;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use audio::SpectrumAnalyzer;
use captions::CaptionIndex;
use cli::Cli;
use encode::FfmpegEncoder;
use engine::Engine;
use overlay::{CaptionRenderer, SongInfo, SongMeta, TextPainter};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    apply_config(&mut cli);

    let input = cli.input.clone().context("Input audio is required")?;

    log::info!("viben - audio-reactive vertical video renderer");
    log::info!("Input: {input}");
    log::info!("Output: {}", cli.output.display());
    log::info!("Background: {:?}", cli.background);
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    // 1. Fetch and decode the audio
    let audio_asset = assets::fetch(&input, &cli.assets_root)?;
    let extension = audio_asset.extension().map(str::to_owned);
    log::info!("Decoding audio...");
    let decoded = audio::decode::decode_bytes(audio_asset.bytes.clone(), extension.as_deref())?;
    let duration = limited_duration(decoded.duration_secs(), cli.duration);
    let total_frames = (duration * cli.fps as f32).ceil() as u64;
    log::info!("Duration: {duration:.1}s, {total_frames} frames");

    // 2. Captions. A malformed SRT is a hard error, not a silent skip.
    let index = match &cli.captions {
        Some(spec) => {
            let asset = assets::fetch(spec, &cli.assets_root)?;
            let text = String::from_utf8(asset.bytes)
                .context("Caption file is not valid UTF-8")?;
            let parsed = captions::parse_srt(&text)
                .with_context(|| format!("Failed to parse captions: {spec}"))?;
            log::info!("Parsed {} caption cues", parsed.len());
            CaptionIndex::new(parsed).with_total_duration((duration * 1000.0) as u64)
        }
        None => CaptionIndex::new(Vec::new()).with_total_duration((duration * 1000.0) as u64),
    };

    // 3. Spectrum analysis
    log::info!("Analyzing spectrum...");
    let analyzer = SpectrumAnalyzer::new(&decoded);

    // 4. Visual stack
    let generator = generators::create(cli.background, cli.width, cli.height)?;
    let painter = TextPainter::load(cli.font.as_deref())?;
    let caption_renderer = CaptionRenderer::new(cli.font_size, cli.fps);

    let meta = SongMeta {
        title: cli.title.clone(),
        artist: cli.artist.clone(),
        description: cli.description.clone(),
    };
    // Cover art resolves like every other asset: URL or assets-root path.
    let cover_path = match &cli.cover {
        Some(spec) => Some(assets::fetch(spec, &cli.assets_root)?.local_path),
        None => None,
    };
    let song_info = if !meta.is_empty() || cover_path.is_some() {
        Some(SongInfo::new(meta, cover_path.as_deref())?)
    } else {
        None
    };

    let mut engine = Engine::new(
        cli.width,
        cli.height,
        cli.fps,
        analyzer,
        generator,
        painter,
        caption_renderer,
        index,
        song_info,
    );

    // 5. Encode
    log::info!("Starting FFmpeg encoder...");
    let mut encoder = FfmpegEncoder::new(
        &cli.output,
        &audio_asset.local_path,
        cli.width,
        cli.height,
        cli.fps,
        &cli.codec,
        &cli.pix_fmt,
        cli.crf,
        cli.bitrate.as_deref(),
    )?;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    for frame in 0..total_frames {
        let pixels = engine.render_frame(frame)?;
        encoder.write_frame(pixels)?;
        pb.set_position(frame + 1);
    }

    pb.finish_with_message("Rendering complete");

    log::info!("Finishing encoding...");
    encoder.finish()?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

/// Render length in seconds: the full track, capped by `--duration`.
fn limited_duration(full_secs: f32, limit_secs: Option<f32>) -> f32 {
    match limit_secs {
        Some(limit) => full_secs.min(limit.max(0.0)),
        None => full_secs,
    }
}

/// Loads viben.toml (or the platform config file) and fills in any CLI
/// values still at their defaults.
fn apply_config(cli: &mut Cli) {
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("viben.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("viben").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("viben").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let Some(path) = config_path else {
        return;
    };
    let Some(cfg) = config::load_config(&path) else {
        log::warn!("Failed to load config from {}", path.display());
        return;
    };
    log::info!("Loaded config from {}", path.display());

    // Config values apply only when the CLI is at its default.
    if cli.width == 1080 {
        cli.width = cfg.output.width;
    }
    if cli.height == 1920 {
        cli.height = cfg.output.height;
    }
    if cli.fps == 30 {
        cli.fps = cfg.output.fps;
    }
    if cli.crf == 18 {
        cli.crf = cfg.output.crf;
    }
    if cli.codec == "libx264" {
        cli.codec = cfg.output.codec;
    }
    if cli.background == generators::BackgroundKind::Aurora {
        if let Some(background) = cfg.output.background {
            cli.background = background;
        }
    }
    if cli.font_size == 80.0 {
        cli.font_size = cfg.captions.font_size;
    }
    if cli.font.is_none() {
        cli.font = cfg.captions.font;
    }
    if cli.title.is_none() {
        cli.title = cfg.song.title;
    }
    if cli.artist.is_none() {
        cli.artist = cfg.song.artist;
    }
    if cli.description.is_none() {
        cli.description = cfg.song.description;
    }
    if cli.cover.is_none() {
        cli.cover = cfg.song.cover;
    }
}

#[cfg(test)]
mod tests {
    use super::limited_duration;

    #[test]
    fn duration_limit_caps_the_render() {
        assert_eq!(limited_duration(180.0, Some(30.0)), 30.0);
    }

    #[test]
    fn duration_limit_beyond_track_is_a_no_op() {
        assert_eq!(limited_duration(180.0, Some(600.0)), 180.0);
        assert_eq!(limited_duration(180.0, None), 180.0);
    }

    #[test]
    fn negative_duration_limit_clamps_to_zero() {
        assert_eq!(limited_duration(180.0, Some(-5.0)), 0.0);
    }
}
