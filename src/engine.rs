use anyhow::Result;

use crate::audio::SpectrumAnalyzer;
use crate::captions::CaptionIndex;
use crate::generators::{FrameContext, Generator};
use crate::overlay::{CaptionRenderer, SongInfo, TextPainter};
use crate::render::Surface;

/// Composes one output frame: background, then the song info card, then the
/// caption layer on top. Frame index is the only clock, so any frame can be
/// re-rendered and sequential renders are reproducible.
pub struct Engine {
    width: u32,
    height: u32,
    fps: u32,
    analyzer: SpectrumAnalyzer,
    generator: Box<dyn Generator>,
    painter: TextPainter,
    captions: CaptionRenderer,
    index: CaptionIndex,
    song_info: Option<SongInfo>,
    surface: Surface,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        fps: u32,
        analyzer: SpectrumAnalyzer,
        generator: Box<dyn Generator>,
        painter: TextPainter,
        captions: CaptionRenderer,
        index: CaptionIndex,
        song_info: Option<SongInfo>,
    ) -> Self {
        Self {
            width,
            height,
            fps,
            analyzer,
            generator,
            painter,
            captions,
            index,
            song_info,
            surface: Surface::new(width, height),
        }
    }

    pub fn render_frame(&mut self, frame: u64) -> Result<&[u8]> {
        let ctx = FrameContext {
            frame,
            fps: self.fps,
            width: self.width,
            height: self.height,
        };

        let freq = self
            .analyzer
            .extract(frame, self.fps, self.generator.bin_count());
        self.generator
            .render(&ctx, &freq, self.surface.pixels_mut())?;

        if let Some(song_info) = &self.song_info {
            song_info.draw(&mut self.surface, &self.painter, &self.index, frame, self.fps);
        }

        self.captions
            .draw(&mut self.surface, &self.painter, &self.index, frame, self.fps);

        Ok(self.surface.pixels())
    }
}
