use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::DecodedAudio;

const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = 1024;

/// Frequency data for a single video frame. Magnitudes are normalized to
/// [0, 1] against the loudest value each bin reaches over the whole track,
/// so the same frame index always yields the same data.
#[derive(Clone, Debug)]
pub struct FrequencyFrame {
    /// Normalized magnitudes, resampled to the bin count the caller asked for.
    pub magnitudes: Vec<f32>,
    pub bass_level: f32,
    pub mid_level: f32,
    pub treble_level: f32,
    pub average: f32,
}

impl FrequencyFrame {
    pub fn zeroed(bins: usize) -> Self {
        Self {
            magnitudes: vec![0.0; bins],
            bass_level: 0.0,
            mid_level: 0.0,
            treble_level: 0.0,
            average: 0.0,
        }
    }

    /// Mean magnitude over a bin range, clamped to the available bins.
    pub fn band(&self, range: std::ops::Range<usize>) -> f32 {
        let end = range.end.min(self.magnitudes.len());
        let start = range.start.min(end);
        if start == end {
            return 0.0;
        }
        self.magnitudes[start..end].iter().sum::<f32>() / (end - start) as f32
    }
}

/// Band boundaries, as fractions of a 256-bin spectrum: bass is bins 0..10,
/// mids 10..100, treble the rest. Scaled proportionally for other bin counts.
const BAND_REFERENCE_BINS: usize = 256;
const BASS_END_REF: usize = 10;
const MID_END_REF: usize = 100;

pub struct SpectrumAnalyzer {
    samples: Vec<f32>,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    /// Global per-bin peak magnitudes, used for normalization.
    peaks: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(audio: &DecodedAudio) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let hann = hann_window(FFT_SIZE);
        let peaks = global_peaks(&audio.samples, &hann);

        log::info!(
            "Spectrum analyzer ready: {} samples, {} bins",
            audio.samples.len(),
            FFT_SIZE / 2
        );

        Self {
            samples: audio.samples.clone(),
            sample_rate: audio.sample_rate,
            fft,
            hann,
            peaks,
        }
    }

    /// Frequency data for `frame` at `fps`, resampled to `bin_count` bins.
    /// Frames past the end of the audio yield silence.
    pub fn extract(&self, frame: u64, fps: u32, bin_count: usize) -> FrequencyFrame {
        let bin_count = bin_count.max(1);
        if self.samples.is_empty() {
            return FrequencyFrame::zeroed(bin_count);
        }

        let center = (frame as f64 * self.sample_rate as f64 / fps as f64) as usize;
        if center >= self.samples.len() {
            return FrequencyFrame::zeroed(bin_count);
        }

        let start = center.saturating_sub(FFT_SIZE / 2);
        let end = (start + FFT_SIZE).min(self.samples.len());

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
        for i in 0..(end - start) {
            buffer[i] = Complex::new(self.samples[start + i] * self.hann[i], 0.0);
        }
        self.fft.process(&mut buffer);

        let half = FFT_SIZE / 2;
        let normalized: Vec<f32> = buffer[..half]
            .iter()
            .zip(self.peaks.iter())
            .map(|(c, &peak)| (c.norm() / peak).min(1.0))
            .collect();

        let magnitudes = resample_bins(&normalized, bin_count);
        frame_from_magnitudes(magnitudes)
    }
}

fn frame_from_magnitudes(magnitudes: Vec<f32>) -> FrequencyFrame {
    let n = magnitudes.len();
    let bass_end = ((n * BASS_END_REF) / BAND_REFERENCE_BINS).max(1).min(n);
    let mid_end = ((n * MID_END_REF) / BAND_REFERENCE_BINS)
        .max(bass_end)
        .min(n);

    let mean = |slice: &[f32]| -> f32 {
        if slice.is_empty() {
            0.0
        } else {
            slice.iter().sum::<f32>() / slice.len() as f32
        }
    };

    let bass_level = mean(&magnitudes[..bass_end]);
    let mid_level = mean(&magnitudes[bass_end..mid_end]);
    let treble_level = mean(&magnitudes[mid_end..]);
    let average = mean(&magnitudes);

    FrequencyFrame {
        magnitudes,
        bass_level,
        mid_level,
        treble_level,
        average,
    }
}

/// Averages groups of source bins into `count` output bins.
fn resample_bins(source: &[f32], count: usize) -> Vec<f32> {
    if source.is_empty() {
        return vec![0.0; count];
    }
    if source.len() == count {
        return source.to_vec();
    }
    (0..count)
        .map(|i| {
            let start = i * source.len() / count;
            let end = (((i + 1) * source.len()) / count).max(start + 1).min(source.len());
            source[start..end].iter().sum::<f32>() / (end - start) as f32
        })
        .collect()
}

/// Per-bin peak magnitudes over hop-spaced windows of the whole track.
fn global_peaks(samples: &[f32], hann: &[f32]) -> Vec<f32> {
    let half = FFT_SIZE / 2;
    let floor = vec![1e-10f32; half];
    if samples.is_empty() {
        return floor;
    }

    let window_count = samples.len() / HOP_SIZE + 1;

    (0..window_count)
        .into_par_iter()
        .map(|w| {
            let start = w * HOP_SIZE;
            let end = (start + FFT_SIZE).min(samples.len());

            let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
            for i in 0..(end - start) {
                buffer[i] = Complex::new(samples[start + i] * hann[i], 0.0);
            }

            // Per-thread planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(FFT_SIZE);
            fft.process(&mut buffer);

            buffer[..half].iter().map(|c| c.norm()).collect::<Vec<f32>>()
        })
        .reduce(
            || floor.clone(),
            |mut acc, mags| {
                for (a, m) in acc.iter_mut().zip(mags) {
                    *a = a.max(m);
                }
                acc
            },
        )
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> DecodedAudio {
        let n = (sample_rate as f32 * secs) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        DecodedAudio {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn magnitudes_stay_within_unit_range() {
        let audio = sine(440.0, 44100, 1.0);
        let analyzer = SpectrumAnalyzer::new(&audio);
        let frame = analyzer.extract(15, 30, 256);
        assert_eq!(frame.magnitudes.len(), 256);
        for &m in &frame.magnitudes {
            assert!((0.0..=1.0).contains(&m), "magnitude out of range: {m}");
        }
        for &v in &[
            frame.bass_level,
            frame.mid_level,
            frame.treble_level,
            frame.average,
        ] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn same_frame_yields_identical_data() {
        let audio = sine(220.0, 22050, 1.0);
        let analyzer = SpectrumAnalyzer::new(&audio);
        let a = analyzer.extract(10, 30, 64);
        let b = analyzer.extract(10, 30, 64);
        assert_eq!(a.magnitudes, b.magnitudes);
        assert_eq!(a.bass_level, b.bass_level);
    }

    #[test]
    fn low_tone_concentrates_in_bass_band() {
        // 60 Hz at 44.1kHz lands in the lowest bins.
        let audio = sine(60.0, 44100, 1.0);
        let analyzer = SpectrumAnalyzer::new(&audio);
        let frame = analyzer.extract(15, 30, 256);
        assert!(frame.bass_level > frame.treble_level);
    }

    #[test]
    fn frames_past_audio_end_are_silent() {
        let audio = sine(440.0, 44100, 0.5);
        let analyzer = SpectrumAnalyzer::new(&audio);
        let frame = analyzer.extract(10_000, 30, 32);
        assert!(frame.magnitudes.iter().all(|&m| m == 0.0));
        assert_eq!(frame.average, 0.0);
    }

    #[test]
    fn empty_audio_yields_zeroed_frames() {
        let audio = DecodedAudio {
            samples: Vec::new(),
            sample_rate: 44100,
        };
        let analyzer = SpectrumAnalyzer::new(&audio);
        let frame = analyzer.extract(0, 30, 16);
        assert_eq!(frame.magnitudes, vec![0.0; 16]);
    }

    #[test]
    fn band_helper_clamps_ranges() {
        let frame = FrequencyFrame {
            magnitudes: vec![1.0, 0.5, 0.0],
            bass_level: 0.0,
            mid_level: 0.0,
            treble_level: 0.0,
            average: 0.5,
        };
        assert_eq!(frame.band(0..2), 0.75);
        assert_eq!(frame.band(2..100), 0.0);
        assert_eq!(frame.band(5..10), 0.0);
    }

    #[test]
    fn resample_preserves_length_and_range() {
        let source: Vec<f32> = (0..1024).map(|i| i as f32 / 1024.0).collect();
        let out = resample_bins(&source, 256);
        assert_eq!(out.len(), 256);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn band_boundaries_scale_with_bin_count() {
        let mags = vec![1.0; 16];
        let frame = frame_from_magnitudes(mags);
        // With 16 bins bass covers the first bin only.
        assert_eq!(frame.bass_level, 1.0);
        assert_eq!(frame.average, 1.0);
    }
}
