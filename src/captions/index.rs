//! Time-ordered caption lookup.
//!
//! Point queries answer "which caption is active"; the distance and gap
//! queries drive the song-metadata visibility controller, which fades
//! metadata in only deep inside long caption silences.

use super::srt::Caption;

/// Sentinel for "unbounded": empty index, or the gap after the last caption
/// when the total track duration is unknown.
pub const UNBOUNDED_MS: u64 = u64::MAX;

#[derive(Debug)]
pub struct CaptionIndex {
    captions: Vec<Caption>,
    total_ms: Option<u64>,
}

impl CaptionIndex {
    pub fn new(captions: Vec<Caption>) -> Self {
        Self {
            captions,
            total_ms: None,
        }
    }

    /// Thread in the total track duration so the gap after the last caption
    /// is finite instead of the `UNBOUNDED_MS` sentinel.
    pub fn with_total_duration(mut self, total_ms: u64) -> Self {
        self.total_ms = Some(total_ms);
        self
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    /// The caption covering `time_ms` (`start_ms <= t < end_ms`) and its
    /// position in the list, or None. First match wins on defective
    /// overlapping input.
    pub fn find_at(&self, time_ms: u64) -> Option<(usize, &Caption)> {
        let idx = self.captions.partition_point(|c| c.start_ms <= time_ms);
        if idx == 0 {
            return None;
        }
        let caption = &self.captions[idx - 1];
        (time_ms < caption.end_ms).then_some((idx - 1, caption))
    }

    /// 0 inside a caption, otherwise the distance to the nearest caption
    /// boundary. `UNBOUNDED_MS` when the index is empty.
    pub fn distance_to_nearest(&self, time_ms: u64) -> u64 {
        if self.captions.is_empty() {
            return UNBOUNDED_MS;
        }
        if self.find_at(time_ms).is_some() {
            return 0;
        }
        let (prev_end, next_start) = self.surrounding(time_ms);
        let before = next_start.map(|s| s - time_ms).unwrap_or(UNBOUNDED_MS);
        let after = prev_end.map(|e| time_ms - e).unwrap_or(UNBOUNDED_MS);
        before.min(after)
    }

    /// 0 inside a caption, otherwise the length of the silence interval
    /// containing `time_ms`. The gap before the first caption runs from 0;
    /// the gap after the last runs to the total duration when known, else
    /// `UNBOUNDED_MS`.
    pub fn gap_duration_at(&self, time_ms: u64) -> u64 {
        if self.captions.is_empty() {
            return UNBOUNDED_MS;
        }
        if self.find_at(time_ms).is_some() {
            return 0;
        }
        match self.surrounding(time_ms) {
            (Some(prev_end), Some(next_start)) => next_start - prev_end,
            (None, Some(next_start)) => next_start,
            (Some(prev_end), None) => self
                .total_ms
                .map(|total| total.saturating_sub(prev_end))
                .unwrap_or(UNBOUNDED_MS),
            (None, None) => UNBOUNDED_MS,
        }
    }

    /// End of the caption before `time_ms` and start of the caption after
    /// it, for a point known to be outside every caption.
    fn surrounding(&self, time_ms: u64) -> (Option<u64>, Option<u64>) {
        let idx = self.captions.partition_point(|c| c.end_ms <= time_ms);
        let prev_end = (idx > 0).then(|| self.captions[idx - 1].end_ms);
        let next_start = self.captions.get(idx).map(|c| c.start_ms);
        (prev_end, next_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(start_ms: u64, end_ms: u64) -> Caption {
        Caption {
            start_ms,
            end_ms,
            text: String::new(),
        }
    }

    fn two_captions() -> CaptionIndex {
        CaptionIndex::new(vec![caption(0, 1000), caption(3000, 4000)])
    }

    #[test]
    fn find_at_half_open_bounds() {
        let index = two_captions();
        assert_eq!(index.find_at(0).map(|(i, _)| i), Some(0));
        assert_eq!(index.find_at(999).map(|(i, _)| i), Some(0));
        assert!(index.find_at(1000).is_none());
        assert_eq!(index.find_at(3000).map(|(i, _)| i), Some(1));
        assert!(index.find_at(4000).is_none());
        assert!(index.find_at(50_000).is_none());
    }

    #[test]
    fn find_at_matches_linear_scan_on_random_lists() {
        let mut rng = fastrand::Rng::with_seed(0xCAFE);
        for _ in 0..50 {
            let mut captions = Vec::new();
            let mut cursor = 0u64;
            for _ in 0..rng.usize(1..30) {
                let start = cursor + rng.u64(0..2000);
                let end = start + rng.u64(1..3000);
                captions.push(caption(start, end));
                cursor = end;
            }
            let max = cursor + 2000;
            let index = CaptionIndex::new(captions.clone());
            for _ in 0..200 {
                let t = rng.u64(0..max);
                let expected = captions
                    .iter()
                    .position(|c| c.start_ms <= t && t < c.end_ms);
                assert_eq!(index.find_at(t).map(|(i, _)| i), expected, "at t={t}");
            }
        }
    }

    #[test]
    fn distance_is_zero_inside_and_positive_outside() {
        let index = two_captions();
        assert_eq!(index.distance_to_nearest(500), 0);
        assert_eq!(index.distance_to_nearest(3500), 0);
        assert_eq!(index.distance_to_nearest(1500), 500);
        assert_eq!(index.distance_to_nearest(1001), 1);
        assert_eq!(index.distance_to_nearest(2999), 1);
        assert_eq!(index.distance_to_nearest(5000), 1000);
    }

    #[test]
    fn gap_duration_between_captions() {
        let index = two_captions();
        assert_eq!(index.gap_duration_at(1500), 2000);
        assert_eq!(index.gap_duration_at(500), 0);
    }

    #[test]
    fn gap_before_first_caption_runs_from_zero() {
        let index = CaptionIndex::new(vec![caption(2000, 3000)]);
        assert_eq!(index.gap_duration_at(100), 2000);
        assert_eq!(index.distance_to_nearest(1500), 500);
    }

    #[test]
    fn gap_after_last_is_unbounded_without_total_duration() {
        let index = two_captions();
        assert_eq!(index.gap_duration_at(9000), UNBOUNDED_MS);
    }

    #[test]
    fn gap_after_last_uses_total_duration_when_known() {
        let index = two_captions().with_total_duration(10_000);
        assert_eq!(index.gap_duration_at(9000), 6000);
    }

    #[test]
    fn empty_index_is_unbounded_everywhere() {
        let index = CaptionIndex::new(Vec::new());
        assert!(index.find_at(0).is_none());
        assert_eq!(index.distance_to_nearest(123), UNBOUNDED_MS);
        assert_eq!(index.gap_duration_at(123), UNBOUNDED_MS);
    }
}
