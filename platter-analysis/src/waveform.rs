//! Waveform overview - per-column min/max envelope of a whole track

use std::sync::Arc;

/// Default number of columns computed at load time
pub const OVERVIEW_COLUMNS: usize = 512;

/// Min/max envelope of one overview column
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveformColumn {
    pub min: f32,
    pub max: f32,
}

impl WaveformColumn {
    /// Peak-to-peak height (0.0 - 2.0)
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Static overview of a loaded track
#[derive(Debug, Clone, Default)]
pub struct WaveformOverview {
    pub columns: Vec<WaveformColumn>,
    /// Track duration in seconds
    pub duration_secs: f64,
}

impl WaveformOverview {
    /// Build from interleaved samples using the first channel only
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
        width: usize,
    ) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let duration_secs = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.0
        };

        if frames == 0 || width == 0 {
            return Self {
                columns: Vec::new(),
                duration_secs,
            };
        }

        let step = frames.div_ceil(width);
        let columns = (0..width)
            .map(|col| {
                let start = col * step;
                let end = (start + step).min(frames);
                if start >= end {
                    return WaveformColumn::default();
                }
                let (min, max) = (start..end)
                    .map(|frame| samples[frame * channels])
                    .fold((1.0f32, -1.0f32), |(lo, hi), s| (lo.min(s), hi.max(s)));
                WaveformColumn { min, max }
            })
            .collect();

        Self {
            columns,
            duration_secs,
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at a normalized position (0.0 - 1.0)
    pub fn column_at(&self, position: f64) -> WaveformColumn {
        if self.columns.is_empty() {
            return WaveformColumn::default();
        }
        let idx = ((position.clamp(0.0, 1.0) * self.columns.len() as f64) as usize)
            .min(self.columns.len() - 1);
        self.columns[idx]
    }

    /// Resample to `width` columns for drawing, merging envelopes
    pub fn resample(&self, width: usize) -> Vec<WaveformColumn> {
        if self.columns.is_empty() || width == 0 {
            return vec![WaveformColumn::default(); width];
        }
        let ratio = self.columns.len() as f64 / width as f64;
        (0..width)
            .map(|i| {
                let start = (i as f64 * ratio) as usize;
                let end = (((i + 1) as f64 * ratio) as usize)
                    .clamp(start + 1, self.columns.len().max(start + 1));
                self.columns[start.min(self.columns.len() - 1)..end.min(self.columns.len())]
                    .iter()
                    .fold(
                        WaveformColumn { min: 0.0, max: 0.0 },
                        |acc, c| WaveformColumn {
                            min: acc.min.min(c.min),
                            max: acc.max.max(c.max),
                        },
                    )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overview() {
        let overview = WaveformOverview::from_interleaved(&[], 2, 44100, 100);
        assert!(overview.is_empty());
        assert_eq!(overview.column_at(0.5), WaveformColumn::default());
    }

    #[test]
    fn test_overview_uses_first_channel() {
        // Left is a ramp, right is constant full scale
        let samples: Vec<f32> = (0..8)
            .flat_map(|i| [i as f32 / 10.0 - 0.4, 1.0])
            .collect();
        let overview = WaveformOverview::from_interleaved(&samples, 2, 8, 2);

        assert_eq!(overview.len(), 2);
        assert!((overview.duration_secs - 1.0).abs() < 1e-9);
        assert!((overview.columns[0].min + 0.4).abs() < 1e-6);
        assert!((overview.columns[0].max + 0.1).abs() < 1e-6);
        assert!((overview.columns[1].max - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_resample_merges_columns() {
        let overview = WaveformOverview {
            columns: vec![
                WaveformColumn { min: -0.2, max: 0.1 },
                WaveformColumn { min: -0.5, max: 0.4 },
                WaveformColumn { min: -0.1, max: 0.9 },
                WaveformColumn { min: 0.0, max: 0.2 },
            ],
            duration_secs: 4.0,
        };
        let narrow = overview.resample(2);
        assert_eq!(narrow[0], WaveformColumn { min: -0.5, max: 0.4 });
        assert_eq!(narrow[1], WaveformColumn { min: -0.1, max: 0.9 });
        assert_eq!(overview.resample(8).len(), 8);
    }
}
