//! Bounded history buffers for charts.

use std::collections::VecDeque;

use crate::types::{Rate, ThroughputSample};

pub const DEFAULT_WINDOW: usize = 30;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Fixed-length throughput series. Starts full of zero samples so the chart
/// always has `capacity` points; each push evicts the oldest.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    samples: VecDeque<ThroughputSample>,
    cap: usize,
    next_index: u64,
}

impl RollingWindow {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        let samples = (0..cap as u64)
            .map(|i| ThroughputSample {
                sequence_index: i,
                ..ThroughputSample::default()
            })
            .collect();
        Self {
            samples,
            cap,
            next_index: cap as u64,
        }
    }

    pub fn push(&mut self, rate: Rate) -> ThroughputSample {
        let sample = ThroughputSample {
            sequence_index: self.next_index,
            download_bps: rate.download_bps.max(0.0),
            upload_bps: rate.upload_bps.max(0.0),
        };
        self.next_index += 1;
        push_capped(&mut self.samples, sample, self.cap);
        sample
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    // Never empty; kept for the len/is_empty pair.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn samples(&self) -> impl Iterator<Item = &ThroughputSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> ThroughputSample {
        self.samples.back().copied().unwrap_or_default()
    }

    pub fn peak(&self) -> Rate {
        self.samples.iter().fold(Rate::default(), |acc, s| Rate {
            download_bps: acc.download_bps.max(s.download_bps),
            upload_bps: acc.upload_bps.max(s.upload_bps),
        })
    }

    /// Download series rounded to whole bytes/s, oldest first (sparkline input).
    pub fn download_series(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.download_bps.round() as u64).collect()
    }

    pub fn upload_series(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.upload_bps.round() as u64).collect()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
