//! Multi Most-Common-in-Window prediction estimate.

use super::Estimate;
use super::predictor::Scoreboard;
use crate::sample::SampleSequence;

/// Window sizes, smallest first.
pub const WINDOWS: [usize; 4] = [63, 255, 1023, 4095];

/// Sliding window that tracks its most common value; ties go to the value
/// seen most recently.
struct Window {
    size: usize,
    counts: Vec<u32>,
    mode: Option<u8>,
}

impl Window {
    fn new(size: usize) -> Self {
        Self {
            size,
            counts: vec![0; 256],
            mode: None,
        }
    }

    fn beats(&self, a: u8, b: u8, last_seen: &[usize; 256]) -> bool {
        let (ca, cb) = (self.counts[a as usize], self.counts[b as usize]);
        ca > cb || (ca == cb && last_seen[a as usize] > last_seen[b as usize])
    }

    /// `last_seen` must already reflect `value`.
    fn push(&mut self, value: u8, last_seen: &[usize; 256]) {
        self.counts[value as usize] += 1;
        self.mode = match self.mode {
            Some(m) if !self.beats(value, m, last_seen) => Some(m),
            _ => Some(value),
        };
    }

    fn evict(&mut self, value: u8, last_seen: &[usize; 256]) {
        self.counts[value as usize] -= 1;
        if self.mode != Some(value) {
            return;
        }
        self.mode = None;
        for v in 0..=255u8 {
            if self.counts[v as usize] == 0 {
                continue;
            }
            self.mode = match self.mode {
                Some(m) if !self.beats(v, m, last_seen) => Some(m),
                _ => Some(v),
            };
        }
    }
}

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let symbols = seq.symbols();
    let mut windows: Vec<Window> = WINDOWS.iter().map(|&w| Window::new(w)).collect();
    let mut board = Scoreboard::new(WINDOWS.len());
    let mut last_seen = [0usize; 256];
    let mut guesses = [None; WINDOWS.len()];

    for (i, &s) in symbols.iter().enumerate() {
        if i >= WINDOWS[0] {
            for (guess, window) in guesses.iter_mut().zip(&windows) {
                *guess = if i >= window.size { window.mode } else { None };
            }
            board.step(&guesses, s);
        }
        // Positions are stored 1-based so 0 means "never seen".
        last_seen[s as usize] = i + 1;
        for window in &mut windows {
            if i >= window.size {
                window.evict(symbols[i - window.size], &last_seen);
            }
            window.push(s, &last_seen);
        }
    }
    board.into_estimate(seq.bits_per_sample())
}
