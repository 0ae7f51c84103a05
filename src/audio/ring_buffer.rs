use std::sync::atomic::{AtomicUsize, Ordering};

use atomic_float::AtomicF32;

use crate::error::{AnalysisError, Result};

/// Default history length per band (samples).
pub const DEFAULT_CAPACITY: usize = 2048;

/// Fixed-size sliding window over the most recent samples.
///
/// The buffer starts zero-filled and is always logically full: every read sees
/// exactly `capacity` samples of history, oldest ones being silence until
/// overwritten.
///
/// # Roles
/// There is exactly one producer calling [`push`](Self::push) and any number
/// of readers. No locks are taken. Sample cells are relaxed atomics and the
/// cursor is published with release/acquire, so a reader always indexes
/// inside the buffer and reads a value that was really pushed (or the
/// initial zero). A reader that runs while the producer keeps writing can
/// see a window whose oldest end was already overwritten; this is harmless
/// as long as the read range plus the producer's progress during the read
/// stays under one buffer length.
#[derive(Debug)]
pub struct RingBuffer {
    samples: Box<[AtomicF32]>,
    mask: usize,
    cursor: AtomicUsize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo {
                what: "ring buffer capacity",
                value: capacity,
            });
        }

        let samples: Box<[AtomicF32]> = (0..capacity).map(|_| AtomicF32::new(0.0)).collect();
        Ok(Self {
            samples,
            mask: capacity - 1,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Producer side. Overwrites the oldest sample.
    #[inline]
    pub fn push(&self, value: f32) {
        let index = self.cursor.load(Ordering::Relaxed);
        self.samples[index].store(value, Ordering::Relaxed);
        self.cursor.store((index + 1) & self.mask, Ordering::Release);
    }

    /// Largest absolute value among the last `range` pushes.
    /// `range` is clamped to `1..=capacity`.
    pub fn peak(&self, range: usize) -> f32 {
        self.recent(self.clamp_range(range))
            .fold(0.0f32, |peak, v| peak.max(v.abs()))
    }

    /// Root mean square of the last `range` pushes.
    /// `range` is clamped to `1..=capacity`; a zero request reads the newest sample.
    pub fn rms(&self, range: usize) -> f32 {
        let range = self.clamp_range(range);
        let sum_sq: f32 = self.recent(range).map(|v| v * v).sum();
        (sum_sq / range as f32).sqrt()
    }

    /// Copies the newest `dest.len()` samples (at most `capacity`) oldest
    /// first, so the last written element is the latest push. Returns the
    /// number of samples written.
    pub fn copy_recent(&self, dest: &mut [f32]) -> usize {
        let length = dest.len().min(self.capacity());
        for (slot, value) in dest[..length].iter_mut().zip(self.recent(length)) {
            *slot = value;
        }
        length
    }

    /// Zero-fills the history. Producer side only.
    pub fn clear(&self) {
        for cell in self.samples.iter() {
            cell.store(0.0, Ordering::Relaxed);
        }
        self.cursor.store(0, Ordering::Release);
    }

    fn clamp_range(&self, range: usize) -> usize {
        range.clamp(1, self.capacity())
    }

    // Oldest-to-newest walk over the last `range` samples behind the cursor.
    fn recent(&self, range: usize) -> impl Iterator<Item = f32> + '_ {
        let base = self.cursor.load(Ordering::Acquire) + self.capacity() - range;
        (0..range).map(move |offset| {
            self.samples[(base + offset) & self.mask].load(Ordering::Relaxed)
        })
    }
}
