//! Growable file buffers.
//!
//! Capacity moves in powers of two: it starts at zero, the first growth
//! jumps to [`GRANULARITY`], and every later growth doubles until the
//! requested length fits. Shrinking halves while the length stays below
//! half the capacity, never below the granularity.

/// Smallest non-zero capacity.
pub const GRANULARITY: u64 = 128;

/// Capacity needed to hold `length` bytes, starting from `current`.
///
/// Returns `None` if doubling would overflow.
pub fn grown_capacity(current: u64, length: u64) -> Option<u64> {
    if length <= current {
        return Some(current);
    }
    let mut capacity = if current == 0 { GRANULARITY } else { current };
    while capacity < length {
        capacity = capacity.checked_mul(2)?;
    }
    Some(capacity)
}

/// Capacity after shrinking to `length` bytes.
pub fn shrunk_capacity(current: u64, length: u64) -> u64 {
    let mut capacity = current;
    while length < capacity / 2 && capacity / 2 >= GRANULARITY {
        capacity /= 2;
    }
    capacity
}

/// Capacity for a file of `length` bytes that currently has `current`.
pub fn target_capacity(current: u64, length: u64) -> Option<u64> {
    if length > current {
        grown_capacity(current, length)
    } else {
        Some(shrunk_capacity(current, length))
    }
}

/// The bytes of one file.
///
/// `data.len()` is the capacity; bytes past `length` are always zero so
/// that growing exposes zeros.
#[derive(Debug, Default)]
pub struct RamBuffer {
    data: Vec<u8>,
    length: usize,
}

impl RamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn length(&self) -> u64 {
        self.length as u64
    }

    /// Resize to `length` bytes with exactly `capacity` bytes reserved.
    ///
    /// The caller has checked the budget and that `capacity >= length`.
    pub fn resize(&mut self, length: usize, capacity: usize) {
        debug_assert!(capacity >= length);
        if length < self.length {
            self.data[length..self.length].fill(0);
        }
        self.data.resize(capacity, 0);
        self.data.shrink_to_fit();
        self.length = length;
    }

    /// Copy out bytes from `offset`; short at end of data.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> usize {
        let available = self.length.saturating_sub(offset);
        let count = available.min(dst.len());
        dst[..count].copy_from_slice(&self.data[offset..offset + count]);
        count
    }

    /// Copy `src` in at `offset`. The buffer must already be long enough.
    pub fn write(&mut self, offset: usize, src: &[u8]) {
        self.data[offset..offset + src.len()].copy_from_slice(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_growth_jumps_to_granularity() {
        assert_eq!(grown_capacity(0, 1), Some(128));
        assert_eq!(grown_capacity(0, 100), Some(128));
        assert_eq!(grown_capacity(0, 128), Some(128));
        assert_eq!(grown_capacity(0, 0), Some(0));
    }

    #[test]
    fn growth_doubles() {
        assert_eq!(grown_capacity(0, 129), Some(256));
        assert_eq!(grown_capacity(128, 1000), Some(1024));
        assert_eq!(grown_capacity(256, 200), Some(256));
        assert_eq!(grown_capacity(1 << 63, u64::MAX), None);
    }

    #[test]
    fn shrink_halves_but_keeps_granularity() {
        assert_eq!(shrunk_capacity(1024, 300), 512);
        assert_eq!(shrunk_capacity(1024, 100), 128);
        assert_eq!(shrunk_capacity(1024, 0), 128);
        assert_eq!(shrunk_capacity(128, 0), 128);
        assert_eq!(shrunk_capacity(1024, 600), 1024);
        assert_eq!(shrunk_capacity(1024, 512), 1024);
    }

    #[test]
    fn target_picks_direction() {
        assert_eq!(target_capacity(128, 300), Some(512));
        assert_eq!(target_capacity(512, 10), Some(128));
    }

    #[test]
    fn truncation_zeroes_tail() {
        let mut buf = RamBuffer::new();
        buf.resize(10, 128);
        buf.write(0, &[7u8; 10]);
        buf.resize(4, 128);
        buf.resize(10, 128);
        let mut out = [0u8; 10];
        assert_eq!(buf.read(0, &mut out), 10);
        assert_eq!(&out[..4], &[7u8; 4]);
        assert_eq!(&out[4..], &[0u8; 6]);
    }

    #[test]
    fn short_read_at_end() {
        let mut buf = RamBuffer::new();
        buf.resize(5, 128);
        buf.write(0, b"hello");
        let mut out = [0u8; 8];
        assert_eq!(buf.read(3, &mut out), 2);
        assert_eq!(&out[..2], b"lo");
        assert_eq!(buf.read(5, &mut out), 0);
    }
}
