//! Sliding-window median filter for rejecting single-sample noise spikes.

/// Fixed-size median filter over a numeric stream.
///
/// `N` must be odd (compile-time checked). Each [`sample`](Self::sample)
/// overwrites the oldest slot of a circular window, then re-sorts a copy
/// with insertion sort — O(N²), acceptable because N is small (typically
/// 5 for the sonar path).
///
/// The window is zero-initialised, so [`get`](Self::get) is valid before
/// N real samples have been seen; during that settling interval the
/// median is biased toward `T::default()`. This matches the sensor
/// bring-up behaviour the callers expect and is deliberately not
/// corrected.
#[derive(Debug, Clone)]
pub struct MedianFilter<T, const N: usize> {
    window: [T; N],
    sorted: [T; N],
    next_in: usize,
}

impl<T: Copy + Default + PartialOrd, const N: usize> MedianFilter<T, N> {
    pub fn new() -> Self {
        const { assert!(N % 2 == 1, "median filter window must be odd-sized") }
        Self {
            window: [T::default(); N],
            sorted: [T::default(); N],
            next_in: 0,
        }
    }

    /// Admit one value, evicting the oldest.
    pub fn sample(&mut self, value: T) {
        self.window[self.next_in] = value;
        self.next_in = (self.next_in + 1) % N;

        self.sorted = self.window;
        for i in 1..N {
            let x = self.sorted[i];
            let mut j = i;
            while j > 0 && self.sorted[j - 1] > x {
                self.sorted[j] = self.sorted[j - 1];
                j -= 1;
            }
            self.sorted[j] = x;
        }
    }

    /// Median of the current window.
    pub fn get(&self) -> T {
        self.sorted[N / 2]
    }
}

impl<T: Copy + Default + PartialOrd, const N: usize> Default for MedianFilter<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
