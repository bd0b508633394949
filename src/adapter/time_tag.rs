//! Resampling of sampled-function axes along a time-tagged axis.
//!
//! The time axis is split into buckets starting at its earliest finite sample. With a step of zero
//! every sample is its own bucket. With a positive step, each boundary `first + k * step` either
//! selects the nearest time sample (each sample at most once), or, when averaging, collects every
//! sample in `[first + k * step, first + (k + 1) * step)`. Non-finite samples never fill a bucket.

/// Index and interval fraction
#[derive(Debug, PartialEq)]
pub struct PreLookup(usize, f64);

fn find_index(array: &[f64], value: f64) -> usize {
    array
        .iter()
        .position(|&x| x >= value)
        .unwrap_or(array.len())
        .saturating_sub(1)
}

impl PreLookup {
    /// Calculates the index and interval fraction that specify how `value` relates to the
    /// breakpoints in `array`.
    ///
    /// Assumes that array is sorted in ascending order and not empty. Values outside the range of
    /// the array are clamped to the first or last value.
    pub fn new(array: &[f64], value: f64) -> Self {
        let index = find_index(array, value);
        if index + 1 >= array.len() {
            return Self(index, 1.0);
        }
        let (t0, t1) = (array[index], array[index + 1]);
        if t1 == t0 {
            return Self(index, 1.0);
        }
        Self(index, (value - t0) / (t1 - t0))
    }

    /// The breakpoint closest to the looked-up value. If the value is equidistant from two
    /// adjacent breakpoints, the one with the higher index is chosen.
    pub fn nearest(&self, len: usize) -> usize {
        let (index, fraction) = (self.0, self.1);
        if fraction < 0.5 { index } else { index + 1 }.min(len.saturating_sub(1))
    }
}

/// Samples of the time axis that make up one output value.
#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    /// The sample time for identity and nearest selection, the bucket start when averaging.
    pub time: f64,
    pub indices: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Identity,
    Nearest,
    Average,
}

/// Walks the buckets of a time axis one at a time.
///
/// Only finite samples place boundaries and fill buckets. A time axis without any finite sample
/// is passed through unchanged.
#[derive(Clone, Debug)]
pub struct BucketCursor {
    mode: Mode,
    step: f64,
    origin: f64,
    end: f64,
    next: usize,
    /// Finite samples as (key, sample index): the sample time when selecting the nearest sample,
    /// the bucket number sorted ascending when averaging.
    slots: Vec<(f64, usize)>,
    breakpoints: Vec<f64>,
    last: Option<usize>,
}

impl BucketCursor {
    pub fn new(time: &[f64], is_averaged: bool, step: f64) -> Self {
        let range = time
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .fold(None, |range, t| match range {
                None => Some((t, t)),
                Some((lo, hi)) => Some((f64::min(lo, t), f64::max(hi, t))),
            });
        let (origin, end) = range.unwrap_or_default();
        let mode = match (range.is_some() && step > 0.0 && step.is_finite(), is_averaged) {
            (false, _) => Mode::Identity,
            (true, false) => Mode::Nearest,
            (true, true) => Mode::Average,
        };

        let finite = time.iter().enumerate().filter(|(_, t)| t.is_finite());
        let mut slots: Vec<(f64, usize)> = match mode {
            Mode::Identity => Vec::new(),
            Mode::Nearest => finite.map(|(i, &t)| (t, i)).collect(),
            Mode::Average => finite
                .map(|(i, &t)| (((t - origin) / step).floor(), i))
                .collect(),
        };
        if mode == Mode::Average {
            slots.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        }
        let breakpoints = match mode {
            Mode::Nearest => slots.iter().map(|&(t, _)| t).collect(),
            _ => Vec::new(),
        };

        Self {
            mode,
            step,
            origin,
            end,
            next: 0,
            slots,
            breakpoints,
            last: None,
        }
    }

    fn boundary(&self) -> f64 {
        self.origin + self.next as f64 * self.step
    }

    pub fn next_bucket(&mut self, time: &[f64]) -> Option<Bucket> {
        if time.is_empty() {
            return None;
        }

        match self.mode {
            Mode::Identity => {
                let index = self.next;
                let &time = time.get(index)?;
                self.next += 1;
                Some(Bucket {
                    time,
                    indices: vec![index],
                })
            }
            Mode::Nearest => loop {
                let target = self.boundary();
                if target > self.end + self.step * 1e-9 {
                    return None;
                }
                let slot = PreLookup::new(&self.breakpoints, target).nearest(self.slots.len());
                if self.last == Some(slot) {
                    // skip to the first boundary closer to the following sample
                    let &following = self.breakpoints.get(slot + 1)?;
                    let midpoint = (self.breakpoints[slot] + following) / 2.0;
                    let skip = ((midpoint - self.origin) / self.step).ceil();
                    self.next = (skip as usize).max(self.next + 1);
                    continue;
                }
                self.next += 1;
                self.last = Some(slot);
                let &(time, index) = self.slots.get(slot)?;
                return Some(Bucket {
                    time,
                    indices: vec![index],
                });
            },
            Mode::Average => {
                // `next` is a position in `slots`, so empty buckets are never visited
                let &(bucket, _) = self.slots.get(self.next)?;
                let indices: Vec<usize> = self.slots[self.next..]
                    .iter()
                    .take_while(|(b, _)| *b == bucket)
                    .map(|&(_, i)| i)
                    .collect();
                self.next += indices.len();
                Some(Bucket {
                    time: self.origin + bucket * self.step,
                    indices,
                })
            }
        }
    }
}

/// Arithmetic mean of `values` at `indices`; `NaN` when none of them exist.
pub fn mean(values: &[f64], indices: &[usize]) -> f64 {
    let (sum, count) = indices
        .iter()
        .filter_map(|&i| values.get(i))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Resample one dependent axis against the time axis.
///
/// The sequence is lazy and recomputed from the borrowed source slices on every call; it never
/// touches the arrays it reads.
pub fn resample<'a>(
    time: &'a [f64],
    values: &'a [f64],
    is_averaged: bool,
    step: f64,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    let time = &time[..time.len().min(values.len())];
    let mut cursor = BucketCursor::new(time, is_averaged, step);
    std::iter::from_fn(move || cursor.next_bucket(time))
        .map(move |bucket| (bucket.time, mean(values, &bucket.indices)))
}

/// One resampled row: a time and one value per dependent axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeTaggedValue {
    pub time: f64,
    pub values: Vec<f64>,
}

/// Owning, lazy sequence of [`TimeTaggedValue`]s over several dependent axes sharing one time
/// axis.
#[derive(Clone, Debug)]
pub struct TimeTaggedValues {
    time: Vec<f64>,
    dependent: Vec<Vec<f64>>,
    cursor: BucketCursor,
}

impl TimeTaggedValues {
    pub fn new(time: Vec<f64>, dependent: Vec<Vec<f64>>, is_averaged: bool, step: f64) -> Self {
        let cursor = BucketCursor::new(&time, is_averaged, step);
        Self {
            time,
            dependent,
            cursor,
        }
    }

    /// A sequence that yields nothing, for variables without a time-tagged axis.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), false, 0.0)
    }
}

impl Iterator for TimeTaggedValues {
    type Item = TimeTaggedValue;

    fn next(&mut self) -> Option<Self::Item> {
        let bucket = self.cursor.next_bucket(&self.time)?;
        Some(TimeTaggedValue {
            time: bucket.time,
            values: self
                .dependent
                .iter()
                .map(|values| mean(values, &bucket.indices))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_pre_lookup() {
        let array = [0.0, 1.0, 2.0, 3.0, 4.0];

        assert_eq!(PreLookup::new(&array, -1.0), PreLookup(0, -1.0));
        assert_eq!(PreLookup::new(&array, 0.0), PreLookup(0, 0.0));
        assert_eq!(PreLookup::new(&array, 0.5), PreLookup(0, 0.5));
        assert_eq!(PreLookup::new(&array, 1.5), PreLookup(1, 0.5));
        assert_eq!(PreLookup::new(&array, 4.0), PreLookup(3, 1.0));
        assert_eq!(PreLookup::new(&array, 5.0), PreLookup(4, 1.0));
    }

    #[test]
    fn test_nearest() {
        let array = [0.0, 1.0, 2.0];
        assert_eq!(PreLookup::new(&array, 0.4).nearest(3), 0);
        // ties go to the higher index
        assert_eq!(PreLookup::new(&array, 0.5).nearest(3), 1);
        assert_eq!(PreLookup::new(&array, 1.9).nearest(3), 2);
        assert_eq!(PreLookup::new(&array, 7.0).nearest(3), 2);
    }

    #[test]
    fn test_identity() {
        let time = [0.0, 0.3, 0.9, 1.4];
        let values = [1.0, 2.0, 3.0, 4.0];
        let out: Vec<_> = resample(&time, &values, true, 0.0).collect();
        assert_eq!(out, vec![(0.0, 1.0), (0.3, 2.0), (0.9, 3.0), (1.4, 4.0)]);
    }

    #[test]
    fn test_nearest_resampling() {
        let time = [0.0, 0.4, 1.1, 1.9, 3.2];
        let values = [10.0, 11.0, 12.0, 13.0, 14.0];
        let out: Vec<_> = resample(&time, &values, false, 1.0).collect();
        assert_eq!(
            out,
            vec![(0.0, 10.0), (1.1, 12.0), (1.9, 13.0), (3.2, 14.0)]
        );
    }

    #[test]
    fn test_averaged_resampling() {
        let time = [0.0, 0.5, 1.0, 1.5, 2.0, 4.5];
        let values = [1.0, 3.0, 5.0, 7.0, 9.0, 11.0];
        let out: Vec<_> = resample(&time, &values, true, 1.0).collect();

        // buckets [0,1), [1,2), [2,3), [4,5); [3,4) is empty and skipped
        assert_eq!(out.len(), 4);
        assert_approx_eq!(f64, out[0].1, 2.0);
        assert_approx_eq!(f64, out[1].1, 6.0);
        assert_approx_eq!(f64, out[2].1, 9.0);
        assert_eq!(out[3], (4.0, 11.0));
    }

    #[test]
    fn test_resample_is_recomputable() {
        let time = vec![0.0, 1.0, 2.0];
        let values = vec![5.0, 6.0, 7.0];
        let first: Vec<_> = resample(&time, &values, false, 2.0).collect();
        let second: Vec<_> = resample(&time, &values, false, 2.0).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![(0.0, 5.0), (2.0, 7.0)]);
        assert_eq!(values, [5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_non_finite_time_samples() {
        let values = [1.0, 2.0, 3.0, 4.0];
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let time = [bad, 1.0, 2.0, 3.5];

            let averaged: Vec<_> = resample(&time, &values, true, 1.0).collect();
            assert_eq!(averaged, vec![(1.0, 2.0), (2.0, 3.0), (3.0, 4.0)]);

            let nearest: Vec<_> = resample(&time, &values, false, 1.0).take(10).collect();
            assert_eq!(nearest.len(), 3);
            assert_eq!(nearest[0], (1.0, 2.0));
        }

        // an inf in the middle neither stretches the axis nor lands in a bucket
        let time = [0.0, f64::INFINITY, 1.0];
        let averaged: Vec<_> = resample(&time, &values, true, 1.0).collect();
        assert_eq!(averaged, vec![(0.0, 1.0), (1.0, 3.0)]);
    }

    #[test]
    fn test_without_finite_time_samples() {
        let time = [f64::NAN, f64::NAN];
        let values = [1.0, 2.0];
        assert_eq!(resample(&time, &values, true, 1.0).count(), 2);
        assert_eq!(resample(&time, &values, false, 1.0).count(), 2);
    }

    #[test]
    fn test_sparse_time_axis() {
        let time = [0.0, 1.0e10];
        let values = [1.0, 2.0];
        let out: Vec<_> = resample(&time, &values, true, 1.0).collect();
        assert_eq!(out, vec![(0.0, 1.0), (1.0e10, 2.0)]);

        // each sample is selected once, however many boundaries fall closest to it
        let out: Vec<_> = resample(&time, &values, false, 1.0).collect();
        assert_eq!(out, vec![(0.0, 1.0), (1.0e10, 2.0)]);
        let time = [0.0, 0.1, 5.0];
        let values = [1.0, 2.0, 3.0];
        let out: Vec<_> = resample(&time, &values, false, 1.0).collect();
        assert_eq!(out, vec![(0.0, 1.0), (0.1, 2.0), (5.0, 3.0)]);
    }

    #[test]
    fn test_unsorted_time_axis_averages() {
        let time = [2.5, 0.0, 2.0, 0.5];
        let values = [4.0, 1.0, 2.0, 3.0];
        let out: Vec<_> = resample(&time, &values, true, 1.0).collect();
        assert_eq!(out, vec![(0.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_time_tagged_values() {
        let values = TimeTaggedValues::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 0.0, 1.0, 1.0]],
            true,
            2.0,
        );
        let rows: Vec<_> = values.collect();
        assert_eq!(
            rows,
            vec![
                TimeTaggedValue {
                    time: 0.0,
                    values: vec![1.5, 0.0]
                },
                TimeTaggedValue {
                    time: 2.0,
                    values: vec![3.5, 1.0]
                },
            ]
        );
        assert_eq!(TimeTaggedValues::empty().count(), 0);
    }
}
