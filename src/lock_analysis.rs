use crate::signal_trace::{SignalTrace, TraceError};

#[derive(Debug, thiserror::Error)]
pub enum LockAnalysisError {
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("No lock run longer than {min_run_samples} samples")]
    NoQualifyingRuns { min_run_samples: usize },
}

/// Open interval `center ± half_width` in which the loop counts as locked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockBand {
    pub center: f64,
    pub half_width: f64,
}

impl LockBand {
    pub const DEFAULT_CENTER: f64 = 1756.0;
    pub const DEFAULT_HALF_WIDTH: f64 = 5.0;

    pub fn new(center: f64, half_width: f64) -> Self {
        Self { center, half_width }
    }

    /// Both edges are excluded
    pub fn contains(&self, value: f64) -> bool {
        self.center - self.half_width < value && value < self.center + self.half_width
    }
}

impl Default for LockBand {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CENTER, Self::DEFAULT_HALF_WIDTH)
    }
}

/// What to do with a run that is still in band when the trace ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingRun {
    /// Drop it. Only runs closed by an out-of-band sample are counted.
    #[default]
    Legacy,
    /// Count it like any other run.
    FlushAtEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockCriteria {
    pub band: LockBand,
    /// Runs must be strictly longer than this to count
    pub min_run_samples: usize,
    pub trailing_run: TrailingRun,
}

impl LockCriteria {
    pub const DEFAULT_MIN_RUN_SAMPLES: usize = 3;

    /// Start from `band` with the default run threshold and legacy trailing run handling
    pub fn locked_within(band: LockBand) -> Self {
        Self {
            band,
            min_run_samples: Self::DEFAULT_MIN_RUN_SAMPLES,
            trailing_run: TrailingRun::Legacy,
        }
    }

    pub fn longer_than(mut self, samples: usize) -> Self {
        self.min_run_samples = samples;
        self
    }

    pub fn flush_at_end(mut self) -> Self {
        self.trailing_run = TrailingRun::FlushAtEnd;
        self
    }

    pub fn legacy(mut self) -> Self {
        self.trailing_run = TrailingRun::Legacy;
        self
    }

    fn qualifies(&self, run: usize) -> bool {
        run > self.min_run_samples
    }
}

impl Default for LockCriteria {
    fn default() -> Self {
        Self::locked_within(LockBand::default())
    }
}

/// Lengths in samples of the in-band runs that pass `criteria`, in order
pub fn lock_runs(amplitudes: &[f64], criteria: &LockCriteria) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0usize;

    for &value in amplitudes {
        if criteria.band.contains(value) {
            current += 1;
        } else if current > 0 {
            if criteria.qualifies(current) {
                runs.push(current);
            }
            current = 0;
        }
    }

    if current > 0 {
        match criteria.trailing_run {
            TrailingRun::FlushAtEnd if criteria.qualifies(current) => runs.push(current),
            TrailingRun::FlushAtEnd => {}
            TrailingRun::Legacy => {
                log::debug!("Ignoring lock run of {} samples still open at the end", current);
            }
        }
    }

    runs
}

/// Average time the loop stays locked, in the trace's time unit.
///
/// The mean run length is converted to a duration with the spacing of the
/// first two samples.
pub fn estimate_lock_time(
    trace: &SignalTrace,
    criteria: &LockCriteria,
) -> Result<f64, LockAnalysisError> {
    let interval = trace.sampling_interval()?;
    let runs = lock_runs(trace.amplitude(), criteria);

    if runs.is_empty() {
        return Err(LockAnalysisError::NoQualifyingRuns {
            min_run_samples: criteria.min_run_samples,
        });
    }

    let mean_samples = runs.iter().sum::<usize>() as f64 / runs.len() as f64;
    log::debug!(
        "{} lock runs, mean {:.2} samples at {} per sample",
        runs.len(),
        mean_samples,
        interval
    );

    Ok(mean_samples * interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN: f64 = 1756.0;
    const OUT: f64 = 0.0;

    fn trace(amplitude: Vec<f64>, interval: f64) -> SignalTrace {
        let time = (0..amplitude.len()).map(|i| i as f64 * interval).collect();
        SignalTrace::new(time, amplitude).unwrap()
    }

    #[test]
    fn test_band_edges_are_excluded() {
        let band = LockBand::default();
        assert!(band.contains(1756.0));
        assert!(band.contains(1751.5));
        assert!(band.contains(1760.9));
        assert!(!band.contains(1751.0));
        assert!(!band.contains(1761.0));
        assert!(!band.contains(f64::NAN));
    }

    #[test]
    fn test_single_run() {
        let trace = trace(vec![OUT, IN, IN, IN, IN, IN, OUT], 0.1);
        let lock_time = estimate_lock_time(&trace, &LockCriteria::default()).unwrap();
        assert!((lock_time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_of_runs() {
        let amplitudes = [
            vec![IN; 4],
            vec![OUT],
            vec![IN; 2], // noise
            vec![OUT, OUT],
            vec![IN; 8],
            vec![OUT],
        ]
        .concat();
        let criteria = LockCriteria::default();

        assert_eq!(lock_runs(&amplitudes, &criteria), [4, 8]);
        let lock_time = estimate_lock_time(&trace(amplitudes, 2.0), &criteria).unwrap();
        assert!((lock_time - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_runs_are_noise() {
        let trace = trace(vec![IN, IN, IN, OUT, IN, OUT, IN, IN, OUT], 0.1);

        match estimate_lock_time(&trace, &LockCriteria::default()) {
            Err(LockAnalysisError::NoQualifyingRuns { min_run_samples }) => {
                assert_eq!(min_run_samples, 3);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_run_ignored_by_default() {
        let amplitudes = vec![OUT, IN, IN, IN, IN, IN, IN];
        assert!(lock_runs(&amplitudes, &LockCriteria::default()).is_empty());
        assert!(matches!(
            estimate_lock_time(&trace(amplitudes, 0.1), &LockCriteria::default()),
            Err(LockAnalysisError::NoQualifyingRuns { .. })
        ));
    }

    #[test]
    fn test_trailing_run_flushed_on_request() {
        let criteria = LockCriteria::default().flush_at_end();
        assert_eq!(lock_runs(&[OUT, IN, IN, IN, IN, IN, IN], &criteria), [6]);
        assert!(lock_runs(&[OUT, IN, IN, IN], &criteria).is_empty());
    }

    #[test]
    fn test_whole_trace_locked() {
        let band = LockBand::new(1756.0, 5.0);
        let trace = SignalTrace::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1752.0, 1755.0, 1758.0, 1760.0],
        )
        .unwrap();

        let flushed = LockCriteria::locked_within(band).longer_than(3).flush_at_end();
        assert_eq!(lock_runs(trace.amplitude(), &flushed), [4]);
        assert!((estimate_lock_time(&trace, &flushed).unwrap() - 4.0).abs() < 1e-12);

        let legacy = flushed.legacy();
        assert!(estimate_lock_time(&trace, &legacy).is_err());
    }

    #[test]
    fn test_needs_two_samples() {
        let trace = SignalTrace::new(vec![0.0], vec![IN]).unwrap();
        assert!(matches!(
            estimate_lock_time(&trace, &LockCriteria::default()),
            Err(LockAnalysisError::Trace(TraceError::TooFewSamples { got: 1 }))
        ));
    }

    #[test]
    fn test_custom_threshold() {
        let criteria = LockCriteria::default().longer_than(1);
        assert_eq!(lock_runs(&[IN, IN, OUT, IN, OUT], &criteria), [2]);
    }
}
