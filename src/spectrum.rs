use crate::signal_trace::{SignalTrace, TraceError};
use realfft::RealFftPlanner;

#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Sampling interval must be positive and finite, got {interval}")]
    InvalidSamplingInterval { interval: f64 },

    #[error("FFT failed: {0}")]
    Fft(#[from] realfft::FftError),
}

/// Magnitude spectrum of a trace, non-negative frequencies only
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    frequencies: Vec<f64>,
    magnitudes: Vec<f64>,
    sampling_rate: f64,
}

impl Spectrum {
    /// DFT of the trace amplitudes, keeping the first `n / 2` bins.
    ///
    /// The sampling rate is derived from the first two time values, so the
    /// trace needs at least two samples and increasing time stamps.
    pub fn compute(trace: &SignalTrace) -> Result<Self, SpectrumError> {
        let interval = trace.sampling_interval()?;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(SpectrumError::InvalidSamplingInterval { interval });
        }

        let n = trace.len();
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);

        let mut input = trace.amplitude().to_vec();
        let mut output = fft.make_output_vec();
        fft.process(&mut input, &mut output)?;

        let half = n / 2;
        let span = n as f64 * interval;
        let frequencies = (0..half).map(|k| k as f64 / span).collect();
        let magnitudes = output.iter().take(half).map(|bin| bin.norm()).collect();

        log::debug!("Computed {} spectrum bins for {} samples", half, n);
        Ok(Self {
            frequencies,
            magnitudes,
            sampling_rate: 1.0 / interval,
        })
    }

    /// Bin frequencies in Hz
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Samples per second
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// (frequency in kHz, magnitude) pairs for plotting
    pub fn points_khz(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .map(|f| f / 1e3)
            .zip(self.magnitudes.iter().copied())
    }

    /// The bin with the largest magnitude, DC included
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
