use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Raw ADC counts per volt on the Red Pitaya inputs
pub const VOLTS_DIVISOR: f64 = 8196.0;

const TIME_COLUMN_NAME: &str = "time";
const AMPLITUDE_COLUMN_NAME: &str = "amplitude";

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse measurement table: {0}")]
    Polars(#[from] PolarsError),

    #[error("Expected time and amplitude columns, found {found} column(s)")]
    MissingColumns { found: usize },

    #[error("Column {column} contains empty or non-numeric cells")]
    NonNumeric { column: &'static str },

    #[error("Got {time} time values but {amplitude} amplitude values")]
    LengthMismatch { time: usize, amplitude: usize },

    #[error("At least 2 samples are needed, got {got}")]
    TooFewSamples { got: usize },
}

/// An acquisition as (time, amplitude) samples in temporal order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalTrace {
    time: Vec<f64>,
    amplitude: Vec<f64>,
}

impl SignalTrace {
    pub fn new(time: Vec<f64>, amplitude: Vec<f64>) -> Result<Self, TraceError> {
        if time.len() != amplitude.len() {
            return Err(TraceError::LengthMismatch {
                time: time.len(),
                amplitude: amplitude.len(),
            });
        }
        Ok(Self { time, amplitude })
    }

    /// Load a headerless `<time>,<amplitude>` table
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        log::debug!("Loading acquisition from {}", path.display());
        let data = std::fs::read(path)?;
        Self::parse_csv(&data)
    }

    pub fn parse_csv(data: &[u8]) -> Result<Self, TraceError> {
        let df = CsvReadOptions::default()
            .with_has_header(false)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()?;

        if df.width() < 2 {
            return Err(TraceError::MissingColumns { found: df.width() });
        }

        // Cells that are not numbers cast to null
        let df = df
            .lazy()
            .select([
                col("column_1").alias(TIME_COLUMN_NAME).cast(DataType::Float64),
                col("column_2").alias(AMPLITUDE_COLUMN_NAME).cast(DataType::Float64),
            ])
            .collect()?;

        let time = Self::numeric_column(&df, TIME_COLUMN_NAME)?;
        let amplitude = Self::numeric_column(&df, AMPLITUDE_COLUMN_NAME)?;
        log::debug!("Parsed {} samples", time.len());

        Self::new(time, amplitude)
    }

    fn numeric_column(df: &DataFrame, name: &'static str) -> Result<Vec<f64>, TraceError> {
        let values = df.column(name)?.f64()?;

        if values.null_count() > 0 {
            return Err(TraceError::NonNumeric { column: name });
        }
        Ok(values.into_no_null_iter().collect())
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.amplitude.iter().copied())
    }

    /// Spacing of the first two samples, taken as the spacing of the whole trace
    pub fn sampling_interval(&self) -> Result<f64, TraceError> {
        match self.time.as_slice() {
            [first, second, ..] => Ok(second - first),
            _ => Err(TraceError::TooFewSamples { got: self.len() }),
        }
    }

    /// The same trace with amplitudes divided by `divisor`
    pub fn scaled(&self, divisor: f64) -> Self {
        Self {
            time: self.time.clone(),
            amplitude: self.amplitude.iter().map(|a| a / divisor).collect(),
        }
    }

    /// Convert raw ADC counts to volts
    pub fn to_volts(&self) -> Self {
        self.scaled(VOLTS_DIVISOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv() {
        let trace = SignalTrace::parse_csv(b"0.0,1756\n0.1,1757.5\n0.2,-3\n").unwrap();
        assert_eq!(trace.time(), &[0.0, 0.1, 0.2]);
        assert_eq!(trace.amplitude(), &[1756.0, 1757.5, -3.0]);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_parse_csv_ignores_extra_columns() {
        let trace = SignalTrace::parse_csv(b"0,1,9\n1,2,9\n").unwrap();
        assert_eq!(trace.amplitude(), &[1.0, 2.0]);
    }

    #[test]
    fn test_parse_csv_single_column() {
        match SignalTrace::parse_csv(b"1\n2\n3\n") {
            Err(TraceError::MissingColumns { found }) => assert_eq!(found, 1),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_non_numeric() {
        match SignalTrace::parse_csv(b"0,1\n1,abc\n") {
            Err(TraceError::NonNumeric { column }) => assert_eq!(column, AMPLITUDE_COLUMN_NAME),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_csv_missing_file() {
        let scratch = tempfile::tempdir().unwrap();
        let result = SignalTrace::load_csv(scratch.path().join("acquisition_data.csv"));
        assert!(matches!(result, Err(TraceError::Io(_))));
    }

    #[test]
    fn test_load_csv() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("acquisition_data.csv");
        std::fs::write(&path, "0,10\n0.5,20\n1,30\n").unwrap();

        let trace = SignalTrace::load_csv(&path).unwrap();
        assert_eq!(trace.sampling_interval().unwrap(), 0.5);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            SignalTrace::new(vec![0.0, 1.0], vec![1.0]),
            Err(TraceError::LengthMismatch { time: 2, amplitude: 1 })
        ));
    }

    #[test]
    fn test_sampling_interval_needs_two_samples() {
        let trace = SignalTrace::new(vec![0.0], vec![1.0]).unwrap();
        assert!(matches!(
            trace.sampling_interval(),
            Err(TraceError::TooFewSamples { got: 1 })
        ));
    }

    #[test]
    fn test_to_volts() {
        let trace = SignalTrace::new(vec![0.0, 1.0], vec![8196.0, -4098.0]).unwrap();
        let volts = trace.to_volts();
        assert_eq!(volts.amplitude(), &[1.0, -0.5]);
        assert_eq!(volts.time(), trace.time());
    }
}
