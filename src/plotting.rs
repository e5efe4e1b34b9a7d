use crate::signal_trace::SignalTrace;
use crate::spectrum::{Spectrum, SpectrumError};
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const SIGNAL_PLOT_FILE: &str = "signal.png";
pub const SPECTRUM_PLOT_FILE: &str = "spectrum.png";

const FIGURE_SIZE: (u32, u32) = (1000, 600);
const ORANGE: RGBColor = RGBColor(255, 165, 0);

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("Failed to render {}: {message}", .path.display())]
    Drawing { path: PathBuf, message: String },

    #[error("Nothing to plot in {}", .path.display())]
    Empty { path: PathBuf },

    #[error("Could not create plot directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spectrum error: {0}")]
    Spectrum(#[from] SpectrumError),

    #[error("Plot window failed: {0}")]
    Window(String),
}

struct Figure<'a> {
    title: &'a str,
    x_label: &'a str,
    y_label: &'a str,
    legend: &'a str,
    color: RGBColor,
}

/// Files written by [`plot_acquisition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotFiles {
    pub signal: PathBuf,
    pub spectrum: PathBuf,
}

/// Amplitude against time
pub fn plot_signal(trace: &SignalTrace, path: &Path) -> Result<(), PlotError> {
    let points: Vec<_> = trace.samples().collect();
    draw_line_chart(
        path,
        &Figure {
            title: "Signal Data from Red Pitaya",
            x_label: "Time (s)",
            y_label: "Amplitude",
            legend: "Signal",
            color: BLUE,
        },
        &points,
    )
}

/// Spectrum magnitude against frequency in kHz
pub fn plot_spectrum(spectrum: &Spectrum, path: &Path) -> Result<(), PlotError> {
    let points: Vec<_> = spectrum.points_khz().collect();
    draw_line_chart(
        path,
        &Figure {
            title: "FFT of Signal Data",
            x_label: "Frequency (kHz)",
            y_label: "Amplitude",
            legend: "FFT",
            color: ORANGE,
        },
        &points,
    )
}

/// Render the time-domain and spectrum figures of a trace into `directory`
pub fn plot_acquisition(trace: &SignalTrace, directory: &Path) -> Result<PlotFiles, PlotError> {
    std::fs::create_dir_all(directory)?;
    let files = PlotFiles {
        signal: directory.join(SIGNAL_PLOT_FILE),
        spectrum: directory.join(SPECTRUM_PLOT_FILE),
    };

    plot_signal(trace, &files.signal)?;
    plot_spectrum(&Spectrum::compute(trace)?, &files.spectrum)?;

    log::info!(
        "Plots written to {} and {}",
        files.signal.display(),
        files.spectrum.display()
    );
    Ok(files)
}

fn draw_line_chart(path: &Path, figure: &Figure<'_>, points: &[(f64, f64)]) -> Result<(), PlotError> {
    let (x_range, y_range) = axis_ranges(points).ok_or_else(|| PlotError::Empty {
        path: path.to_path_buf(),
    })?;
    let drawing_error = |e: &dyn std::fmt::Display| PlotError::Drawing {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| drawing_error(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(figure.title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| drawing_error(&e))?;

    chart
        .configure_mesh()
        .x_desc(figure.x_label)
        .y_desc(figure.y_label)
        .draw()
        .map_err(|e| drawing_error(&e))?;

    let color = figure.color;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &color))
        .map_err(|e| drawing_error(&e))?
        .label(figure.legend)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| drawing_error(&e))?;

    root.present().map_err(|e| drawing_error(&e))?;
    Ok(())
}

/// Data bounds of both axes, widened when all values coincide
fn axis_ranges(points: &[(f64, f64)]) -> Option<(Range<f64>, Range<f64>)> {
    if points.is_empty() {
        return None;
    }

    let bounds = |values: &mut dyn Iterator<Item = f64>| {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min < max {
            min..max
        } else {
            (min - 1.0)..(max + 1.0)
        }
    };

    let x_range = bounds(&mut points.iter().map(|p| p.0));
    let y_range = bounds(&mut points.iter().map(|p| p.1));
    Some((x_range, y_range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_ranges() {
        let (x, y) = axis_ranges(&[(0.0, 3.0), (1.0, -2.0), (2.0, 5.0)]).unwrap();
        assert_eq!(x, 0.0..2.0);
        assert_eq!(y, -2.0..5.0);
    }

    #[test]
    fn test_axis_ranges_flat_signal() {
        let (x, y) = axis_ranges(&[(0.0, 1756.0), (0.1, 1756.0)]).unwrap();
        assert_eq!(x, 0.0..0.1);
        assert_eq!(y, 1755.0..1757.0);
    }

    #[test]
    fn test_axis_ranges_empty() {
        assert!(axis_ranges(&[]).is_none());
    }

    #[test]
    fn test_plot_empty_trace() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join(SIGNAL_PLOT_FILE);

        let result = plot_signal(&SignalTrace::default(), &path);
        assert!(matches!(result, Err(PlotError::Empty { .. })));
        assert!(!path.exists());
    }
}
