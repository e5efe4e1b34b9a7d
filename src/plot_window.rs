use crate::plotting::PlotError;
use crate::signal_trace::SignalTrace;
use crate::spectrum::Spectrum;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};

pub const WINDOW_TITLE: &str = "Red Pitaya Acquisition";

const WINDOW_SIZE: [f32; 2] = [1000.0, 900.0];
const SIGNAL_COLOR: Color32 = Color32::from_rgb(86, 156, 214);
const SPECTRUM_COLOR: Color32 = Color32::from_rgb(255, 165, 0);

/// Point series of the two acquisition figures, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionFigures {
    signal: Vec<[f64; 2]>,
    spectrum: Vec<[f64; 2]>,
}

impl AcquisitionFigures {
    /// Compute both series up front so nothing can fail once a window is open
    pub fn new(trace: &SignalTrace) -> Result<Self, PlotError> {
        let spectrum = Spectrum::compute(trace)?;

        Ok(Self {
            signal: trace.samples().map(|(t, v)| [t, v]).collect(),
            spectrum: spectrum.points_khz().map(|(f, m)| [f, m]).collect(),
        })
    }

    pub fn signal(&self) -> &[[f64; 2]] {
        &self.signal
    }

    /// Magnitude against frequency in kHz
    pub fn spectrum(&self) -> &[[f64; 2]] {
        &self.spectrum
    }
}

/// Open one window with the time-domain and spectrum figures of `trace`.
///
/// Blocks until the window is closed (or Esc is pressed).
pub fn show_acquisition(trace: &SignalTrace) -> Result<(), PlotError> {
    let figures = AcquisitionFigures::new(trace)?;
    log::debug!(
        "Showing {} signal and {} spectrum points",
        figures.signal.len(),
        figures.spectrum.len()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(WINDOW_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Box::new(AcquisitionViewer { figures })),
    )
    .map_err(|err| PlotError::Window(err.to_string()))
}

struct AcquisitionViewer {
    figures: AcquisitionFigures,
}

impl AcquisitionViewer {
    fn figure(
        ui: &mut egui::Ui,
        id: &str,
        title: &str,
        (x_label, y_label): (&str, &str),
        line: Line,
        height: f32,
    ) {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(title).strong().size(16.0));
        });

        Plot::new(id)
            .height(height)
            .legend(Legend::default())
            .x_axis_label(x_label)
            .y_axis_label(y_label)
            .show_grid(true)
            .show(ui, |plot_ui| plot_ui.line(line));
    }
}

impl eframe::App for AcquisitionViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            // Two titled figures share the panel
            let height = (ui.available_height() - 60.0).max(100.0) / 2.0;

            let signal: PlotPoints = self.figures.signal.iter().copied().collect();
            Self::figure(
                ui,
                "signal",
                "Signal Data from Red Pitaya",
                ("Time (s)", "Amplitude"),
                Line::new(signal).color(SIGNAL_COLOR).name("Signal"),
                height,
            );

            let spectrum: PlotPoints = self.figures.spectrum.iter().copied().collect();
            Self::figure(
                ui,
                "spectrum",
                "FFT of Signal Data",
                ("Frequency (kHz)", "Amplitude"),
                Line::new(spectrum).color(SPECTRUM_COLOR).name("FFT"),
                height,
            );
        });
    }
}
