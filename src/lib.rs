//! # Red Pitaya Lab
//!
//! A Rust library for the lock-stabilization workflow around a Red Pitaya board:
//! fetching acquisitions from the device, inspecting them, estimating how long
//! the control loop stays locked and retuning the PID controller running on it.
//!
//! ## Features
//!
//! - **File retrieval**: Copies files matching names or wildcards over SFTP using `ssh2`
//! - **Acquisition loading**: Reads `<time>,<amplitude>` tables with `polars`
//! - **Spectrum**: Magnitude spectrum of an acquisition using `realfft`
//! - **Plots**: Time-domain and spectrum figures shown in an `egui_plot` window, or saved as PNG with `plotters`
//! - **Lock time**: Average length of the runs spent inside a lock band
//! - **PID control**: Sets gains and setpoint through the system `ssh` client
//!
//! ## Examples
//!
//! ### Fetching Files
//!
//! ```rust,no_run
//! use redpitaya_lab::{fetch_files_from_directory, FileRequest, RemoteCredentials};
//!
//! let credentials = RemoteCredentials::new("rp-f0a1b2.local", "root", "root");
//! let request = FileRequest::new(
//!     "/root",
//!     vec!["acquisition_data.csv".to_string(), "*.png".to_string()],
//! );
//!
//! // Errors are logged, the files that made it are returned
//! let copied = fetch_files_from_directory(&credentials, &request);
//! println!("Copied {} files into {}", copied.len(), request.local_directory().display());
//! ```
//!
//! ### Lock Time
//!
//! ```rust
//! use redpitaya_lab::{estimate_lock_time, LockBand, LockCriteria, SignalTrace};
//!
//! let trace = SignalTrace::parse_csv(
//!     b"0.0,0\n0.1,1756\n0.2,1757\n0.3,1755\n0.4,1756\n0.5,1758\n0.6,0\n",
//! )?;
//!
//! let criteria = LockCriteria::locked_within(LockBand::new(1756.0, 5.0)).longer_than(3);
//! let lock_time = estimate_lock_time(&trace, &criteria)?;
//! assert!((lock_time - 0.5).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Spectrum and Plots
//!
//! ```rust,no_run
//! use redpitaya_lab::{plot_acquisition, show_acquisition, SignalTrace, Spectrum};
//! use std::path::Path;
//!
//! let trace = SignalTrace::load_csv("root/acquisition_data.csv")?;
//!
//! let spectrum = Spectrum::compute(&trace.to_volts())?;
//! if let Some((frequency, magnitude)) = spectrum.peak() {
//!     println!("Strongest bin at {:.1} Hz ({:.3})", frequency, magnitude);
//! }
//!
//! // Blocks until the window is closed
//! show_acquisition(&trace)?;
//! plot_acquisition(&trace, Path::new("plots"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### PID Control
//!
//! ```rust,no_run
//! use redpitaya_lab::{PidParameters, RpPid};
//!
//! let pid = RpPid::new("rp-f0a1b2.local");
//! pid.set_pid(PidParameters::new(0.8, 0.05, 0.0, 1756.0))?;
//! pid.clear_pid()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod file_retriever;
pub mod lock_analysis;
pub mod plot_window;
pub mod plotting;
pub mod remote_pid;
pub mod signal_trace;
pub mod spectrum;
pub mod ssh_session;

// Re-export the main types for convenience
pub use file_retriever::{
    fetch_best_effort, fetch_files_from_directory, fetch_matching, CopiedFile, FileRequest,
    RemoteDirectory, RetrieveError, DEFAULT_LOCAL_DIRECTORY,
};

pub use ssh_session::{RemoteCredentials, SshSession, SshSessionError};

pub use signal_trace::{SignalTrace, TraceError, VOLTS_DIVISOR};

pub use spectrum::{Spectrum, SpectrumError};

pub use lock_analysis::{
    estimate_lock_time, lock_runs, LockAnalysisError, LockBand, LockCriteria, TrailingRun,
};

pub use plotting::{plot_acquisition, plot_signal, plot_spectrum, PlotError, PlotFiles};

pub use plot_window::{show_acquisition, AcquisitionFigures};

pub use remote_pid::{PidError, PidParameters, RpPid};
