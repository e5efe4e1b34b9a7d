use clap::{Args, Parser, Subcommand};
use redpitaya_lab::remote_pid::DEFAULT_PID_EXECUTABLE;
use redpitaya_lab::ssh_session::DEFAULT_SSH_PORT;
use redpitaya_lab::{
    estimate_lock_time, fetch_files_from_directory, plot_acquisition, show_acquisition, FileRequest,
    LockBand, LockCriteria, PidParameters, RemoteCredentials, RpPid, SignalTrace,
};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "205.208.56.215";
const DEFAULT_DATA_FILE: &str = "acquisition_data.csv";

#[derive(Parser, Debug)]
#[command(
    name = "redpitaya-lab",
    version,
    about = "Fetch a Red Pitaya acquisition, plot it and report the average lock time"
)]
struct Cli {
    /// Address of the Red Pitaya
    #[arg(long, env = "RP_HOST", default_value = DEFAULT_HOST, global = true)]
    host: String,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, env = "RP_PORT", default_value_t = DEFAULT_SSH_PORT)]
    port: u16,

    #[arg(long, env = "RP_USER", default_value = "root")]
    username: String,

    #[arg(long, env = "RP_PASSWORD", default_value = "root", hide_env_values = true)]
    password: String,

    /// Directory on the device to copy from
    #[arg(long, env = "RP_REMOTE_DIR", default_value = "/root")]
    remote_dir: String,

    /// File names or wildcards to copy, comma separated
    #[arg(
        long,
        env = "RP_FILES",
        value_delimiter = ',',
        default_values = ["data.csv", "*.png", "acquisition_data.csv"]
    )]
    files: Vec<String>,

    /// Directory the local copy directory is created in
    #[arg(long, env = "RP_LOCAL_ROOT", default_value = ".")]
    local_root: PathBuf,

    /// Acquisition to analyse [default: <local copy directory>/acquisition_data.csv]
    #[arg(long, env = "RP_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Also save the figures as PNG files
    #[arg(long)]
    save_plots: bool,

    /// Where to save the figures [default: the local copy directory]
    #[arg(long, env = "RP_PLOT_DIR")]
    plot_dir: Option<PathBuf>,

    /// Do not open the plot window
    #[arg(long)]
    no_window: bool,

    /// Analyse local files only
    #[arg(long)]
    skip_fetch: bool,

    /// Plot amplitudes in volts instead of raw ADC counts
    #[arg(long)]
    volts: bool,

    #[arg(long, default_value_t = LockBand::DEFAULT_CENTER)]
    lock_center: f64,

    #[arg(long, default_value_t = LockBand::DEFAULT_HALF_WIDTH)]
    lock_width: f64,

    /// Lock runs must be longer than this many samples to count
    #[arg(long, default_value_t = LockCriteria::DEFAULT_MIN_RUN_SAMPLES)]
    min_run: usize,

    /// Also count a lock run that is still open at the end of the acquisition
    #[arg(long)]
    flush_trailing_run: bool,
}

impl RunArgs {
    fn credentials(&self, host: &str) -> RemoteCredentials {
        RemoteCredentials::new(host, &self.username, &self.password).with_port(self.port)
    }

    fn file_request(&self) -> FileRequest {
        FileRequest::new(&self.remote_dir, self.files.clone()).with_local_root(&self.local_root)
    }

    fn lock_criteria(&self) -> LockCriteria {
        let criteria = LockCriteria::locked_within(LockBand::new(self.lock_center, self.lock_width))
            .longer_than(self.min_run);
        if self.flush_trailing_run {
            criteria.flush_at_end()
        } else {
            criteria
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the PID controller on the device
    Pid {
        #[command(subcommand)]
        action: PidAction,

        #[arg(long, env = "RP_PID_USER", default_value = "root")]
        user: String,

        #[arg(long, env = "RP_PID_EXECUTABLE", default_value = DEFAULT_PID_EXECUTABLE)]
        executable: String,
    },
}

#[derive(Subcommand, Debug)]
enum PidAction {
    /// Set gains and setpoint
    #[command(allow_negative_numbers = true)]
    Set {
        p: f64,
        i: f64,
        d: f64,
        setpoint: f64,
    },
    /// Set gains and setpoint to zero
    Clear,
}

fn run(host: &str, args: &RunArgs) {
    let request = args.file_request();

    if args.skip_fetch {
        log::info!("Skipping retrieval from {}", host);
    } else {
        let copied = fetch_files_from_directory(&args.credentials(host), &request);
        log::info!("Copied {} files from {}", copied.len(), host);
    }

    let data_file = args
        .data_file
        .clone()
        .unwrap_or_else(|| request.local_directory().join(DEFAULT_DATA_FILE));
    let trace = match SignalTrace::load_csv(&data_file) {
        Ok(trace) => trace,
        Err(e) => {
            log::error!("Error reading {}: {}", data_file.display(), e);
            return;
        }
    };

    let plotted = if args.volts {
        trace.to_volts()
    } else {
        trace.clone()
    };
    if args.save_plots || args.plot_dir.is_some() {
        let plot_dir = args
            .plot_dir
            .clone()
            .unwrap_or_else(|| request.local_directory());
        if let Err(e) = plot_acquisition(&plotted, &plot_dir) {
            log::error!("Error saving plots: {}", e);
        }
    }
    if !args.no_window {
        if let Err(e) = show_acquisition(&plotted) {
            log::error!("Error plotting data: {}", e);
        }
    }

    match estimate_lock_time(&trace, &args.lock_criteria()) {
        Ok(lock_time) => println!("Average Lock Time {}", lock_time),
        Err(e) => log::error!("Could not estimate lock time: {}", e),
    }
}

fn pid(host: &str, user: &str, executable: &str, action: &PidAction) {
    let client = RpPid::new(host)
        .with_user(user)
        .with_pid_executable(executable);

    let result = match *action {
        PidAction::Set { p, i, d, setpoint } => client.set_pid(PidParameters::new(p, i, d, setpoint)),
        PidAction::Clear => client.clear_pid(),
    };

    if let Err(e) = result {
        log::error!("Error setting PID: {}", e);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        None => run(&cli.host, &cli.run),
        Some(Command::Pid {
            action,
            user,
            executable,
        }) => pid(&cli.host, user, executable, action),
    }
}
